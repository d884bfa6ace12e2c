use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// An external program and its fixed argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Command line as typed by a user, for log lines.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Replace `{key}` placeholders in every argument.
    pub fn expand(&self, vars: &[(&str, &str)]) -> CommandSpec {
        let args = self
            .args
            .iter()
            .map(|arg| {
                vars.iter().fold(arg.clone(), |acc, (key, value)| {
                    acc.replace(&format!("{{{key}}}"), value)
                })
            })
            .collect();
        CommandSpec {
            program: self.program.clone(),
            args,
        }
    }
}

/// Result of running one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Success {
        stdout: String,
    },
    /// `exit_code` is `None` when the program could not be started or was
    /// terminated by a signal.
    Failure {
        exit_code: Option<i32>,
        output: String,
    },
}

impl CommandOutcome {
    pub fn success(stdout: impl Into<String>) -> Self {
        CommandOutcome::Success {
            stdout: stdout.into(),
        }
    }

    pub fn failure(exit_code: Option<i32>, output: impl Into<String>) -> Self {
        CommandOutcome::Failure {
            exit_code,
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success { .. })
    }

    fn from_output(output: &Output) -> Self {
        if output.status.success() {
            CommandOutcome::success(String::from_utf8_lossy(&output.stdout).trim_end())
        } else {
            CommandOutcome::failure(output.status.code(), error_text(output))
        }
    }
}

/// Runs external commands. Blocks until the child exits.
pub trait CommandRunner {
    fn run(&self, command: &CommandSpec, cwd: &Path) -> CommandOutcome;

    /// Like [`CommandRunner::run`], but the child shares the terminal.
    /// Used for commands that may need to talk to the user, such as
    /// `git tag -a` or `git push`.
    fn run_attached(&self, command: &CommandSpec, cwd: &Path) -> CommandOutcome {
        self.run(command, cwd)
    }
}

/// Spawns real processes through `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandSpec, cwd: &Path) -> CommandOutcome {
        debug!(command = %command.display(), cwd = %cwd.display(), "Running command");
        match Command::new(&command.program)
            .args(&command.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) => CommandOutcome::from_output(&output),
            Err(err) => spawn_failure(command, err),
        }
    }

    fn run_attached(&self, command: &CommandSpec, cwd: &Path) -> CommandOutcome {
        debug!(command = %command.display(), cwd = %cwd.display(), "Running attached command");
        match Command::new(&command.program)
            .args(&command.args)
            .current_dir(cwd)
            .status()
        {
            Ok(status) if status.success() => CommandOutcome::success(""),
            Ok(status) => CommandOutcome::failure(
                status.code(),
                format!("{} exited with {status}", command.program),
            ),
            Err(err) => spawn_failure(command, err),
        }
    }
}

fn spawn_failure(command: &CommandSpec, err: std::io::Error) -> CommandOutcome {
    CommandOutcome::failure(None, format!("Failed to run {}: {err}", command.program))
}

/// Prefers stderr, falls back to stdout if stderr is empty.
fn error_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}
