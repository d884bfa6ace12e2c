use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use crate::digest::compute_sha256;
use crate::error::{Error, Result};
use crate::observability::{RunTimings, StageClock};
use crate::release::{Prompt, ReleaseTag, StdinPrompt};
use crate::runner::{CommandOutcome, CommandRunner, CommandSpec, SystemRunner};
use crate::toolchain::BuildConfig;

/// One step of the build pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Clean,
    Version,
    Lint,
    Test,
    Build,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Clean => "clean",
            Stage::Version => "version",
            Stage::Lint => "lint",
            Stage::Test => "test",
            Stage::Build => "build",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub skip_clean: bool,
    pub skip_lint: bool,
    pub skip_test: bool,
    pub skip_build: bool,
    pub release: bool,
}

impl PipelineOptions {
    /// Stages the full pipeline will run. The version check is never skipped.
    pub fn plan(&self) -> Vec<Stage> {
        [
            (Stage::Clean, self.skip_clean),
            (Stage::Version, false),
            (Stage::Lint, self.skip_lint),
            (Stage::Test, self.skip_test),
            (Stage::Build, self.skip_build),
        ]
        .into_iter()
        .filter_map(|(stage, skipped)| (!skipped).then_some(stage))
        .collect()
    }
}

/// Drives the external toolchain for a project rooted at `root`.
///
/// Every error returned from a stage has already been logged.
pub struct BuildManager<R: CommandRunner = SystemRunner> {
    root: PathBuf,
    config: BuildConfig,
    runner: R,
    prompt: Box<dyn Prompt>,
    clock: StageClock,
}

impl BuildManager<SystemRunner> {
    pub fn system(root: impl Into<PathBuf>, config: BuildConfig) -> Self {
        Self::new(root, config, SystemRunner)
    }
}

impl<R: CommandRunner> BuildManager<R> {
    pub fn new(root: impl Into<PathBuf>, config: BuildConfig, runner: R) -> Self {
        Self {
            root: root.into(),
            config,
            runner,
            prompt: Box::new(StdinPrompt),
            clock: StageClock::default(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Prompt + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Stage timings of the most recent run.
    pub fn timings(&self) -> RunTimings {
        self.clock.timings()
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.root.join(&self.config.layout.dist_dir)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(&self.config.layout.build_dir)
    }

    pub fn check_requirements(&self) -> Result<()> {
        info!("Checking requirements...");

        if !self.root.join(".git").exists() {
            return Err(self.fail(Error::Requirement("Not in a git repository".into())));
        }

        let probe = &self.config.requirements.package_manager;
        if !self.runner.run(probe, &self.root).is_success() {
            return Err(self.fail(Error::Requirement(format!(
                "{} is not installed. Please install it: {}",
                probe.program, self.config.requirements.install_hint
            ))));
        }

        info!("Requirements check passed");
        Ok(())
    }

    pub fn clean_build(&self) -> Result<()> {
        info!("Cleaning build artifacts...");

        for directory in [self.dist_dir(), self.build_dir()] {
            if directory.exists() {
                fs::remove_dir_all(&directory)
                    .map_err(|err| self.fail(Error::io(&directory, err)))?;
            }
        }

        let root_pattern = glob::Pattern::escape(&self.root.to_string_lossy());
        for pattern in &self.config.clean.patterns {
            let full = format!("{root_pattern}/{pattern}");
            let entries = glob::glob(&full).map_err(|err| {
                self.fail(Error::InvalidPattern {
                    context: "clean",
                    pattern: pattern.clone(),
                    reason: err.to_string(),
                })
            })?;

            let mut matches = Vec::new();
            for entry in entries {
                match entry {
                    Ok(path) if behind_symlink(&self.root, &path) => {
                        debug!(path = %path.display(), "Skipping match behind a symlink");
                    }
                    Ok(path) => matches.push(path),
                    Err(err) => {
                        warn!(pattern = pattern.as_str(), "Skipping unreadable path: {err}")
                    }
                }
            }
            for path in matches {
                remove_path(&path).map_err(|err| self.fail(Error::io(&path, err)))?;
            }
        }

        info!("Build artifacts cleaned");
        Ok(())
    }

    pub fn run_linting(&self) -> Result<()> {
        info!("Running linting and formatting...");

        for tool in &self.config.lint.tools {
            info!(tool = tool.label.as_str(), "Running {}...", tool.label);
            if let Err(err) = self.run_tool(&tool.label, &tool.command) {
                error!(tool = tool.label.as_str(), "{} failed", tool.label);
                return Err(err);
            }
            info!(tool = tool.label.as_str(), "{} passed", tool.label);
        }

        Ok(())
    }

    pub fn run_tests(&self) -> Result<()> {
        info!("Running tests...");

        info!("Installing test dependencies...");
        if let Err(err) = self.run_tool("Test dependency install", &self.config.test.install) {
            error!("Failed to install test dependencies");
            return Err(err);
        }

        info!("Running test suite with coverage...");
        if let Err(err) = self.run_tool("Test suite", &self.config.test.suite) {
            error!("Tests failed");
            return Err(err);
        }
        info!("Tests passed");

        if let Some(benchmark) = &self.config.test.benchmark {
            info!("Running benchmark tests...");
            let command = self.expand(benchmark);
            match self.runner.run(&command, &self.root) {
                CommandOutcome::Success { .. } => info!("Benchmark tests completed"),
                CommandOutcome::Failure { exit_code, output } => {
                    warn!(?exit_code, "Benchmark tests failed or not available");
                    if !output.is_empty() {
                        warn!("{output}");
                    }
                }
            }
        }

        Ok(())
    }

    pub fn build_package(&self) -> Result<()> {
        info!("Building package...");

        info!("Installing build dependencies...");
        if let Err(err) = self.run_tool("Build dependency install", &self.config.package.install)
        {
            error!("Failed to install build dependencies");
            return Err(err);
        }

        let dist = self.dist_dir();
        fs::create_dir_all(&dist).map_err(|err| self.fail(Error::io(&dist, err)))?;

        info!("Building distributions...");
        if let Err(err) = self.run_tool("Package build", &self.config.package.build) {
            error!("Package build failed");
            return Err(err);
        }
        info!("Package built successfully");

        let files = list_files(&dist).map_err(|err| self.fail(Error::io(&dist, err)))?;
        info!("Built files:");
        for file in &files {
            let digest = compute_sha256(file).map_err(|err| self.fail(err))?;
            info!(sha256 = digest.as_str(), "  {}", file_name(file));
        }

        info!("Verifying distributions...");
        let mut missing = Vec::new();
        for (kind, pattern) in [
            ("binary", &self.config.package.binary_pattern),
            ("source", &self.config.package.source_pattern),
        ] {
            let matcher = glob::Pattern::new(pattern).map_err(|err| {
                self.fail(Error::InvalidPattern {
                    context: kind,
                    pattern: pattern.clone(),
                    reason: err.to_string(),
                })
            })?;
            if !files.iter().any(|file| matcher.matches(&file_name(file))) {
                missing.push(format!("{kind} ({pattern})"));
            }
        }

        if !missing.is_empty() {
            return Err(self.fail(Error::MissingArtifacts(missing.join(", "))));
        }

        info!("Both binary and source distributions created");
        Ok(())
    }

    pub fn check_version(&self) -> Result<()> {
        info!("Checking version information...");

        let describe = CommandSpec::new("git", ["describe", "--tags", "--dirty", "--always"]);
        match self.runner.run(&describe, &self.root) {
            CommandOutcome::Success { stdout } => {
                info!(version = stdout.trim(), "Current version: {}", stdout.trim())
            }
            CommandOutcome::Failure { .. } => warn!("No git tags found"),
        }

        let status = CommandSpec::new("git", ["status", "--porcelain"]);
        match self.runner.run(&status, &self.root) {
            CommandOutcome::Success { stdout } if stdout.trim().is_empty() => {
                info!("Working directory is clean");
            }
            CommandOutcome::Success { stdout } => {
                warn!("Working directory is dirty");
                println!("{stdout}");
            }
            CommandOutcome::Failure { exit_code, output } => {
                error!("Failed to check git status");
                return Err(self.fail(Error::CommandFailed {
                    tool: "git status".into(),
                    exit_code,
                    output,
                }));
            }
        }

        Ok(())
    }

    #[instrument(skip(self))]
    pub fn create_release_tag(&mut self, version: &str) -> Result<()> {
        info!("Creating release tag: {version}");

        let tag = ReleaseTag::parse(version).map_err(|err| self.fail(err))?;

        let list = CommandSpec::new("git", ["tag", "-l"]);
        let existing = match self.runner.run(&list, &self.root) {
            CommandOutcome::Success { stdout } => stdout,
            CommandOutcome::Failure { exit_code, output } => {
                error!("Failed to list git tags");
                return Err(self.fail(Error::CommandFailed {
                    tool: "git tag -l".into(),
                    exit_code,
                    output,
                }));
            }
        };
        if existing.lines().any(|line| line.trim() == tag.as_str()) {
            return Err(self.fail(Error::TagExists(tag.to_string())));
        }

        let message = tag.message();
        let create = CommandSpec::new("git", ["tag", "-a", tag.as_str(), "-m", message.as_str()]);
        if let CommandOutcome::Failure { exit_code, output } =
            self.runner.run_attached(&create, &self.root)
        {
            error!("Failed to create tag: {tag}");
            return Err(self.fail(Error::CommandFailed {
                tool: "git tag -a".into(),
                exit_code,
                output,
            }));
        }
        info!("Created tag: {tag}");

        let remote = self.config.release.remote.clone();
        let push = self
            .prompt
            .confirm("Push tag to remote?")
            .map_err(|err| self.fail(Error::io("<stdin>", err)))?;
        if push {
            let command = CommandSpec::new("git", ["push", remote.as_str(), tag.as_str()]);
            if let CommandOutcome::Failure { exit_code, output } =
                self.runner.run_attached(&command, &self.root)
            {
                error!("Failed to push tag to remote");
                return Err(self.fail(Error::CommandFailed {
                    tool: "git push".into(),
                    exit_code,
                    output,
                }));
            }
            info!("Tag pushed to remote");
        } else {
            info!("Tag not pushed. You can push later with: git push {remote} {tag}");
        }

        Ok(())
    }

    pub fn run_stage(&self, stage: Stage) -> Result<()> {
        let span = tracing::span!(tracing::Level::DEBUG, "stage", stage = stage.name());
        let _span_guard = span.enter();
        self.clock.measure(stage.name(), || match stage {
            Stage::Clean => self.clean_build(),
            Stage::Version => self.check_version(),
            Stage::Lint => self.run_linting(),
            Stage::Test => self.run_tests(),
            Stage::Build => self.build_package(),
        })
    }

    /// Clean, version check, lint, test, build. Stops at the first failure.
    pub fn run_full_pipeline(&self, options: &PipelineOptions) -> Result<()> {
        info!("Running full build pipeline...");
        self.clock.reset();
        let started = Instant::now();

        let outcome = options
            .plan()
            .into_iter()
            .try_for_each(|stage| self.run_stage(stage));
        self.clock.finish_run(started.elapsed());
        outcome?;

        info!("Full build pipeline completed successfully!");
        if options.release {
            info!("Release mode: Package is ready for release");
            info!("To create a release tag, run: twat-build tag <version>");
        }

        Ok(())
    }

    fn expand(&self, command: &CommandSpec) -> CommandSpec {
        let dist = self.dist_dir();
        let build = self.build_dir();
        let dist = dist.to_string_lossy();
        let build = build.to_string_lossy();
        command.expand(&[
            ("src", self.config.layout.source_dir.as_str()),
            ("tests", self.config.layout.tests_dir.as_str()),
            ("dist", dist.as_ref()),
            ("build", build.as_ref()),
        ])
    }

    fn run_tool(&self, label: &str, command: &CommandSpec) -> Result<String> {
        let command = self.expand(command);
        match self.runner.run(&command, &self.root) {
            CommandOutcome::Success { stdout } => Ok(stdout),
            CommandOutcome::Failure { exit_code, output } => {
                error!("Command failed: {}", command.display());
                error!("Error: {output}");
                Err(Error::CommandFailed {
                    tool: label.to_string(),
                    exit_code,
                    output,
                })
            }
        }
    }

    fn fail(&self, err: Error) -> Error {
        error!("{err}");
        err
    }
}

fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Whether `path` is reached through a symlinked directory below `root`.
/// Paths outside `root` count as behind a symlink.
fn behind_symlink(root: &Path, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return true;
    };
    let mut ancestor = root.to_path_buf();
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        if components.peek().is_none() {
            break;
        }
        ancestor.push(component);
        match fs::symlink_metadata(&ancestor) {
            Ok(metadata) if !metadata.file_type().is_symlink() => {}
            _ => return true,
        }
    }
    false
}

fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_plan_runs_every_stage_in_order() {
        assert_eq!(
            PipelineOptions::default().plan(),
            vec![
                Stage::Clean,
                Stage::Version,
                Stage::Lint,
                Stage::Test,
                Stage::Build
            ]
        );
    }

    #[test]
    fn version_check_survives_every_skip() {
        let options = PipelineOptions {
            skip_clean: true,
            skip_lint: true,
            skip_test: true,
            skip_build: true,
            release: false,
        };
        assert_eq!(options.plan(), vec![Stage::Version]);
    }

    #[test]
    fn remove_path_ignores_missing_entries() {
        let temp = tempfile::tempdir().unwrap();
        assert!(remove_path(&temp.path().join("gone")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_ancestors_are_detected() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("src/pkg")).unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("venv")).unwrap();

        assert!(!behind_symlink(root.path(), &root.path().join("src/pkg/a.pyc")));
        assert!(behind_symlink(root.path(), &root.path().join("venv/lib/a.pyc")));
        // The link itself can go; only what lies beyond it is protected.
        assert!(!behind_symlink(root.path(), &root.path().join("venv")));
        assert!(behind_symlink(root.path(), outside.path()));
    }
}
