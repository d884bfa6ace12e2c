use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Input data cannot be empty")]
    EmptyInput,

    #[error("Invalid config format '{0}'. Use name=value")]
    MalformedConfig(String),

    #[error("Invalid {kind} value for '{name}': {raw}")]
    InvalidConfigValue {
        name: String,
        kind: &'static str,
        raw: String,
    },

    #[error("Invalid version format: {0}. Expected format: v1.2.3 or 1.2.3")]
    InvalidVersion(String),

    #[error("Tag {0} already exists")]
    TagExists(String),

    #[error("tag command requires a version argument")]
    MissingVersion,

    #[error("{0}")]
    Requirement(String),

    #[error("{tool} failed{}: {output}", exit_suffix(.exit_code))]
    CommandFailed {
        tool: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Invalid {context} pattern '{pattern}': {reason}")]
    InvalidPattern {
        context: &'static str,
        pattern: String,
        reason: String,
    },

    #[error("Missing distribution files: {0}")]
    MissingArtifacts(String),

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => String::new(),
    }
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Bad user input, rejected before any external side effect.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::EmptyInput
                | Error::MalformedConfig(_)
                | Error::InvalidConfigValue { .. }
                | Error::InvalidVersion(_)
                | Error::TagExists(_)
                | Error::MissingVersion
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failure_message_includes_exit_code() {
        let err = Error::CommandFailed {
            tool: "Ruff lint".into(),
            exit_code: Some(2),
            output: "E501 line too long".into(),
        };
        assert_eq!(
            err.to_string(),
            "Ruff lint failed with exit code 2: E501 line too long"
        );
        assert!(!err.is_validation());
    }

    #[test]
    fn spawn_failure_message_omits_exit_code() {
        let err = Error::CommandFailed {
            tool: "uv".into(),
            exit_code: None,
            output: "No such file or directory".into(),
        };
        assert_eq!(err.to_string(), "uv failed: No such file or directory");
    }

    #[test]
    fn pattern_error_names_its_context() {
        let err = Error::InvalidPattern {
            context: "clean",
            pattern: "[".into(),
            reason: "invalid range pattern".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid clean pattern '[': invalid range pattern"
        );
        assert!(!err.is_validation());
    }

    #[test]
    fn input_errors_are_validation_errors() {
        assert!(Error::EmptyInput.is_validation());
        assert!(Error::MalformedConfig("oops".into()).is_validation());
        assert!(Error::TagExists("v1.0.0".into()).is_validation());
    }
}
