use std::fmt;
use std::io::{self, BufRead, Write};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^v?[0-9]+\.[0-9]+\.[0-9]+(-[A-Za-z0-9]+)?$").expect("valid version regex")
});

/// A validated release version, always carrying the `v` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag(String);

impl ReleaseTag {
    /// Accepts `1.2.3`, `v1.2.3` and `1.2.3-beta1` style versions.
    pub fn parse(version: &str) -> Result<Self> {
        if !VERSION_PATTERN.is_match(version) {
            return Err(Error::InvalidVersion(version.to_string()));
        }
        if version.starts_with('v') {
            Ok(Self(version.to_string()))
        } else {
            Ok(Self(format!("v{version}")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn message(&self) -> String {
        format!("Release {}", self.0)
    }
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Asks the user a yes/no question.
pub trait Prompt {
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

/// Reads the answer from standard input. Anything but `y`/`yes` is a no.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let mut stdout = io::stdout();
        write!(stdout, "{question} [y/N] ")?;
        stdout.flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(is_affirmative(&answer))
    }
}

/// Answers every question with a fixed value.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Prompt for AutoConfirm {
    fn confirm(&mut self, _question: &str) -> io::Result<bool> {
        Ok(self.0)
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_semantic_versions() {
        for version in ["1.2.3", "v1.2.3", "1.2.3-beta1", "v10.0.12-rc2"] {
            assert!(ReleaseTag::parse(version).is_ok(), "{version} should parse");
        }
    }

    #[test]
    fn rejects_malformed_versions() {
        for version in ["1.2", "abc", "", "v1.2.3-", "1.2.3-beta.1", "vv1.2.3", " 1.2.3"] {
            assert!(
                matches!(ReleaseTag::parse(version), Err(Error::InvalidVersion(_))),
                "{version:?} should be rejected"
            );
        }
    }

    #[test]
    fn normalises_missing_prefix() {
        assert_eq!(ReleaseTag::parse("1.2.3").unwrap().as_str(), "v1.2.3");
        assert_eq!(ReleaseTag::parse("v1.2.3").unwrap().as_str(), "v1.2.3");
        assert_eq!(
            ReleaseTag::parse("2.0.0-beta1").unwrap().message(),
            "Release v2.0.0-beta1"
        );
    }

    #[test]
    fn affirmative_answers() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative("  YES "));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("no"));
        assert!(!is_affirmative("yep"));
    }
}
