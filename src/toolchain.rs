use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::runner::CommandSpec;

/// File picked up from the project root when no explicit config is given.
pub const DEFAULT_CONFIG_FILE: &str = "twat-build.yaml";

/// Placeholders understood in command arguments.
pub const PLACEHOLDERS: [&str; 4] = ["src", "tests", "dist", "build"];

/// Everything the build driver needs to know about the project's toolchain.
///
/// Every section has defaults, so a YAML file only has to name what it
/// overrides.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    pub layout: LayoutSpec,
    pub requirements: RequirementsSpec,
    pub clean: CleanSpec,
    pub lint: LintSpec,
    pub test: TestSpec,
    pub package: PackageSpec,
    pub release: ReleaseSpec,
}

impl BuildConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read build config: {}", path.display()))?;
        let config: BuildConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse build config YAML: {}", path.display()))?;
        Ok(config)
    }

    /// `explicit` if given, else `<root>/twat-build.yaml` if present, else defaults.
    pub fn resolve(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = root.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutSpec {
    pub source_dir: String,
    pub tests_dir: String,
    pub dist_dir: PathBuf,
    pub build_dir: PathBuf,
}

impl Default for LayoutSpec {
    fn default() -> Self {
        Self {
            source_dir: "src/twat_text".to_string(),
            tests_dir: "tests".to_string(),
            dist_dir: PathBuf::from("dist"),
            build_dir: PathBuf::from("build"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RequirementsSpec {
    pub package_manager: CommandSpec,
    pub install_hint: String,
}

impl Default for RequirementsSpec {
    fn default() -> Self {
        Self {
            package_manager: CommandSpec::new("uv", ["--version"]),
            install_hint: "curl -LsSf https://astral.sh/uv/install.sh | sh".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CleanSpec {
    /// Glob patterns relative to the project root.
    pub patterns: Vec<String>,
}

impl Default for CleanSpec {
    fn default() -> Self {
        Self {
            patterns: vec![
                "**/*.pyc".to_string(),
                "**/__pycache__".to_string(),
                "**/*.egg-info".to_string(),
            ],
        }
    }
}

/// A command with the label used in status lines.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToolSpec {
    pub label: String,
    #[serde(flatten)]
    pub command: CommandSpec,
}

impl ToolSpec {
    pub fn new<I, S>(label: &str, program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.to_string(),
            command: CommandSpec::new(program, args),
        }
    }
}

/// Tools run in order; the first failure stops the stage.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LintSpec {
    pub tools: Vec<ToolSpec>,
}

impl Default for LintSpec {
    fn default() -> Self {
        Self {
            tools: vec![
                ToolSpec::new(
                    "Ruff lint",
                    "uv",
                    ["run", "ruff", "check", "{src}", "{tests}"],
                ),
                ToolSpec::new(
                    "Ruff format check",
                    "uv",
                    ["run", "ruff", "format", "--check", "{src}", "{tests}"],
                ),
                ToolSpec::new(
                    "MyPy type checking",
                    "uv",
                    ["run", "mypy", "{src}", "{tests}"],
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TestSpec {
    pub install: CommandSpec,
    pub suite: CommandSpec,
    /// Failure is reported as a warning only. `None` skips the benchmark.
    pub benchmark: Option<CommandSpec>,
}

impl Default for TestSpec {
    fn default() -> Self {
        Self {
            install: CommandSpec::new("uv", ["pip", "install", ".[test]"]),
            suite: CommandSpec::new(
                "uv",
                [
                    "run",
                    "pytest",
                    "-n",
                    "auto",
                    "--cov-report=term-missing",
                    "--cov-report=html",
                    "--cov-config=pyproject.toml",
                    "--cov={src}",
                    "--cov={tests}",
                    "{tests}/",
                ],
            ),
            benchmark: Some(CommandSpec::new(
                "uv",
                [
                    "run",
                    "pytest",
                    "-v",
                    "{tests}/",
                    "-m",
                    "benchmark",
                    "--benchmark-only",
                    "--benchmark-json=benchmark_results.json",
                ],
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PackageSpec {
    pub install: CommandSpec,
    pub build: CommandSpec,
    /// Glob matched against file names in the dist directory.
    pub binary_pattern: String,
    pub source_pattern: String,
}

impl Default for PackageSpec {
    fn default() -> Self {
        Self {
            install: CommandSpec::new(
                "uv",
                ["pip", "install", "build", "hatchling", "hatch-vcs"],
            ),
            build: CommandSpec::new(
                "uv",
                ["run", "python", "-m", "build", "--outdir", "{dist}"],
            ),
            binary_pattern: "*.whl".to_string(),
            source_pattern: "*.tar.gz".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReleaseSpec {
    pub remote: String,
}

impl Default for ReleaseSpec {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
        }
    }
}
