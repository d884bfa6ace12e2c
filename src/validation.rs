use crate::runner::CommandSpec;
use crate::toolchain::{BuildConfig, PLACEHOLDERS};

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

pub fn validate_config(config: &BuildConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.layout.dist_dir.as_os_str().is_empty() {
        report.errors.push("Dist directory cannot be empty".into());
    }
    if config.layout.build_dir.as_os_str().is_empty() {
        report.errors.push("Build directory cannot be empty".into());
    }
    if config.layout.dist_dir == config.layout.build_dir {
        report
            .warnings
            .push("Dist and build directories are the same; clean removes both".into());
    }

    report.merge(validate_command(
        "requirements.package_manager",
        &config.requirements.package_manager,
    ));

    for (idx, pattern) in config.clean.patterns.iter().enumerate() {
        if let Err(err) = glob::Pattern::new(pattern) {
            report.errors.push(format!(
                "Clean pattern {} ('{}') is not a valid glob: {}",
                idx + 1,
                pattern,
                err
            ));
        }
        if pattern.starts_with('/') || pattern.split('/').any(|part| part == "..") {
            report.errors.push(format!(
                "Clean pattern {} ('{}') must stay inside the project root",
                idx + 1,
                pattern
            ));
        }
    }

    if config.lint.tools.is_empty() {
        report
            .warnings
            .push("No lint tools configured; lint stage does nothing".into());
    }
    for (idx, tool) in config.lint.tools.iter().enumerate() {
        if tool.label.trim().is_empty() {
            report
                .errors
                .push(format!("Lint tool {} has an empty label", idx + 1));
        }
        report.merge(validate_command(
            &format!("lint.tools[{}] ('{}')", idx, tool.label),
            &tool.command,
        ));
    }

    report.merge(validate_command("test.install", &config.test.install));
    report.merge(validate_command("test.suite", &config.test.suite));
    if let Some(benchmark) = &config.test.benchmark {
        report.merge(validate_command("test.benchmark", benchmark));
    }

    report.merge(validate_command("package.install", &config.package.install));
    report.merge(validate_command("package.build", &config.package.build));
    for (field, pattern) in [
        ("binary_pattern", &config.package.binary_pattern),
        ("source_pattern", &config.package.source_pattern),
    ] {
        if pattern.trim().is_empty() {
            report
                .errors
                .push(format!("package.{field} cannot be empty"));
        } else if let Err(err) = glob::Pattern::new(pattern) {
            report.errors.push(format!(
                "package.{field} ('{pattern}') is not a valid glob: {err}"
            ));
        }
    }
    if !config
        .package
        .build
        .args
        .iter()
        .any(|arg| arg.contains("{dist}"))
    {
        report.warnings.push(
            "package.build does not reference {dist}; artifacts must land in the dist directory"
                .into(),
        );
    }

    if config.release.remote.trim().is_empty() {
        report.errors.push("release.remote cannot be empty".into());
    }

    report
}

fn validate_command(field: &str, command: &CommandSpec) -> ValidationReport {
    let mut report = ValidationReport::default();
    if command.program.trim().is_empty() {
        report
            .errors
            .push(format!("{field}: program cannot be empty"));
    }
    for arg in &command.args {
        for name in placeholder_names(arg) {
            if !PLACEHOLDERS.contains(&name) {
                report.errors.push(format!(
                    "{field}: unknown placeholder '{{{name}}}' (known: {})",
                    PLACEHOLDERS.join(", ")
                ));
            }
        }
    }
    report
}

fn placeholder_names(arg: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = arg;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = &after[..end];
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            names.push(name);
        }
        rest = &after[end + 1..];
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::ToolSpec;

    #[test]
    fn default_config_is_valid() {
        let report = validate_config(&BuildConfig::default());
        assert!(report.is_ok(), "unexpected errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn unknown_placeholder_is_reported() {
        let mut config = BuildConfig::default();
        config.lint.tools = vec![ToolSpec::new("Lint", "ruff", ["check", "{source}"])];
        let report = validate_config(&config);
        assert!(!report.is_ok());
        assert!(report.errors[0].contains("{source}"));
    }

    #[test]
    fn escaping_clean_patterns_are_rejected() {
        let mut config = BuildConfig::default();
        config.clean.patterns = vec!["../**/*.pyc".into(), "/tmp/*".into()];
        let report = validate_config(&config);
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn empty_program_and_patterns_are_errors() {
        let mut config = BuildConfig::default();
        config.package.build.program = String::new();
        config.package.source_pattern = " ".into();
        let report = validate_config(&config);
        assert!(report.errors.iter().any(|e| e.contains("package.build")));
        assert!(report.errors.iter().any(|e| e.contains("source_pattern")));
    }

    #[test]
    fn placeholder_scan_ignores_literal_braces() {
        assert_eq!(placeholder_names("--cov={src}"), vec!["src"]);
        assert!(placeholder_names("{\"a\": 1}").is_empty());
        assert_eq!(placeholder_names("{dist}/{build}"), vec!["dist", "build"]);
    }
}
