use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, warn};
use twat_text::error::Error;
use twat_text::observability::{Verbosity, init_tracing, log_timings};
use twat_text::pipeline::{BuildManager, PipelineOptions, Stage};
use twat_text::release::AutoConfirm;
use twat_text::toolchain::BuildConfig;
use twat_text::validation::validate_config;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_tracing(Verbosity::from_flag(cli.debug)) {
        eprintln!("warning: failed to initialise logging: {err}");
    }

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(1)
        }
    }
}

/// `Ok(false)` means a stage failed and has already reported why.
fn run(cli: Cli) -> Result<bool> {
    if cli.command == BuildCommand::Tag && cli.tag_version.is_none() {
        error!("{}", Error::MissingVersion);
        return Ok(false);
    }

    let root = match cli.root {
        Some(root) => root,
        None => env::current_dir().context("Failed to determine current directory")?,
    };
    let config = BuildConfig::resolve(&root, cli.config.as_deref())?;

    let report = validate_config(&config);
    for warning in &report.warnings {
        warn!("{warning}");
    }
    if !report.is_ok() {
        for error_msg in &report.errors {
            error!("{error_msg}");
        }
        anyhow::bail!(
            "Build config validation failed with {} error(s)",
            report.errors.len()
        );
    }

    let mut manager = BuildManager::system(root, config);
    if cli.yes {
        manager = manager.with_prompt(AutoConfirm(true));
    }

    if manager.check_requirements().is_err() {
        return Ok(false);
    }

    let options = PipelineOptions {
        skip_clean: cli.no_clean,
        skip_lint: cli.no_lint,
        skip_test: cli.no_test,
        skip_build: cli.no_build,
        release: cli.release,
    };

    let outcome = match cli.command {
        BuildCommand::Clean => manager.run_stage(Stage::Clean),
        BuildCommand::Lint => manager.run_stage(Stage::Lint),
        BuildCommand::Test => manager.run_stage(Stage::Test),
        BuildCommand::Build => manager.run_stage(Stage::Build),
        BuildCommand::Version => manager.run_stage(Stage::Version),
        BuildCommand::Tag => {
            let version = cli.tag_version.unwrap_or_default();
            manager.create_release_tag(&version)
        }
        BuildCommand::All => manager.run_full_pipeline(&options),
    };

    if cli.print_metrics {
        log_timings(&manager.timings());
    }

    Ok(outcome.is_ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BuildCommand {
    Test,
    Lint,
    Build,
    Clean,
    Version,
    Tag,
    All,
}

#[derive(Parser)]
#[command(
    name = "twat-build",
    version,
    about = "Build script for the twat-text project",
    after_help = "Examples:\n  twat-build                    # Run full pipeline\n  twat-build test               # Run tests only\n  twat-build lint               # Run linting only\n  twat-build build              # Build package only\n  twat-build tag v1.2.3         # Create release tag\n  twat-build --no-test build    # Build without running tests\n  twat-build --release          # Full release pipeline"
)]
struct Cli {
    /// Command to run
    #[arg(value_enum, default_value_t = BuildCommand::All)]
    command: BuildCommand,
    /// Version for the tag command (e.g. v1.2.3)
    #[arg(value_name = "VERSION")]
    tag_version: Option<String>,
    /// Skip cleaning build artifacts
    #[arg(long)]
    no_clean: bool,
    /// Skip linting checks
    #[arg(long)]
    no_lint: bool,
    /// Skip running tests
    #[arg(long)]
    no_test: bool,
    /// Skip building package
    #[arg(long)]
    no_build: bool,
    /// Prepare for release
    #[arg(long)]
    release: bool,
    /// Project root (defaults to the current directory)
    #[arg(long)]
    root: Option<PathBuf>,
    /// Build config file (defaults to <root>/twat-build.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Enable debug logging
    #[arg(long)]
    debug: bool,
    /// Push release tags without asking
    #[arg(long)]
    yes: bool,
    /// Log per-stage timings after the run
    #[arg(long)]
    print_metrics: bool,
}
