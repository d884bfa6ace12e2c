use std::process::ExitCode;

use clap::Parser;
use serde_json::Value;
use tracing::{error, info};
use twat_text::config::Config;
use twat_text::observability::{Verbosity, init_tracing};
use twat_text::process::{fallback_data, process};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flag(cli.debug);

    if let Err(err) = init_tracing(verbosity) {
        eprintln!("warning: failed to initialise logging: {err}");
    }

    ExitCode::from(run(cli, verbosity))
}

fn run(cli: Cli, verbosity: Verbosity) -> u8 {
    let config = match cli.config.as_deref() {
        Some(raw) => match raw.parse::<Config>() {
            Ok(config) => config,
            Err(err) => {
                error!("{err}");
                return 1;
            }
        },
        None => Config::fallback(),
    };

    let data: Vec<Value> = if cli.data.is_empty() {
        fallback_data()
    } else {
        cli.data.into_iter().map(Value::String).collect()
    };

    match process(&data, Some(&config), verbosity) {
        Ok(result) => {
            let result = Value::Object(result);
            info!("Processing completed: {result}");
            0
        }
        Err(err) if err.is_validation() => {
            error!("Input error: {err}");
            1
        }
        Err(err) => {
            error!("An error occurred: {err}");
            1
        }
    }
}

#[derive(Parser)]
#[command(
    name = "twat-text",
    version,
    about = "twat-text: A text processing utility",
    after_help = "Examples:\n  twat-text --config name=test   # Process with config\n  twat-text --config retries:int=3 a b\n  twat-text --debug               # Enable debug mode"
)]
struct Cli {
    /// Enable debug mode
    #[arg(long)]
    debug: bool,
    /// Configuration in format name=value (name may be annotated as name:int or name:float)
    #[arg(long, value_name = "NAME=VALUE")]
    config: Option<String>,
    /// Input data to process
    #[arg(value_name = "DATA", num_args = 0..)]
    data: Vec<String>,
}
