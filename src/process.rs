use serde_json::{Map, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::observability::Verbosity;

/// Data items used by the command line when none are given.
pub fn fallback_data() -> Vec<Value> {
    vec![
        Value::String("default".to_string()),
        Value::String("data".to_string()),
    ]
}

/// Process `data` according to `config`.
///
/// Empty input is rejected whatever the configuration. No transformation is
/// defined yet, so any non-empty input yields an empty mapping.
///
/// `Verbosity::Debug` applies a debug-level subscriber for the duration of
/// this call on the current thread only.
pub fn process(
    data: &[Value],
    config: Option<&Config>,
    verbosity: Verbosity,
) -> Result<Map<String, Value>> {
    if verbosity.is_debug() {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(verbosity.directive()))
            .with_target(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            debug!("Debug mode enabled");
            process_items(data, config)
        })
    } else {
        process_items(data, config)
    }
}

fn process_items(data: &[Value], config: Option<&Config>) -> Result<Map<String, Value>> {
    if data.is_empty() {
        return Err(Error::EmptyInput);
    }

    debug!(
        items = data.len(),
        config = config.map(|c| c.name.as_str()).unwrap_or("<none>"),
        "Processing input"
    );

    Ok(Map::new())
}
