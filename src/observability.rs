use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, prelude::*};

/// Log verbosity, handed explicitly to whoever needs it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    #[default]
    Normal,
    Debug,
}

impl Verbosity {
    pub fn from_flag(debug: bool) -> Self {
        if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }

    pub fn directive(self) -> &'static str {
        match self {
            Verbosity::Normal => "info",
            Verbosity::Debug => "debug",
        }
    }

    pub fn is_debug(self) -> bool {
        self == Verbosity::Debug
    }
}

/// Install the process-wide subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init_tracing(verbosity: Verbosity) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .map_err(|err| anyhow!(err.to_string()))?;

    Ok(())
}

/// How one stage of a run went.
#[derive(Debug, Clone, PartialEq)]
pub struct StageRecord {
    pub stage: &'static str,
    pub elapsed: Duration,
    pub succeeded: bool,
}

/// Stage records of the latest run, in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTimings {
    pub stages: Vec<StageRecord>,
    pub total: Option<Duration>,
}

impl RunTimings {
    pub fn stage(&self, name: &str) -> Option<&StageRecord> {
        self.stages.iter().find(|record| record.stage == name)
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|record| record.stage).collect()
    }

    pub fn failures(&self) -> usize {
        self.stages.iter().filter(|record| !record.succeeded).count()
    }
}

/// Times stages as they run. Shared by reference; the log sits behind a mutex.
#[derive(Debug, Default)]
pub struct StageClock {
    log: Mutex<RunTimings>,
}

impl StageClock {
    /// Run `work` as stage `stage` and log how long it took.
    pub fn measure<T, E>(
        &self,
        stage: &'static str,
        work: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        let started = Instant::now();
        let outcome = work();
        let record = StageRecord {
            stage,
            elapsed: started.elapsed(),
            succeeded: outcome.is_ok(),
        };
        debug!(
            stage,
            elapsed_ms = millis(record.elapsed),
            succeeded = record.succeeded,
            "Stage finished"
        );
        self.lock().stages.push(record);
        outcome
    }

    pub fn finish_run(&self, total: Duration) {
        self.lock().total = Some(total);
    }

    pub fn timings(&self) -> RunTimings {
        self.lock().clone()
    }

    pub fn reset(&self) {
        *self.lock() = RunTimings::default();
    }

    fn lock(&self) -> MutexGuard<'_, RunTimings> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

pub fn log_timings(timings: &RunTimings) {
    for record in &timings.stages {
        info!(
            stage = record.stage,
            elapsed_ms = millis(record.elapsed),
            succeeded = record.succeeded,
            "Stage {} took {:.1} ms",
            record.stage,
            millis(record.elapsed)
        );
    }
    if let Some(total) = timings.total {
        info!(
            failures = timings.failures(),
            "Pipeline took {:.1} ms",
            millis(total)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_keeps_stages_in_run_order() {
        let clock = StageClock::default();
        let ok: std::result::Result<(), ()> = clock.measure("clean", || Ok(()));
        let failed: std::result::Result<(), &str> = clock.measure("lint", || Err("ruff"));

        assert!(ok.is_ok());
        assert_eq!(failed, Err("ruff"));
        let timings = clock.timings();
        assert_eq!(timings.stage_names(), vec!["clean", "lint"]);
        assert!(timings.stage("clean").unwrap().succeeded);
        assert!(!timings.stage("lint").unwrap().succeeded);
        assert_eq!(timings.failures(), 1);
        assert!(timings.total.is_none());
    }

    #[test]
    fn reset_clears_previous_run() {
        let clock = StageClock::default();
        let _: std::result::Result<(), ()> = clock.measure("clean", || Ok(()));
        clock.finish_run(Duration::from_millis(5));
        assert_eq!(clock.timings().total, Some(Duration::from_millis(5)));

        clock.reset();
        assert_eq!(clock.timings(), RunTimings::default());
    }

    #[test]
    fn verbosity_maps_to_filter_directive() {
        assert_eq!(Verbosity::from_flag(false).directive(), "info");
        assert_eq!(Verbosity::from_flag(true).directive(), "debug");
        assert!(Verbosity::Debug.is_debug());
    }
}
