pub mod config;
pub mod digest;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod process;
pub mod release;
pub mod runner;
pub mod toolchain;
pub mod validation;

pub use config::{Config, ConfigValue};
pub use error::{Error, Result};
pub use pipeline::{BuildManager, PipelineOptions, Stage};
pub use process::process;
