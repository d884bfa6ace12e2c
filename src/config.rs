use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A configuration value. Only these three kinds are recognised.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl ConfigValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigValue::Int(_) => "int",
            ConfigValue::Float(_) => "float",
            ConfigValue::Str(_) => "str",
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Int(v) => write!(f, "{v}"),
            ConfigValue::Float(v) => write!(f, "{v}"),
            ConfigValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Str(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Str(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

/// Settings record consumed by [`crate::process::process`].
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub name: String,
    pub value: ConfigValue,
    pub options: Option<Map<String, Value>>,
}

impl Config {
    pub fn new(name: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            options: None,
        }
    }

    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = Some(options);
        self
    }

    /// Fallback used by the command line when no `--config` is supplied.
    pub fn fallback() -> Self {
        let mut options = Map::new();
        options.insert("key".to_string(), Value::String("value".to_string()));
        Config::new("default", "test").with_options(options)
    }
}

/// Parses `name=value`, splitting on the first `=`.
///
/// The name may end in a kind annotation (`retries:int=3`, `ratio:float=0.5`,
/// `label:str=x`). Any other `:` suffix is part of the name, and the value is
/// kept as a string.
impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (key, raw) = s
            .split_once('=')
            .ok_or_else(|| Error::MalformedConfig(s.to_string()))?;
        let key = key.trim();
        let raw = raw.trim();

        let (name, kind) = match key.rsplit_once(':') {
            Some((name, kind)) if KINDS.contains(&kind.trim()) => (name.trim(), kind.trim()),
            _ => (key, "str"),
        };

        let value = match kind {
            "int" => raw
                .parse::<i64>()
                .map(ConfigValue::Int)
                .map_err(|_| invalid_value(name, "int", raw))?,
            "float" => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => ConfigValue::Float(v),
                _ => return Err(invalid_value(name, "float", raw)),
            },
            _ => ConfigValue::Str(raw.to_string()),
        };

        Ok(Config::new(name, value))
    }
}

const KINDS: [&str; 3] = ["int", "float", "str"];

fn invalid_value(name: &str, kind: &'static str, raw: &str) -> Error {
    Error::InvalidConfigValue {
        name: name.to_string(),
        kind,
        raw: raw.to_string(),
    }
}
