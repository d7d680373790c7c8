use std::{collections::HashMap, fs};

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use validator::{Validate, ValidationError};

use crate::core::{MediatorError, MediatorResult};

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Default, Debug, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    #[serde(default)]
    pub log: Log,

    /// Built-in behaviors by name, each with its own configuration.
    /// Applied to every request type.
    #[serde(default)]
    pub behaviors: HashMap<String, YamlValue>,
}

// Config file load and validation
impl Config {
    pub fn load_from_yaml<P>(path: P) -> MediatorResult<Self>
    where
        P: AsRef<std::path::Path> + std::fmt::Display,
    {
        let conf_str = fs::read_to_string(&path).map_err(|e| {
            MediatorError::Config(format!("Unable to read conf file from {path}: {e}"))
        })?;
        debug!("Conf file read from {path}");
        Self::from_yaml(&conf_str)
    }

    pub fn from_yaml(conf_str: &str) -> MediatorResult<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_yaml::from_str(conf_str)
            .map_err(|e| MediatorError::Config(format!("Unable to parse yaml conf: {e}")))?;

        trace!("Loaded conf: {conf:?}");

        conf.validate()
            .map_err(|e| MediatorError::Config(format!("Conf file validation failed: {e}")))?;

        Ok(conf)
    }

    pub fn to_yaml(&self) -> MediatorResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| MediatorError::Config(format!("Unable to serialize conf: {e}")))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Log {
    #[serde(default = "Log::default_level")]
    #[validate(custom(function = "validate_level"))]
    pub level: String,

    /// Log file; stderr when absent
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            path: None,
        }
    }
}

impl Log {
    fn default_level() -> String {
        "info".to_string()
    }
}

/// Accepts the level names understood by `log::LevelFilter`.
pub fn validate_level(level: &String) -> Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_log_level"))
    }
}
