use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use infrastructure::config::SchedulerConfig;
use serde::*;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default = "Default::default")]
    pub scheduler: SchedulerConfig,

    #[serde(default = "Default::default")]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "LogConfig::default_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

impl LogConfig {
    pub fn default_level() -> String {
        "info".to_owned()
    }
}

/// Reads `path` (or `jobsched.yaml` in the working directory if present),
/// then applies `JOBSCHED__SECTION__KEY` environment overrides.
pub fn build_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name("jobsched").required(false),
    };
    Config::builder()
        .add_source(file)
        .add_source(Environment::with_prefix("JOBSCHED").prefix_separator("__").separator("__"))
        .build()?
        .try_deserialize()
}
