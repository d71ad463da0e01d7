use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::ConfigError;
use crate::fetch::{Month, UrlTemplate, DEFAULT_URL_TEMPLATE};
use crate::query::FilterValue;

/// Run settings. Every key is optional in the YAML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub url_template: String,
    pub start_month: String,
    pub months: usize,
    pub data_dir: PathBuf,
    pub timeout_secs: u64,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub column: String,
    pub equals: FilterValue,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            start_month: "2024-01".to_string(),
            months: 6,
            data_dir: PathBuf::from("./data"),
            timeout_secs: 30,
            query: QueryConfig::default(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            column: "fare_amount".to_string(),
            equals: FilterValue::Number(0.0),
        }
    }
}

impl Config {
    /// Defaults, overlaid with `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Catch bad input before any network activity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Month::parse(&self.start_month)?;
        self.template()?;
        if self.timeout_secs == 0 {
            return Err(ConfigError::Timeout);
        }
        Ok(())
    }

    pub fn template(&self) -> Result<UrlTemplate, ConfigError> {
        UrlTemplate::new(self.url_template.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
