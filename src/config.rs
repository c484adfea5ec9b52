use crate::constants::*;
use crate::error::{EtlError, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration for one ETL run, built once at startup and passed into each stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub load: LoadConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Delimited input file
    pub path: PathBuf,
    pub delimiter: char,
    /// Cell values treated as null besides blank cells
    pub null_tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Persist the invalid partition into the `fails` table
    pub load_fails: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Fixed run date; the local current date is used when unset
    pub date: Option<NaiveDate>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_INPUT),
            delimiter: DEFAULT_DELIMITER,
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATABASE),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self { load_fails: true }
    }
}

impl EtlConfig {
    /// Load defaults, then the TOML file, then environment overrides.
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        info!("Loaded config from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EtlConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply `USAGE_ETL_*` overrides through the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(input) = lookup(ENV_INPUT) {
            self.source.path = PathBuf::from(input);
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            self.store.path = PathBuf::from(database);
        }
        if let Some(delimiter) = lookup(ENV_DELIMITER) {
            self.source.delimiter = parse_delimiter(&delimiter)?;
        }
        if let Some(date) = lookup(ENV_RUN_DATE) {
            self.run.date = Some(parse_run_date(&date)?);
        }
        if let Some(flag) = lookup(ENV_LOAD_FAILS) {
            self.load.load_fails = parse_flag(ENV_LOAD_FAILS, &flag)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.path.as_os_str().is_empty() {
            return Err(EtlError::Config("source path must not be empty".to_string()));
        }
        if self.store.path.as_os_str().is_empty() {
            return Err(EtlError::Config("store path must not be empty".to_string()));
        }
        if !self.source.delimiter.is_ascii() {
            return Err(EtlError::Config(format!(
                "delimiter '{}' must be a single ASCII character",
                self.source.delimiter
            )));
        }
        Ok(())
    }

    /// The date used for records without a `day`, fixed for the whole run
    pub fn resolve_run_date(&self) -> NaiveDate {
        self.run.date.unwrap_or_else(|| Local::now().date_naive())
    }
}

pub fn parse_delimiter(value: &str) -> Result<char> {
    if value == "\\t" || value == "tab" {
        return Ok('\t');
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c),
        _ => Err(EtlError::Config(format!(
            "delimiter '{value}' must be a single ASCII character"
        ))),
    }
}

pub fn parse_run_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), RUN_DATE_FORMAT).map_err(|e| {
        EtlError::Config(format!("run date '{value}' is not YYYY-MM-DD: {e}"))
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(EtlError::Config(format!("{key}: '{other}' is not a boolean"))),
    }
}
