//! Configuration management for scrolldump
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Environment variables
//! - Command-line arguments (applied by the `cli` module)
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "SCROLLDUMP_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Debug/local mode: continuations run inline and object store writes
    /// are only logged
    #[serde(default)]
    pub debug: bool,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Search engine client configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Defaults applied to job states that omit a field
    #[serde(default)]
    pub export: ExportDefaults,

    /// Continuation dispatch configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Search engine client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

/// Job defaults, applied once when a payload is resolved into a `JobState`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportDefaults {
    /// Server-side lifetime of the pagination cursor (e.g. "1m")
    #[serde(default = "default_page_ttl")]
    pub page_ttl: String,

    /// Maximum records per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Parameters passed to the initial query
    #[serde(default)]
    pub query_options: Map<String, Value>,

    /// Parameters passed to every page-advance call
    #[serde(default)]
    pub fetch_options: Map<String, Value>,
}

/// Continuation dispatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Function to re-invoke; defaults to the currently running function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
}

// Default value functions
fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_timestamps() -> bool {
    true
}

fn default_search_timeout() -> u64 {
    60
}

fn default_page_ttl() -> String {
    "1m".to_string()
}

fn default_page_size() -> u32 {
    10
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_search_timeout(),
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            page_ttl: default_page_ttl(),
            page_size: default_page_size(),
            query_options: Map::new(),
            fetch_options: Map::new(),
        }
    }
}

impl Config {
    /// Load configuration from all sources with proper precedence
    ///
    /// The file is taken from `path`, then `SCROLLDUMP_CONFIG`, then the
    /// default location if it exists. Environment overrides are applied on
    /// top and the result is validated.
    ///
    /// # Arguments
    /// * `path` - Explicit configuration file, if any
    ///
    /// # Returns
    /// * `Result<Config>` - Merged configuration or error
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(p) => Self::from_file(&p)?,
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.display().to_string())
            } else {
                ConfigError::InvalidFormat(format!("{}: {e}", path.display()))
            }
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Render the configuration as TOML
    ///
    /// Goes through `serde_json::Value` first so numbers in the option maps
    /// are written as TOML numbers rather than serde_json's internal form.
    /// JSON nulls have no TOML equivalent and are left out.
    pub fn to_toml(&self) -> Result<String> {
        let json = serde_json::to_value(self)?;
        let doc = json_to_toml(&json).unwrap_or_else(|| toml::Value::Table(toml::Table::new()));
        toml::to_string_pretty(&doc).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Apply `SCROLLDUMP_*` overrides
    ///
    /// The lookup is injected so overrides can be applied from any source.
    ///
    /// # Arguments
    /// * `lookup` - Returns the value of an environment variable, if set
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SCROLLDUMP_DEBUG") {
            self.debug = parse_bool("SCROLLDUMP_DEBUG", &v)?;
        }
        if let Some(v) = lookup("SCROLLDUMP_LOG_LEVEL") {
            self.logging.level = v.parse()?;
        }
        if let Some(v) = lookup("SCROLLDUMP_PAGE_TTL") {
            self.export.page_ttl = v;
        }
        if let Some(v) = lookup("SCROLLDUMP_PAGE_SIZE") {
            self.export.page_size = parse_number("SCROLLDUMP_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("SCROLLDUMP_SEARCH_TIMEOUT") {
            self.search.timeout_secs = parse_number("SCROLLDUMP_SEARCH_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("SCROLLDUMP_FUNCTION_NAME") {
            self.scheduler.function_name = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = lookup("SCROLLDUMP_QUERY_OPTIONS") {
            self.export.query_options = parse_object("SCROLLDUMP_QUERY_OPTIONS", &v)?;
        }
        if let Some(v) = lookup("SCROLLDUMP_FETCH_OPTIONS") {
            self.export.fetch_options = parse_object("SCROLLDUMP_FETCH_OPTIONS", &v)?;
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".scrolldump")
            .join("config.toml")
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        if self.export.page_size == 0 {
            return Err(invalid("export.page_size", "0"));
        }
        if self.export.page_ttl.trim().is_empty() {
            return Err(invalid("export.page_ttl", &self.export.page_ttl));
        }
        if self.search.timeout_secs == 0 {
            return Err(invalid("search.timeout_secs", "0"));
        }
        Ok(())
    }

    /// Get search request timeout as Duration
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search.timeout_secs)
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl FromStr for LogLevel {
    type Err = crate::error::DumpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(invalid("logging.level", s)),
        }
    }
}

fn invalid(field: &str, value: &str) -> crate::error::DumpError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

fn parse_bool(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(field, value)),
    }
}

fn parse_number<T: FromStr>(field: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| invalid(field, value))
}

fn json_to_toml(value: &Value) -> Option<toml::Value> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(toml::Value::Boolean(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(toml::Value::Integer(i)),
            None => n.as_f64().map(toml::Value::Float),
        },
        Value::String(s) => Some(toml::Value::String(s.clone())),
        Value::Array(items) => Some(toml::Value::Array(
            items.iter().filter_map(json_to_toml).collect(),
        )),
        Value::Object(map) => Some(toml::Value::Table(
            map.iter()
                .filter_map(|(k, v)| json_to_toml(v).map(|v| (k.clone(), v)))
                .collect(),
        )),
    }
}

fn parse_object(field: &str, value: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(value) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(invalid(field, value)),
    }
}
