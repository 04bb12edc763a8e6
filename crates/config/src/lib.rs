//! Ferry Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Only the destination needs to be spelled out; everything else has a default.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use ferry_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[[functions]]\nid = \"f1\"\ntype = \"noop\"").unwrap();
//! assert_eq!(config.functions.len(), 1);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [connection]
//! workspace_id = "ws"
//! stream_id = "js_site"
//! connection_id = "conn"
//! destination_type = "postgres"
//!
//! [destination]
//! bulker_endpoint = "http://bulker:3042"
//! destination_id = "dst"
//! auth_token = "secret"
//! data_layout = "segment"
//!
//! [[functions]]
//! id = "drop-bots"
//! type = "filter"
//! field = "context.userAgent"
//! operator = "contains"
//! value = "bot"
//! ```

mod connection;
mod destination;
mod error;
mod functions;
mod logging;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use connection::ConnectionConfig;
pub use destination::{BulkerConfig, DataLayout, OversizedPayloadPolicy};
pub use error::{ConfigError, Result};
pub use functions::{
    FunctionInstanceConfig, KNOWN_FUNCTION_TYPES, RetryPolicy, is_known_function_type,
};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use validation::validate_destination;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Identity of the connection being served
    pub connection: ConnectionConfig,

    /// Bulker destination; required to deliver, optional for offline mapping
    pub destination: Option<BulkerConfig>,

    /// User functions, in execution order
    pub functions: Vec<FunctionInstanceConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Ids of enabled functions in execution order
    pub fn enabled_functions(&self) -> Vec<&str> {
        self.functions
            .iter()
            .filter(|f| f.enabled)
            .map(|f| f.id.as_str())
            .collect()
    }

    /// The destination, or an error naming the missing section
    pub fn require_destination(&self) -> Result<&BulkerConfig> {
        self.destination
            .as_ref()
            .ok_or_else(|| ConfigError::missing_field("config", "root", "destination"))
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
