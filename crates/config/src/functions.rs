//! Function chain configuration
//!
//! Functions run in the order they are listed. Each has a unique id, a type
//! that selects its implementation, and type-specific options.
//!
//! # Example
//!
//! ```toml
//! [[functions]]
//! id = "drop-bots"
//! type = "filter"
//! action = "drop"
//! field = "context.userAgent"
//! operator = "contains"
//! value = "bot"
//! retry_delays = [1, 10, 60]
//!
//! [[functions]]
//! id = "passthrough"
//! type = "noop"
//! ```

use serde::Deserialize;
use std::collections::HashMap;

/// Redelivery schedule attached to a function's errors
///
/// Delays are in minutes between attempts; the host decides how to use them.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delays: Vec<u32>,
}

impl RetryPolicy {
    pub fn new(delays: Vec<u32>) -> Self {
        Self { delays }
    }
}

/// Configuration for a single function instance
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionInstanceConfig {
    /// Unique id within the chain; scopes store keys and log lines
    pub id: String,

    /// Function type (e.g., "noop", "filter")
    #[serde(rename = "type")]
    pub function_type: String,

    /// Whether this function runs (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minutes between redelivery attempts for events this function fails
    #[serde(default)]
    pub retry_delays: Option<Vec<u32>>,

    /// Type-specific configuration options, passed to the factory
    #[serde(flatten)]
    pub options: HashMap<String, toml::Value>,
}

fn default_true() -> bool {
    true
}

impl FunctionInstanceConfig {
    /// Create an enabled function config with no options
    pub fn new(id: impl Into<String>, function_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            function_type: function_type.into(),
            enabled: true,
            retry_delays: None,
            options: HashMap::new(),
        }
    }

    /// Add an option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Retry policy built from `retry_delays`, if configured
    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        self.retry_delays.clone().map(RetryPolicy::new)
    }

    /// Get an array option as Vec<String>
    pub fn get_string_array(&self, key: &str) -> Option<Vec<String>> {
        self.options.get(key).and_then(|v| {
            v.as_array().map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
        })
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.options
            .get(key)
            .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.options.get(key).and_then(|v| v.as_integer())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }

    /// Get an option table, e.g. an inline array of conditions
    pub fn get_table_array(&self, key: &str) -> Option<Vec<&toml::Table>> {
        self.options
            .get(key)
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_table()).collect())
    }
}

/// Built-in function types
pub const KNOWN_FUNCTION_TYPES: &[&str] = &["noop", "filter"];

/// Check if a function type is built in
pub fn is_known_function_type(function_type: &str) -> bool {
    KNOWN_FUNCTION_TYPES.contains(&function_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_noop() {
        let toml = r#"
id = "f1"
type = "noop"
"#;
        let config: FunctionInstanceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.id, "f1");
        assert_eq!(config.function_type, "noop");
        assert!(config.enabled);
        assert!(config.options.is_empty());
        assert_eq!(config.retry_policy(), None);
    }

    #[test]
    fn test_deserialize_filter_options() {
        let toml = r#"
id = "drop-bots"
type = "filter"
action = "drop"
field = "context.userAgent"
operator = "contains"
value = "bot"
retry_delays = [1, 10]
"#;
        let config: FunctionInstanceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.get_str("action"), Some("drop"));
        assert_eq!(config.get_str("field"), Some("context.userAgent"));
        assert_eq!(config.retry_policy(), Some(RetryPolicy::new(vec![1, 10])));
        // retry_delays is a field, not an option
        assert!(!config.options.contains_key("retry_delays"));
    }

    #[test]
    fn test_table_array_option() {
        let toml = r#"
id = "f"
type = "filter"
conditions = [
    { field = "type", operator = "eq", value = "track" },
    { field = "event", operator = "exists" },
]
"#;
        let config: FunctionInstanceConfig = toml::from_str(toml).unwrap();
        let conditions = config.get_table_array("conditions").unwrap();
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[1].get("operator").and_then(|v| v.as_str()), Some("exists"));
    }

    #[test]
    fn test_get_float_accepts_integers() {
        let config = FunctionInstanceConfig::new("f", "filter").with_option("value", 3);
        assert_eq!(config.get_float("value"), Some(3.0));
        assert_eq!(config.get_int("value"), Some(3));
    }

    #[test]
    fn test_missing_id_is_an_error() {
        let result: Result<FunctionInstanceConfig, _> = toml::from_str(r#"type = "noop""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_known_function_types() {
        assert!(is_known_function_type("noop"));
        assert!(is_known_function_type("filter"));
        assert!(!is_known_function_type("javascript"));
    }
}
