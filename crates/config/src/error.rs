//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error - required field missing
    #[error("{component} '{name}' is missing required field '{field}'")]
    MissingField {
        /// Component type (e.g., "destination", "function")
        component: &'static str,
        /// Name of the component
        name: String,
        /// Missing field name
        field: &'static str,
    },

    /// Validation error - invalid value
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Component type
        component: &'static str,
        /// Name of the component
        name: String,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },

    /// Two functions share an id
    #[error("function id '{id}' is used more than once")]
    DuplicateFunction {
        /// The repeated id
        id: String,
    },

    /// Function type has no registered factory
    #[error("function '{id}' has unknown type '{function_type}'")]
    UnknownFunctionType {
        /// Function id
        id: String,
        /// The unrecognized type
        function_type: String,
    },
}

impl ConfigError {
    /// Create a MissingField error
    pub fn missing_field(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
    ) -> Self {
        Self::MissingField {
            component,
            name: name.into(),
            field,
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }

    /// Create a DuplicateFunction error
    pub fn duplicate_function(id: impl Into<String>) -> Self {
        Self::DuplicateFunction { id: id.into() }
    }

    /// Create an UnknownFunctionType error
    pub fn unknown_function_type(id: impl Into<String>, function_type: impl Into<String>) -> Self {
        Self::UnknownFunctionType {
            id: id.into(),
            function_type: function_type.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_error() {
        let err = ConfigError::missing_field("destination", "bulker", "auth_token");
        assert!(err.to_string().contains("destination"));
        assert!(err.to_string().contains("bulker"));
        assert!(err.to_string().contains("auth_token"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value(
            "destination",
            "bulker",
            "bulker_endpoint",
            "relative URL without a base",
        );
        assert!(err.to_string().contains("bulker_endpoint"));
        assert!(err.to_string().contains("relative URL"));
    }

    #[test]
    fn test_duplicate_function_error() {
        let err = ConfigError::duplicate_function("enrich");
        assert_eq!(err.to_string(), "function id 'enrich' is used more than once");
    }

    #[test]
    fn test_unknown_function_type_error() {
        let err = ConfigError::unknown_function_type("f1", "javascript");
        assert!(err.to_string().contains("f1"));
        assert!(err.to_string().contains("javascript"));
    }
}
