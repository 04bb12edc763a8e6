//! Configuration validation
//!
//! Validates config consistency:
//! - The destination has its required fields and a usable endpoint URL
//! - Function ids are non-empty and unique
//! - Function types are built in, with type-specific option checks

use std::collections::HashSet;

use url::Url;

use crate::Config;
use crate::destination::BulkerConfig;
use crate::error::{ConfigError, Result};
use crate::functions::{FunctionInstanceConfig, is_known_function_type};

/// Operators understood by the filter function
const FILTER_OPERATORS: &[&str] = &[
    "eq",
    "ne",
    "contains",
    "starts_with",
    "ends_with",
    "regex",
    "exists",
    "gt",
    "lt",
    "gte",
    "lte",
];

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(ref destination) = config.destination {
        validate_destination(destination)?;
    }
    validate_functions(&config.functions)?;
    Ok(())
}

/// Validate the Bulker destination
pub fn validate_destination(destination: &BulkerConfig) -> Result<()> {
    let name = if destination.destination_id.is_empty() {
        "bulker"
    } else {
        destination.destination_id.as_str()
    };

    if destination.bulker_endpoint.is_empty() {
        return Err(ConfigError::missing_field("destination", name, "bulker_endpoint"));
    }
    if destination.destination_id.is_empty() {
        return Err(ConfigError::missing_field("destination", name, "destination_id"));
    }
    if destination.auth_token.is_empty() {
        return Err(ConfigError::missing_field("destination", name, "auth_token"));
    }

    let url = Url::parse(&destination.bulker_endpoint).map_err(|e| {
        ConfigError::invalid_value("destination", name, "bulker_endpoint", e.to_string())
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid_value(
            "destination",
            name,
            "bulker_endpoint",
            format!("unsupported scheme '{}', expected http or https", url.scheme()),
        ));
    }

    if destination.timeout.is_zero() {
        return Err(ConfigError::invalid_value(
            "destination",
            name,
            "timeout",
            "must be greater than zero",
        ));
    }

    Ok(())
}

/// Validate function instances
fn validate_functions(functions: &[FunctionInstanceConfig]) -> Result<()> {
    let mut seen = HashSet::new();

    for (idx, function) in functions.iter().enumerate() {
        if function.id.is_empty() {
            return Err(ConfigError::missing_field(
                "function",
                format!("functions[{idx}]"),
                "id",
            ));
        }
        if !seen.insert(function.id.as_str()) {
            return Err(ConfigError::duplicate_function(&function.id));
        }

        // Skip disabled functions
        if !function.enabled {
            continue;
        }

        if !is_known_function_type(&function.function_type) {
            return Err(ConfigError::unknown_function_type(
                &function.id,
                &function.function_type,
            ));
        }

        if function.function_type == "filter" {
            validate_filter(function)?;
        }
    }

    Ok(())
}

fn validate_filter(function: &FunctionInstanceConfig) -> Result<()> {
    if let Some(action) = function.get_str("action")
        && !matches!(action, "drop" | "keep")
    {
        return Err(ConfigError::invalid_value(
            "function",
            &function.id,
            "action",
            format!("unknown action '{action}', expected drop or keep"),
        ));
    }

    if let Some(mode) = function.get_str("match")
        && !matches!(mode, "all" | "any")
    {
        return Err(ConfigError::invalid_value(
            "function",
            &function.id,
            "match",
            format!("unknown match mode '{mode}', expected all or any"),
        ));
    }

    let has_single = function.get_str("field").is_some();
    let conditions = function.get_table_array("conditions").unwrap_or_default();
    if !has_single && conditions.is_empty() {
        return Err(ConfigError::missing_field("function", &function.id, "field"));
    }

    let operators = function
        .get_str("operator")
        .into_iter()
        .chain(conditions.iter().filter_map(|c| c.get("operator")?.as_str()));
    for operator in operators {
        if !FILTER_OPERATORS.contains(&operator) {
            return Err(ConfigError::invalid_value(
                "function",
                &function.id,
                "operator",
                format!("unknown operator '{operator}'"),
            ));
        }
    }

    Ok(())
}
