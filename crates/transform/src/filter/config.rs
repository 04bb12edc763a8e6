//! Filter step configuration
//!
//! Conditions carry typed expectations: `value = 5` compares against the
//! number 5 and `value = "5"` against the string "5", the same way the
//! event JSON distinguishes them.

use ferry_config::FunctionInstanceConfig;
use ferry_protocol::{AnalyticsEvent, Value};
use regex::Regex;

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

/// What to do with events the conditions match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterAction {
    #[default]
    Drop,
    /// Keep only matching events
    Keep,
}

/// How conditions combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

/// Test applied to the value found at a condition's path
#[derive(Debug, Clone)]
pub enum Predicate {
    /// The path resolves, `null` included
    Present,
    Equals(Value),
    /// Also true when the path does not resolve
    NotEquals(Value),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Matches(Regex),
    Greater(f64),
    GreaterOrEqual(f64),
    Less(f64),
    LessOrEqual(f64),
}

impl Predicate {
    /// Evaluate against the value at the path, `None` when it is missing
    pub fn test(&self, field: Option<&Value>) -> bool {
        match self {
            Predicate::Present => field.is_some(),
            Predicate::Equals(expected) => field.is_some_and(|v| same_value(v, expected)),
            Predicate::NotEquals(expected) => !field.is_some_and(|v| same_value(v, expected)),
            Predicate::Contains(s) => text(field).is_some_and(|t| t.contains(s.as_str())),
            Predicate::StartsWith(s) => text(field).is_some_and(|t| t.starts_with(s.as_str())),
            Predicate::EndsWith(s) => text(field).is_some_and(|t| t.ends_with(s.as_str())),
            Predicate::Matches(re) => text(field).is_some_and(|t| re.is_match(t)),
            Predicate::Greater(n) => number(field).is_some_and(|v| v > *n),
            Predicate::GreaterOrEqual(n) => number(field).is_some_and(|v| v >= *n),
            Predicate::Less(n) => number(field).is_some_and(|v| v < *n),
            Predicate::LessOrEqual(n) => number(field).is_some_and(|v| v <= *n),
        }
    }
}

/// Numbers compare by value so `1` equals `1.0`
fn same_value(value: &Value, expected: &Value) -> bool {
    match (value, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => value == expected,
    }
}

fn text(field: Option<&Value>) -> Option<&str> {
    field.and_then(Value::as_str)
}

fn number(field: Option<&Value>) -> Option<f64> {
    field.and_then(Value::as_f64)
}

/// A predicate on one event field, addressed by a dot path like
/// `context.page.path`
#[derive(Debug, Clone)]
pub struct Condition {
    path: Vec<String>,
    pub predicate: Predicate,
}

impl Condition {
    pub fn new(field: &str, predicate: Predicate) -> Self {
        Self {
            path: field.split('.').map(str::to_string).collect(),
            predicate,
        }
    }

    /// Dot path of the field
    pub fn field(&self) -> String {
        self.path.join(".")
    }

    pub fn matches(&self, event: &AnalyticsEvent) -> bool {
        let path: Vec<&str> = self.path.iter().map(String::as_str).collect();
        self.predicate.test(event.get_path(&path))
    }

    /// Build from the TOML `field`/`operator`/`value` triple
    ///
    /// The operator defaults to `eq`.
    pub fn parse(
        field: &str,
        operator: Option<&str>,
        value: Option<&toml::Value>,
    ) -> Result<Self, String> {
        if field.split('.').any(str::is_empty) {
            return Err(format!("invalid field path '{}'", field));
        }
        let operator = operator.unwrap_or("eq");
        let predicate = match operator {
            "exists" => Predicate::Present,
            "eq" => Predicate::Equals(scalar(operator, value)?),
            "ne" => Predicate::NotEquals(scalar(operator, value)?),
            "contains" => Predicate::Contains(string(operator, value)?),
            "starts_with" => Predicate::StartsWith(string(operator, value)?),
            "ends_with" => Predicate::EndsWith(string(operator, value)?),
            "regex" => {
                let pattern = string(operator, value)?;
                let re = Regex::new(&pattern)
                    .map_err(|e| format!("invalid regex '{}': {}", pattern, e))?;
                Predicate::Matches(re)
            }
            "gt" => Predicate::Greater(numeric(operator, value)?),
            "gte" => Predicate::GreaterOrEqual(numeric(operator, value)?),
            "lt" => Predicate::Less(numeric(operator, value)?),
            "lte" => Predicate::LessOrEqual(numeric(operator, value)?),
            other => return Err(format!("unknown operator: {}", other)),
        };
        Ok(Self::new(field, predicate))
    }

    fn from_table(table: &toml::Table) -> Result<Self, String> {
        let field = table
            .get("field")
            .and_then(toml::Value::as_str)
            .ok_or("condition requires 'field'")?;
        let operator = table.get("operator").and_then(toml::Value::as_str);
        Self::parse(field, operator, table.get("value"))
    }
}

fn scalar(operator: &str, value: Option<&toml::Value>) -> Result<Value, String> {
    match value {
        Some(toml::Value::String(s)) => Ok(Value::String(s.clone())),
        Some(toml::Value::Integer(i)) => Ok(Value::from(*i)),
        Some(toml::Value::Float(f)) => Ok(Value::from(*f)),
        Some(toml::Value::Boolean(b)) => Ok(Value::Bool(*b)),
        Some(_) => Err(format!("'{}' needs a string, number or boolean value", operator)),
        None => Err(format!("'{}' requires a value", operator)),
    }
}

fn string(operator: &str, value: Option<&toml::Value>) -> Result<String, String> {
    match value {
        Some(toml::Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(format!("'{}' needs a string value", operator)),
        None => Err(format!("'{}' requires a value", operator)),
    }
}

fn numeric(operator: &str, value: Option<&toml::Value>) -> Result<f64, String> {
    match value {
        Some(toml::Value::Integer(i)) => Ok(*i as f64),
        Some(toml::Value::Float(f)) => Ok(*f),
        Some(_) => Err(format!("'{}' needs a numeric value", operator)),
        None => Err(format!("'{}' requires a value", operator)),
    }
}

/// Configuration for the filter step
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub enabled: bool,
    pub action: FilterAction,
    pub match_mode: MatchMode,
    pub conditions: Vec<Condition>,
}

impl FilterConfig {
    /// Drop events matching every condition
    pub fn drop_when(conditions: Vec<Condition>) -> Self {
        Self {
            enabled: true,
            action: FilterAction::Drop,
            match_mode: MatchMode::All,
            conditions,
        }
    }

    /// Keep only events matching every condition
    pub fn keep_when(conditions: Vec<Condition>) -> Self {
        Self {
            action: FilterAction::Keep,
            ..Self::drop_when(conditions)
        }
    }

    /// Match when any condition holds instead of all of them
    pub fn any(mut self) -> Self {
        self.match_mode = MatchMode::Any;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.conditions.is_empty() {
            return Err("at least one condition is required".to_string());
        }
        Ok(())
    }

    /// Whether the conditions match an event, per the match mode
    pub fn matches(&self, event: &AnalyticsEvent) -> bool {
        match self.match_mode {
            MatchMode::All => self.conditions.iter().all(|c| c.matches(event)),
            MatchMode::Any => self.conditions.iter().any(|c| c.matches(event)),
        }
    }
}

impl TryFrom<&FunctionInstanceConfig> for FilterConfig {
    type Error = String;

    fn try_from(config: &FunctionInstanceConfig) -> Result<Self, Self::Error> {
        let mut conditions = Vec::new();
        if let Some(field) = config.get_str("field") {
            conditions.push(Condition::parse(
                field,
                config.get_str("operator"),
                config.options.get("value"),
            )?);
        }
        for table in config.get_table_array("conditions").unwrap_or_default() {
            conditions.push(Condition::from_table(table)?);
        }

        let mut filter = match config.get_str("action").unwrap_or("drop") {
            "drop" => FilterConfig::drop_when(conditions),
            "keep" => FilterConfig::keep_when(conditions),
            other => return Err(format!("unknown action: {}", other)),
        };
        match config.get_str("match").unwrap_or("all") {
            "all" => {}
            "any" => filter = filter.any(),
            other => return Err(format!("unknown match mode: {}", other)),
        }
        filter.enabled = config.enabled;

        filter.validate()?;
        Ok(filter)
    }
}
