//! Canonical analytics event
//!
//! `AnalyticsEvent` is a JSON object with a handful of well-known fields.
//! Unknown fields are preserved verbatim so that user steps can add anything
//! they like and still have it delivered.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::objects::get_path;

/// Field a step can set to route the event to a specific table
pub const TABLE_NAME_PARAMETER: &str = "JITSU_TABLE_NAME";

/// Kind of analytics call an event represents
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Identify,
    Group,
    Track,
    Page,
    Screen,
    Alias,
    /// Any other value of the `type` field
    Other(String),
}

impl EventType {
    /// Wire name of this type
    pub fn as_str(&self) -> &str {
        match self {
            Self::Identify => "identify",
            Self::Group => "group",
            Self::Track => "track",
            Self::Page => "page",
            Self::Screen => "screen",
            Self::Alias => "alias",
            Self::Other(s) => s,
        }
    }
}

impl FromStr for EventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "identify" => Self::Identify,
            "group" => Self::Group,
            "track" => Self::Track,
            "page" => Self::Page,
            "screen" => Self::Screen,
            "alias" => Self::Alias,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical analytics event
///
/// Cloning produces a structurally independent copy; the chain runner relies
/// on this to isolate steps from each other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalyticsEvent(Map<String, Value>);

impl AnalyticsEvent {
    /// Create an empty event
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Parse an event from JSON text
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(s)?;
        Self::try_from(value)
    }

    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(&self.0)?)
    }

    #[inline]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[inline]
    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    #[inline]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    #[inline]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Get a top-level field
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Follow a path of object keys from the top level
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        get_path(self.0.get(*first)?, rest)
    }

    /// Set a top-level field, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Remove a top-level field
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// Raw `type` field
    pub fn type_str(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// Parsed `type` field, `None` when missing or not a string
    pub fn event_type(&self) -> Option<EventType> {
        self.type_str().and_then(|s| s.parse().ok())
    }

    /// Name of a track event (`event` field)
    pub fn event_name(&self) -> Option<&str> {
        self.0.get("event").and_then(Value::as_str)
    }

    pub fn message_id(&self) -> Option<&str> {
        self.0.get("messageId").and_then(Value::as_str)
    }

    pub fn context(&self) -> Option<&Value> {
        self.0.get("context")
    }

    pub fn properties(&self) -> Option<&Value> {
        self.0.get("properties")
    }

    pub fn traits(&self) -> Option<&Value> {
        self.0.get("traits")
    }

    /// A field of `context`
    pub fn context_field(&self, key: &str) -> Option<&Value> {
        self.context()?.as_object()?.get(key)
    }

    /// Table override set by an upstream step, if it is a non-empty string
    pub fn table_name(&self) -> Option<&str> {
        self.0
            .get(TABLE_NAME_PARAMETER)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Copy of the event fields without the table override
    pub fn without_table_name(&self) -> Map<String, Value> {
        let mut map = self.0.clone();
        map.shift_remove(TABLE_NAME_PARAMETER);
        map
    }
}

impl From<Map<String, Value>> for AnalyticsEvent {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for AnalyticsEvent {
    type Error = ProtocolError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ProtocolError::not_an_object(&other)),
        }
    }
}

impl From<AnalyticsEvent> for Value {
    fn from(event: AnalyticsEvent) -> Self {
        event.into_value()
    }
}
