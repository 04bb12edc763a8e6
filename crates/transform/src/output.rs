//! Step and chain results

use ferry_config::RetryPolicy;
use ferry_protocol::AnalyticsEvent;
use serde_json::Value;

use crate::FunctionError;

#[cfg(test)]
#[path = "output_test.rs"]
mod tests;

/// What a step did with one event
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StepOutput {
    /// Pass the inbound event through untouched
    #[default]
    Unchanged,
    /// Remove the event; not an error
    Drop,
    /// Replace the event
    Event(AnalyticsEvent),
    /// Replace the event with zero or more events
    Events(Vec<AnalyticsEvent>),
}

impl StepOutput {
    /// Interpret a raw JSON value returned by a step
    ///
    /// `"drop"`, `[]`, `null` and `false` mean drop. An object replaces the
    /// event, an array of objects replaces it with several events.
    pub fn from_value(value: Value) -> Result<Self, FunctionError> {
        match value {
            Value::Null | Value::Bool(false) => Ok(Self::Drop),
            Value::String(s) if s == "drop" => Ok(Self::Drop),
            Value::Array(items) if items.is_empty() => Ok(Self::Drop),
            Value::Object(map) => Ok(Self::Event(map.into())),
            Value::Array(items) => items
                .into_iter()
                .map(|item| {
                    AnalyticsEvent::try_from(item)
                        .map_err(|e| FunctionError::other(format!("invalid function result: {e}")))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Events),
            other => Err(FunctionError::other(format!(
                "invalid function result: expected an event, got {other}"
            ))),
        }
    }

    /// Whether the event is removed
    pub fn is_drop(&self) -> bool {
        match self {
            Self::Drop => true,
            Self::Events(events) => events.is_empty(),
            _ => false,
        }
    }
}

impl From<AnalyticsEvent> for StepOutput {
    fn from(event: AnalyticsEvent) -> Self {
        Self::Event(event)
    }
}

impl From<Vec<AnalyticsEvent>> for StepOutput {
    fn from(events: Vec<AnalyticsEvent>) -> Self {
        Self::Events(events)
    }
}

/// One failed (step, event) pair
#[derive(Debug, Clone, PartialEq)]
pub struct ExecLogEntry {
    pub function_id: String,
    pub error: FunctionError,
    pub retry_policy: Option<RetryPolicy>,
}

/// State after running every step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainResult {
    /// Surviving events in order
    pub events: Vec<AnalyticsEvent>,
    pub exec_log: Vec<ExecLogEntry>,
}

/// Final result of an invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutput {
    /// Exactly one event survived
    Single(AnalyticsEvent),
    /// Zero or several events survived
    Many(Vec<AnalyticsEvent>),
}

impl ChainOutput {
    pub fn from_events(mut events: Vec<AnalyticsEvent>) -> Self {
        if events.len() == 1 {
            if let Some(event) = events.pop() {
                return Self::Single(event);
            }
        }
        Self::Many(events)
    }

    /// Flatten into a list of events
    pub fn into_events(self) -> Vec<AnalyticsEvent> {
        match self {
            Self::Single(event) => vec![event],
            Self::Many(events) => events,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Many(events) => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
