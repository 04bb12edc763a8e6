//! Table-scoped rows produced by a data layout

use serde::Serialize;
use serde_json::{Map, Value};

/// Table used when neither the layout nor the event names one
pub const DEFAULT_TABLE: &str = "events";

/// One row destined for one logical table
///
/// The table name is never empty: an empty name falls back to
/// [`DEFAULT_TABLE`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedEvent {
    event: Map<String, Value>,
    table: String,
}

impl MappedEvent {
    pub fn new(event: Map<String, Value>, table: impl Into<String>) -> Self {
        let mut table = table.into();
        if table.is_empty() {
            table = DEFAULT_TABLE.to_string();
        }
        Self { event, table }
    }

    /// Row payload
    #[inline]
    pub fn event(&self) -> &Map<String, Value> {
        &self.event
    }

    /// Destination table
    #[inline]
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn into_parts(self) -> (Map<String, Value>, String) {
        (self.event, self.table)
    }
}
