//! Ferry Protocol - Core event types for the Ferry delivery pipeline
//!
//! This crate provides the types that flow between user functions and
//! destinations:
//! - `AnalyticsEvent` - Canonical nested analytics event
//! - `MappedEvent` - A destination row paired with its target table
//! - `UserAgent` - Parsed user agent supplied by the host
//! - `to_classic` / `from_classic` - Codec for the flat legacy schema
//!
//! # Design Principles
//!
//! - **Order-preserving**: Event fields keep their insertion order so rows
//!   serialize the way users wrote them
//! - **Lossless by default**: Unknown fields are carried through untouched
//! - **Borrow when possible**: Key conversions return `Cow` and only
//!   allocate when a key actually changes

mod classic;
mod error;
mod event;
mod mapped;
pub mod objects;
pub mod strings;
mod user_agent;

pub use classic::{ClassicOptions, DEFAULT_SRC, FILE_STORAGE_DESTINATIONS, from_classic, to_classic};
pub use error::ProtocolError;
pub use event::{AnalyticsEvent, EventType, TABLE_NAME_PARAMETER};
pub use mapped::{DEFAULT_TABLE, MappedEvent};
pub use objects::KeyCase;
pub use user_agent::{Device, Software, UserAgent};

// Re-export serde_json so dependents agree on the JSON types
pub use serde_json::{Map, Value};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod error_test;
