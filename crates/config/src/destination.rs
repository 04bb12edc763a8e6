//! Bulker destination configuration
//!
//! # Example
//!
//! ```toml
//! [destination]
//! bulker_endpoint = "http://bulker:3042"
//! destination_id = "dst_pg"
//! auth_token = "secret"
//! data_layout = "segment"
//! keep_original_names = false
//! oversized_payload = "drop"
//! timeout = "30s"
//! ```
//!
//! Field names also accept their camelCase form (`bulkerEndpoint`,
//! `destinationId`, ...) so that connection options exported from the
//! console can be pasted in unchanged.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// How a canonical event is split into table rows
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DataLayout {
    /// One table per event type, plus a table per named track event
    Segment,
    /// Every event in the `events` table
    #[default]
    SegmentSingleTable,
    /// Flat classic schema in a single table
    JitsuLegacy,
    /// The event as-is
    Passthrough,
}

impl DataLayout {
    pub const ALL: [DataLayout; 4] = [
        Self::Segment,
        Self::SegmentSingleTable,
        Self::JitsuLegacy,
        Self::Passthrough,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Segment => "segment",
            Self::SegmentSingleTable => "segment-single-table",
            Self::JitsuLegacy => "jitsu-legacy",
            Self::Passthrough => "passthrough",
        }
    }

    /// Whether every row goes to one table
    pub fn is_single_table(&self) -> bool {
        !matches!(self, Self::Segment)
    }
}

impl FromStr for DataLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|layout| layout.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown data layout '{s}', expected one of: segment, segment-single-table, jitsu-legacy, passthrough"
                )
            })
    }
}

impl fmt::Display for DataLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with a row that exceeds the Bulker payload limit
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OversizedPayloadPolicy {
    /// Log the failure and drop the event; redelivery cannot shrink it
    #[default]
    Drop,
    /// Report a retryable failure like any other delivery error
    Retry,
}

/// Bulker destination settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BulkerConfig {
    /// Base URL of the Bulker service (required)
    #[serde(alias = "bulkerEndpoint")]
    pub bulker_endpoint: String,

    /// Bulker destination id (required)
    #[serde(alias = "destinationId")]
    pub destination_id: String,

    /// Bearer token for Bulker (required)
    #[serde(alias = "authToken")]
    pub auth_token: String,

    /// Default: segment-single-table
    #[serde(alias = "dataLayout")]
    pub data_layout: DataLayout,

    /// Keep property names as sent instead of snake_casing them
    /// Default: false
    #[serde(alias = "keepOriginalNames")]
    pub keep_original_names: bool,

    /// Default: drop
    #[serde(alias = "oversizedPayload")]
    pub oversized_payload: OversizedPayloadPolicy,

    /// HTTP request timeout
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for BulkerConfig {
    fn default() -> Self {
        Self {
            bulker_endpoint: String::new(),
            destination_id: String::new(),
            auth_token: String::new(),
            data_layout: DataLayout::default(),
            keep_original_names: false,
            oversized_payload: OversizedPayloadPolicy::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl BulkerConfig {
    /// Create a config with the required fields and defaults for the rest
    pub fn new(
        bulker_endpoint: impl Into<String>,
        destination_id: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            bulker_endpoint: bulker_endpoint.into(),
            destination_id: destination_id.into(),
            auth_token: auth_token.into(),
            ..Default::default()
        }
    }

    pub fn with_data_layout(mut self, data_layout: DataLayout) -> Self {
        self.data_layout = data_layout;
        self
    }

    pub fn with_keep_original_names(mut self, keep: bool) -> Self {
        self.keep_original_names = keep;
        self
    }

    pub fn with_oversized_payload(mut self, policy: OversizedPayloadPolicy) -> Self {
        self.oversized_payload = policy;
        self
    }
}
