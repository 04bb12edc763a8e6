//! Connection identity
//!
//! Identifies the workspace, stream and connection an invocation belongs to.
//! These ids are only used for correlation: they travel to Bulker in the
//! `metricsMeta` header and decide key naming for file-storage destinations.

use serde::Deserialize;

/// Connection identity for one source → destination link
///
/// ```toml
/// [connection]
/// workspace_id = "ws_1"
/// stream_id = "js_site"
/// connection_id = "conn_1"
/// destination_type = "postgres"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionConfig {
    #[serde(alias = "workspaceId")]
    pub workspace_id: String,

    #[serde(alias = "streamId")]
    pub stream_id: String,

    #[serde(alias = "connectionId")]
    pub connection_id: String,

    /// Destination kind, e.g. "postgres", "s3"
    #[serde(alias = "destinationType")]
    pub destination_type: Option<String>,
}
