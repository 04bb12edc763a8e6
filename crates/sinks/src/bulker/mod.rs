//! Bulker destination
//!
//! The terminal step of every chain. Maps each event to table rows with the
//! configured [`DataLayout`](ferry_config::DataLayout) and POSTs every row
//! to Bulker, the warehouse loader:
//!
//! ```text
//! POST {bulker_endpoint}/post/{destination_id}?tableName={table}
//! Authorization: Bearer {auth_token}
//! metricsMeta: {"workspaceId":..,"streamId":..,"destinationId":..,"connectionId":..,"functionId":"builtin.destination.bulker"}
//! ```
//!
//! Rows are sent one at a time and delivery stops at the first failure.
//! Every failure is reported as retryable, except rows over
//! [`MAX_PAYLOAD_BYTES`] which are dropped by default since redelivery
//! cannot make them smaller.
//!
//! # Example
//!
//! ```toml
//! [destination]
//! bulker_endpoint = "http://bulker:3042"
//! destination_id = "warehouse"
//! auth_token = "secret"
//! data_layout = "segment"
//! ```

mod layout;

pub use layout::{LayoutOptions, map_event, plural};

use std::future::Future;
use std::pin::Pin;

use ferry_config::{BulkerConfig, OversizedPayloadPolicy, RetryPolicy, validate_destination};
use ferry_protocol::objects::truthy;
use ferry_protocol::{AnalyticsEvent, MappedEvent, Value};
use ferry_transform::{
    FetchExtras, FetchRequest, FunctionError, InvocationContext, Step, StepOutput,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::common::{SinkError, SinkMetrics};

#[cfg(test)]
#[path = "bulker_test.rs"]
mod tests;

/// Function id reported in logs and metrics metadata
pub const BULKER_FUNCTION_ID: &str = "builtin.destination.bulker";

/// Largest serialized row Bulker accepts
pub const MAX_PAYLOAD_BYTES: usize = 1_000_000;

/// Error responses are cut to this many bytes
pub const MAX_RESPONSE_BYTES: usize = 1000;

/// Characters of an oversized row quoted in the error
const PAYLOAD_PREVIEW_CHARS: usize = 256;

/// Metadata header attached to every Bulker request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsMeta {
    pub workspace_id: String,
    pub stream_id: String,
    pub destination_id: String,
    pub connection_id: String,
    pub function_id: &'static str,
}

/// Destination that loads events into a warehouse through Bulker
pub struct BulkerDestination {
    config: BulkerConfig,
    options: LayoutOptions,
    retry_policy: Option<RetryPolicy>,
    metrics: SinkMetrics,
}

impl BulkerDestination {
    /// Create a destination
    ///
    /// `destination_type` decides key naming for the `jitsu-legacy` layout.
    ///
    /// # Errors
    ///
    /// Returns error if a required setting is missing or the endpoint is not a URL
    pub fn new(config: BulkerConfig, destination_type: Option<&str>) -> Result<Self, SinkError> {
        validate_destination(&config).map_err(|e| SinkError::config(e.to_string()))?;

        let options = LayoutOptions::for_destination(destination_type, config.keep_original_names);
        Ok(Self {
            config,
            options,
            retry_policy: None,
            metrics: SinkMetrics::new(),
        })
    }

    pub fn with_retry_policy(mut self, policy: Option<RetryPolicy>) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn config(&self) -> &BulkerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    /// Rows this destination would send for an event
    pub fn map(&self, event: &AnalyticsEvent) -> Vec<MappedEvent> {
        self.map_with(event, &self.options)
    }

    /// Rows this destination sends for an event within an invocation
    ///
    /// Unlike [`map`](Self::map), picks up the request user agent from `ctx`.
    pub fn rows(&self, event: &AnalyticsEvent, ctx: &InvocationContext) -> Vec<MappedEvent> {
        match ctx.user_agent() {
            Some(ua) => self.map_with(event, &self.options.clone().with_user_agent(Some(ua.clone()))),
            None => self.map_with(event, &self.options),
        }
    }

    fn map_with(&self, event: &AnalyticsEvent, options: &LayoutOptions) -> Vec<MappedEvent> {
        let mut event = event.clone();
        normalize_ga4(&mut event);
        map_event(self.config.data_layout, &event, options)
    }

    /// Deliver every row of an event
    ///
    /// Returns the event it was given.
    ///
    /// # Errors
    ///
    /// Returns the first delivery failure; rows after it are not sent
    pub async fn send(
        &self,
        event: AnalyticsEvent,
        ctx: &InvocationContext,
    ) -> Result<AnalyticsEvent, FunctionError> {
        self.metrics.event_received();

        let meta = self.metrics_meta(ctx);
        let meta = serde_json::to_string(&meta)
            .map_err(|e| FunctionError::other(e.to_string()).into_retry())?;

        for row in self.rows(&event, ctx) {
            self.deliver(row, &meta, ctx).await?;
        }
        Ok(event)
    }

    fn metrics_meta(&self, ctx: &InvocationContext) -> MetricsMeta {
        let connection = ctx.connection();
        let destination_id = if connection.destination_id.is_empty() {
            self.config.destination_id.clone()
        } else {
            connection.destination_id.clone()
        };
        MetricsMeta {
            workspace_id: connection.workspace_id.clone(),
            stream_id: connection.stream_id.clone(),
            destination_id,
            connection_id: connection.connection_id.clone(),
            function_id: BULKER_FUNCTION_ID,
        }
    }

    fn url(&self, table: &str) -> String {
        let table: String = url::form_urlencoded::byte_serialize(table.as_bytes()).collect();
        format!(
            "{}/post/{}?tableName={}",
            self.config.bulker_endpoint.trim_end_matches('/'),
            self.config.destination_id,
            table
        )
    }

    async fn deliver(
        &self,
        row: MappedEvent,
        meta: &str,
        ctx: &InvocationContext,
    ) -> Result<(), FunctionError> {
        let (row, table) = row.into_parts();
        let payload = serde_json::to_string(&row)
            .map_err(|e| FunctionError::other(e.to_string()).into_retry())?;

        if payload.len() > MAX_PAYLOAD_BYTES {
            self.metrics.oversized_row();
            let preview: String = payload.chars().take(PAYLOAD_PREVIEW_CHARS).collect();
            let message = format!(
                "Max allowed size is 1 000 000 bytes. Event size is: {} bytes: \n{}...",
                payload.len(),
                preview
            );
            warn!(table = %table, size = payload.len(), "row exceeds bulker payload limit");
            return Err(match self.config.oversized_payload {
                OversizedPayloadPolicy::Drop => FunctionError::drop_and_retry(message),
                OversizedPayloadPolicy::Retry => FunctionError::other(message).into_retry(),
            });
        }

        let size = payload.len() as u64;
        let request = FetchRequest::post(self.url(&table), payload)
            .with_header("Authorization", format!("Bearer {}", self.config.auth_token))
            .with_header("metricsMeta", meta)
            .with_header("Content-Type", "application/json");

        let response = match ctx.fetch().fetch(request, Some(FetchExtras::silent())).await {
            Ok(response) => response,
            Err(e) => {
                self.metrics.delivery_error();
                return Err(FunctionError::from(e).into_retry());
            }
        };

        if !response.ok() {
            self.metrics.delivery_error();
            return Err(FunctionError::Http {
                status: response.status,
                status_text: response.status_text.clone(),
                response: truncate_response(response.text()),
            }
            .into_retry());
        }

        ctx.log().debug(format!(
            "HTTP Status: {} {} Response: {}",
            response.status,
            response.status_text,
            response.text()
        ));
        debug!(table = %table, bytes = size, "row delivered");
        self.metrics.row_delivered(size);
        Ok(())
    }
}

impl Step for BulkerDestination {
    fn apply<'a>(
        &'a self,
        event: AnalyticsEvent,
        ctx: &'a InvocationContext,
    ) -> Pin<Box<dyn Future<Output = Result<StepOutput, FunctionError>> + Send + 'a>> {
        Box::pin(async move {
            self.send(event, ctx).await?;
            Ok(StepOutput::Unchanged)
        })
    }

    fn id(&self) -> &str {
        BULKER_FUNCTION_ID
    }

    fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry_policy.as_ref()
    }
}

impl std::fmt::Debug for BulkerDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkerDestination")
            .field("endpoint", &self.config.bulker_endpoint)
            .field("destination_id", &self.config.destination_id)
            .field("data_layout", &self.config.data_layout)
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// Store GA4 session ids as a JSON string
///
/// Older clients send them under `sessions`, which is renamed.
pub fn normalize_ga4(event: &mut AnalyticsEvent) {
    let Some(Value::Object(ga4)) = event
        .as_map_mut()
        .get_mut("context")
        .and_then(|c| c.get_mut("clientIds"))
        .and_then(|c| c.get_mut("ga4"))
    else {
        return;
    };

    let session_ids = match ga4.get("sessionIds") {
        Some(ids) if truthy(ids) => Some(ids.clone()),
        _ => match ga4.get("sessions") {
            Some(sessions) if truthy(sessions) => {
                let sessions = sessions.clone();
                ga4.shift_remove("sessions");
                Some(sessions)
            }
            _ => None,
        },
    };

    match session_ids {
        Some(Value::String(s)) => {
            ga4.insert("sessionIds".into(), Value::String(s));
        }
        Some(ids) => {
            ga4.insert("sessionIds".into(), Value::String(ids.to_string()));
        }
        None => {}
    }
}

/// Cut a response body to [`MAX_RESPONSE_BYTES`] on a char boundary
pub fn truncate_response(body: &str) -> String {
    if body.len() <= MAX_RESPONSE_BYTES {
        return body.to_string();
    }
    let mut end = MAX_RESPONSE_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
