//! Filter Step - Drop unwanted events
//!
//! Drops (or keeps only) events whose fields match a set of conditions,
//! e.g. bot traffic or internal test accounts.
//!
//! # Configuration
//!
//! | Option | Type | Default | Description |
//! |--------|------|---------|-------------|
//! | `action` | string | `"drop"` | Action when conditions match: `drop` or `keep` |
//! | `match` | string | `"all"` | How to combine conditions: `all` (AND) or `any` (OR) |
//! | `field`/`operator`/`value` | | | Single-condition shorthand |
//! | `conditions` | array | | List of conditions to evaluate |
//!
//! ## Operators
//!
//! | Operator | Description |
//! |----------|-------------|
//! | `eq` | Equal to value; `5` and `"5"` differ |
//! | `ne` | Not equal to value, or missing |
//! | `contains` | String contains value |
//! | `starts_with` | String starts with value |
//! | `ends_with` | String ends with value |
//! | `regex` | Matches regex pattern |
//! | `exists` | Field exists (value ignored) |
//! | `gt` | Greater than; numeric fields only |
//! | `lt` | Less than (numeric) |
//! | `gte` | Greater than or equal (numeric) |
//! | `lte` | Less than or equal (numeric) |
//!
//! # TOML Examples
//!
//! ```toml
//! # Drop bot traffic
//! [[functions]]
//! id = "drop-bots"
//! type = "filter"
//! field = "context.userAgent"
//! operator = "contains"
//! value = "bot"
//! ```
//!
//! ```toml
//! # Keep only purchases from production
//! [[functions]]
//! id = "purchases"
//! type = "filter"
//! action = "keep"
//!
//! [[functions.conditions]]
//! field = "event"
//! value = "Order Completed"
//!
//! [[functions.conditions]]
//! field = "context.page.host"
//! operator = "ends_with"
//! value = "example.com"
//! ```

mod config;

pub use config::{Condition, FilterAction, FilterConfig, MatchMode, Predicate};

use crate::registry::StepFactory;
use crate::{FunctionError, InvocationContext, Step, StepOutput, TransformError, TransformResult};
use ferry_config::{FunctionInstanceConfig, RetryPolicy};
use ferry_protocol::AnalyticsEvent;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Metrics for the filter step
#[derive(Debug, Default)]
pub struct FilterMetrics {
    pub events_received: AtomicU64,
    /// Events passed (not filtered)
    pub events_passed: AtomicU64,
    pub events_dropped: AtomicU64,
}

impl FilterMetrics {
    /// Get drop rate (0.0 - 1.0)
    pub fn drop_rate(&self) -> f64 {
        let received = self.events_received.load(Ordering::Relaxed);
        let dropped = self.events_dropped.load(Ordering::Relaxed);
        if received == 0 {
            0.0
        } else {
            dropped as f64 / received as f64
        }
    }
}

/// Filter step
///
/// Stateless apart from its counters.
pub struct FilterStep {
    id: String,
    config: FilterConfig,
    retry_policy: Option<RetryPolicy>,
    metrics: FilterMetrics,
}

impl FilterStep {
    /// Create a new filter step
    pub fn new(id: impl Into<String>, config: FilterConfig) -> TransformResult<Self> {
        config.validate().map_err(TransformError::config)?;

        Ok(Self {
            id: id.into(),
            config,
            retry_policy: None,
            metrics: FilterMetrics::default(),
        })
    }

    pub fn with_retry_policy(mut self, policy: Option<RetryPolicy>) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn metrics(&self) -> &FilterMetrics {
        &self.metrics
    }

    /// Whether an event survives this filter
    fn keep(&self, event: &AnalyticsEvent) -> bool {
        self.metrics.events_received.fetch_add(1, Ordering::Relaxed);

        let matches = self.config.matches(event);
        let keep = match self.config.action {
            FilterAction::Drop => !matches,
            FilterAction::Keep => matches,
        };

        if keep {
            self.metrics.events_passed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics.events_dropped.fetch_add(1, Ordering::Relaxed);
        }
        keep
    }
}

impl Step for FilterStep {
    fn apply<'a>(
        &'a self,
        event: AnalyticsEvent,
        ctx: &'a InvocationContext,
    ) -> Pin<Box<dyn Future<Output = Result<StepOutput, FunctionError>> + Send + 'a>> {
        Box::pin(async move {
            if self.keep(&event) {
                Ok(StepOutput::Unchanged)
            } else {
                ctx.log().debug(format!(
                    "filtered out {} event {}",
                    event.type_str().unwrap_or("unknown"),
                    event.message_id().unwrap_or_default()
                ));
                Ok(StepOutput::Drop)
            }
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry_policy.as_ref()
    }
}

impl std::fmt::Debug for FilterStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterStep")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// Factory for creating filter steps
#[derive(Debug, Clone, Copy)]
pub struct FilterFactory;

impl StepFactory for FilterFactory {
    fn create(&self, config: &FunctionInstanceConfig) -> TransformResult<Box<dyn Step>> {
        let filter_config = FilterConfig::try_from(config)
            .map_err(|e| TransformError::config(format!("function '{}': {}", config.id, e)))?;
        let step = FilterStep::new(config.id.clone(), filter_config)?
            .with_retry_policy(config.retry_policy());
        Ok(Box::new(step))
    }

    fn name(&self) -> &'static str {
        "filter"
    }

    fn default_config(&self) -> Option<HashMap<String, toml::Value>> {
        let mut config = HashMap::new();
        config.insert("action".to_string(), toml::Value::String("drop".to_string()));
        config.insert("match".to_string(), toml::Value::String("all".to_string()));
        Some(config)
    }
}
