//! Ferry - Sinks
//!
//! Warehouse delivery for Ferry. The only destination is Bulker, which sits
//! at the end of every function chain.
//!
//! ```text
//! [Chain] --AnalyticsEvent--> [BulkerDestination] --layout--> rows --HTTP--> [Bulker]
//! ```
//!
//! # Data Layouts
//!
//! | Layout | Tables |
//! |--------|--------|
//! | `segment` | `identifies`, `pages`, `tracks`, `groups`, one per track event name |
//! | `segment-single-table` | `events` |
//! | `jitsu-legacy` | `events`, classic flat schema |
//! | `passthrough` | `events`, event unchanged |
//!
//! # Example
//!
//! ```ignore
//! use ferry_config::BulkerConfig;
//! use ferry_sinks::BulkerDestination;
//! use ferry_transform::Chain;
//!
//! let destination = BulkerDestination::new(BulkerConfig::new(endpoint, "warehouse", token), None)?;
//! let mut steps = registry.build_steps(&config.functions)?;
//! steps.push(Box::new(destination));
//! let chain = Chain::new(steps);
//! ```

/// Bulker destination - data layouts and HTTP delivery
pub mod bulker;

mod common;

pub use bulker::{
    BULKER_FUNCTION_ID, BulkerDestination, LayoutOptions, MAX_PAYLOAD_BYTES, MetricsMeta, map_event,
};
pub use common::{MetricsSnapshot, SinkError, SinkMetrics};
