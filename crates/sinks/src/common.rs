//! Common types for destinations
//!
//! Delivery counters and construction errors.

use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Delivery metrics for a destination
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Events handed to the destination
    pub events_received: AtomicU64,

    /// Rows accepted by the warehouse
    pub rows_delivered: AtomicU64,

    /// Payload bytes of delivered rows
    pub bytes_delivered: AtomicU64,

    /// Failed deliveries (network, HTTP status)
    pub delivery_errors: AtomicU64,

    /// Rows rejected by the size guard
    pub oversized_rows: AtomicU64,
}

impl SinkMetrics {
    pub const fn new() -> Self {
        Self {
            events_received: AtomicU64::new(0),
            rows_delivered: AtomicU64::new(0),
            bytes_delivered: AtomicU64::new(0),
            delivery_errors: AtomicU64::new(0),
            oversized_rows: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a row accepted by the warehouse
    #[inline]
    pub fn row_delivered(&self, bytes: u64) {
        self.rows_delivered.fetch_add(1, Ordering::Relaxed);
        self.bytes_delivered.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn delivery_error(&self) {
        self.delivery_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn oversized_row(&self) {
        self.oversized_rows.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            rows_delivered: self.rows_delivered.load(Ordering::Relaxed),
            bytes_delivered: self.bytes_delivered.load(Ordering::Relaxed),
            delivery_errors: self.delivery_errors.load(Ordering::Relaxed),
            oversized_rows: self.oversized_rows.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.events_received.store(0, Ordering::Relaxed);
        self.rows_delivered.store(0, Ordering::Relaxed);
        self.bytes_delivered.store(0, Ordering::Relaxed);
        self.delivery_errors.store(0, Ordering::Relaxed);
        self.oversized_rows.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time snapshot of destination metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub rows_delivered: u64,
    pub bytes_delivered: u64,
    pub delivery_errors: u64,
    pub oversized_rows: u64,
}

/// Destination construction errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Invalid destination configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP client could not be built
    #[error("failed to initialize destination: {0}")]
    Init(String),
}

impl SinkError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
