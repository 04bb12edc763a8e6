//! Tests for common destination types

use crate::{MetricsSnapshot, SinkError, SinkMetrics};

#[test]
fn test_metrics_new() {
    assert_eq!(SinkMetrics::new().snapshot(), MetricsSnapshot::default());
}

#[test]
fn test_metrics_tracking() {
    let metrics = SinkMetrics::new();

    metrics.event_received();
    metrics.event_received();
    metrics.row_delivered(100);
    metrics.row_delivered(250);
    metrics.delivery_error();
    metrics.oversized_row();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.events_received, 2);
    assert_eq!(snapshot.rows_delivered, 2);
    assert_eq!(snapshot.bytes_delivered, 350);
    assert_eq!(snapshot.delivery_errors, 1);
    assert_eq!(snapshot.oversized_rows, 1);
}

#[test]
fn test_metrics_reset() {
    let metrics = SinkMetrics::new();
    metrics.event_received();
    metrics.row_delivered(10);

    metrics.reset();
    assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
}

#[test]
fn test_error_display() {
    assert_eq!(
        SinkError::config("missing bulker endpoint").to_string(),
        "configuration error: missing bulker endpoint"
    );
    assert!(SinkError::init("tls").to_string().contains("tls"));
}
