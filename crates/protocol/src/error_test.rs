//! Tests for protocol error types

use serde_json::json;

use crate::error::ProtocolError;
use crate::AnalyticsEvent;

#[test]
fn test_not_an_object_names_the_kind() {
    let err = ProtocolError::not_an_object(&json!([1, 2]));
    assert!(matches!(err, ProtocolError::NotAnObject("an array")));
    assert_eq!(err.to_string(), "expected a JSON object, got an array");
}

#[test]
fn test_event_from_non_object_json() {
    let err = AnalyticsEvent::from_json("\"track\"").unwrap_err();
    assert!(matches!(err, ProtocolError::NotAnObject("a string")));
}

#[test]
fn test_event_from_invalid_json() {
    let err = AnalyticsEvent::from_json("{not json").unwrap_err();
    assert!(matches!(err, ProtocolError::Json(_)));
    assert!(err.to_string().starts_with("invalid JSON"));
}
