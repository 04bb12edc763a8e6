//! Tests for the step registry

use super::*;
use crate::{InvocationContext, StepOutput};
use ferry_protocol::AnalyticsEvent;

struct TagFactory;

struct TagStep {
    id: String,
}

impl Step for TagStep {
    fn apply<'a>(
        &'a self,
        mut event: AnalyticsEvent,
        _ctx: &'a InvocationContext,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<StepOutput, crate::FunctionError>> + Send + 'a>,
    > {
        Box::pin(async move {
            event.insert("tag", self.id.clone().into());
            Ok(StepOutput::Event(event))
        })
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl StepFactory for TagFactory {
    fn create(&self, config: &FunctionInstanceConfig) -> TransformResult<Box<dyn Step>> {
        Ok(Box::new(TagStep {
            id: config.id.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "tag"
    }
}

#[test]
fn test_default_registry_has_builtins() {
    let registry = default_registry();
    assert!(registry.contains("noop"));
    assert!(registry.contains("filter"));
    assert_eq!(registry.available_types(), vec!["filter", "noop"]);
    assert_eq!(registry.len(), 2);

    for function_type in ferry_config::KNOWN_FUNCTION_TYPES {
        assert!(registry.contains(function_type), "{function_type} not registered");
    }
}

#[test]
fn test_register_and_create() {
    let mut registry = StepRegistry::new();
    assert!(registry.is_empty());
    registry.register("tag", TagFactory);

    let step = registry
        .create(&FunctionInstanceConfig::new("my-tag", "tag"))
        .unwrap();
    assert_eq!(step.id(), "my-tag");
}

#[test]
#[should_panic(expected = "already registered")]
fn test_register_duplicate_panics() {
    let mut registry = StepRegistry::new();
    registry.register("tag", TagFactory);
    registry.register("tag", TagFactory);
}

#[test]
fn test_try_register_duplicate() {
    let mut registry = StepRegistry::new();
    assert!(registry.try_register("tag", TagFactory));
    assert!(!registry.try_register("tag", TagFactory));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_unknown_type() {
    let registry = default_registry();
    let err = registry
        .create(&FunctionInstanceConfig::new("x", "geoip"))
        .err()
        .unwrap();
    assert_eq!(
        err.to_string(),
        "unknown function type 'geoip', available: [filter, noop]"
    );
}

#[test]
fn test_build_steps_skips_disabled_and_keeps_order() {
    let registry = default_registry();
    let mut disabled = FunctionInstanceConfig::new("off", "noop");
    disabled.enabled = false;

    let configs = vec![
        FunctionInstanceConfig::new("first", "noop"),
        disabled,
        FunctionInstanceConfig::new("bots", "filter")
            .with_option("field", "context.userAgent")
            .with_option("operator", "contains")
            .with_option("value", "bot"),
    ];

    let steps = registry.build_steps(&configs).unwrap();
    let ids: Vec<&str> = steps.iter().map(|s| s.id()).collect();
    assert_eq!(ids, vec!["first", "bots"]);
}

#[test]
fn test_build_steps_reports_invalid_config() {
    let registry = default_registry();
    let configs = vec![
        FunctionInstanceConfig::new("bad", "filter")
            .with_option("field", "event")
            .with_option("operator", "regex")
            .with_option("value", "[unclosed"),
    ];

    let err = registry.build_steps(&configs).err().unwrap();
    assert!(matches!(err, TransformError::Config(_)));
}

#[test]
fn test_default_config() {
    let registry = default_registry();
    let filter = registry.default_config("filter").unwrap();
    assert_eq!(filter.get("action").and_then(|v| v.as_str()), Some("drop"));
    assert!(registry.default_config("noop").is_none());
    assert!(registry.default_config("missing").is_none());
}
