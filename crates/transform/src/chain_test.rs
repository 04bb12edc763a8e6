//! Tests for the function chain

use super::*;
use crate::log::Level;
use crate::test_util::{recording_context, test_context};
use ferry_config::RetryPolicy;
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

type StepFn = dyn Fn(AnalyticsEvent, &InvocationContext) -> Result<StepOutput, FunctionError>
    + Send
    + Sync;

struct FnStep {
    id: String,
    f: Box<StepFn>,
    retry_policy: Option<RetryPolicy>,
    enabled: bool,
    fail_close: bool,
    closed: AtomicUsize,
}

impl FnStep {
    fn new(
        id: &str,
        f: impl Fn(AnalyticsEvent, &InvocationContext) -> Result<StepOutput, FunctionError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.to_string(),
            f: Box::new(f),
            retry_policy: None,
            enabled: true,
            fail_close: false,
            closed: AtomicUsize::new(0),
        }
    }

    fn with_retry_policy(mut self, delays: Vec<u32>) -> Self {
        self.retry_policy = Some(RetryPolicy::new(delays));
        self
    }

    fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn boxed(self) -> Box<dyn Step> {
        Box::new(self)
    }
}

impl Step for FnStep {
    fn apply<'a>(
        &'a self,
        event: AnalyticsEvent,
        ctx: &'a InvocationContext,
    ) -> Pin<Box<dyn Future<Output = Result<StepOutput, FunctionError>> + Send + 'a>> {
        let result = (self.f)(event, ctx);
        Box::pin(async move { result })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry_policy.as_ref()
    }

    fn close(&self) -> TransformResult<()> {
        self.closed.fetch_add(1, Ordering::Relaxed);
        if self.fail_close {
            return Err(crate::TransformError::failed(format!("{} close failed", self.id)));
        }
        Ok(())
    }
}

fn event(name: &str) -> AnalyticsEvent {
    AnalyticsEvent::try_from(json!({"type": "track", "event": name, "messageId": "m1"})).unwrap()
}

fn rename(name: &'static str) -> impl Fn(AnalyticsEvent, &InvocationContext) -> Result<StepOutput, FunctionError> {
    move |mut e, _| {
        e.insert("event", json!(name));
        Ok(StepOutput::Event(e))
    }
}

fn fan_out(count: usize) -> impl Fn(AnalyticsEvent, &InvocationContext) -> Result<StepOutput, FunctionError> {
    move |e, _| Ok(StepOutput::Events(vec![e; count]))
}

#[tokio::test]
async fn test_empty_chain_passes_through() {
    let chain = Chain::empty();
    assert!(chain.is_empty());

    let output = chain.run(event("a"), &test_context()).await.unwrap();
    assert_eq!(output, ChainOutput::Single(event("a")));
}

#[tokio::test]
async fn test_steps_run_in_order() {
    let chain = Chain::new(vec![
        FnStep::new("first", rename("b")).boxed(),
        FnStep::new("second", |mut e, _| {
            let seen = e.event_name().unwrap_or_default().to_string();
            e.insert("seen", json!(seen));
            Ok(StepOutput::Event(e))
        })
        .boxed(),
    ]);

    let output = chain.run(event("a"), &test_context()).await.unwrap();
    let ChainOutput::Single(out) = output else {
        panic!("expected a single event");
    };
    assert_eq!(out.event_name(), Some("b"));
    assert_eq!(out.get("seen"), Some(&json!("b")));
}

#[tokio::test]
async fn test_unchanged_ignores_mutations_of_the_copy() {
    let chain = Chain::new(vec![
        FnStep::new("mutate", |mut e, _| {
            e.insert("event", json!("mutated"));
            e.remove("messageId");
            Ok(StepOutput::Unchanged)
        })
        .boxed(),
    ]);

    let output = chain.run(event("a"), &test_context()).await.unwrap();
    assert_eq!(output, ChainOutput::Single(event("a")));
}

#[tokio::test]
async fn test_drop_removes_event_without_error() {
    for marker in [json!("drop"), json!([]), json!(null), json!(false)] {
        let chain = Chain::new(vec![
            FnStep::new("dropper", move |_, _| StepOutput::from_value(marker.clone())).boxed(),
            FnStep::new("never", |_, _| panic!("dropped event reached the next step")).boxed(),
        ]);

        let result = chain.run_chain(event("a"), &test_context()).await.unwrap();
        assert!(result.events.is_empty());
        assert!(result.exec_log.is_empty());

        let output = chain.run(event("a"), &test_context()).await.unwrap();
        assert_eq!(output, ChainOutput::Many(vec![]));
    }
}

#[tokio::test]
async fn test_non_terminal_fan_out_aborts() {
    let chain = Chain::new(vec![
        FnStep::new("split", fan_out(2)).boxed(),
        FnStep::new("after", rename("x")).boxed(),
        FnStep::new("last", rename("y")).boxed(),
    ]);

    let err = chain.run(event("a"), &test_context()).await.unwrap_err();
    match &err {
        ChainError::Multiplication {
            function_id,
            position,
            total,
            count,
        } => {
            assert_eq!(function_id, "split");
            assert_eq!(*position, 1);
            assert_eq!(*total, 3);
            assert_eq!(*count, 2);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().contains("Only the last function in a chain"));
}

#[tokio::test]
async fn test_non_terminal_single_element_events_is_fine() {
    let chain = Chain::new(vec![
        FnStep::new("one", fan_out(1)).boxed(),
        FnStep::new("last", rename("z")).boxed(),
    ]);

    let output = chain.run(event("a"), &test_context()).await.unwrap();
    assert!(matches!(output, ChainOutput::Single(ref e) if e.event_name() == Some("z")));
}

#[tokio::test]
async fn test_terminal_fan_out_returns_many() {
    let chain = Chain::new(vec![
        FnStep::new("first", rename("b")).boxed(),
        FnStep::new("split", fan_out(3)).boxed(),
    ]);

    let output = chain.run(event("a"), &test_context()).await.unwrap();
    match output {
        ChainOutput::Many(events) => {
            assert_eq!(events.len(), 3);
            assert!(events.iter().all(|e| e.event_name() == Some("b")));
        }
        other => panic!("unexpected output {other:?}"),
    }
}

#[tokio::test]
async fn test_unclassified_error_is_logged_not_thrown() {
    let chain = Chain::new(vec![
        FnStep::new("broken", |_, _| Err(FunctionError::other("boom")))
            .with_retry_policy(vec![1])
            .boxed(),
        FnStep::new("never", |_, _| panic!("failed event reached the next step")).boxed(),
    ]);
    let (ctx, log) = recording_context();

    let result = chain.run_chain(event("a"), &ctx).await.unwrap();
    assert!(result.events.is_empty());
    assert_eq!(
        result.exec_log,
        vec![ExecLogEntry {
            function_id: "broken".into(),
            error: FunctionError::other("boom"),
            retry_policy: Some(RetryPolicy::new(vec![1])),
        }]
    );

    let output = chain.run(event("a"), &ctx).await.unwrap();
    assert_eq!(output, ChainOutput::Many(vec![]));

    let lines = log.lines.lock();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].0, Level::Error);
    assert_eq!(lines[0].1, "broken");
    assert!(lines[0].2.contains("boom"));
}

#[tokio::test]
async fn test_retry_error_is_promoted_with_inbound_event() {
    let chain = Chain::new(vec![
        FnStep::new("first", rename("changed")).boxed(),
        FnStep::new("dest", |_, _| Err(FunctionError::retry("HTTP Error: 503 ")))
            .with_retry_policy(vec![5, 60])
            .boxed(),
    ]);

    let err = chain.run(event("a"), &test_context()).await.unwrap_err();
    assert!(err.should_redeliver());
    assert_eq!(err.function_id(), "dest");
    assert_eq!(err.retry_policy(), Some(&RetryPolicy::new(vec![5, 60])));
    match err {
        ChainError::Failed { error, events, .. } => {
            assert_eq!(error, FunctionError::retry("HTTP Error: 503 "));
            assert_eq!(events, vec![event("a")]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_drop_and_retry_is_promoted_but_not_redelivered() {
    let chain = Chain::new(vec![
        FnStep::new("guard", |_, _| Err(FunctionError::drop_and_retry("too big")))
            .with_retry_policy(vec![5])
            .boxed(),
    ]);

    let result = chain.run_chain(event("a"), &test_context()).await.unwrap();
    assert!(result.events.is_empty());
    assert_eq!(result.exec_log.len(), 1);
    assert_eq!(result.exec_log[0].retry_policy, None);

    let err = chain.run(event("a"), &test_context()).await.unwrap_err();
    assert!(!err.should_redeliver());
    assert!(matches!(
        err,
        ChainError::Failed {
            error: FunctionError::DropAndRetry { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_http_error_is_not_promoted() {
    let chain = Chain::new(vec![
        FnStep::new("call", |_, _| {
            Err(FunctionError::Http {
                status: 500,
                status_text: "Internal Server Error".into(),
                response: "oops".into(),
            })
        })
        .boxed(),
    ]);

    let output = chain.run(event("a"), &test_context()).await.unwrap();
    assert!(output.is_empty());
}

#[tokio::test]
async fn test_step_context_is_scoped_to_step() {
    let chain = Chain::new(vec![
        FnStep::new("scoped", |mut e, ctx| {
            e.insert("fn", json!(ctx.function_id()));
            ctx.log().info("ran");
            Ok(StepOutput::Event(e))
        })
        .boxed(),
    ]);
    let (ctx, log) = recording_context();

    let output = chain.run(event("a"), &ctx).await.unwrap();
    let ChainOutput::Single(out) = output else {
        panic!("expected a single event");
    };
    assert_eq!(out.get("fn"), Some(&json!("scoped")));
    assert_eq!(log.lines.lock()[0].1, "scoped");
}

#[test]
fn test_disabled_steps_are_filtered() {
    let chain = Chain::new(vec![
        FnStep::new("a", rename("a")).boxed(),
        FnStep::new("b", rename("b")).disabled().boxed(),
        FnStep::new("c", rename("c")).boxed(),
    ]);

    assert_eq!(chain.len(), 2);
    assert_eq!(chain.ids(), vec!["a", "c"]);
    assert!(chain.get("a").is_some());
    assert!(chain.get("b").is_none());
}

#[test]
fn test_close_reaches_every_step() {
    let mut failing = FnStep::new("failing", rename("x"));
    failing.fail_close = true;

    let chain = Chain::new(vec![failing.boxed(), FnStep::new("ok", rename("y")).boxed()]);
    let err = chain.close().unwrap_err();
    assert_eq!(err.to_string(), "transform failed: failing close failed");

    assert!(Chain::default().close().is_ok());
}
