//! Noop Step - Pass-through function
//!
//! Useful for testing chain plumbing and as a placeholder in configs.

use crate::{FunctionError, InvocationContext, Step, StepOutput};
use ferry_config::{FunctionInstanceConfig, RetryPolicy};
use ferry_protocol::AnalyticsEvent;
use std::future::Future;
use std::pin::Pin;


/// A step that passes events through unchanged
#[derive(Debug, Clone, Default)]
pub struct NoopStep {
    id: String,
    enabled: bool,
    retry_policy: Option<RetryPolicy>,
}

impl NoopStep {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            retry_policy: None,
        }
    }

    pub fn from_config(config: &FunctionInstanceConfig) -> Self {
        Self {
            id: config.id.clone(),
            enabled: config.enabled,
            retry_policy: config.retry_policy(),
        }
    }
}

impl Step for NoopStep {
    fn apply<'a>(
        &'a self,
        _event: AnalyticsEvent,
        _ctx: &'a InvocationContext,
    ) -> Pin<Box<dyn Future<Output = Result<StepOutput, FunctionError>> + Send + 'a>> {
        Box::pin(async move { Ok(StepOutput::Unchanged) })
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
}
