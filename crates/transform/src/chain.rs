//! Function Chain - Sequential per-event execution
//!
//! The `Chain` runs every inbound event through its steps in order.
//!
//! # Semantics
//!
//! - **Isolation**: each step receives its own clone of the event
//! - **Drop**: a step may remove an event; that is not an error
//! - **Fan-out**: only the last step may return more than one event; an
//!   earlier step doing so aborts the whole invocation
//! - **Errors**: per-event failures are collected in an execution log; the
//!   first `Retry`/`DropAndRetry` entry becomes the invocation's error and
//!   the rest are logged

use ferry_protocol::AnalyticsEvent;
use tracing::{debug, error};

use crate::{
    ChainError, ChainOutput, ChainResult, ExecLogEntry, FunctionError, InvocationContext, Step,
    StepOutput, TransformResult,
};

#[cfg(test)]
#[path = "chain_test.rs"]
mod tests;

/// Ordered list of steps applied to every event
///
/// Only enabled steps are kept. An empty chain passes events through.
pub struct Chain {
    steps: Vec<Box<dyn Step>>,
}

impl Chain {
    /// Create a new chain from enabled steps
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        let steps = steps.into_iter().filter(|s| s.enabled()).collect();
        Self { steps }
    }

    /// Create an empty chain
    pub fn empty() -> Self {
        Self { steps: Vec::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Ids of all active steps, in order
    pub fn ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id()).collect()
    }

    /// Get a step by id
    pub fn get(&self, id: &str) -> Option<&dyn Step> {
        self.steps.iter().find(|s| s.id() == id).map(|s| s.as_ref())
    }

    /// Run every step and return the raw result
    ///
    /// Fails only on a fan-out from a non-terminal step. Step errors are
    /// returned in [`ChainResult::exec_log`].
    pub async fn run_chain(
        &self,
        event: AnalyticsEvent,
        ctx: &InvocationContext,
    ) -> Result<ChainResult, ChainError> {
        let total = self.steps.len();
        let mut events = vec![event];
        let mut exec_log = Vec::new();

        for (index, step) in self.steps.iter().enumerate() {
            let is_last = index + 1 == total;
            let step_ctx = ctx.for_function(step.id());
            let mut next = Vec::with_capacity(events.len());

            for event in events {
                match step.apply(event.clone(), &step_ctx).await {
                    Ok(StepOutput::Unchanged) => next.push(event),
                    Ok(StepOutput::Drop) => {
                        debug!(function_id = step.id(), "event dropped");
                    }
                    Ok(StepOutput::Event(replaced)) => next.push(replaced),
                    Ok(StepOutput::Events(produced)) => {
                        if produced.len() > 1 && !is_last {
                            return Err(ChainError::Multiplication {
                                function_id: step.id().to_string(),
                                position: index + 1,
                                total,
                                count: produced.len(),
                            });
                        }
                        next.extend(produced);
                    }
                    Err(err) => {
                        debug!(
                            function_id = step.id(),
                            kind = %err.kind(),
                            error = %err,
                            "function failed"
                        );
                        let retry_policy = match err {
                            FunctionError::DropAndRetry { .. } => None,
                            _ => step.retry_policy().cloned(),
                        };
                        exec_log.push(ExecLogEntry {
                            function_id: step.id().to_string(),
                            error: err,
                            retry_policy,
                        });
                    }
                }
            }

            events = next;
        }

        Ok(ChainResult { events, exec_log })
    }

    /// Run the chain for one inbound event
    ///
    /// # Errors
    ///
    /// - [`ChainError::Multiplication`] when a non-terminal step fans out
    /// - [`ChainError::Failed`] for the first `Retry`/`DropAndRetry` step
    ///   failure, carrying the inbound event
    pub async fn run(
        &self,
        event: AnalyticsEvent,
        ctx: &InvocationContext,
    ) -> Result<ChainOutput, ChainError> {
        let result = self.run_chain(event.clone(), ctx).await?;

        let mut promoted = None;
        for entry in result.exec_log {
            if promoted.is_none() && entry.error.is_promotable() {
                promoted = Some(entry);
                continue;
            }
            error!(
                function_id = %entry.function_id,
                kind = %entry.error.kind(),
                error = %entry.error,
                "Function execution failed"
            );
            ctx.for_function(&entry.function_id).log().error(format!(
                "Function execution failed: {}: {}",
                entry.error.kind(),
                entry.error
            ));
        }

        if let Some(entry) = promoted {
            return Err(ChainError::Failed {
                function_id: entry.function_id,
                error: entry.error,
                retry_policy: entry.retry_policy,
                events: vec![event],
            });
        }

        Ok(ChainOutput::from_events(result.events))
    }

    /// Close every step, returning the first failure
    pub fn close(&self) -> TransformResult<()> {
        let mut first_err = None;
        for step in &self.steps {
            if let Err(e) = step.close() {
                error!(function_id = step.id(), error = %e, "failed to close function");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain").field("steps", &self.ids()).finish()
    }
}
