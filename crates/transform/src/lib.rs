//! Ferry - Transform
//!
//! Function chain runner for analytics events.
//!
//! # Overview
//!
//! A chain is an ordered list of steps. Each inbound event runs through
//! every step in turn; a step may pass the event through, replace it, drop
//! it, or fail. Only the last step may turn one event into several.
//!
//! ```text
//! [event] → [step 1] → [step 2] → ... → [destination] → ChainOutput
//! ```
//!
//! Steps get their capabilities (logging, key/value store, outbound HTTP)
//! from an explicit [`InvocationContext`]; the chain scopes a copy of it to
//! each step's id.
//!
//! # Errors
//!
//! Per-event failures are collected while the chain runs. Afterwards the
//! first `Retry` or `DropAndRetry` failure becomes the result of the whole
//! invocation ([`ChainError::Failed`]); everything else is logged.
//!
//! # Adding a New Step
//!
//! 1. Implement [`Step`] on your type.
//! 2. Implement [`StepFactory`] that builds it from a
//!    [`FunctionInstanceConfig`](ferry_config::FunctionInstanceConfig).
//! 3. Register it in [`default_registry`] and add the type name to
//!    `ferry_config::KNOWN_FUNCTION_TYPES`.
//!
//! # Example
//!
//! ```ignore
//! use ferry_transform::{Chain, Condition, FilterConfig, FilterStep, Predicate};
//!
//! let bots = Condition::new("context.userAgent", Predicate::Contains("bot".into()));
//! let filter = FilterStep::new("drop-bots", FilterConfig::drop_when(vec![bots]))?;
//! let chain = Chain::new(vec![Box::new(filter)]);
//!
//! let output = chain.run(event, &ctx).await?;
//! ```

mod chain;
mod context;
mod error;
mod fetch;
pub mod filter;
mod log;
pub mod noop;
mod output;
pub mod registry;
mod store;

#[cfg(test)]
mod test_util;

pub use chain::Chain;
pub use context::{ConnectionMeta, InvocationContext};
pub use error::{ChainError, ErrorKind, FunctionError, TransformError};
pub use fetch::{
    DEFAULT_FETCH_TIMEOUT, Fetch, FetchError, FetchExtras, FetchRequest, FetchResponse, HttpFetch,
};
pub use filter::{
    Condition, FilterAction, FilterConfig, FilterFactory, FilterMetrics, FilterStep, MatchMode,
    Predicate,
};
pub use log::{FunctionLog, Level, LogSink, TracingLogSink};
pub use noop::NoopStep;
pub use output::{ChainOutput, ChainResult, ExecLogEntry, StepOutput};
pub use registry::{NoopFactory, StepFactory, StepRegistry, default_registry};
pub use store::{KeyTtl, KvStore, MemoryStore, ScopedStore, StoreError};

use ferry_config::RetryPolicy;
use ferry_protocol::AnalyticsEvent;
use std::future::Future;
use std::pin::Pin;

/// Result type for building and closing steps
pub type TransformResult<T> = Result<T, TransformError>;

/// One function in a chain
///
/// Implementors must be `Send + Sync`: a single chain serves many
/// invocations concurrently, so per-invocation state belongs in the
/// context's store, not in the step.
///
/// # Example
///
/// ```ignore
/// struct Tag;
///
/// impl Step for Tag {
///     fn apply<'a>(
///         &'a self,
///         mut event: AnalyticsEvent,
///         ctx: &'a InvocationContext,
///     ) -> Pin<Box<dyn Future<Output = Result<StepOutput, FunctionError>> + Send + 'a>> {
///         Box::pin(async move {
///             ctx.log().debug("tagging");
///             event.insert("tagged", true.into());
///             Ok(StepOutput::Event(event))
///         })
///     }
///
///     fn id(&self) -> &str {
///         "tag"
///     }
/// }
/// ```
pub trait Step: Send + Sync {
    /// Handle one event
    ///
    /// The event is the step's own copy; mutating it never affects other
    /// steps or the caller.
    fn apply<'a>(
        &'a self,
        event: AnalyticsEvent,
        ctx: &'a InvocationContext,
    ) -> Pin<Box<dyn Future<Output = Result<StepOutput, FunctionError>> + Send + 'a>>;

    /// Function id, used in logs, store keys and errors
    fn id(&self) -> &str;

    /// Whether this step is active
    ///
    /// Disabled steps are filtered out of chains at construction time.
    fn enabled(&self) -> bool {
        true
    }

    /// Redelivery schedule attached to this step's errors
    fn retry_policy(&self) -> Option<&RetryPolicy> {
        None
    }

    /// Release resources held by this step
    ///
    /// Default implementation is a no-op.
    fn close(&self) -> TransformResult<()> {
        Ok(())
    }
}
