//! Transform error types
//!
//! Three layers of errors live here:
//! - [`FunctionError`] - what a single step reports for a single event
//! - [`ChainError`] - what a whole invocation reports to the host
//! - [`TransformError`] - building and tearing down steps

use ferry_config::RetryPolicy;
use ferry_protocol::AnalyticsEvent;
use thiserror::Error;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Classification of a step failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Redeliver the event later
    Retry,
    /// Drop the event now, but still report a retryable failure
    DropAndRetry,
    /// Non-2xx response from an outbound call
    Http,
    /// Anything else; logged, not fatal to the invocation
    Unclassified,
}

impl ErrorKind {
    /// Name used in logs and host-facing error payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retry => "RetryError",
            Self::DropAndRetry => "Drop & RetryError",
            Self::Http => "HTTPError",
            Self::Unclassified => "Error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by a step while handling one event
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunctionError {
    /// Retryable failure; `status`/`response` are kept when it wraps an HTTP error
    #[error("{message}")]
    Retry {
        message: String,
        status: Option<u16>,
        response: Option<String>,
    },

    /// Drop this event without failing the rest of the chain
    #[error("{message}")]
    DropAndRetry { message: String },

    /// Outbound call returned a non-2xx status
    #[error("HTTP Error: {status} {status_text}")]
    Http {
        status: u16,
        status_text: String,
        /// Response body, truncated
        response: String,
    },

    #[error("{0}")]
    Unclassified(String),
}

impl FunctionError {
    /// Create a retryable error
    pub fn retry(message: impl Into<String>) -> Self {
        Self::Retry {
            message: message.into(),
            status: None,
            response: None,
        }
    }

    /// Create a drop-and-retry error
    pub fn drop_and_retry(message: impl Into<String>) -> Self {
        Self::DropAndRetry {
            message: message.into(),
        }
    }

    /// Create an unclassified error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Unclassified(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Retry { .. } => ErrorKind::Retry,
            Self::DropAndRetry { .. } => ErrorKind::DropAndRetry,
            Self::Http { .. } => ErrorKind::Http,
            Self::Unclassified(_) => ErrorKind::Unclassified,
        }
    }

    /// Whether this error can become the failure of a whole invocation
    pub fn is_promotable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Retry | ErrorKind::DropAndRetry)
    }

    /// Wrap as a retryable error, keeping HTTP details.
    ///
    /// Retry and drop-and-retry errors are returned unchanged.
    pub fn into_retry(self) -> Self {
        match self {
            Self::Retry { .. } | Self::DropAndRetry { .. } => self,
            Self::Http {
                status,
                status_text,
                response,
            } => Self::Retry {
                message: format!("HTTP Error: {status} {status_text}"),
                status: Some(status),
                response: Some(response),
            },
            Self::Unclassified(message) => Self::retry(message),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Retry { status, .. } => *status,
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure of a whole chain invocation
#[derive(Debug, Error)]
pub enum ChainError {
    /// A non-terminal step returned more than one event
    #[error(
        "Got {count} events as result of function #{position} of {total} ('{function_id}'). \
         Only the last function in a chain is allowed to multiply events."
    )]
    Multiplication {
        function_id: String,
        /// 1-based position of the step
        position: usize,
        /// Number of steps in the chain
        total: usize,
        /// Number of events the step returned
        count: usize,
    },

    /// First retryable step failure, promoted to the invocation result
    #[error("function '{function_id}' failed: {kind}: {error}", kind = .error.kind())]
    Failed {
        function_id: String,
        error: FunctionError,
        retry_policy: Option<RetryPolicy>,
        /// The inbound events of the invocation
        events: Vec<AnalyticsEvent>,
    },
}

impl ChainError {
    /// Whether the host should redeliver the inbound event
    ///
    /// True only for a promoted `Retry`; a promoted `DropAndRetry` has
    /// already decided to drop the event.
    pub fn should_redeliver(&self) -> bool {
        matches!(
            self,
            Self::Failed {
                error: FunctionError::Retry { .. },
                ..
            }
        )
    }

    /// Id of the step that caused the failure
    pub fn function_id(&self) -> &str {
        match self {
            Self::Multiplication { function_id, .. } | Self::Failed { function_id, .. } => {
                function_id
            }
        }
    }

    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        match self {
            Self::Failed { retry_policy, .. } => retry_policy.as_ref(),
            Self::Multiplication { .. } => None,
        }
    }
}

/// Errors building or closing steps
#[derive(Debug, Error)]
pub enum TransformError {
    /// Step logic failed outside of event handling
    #[error("transform failed: {0}")]
    TransformFailed(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Function type has no registered factory
    #[error("unknown function type '{function_type}', available: [{available}]")]
    UnknownType {
        function_type: String,
        available: String,
    },
}

impl TransformError {
    /// Create a transform failed error
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::TransformFailed(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
