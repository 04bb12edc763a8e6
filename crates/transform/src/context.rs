//! Invocation context
//!
//! Everything a step may touch outside its own event: the log sink, the
//! key/value store, outbound HTTP, connection identity and the parsed user
//! agent. The context is passed explicitly to every [`Step::apply`] call;
//! there are no process-wide capability handles.
//!
//! The chain runner hands each step a copy scoped to that step's id via
//! [`InvocationContext::for_function`], which is what ties log lines and
//! store keys to the function that produced them.
//!
//! [`Step::apply`]: crate::Step::apply

use std::sync::Arc;

use ferry_config::ConnectionConfig;
use ferry_protocol::UserAgent;

use crate::fetch::Fetch;
use crate::log::{FunctionLog, LogSink, TracingLogSink};
use crate::store::{KvStore, MemoryStore, ScopedStore};

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;

/// Identity of the connection an invocation runs for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionMeta {
    pub workspace_id: String,
    pub stream_id: String,
    pub destination_id: String,
    pub connection_id: String,
    /// Destination kind, e.g. "postgres", "s3"
    pub destination_type: Option<String>,
}

impl ConnectionMeta {
    /// Build from the `[connection]` config section and the destination id
    pub fn from_config(config: &ConnectionConfig, destination_id: impl Into<String>) -> Self {
        Self {
            workspace_id: config.workspace_id.clone(),
            stream_id: config.stream_id.clone(),
            destination_id: destination_id.into(),
            connection_id: config.connection_id.clone(),
            destination_type: config.destination_type.clone(),
        }
    }
}

/// Capabilities and metadata available to a step
#[derive(Clone)]
pub struct InvocationContext {
    log: Arc<dyn LogSink>,
    store: Arc<dyn KvStore>,
    fetch: Arc<dyn Fetch>,
    connection: ConnectionMeta,
    user_agent: Option<UserAgent>,
    function_id: String,
}

impl InvocationContext {
    /// Create a context with the tracing log sink and a fresh in-memory store
    pub fn new(connection: ConnectionMeta, fetch: Arc<dyn Fetch>) -> Self {
        Self {
            log: Arc::new(TracingLogSink),
            store: Arc::new(MemoryStore::new()),
            fetch,
            connection,
            user_agent: None,
            function_id: String::new(),
        }
    }

    pub fn with_log_sink(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    /// Use a store shared across invocations
    pub fn with_store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_user_agent(mut self, user_agent: UserAgent) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    /// Copy of this context scoped to one function
    pub fn for_function(&self, function_id: &str) -> Self {
        Self {
            function_id: function_id.to_string(),
            ..self.clone()
        }
    }

    /// Id of the function this context is scoped to; empty at the chain level
    pub fn function_id(&self) -> &str {
        &self.function_id
    }

    pub fn log(&self) -> FunctionLog<'_> {
        FunctionLog::new(self.log.as_ref(), &self.function_id)
    }

    /// Store namespaced to the current function
    pub fn store(&self) -> ScopedStore {
        ScopedStore::new(self.store.clone(), &self.function_id)
    }

    pub fn fetch(&self) -> &dyn Fetch {
        self.fetch.as_ref()
    }

    pub fn connection(&self) -> &ConnectionMeta {
        &self.connection
    }

    pub fn user_agent(&self) -> Option<&UserAgent> {
        self.user_agent.as_ref()
    }
}

impl std::fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationContext")
            .field("connection", &self.connection)
            .field("user_agent", &self.user_agent)
            .field("function_id", &self.function_id)
            .finish_non_exhaustive()
    }
}
