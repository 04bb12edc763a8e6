//! Shared helpers for unit tests

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::context::{ConnectionMeta, InvocationContext};
use crate::fetch::{Fetch, FetchError, FetchExtras, FetchRequest, FetchResponse};
use crate::log::{Level, LogSink};

/// Fetch that fails every request
pub struct OfflineFetch;

#[async_trait]
impl Fetch for OfflineFetch {
    async fn fetch(
        &self,
        _request: FetchRequest,
        _extras: Option<FetchExtras>,
    ) -> Result<FetchResponse, FetchError> {
        Err(FetchError::Network("offline".into()))
    }
}

/// Log sink that keeps every line
#[derive(Default)]
pub struct RecordingLog {
    pub lines: Mutex<Vec<(Level, String, String)>>,
}

impl LogSink for RecordingLog {
    fn log(&self, level: Level, function_id: &str, message: &str) {
        self.lines
            .lock()
            .push((level, function_id.to_string(), message.to_string()));
    }
}

pub fn test_context() -> InvocationContext {
    InvocationContext::new(ConnectionMeta::default(), Arc::new(OfflineFetch))
}

pub fn recording_context() -> (InvocationContext, Arc<RecordingLog>) {
    let log = Arc::new(RecordingLog::default());
    let ctx = test_context().with_log_sink(log.clone());
    (ctx, log)
}
