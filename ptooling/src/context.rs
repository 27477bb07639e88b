//! Per-call context carried from the caller into dispatch.

use pcommon::TraceId;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub trace_id: TraceId,
    pub cancel: CancellationToken,
}

impl CallContext {
    pub fn new(trace_id: impl Into<TraceId>) -> Self {
        Self {
            trace_id: trace_id.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// Cancelling `cancel` aborts in-flight attempts and backoff sleeps.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
