//! Tool call lifecycle callbacks.

use std::time::Duration;

use crate::context::CallContext;
use crate::error::ToolError;

pub trait ToolCallHooks: Send + Sync {
    fn on_call_start(&self, _tool_id: &str, _context: &CallContext) {}

    fn on_attempt_start(&self, _tool_id: &str, _attempt: u32) {}

    fn on_retry_scheduled(&self, _tool_id: &str, _attempt: u32, _delay: Duration, _error: &ToolError) {
    }

    fn on_call_success(&self, _tool_id: &str, _attempts: u32, _elapsed: Duration) {}

    fn on_call_failure(&self, _tool_id: &str, _error: &ToolError, _elapsed: Duration) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopToolCallHooks;

impl ToolCallHooks for NoopToolCallHooks {}
