use std::time::Duration;

use pcache::{EntityKind, LoadError, RefreshHooks};
use ptooling::{CallContext, ToolCallHooks, ToolError};

/// Forwards every callback to `first`, then `second`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombinedHooks<A, B> {
    first: A,
    second: B,
}

impl<A, B> CombinedHooks<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A, B> ToolCallHooks for CombinedHooks<A, B>
where
    A: ToolCallHooks,
    B: ToolCallHooks,
{
    fn on_call_start(&self, tool_id: &str, context: &CallContext) {
        self.first.on_call_start(tool_id, context);
        self.second.on_call_start(tool_id, context);
    }

    fn on_attempt_start(&self, tool_id: &str, attempt: u32) {
        self.first.on_attempt_start(tool_id, attempt);
        self.second.on_attempt_start(tool_id, attempt);
    }

    fn on_retry_scheduled(&self, tool_id: &str, attempt: u32, delay: Duration, error: &ToolError) {
        self.first.on_retry_scheduled(tool_id, attempt, delay, error);
        self.second.on_retry_scheduled(tool_id, attempt, delay, error);
    }

    fn on_call_success(&self, tool_id: &str, attempts: u32, elapsed: Duration) {
        self.first.on_call_success(tool_id, attempts, elapsed);
        self.second.on_call_success(tool_id, attempts, elapsed);
    }

    fn on_call_failure(&self, tool_id: &str, error: &ToolError, elapsed: Duration) {
        self.first.on_call_failure(tool_id, error, elapsed);
        self.second.on_call_failure(tool_id, error, elapsed);
    }
}

impl<A, B> RefreshHooks for CombinedHooks<A, B>
where
    A: RefreshHooks,
    B: RefreshHooks,
{
    fn on_refresh_start(&self, kind: EntityKind) {
        self.first.on_refresh_start(kind);
        self.second.on_refresh_start(kind);
    }

    fn on_refresh_success(&self, kind: EntityKind, entries: usize, skipped: usize, elapsed: Duration) {
        self.first.on_refresh_success(kind, entries, skipped, elapsed);
        self.second.on_refresh_success(kind, entries, skipped, elapsed);
    }

    fn on_refresh_failure(&self, kind: EntityKind, error: &LoadError, elapsed: Duration) {
        self.first.on_refresh_failure(kind, error, elapsed);
        self.second.on_refresh_failure(kind, error, elapsed);
    }
}
