//! Tracing-based hooks for refreshes and tool calls.
//!
//! ```rust
//! use pobserve::TracingObservabilityHooks;
//! use ptooling::ToolCallHooks;
//!
//! fn accepts_tool_hooks(_hooks: &dyn ToolCallHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_tool_hooks(&hooks);
//! ```

use std::time::Duration;

use pcache::{EntityKind, LoadError, RefreshHooks};
use ptooling::{CallContext, ToolCallHooks, ToolError};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ToolCallHooks for TracingObservabilityHooks {
    fn on_call_start(&self, tool_id: &str, context: &CallContext) {
        tracing::debug!(
            phase = "tool",
            event = "call_start",
            tool_id,
            trace_id = %context.trace_id
        );
    }

    fn on_attempt_start(&self, tool_id: &str, attempt: u32) {
        tracing::debug!(phase = "tool", event = "attempt_start", tool_id, attempt);
    }

    fn on_retry_scheduled(&self, tool_id: &str, attempt: u32, delay: Duration, error: &ToolError) {
        tracing::warn!(
            phase = "tool",
            event = "retry_scheduled",
            tool_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error_kind = ?error.kind,
            error = %error
        );
    }

    fn on_call_success(&self, tool_id: &str, attempts: u32, elapsed: Duration) {
        tracing::info!(
            phase = "tool",
            event = "call_success",
            tool_id,
            attempts,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_call_failure(&self, tool_id: &str, error: &ToolError, elapsed: Duration) {
        tracing::error!(
            phase = "tool",
            event = "call_failure",
            tool_id,
            attempts = error.attempts,
            error_kind = ?error.kind,
            root_kind = ?error.root_cause().kind,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error
        );
    }
}

impl RefreshHooks for TracingObservabilityHooks {
    fn on_refresh_start(&self, kind: EntityKind) {
        tracing::debug!(phase = "refresh", event = "start", kind = %kind);
    }

    fn on_refresh_success(&self, kind: EntityKind, entries: usize, skipped: usize, elapsed: Duration) {
        tracing::info!(
            phase = "refresh",
            event = "success",
            kind = %kind,
            entries,
            skipped,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_refresh_failure(&self, kind: EntityKind, error: &LoadError, elapsed: Duration) {
        tracing::error!(
            phase = "refresh",
            event = "failure",
            kind = %kind,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error
        );
    }
}
