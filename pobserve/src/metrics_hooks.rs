//! Metrics-based hooks for refreshes and tool calls.
//!
//! ```rust
//! use pcache::RefreshHooks;
//! use pobserve::MetricsObservabilityHooks;
//!
//! fn accepts_refresh_hooks(_hooks: &dyn RefreshHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_refresh_hooks(&hooks);
//! ```

use std::time::Duration;

use pcache::{EntityKind, LoadError, RefreshHooks};
use ptooling::{CallContext, ToolCallHooks, ToolError};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ToolCallHooks for MetricsObservabilityHooks {
    fn on_call_start(&self, tool_id: &str, _context: &CallContext) {
        metrics::counter!(
            "promptshell_tool_call_start_total",
            "tool_id" => tool_id.to_string()
        )
        .increment(1);
    }

    fn on_retry_scheduled(&self, tool_id: &str, _attempt: u32, delay: Duration, error: &ToolError) {
        metrics::counter!(
            "promptshell_tool_retry_scheduled_total",
            "tool_id" => tool_id.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "promptshell_tool_retry_delay_seconds",
            "tool_id" => tool_id.to_string()
        )
        .record(delay.as_secs_f64());
    }

    fn on_call_success(&self, tool_id: &str, attempts: u32, elapsed: Duration) {
        metrics::counter!(
            "promptshell_tool_call_success_total",
            "tool_id" => tool_id.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "promptshell_tool_call_duration_seconds",
            "tool_id" => tool_id.to_string(),
            "outcome" => "success"
        )
        .record(elapsed.as_secs_f64());
        metrics::histogram!(
            "promptshell_tool_attempts_per_success",
            "tool_id" => tool_id.to_string()
        )
        .record(attempts as f64);
    }

    fn on_call_failure(&self, tool_id: &str, error: &ToolError, elapsed: Duration) {
        metrics::counter!(
            "promptshell_tool_call_failure_total",
            "tool_id" => tool_id.to_string(),
            "error_kind" => format!("{:?}", error.root_cause().kind)
        )
        .increment(1);
        metrics::histogram!(
            "promptshell_tool_call_duration_seconds",
            "tool_id" => tool_id.to_string(),
            "outcome" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }
}

impl RefreshHooks for MetricsObservabilityHooks {
    fn on_refresh_success(&self, kind: EntityKind, entries: usize, skipped: usize, elapsed: Duration) {
        metrics::counter!(
            "promptshell_refresh_success_total",
            "kind" => kind.as_str()
        )
        .increment(1);
        metrics::gauge!("promptshell_snapshot_entries", "kind" => kind.as_str()).set(entries as f64);
        metrics::counter!(
            "promptshell_refresh_skipped_entries_total",
            "kind" => kind.as_str()
        )
        .increment(skipped as u64);
        metrics::histogram!(
            "promptshell_refresh_duration_seconds",
            "kind" => kind.as_str()
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_refresh_failure(&self, kind: EntityKind, error: &LoadError, _elapsed: Duration) {
        let reason = match error {
            LoadError::Store { .. } => "store",
            LoadError::Timeout { .. } => "timeout",
        };
        metrics::counter!(
            "promptshell_refresh_failure_total",
            "kind" => kind.as_str(),
            "reason" => reason
        )
        .increment(1);
    }
}
