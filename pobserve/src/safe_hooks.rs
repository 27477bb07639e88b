use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use pcache::{EntityKind, LoadError, RefreshHooks};
use ptooling::{CallContext, ToolCallHooks, ToolError};

pub struct SafeToolHooks<H> {
    inner: H,
}

impl<H> SafeToolHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ToolCallHooks for SafeToolHooks<H>
where
    H: ToolCallHooks,
{
    fn on_call_start(&self, tool_id: &str, context: &CallContext) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_call_start(tool_id, context)));
    }

    fn on_attempt_start(&self, tool_id: &str, attempt: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_attempt_start(tool_id, attempt)
        }));
    }

    fn on_retry_scheduled(&self, tool_id: &str, attempt: u32, delay: Duration, error: &ToolError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_retry_scheduled(tool_id, attempt, delay, error)
        }));
    }

    fn on_call_success(&self, tool_id: &str, attempts: u32, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_call_success(tool_id, attempts, elapsed)
        }));
    }

    fn on_call_failure(&self, tool_id: &str, error: &ToolError, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_call_failure(tool_id, error, elapsed)
        }));
    }
}

pub struct SafeRefreshHooks<H> {
    inner: H,
}

impl<H> SafeRefreshHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> RefreshHooks for SafeRefreshHooks<H>
where
    H: RefreshHooks,
{
    fn on_refresh_start(&self, kind: EntityKind) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_refresh_start(kind)));
    }

    fn on_refresh_success(&self, kind: EntityKind, entries: usize, skipped: usize, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_refresh_success(kind, entries, skipped, elapsed)
        }));
    }

    fn on_refresh_failure(&self, kind: EntityKind, error: &LoadError, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_refresh_failure(kind, error, elapsed)
        }));
    }
}
