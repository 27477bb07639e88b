//! Refresh lifecycle callbacks.

use std::time::Duration;

use crate::error::LoadError;
use crate::types::EntityKind;

pub trait RefreshHooks: Send + Sync {
    fn on_refresh_start(&self, _kind: EntityKind) {}

    fn on_refresh_success(
        &self,
        _kind: EntityKind,
        _entries: usize,
        _skipped: usize,
        _elapsed: Duration,
    ) {
    }

    fn on_refresh_failure(&self, _kind: EntityKind, _error: &LoadError, _elapsed: Duration) {}
}

#[derive(Debug, Default)]
pub struct NoopRefreshHooks;

impl RefreshHooks for NoopRefreshHooks {}
