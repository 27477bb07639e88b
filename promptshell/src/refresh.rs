//! Periodic background refresh, one task per entity kind.

use std::time::Duration;

use futures_util::future::join_all;
use pcache::EntityKind;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::engine::Engine;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);
/// Floor applied to shorter periods, including zero.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshIntervals {
    pub tools: Duration,
    pub prompts: Duration,
    pub extensions: Duration,
    pub environment: Duration,
}

impl Default for RefreshIntervals {
    fn default() -> Self {
        Self::uniform(DEFAULT_REFRESH_INTERVAL)
    }
}

impl RefreshIntervals {
    pub fn uniform(every: Duration) -> Self {
        Self {
            tools: every,
            prompts: every,
            extensions: every,
            environment: every,
        }
    }

    pub fn for_kind(&self, kind: EntityKind) -> Duration {
        match kind {
            EntityKind::Tools => self.tools,
            EntityKind::Prompts => self.prompts,
            EntityKind::Extensions => self.extensions,
            EntityKind::Environment => self.environment,
        }
    }
}

/// Outcome of one successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    pub kind: EntityKind,
    pub entries: usize,
    pub skipped: usize,
    pub revision: u64,
}

/// Owns the background refresh tasks. Dropping it stops them.
pub struct RefreshHandle {
    guard: DropGuard,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for RefreshHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshHandle")
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl RefreshHandle {
    /// Stops every task and waits for in-flight refreshes to finish.
    pub async fn shutdown(self) {
        let Self { guard, tasks } = self;
        drop(guard);
        for result in join_all(tasks).await {
            if let Err(err) = result {
                tracing::warn!(error = %err, "refresh task ended abnormally");
            }
        }
    }
}

pub(crate) fn spawn(engine: &Engine, intervals: RefreshIntervals) -> RefreshHandle {
    let cancel = CancellationToken::new();
    let kinds = [
        EntityKind::Tools,
        EntityKind::Environment,
        EntityKind::Prompts,
        EntityKind::Extensions,
    ];

    let tasks = kinds
        .into_iter()
        .map(|kind| {
            let engine = engine.clone();
            let cancel = cancel.clone();
            let period = effective_period(kind, intervals.for_kind(kind));
            tokio::spawn(async move { run_refresh_loop(engine, kind, period, cancel).await })
        })
        .collect();

    RefreshHandle {
        guard: cancel.drop_guard(),
        tasks,
    }
}

fn effective_period(kind: EntityKind, requested: Duration) -> Duration {
    if requested >= MIN_REFRESH_INTERVAL {
        return requested;
    }
    tracing::warn!(
        %kind,
        requested_ms = requested.as_millis() as u64,
        floor_ms = MIN_REFRESH_INTERVAL.as_millis() as u64,
        "refresh interval too short; using the floor"
    );
    MIN_REFRESH_INTERVAL
}

async fn run_refresh_loop(
    engine: Engine,
    kind: EntityKind,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!(%kind, period_ms = period.as_millis() as u64, "refresh task started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(err) = engine.refresh(kind).await {
                    tracing::warn!(%kind, error = %err, "periodic refresh failed; keeping previous snapshot");
                }
            }
        }
    }

    tracing::debug!(%kind, "refresh task stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pcache::EntityKind;

    use super::{MIN_REFRESH_INTERVAL, effective_period};

    #[test]
    fn short_periods_are_raised_to_the_floor() {
        assert_eq!(effective_period(EntityKind::Tools, Duration::ZERO), MIN_REFRESH_INTERVAL);
        assert_eq!(
            effective_period(EntityKind::Prompts, Duration::from_millis(5)),
            MIN_REFRESH_INTERVAL
        );
        assert_eq!(
            effective_period(EntityKind::Environment, Duration::from_secs(30)),
            Duration::from_secs(30)
        );
    }
}
