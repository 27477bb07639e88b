//! Accounting for time spent inside tool calls during a render.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sums the wall time of tool calls so the render deadline can exclude it.
#[derive(Debug, Default)]
pub struct ToolClock {
    state: Mutex<ClockState>,
}

#[derive(Debug, Default)]
struct ClockState {
    accumulated: Duration,
    active_since: Option<Instant>,
}

impl ToolClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts timing a tool call; timing stops when the guard drops.
    pub fn start(&self) -> ToolTiming<'_> {
        self.state.lock().active_since = Some(Instant::now());
        ToolTiming { clock: self }
    }

    /// Tool time so far, including a call still in flight.
    pub fn elapsed(&self) -> Duration {
        let state = self.state.lock();
        let running = state
            .active_since
            .map(|since| since.elapsed())
            .unwrap_or_default();
        state.accumulated + running
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        if let Some(since) = state.active_since.take() {
            state.accumulated += since.elapsed();
        }
    }
}

pub struct ToolTiming<'a> {
    clock: &'a ToolClock,
}

impl Drop for ToolTiming<'_> {
    fn drop(&mut self) {
        self.clock.stop();
    }
}
