use std::sync::{Arc, Mutex};
use std::time::Duration;

use pcache::{EntityKind, LoadError, RefreshHooks};
use pstore::StoreError;
use ptooling::{CallContext, ToolCallHooks, ToolError};

use crate::{
    CombinedHooks, MetricsObservabilityHooks, SafeRefreshHooks, SafeToolHooks,
    TracingObservabilityHooks, standard_refresh_hooks, standard_tool_hooks,
};

fn sample_context() -> CallContext {
    CallContext::new("trace-1")
}

fn sample_load_error() -> LoadError {
    LoadError::Store {
        kind: EntityKind::Tools,
        source: StoreError::connection("connection refused"),
    }
}

fn exercise_tool_hooks(hooks: &dyn ToolCallHooks) {
    let error = ToolError::call_failed(ToolError::unavailable("HTTP 503"), 3);
    hooks.on_call_start("weather.now", &sample_context());
    hooks.on_attempt_start("weather.now", 1);
    hooks.on_retry_scheduled(
        "weather.now",
        1,
        Duration::from_millis(10),
        &ToolError::timeout("slow"),
    );
    hooks.on_call_success("weather.now", 2, Duration::from_millis(20));
    hooks.on_call_failure("weather.now", &error, Duration::from_millis(20));
}

fn exercise_refresh_hooks(hooks: &dyn RefreshHooks) {
    hooks.on_refresh_start(EntityKind::Prompts);
    hooks.on_refresh_success(EntityKind::Prompts, 4, 1, Duration::from_millis(5));
    hooks.on_refresh_failure(EntityKind::Tools, &sample_load_error(), Duration::from_millis(5));
}

#[test]
fn tracing_hooks_smoke_test_all_callbacks() {
    exercise_tool_hooks(&TracingObservabilityHooks);
    exercise_refresh_hooks(&TracingObservabilityHooks);
}

#[test]
fn metrics_hooks_smoke_test_all_callbacks() {
    exercise_tool_hooks(&MetricsObservabilityHooks);
    exercise_refresh_hooks(&MetricsObservabilityHooks);
}

#[test]
fn standard_hooks_smoke_test_all_callbacks() {
    exercise_tool_hooks(&standard_tool_hooks());
    exercise_refresh_hooks(&standard_refresh_hooks());
}

#[derive(Clone, Default)]
struct RecordingHooks {
    label: &'static str,
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingHooks {
    fn push(&self, event: &str) {
        self.events
            .lock()
            .expect("events lock")
            .push(format!("{}:{event}", self.label));
    }
}

impl ToolCallHooks for RecordingHooks {
    fn on_call_start(&self, _tool_id: &str, _context: &CallContext) {
        self.push("call_start");
    }

    fn on_call_success(&self, _tool_id: &str, _attempts: u32, _elapsed: Duration) {
        self.push("call_success");
    }
}

impl RefreshHooks for RecordingHooks {
    fn on_refresh_failure(&self, _kind: EntityKind, _error: &LoadError, _elapsed: Duration) {
        self.push("refresh_failure");
    }
}

#[test]
fn combined_hooks_forward_in_order() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let hooks = CombinedHooks::new(
        RecordingHooks {
            label: "a",
            events: Arc::clone(&events),
        },
        RecordingHooks {
            label: "b",
            events: Arc::clone(&events),
        },
    );

    hooks.on_call_start("echo", &sample_context());
    hooks.on_call_success("echo", 1, Duration::ZERO);
    hooks.on_refresh_failure(EntityKind::Tools, &sample_load_error(), Duration::ZERO);

    assert_eq!(
        *events.lock().expect("events lock"),
        vec![
            "a:call_start",
            "b:call_start",
            "a:call_success",
            "b:call_success",
            "a:refresh_failure",
            "b:refresh_failure",
        ]
    );
}

struct PanicHooks;

impl ToolCallHooks for PanicHooks {
    fn on_call_start(&self, _tool_id: &str, _context: &CallContext) {
        panic!("start panic");
    }

    fn on_attempt_start(&self, _tool_id: &str, _attempt: u32) {
        panic!("attempt panic");
    }

    fn on_retry_scheduled(&self, _tool_id: &str, _attempt: u32, _delay: Duration, _error: &ToolError) {
        panic!("retry panic");
    }

    fn on_call_success(&self, _tool_id: &str, _attempts: u32, _elapsed: Duration) {
        panic!("success panic");
    }

    fn on_call_failure(&self, _tool_id: &str, _error: &ToolError, _elapsed: Duration) {
        panic!("failure panic");
    }
}

impl RefreshHooks for PanicHooks {
    fn on_refresh_start(&self, _kind: EntityKind) {
        panic!("refresh start panic");
    }

    fn on_refresh_success(&self, _kind: EntityKind, _entries: usize, _skipped: usize, _elapsed: Duration) {
        panic!("refresh success panic");
    }

    fn on_refresh_failure(&self, _kind: EntityKind, _error: &LoadError, _elapsed: Duration) {
        panic!("refresh failure panic");
    }
}

#[test]
fn safe_wrappers_swallow_panics() {
    exercise_tool_hooks(&SafeToolHooks::new(PanicHooks));
    exercise_refresh_hooks(&SafeRefreshHooks::new(PanicHooks));
}
