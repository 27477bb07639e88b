//! Per-tool call statistics.

use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use pcommon::Registry;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CallStats {
    /// Successful calls.
    pub count: u64,
    pub failures: u64,
    #[serde(rename = "total_duration_ms", serialize_with = "as_millis")]
    pub total_duration: Duration,
    pub last_error: Option<String>,
}

fn as_millis<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

/// Written only by the dispatcher; everyone else reads copies.
#[derive(Debug, Default)]
pub(crate) struct CallStatsBook {
    entries: Mutex<Registry<String, CallStats>>,
}

impl CallStatsBook {
    pub(crate) fn record_success(&self, tool_id: &str, elapsed: Duration) {
        let mut entries = self.entries.lock();
        let stats = entries.get_or_insert_with(tool_id.to_string(), CallStats::default);
        stats.count += 1;
        stats.total_duration += elapsed;
    }

    pub(crate) fn record_failure(&self, tool_id: &str, elapsed: Duration, error: String) {
        let mut entries = self.entries.lock();
        let stats = entries.get_or_insert_with(tool_id.to_string(), CallStats::default);
        stats.failures += 1;
        stats.total_duration += elapsed;
        stats.last_error = Some(error);
    }

    pub(crate) fn get(&self, tool_id: &str) -> Option<CallStats> {
        self.entries.lock().get(tool_id).cloned()
    }

    pub(crate) fn all(&self) -> Vec<(String, CallStats)> {
        let mut all: Vec<(String, CallStats)> = self
            .entries
            .lock()
            .iter()
            .map(|(id, stats)| (id.clone(), stats.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::CallStatsBook;

    #[test]
    fn success_and_failure_accumulate_separately() {
        let book = CallStatsBook::default();
        book.record_success("echo", Duration::from_millis(5));
        book.record_success("echo", Duration::from_millis(7));
        book.record_failure("echo", Duration::from_millis(3), "HTTP 500".to_string());

        let stats = book.get("echo").expect("stats should exist");
        assert_eq!(stats.count, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.total_duration, Duration::from_millis(15));
        assert_eq!(stats.last_error.as_deref(), Some("HTTP 500"));
        assert!(book.get("other").is_none());

        let json = serde_json::to_value(&stats).expect("stats should serialize");
        assert_eq!(json["total_duration_ms"], 15);
    }
}
