//! Linear retry policy for transient tool failures.
//!
//! ```rust
//! use std::time::Duration;
//! use ptooling::RetryPolicy;
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.max_attempts, 3);
//! assert_eq!(policy.backoff_for_attempt(1), Duration::from_secs(1));
//! assert_eq!(policy.backoff_for_attempt(2), Duration::from_secs(2));
//! ```

use std::future::Future;
use std::time::Duration;

use crate::error::ToolError;
use crate::hooks::ToolCallHooks;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Attempt `i` sleeps `i * backoff_unit` before the next try.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    pub fn should_retry(&self, attempt: u32, error: &ToolError) -> bool {
        error.retryable && attempt < self.max_attempts
    }

    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt.max(1))
    }
}

/// Runs `execute` until it succeeds, fails terminally, or attempts run out.
///
/// Any failure is returned as [`ToolError::call_failed`] around the last
/// cause. On success the attempt count is returned alongside the value.
pub async fn execute_with_retry<T, Op, OpFuture, Sleep, SleepFuture>(
    tool_id: &str,
    policy: &RetryPolicy,
    hooks: &dyn ToolCallHooks,
    mut execute: Op,
    mut sleep: Sleep,
) -> Result<(T, u32), ToolError>
where
    Op: FnMut(u32) -> OpFuture,
    OpFuture: Future<Output = Result<T, ToolError>>,
    Sleep: FnMut(Duration) -> SleepFuture,
    SleepFuture: Future<Output = ()>,
{
    let mut attempt = 1;

    loop {
        hooks.on_attempt_start(tool_id, attempt);

        match execute(attempt).await {
            Ok(value) => return Ok((value, attempt)),
            Err(error) => {
                if policy.should_retry(attempt, &error) {
                    let delay = policy.backoff_for_attempt(attempt);
                    tracing::debug!(
                        tool_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying tool call"
                    );
                    hooks.on_retry_scheduled(tool_id, attempt, delay, &error);
                    sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                return Err(ToolError::call_failed(error.with_tool_id(tool_id), attempt));
            }
        }
    }
}
