use std::future::Future;
use std::time::Duration;

use error_stack::{Context, Report};
use serde::Deserialize;

/// Bounded exponential backoff for remote calls.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the given attempt (0-indexed). The first attempt never waits.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay =
            self.initial_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or the
    /// attempts run out. The last error is returned with the attempt count attached.
    pub async fn run<T, C, F, Fut>(
        &self,
        name: &str,
        is_transient: impl Fn(&C) -> bool,
        mut op: F,
    ) -> error_stack::Result<T, C>
    where
        C: Context,
        F: FnMut() -> Fut,
        Fut: Future<Output = error_stack::Result<T, C>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            let delay = self.delay_for_attempt(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let report: Report<C> = match op().await {
                Ok(value) => return Ok(value),
                Err(report) => report,
            };
            attempt += 1;

            if attempt >= max_attempts || !is_transient(report.current_context()) {
                return Err(report.attach_printable(format!(
                    "{name}: gave up after {attempt} attempt(s)"
                )));
            }
            tracing::warn!(attempt, max_attempts, "{name} failed, retrying: {:?}", report);
        }
    }
}
