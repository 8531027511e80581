//! Bounded retry with exponential backoff.
//!
//! Event handlers hit transient dependency gaps when events for different
//! types arrive out of causal order (a subscription purchase can land before
//! the tier it references). The executor here re-attempts an operation a
//! bounded number of times with exponentially growing delays, driven by a
//! caller-supplied predicate that decides which errors are worth retrying.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::warn;

/// Retry policy for a single operation.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Number of retries after the initial attempt (total attempts = max_retries + 1).
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10000),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Tighter schedule used while waiting for a parent entity written by a
    /// different event type's poll cycle.
    pub fn dependency_wait() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(5000),
            backoff_multiplier: 2.0,
        }
    }
}

/// Run `operation`, retrying on errors classified retryable by `is_retryable`.
///
/// The delay starts at `initial_delay` and is multiplied by
/// `backoff_multiplier` after every retry, capped at `max_delay`. A
/// non-retryable error, or exhaustion of the retry budget, propagates the
/// last error unchanged. Holds no shared state, so it is safe to run
/// concurrently across event types.
pub async fn execute_with_retry<T, E, F, Fut, P>(
    mut operation: F,
    is_retryable: P,
    config: &RetryConfig,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut delay = config.initial_delay.min(config.max_delay);
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retryable(&err) || attempt >= config.max_retries {
                    return Err(err);
                }

                attempt += 1;
                warn!(
                    "Retryable failure (attempt {}/{}), retrying in {:?}: {}",
                    attempt,
                    config.max_retries + 1,
                    delay,
                    err
                );

                tokio::time::sleep(delay).await;

                delay = delay.mul_f64(config.backoff_multiplier).min(config.max_delay);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn config(max_retries: u32, initial_ms: u64, max_ms: u64) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(initial_ms),
            max_delay: Duration::from_millis(max_ms),
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn succeeds_first_try_without_sleeping() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = execute_with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            },
            |_| true,
            &config(3, 50, 500),
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_retryable_error_propagates_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = execute_with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("fatal".to_string())
            },
            |_| false,
            &config(3, 50, 500),
        )
        .await;

        assert_eq!(result.unwrap_err(), "fatal");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_attempt_exactly_max_plus_one() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = execute_with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("dependency missing".to_string())
            },
            |_| true,
            &config(3, 50, 500),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_delays_grow_exponentially() {
        let attempt_times = std::sync::Mutex::new(Vec::new());
        let result: Result<(), String> = execute_with_retry(
            || async {
                attempt_times.lock().unwrap().push(Instant::now());
                Err("dependency missing".to_string())
            },
            |_| true,
            &config(3, 50, 500),
        )
        .await;
        assert!(result.is_err());

        let times = attempt_times.lock().unwrap();
        assert_eq!(times.len(), 4);
        let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(gaps[0] >= Duration::from_millis(50));
        assert!(gaps[1] >= Duration::from_millis(100));
        assert!(gaps[2] >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_capped_at_max_delay() {
        let attempt_times = std::sync::Mutex::new(Vec::new());
        let result: Result<(), String> = execute_with_retry(
            || async {
                attempt_times.lock().unwrap().push(Instant::now());
                Err("dependency missing".to_string())
            },
            |_| true,
            &config(5, 100, 150),
        )
        .await;
        assert!(result.is_err());

        let times = attempt_times.lock().unwrap();
        assert_eq!(times.len(), 6);
        for gap in times.windows(2).map(|w| w[1] - w[0]) {
            // Paused-clock sleeps are exact, so a small slack is enough.
            assert!(gap <= Duration::from_millis(160), "gap {:?} above cap", gap);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn eventually_succeeds_within_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, String> = execute_with_retry(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err("dependency missing".to_string())
                } else {
                    Ok("done")
                }
            },
            |_| true,
            &config(5, 50, 500),
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
