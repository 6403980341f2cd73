//! Fixed-delay retry helper and the timed-wait seam
//!
//! Every suspension point of the monitor (inter-poll sleep, failure backoff,
//! dock settle delay, retry delay) goes through a [`Sleeper`] so tests can
//! record waits instead of performing them.

use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

/// Blocking timed wait
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Records requested waits without sleeping
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits requested so far, in order
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut w) = self.waits.lock() {
            w.clear();
        }
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut w) = self.waits.lock() {
            w.push(duration);
        }
    }
}

/// Attempt count and fixed delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (0 is treated as 1)
    pub max_attempts: u32,
    /// Wait between a failed attempt and the next one
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Failure after every attempt was used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last: E,
}

/// Run `op` until it succeeds or the policy's attempts are used up
///
/// No delay follows the final attempt. `label` is only used for logging.
pub fn retry<T, E, F>(
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
    label: &str,
    mut op: F,
) -> Result<T, RetryExhausted<E>>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                warn!(
                    "{} failed on attempt {}/{}: {}",
                    label, attempt, max_attempts, e
                );
                sleeper.sleep(policy.delay);
                attempt += 1;
            }
            Err(e) => {
                return Err(RetryExhausted {
                    attempts: attempt,
                    last: e,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_success_does_not_sleep() {
        let sleeper = RecordingSleeper::new();
        let result: Result<u32, RetryExhausted<String>> =
            retry(RetryPolicy::default(), &sleeper, "op", |attempt| Ok(attempt));

        assert_eq!(result, Ok(1));
        assert!(sleeper.waits().is_empty());
    }

    #[test]
    fn test_succeeds_on_last_attempt() {
        let sleeper = RecordingSleeper::new();
        let result = retry(RetryPolicy::default(), &sleeper, "op", |attempt| {
            if attempt < 3 {
                Err(format!("attempt {}", attempt))
            } else {
                Ok("done")
            }
        });

        assert_eq!(result, Ok("done"));
        assert_eq!(sleeper.waits(), vec![Duration::from_secs(1); 2]);
    }

    #[test]
    fn test_exhausted_reports_last_error() {
        let sleeper = RecordingSleeper::new();
        let mut calls = 0;
        let result: Result<(), _> = retry(RetryPolicy::default(), &sleeper, "op", |attempt| {
            calls += 1;
            Err(format!("failure {}", attempt))
        });

        assert_eq!(calls, 3);
        assert_eq!(
            result,
            Err(RetryExhausted {
                attempts: 3,
                last: "failure 3".to_string()
            })
        );
        // No wait after the final attempt
        assert_eq!(sleeper.waits().len(), 2);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        let result: Result<(), _> = retry(policy, &sleeper, "op", |_| Err("nope"));

        assert_eq!(result.unwrap_err().attempts, 1);
        assert!(sleeper.waits().is_empty());
    }
}
