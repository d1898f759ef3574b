//! Retry with exponential backoff for whole-batch lookups

use std::fmt::Display;
use std::time::Duration;

use indicatif::ProgressBar;

/// Default attempt budget per batch (first try included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Attempt budget and backoff unit.
///
/// The delay after failed attempt `k` is `unit * 2^k`, so with the default
/// one-second unit the waits are 2s, 4s, 8s, ... No jitter, no ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Exponential backoff: `unit * 2^attempt`
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        self.unit.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Sum of every delay slept before giving up
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts.max(1))
            .map(|k| self.backoff_duration(k))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Blocking wait between attempts. Abstracted so tests can record delays
/// instead of sleeping through them.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Attempt budget ran out; carries the last failure for logging.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Retry a fallible operation with exponential backoff.
///
/// Every error is retried until `policy.max_attempts` attempts have been
/// made. Returns `Ok(T)` on first success, or [`Exhausted`] with the final
/// error.
pub fn retry_with_backoff<T, E: Display>(
    label: &str,
    policy: &RetryPolicy,
    sleeper: &impl Sleeper,
    pb: &ProgressBar,
    mut attempt_fn: impl FnMut() -> Result<T, E>,
) -> Result<T, Exhausted<E>> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_attempts => {
                let delay = policy.backoff_duration(attempt);
                pb.set_message(format!("retry {}/{max_attempts}...", attempt + 1));
                log::warn!(
                    "{label}: attempt {attempt}/{max_attempts} failed: {e}, retrying in {delay:?}"
                );
                sleeper.sleep(delay);
            }
            Err(e) => {
                log::debug!("{label}: failed after {attempt} attempts: {e}");
                return Err(Exhausted {
                    attempts: attempt,
                    last_error: e,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::sync::{Mutex, Once};

    use super::*;

    /// Logger keeping every record for inspection
    struct Capture(Mutex<Vec<(log::Level, String)>>);

    impl log::Log for Capture {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if let Ok(mut records) = self.0.lock() {
                records.push((record.level(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture(Mutex::new(Vec::new()));

    /// Records logged under `label`
    fn captured(label: &str) -> Vec<(log::Level, String)> {
        CAPTURE
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, msg)| msg.starts_with(label))
            .cloned()
            .collect()
    }

    fn install_capture() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            if log::set_logger(&CAPTURE).is_ok() {
                log::set_max_level(log::LevelFilter::Trace);
            }
        });
    }

    #[derive(Default)]
    struct RecordingSleeper(RefCell<Vec<Duration>>);

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.0.borrow_mut().push(duration);
        }
    }

    #[test]
    fn backoff_exponential() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_duration(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_duration(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_duration(3), Duration::from_secs(8));
    }

    #[test]
    fn total_backoff_default() {
        // 2 + 4 + 8 + 16
        assert_eq!(RetryPolicy::default().total_backoff(), Duration::from_secs(30));
    }

    #[test]
    fn succeeds_first_try_without_sleeping() {
        let sleeper = RecordingSleeper::default();
        let result: Result<u32, Exhausted<String>> = retry_with_backoff(
            "t",
            &RetryPolicy::default(),
            &sleeper,
            &ProgressBar::hidden(),
            || Ok(7),
        );
        assert_eq!(result.unwrap(), 7);
        assert!(sleeper.0.borrow().is_empty());
    }

    #[test]
    fn recovers_after_transient_failures() {
        let sleeper = RecordingSleeper::default();
        let calls = Cell::new(0);
        let result = retry_with_backoff(
            "t",
            &RetryPolicy::default(),
            &sleeper,
            &ProgressBar::hidden(),
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 { Err("boom") } else { Ok("done") }
            },
        );
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 3);
        assert_eq!(
            *sleeper.0.borrow(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn exhausts_after_max_attempts() {
        let sleeper = RecordingSleeper::default();
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(5);
        let err = retry_with_backoff::<(), _>("t", &policy, &sleeper, &ProgressBar::hidden(), || {
            calls.set(calls.get() + 1);
            Err("down")
        })
        .unwrap_err();
        assert_eq!(calls.get(), 5);
        assert_eq!(err.attempts, 5);
        assert_eq!(err.last_error, "down");
        let slept: Duration = sleeper.0.borrow().iter().sum();
        assert_eq!(slept, policy.total_backoff());
    }

    #[test]
    fn zero_budget_still_tries_once() {
        let sleeper = RecordingSleeper::default();
        let calls = Cell::new(0);
        let err = retry_with_backoff::<(), _>(
            "t",
            &RetryPolicy::new(0),
            &sleeper,
            &ProgressBar::hidden(),
            || {
                calls.set(calls.get() + 1);
                Err("down")
            },
        )
        .unwrap_err();
        assert_eq!(calls.get(), 1);
        assert_eq!(err.attempts, 1);
        assert!(sleeper.0.borrow().is_empty());
    }

    #[test]
    fn exhaustion_is_not_logged_as_error() {
        install_capture();
        let label = "exhaustion-log-level";
        let _ = retry_with_backoff::<(), _>(
            label,
            &RetryPolicy::new(3),
            &RecordingSleeper::default(),
            &ProgressBar::hidden(),
            || Err("down"),
        );
        let records = captured(label);
        assert!(records.iter().all(|(level, _)| *level != log::Level::Error));
        let warnings = records
            .iter()
            .filter(|(level, _)| *level == log::Level::Warn)
            .count();
        // one per retry; the caller reports the give-up
        assert_eq!(warnings, 2);
        assert!(records
            .iter()
            .any(|(level, msg)| *level == log::Level::Debug && msg.contains("failed after 3")));
    }
}
