//! Pluggable sleeping for retry backoff.

use std::fmt;
use std::time::Duration;

use crate::internal::Mutex;

/// Something that can pause the calling thread.
///
/// Retry sleeps through this trait so tests can record delays instead of
/// waiting them out.
pub trait Sleeper: Send + Sync + fmt::Debug {
    fn sleep(&self, duration: Duration);
}

/// Sleeps on the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Records requested delays without sleeping.
///
/// ```rust
/// use std::time::Duration;
/// use decorations::{RecordingSleeper, Sleeper};
///
/// let sleeper = RecordingSleeper::new();
/// sleeper.sleep(Duration::from_secs(1));
/// sleeper.sleep(Duration::from_secs(4));
///
/// assert_eq!(sleeper.recorded(), vec![Duration::from_secs(1), Duration::from_secs(4)]);
/// assert_eq!(sleeper.total(), Duration::from_secs(5));
/// ```
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }

    pub fn total(&self) -> Duration {
        self.slept.lock().iter().sum()
    }

    pub fn clear(&self) {
        self.slept.lock().clear();
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
    }
}
