//! Retry decorator.
//!
//! Re-runs the rest of the chain in place when it fails with a rescued error,
//! up to `tries` runs in total. With backoff enabled, the delay before retry
//! `k` (1-based) is `(sleep_duration + k)²` delay units: with the default
//! `sleep_duration` of `-1` the delays are `0, 1, 4, 9, ...` seconds.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::sync::Arc;
//! use decorations::{DecorationTable, RecordingSleeper, RescueFrom, Retry, RetryOptions, MethodSig};
//!
//! struct Flaky { failures_left: Cell<u32> }
//! type Fetch = MethodSig<Flaky, (), &'static str, String>;
//!
//! let sleeper = Arc::new(RecordingSleeper::new());
//! let retry = Retry::<Fetch>::spec_with_sleeper(
//!     RetryOptions::new(3).with_backoff(-1),
//!     RescueFrom::any(),
//!     sleeper.clone(),
//! )
//! .unwrap();
//!
//! let mut class = DecorationTable::<Flaky>::builder();
//! let fetch = class
//!     .decorate(retry)
//!     .define("fetch", |f: &Flaky, _: &()| match f.failures_left.get() {
//!         0 => Ok("payload"),
//!         n => {
//!             f.failures_left.set(n - 1);
//!             Err("timeout".to_string())
//!         }
//!     })
//!     .unwrap();
//!
//! let flaky = Flaky { failures_left: Cell::new(2) };
//! assert_eq!(fetch.call(&flaky, ()), Ok("payload"));
//! assert_eq!(sleeper.recorded().len(), 2);
//! ```

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::decorator::DecoratorSpec;
use crate::error::{DecorationError, DecorationResult};
use crate::hooks::{HookSetBuilder, HookedDecorator, Next};
use crate::signature::{Outcome, Signature};
use crate::sleeper::{Sleeper, ThreadSleeper};

/// Retry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct RetryOptions {
    /// Total runs allowed, including the first; must be at least 1
    pub tries: u32,
    /// Sleep between runs
    pub backoff: bool,
    /// Backoff base; incremented before each sleep, then squared
    pub sleep_duration: i64,
    /// Length of one backoff step
    pub delay_unit: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            tries: 1,
            backoff: false,
            sleep_duration: -1,
            delay_unit: Duration::from_secs(1),
        }
    }
}

impl RetryOptions {
    pub fn new(tries: u32) -> Self {
        Self {
            tries,
            ..Self::default()
        }
    }

    /// Enables backoff starting from `sleep_duration`.
    pub fn with_backoff(mut self, sleep_duration: i64) -> Self {
        self.backoff = true;
        self.sleep_duration = sleep_duration;
        self
    }

    pub fn with_delay_unit(mut self, delay_unit: Duration) -> Self {
        self.delay_unit = delay_unit;
        self
    }

    pub fn validate(&self) -> DecorationResult<()> {
        if self.tries == 0 {
            return Err(DecorationError::InvalidRetry("tries must be greater than zero"));
        }
        Ok(())
    }

    /// Sleep for an incremented backoff base of `step`.
    pub fn backoff_delay(&self, step: i64) -> Duration {
        let squared = step.saturating_mul(step);
        let factor = u32::try_from(squared).unwrap_or(u32::MAX);
        self.delay_unit.saturating_mul(factor)
    }
}

/// Which errors a [`Retry`] rescues.
///
/// Unrescued errors propagate immediately without consuming a try.
pub struct RescueFrom<E> {
    label: &'static str,
    matches: Arc<dyn Fn(&E) -> bool + Send + Sync>,
}

impl<E: 'static> RescueFrom<E> {
    /// Rescues every error.
    pub fn any() -> Self {
        Self::when("any", |_| true)
    }

    /// Rescues errors matching `predicate`.
    pub fn when<F>(label: &'static str, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            label,
            matches: Arc::new(predicate),
        }
    }

    pub fn matches(&self, error: &E) -> bool {
        (self.matches)(error)
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl<E: std::error::Error + 'static> RescueFrom<E> {
    /// Rescues errors that are, or were caused by, a `K`.
    ///
    /// ```rust
    /// use decorations::RescueFrom;
    ///
    /// let rescue = RescueFrom::<std::io::Error>::kind::<std::io::Error>();
    /// assert!(rescue.matches(&std::io::Error::new(std::io::ErrorKind::Other, "reset")));
    /// ```
    pub fn kind<K: std::error::Error + 'static>() -> Self {
        Self::when(std::any::type_name::<K>(), |error: &E| {
            let mut current: Option<&(dyn std::error::Error + 'static)> = Some(error);
            while let Some(err) = current {
                if err.is::<K>() {
                    return true;
                }
                current = err.source();
            }
            false
        })
    }
}

impl<E: 'static> Default for RescueFrom<E> {
    fn default() -> Self {
        Self::any()
    }
}

impl<E> Clone for RescueFrom<E> {
    fn clone(&self) -> Self {
        Self {
            label: self.label,
            matches: Arc::clone(&self.matches),
        }
    }
}

impl<E> fmt::Debug for RescueFrom<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RescueFrom").field(&self.label).finish()
    }
}

/// Hook-style decorator that retries the rest of the chain.
///
/// The countdown lives in the instance, which is built fresh for every call.
pub struct Retry<S: Signature> {
    options: RetryOptions,
    rescue: RescueFrom<S::Error>,
    sleeper: Arc<dyn Sleeper>,
    tries: Cell<u32>,
    sleep_duration: Cell<i64>,
}

impl<S: Signature> Retry<S> {
    pub fn new(options: RetryOptions, rescue: RescueFrom<S::Error>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            tries: Cell::new(options.tries),
            sleep_duration: Cell::new(options.sleep_duration),
            options,
            rescue,
            sleeper,
        }
    }

    /// Spec sleeping on the calling thread.
    pub fn spec(options: RetryOptions, rescue: RescueFrom<S::Error>) -> DecorationResult<DecoratorSpec<S>> {
        Self::spec_with_sleeper(options, rescue, Arc::new(ThreadSleeper))
    }

    pub fn spec_with_sleeper(
        options: RetryOptions,
        rescue: RescueFrom<S::Error>,
        sleeper: Arc<dyn Sleeper>,
    ) -> DecorationResult<DecoratorSpec<S>> {
        options.validate()?;
        Ok(DecoratorSpec::hooked(move || {
            Retry::new(options.clone(), rescue.clone(), Arc::clone(&sleeper))
        }))
    }

    /// Runs left before the retry budget is exhausted.
    pub fn remaining(&self) -> u32 {
        self.tries.get()
    }

    fn do_retries(&self, next: &mut Next<'_, S>) -> Outcome<S> {
        loop {
            let error = match next.proceed() {
                Ok(output) => return Ok(output),
                Err(error) => error,
            };
            if !self.rescue.matches(&error) {
                return Err(error);
            }

            let remaining = self.tries.get().saturating_sub(1);
            self.tries.set(remaining);
            if remaining == 0 {
                tracing::debug!(
                    target: "decorations",
                    method = %next.key(),
                    attempts = next.calls(),
                    "retries exhausted"
                );
                return Err(error);
            }

            let delay = if self.options.backoff {
                let step = self.sleep_duration.get().saturating_add(1);
                self.sleep_duration.set(step);
                let delay = self.options.backoff_delay(step);
                self.sleeper.sleep(delay);
                delay
            } else {
                Duration::ZERO
            };
            tracing::debug!(
                target: "decorations",
                method = %next.key(),
                rescue = self.rescue.label(),
                attempt = next.calls(),
                remaining,
                delay_ms = delay.as_millis() as u64,
                "retrying"
            );
        }
    }
}

impl<S: Signature> HookedDecorator<S> for Retry<S> {
    fn hooks(hooks: HookSetBuilder<Self, S>) -> HookSetBuilder<Self, S> {
        hooks.around().def("do_retries", Self::do_retries)
    }
}

impl<S: Signature> fmt::Debug for Retry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("options", &self.options)
            .field("rescue", &self.rescue)
            .field("remaining", &self.tries.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RetryOptions::default();
        assert_eq!(options.tries, 1);
        assert!(!options.backoff);
        assert_eq!(options.sleep_duration, -1);
        assert_eq!(options.delay_unit, Duration::from_secs(1));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_zero_tries_is_invalid() {
        assert_eq!(
            RetryOptions::new(0).validate(),
            Err(DecorationError::InvalidRetry("tries must be greater than zero"))
        );
    }

    #[test]
    fn test_backoff_delay_is_squared() {
        let options = RetryOptions::new(5).with_backoff(-1);
        let delays: Vec<_> = (0..4).map(|step| options.backoff_delay(step)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::ZERO,
                Duration::from_secs(1),
                Duration::from_secs(4),
                Duration::from_secs(9)
            ]
        );
        assert_eq!(options.backoff_delay(-3), Duration::from_secs(9));
        assert_eq!(
            options.with_delay_unit(Duration::from_millis(10)).backoff_delay(2),
            Duration::from_millis(40)
        );
    }

    #[test]
    fn test_rescue_predicates() {
        let timeouts = RescueFrom::<String>::when("timeout", |e| e.contains("timeout"));
        assert!(timeouts.matches(&"read timeout".to_string()));
        assert!(!timeouts.matches(&"refused".to_string()));
        assert_eq!(timeouts.label(), "timeout");
        assert!(RescueFrom::<String>::any().matches(&String::new()));
    }
}
