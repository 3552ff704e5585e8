//! Diagnostic observers for decorated invocations.
//!
//! Observers are attached per class through
//! [`ClassBuilder::observe`](crate::ClassBuilder::observe) and see every
//! decorated call of that class: when it starts, which decorators it enters,
//! whether it reaches the original method, and how it ended. Undecorated
//! methods are plain calls and are never observed.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::key::MethodKey;

/// Observer for decorated invocations.
///
/// Observer calls are made synchronously on the calling thread. Keep
/// implementations cheap. Every method defaults to a no-op.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use decorations::{ChainObserver, MethodKey};
///
/// struct SlowCallReporter { threshold: Duration }
///
/// impl ChainObserver for SlowCallReporter {
///     fn invocation_finished(&self, key: &MethodKey, duration: Duration, _succeeded: bool) {
///         if duration > self.threshold {
///             eprintln!("slow call: {} took {:?}", key, duration);
///         }
///     }
/// }
///
/// let observer: Arc<dyn ChainObserver> =
///     Arc::new(SlowCallReporter { threshold: Duration::from_millis(50) });
/// # let _ = observer;
/// ```
pub trait ChainObserver: Send + Sync {
    /// A decorated call is starting.
    fn invocation_started(&self, key: &MethodKey) {
        let _ = key;
    }

    /// A decorator was entered. `position` is its index in the chain, so a
    /// retried remainder reports the same positions again.
    fn decorator_entered(&self, key: &MethodKey, decorator: &'static str, position: usize) {
        let _ = (key, decorator, position);
    }

    /// The chain was exhausted and the original method is about to run.
    fn terminal_reached(&self, key: &MethodKey) {
        let _ = key;
    }

    /// The decorated call returned.
    fn invocation_finished(&self, key: &MethodKey, duration: Duration, succeeded: bool) {
        let _ = (key, duration, succeeded);
    }
}

/// Observers registered on one class.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ChainObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn ChainObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    #[inline]
    pub(crate) fn invocation_started(&self, key: &MethodKey) {
        for observer in &self.observers {
            observer.invocation_started(key);
        }
    }

    #[inline]
    pub(crate) fn decorator_entered(&self, key: &MethodKey, decorator: &'static str, position: usize) {
        for observer in &self.observers {
            observer.decorator_entered(key, decorator, position);
        }
    }

    #[inline]
    pub(crate) fn terminal_reached(&self, key: &MethodKey) {
        for observer in &self.observers {
            observer.terminal_reached(key);
        }
    }

    #[inline]
    pub(crate) fn invocation_finished(&self, key: &MethodKey, duration: Duration, succeeded: bool) {
        for observer in &self.observers {
            observer.invocation_finished(key, duration, succeeded);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers").field("count", &self.len()).finish()
    }
}

/// Emits each event as a `tracing` event under the `decorations` target.
///
/// ```rust
/// use std::sync::Arc;
/// use decorations::{DecorationTable, TracingObserver};
///
/// struct Greeter;
///
/// let mut class = DecorationTable::<Greeter>::builder();
/// class.observe(Arc::new(TracingObserver::new()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TracingObserver {
    label: Option<String>,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `label` field to every event, e.g. a component name.
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }

    fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }
}

impl ChainObserver for TracingObserver {
    fn invocation_started(&self, key: &MethodKey) {
        tracing::trace!(target: "decorations", label = self.label(), method = %key, "invocation started");
    }

    fn decorator_entered(&self, key: &MethodKey, decorator: &'static str, position: usize) {
        tracing::trace!(
            target: "decorations",
            label = self.label(),
            method = %key,
            decorator,
            position,
            "decorator entered"
        );
    }

    fn terminal_reached(&self, key: &MethodKey) {
        tracing::trace!(target: "decorations", label = self.label(), method = %key, "calling original method");
    }

    fn invocation_finished(&self, key: &MethodKey, duration: Duration, succeeded: bool) {
        tracing::debug!(
            target: "decorations",
            label = self.label(),
            method = %key,
            elapsed_us = duration.as_micros() as u64,
            succeeded,
            "invocation finished"
        );
    }
}

/// Counts events; useful in tests and for cheap health metrics.
///
/// ```rust
/// use decorations::{ChainObserver, CountingObserver, ClassId, MethodKey};
/// use std::time::Duration;
///
/// struct Greeter;
///
/// let counter = CountingObserver::new();
/// let key = MethodKey::new(ClassId::of::<Greeter>(), "greet");
/// counter.invocation_started(&key);
/// counter.invocation_finished(&key, Duration::ZERO, false);
///
/// let counts = counter.snapshot();
/// assert_eq!(counts.invocations, 1);
/// assert_eq!(counts.failures, 1);
/// ```
#[derive(Debug, Default)]
pub struct CountingObserver {
    invocations: AtomicU64,
    decorators_entered: AtomicU64,
    terminal_calls: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time copy of a [`CountingObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserverCounts {
    pub invocations: u64,
    pub decorators_entered: u64,
    pub terminal_calls: u64,
    pub failures: u64,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ObserverCounts {
        ObserverCounts {
            invocations: self.invocations.load(Ordering::Relaxed),
            decorators_entered: self.decorators_entered.load(Ordering::Relaxed),
            terminal_calls: self.terminal_calls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl ChainObserver for CountingObserver {
    fn invocation_started(&self, _key: &MethodKey) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
    }

    fn decorator_entered(&self, _key: &MethodKey, _decorator: &'static str, _position: usize) {
        self.decorators_entered.fetch_add(1, Ordering::Relaxed);
    }

    fn terminal_reached(&self, _key: &MethodKey) {
        self.terminal_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn invocation_finished(&self, _key: &MethodKey, _duration: Duration, succeeded: bool) {
        if !succeeded {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}
