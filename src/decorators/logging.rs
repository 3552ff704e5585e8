//! Logging decorator.

use std::fmt;
use std::time::Instant;

use crate::chain::Chain;
use crate::decorator::{ChainDecorator, DecoratorSpec};
use crate::signature::{Outcome, Signature};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    #[default]
    Debug,
    Info,
    Warn,
}

macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            LogLevel::Trace => tracing::trace!(target: "decorations", $($arg)+),
            LogLevel::Debug => tracing::debug!(target: "decorations", $($arg)+),
            LogLevel::Info => tracing::info!(target: "decorations", $($arg)+),
            LogLevel::Warn => tracing::warn!(target: "decorations", $($arg)+),
        }
    };
}

/// Logs entry, result and elapsed time of every call it wraps.
///
/// Failures are always logged at `warn`.
///
/// ```rust
/// use decorations::{DecorationTable, LogLevel, Logging, MethodSig};
///
/// struct Store;
/// type Get = MethodSig<Store, u32, String, String>;
///
/// let mut class = DecorationTable::<Store>::builder();
/// let get = class
///     .decorate(Logging::spec::<Get>(LogLevel::Info))
///     .define("get", |_: &Store, id: &u32| Ok(format!("item-{id}")))
///     .unwrap();
/// assert_eq!(get.call(&Store, 7), Ok("item-7".to_string()));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Logging {
    level: LogLevel,
}

impl Logging {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    pub fn spec<S>(level: LogLevel) -> DecoratorSpec<S>
    where
        S: Signature,
        S::Error: fmt::Display,
    {
        DecoratorSpec::manual(move || Logging::new(level))
    }
}

impl<S> ChainDecorator<S> for Logging
where
    S: Signature,
    S::Error: fmt::Display,
{
    fn call(&mut self, mut chain: Chain<'_, S>) -> Outcome<S> {
        let key = chain.context().key();
        log_at!(self.level, method = %key, remaining = chain.remaining(), "calling");

        let started = Instant::now();
        let result = chain.call_next();
        let elapsed_us = started.elapsed().as_micros() as u64;

        match &result {
            Ok(_) => log_at!(self.level, method = %key, elapsed_us, "completed"),
            Err(error) => tracing::warn!(target: "decorations", method = %key, elapsed_us, %error, "failed"),
        }
        result
    }
}
