use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::time::Duration;

use decorations::{
    Chain, ChainDecorator, DecorationError, DecorationTable, DecoratorSpec, MethodSig, Outcome,
    RecordingSleeper, RescueFrom, Retry, RetryOptions,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("connection reset")]
struct ConnectionReset;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
enum FetchError {
    #[error("transient: {0}")]
    Transient(#[source] ConnectionReset),
    #[error("not found")]
    NotFound,
}

/// Fails the first `failures` runs, then succeeds.
struct Endpoint {
    failures: Cell<u32>,
    runs: Cell<u32>,
    error: FetchError,
}

impl Endpoint {
    fn failing(failures: u32) -> Self {
        Self::failing_with(failures, FetchError::Transient(ConnectionReset))
    }

    fn failing_with(failures: u32, error: FetchError) -> Self {
        Self {
            failures: Cell::new(failures),
            runs: Cell::new(0),
            error,
        }
    }
}

type Fetch = MethodSig<Endpoint, (), &'static str, FetchError>;

fn fetch(endpoint: &Endpoint, _: &()) -> Outcome<Fetch> {
    endpoint.runs.set(endpoint.runs.get() + 1);
    match endpoint.failures.get() {
        0 => Ok("body"),
        left => {
            endpoint.failures.set(left - 1);
            Err(endpoint.error.clone())
        }
    }
}

fn retrying(options: RetryOptions, rescue: RescueFrom<FetchError>) -> (Arc<RecordingSleeper>, DecoratorSpec<Fetch>) {
    let sleeper = Arc::new(RecordingSleeper::new());
    let spec = Retry::<Fetch>::spec_with_sleeper(options, rescue, sleeper.clone()).unwrap();
    (sleeper, spec)
}

fn define(spec: DecoratorSpec<Fetch>) -> decorations::Method<Fetch> {
    let mut class = DecorationTable::<Endpoint>::builder();
    class.decorate(spec).define("fetch", fetch).unwrap()
}

#[test]
fn succeeds_on_the_last_allowed_try() {
    let (sleeper, spec) = retrying(RetryOptions::new(3), RescueFrom::any());
    let method = define(spec);

    let endpoint = Endpoint::failing(2);
    assert_eq!(method.call(&endpoint, ()), Ok("body"));
    assert_eq!(endpoint.runs.get(), 3);
    assert!(sleeper.recorded().is_empty());
}

#[test]
fn gives_up_after_the_configured_tries() {
    let (_, spec) = retrying(RetryOptions::new(3), RescueFrom::any());
    let method = define(spec);

    let endpoint = Endpoint::failing(5);
    assert_eq!(method.call(&endpoint, ()), Err(FetchError::Transient(ConnectionReset)));
    assert_eq!(endpoint.runs.get(), 3);
}

#[test]
fn a_single_try_never_retries() {
    let (_, spec) = retrying(RetryOptions::default(), RescueFrom::any());
    let method = define(spec);

    let endpoint = Endpoint::failing(1);
    assert!(method.call(&endpoint, ()).is_err());
    assert_eq!(endpoint.runs.get(), 1);
}

#[test]
fn unrescued_errors_propagate_immediately() {
    let rescue = RescueFrom::when("transient", |err: &FetchError| matches!(err, FetchError::Transient(_)));
    let (_, spec) = retrying(RetryOptions::new(5), rescue);
    let method = define(spec);

    let endpoint = Endpoint::failing_with(3, FetchError::NotFound);
    assert_eq!(method.call(&endpoint, ()), Err(FetchError::NotFound));
    assert_eq!(endpoint.runs.get(), 1);
}

#[test]
fn rescue_by_kind_walks_the_source_chain() {
    let rescue = RescueFrom::<FetchError>::kind::<ConnectionReset>();
    assert!(rescue.matches(&FetchError::Transient(ConnectionReset)));
    assert!(!rescue.matches(&FetchError::NotFound));

    let (_, spec) = retrying(RetryOptions::new(2), rescue);
    let method = define(spec);
    let endpoint = Endpoint::failing(1);
    assert_eq!(method.call(&endpoint, ()), Ok("body"));
    assert_eq!(endpoint.runs.get(), 2);
}

#[test]
fn backoff_sleeps_quadratically() {
    let (sleeper, spec) = retrying(RetryOptions::new(4).with_backoff(-1), RescueFrom::any());
    let method = define(spec);

    let endpoint = Endpoint::failing(3);
    assert_eq!(method.call(&endpoint, ()), Ok("body"));
    assert_eq!(
        sleeper.recorded(),
        vec![Duration::ZERO, Duration::from_secs(1), Duration::from_secs(4)]
    );
}

#[test]
fn backoff_starts_from_the_configured_base() {
    let options = RetryOptions::new(3)
        .with_backoff(1)
        .with_delay_unit(Duration::from_millis(1));
    let (sleeper, spec) = retrying(options, RescueFrom::any());
    let method = define(spec);

    let endpoint = Endpoint::failing(9);
    assert!(method.call(&endpoint, ()).is_err());
    // No sleep after the final failure.
    assert_eq!(
        sleeper.recorded(),
        vec![Duration::from_millis(4), Duration::from_millis(9)]
    );
}

#[test]
fn retry_budget_is_per_call() {
    let (_, spec) = retrying(RetryOptions::new(2), RescueFrom::any());
    let method = define(spec);

    let endpoint = Endpoint::failing(1);
    assert_eq!(method.call(&endpoint, ()), Ok("body"));
    endpoint.failures.set(1);
    assert_eq!(method.call(&endpoint, ()), Ok("body"));
    assert_eq!(endpoint.runs.get(), 4);
}

#[test]
fn zero_tries_is_rejected_at_registration() {
    let err = Retry::<Fetch>::spec(RetryOptions::new(0), RescueFrom::any()).unwrap_err();
    assert_eq!(err, DecorationError::InvalidRetry("tries must be greater than zero"));
}

/// Decorators inside a retry run again on every attempt.
#[test]
fn retry_reruns_inner_decorators() {
    struct Attempts;

    impl ChainDecorator<Fetch> for Attempts {
        fn call(&mut self, mut chain: Chain<'_, Fetch>) -> Outcome<Fetch> {
            ATTEMPTS.with(|attempts| attempts.borrow_mut().push(chain.remaining()));
            chain.call_next()
        }
    }

    thread_local! {
        static ATTEMPTS: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
    }

    let (_, retry) = retrying(RetryOptions::new(3), RescueFrom::any());
    let mut class = DecorationTable::<Endpoint>::builder();
    let method = class
        .decorate(retry)
        .decorate(DecoratorSpec::manual(|| Attempts))
        .define("fetch", fetch)
        .unwrap();

    let endpoint = Endpoint::failing(2);
    assert_eq!(method.call(&endpoint, ()), Ok("body"));
    assert_eq!(ATTEMPTS.with(|attempts| attempts.borrow().clone()), vec![0, 0, 0]);
}
