//! # decorations
//!
//! Ordered decorator chains for methods: before, after and around hooks,
//! short-circuiting, and in-place retry, attached through explicit
//! registration.
//!
//! ## Features
//!
//! - **Declarative registration**: queue decorators with `decorate`, and the
//!   next `define` captures them
//! - **Two authoring styles**: manual decorators drive the chain themselves,
//!   hook-style decorators declare before/after/around hooks
//! - **Typed chains**: decorators see the real receiver, arguments and error
//!   type of the method they wrap
//! - **Per-invocation state**: every call builds fresh decorator instances, so
//!   overlapping calls never share state
//! - **Retry**: bounded in-place re-execution with optional quadratic backoff
//! - **Kill switch**: disable decoration process-wide for methods defined
//!   afterwards
//!
//! ## Quick Start
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::convert::Infallible;
//! use decorations::{
//!     CallContext, Chain, ChainDecorator, DecorationTable, DecoratorSpec, HookSetBuilder,
//!     HookedDecorator, MethodSig, Outcome,
//! };
//!
//! struct Greeter {
//!     log: RefCell<Vec<String>>,
//! }
//! type Greet = MethodSig<Greeter, String, String, Infallible>;
//!
//! // Manual style: full control of the continuation.
//! struct Shout;
//! impl ChainDecorator<Greet> for Shout {
//!     fn call(&mut self, mut chain: Chain<'_, Greet>) -> Outcome<Greet> {
//!         Ok(chain.call_next()?.to_uppercase())
//!     }
//! }
//!
//! // Hook style: named hooks around the rest of the chain.
//! struct Trace;
//! impl Trace {
//!     fn enter(&self, cx: &CallContext<'_, Greet>) -> Result<(), Infallible> {
//!         cx.receiver().log.borrow_mut().push(format!("enter {}", cx.decorated_method().name()));
//!         Ok(())
//!     }
//!     fn leave(&self, cx: &CallContext<'_, Greet>) -> Result<(), Infallible> {
//!         cx.receiver().log.borrow_mut().push("leave".to_string());
//!         Ok(())
//!     }
//! }
//! impl HookedDecorator<Greet> for Trace {
//!     fn hooks(hooks: HookSetBuilder<Self, Greet>) -> HookSetBuilder<Self, Greet> {
//!         hooks.before().def("enter", Self::enter).after().def("leave", Self::leave)
//!     }
//! }
//!
//! let mut class = DecorationTable::<Greeter>::builder();
//! let greet = class
//!     .decorate(DecoratorSpec::<Greet>::hooked(|| Trace))
//!     .decorate(DecoratorSpec::manual(|| Shout))
//!     .define("greet", |_: &Greeter, name: &String| Ok(format!("hello, {name}")))
//!     .unwrap();
//! let table = class.build();
//!
//! let greeter = Greeter { log: RefCell::new(Vec::new()) };
//! assert_eq!(greet.call(&greeter, "ada".to_string()), Ok("HELLO, ADA".to_string()));
//! assert_eq!(*greeter.log.borrow(), vec!["enter greet", "leave"]);
//! assert_eq!(table.decorated_len(), 1);
//! ```
//!
//! ## Call Order
//!
//! Decorators run in declaration order, the first declared being outermost.
//! For hook-style decorators `[D1, D2]` on method `m`:
//!
//! ```text
//! D1.before, D2.before, m, D2.after, D1.after
//! ```
//!
//! An error anywhere propagates outward unchanged and skips every later step,
//! including pending after hooks. [`AfterOrder::Declared`] runs the after
//! hooks in declaration order once the whole chain returned instead.
//!
//! ## Disabling
//!
//! ```rust
//! use std::convert::Infallible;
//! use decorations::{ChainDecorator, DecorationTable, DecoratorSpec, DisabledGuard, MethodSig};
//!
//! struct Service;
//! type Ping = MethodSig<Service, (), &'static str, Infallible>;
//! struct Passthrough;
//! impl ChainDecorator<Ping> for Passthrough {}
//!
//! let guard = DisabledGuard::new();
//! let mut class = DecorationTable::<Service>::builder();
//! let ping = class
//!     .decorate(DecoratorSpec::<Ping>::manual(|| Passthrough))
//!     .define("ping", |_: &Service, _: &()| Ok("pong"))
//!     .unwrap();
//! drop(guard);
//!
//! assert!(!ping.is_decorated());
//! assert_eq!(ping.call(&Service, ()), Ok("pong"));
//! ```

// Module declarations
pub mod chain;
pub mod config;
pub mod decorator;
pub mod decorators;
pub mod error;
pub mod export;
pub mod hooks;
pub mod key;
pub mod observer;
pub mod signature;
pub mod sleeper;
pub mod switch;
pub mod table;

mod internal;

// Re-exports
pub use chain::{AfterOrder, CallContext, Chain};
pub use config::{ConfigSource, DecorationsConfig, EnvironmentConfigSource, MapConfigSource};
pub use decorator::{ChainDecorator, DecoratorInfo, DecoratorSpec, DecoratorStyle, LiveDecorator};
pub use decorators::{LogLevel, Logging, RescueFrom, Retry, RetryOptions};
pub use error::{DecorationError, DecorationResult};
pub use export::{DecoratorReport, MethodReport, ReportMetadata, TableReport};
pub use hooks::{AroundHook, HookNames, HookSet, HookSetBuilder, HookedDecorator, Marked, Next, PlainHook};
pub use key::{ClassId, MethodKey};
pub use observer::{ChainObserver, CountingObserver, ObserverCounts, TracingObserver};
pub use signature::{Binding, MethodHandle, MethodSig, Outcome, Signature};
pub use sleeper::{RecordingSleeper, Sleeper, ThreadSleeper};
pub use switch::{disable, enable, is_disabled, set_disabled, DisabledGuard};
pub use table::{ClassBuilder, DecorationEntry, DecorationTable, Method, MethodInfo, PendingMethod};
