//! Hook-style decorators.
//!
//! A hook-style decorator names instance methods as `before`, `after` or
//! `around` hooks instead of driving the chain itself. Each registration uses a
//! one-shot marker: `before()`, `after()` or `around()` applies to exactly the
//! next `def`, and the marker type makes forgetting that `def` a compile error
//! rather than a silently misfiled hook.
//!
//! ```rust
//! use std::cell::Cell;
//! use decorations::{CallContext, HookSetBuilder, HookedDecorator, MethodSig};
//!
//! struct Service;
//! type Ping = MethodSig<Service>;
//!
//! #[derive(Default)]
//! struct Audit { seen: Cell<u32> }
//!
//! impl Audit {
//!     fn record(&self, _cx: &CallContext<'_, Ping>) -> Result<(), std::convert::Infallible> {
//!         self.seen.set(self.seen.get() + 1);
//!         Ok(())
//!     }
//! }
//!
//! impl HookedDecorator<Ping> for Audit {
//!     fn hooks(hooks: HookSetBuilder<Self, Ping>) -> HookSetBuilder<Self, Ping> {
//!         hooks.before().def("record", Self::record)
//!     }
//! }
//! ```
//!
//! Hooks run in this order for one decorator:
//!
//! 1. every `before` hook, in registration order
//! 2. the `around` hooks, outermost first, wrapping the rest of the chain
//! 3. every `after` hook, in registration order, only if nothing failed
//!
//! Registering the same name twice in one category keeps the first position
//! and replaces the body.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::chain::{CallContext, Chain};
use crate::key::{ClassId, MethodKey};
use crate::signature::{MethodHandle, Outcome, Signature};

/// A `before` or `after` hook.
pub type PlainHook<D, S> =
    for<'d, 'c, 'a> fn(&'d D, &'c CallContext<'a, S>) -> Result<(), <S as Signature>::Error>;

/// An `around` hook. It runs the wrapped remainder through [`Next::proceed`].
pub type AroundHook<D, S> = for<'d, 'n, 'a> fn(&'d D, &'n mut Next<'a, S>) -> Outcome<S>;

/// A decorator that declares hooks instead of implementing [`ChainDecorator`].
///
/// Hooks take `&self`; keep per-invocation state in `Cell`s. A fresh instance
/// is built for every decorated call.
///
/// [`ChainDecorator`]: crate::ChainDecorator
pub trait HookedDecorator<S: Signature>: Sized + 'static {
    /// Registers this decorator's hooks.
    fn hooks(hooks: HookSetBuilder<Self, S>) -> HookSetBuilder<Self, S>;
}

struct Named<H> {
    name: &'static str,
    hook: H,
}

fn register<H>(list: &mut Vec<Named<H>>, name: &'static str, hook: H) {
    match list.iter_mut().find(|named| named.name == name) {
        Some(existing) => existing.hook = hook,
        None => list.push(Named { name, hook }),
    }
}

/// Hooks declared by one decorator type, in registration order.
pub struct HookSet<D, S: Signature> {
    before: Vec<Named<PlainHook<D, S>>>,
    after: Vec<Named<PlainHook<D, S>>>,
    around: Vec<Named<AroundHook<D, S>>>,
}

impl<D, S: Signature> HookSet<D, S> {
    pub fn builder() -> HookSetBuilder<D, S> {
        HookSetBuilder {
            set: HookSet {
                before: Vec::new(),
                after: Vec::new(),
                around: Vec::new(),
            },
        }
    }

    /// Names of the registered hooks.
    pub fn names(&self) -> HookNames {
        HookNames {
            before: self.before.iter().map(|named| named.name).collect(),
            after: self.after.iter().map(|named| named.name).collect(),
            around: self.around.iter().map(|named| named.name).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.before.len() + self.after.len() + self.around.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<D, S: Signature> fmt::Debug for HookSet<D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HookSet").field(&self.names()).finish()
    }
}

pub(crate) fn collect<D: HookedDecorator<S>, S: Signature>() -> HookSet<D, S> {
    D::hooks(HookSet::builder()).build()
}

/// Hook names per category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HookNames {
    pub before: Vec<&'static str>,
    pub after: Vec<&'static str>,
    pub around: Vec<&'static str>,
}

impl HookNames {
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty() && self.around.is_empty()
    }
}

/// Marker kinds for [`Marked`].
pub mod kind {
    /// The next `def` becomes a before hook
    #[derive(Debug)]
    pub enum Before {}
    /// The next `def` becomes an after hook
    #[derive(Debug)]
    pub enum After {}
    /// The next `def` becomes an around hook
    #[derive(Debug)]
    pub enum Around {}
}

/// Collects hooks for one decorator type.
pub struct HookSetBuilder<D, S: Signature> {
    set: HookSet<D, S>,
}

impl<D, S: Signature> HookSetBuilder<D, S> {
    /// Marks the next definition as a before hook.
    pub fn before(self) -> Marked<D, S, kind::Before> {
        self.mark()
    }

    /// Marks the next definition as an after hook.
    pub fn after(self) -> Marked<D, S, kind::After> {
        self.mark()
    }

    /// Marks the next definition as an around hook.
    pub fn around(self) -> Marked<D, S, kind::Around> {
        self.mark()
    }

    pub fn build(self) -> HookSet<D, S> {
        self.set
    }

    fn mark<K>(self) -> Marked<D, S, K> {
        Marked {
            set: self.set,
            _kind: PhantomData,
        }
    }
}

/// A builder with a pending one-shot marker; `def` consumes it.
#[must_use = "a hook marker only applies to the next `def`"]
pub struct Marked<D, S: Signature, K> {
    set: HookSet<D, S>,
    _kind: PhantomData<K>,
}

impl<D, S: Signature> Marked<D, S, kind::Before> {
    pub fn def(mut self, name: &'static str, hook: PlainHook<D, S>) -> HookSetBuilder<D, S> {
        register(&mut self.set.before, name, hook);
        HookSetBuilder { set: self.set }
    }
}

impl<D, S: Signature> Marked<D, S, kind::After> {
    pub fn def(mut self, name: &'static str, hook: PlainHook<D, S>) -> HookSetBuilder<D, S> {
        register(&mut self.set.after, name, hook);
        HookSetBuilder { set: self.set }
    }
}

impl<D, S: Signature> Marked<D, S, kind::Around> {
    pub fn def(mut self, name: &'static str, hook: AroundHook<D, S>) -> HookSetBuilder<D, S> {
        register(&mut self.set.around, name, hook);
        HookSetBuilder { set: self.set }
    }
}

/// The continuation handed to an around hook.
///
/// Calling [`proceed`](Next::proceed) runs the inner around hooks of the same
/// decorator, then the rest of the chain. Not calling it short-circuits;
/// calling it again re-runs the same remainder.
pub struct Next<'a, S: Signature> {
    cx: CallContext<'a, S>,
    proceed: &'a mut (dyn FnMut() -> Outcome<S> + 'a),
    calls: u32,
}

impl<'a, S: Signature> Next<'a, S> {
    fn new(cx: CallContext<'a, S>, proceed: &'a mut (dyn FnMut() -> Outcome<S> + 'a)) -> Self {
        Self {
            cx,
            proceed,
            calls: 0,
        }
    }

    /// Runs the wrapped remainder.
    pub fn proceed(&mut self) -> Outcome<S> {
        self.calls += 1;
        (self.proceed)()
    }

    /// How many times `proceed` was called so far.
    pub fn calls(&self) -> u32 {
        self.calls
    }

    pub fn context(&self) -> CallContext<'a, S> {
        self.cx
    }

    pub fn receiver(&self) -> &'a S::Receiver {
        self.cx.receiver()
    }

    pub fn args(&self) -> &'a S::Args {
        self.cx.args()
    }

    pub fn decorated_class(&self) -> ClassId {
        self.cx.decorated_class()
    }

    pub fn decorated_method(&self) -> &'a MethodHandle<S> {
        self.cx.decorated_method()
    }

    pub fn key(&self) -> MethodKey {
        self.cx.key()
    }
}

impl<S: Signature> fmt::Debug for Next<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("method", &self.cx.key().to_string())
            .field("calls", &self.calls)
            .finish()
    }
}

/// Object-safe view of a hook-style decorator instance.
pub(crate) trait HookedLink<S: Signature> {
    fn before(&self, cx: &CallContext<'_, S>) -> Result<(), S::Error>;
    fn around(&self, chain: Chain<'_, S>) -> Outcome<S>;
    fn after(&self, cx: &CallContext<'_, S>) -> Result<(), S::Error>;
}

pub(crate) struct HookedInstance<D, S: Signature> {
    decorator: D,
    hooks: Arc<HookSet<D, S>>,
}

impl<D, S: Signature> HookedInstance<D, S> {
    pub(crate) fn new(decorator: D, hooks: Arc<HookSet<D, S>>) -> Self {
        Self { decorator, hooks }
    }
}

impl<D, S: Signature> HookedLink<S> for HookedInstance<D, S> {
    fn before(&self, cx: &CallContext<'_, S>) -> Result<(), S::Error> {
        for named in &self.hooks.before {
            (named.hook)(&self.decorator, cx)?;
        }
        Ok(())
    }

    fn around(&self, mut chain: Chain<'_, S>) -> Outcome<S> {
        thread_arounds(&self.decorator, &self.hooks.around, &mut chain)
    }

    fn after(&self, cx: &CallContext<'_, S>) -> Result<(), S::Error> {
        for named in &self.hooks.after {
            (named.hook)(&self.decorator, cx)?;
        }
        Ok(())
    }
}

// The first around hook is outermost; with none left the chain continues.
fn thread_arounds<D, S: Signature>(
    decorator: &D,
    arounds: &[Named<AroundHook<D, S>>],
    chain: &mut Chain<'_, S>,
) -> Outcome<S> {
    let Some((outer, inner)) = arounds.split_first() else {
        return chain.call_next();
    };
    let cx = chain.context();
    let mut proceed = || thread_arounds(decorator, inner, chain);
    let mut next = Next::new(cx, &mut proceed);
    (outer.hook)(decorator, &mut next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::MethodSig;
    use std::convert::Infallible;

    struct Service;
    type Ping = MethodSig<Service>;

    struct Probe;

    impl Probe {
        fn first(&self, _cx: &CallContext<'_, Ping>) -> Result<(), Infallible> {
            Ok(())
        }

        fn second(&self, _cx: &CallContext<'_, Ping>) -> Result<(), Infallible> {
            Ok(())
        }

        fn wrap(&self, next: &mut Next<'_, Ping>) -> Outcome<Ping> {
            next.proceed()
        }
    }

    #[test]
    fn test_markers_file_hooks_by_category() {
        let set = HookSet::<Probe, Ping>::builder()
            .before()
            .def("first", Probe::first)
            .after()
            .def("second", Probe::second)
            .around()
            .def("wrap", Probe::wrap)
            .build();

        let names = set.names();
        assert_eq!(names.before, vec!["first"]);
        assert_eq!(names.after, vec!["second"]);
        assert_eq!(names.around, vec!["wrap"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_redefinition_keeps_first_position() {
        let set = HookSet::<Probe, Ping>::builder()
            .before()
            .def("first", Probe::first)
            .before()
            .def("second", Probe::second)
            .before()
            .def("first", Probe::second)
            .build();

        assert_eq!(set.names().before, vec!["first", "second"]);
    }

    #[test]
    fn test_empty_set() {
        let set = HookSet::<Probe, Ping>::builder().build();
        assert!(set.is_empty());
        assert!(set.names().is_empty());
    }
}
