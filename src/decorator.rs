//! Decorator specs and their per-invocation instances.
//!
//! A [`DecoratorSpec`] is what `decorate` queues: a factory for the decorator
//! plus what is known about it up front. Every decorated call instantiates each
//! spec once, producing a [`LiveDecorator`] bound to the class and method it
//! wraps. Instances never outlive the call, so two overlapping invocations
//! never observe each other's decorator state.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::chain::{AfterOrder, CallContext, Chain, Frame};
use crate::hooks::{HookNames, HookedDecorator, HookedInstance, HookedLink};
use crate::key::ClassId;
use crate::signature::{Binding, MethodHandle, Outcome, Signature};

/// A decorator with full control over its continuation.
///
/// The default implementation simply delegates, so an empty impl block is a
/// pass-through decorator.
///
/// ```rust
/// use std::cell::Cell;
/// use decorations::{Chain, ChainDecorator, MethodSig, Outcome};
///
/// struct Cache { hit: Cell<Option<u64>> }
/// type Lookup = MethodSig<Cache, u64, u64>;
///
/// struct ReadThrough;
///
/// impl ChainDecorator<Lookup> for ReadThrough {
///     fn call(&mut self, mut chain: Chain<'_, Lookup>) -> Outcome<Lookup> {
///         if let Some(hit) = chain.receiver().hit.get() {
///             return Ok(hit);
///         }
///         let value = chain.call_next()?;
///         chain.receiver().hit.set(Some(value));
///         Ok(value)
///     }
/// }
/// ```
pub trait ChainDecorator<S: Signature> {
    /// Handles one invocation; `chain` holds the links after this one.
    fn call(&mut self, mut chain: Chain<'_, S>) -> Outcome<S> {
        chain.call_next()
    }
}

/// How a decorator was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoratorStyle {
    /// Implements [`ChainDecorator`] and drives the chain itself
    Manual,
    /// Declares before/after/around hooks through [`HookedDecorator`]
    Hooked,
}

impl fmt::Display for DecoratorStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoratorStyle::Manual => f.write_str("manual"),
            DecoratorStyle::Hooked => f.write_str("hooked"),
        }
    }
}

/// Signature-independent description of a queued decorator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratorInfo {
    decorator_type: &'static str,
    style: DecoratorStyle,
    hooks: Option<HookNames>,
}

impl DecoratorInfo {
    pub fn decorator_type(&self) -> &'static str {
        self.decorator_type
    }

    pub fn style(&self) -> DecoratorStyle {
        self.style
    }

    /// Hook names for hook-style decorators, `None` for manual ones.
    pub fn hooks(&self) -> Option<&HookNames> {
        self.hooks.as_ref()
    }

    /// A hook-style decorator with no hooks at all.
    pub fn is_pass_through(&self) -> bool {
        self.hooks.as_ref().is_some_and(HookNames::is_empty)
    }
}

pub(crate) enum Live<S: Signature> {
    Manual(Box<dyn ChainDecorator<S>>),
    Hooked(Box<dyn HookedLink<S>>),
}

type Factory<S> = dyn Fn() -> Live<S> + Send + Sync;

/// A decorator queued for the next method definition.
///
/// Specs are values: clone one to decorate several methods with the same
/// configuration. Each decorated call builds a fresh decorator from it.
///
/// ```rust
/// use decorations::{ChainDecorator, DecoratorSpec, DecoratorStyle, MethodSig};
///
/// struct Service;
/// type Ping = MethodSig<Service>;
///
/// struct Passthrough;
/// impl ChainDecorator<Ping> for Passthrough {}
///
/// let spec = DecoratorSpec::<Ping>::manual(|| Passthrough);
/// assert_eq!(spec.info().style(), DecoratorStyle::Manual);
/// ```
pub struct DecoratorSpec<S: Signature> {
    info: DecoratorInfo,
    factory: Arc<Factory<S>>,
}

impl<S: Signature> DecoratorSpec<S> {
    /// Spec for a manual-style decorator built by `factory` on every call.
    pub fn manual<D, F>(factory: F) -> Self
    where
        D: ChainDecorator<S> + 'static,
        F: Fn() -> D + Send + Sync + 'static,
    {
        Self {
            info: DecoratorInfo {
                decorator_type: type_name::<D>(),
                style: DecoratorStyle::Manual,
                hooks: None,
            },
            factory: Arc::new(move || Live::Manual(Box::new(factory()))),
        }
    }

    /// Spec for a hook-style decorator.
    ///
    /// The hook table is collected once here and shared by every instance.
    pub fn hooked<D, F>(factory: F) -> Self
    where
        D: HookedDecorator<S>,
        F: Fn() -> D + Send + Sync + 'static,
    {
        let hooks = Arc::new(crate::hooks::collect::<D, S>());
        Self {
            info: DecoratorInfo {
                decorator_type: type_name::<D>(),
                style: DecoratorStyle::Hooked,
                hooks: Some(hooks.names()),
            },
            factory: Arc::new(move || {
                Live::Hooked(Box::new(HookedInstance::new(factory(), Arc::clone(&hooks))))
            }),
        }
    }

    pub fn info(&self) -> &DecoratorInfo {
        &self.info
    }

    pub fn decorator_type(&self) -> &'static str {
        self.info.decorator_type
    }

    pub fn is_pass_through(&self) -> bool {
        self.info.is_pass_through()
    }

    pub(crate) fn instantiate(&self, binding: &Binding<S>) -> LiveDecorator<S> {
        LiveDecorator {
            decorator_type: self.info.decorator_type,
            binding: binding.clone(),
            live: (self.factory)(),
            completed: false,
        }
    }
}

impl<S: Signature> Clone for DecoratorSpec<S> {
    fn clone(&self) -> Self {
        Self {
            info: self.info.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<S: Signature> fmt::Debug for DecoratorSpec<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoratorSpec")
            .field("decorator_type", &self.info.decorator_type)
            .field("style", &self.info.style)
            .finish()
    }
}

/// A decorator instance bound to one invocation.
pub struct LiveDecorator<S: Signature> {
    decorator_type: &'static str,
    binding: Binding<S>,
    live: Live<S>,
    completed: bool,
}

impl<S: Signature> LiveDecorator<S> {
    pub fn decorated_class(&self) -> ClassId {
        self.binding.decorated_class()
    }

    pub fn decorated_method(&self) -> &MethodHandle<S> {
        self.binding.decorated_method()
    }

    pub fn decorator_type(&self) -> &'static str {
        self.decorator_type
    }

    pub(crate) fn binding(&self) -> &Binding<S> {
        &self.binding
    }

    /// Whether the last run of this link returned `Ok`.
    pub(crate) fn completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn invoke(
        &mut self,
        rest: &mut [LiveDecorator<S>],
        cx: CallContext<'_, S>,
        frame: Frame<'_>,
    ) -> Outcome<S> {
        let LiveDecorator {
            decorator_type,
            binding,
            live,
            completed,
        } = self;
        *completed = false;

        let cx = cx.with_binding(binding);
        frame
            .observers
            .decorator_entered(&cx.key(), *decorator_type, frame.total - rest.len() - 1);

        let chain = Chain::new(rest, cx, frame);
        let output = match live {
            Live::Manual(decorator) => decorator.call(chain)?,
            Live::Hooked(decorator) => {
                decorator.before(&cx)?;
                let output = decorator.around(chain)?;
                if frame.after_order == AfterOrder::Unwind {
                    decorator.after(&cx)?;
                }
                output
            }
        };
        *completed = true;
        Ok(output)
    }

    /// Deferred after hooks, used by [`AfterOrder::Declared`].
    pub(crate) fn run_after(&self, cx: CallContext<'_, S>) -> Result<(), S::Error> {
        match &self.live {
            Live::Manual(_) => Ok(()),
            Live::Hooked(decorator) => decorator.after(&cx),
        }
    }
}

impl<S: Signature> fmt::Debug for LiveDecorator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveDecorator")
            .field("decorator_type", &self.decorator_type)
            .field("method", &self.binding.key().to_string())
            .field("completed", &self.completed)
            .finish()
    }
}
