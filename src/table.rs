//! Per-class method tables and the registration DSL.
//!
//! A class is described once through a [`ClassBuilder`]: `decorate` queues
//! decorator specs, and the next `define` captures the method together with
//! everything queued, then clears the queue. The result is a
//! [`DecorationTable`] that owns one entry per method name.
//!
//! ```rust
//! use std::convert::Infallible;
//! use decorations::{ChainDecorator, DecorationTable, DecoratorSpec, MethodSig};
//!
//! struct Greeter { greeting: String }
//! type Greet = MethodSig<Greeter, String, String, Infallible>;
//!
//! struct Passthrough;
//! impl ChainDecorator<Greet> for Passthrough {}
//!
//! let mut class = DecorationTable::<Greeter>::builder();
//! let greet = class
//!     .decorate(DecoratorSpec::<Greet>::manual(|| Passthrough))
//!     .define("greet", |g: &Greeter, name: &String| Ok(format!("{}, {}", g.greeting, name)))
//!     .unwrap();
//! let table = class.build();
//!
//! let greeter = Greeter { greeting: "Hello".to_string() };
//! assert_eq!(greet.call(&greeter, "Ada".to_string()), Ok("Hello, Ada".to_string()));
//! assert_eq!(table.decorated_len(), 1);
//! ```

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::chain::{self, AfterOrder};
use crate::config::DecorationsConfig;
use crate::decorator::{DecoratorInfo, DecoratorSpec};
use crate::error::{DecorationError, DecorationResult};
use crate::key::ClassId;
use crate::observer::{ChainObserver, Observers};
use crate::signature::{Binding, MethodHandle, Outcome, Signature};

/// A decorated method: its original body plus the decorators captured with it.
pub struct DecorationEntry<S: Signature> {
    binding: Binding<S>,
    specs: Vec<DecoratorSpec<S>>,
    after_order: AfterOrder,
    observers: Observers,
}

impl<S: Signature> DecorationEntry<S> {
    pub fn method_name(&self) -> &'static str {
        self.binding.decorated_method().name()
    }

    pub fn decorated_class(&self) -> ClassId {
        self.binding.decorated_class()
    }

    /// The undecorated body.
    pub fn original(&self) -> &MethodHandle<S> {
        self.binding.decorated_method()
    }

    /// Decorator specs in declaration order; the first is outermost.
    pub fn specs(&self) -> &[DecoratorSpec<S>] {
        &self.specs
    }

    pub fn after_order(&self) -> AfterOrder {
        self.after_order
    }

    /// Runs the decorated call on `receiver`.
    pub fn invoke(&self, receiver: &S::Receiver, args: &S::Args) -> Outcome<S> {
        chain::execute(self, receiver, args)
    }

    pub(crate) fn binding(&self) -> &Binding<S> {
        &self.binding
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.observers
    }
}

impl<S: Signature> fmt::Debug for DecorationEntry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecorationEntry")
            .field("method", &self.binding.key().to_string())
            .field("specs", &self.specs)
            .field("after_order", &self.after_order)
            .field("observers", &self.observers)
            .finish()
    }
}

enum Repr<S: Signature> {
    Plain(MethodHandle<S>),
    Decorated(Arc<DecorationEntry<S>>),
}

/// A defined method, decorated or not. Cheap to clone.
pub struct Method<S: Signature> {
    repr: Repr<S>,
}

impl<S: Signature> Method<S> {
    /// Calls the method on `receiver`.
    #[inline]
    pub fn call(&self, receiver: &S::Receiver, args: S::Args) -> Outcome<S> {
        self.call_with(receiver, &args)
    }

    /// Calls the method with borrowed arguments.
    pub fn call_with(&self, receiver: &S::Receiver, args: &S::Args) -> Outcome<S> {
        match &self.repr {
            Repr::Plain(handle) => handle.invoke(receiver, args),
            Repr::Decorated(entry) => entry.invoke(receiver, args),
        }
    }

    pub fn name(&self) -> &'static str {
        self.original().name()
    }

    pub fn is_decorated(&self) -> bool {
        matches!(self.repr, Repr::Decorated(_))
    }

    /// The decoration entry, if the method was decorated.
    pub fn entry(&self) -> Option<&DecorationEntry<S>> {
        match &self.repr {
            Repr::Plain(_) => None,
            Repr::Decorated(entry) => Some(&**entry),
        }
    }

    /// The undecorated body.
    pub fn original(&self) -> &MethodHandle<S> {
        match &self.repr {
            Repr::Plain(handle) => handle,
            Repr::Decorated(entry) => entry.original(),
        }
    }
}

impl<S: Signature> Clone for Method<S> {
    fn clone(&self) -> Self {
        let repr = match &self.repr {
            Repr::Plain(handle) => Repr::Plain(handle.clone()),
            Repr::Decorated(entry) => Repr::Decorated(Arc::clone(entry)),
        };
        Self { repr }
    }
}

impl<S: Signature> fmt::Debug for Method<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name())
            .field("decorated", &self.is_decorated())
            .finish()
    }
}

/// Signature-independent record of one defined method.
pub struct MethodInfo {
    name: &'static str,
    signature: &'static str,
    decorators: Vec<DecoratorInfo>,
    method: Arc<dyn Any + Send + Sync>,
}

impl MethodInfo {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name of the method's signature.
    pub fn signature(&self) -> &'static str {
        self.signature
    }

    pub fn is_decorated(&self) -> bool {
        !self.decorators.is_empty()
    }

    /// Captured decorators in declaration order.
    pub fn decorators(&self) -> &[DecoratorInfo] {
        &self.decorators
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInfo")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("decorators", &self.decorators)
            .finish()
    }
}

/// Every method defined on class `T`, in definition order.
///
/// Tables stay small (a class has a handful of methods), so lookups scan a
/// `Vec` rather than hashing.
pub struct DecorationTable<T: ?Sized + 'static> {
    class: ClassId,
    methods: Vec<MethodInfo>,
    _class: PhantomData<fn(&T)>,
}

impl<T: ?Sized + 'static> DecorationTable<T> {
    /// Starts describing class `T`.
    pub fn builder() -> ClassBuilder<T> {
        ClassBuilder::new()
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Looks up a method by name and signature.
    pub fn method<S>(&self, name: &'static str) -> DecorationResult<Method<S>>
    where
        S: Signature<Receiver = T>,
    {
        let info = self.info(name).ok_or(DecorationError::NotFound {
            class: self.class.name(),
            method: name,
        })?;
        info.method
            .downcast_ref::<Method<S>>()
            .cloned()
            .ok_or(DecorationError::SignatureMismatch {
                class: self.class.name(),
                method: name,
                expected: type_name::<S>(),
            })
    }

    /// Calls `name` on `receiver`.
    pub fn call<S>(&self, name: &'static str, receiver: &T, args: S::Args) -> DecorationResult<Outcome<S>>
    where
        S: Signature<Receiver = T>,
    {
        Ok(self.method::<S>(name)?.call(receiver, args))
    }

    /// The captured chain of `name`, if it is a decorated method with signature `S`.
    pub fn entry<S>(&self, name: &str) -> Option<&DecorationEntry<S>>
    where
        S: Signature<Receiver = T>,
    {
        self.info(name)?
            .method
            .downcast_ref::<Method<S>>()?
            .entry()
    }

    pub fn info(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|info| info.name == name)
    }

    /// All methods in definition order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodInfo> {
        self.methods.iter()
    }

    /// Names of the decorated methods.
    pub fn decorated_methods(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods
            .iter()
            .filter(|info| info.is_decorated())
            .map(|info| info.name)
    }

    pub fn decorated_len(&self) -> usize {
        self.decorated_methods().count()
    }

    pub fn is_decorated(&self, name: &str) -> bool {
        self.info(name).is_some_and(MethodInfo::is_decorated)
    }

    /// Decorators captured by `name`, outermost first.
    pub fn decorators_of(&self, name: &str) -> Option<&[DecoratorInfo]> {
        self.info(name).map(MethodInfo::decorators)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<T: ?Sized + 'static> fmt::Debug for DecorationTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecorationTable")
            .field("class", &self.class.name())
            .field("methods", &self.methods)
            .finish()
    }
}

/// Registration DSL for one class.
///
/// Mirrors a class body: call [`decorate`](ClassBuilder::decorate) for each
/// decorator, then [`define`](PendingMethod::define) the method they apply
/// to. Settings such as [`after_order`](ClassBuilder::after_order) apply to
/// methods defined after they are set.
pub struct ClassBuilder<T: ?Sized + 'static> {
    table: DecorationTable<T>,
    after_order: AfterOrder,
    strict: bool,
    observers: Observers,
}

impl<T: ?Sized + 'static> ClassBuilder<T> {
    pub fn new() -> Self {
        Self {
            table: DecorationTable {
                class: ClassId::of::<T>(),
                methods: Vec::new(),
                _class: PhantomData,
            },
            after_order: AfterOrder::default(),
            strict: false,
            observers: Observers::default(),
        }
    }

    /// A builder using the class-level settings of `config`.
    ///
    /// The process-wide switch is not touched; see
    /// [`DecorationsConfig::apply`].
    pub fn with_config(config: &DecorationsConfig) -> Self {
        let mut builder = Self::new();
        builder.after_order(config.after_order).strict(config.strict);
        builder
    }

    pub fn after_order(&mut self, order: AfterOrder) -> &mut Self {
        self.after_order = order;
        self
    }

    /// Rejects hook-style decorators that register no hooks.
    pub fn strict(&mut self, strict: bool) -> &mut Self {
        self.strict = strict;
        self
    }

    /// Attaches an observer to every decorated method defined afterwards.
    pub fn observe(&mut self, observer: Arc<dyn ChainObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    pub fn class(&self) -> ClassId {
        self.table.class
    }

    /// Queues `spec` for the next method definition.
    pub fn decorate<S>(&mut self, spec: DecoratorSpec<S>) -> PendingMethod<'_, T, S>
    where
        S: Signature<Receiver = T>,
    {
        PendingMethod {
            class: self,
            specs: vec![spec],
        }
    }

    /// Defines an undecorated method.
    pub fn define<S, F>(&mut self, name: &'static str, body: F) -> DecorationResult<Method<S>>
    where
        S: Signature<Receiver = T>,
        F: Fn(&T, &S::Args) -> Outcome<S> + Send + Sync + 'static,
    {
        self.capture(MethodHandle::new(name, body), Vec::new())
    }

    pub fn build(self) -> DecorationTable<T> {
        self.table
    }

    fn capture<S>(&mut self, handle: MethodHandle<S>, specs: Vec<DecoratorSpec<S>>) -> DecorationResult<Method<S>>
    where
        S: Signature<Receiver = T>,
    {
        let class = self.table.class;
        let name = handle.name();
        if self.table.info(name).is_some() {
            return Err(DecorationError::AlreadyDefined {
                class: class.name(),
                method: name,
            });
        }

        let (method, decorators) = if specs.is_empty() {
            (Method { repr: Repr::Plain(handle) }, Vec::new())
        } else if crate::switch::is_disabled() {
            tracing::debug!(
                target: "decorations",
                class = class.name(),
                method = name,
                skipped = specs.len(),
                "decoration disabled, defining plain method"
            );
            (Method { repr: Repr::Plain(handle) }, Vec::new())
        } else {
            if self.strict {
                if let Some(spec) = specs.iter().find(|spec| spec.is_pass_through()) {
                    return Err(DecorationError::EmptyDecorator {
                        class: class.name(),
                        method: name,
                        decorator: spec.decorator_type(),
                    });
                }
            }
            let decorators: Vec<DecoratorInfo> = specs.iter().map(|spec| spec.info().clone()).collect();
            tracing::debug!(
                target: "decorations",
                class = class.name(),
                method = name,
                decorators = specs.len(),
                after_order = %self.after_order,
                "decorated method"
            );
            let entry = DecorationEntry {
                binding: Binding::new(class, handle),
                specs,
                after_order: self.after_order,
                observers: self.observers.clone(),
            };
            (Method { repr: Repr::Decorated(Arc::new(entry)) }, decorators)
        };

        self.table.methods.push(MethodInfo {
            name,
            signature: type_name::<S>(),
            decorators,
            method: Arc::new(method.clone()),
        });
        Ok(method)
    }
}

impl<T: ?Sized + 'static> Default for ClassBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + 'static> fmt::Debug for ClassBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBuilder")
            .field("class", &self.table.class.name())
            .field("methods", &self.table.methods.len())
            .field("after_order", &self.after_order)
            .field("strict", &self.strict)
            .finish()
    }
}

/// Decorators waiting for the next method definition.
///
/// Consumed by [`define`](PendingMethod::define), so the queue is always
/// cleared by the definition it applies to.
#[must_use = "queued decorators only apply once a method is defined"]
pub struct PendingMethod<'c, T: ?Sized + 'static, S: Signature> {
    class: &'c mut ClassBuilder<T>,
    specs: Vec<DecoratorSpec<S>>,
}

impl<'c, T, S> PendingMethod<'c, T, S>
where
    T: ?Sized + 'static,
    S: Signature<Receiver = T>,
{
    /// Queues another decorator. Earlier ones wrap later ones.
    pub fn decorate(mut self, spec: DecoratorSpec<S>) -> Self {
        self.specs.push(spec);
        self
    }

    /// Number of queued decorators.
    pub fn pending(&self) -> usize {
        self.specs.len()
    }

    /// Defines the method and captures the queued decorators.
    pub fn define<F>(self, name: &'static str, body: F) -> DecorationResult<Method<S>>
    where
        F: Fn(&T, &S::Args) -> Outcome<S> + Send + Sync + 'static,
    {
        let PendingMethod { class, specs } = self;
        class.capture(MethodHandle::new(name, body), specs)
    }
}

impl<T: ?Sized + 'static, S: Signature> fmt::Debug for PendingMethod<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingMethod")
            .field("class", &self.class.class().name())
            .field("specs", &self.specs)
            .finish()
    }
}
