//! Method signatures and handles to original method bodies.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::key::{ClassId, MethodKey};

/// Shape of a decorated method.
///
/// Every chain, decorator and hook is typed by the signature of the method it
/// wraps, so a decorator receives the real receiver and argument types and errors
/// reach the caller with their original type intact.
///
/// Most code uses [`MethodSig`] rather than implementing this directly.
pub trait Signature: 'static {
    /// The instance the method is invoked on
    type Receiver: ?Sized + 'static;
    /// The call arguments (a tuple for several)
    type Args: 'static;
    /// The success value
    type Output: 'static;
    /// The error type raised by the method and by decorators
    type Error: 'static;
}

/// Ready-made [`Signature`]: `fn(&T, A) -> Result<R, E>`.
///
/// ```rust
/// use decorations::{MethodSig, Signature};
///
/// struct Greeter;
/// type Greet = MethodSig<Greeter, (String,), String, std::io::Error>;
///
/// fn output_of<S: Signature>(_: S::Output) {}
/// output_of::<Greet>("hello".to_string());
/// ```
pub struct MethodSig<T: ?Sized, A = (), R = (), E = std::convert::Infallible>(
    PhantomData<fn(&T, A) -> Result<R, E>>,
);

impl<T, A, R, E> Signature for MethodSig<T, A, R, E>
where
    T: ?Sized + 'static,
    A: 'static,
    R: 'static,
    E: 'static,
{
    type Receiver = T;
    type Args = A;
    type Output = R;
    type Error = E;
}

/// The value a decorated call produces.
pub type Outcome<S> = Result<<S as Signature>::Output, <S as Signature>::Error>;

type Body<S> = dyn Fn(&<S as Signature>::Receiver, &<S as Signature>::Args) -> Outcome<S> + Send + Sync;

/// Callable reference to an original, undecorated method body.
///
/// The handle can be invoked on any receiver, which is how the terminal method
/// runs once a chain is exhausted.
///
/// ```rust
/// use decorations::{MethodHandle, MethodSig};
///
/// struct Counter { step: u32 }
/// type Add = MethodSig<Counter, u32, u32>;
///
/// let add = MethodHandle::<Add>::new("add", |c: &Counter, n: &u32| Ok(c.step + n));
/// assert_eq!(add.name(), "add");
/// assert_eq!(add.invoke(&Counter { step: 2 }, &40), Ok(42));
/// ```
pub struct MethodHandle<S: Signature> {
    name: &'static str,
    body: Arc<Body<S>>,
}

impl<S: Signature> MethodHandle<S> {
    pub fn new<F>(name: &'static str, body: F) -> Self
    where
        F: Fn(&S::Receiver, &S::Args) -> Outcome<S> + Send + Sync + 'static,
    {
        Self {
            name,
            body: Arc::new(body),
        }
    }

    /// Name the method was defined under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the original body on `receiver`.
    #[inline]
    pub fn invoke(&self, receiver: &S::Receiver, args: &S::Args) -> Outcome<S> {
        (self.body)(receiver, args)
    }
}

impl<S: Signature> Clone for MethodHandle<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            body: Arc::clone(&self.body),
        }
    }
}

impl<S: Signature> fmt::Debug for MethodHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodHandle").field("name", &self.name).finish()
    }
}

/// The class/method context a live decorator is bound to.
///
/// Set by the executor before a chain runs; decorators only read it.
pub struct Binding<S: Signature> {
    class: ClassId,
    method: MethodHandle<S>,
}

impl<S: Signature> Binding<S> {
    pub(crate) fn new(class: ClassId, method: MethodHandle<S>) -> Self {
        Self { class, method }
    }

    /// The class whose method is decorated.
    pub fn decorated_class(&self) -> ClassId {
        self.class
    }

    /// Handle to the original method body.
    pub fn decorated_method(&self) -> &MethodHandle<S> {
        &self.method
    }

    pub fn key(&self) -> MethodKey {
        MethodKey::new(self.class, self.method.name())
    }
}

impl<S: Signature> Clone for Binding<S> {
    fn clone(&self) -> Self {
        Self {
            class: self.class,
            method: self.method.clone(),
        }
    }
}

impl<S: Signature> fmt::Debug for Binding<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("class", &self.class.name())
            .field("method", &self.method.name())
            .finish()
    }
}
