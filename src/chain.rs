//! Chain executor.
//!
//! A decorated call builds one live decorator per declared spec, then drives
//! them front to back. Each link receives a [`Chain`] holding only the links
//! after it, so the remaining chain shrinks as the call descends. When it is
//! empty the next step is the original method body.
//!
//! ```text
//! PENDING -> RUNNING(d0) -> ... -> RUNNING(terminal) -> RETURNED
//!                RUNNING(di) -> RAISED   (propagates, skips the rest)
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::decorator::LiveDecorator;
use crate::error::DecorationError;
use crate::key::{ClassId, MethodKey};
use crate::observer::Observers;
use crate::signature::{Binding, MethodHandle, Outcome, Signature};
use crate::table::DecorationEntry;

#[cfg(feature = "smallvec")]
type Links<S> = smallvec::SmallVec<[LiveDecorator<S>; 4]>;
#[cfg(not(feature = "smallvec"))]
type Links<S> = Vec<LiveDecorator<S>>;

/// When hook-style `after` hooks run relative to each other.
///
/// Manual-style decorators are ordinary nested code and always unwind; this
/// policy only moves hook-style `after` hooks.
///
/// For a chain `[D1, D2]`:
///
/// | policy     | order                                                  |
/// |------------|--------------------------------------------------------|
/// | `Unwind`   | `D1.before, D2.before, terminal, D2.after, D1.after`   |
/// | `Declared` | `D1.before, D2.before, terminal, D1.after, D2.after`   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum AfterOrder {
    /// Each decorator's after hooks run as soon as its own continuation returns
    #[default]
    Unwind,
    /// After hooks are deferred until the whole chain returned, then run in
    /// declaration order for every decorator whose own call succeeded
    Declared,
}

impl fmt::Display for AfterOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AfterOrder::Unwind => f.write_str("unwind"),
            AfterOrder::Declared => f.write_str("declared"),
        }
    }
}

impl FromStr for AfterOrder {
    type Err = DecorationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unwind" | "nested" => Ok(AfterOrder::Unwind),
            "declared" | "declaration" => Ok(AfterOrder::Declared),
            _ => Err(DecorationError::Config {
                key: "after_order".to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// What a decorator or hook can see about the current call.
pub struct CallContext<'a, S: Signature> {
    binding: &'a Binding<S>,
    receiver: &'a S::Receiver,
    args: &'a S::Args,
}

impl<'a, S: Signature> CallContext<'a, S> {
    pub(crate) fn new(binding: &'a Binding<S>, receiver: &'a S::Receiver, args: &'a S::Args) -> Self {
        Self { binding, receiver, args }
    }

    pub(crate) fn with_binding<'b>(self, binding: &'b Binding<S>) -> CallContext<'b, S>
    where
        'a: 'b,
    {
        CallContext {
            binding,
            receiver: self.receiver,
            args: self.args,
        }
    }

    /// The instance the decorated method was called on.
    pub fn receiver(&self) -> &'a S::Receiver {
        self.receiver
    }

    /// The arguments of the call.
    pub fn args(&self) -> &'a S::Args {
        self.args
    }

    pub fn decorated_class(&self) -> ClassId {
        self.binding.decorated_class()
    }

    pub fn decorated_method(&self) -> &'a MethodHandle<S> {
        self.binding.decorated_method()
    }

    pub fn key(&self) -> MethodKey {
        self.binding.key()
    }
}

impl<S: Signature> Clone for CallContext<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Signature> Copy for CallContext<'_, S> {}

impl<S: Signature> fmt::Debug for CallContext<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("class", &self.decorated_class().name())
            .field("method", &self.decorated_method().name())
            .finish()
    }
}

/// Per-invocation settings shared by every link.
#[derive(Clone, Copy)]
pub(crate) struct Frame<'a> {
    pub(crate) after_order: AfterOrder,
    pub(crate) observers: &'a Observers,
    pub(crate) total: usize,
}

/// The remaining links of one invocation.
///
/// A manual-style decorator receives the chain after itself and decides what
/// happens next: call [`call_next`](Chain::call_next) once to delegate, several
/// times to re-run the rest, or never to short-circuit.
///
/// ```rust
/// use decorations::{Chain, ChainDecorator, MethodSig, Outcome};
///
/// struct Account { frozen: bool }
/// type Withdraw = MethodSig<Account, u64, u64, String>;
///
/// struct RejectFrozen;
///
/// impl ChainDecorator<Withdraw> for RejectFrozen {
///     fn call(&mut self, mut chain: Chain<'_, Withdraw>) -> Outcome<Withdraw> {
///         if chain.receiver().frozen {
///             return Err("account frozen".to_string());
///         }
///         chain.call_next()
///     }
/// }
/// ```
pub struct Chain<'a, S: Signature> {
    links: &'a mut [LiveDecorator<S>],
    cx: CallContext<'a, S>,
    frame: Frame<'a>,
}

impl<'a, S: Signature> Chain<'a, S> {
    pub(crate) fn new(links: &'a mut [LiveDecorator<S>], cx: CallContext<'a, S>, frame: Frame<'a>) -> Self {
        Self { links, cx, frame }
    }

    /// Runs the next link, or the original method once no links remain.
    ///
    /// Calling it again re-runs the same remainder from the same position.
    pub fn call_next(&mut self) -> Outcome<S> {
        let cx = self.cx;
        let frame = self.frame;
        match self.links.split_first_mut() {
            Some((head, rest)) => head.invoke(rest, cx, frame),
            None => {
                frame.observers.terminal_reached(&cx.key());
                cx.decorated_method().invoke(cx.receiver(), cx.args())
            }
        }
    }

    /// Links left before the original method.
    pub fn remaining(&self) -> usize {
        self.links.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.links.is_empty()
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
}

impl<S: Signature> fmt::Debug for Chain<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("method", &self.cx.key().to_string())
            .field("remaining", &self.links.len())
            .finish()
    }
}

/// Runs one decorated invocation of `entry`.
pub(crate) fn execute<S: Signature>(
    entry: &DecorationEntry<S>,
    receiver: &S::Receiver,
    args: &S::Args,
) -> Outcome<S> {
    let observers = entry.observers();
    let binding = entry.binding();
    let started = observers.has_observers().then(Instant::now);
    if started.is_some() {
        observers.invocation_started(&binding.key());
    }

    let mut links: Links<S> = entry
        .specs()
        .iter()
        .map(|spec| spec.instantiate(binding))
        .collect();
    let frame = Frame {
        after_order: entry.after_order(),
        observers,
        total: links.len(),
    };

    let mut chain = Chain::new(&mut links[..], CallContext::new(binding, receiver, args), frame);
    let result = match (chain.call_next(), frame.after_order) {
        (Ok(output), AfterOrder::Declared) => run_deferred_afters(&links, receiver, args).map(|()| output),
        (result, _) => result,
    };

    if let Some(started) = started {
        observers.invocation_finished(&binding.key(), started.elapsed(), result.is_ok());
    }
    result
}

fn run_deferred_afters<S: Signature>(
    links: &[LiveDecorator<S>],
    receiver: &S::Receiver,
    args: &S::Args,
) -> Result<(), S::Error> {
    for link in links.iter().filter(|link| link.completed()) {
        link.run_after(CallContext::new(link.binding(), receiver, args))?;
    }
    Ok(())
}
