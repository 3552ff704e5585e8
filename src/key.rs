//! Identity types for decorated classes and methods.

use std::any::TypeId;
use std::fmt;

/// Identity of a decorated class.
///
/// Pairs the `TypeId` used for comparisons with the type name used for
/// diagnostics, mirroring how decorators read `decorated_class`.
///
/// # Examples
///
/// ```rust
/// use decorations::ClassId;
///
/// struct Greeter;
///
/// let id = ClassId::of::<Greeter>();
/// assert!(id.name().ends_with("Greeter"));
/// assert_eq!(id, ClassId::of::<Greeter>());
/// assert_ne!(id, ClassId::of::<String>());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ClassId {
    type_id: TypeId,
    name: &'static str,
}

impl ClassId {
    /// Identity of `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Full type name of the class.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path (`app::models::Greeter` -> `Greeter`).
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            Some(idx) => &self.name[idx + 2..],
            None => self.name,
        }
    }

    /// The `TypeId` of the class.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

// TypeId-only comparison, the name is diagnostic
impl PartialEq for ClassId {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ClassId {}

impl std::hash::Hash for ClassId {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A `(class, method name)` pair.
///
/// A class holds at most one decoration entry per key.
///
/// ```rust
/// use decorations::{ClassId, MethodKey};
///
/// struct Greeter;
///
/// let key = MethodKey::new(ClassId::of::<Greeter>(), "greet");
/// assert_eq!(key.method(), "greet");
/// assert!(key.to_string().ends_with("Greeter::greet"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodKey {
    class: ClassId,
    method: &'static str,
}

impl MethodKey {
    pub fn new(class: ClassId, method: &'static str) -> Self {
        Self { class, method }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn method(&self) -> &'static str {
        self.method
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class.name(), self.method)
    }
}
