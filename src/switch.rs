//! Process-wide decoration switch.
//!
//! While decoration is disabled, newly defined methods are captured without
//! their pending decorators and stay plain for their whole lifetime. Methods
//! defined while enabled keep their chains; the switch is consulted at
//! definition time only, never during calls.

use std::sync::atomic::{AtomicBool, Ordering};

static DISABLED: AtomicBool = AtomicBool::new(false);

/// Stops decorating methods defined from now on.
pub fn disable() {
    set_disabled(true);
}

/// Resumes decorating methods defined from now on.
pub fn enable() {
    set_disabled(false);
}

/// Whether decoration is currently disabled.
#[inline]
pub fn is_disabled() -> bool {
    DISABLED.load(Ordering::SeqCst)
}

/// Sets the switch and returns its previous state.
pub fn set_disabled(disabled: bool) -> bool {
    let previous = DISABLED.swap(disabled, Ordering::SeqCst);
    if previous != disabled {
        tracing::debug!(target: "decorations", disabled, "decoration switch changed");
    }
    previous
}

/// Disables decoration until dropped, then restores the previous state.
///
/// ```rust
/// use decorations::{is_disabled, DisabledGuard};
///
/// assert!(!is_disabled());
/// {
///     let _guard = DisabledGuard::new();
///     assert!(is_disabled());
/// }
/// assert!(!is_disabled());
/// ```
#[derive(Debug)]
#[must_use = "decoration is re-enabled as soon as the guard is dropped"]
pub struct DisabledGuard {
    previous: bool,
}

impl DisabledGuard {
    pub fn new() -> Self {
        Self {
            previous: set_disabled(true),
        }
    }
}

impl Default for DisabledGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DisabledGuard {
    fn drop(&mut self) {
        set_disabled(self.previous);
    }
}
