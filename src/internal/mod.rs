//! Internal implementation details.

#[cfg(feature = "parking-lot")]
pub(crate) use parking_lot::Mutex;

/// `std` mutex with the `parking_lot` calling convention.
///
/// A poisoned lock is recovered; the guarded data here is plain bookkeeping
/// that stays consistent even if a holder panicked.
#[cfg(not(feature = "parking-lot"))]
#[derive(Debug, Default)]
pub(crate) struct Mutex<T>(std::sync::Mutex<T>);

#[cfg(not(feature = "parking-lot"))]
impl<T> Mutex<T> {
    pub(crate) fn lock(&self) -> std::sync::MutexGuard<'_, T> {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
