#![forbid(unsafe_code)]

//! Observable value wrapper with change notification and version tracking.
//!
//! # Design
//!
//! [`Observable<T>`] wraps a value of type `T` in shared, reference-counted
//! storage. When the value changes (determined by `PartialEq`), all live
//! subscribers are notified in registration order. This is the host-side
//! mutable slot that property bindings observe and write back to.
//!
//! # Performance
//!
//! | Operation     | Complexity                 |
//! |---------------|----------------------------|
//! | `get()`       | O(1) + clone               |
//! | `set()`       | O(S) where S = subscribers |
//! | `subscribe()` | O(S) copy-on-write         |
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: Calling `set()` from within a subscriber callback is
//!   allowed. The value lock is released before subscribers run, so the
//!   nested mutation is applied and notified before the outer call returns.
//! - **Concurrent writers**: Two threads calling `set()` concurrently each
//!   notify with the value they wrote; notification order across threads is
//!   not serialized.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::subscription::{SubscriberList, Subscription};

/// Shared interior for [`Observable<T>`].
struct ObservableInner<T> {
    value: Mutex<T>,
    version: AtomicU64,
    subscribers: SubscriberList<T>,
}

/// A shared, version-tracked value with change notification.
///
/// Cloning an `Observable` creates a new handle to the **same** inner state.
/// Both handles see the same value and share subscribers.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing mutation.
/// 2. `set(v)` where `v == current` is a no-op.
/// 3. Subscribers are notified in registration order.
pub struct Observable<T> {
    inner: Arc<ObservableInner<T>>,
}

// Manual Clone: shares the same Arc.
impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self
            .inner
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Observable")
            .field("value", &*value)
            .field("version", &self.inner.version.load(Ordering::Acquire))
            .field("subscriber_count", &self.inner.subscribers.len())
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + Send + Sync + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Observable<T> {
    /// Create a new observable with the given initial value.
    ///
    /// The initial version is 0 and no subscribers are registered.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(ObservableInner {
                value: Mutex::new(value),
                version: AtomicU64::new(0),
                subscribers: SubscriberList::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        self.inner
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.lock().clone()
    }

    /// Access the current value by reference without cloning.
    ///
    /// The value stays locked while `f` runs; do not call `set()` from `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock())
    }

    /// Set a new value. If the new value differs from the current value
    /// (by `PartialEq`), the version is incremented and all live subscribers
    /// are notified.
    pub fn set(&self, value: T) {
        let snapshot = {
            let mut current = self.lock();
            if *current == value {
                return;
            }
            *current = value;
            self.inner.version.fetch_add(1, Ordering::AcqRel);
            current.clone()
        };
        self.inner.subscribers.notify(&snapshot);
    }

    /// Modify the value in place via a closure. If the value changes
    /// (compared by `PartialEq` against a snapshot), the version is
    /// incremented and subscribers are notified.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let snapshot = {
            let mut current = self.lock();
            let old = current.clone();
            f(&mut current);
            if *current == old {
                return;
            }
            self.inner.version.fetch_add(1, Ordering::AcqRel);
            current.clone()
        };
        self.inner.subscribers.notify(&snapshot);
    }

    /// Subscribe to value changes. The callback is invoked with a reference
    /// to the new value each time it changes.
    ///
    /// Returns a [`Subscription`] guard. Dropping the guard unsubscribes
    /// the callback.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.inner.subscribers.insert(callback)
    }

    /// Current version number. Increments by 1 on each value-changing
    /// mutation. Useful for dirty-checking.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Number of currently registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}
