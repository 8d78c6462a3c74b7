#![forbid(unsafe_code)]

//! End-of-life signalling for objects that property bindings target.
//!
//! A target type embeds a [`Lifetime`] and implements [`Lifecycle`]. When the
//! target is dropped, the `Lifetime` drops with it and runs every registered
//! `on_end` callback exactly once. Bindings hold only a `Weak` to the target
//! and rely on this signal to complete.
//!
//! ```ignore
//! struct Thermostat {
//!     temperature: Observable<i32>,
//!     lifetime: Lifetime,
//! }
//!
//! impl Lifecycle for Thermostat {
//!     fn lifetime(&self) -> &Lifetime {
//!         &self.lifetime
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use super::subscription::{SubscriberList, Subscription};

/// Objects that announce their own destruction.
pub trait Lifecycle: Send + Sync + 'static {
    /// The lifetime token embedded in this object.
    fn lifetime(&self) -> &Lifetime;
}

/// Destruction signal owned by exactly one object.
///
/// Not `Clone`: the signal fires when this value is dropped.
pub struct Lifetime {
    ended: AtomicBool,
    hooks: SubscriberList<()>,
}

impl Lifetime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ended: AtomicBool::new(false),
            hooks: SubscriberList::new(),
        }
    }

    /// Register `hook` to run when the owning object is dropped.
    ///
    /// Dropping the returned [`Subscription`] cancels the hook.
    pub fn on_end(&self, hook: impl Fn() + Send + Sync + 'static) -> Subscription {
        if self.has_ended() {
            return Subscription::empty();
        }
        self.hooks.insert(move |_: &()| hook())
    }

    /// Whether the end-of-life hooks have already run.
    #[must_use]
    pub fn has_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    /// Number of hooks still registered.
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    fn end(&self) {
        if self.ended.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::trace!(hooks = self.hooks.len(), "lifetime ended");
        self.hooks.drain_with(&());
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Lifetime {
    fn drop(&mut self) {
        self.end();
    }
}

impl std::fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifetime")
            .field("ended", &self.has_ended())
            .field("hook_count", &self.hooks.len())
            .finish()
    }
}
