#![forbid(unsafe_code)]

//! Bidirectional bindings: two endpoints wired to each other.
//!
//! A [`Binding<V>`] owns a `left` and a `right` [`Endpoint`]. Pushing into
//! one endpoint notifies the subscribers of the other, and that is the only
//! path between them. Completing the binding completes both endpoints at
//! once.
//!
//! # Usage
//!
//! ```ignore
//! let binding = Binding::<i32>::new();
//! let left = binding.left_endpoint();
//! let right = binding.right_endpoint();
//!
//! let _sub = right.subscribe_next(|v| println!("right saw {v:?}"));
//! left.push_value(5); // "right saw Some(5)"
//! right.push_value(6); // left's subscribers see 6, right's do not
//!
//! binding.complete();
//! left.push_value(7); // dropped
//! ```
//!
//! # Invariants
//!
//! 1. `left.push(v)` reaches only `right`'s subscribers, and vice versa.
//! 2. Every push made before completion is delivered, whatever its value.
//!    Suppressing write-back echoes is the property adapter's job.
//! 3. Completion is monotonic and happens exactly once; the first caller of
//!    `complete()` delivers [`Event::Completed`], later callers do nothing.
//! 4. After completion, pushes and subscriptions on either endpoint are
//!    silent no-ops.
//!
//! # Failure Modes
//!
//! - Subscriber panic: propagates to the caller of `push`. Subscribers later
//!   in the list are not notified for that push.
//!
//! [`Event::Completed`]: super::endpoint::Event::Completed

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::endpoint::{Endpoint, EndpointState, Event, Side};

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

/// Bounds shared by every value carried through a binding.
pub trait BindingValue: Clone + PartialEq + Send + Sync + 'static {}

impl<T: Clone + PartialEq + Send + Sync + 'static> BindingValue for T {}

/// State shared by a binding and all of its endpoint handles.
pub(crate) struct BindingCore<V> {
    id: u64,
    completed: AtomicBool,
    left: EndpointState<V>,
    right: EndpointState<V>,
}

impl<V> BindingCore<V> {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }
}

impl<V: BindingValue> BindingCore<V> {
    fn new() -> Self {
        Self {
            id: NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed),
            completed: AtomicBool::new(false),
            left: EndpointState::new(),
            right: EndpointState::new(),
        }
    }

    pub(crate) fn state(&self, side: Side) -> &EndpointState<V> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub(crate) fn push(&self, from: Side, value: Option<V>) {
        if self.is_completed() {
            tracing::trace!(
                binding = self.id,
                side = from.as_str(),
                "push after completion dropped"
            );
            return;
        }
        self.state(from.opposite())
            .subscribers
            .notify(&Event::Next(value));
    }

    fn complete(&self) -> bool {
        if self.completed.swap(true, Ordering::AcqRel) {
            return false;
        }
        tracing::debug!(binding = self.id, "binding completed");
        self.left.complete();
        self.right.complete();
        true
    }
}

/// A pair of mutually wired endpoints with joint completion.
///
/// Cloning a `Binding` creates another handle to the same binding.
pub struct Binding<V> {
    core: Arc<BindingCore<V>>,
}

impl<V> Clone for Binding<V> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<V> std::fmt::Debug for Binding<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.core.id())
            .field("completed", &self.core.is_completed())
            .finish()
    }
}

impl<V: BindingValue> Default for Binding<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: BindingValue> Binding<V> {
    /// Create an active binding with two fresh endpoints.
    #[must_use]
    pub fn new() -> Self {
        let core = BindingCore::new();
        tracing::debug!(binding = core.id, "binding created");
        Self {
            core: Arc::new(core),
        }
    }

    pub(crate) fn from_core(core: Arc<BindingCore<V>>) -> Self {
        Self { core }
    }

    /// Process-unique identifier, used in log fields.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.core.id()
    }

    #[must_use]
    pub fn left_endpoint(&self) -> Endpoint<V> {
        self.endpoint(Side::Left)
    }

    #[must_use]
    pub fn right_endpoint(&self) -> Endpoint<V> {
        self.endpoint(Side::Right)
    }

    #[must_use]
    pub fn endpoint(&self, side: Side) -> Endpoint<V> {
        Endpoint::new(Arc::clone(&self.core), side)
    }

    /// Complete both endpoints.
    ///
    /// Returns `true` for the call that performed the transition and `false`
    /// for every later call.
    pub fn complete(&self) -> bool {
        self.core.complete()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.core.is_completed()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
