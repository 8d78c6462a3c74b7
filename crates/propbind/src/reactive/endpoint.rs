#![forbid(unsafe_code)]

//! One side of a [`Binding`]: a combined observable and sink.
//!
//! Values pushed into an [`Endpoint`] are delivered to the subscribers of the
//! *other* endpoint of the same binding, never to this endpoint's own
//! subscribers. That routing rule is what keeps a binding free of feedback:
//! a value only returns to its origin if something re-pushes it after
//! observing it.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in subscription order; a push is fully
//!    delivered before `push` returns.
//! 2. `push` on a completed binding is a silent no-op.
//! 3. `subscribe` on a completed binding returns an already-disposed
//!    [`Subscription`] and never calls the observer.
//! 4. Each subscriber sees [`Event::Completed`] at most once.

use std::sync::{Arc, Mutex, PoisonError};

use super::binding::{Binding, BindingCore, BindingValue};
use super::subscription::{SubscriberList, Subscription};

/// Source of the value replayed to each new subscriber.
pub(crate) type Replay<V> = Arc<dyn Fn() -> Option<V> + Send + Sync>;

/// Which endpoint of a binding a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// The endpoint on the other end of the binding.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Notification delivered to endpoint observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<V> {
    /// A value (or an absent value) arrived from the other endpoint.
    Next(Option<V>),
    /// The binding completed. No further events follow.
    Completed,
}

impl<V> Event<V> {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// The carried value, or `None` for [`Event::Completed`].
    #[must_use]
    pub fn as_next(&self) -> Option<Option<&V>> {
        match self {
            Self::Next(value) => Some(value.as_ref()),
            Self::Completed => None,
        }
    }
}

/// Per-endpoint mutable state, owned by the binding core.
pub(crate) struct EndpointState<V> {
    pub(crate) subscribers: SubscriberList<Event<V>>,
    replay: Mutex<Option<Replay<V>>>,
}

impl<V: BindingValue> EndpointState<V> {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: SubscriberList::new(),
            replay: Mutex::new(None),
        }
    }

    fn replay_source(&self) -> Option<Replay<V>> {
        self.replay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_replay(&self, replay: Option<Replay<V>>) {
        *self.replay.lock().unwrap_or_else(PoisonError::into_inner) = replay;
    }

    /// Deliver completion and release everything this endpoint holds.
    pub(crate) fn complete(&self) {
        self.set_replay(None);
        self.subscribers.drain_with(&Event::Completed);
    }
}

/// Handle to one endpoint of a [`Binding`].
///
/// Cloning an `Endpoint` creates another handle to the same endpoint.
pub struct Endpoint<V> {
    core: Arc<BindingCore<V>>,
    side: Side,
}

impl<V> Clone for Endpoint<V> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            side: self.side,
        }
    }
}

impl<V> std::fmt::Debug for Endpoint<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("binding", &self.core.id())
            .field("side", &self.side)
            .field("completed", &self.core.is_completed())
            .finish()
    }
}

impl<V: BindingValue> Endpoint<V> {
    pub(crate) fn new(core: Arc<BindingCore<V>>, side: Side) -> Self {
        Self { core, side }
    }

    fn state(&self) -> &EndpointState<V> {
        self.core.state(self.side)
    }

    /// Which side of its binding this endpoint is.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// The binding that owns this endpoint.
    #[must_use]
    pub fn binding(&self) -> Binding<V> {
        Binding::from_core(Arc::clone(&self.core))
    }

    /// The other endpoint of the same binding.
    #[must_use]
    pub fn peer(&self) -> Self {
        Self::new(Arc::clone(&self.core), self.side.opposite())
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.core.is_completed()
    }

    /// Number of observers currently registered on this endpoint.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state().subscribers.len()
    }

    /// Observe values arriving at this endpoint.
    ///
    /// If the endpoint is backed by a property, the property's current value
    /// is delivered to `observer` before this call returns.
    pub fn subscribe(&self, observer: impl Fn(&Event<V>) + Send + Sync + 'static) -> Subscription {
        self.register(observer, true)
    }

    /// Observe values arriving at this endpoint, without the current-value
    /// replay.
    pub fn subscribe_changes(
        &self,
        observer: impl Fn(&Event<V>) + Send + Sync + 'static,
    ) -> Subscription {
        self.register(observer, false)
    }

    /// Observe only values, ignoring completion.
    pub fn subscribe_next(
        &self,
        observer: impl Fn(Option<&V>) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe(move |event| {
            if let Event::Next(value) = event {
                observer(value.as_ref());
            }
        })
    }

    fn register(
        &self,
        observer: impl Fn(&Event<V>) + Send + Sync + 'static,
        replay: bool,
    ) -> Subscription {
        if self.core.is_completed() {
            tracing::trace!(
                binding = self.core.id(),
                side = self.side.as_str(),
                "subscribe after completion ignored"
            );
            return Subscription::empty();
        }

        let observer = Arc::new(observer);
        if replay {
            if let Some(current) = self.state().replay_source().and_then(|source| source()) {
                observer(&Event::Next(Some(current)));
            }
        }

        let registered = Arc::clone(&observer);
        let subscription = self.state().subscribers.insert(move |event| registered(event));
        if self.core.is_completed() {
            // Lost a race with completion; the drain either already saw us or
            // never will.
            subscription.dispose();
        }
        subscription
    }

    /// Send a value (or an absent value) to the other endpoint's subscribers.
    ///
    /// Dropped silently once the binding has completed.
    pub fn push(&self, value: Option<V>) {
        self.core.push(self.side, value);
    }

    /// Shorthand for `push(Some(value))`.
    pub fn push_value(&self, value: V) {
        self.push(Some(value));
    }

    pub(crate) fn set_replay(&self, replay: Option<Replay<V>>) {
        self.state().set_replay(replay);
    }
}
