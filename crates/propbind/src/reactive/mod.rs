#![forbid(unsafe_code)]

//! Bidirectional reactive property bindings.
//!
//! This module provides:
//!
//! - [`Binding`]: a pair of mutually wired [`Endpoint`]s with joint
//!   completion. A value pushed into one endpoint reaches the other
//!   endpoint's subscribers and never its own.
//! - [`PropertyBinding`] / [`PropertyAdapter`]: a binding whose left endpoint
//!   is driven by a slot on a target object, addressed by a [`KeyPath`].
//! - [`bind_endpoints`]: links two endpoints so each mirrors the other.
//! - [`BindingScope`]: RAII owner for a group of subscriptions and links.
//! - [`Observable`], [`Lifetime`]: the host-side slot and destruction signal
//!   that property bindings observe.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//!
//! # Architecture
//!
//! All shared state sits behind `Arc`. Subscriber lists are copy-on-write
//! snapshots (`arc-swap`), so notification never holds a lock while user
//! callbacks run and every operation is re-entrant. Completion is an atomic
//! first-caller-wins transition.
//!
//! A property binding is reachable from its target (slot observation and
//! lifetime hook) and reaches the target only through a `Weak`. It therefore
//! lives exactly as long as the target, unless completed earlier.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. An endpoint never observes its own pushes.
//! 3. Every push is delivered to the peer. A property adapter skips the slot
//!    change notifications caused by its own write-back.
//! 4. Completion happens at most once per binding and silences both
//!    endpoints.
//! 5. Once [`Subscription::dispose`] returns, its callback is not running on
//!    any other thread and is never called again.

pub mod binding;
pub mod endpoint;
pub mod key_path;
pub mod lifetime;
pub mod link;
pub mod observable;
pub mod property;
pub mod scope;
pub mod subscription;

pub use binding::{Binding, BindingValue};
pub use endpoint::{Endpoint, Event, Side};
pub use key_path::{ChangeHook, KeyPath};
pub use lifetime::{Lifecycle, Lifetime};
pub use link::{EndpointLink, bind_endpoints};
pub use observable::Observable;
pub use property::{
    PropertyAdapter, PropertyBinding, PropertyBindingBuilder, create_property_binding,
};
pub use scope::BindingScope;
pub use subscription::Subscription;
