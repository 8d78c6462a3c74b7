#![forbid(unsafe_code)]

//! Linking two endpoints so each mirrors the other.
//!
//! [`bind_endpoints`] is the function form of "assign one binding to
//! another": the target endpoint immediately receives the source's current
//! value, and from then on every value arriving at either endpoint is pushed
//! into the other.
//!
//! ```ignore
//! // Two properties bound to each other, initial value taken from the model.
//! let view_text = create_property_binding(&view, text_path(), None);
//! let model_text = create_property_binding(&model, title_path(), None);
//! let _link = bind_endpoints(&view_text, &model_text);
//! ```
//!
//! # Invariants
//!
//! 1. The initial value flows from source to target only.
//! 2. Completion of either endpoint's binding completes the other's.
//! 3. Dropping the [`EndpointLink`] disconnects both directions and completes
//!    nothing.

use super::binding::BindingValue;
use super::endpoint::{Endpoint, Event};
use super::subscription::Subscription;

/// Observer that pushes every event it sees into `to`.
fn forward<V: BindingValue>(to: Endpoint<V>) -> impl Fn(&Event<V>) + Send + Sync + 'static {
    move |event| match event {
        Event::Next(value) => to.push(value.clone()),
        Event::Completed => {
            to.binding().complete();
        }
    }
}

/// Cross-subscribe `target` and `source`.
///
/// `target` is pushed the current and all future values of `source`;
/// `source` is pushed all future values of `target`.
pub fn bind_endpoints<V: BindingValue>(target: &Endpoint<V>, source: &Endpoint<V>) -> EndpointLink {
    let source_to_target = source.subscribe(forward(target.clone()));
    let target_to_source = target.subscribe_changes(forward(source.clone()));
    tracing::debug!(
        target_binding = target.binding().id(),
        source_binding = source.binding().id(),
        "endpoints linked"
    );
    EndpointLink {
        source_to_target,
        target_to_source,
    }
}

/// Both directions of a link made by [`bind_endpoints`].
#[must_use = "dropping an EndpointLink disconnects it"]
pub struct EndpointLink {
    source_to_target: Subscription,
    target_to_source: Subscription,
}

impl EndpointLink {
    /// Stop forwarding in both directions. Idempotent.
    pub fn disconnect(&self) {
        self.source_to_target.dispose();
        self.target_to_source.dispose();
    }

    /// Whether either direction is still registered.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !(self.source_to_target.is_disposed() && self.target_to_source.is_disposed())
    }

    /// Split into the two underlying subscriptions, source-to-target first.
    pub fn into_subscriptions(self) -> [Subscription; 2] {
        [self.source_to_target, self.target_to_source]
    }
}

impl std::fmt::Debug for EndpointLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointLink")
            .field("connected", &self.is_connected())
            .finish()
    }
}
