#![forbid(unsafe_code)]

//! Lifecycle management for groups of bindings.

use super::binding::{Binding, BindingValue};
use super::endpoint::{Endpoint, Event};
use super::link::{EndpointLink, bind_endpoints};
use super::subscription::Subscription;

/// Collects subscriptions, links and owned bindings for a logical scope
/// (e.g., a view).
///
/// When the scope is dropped, everything it holds is released, cleanly
/// disconnecting all bindings associated with that scope.
///
/// # Usage
///
/// ```ignore
/// let mut scope = BindingScope::new();
/// scope.subscribe(&temperature, |event| println!("{event:?}"));
/// scope.link(&view_text, &model_text);
/// scope.own(PropertyBinding::new(&panel, width_path(), Some(0)).binding().clone());
///
/// // When scope drops, all of the above are released.
/// ```
///
/// # Invariants
///
/// 1. Entries are released in reverse registration order on drop.
/// 2. After drop, no observer registered through this scope will fire.
/// 3. `clear()` releases all entries immediately (reusable scope).
/// 4. `binding_count()` is always accurate.
pub struct BindingScope {
    entries: Vec<Subscription>,
}

impl BindingScope {
    /// Create an empty binding scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a subscription to this scope. The subscription is held alive
    /// until the scope is dropped or `clear()` is called.
    pub fn hold(&mut self, sub: Subscription) -> &mut Self {
        self.entries.push(sub);
        self
    }

    /// Hold both directions of an existing link.
    pub fn hold_link(&mut self, link: EndpointLink) -> &mut Self {
        self.entries.extend(link.into_subscriptions());
        self
    }

    /// Subscribe to an endpoint within this scope.
    ///
    /// Returns a reference to the scope for chaining.
    pub fn subscribe<V: BindingValue>(
        &mut self,
        endpoint: &Endpoint<V>,
        observer: impl Fn(&Event<V>) + Send + Sync + 'static,
    ) -> &mut Self {
        let sub = endpoint.subscribe(observer);
        self.hold(sub)
    }

    /// Link `target` to `source` within this scope. See [`bind_endpoints`].
    pub fn link<V: BindingValue>(
        &mut self,
        target: &Endpoint<V>,
        source: &Endpoint<V>,
    ) -> &mut Self {
        let link = bind_endpoints(target, source);
        self.hold_link(link)
    }

    /// Complete `binding` when this scope releases it.
    pub fn own<V: BindingValue>(&mut self, binding: Binding<V>) -> &mut Self {
        self.hold(Subscription::new(move || {
            binding.complete();
        }))
    }

    /// Number of held entries. A link counts as two.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether the scope holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release everything immediately (scope becomes empty but reusable).
    pub fn clear(&mut self) {
        while let Some(entry) = self.entries.pop() {
            entry.dispose();
        }
    }
}

impl Default for BindingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.entries.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
