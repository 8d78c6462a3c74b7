#![forbid(unsafe_code)]

//! Property bindings: a [`Binding`] whose left endpoint is driven by a slot
//! on a target object.
//!
//! A [`PropertyAdapter`] sits between the binding's left endpoint and the
//! slot named by a [`KeyPath`]:
//!
//! - external changes to the slot are pushed into the left endpoint, so they
//!   reach subscribers of the right endpoint;
//! - values pushed into the right endpoint arrive at the left endpoint and
//!   are written to the slot (absent values write the configured fallback);
//!   the slot notifications raised by that write are not pushed back, so the
//!   consumer never sees its own value return;
//! - when the target is dropped, the binding completes and the adapter
//!   releases its observation of the slot.
//!
//! The right endpoint is returned to the consumer and replays the slot's
//! current value to each new subscriber.
//!
//! # Usage
//!
//! ```ignore
//! let thermostat = Arc::new(Thermostat::new(20));
//! let temperature = create_property_binding(
//!     &thermostat,
//!     KeyPath::observable("temperature", |t: &Thermostat| &t.temperature),
//!     Some(0),
//! );
//!
//! let _sub = temperature.subscribe_next(|v| println!("{v:?}")); // Some(20)
//! thermostat.temperature.set(25);                               // Some(25)
//! temperature.push(None);                                       // slot = 0
//! ```
//!
//! # Ownership
//!
//! The adapter holds the target only through a `Weak`. While the target is
//! alive, its slot observation and lifetime hook keep the binding alive, so
//! a binding outlives the handles returned to the consumer and ends exactly
//! when the target does (or when completed explicitly).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::binding::{Binding, BindingValue};
use super::endpoint::{Endpoint, Event};
use super::key_path::KeyPath;
use super::lifetime::Lifecycle;
use super::subscription::Subscription;
use crate::error::{BindError, Result};

/// Value currently being written back to the slot by the adapter.
///
/// Slot notifications carrying this value while the write is in progress are
/// the adapter's own echo.
struct WriteBack<V> {
    value: Mutex<Option<V>>,
}

impl<V: BindingValue> WriteBack<V> {
    fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<V>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, value: &V) -> WriteScope<'_, V> {
        *self.lock() = Some(value.clone());
        WriteScope { write_back: self }
    }

    fn is_echo(&self, current: &V) -> bool {
        self.lock().as_ref() == Some(current)
    }
}

/// Clears the write-back value when the write returns or unwinds.
struct WriteScope<'a, V: BindingValue> {
    write_back: &'a WriteBack<V>,
}

impl<V: BindingValue> Drop for WriteScope<'_, V> {
    fn drop(&mut self) {
        self.write_back.lock().take();
    }
}

/// Bridge between one binding endpoint and a slot on a target object.
pub struct PropertyAdapter<O, V> {
    target: Weak<O>,
    key_path: KeyPath<O, V>,
    fallback: Option<V>,
    label: Option<String>,
    binding_id: u64,
    write_back: Arc<WriteBack<V>>,
    observation: Subscription,
    lifetime_hook: Subscription,
    torn_down: AtomicBool,
}

impl<O, V> std::fmt::Debug for PropertyAdapter<O, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyAdapter")
            .field("key_path", &self.key_path)
            .field("label", &self.label)
            .field("binding", &self.binding_id)
            .field("target_alive", &(self.target.strong_count() > 0))
            .field("torn_down", &self.torn_down.load(Ordering::Acquire))
            .finish()
    }
}

impl<O: Lifecycle, V: BindingValue> PropertyAdapter<O, V> {
    /// Wire `binding`'s left endpoint to the slot `key_path` on `target`.
    fn attach(
        target: &Arc<O>,
        key_path: KeyPath<O, V>,
        fallback: Option<V>,
        label: Option<String>,
        binding: &Binding<V>,
    ) -> Arc<Self> {
        let left = binding.left_endpoint();
        let weak = Arc::downgrade(target);
        let write_back = Arc::new(WriteBack::new());

        left.push_value(key_path.get(target));

        let observation = {
            let weak = Weak::clone(&weak);
            let reader = key_path.clone();
            let left = left.clone();
            let write_back = Arc::clone(&write_back);
            let binding_id = binding.id();
            key_path.observe(
                target,
                Box::new(move || {
                    let Some(target) = weak.upgrade() else {
                        return;
                    };
                    let current = reader.get(&target);
                    if write_back.is_echo(&current) {
                        tracing::trace!(
                            binding = binding_id,
                            key_path = reader.name(),
                            "write-back notification skipped"
                        );
                        return;
                    }
                    left.push_value(current);
                }),
            )
        };

        let lifetime_hook = {
            let binding = binding.clone();
            let key_path = key_path.name();
            target.lifetime().on_end(move || {
                tracing::debug!(
                    binding = binding.id(),
                    key_path,
                    "target released, completing binding"
                );
                binding.complete();
            })
        };

        let adapter = Arc::new(Self {
            target: Weak::clone(&weak),
            key_path: key_path.clone(),
            fallback,
            label,
            binding_id: binding.id(),
            write_back,
            observation,
            lifetime_hook,
            torn_down: AtomicBool::new(false),
        });

        let inbound = Arc::clone(&adapter);
        left.subscribe_changes(move |event| match event {
            Event::Next(value) => inbound.write(value.clone()),
            Event::Completed => inbound.tear_down(),
        })
        .detach();

        binding
            .right_endpoint()
            .set_replay(Some(Arc::new(move || weak.upgrade().map(|target| key_path.get(&target)))));

        if binding.is_completed() {
            adapter.tear_down();
        } else {
            tracing::debug!(
                binding = adapter.binding_id,
                key_path = adapter.key_path.name(),
                label = adapter.label.as_deref(),
                "property adapter attached"
            );
        }
        adapter
    }

    fn write(&self, value: Option<V>) {
        let Some(target) = self.target.upgrade() else {
            tracing::trace!(
                binding = self.binding_id,
                key_path = self.key_path.name(),
                "write after target released dropped"
            );
            return;
        };

        match value {
            Some(value) => {
                let _scope = self.write_back.begin(&value);
                self.key_path.set(&target, value);
            }
            // The fallback is not what the consumer pushed, so its change
            // notification is published like any external change.
            None => match &self.fallback {
                Some(fallback) => self.key_path.set(&target, fallback.clone()),
                None => {
                    tracing::warn!(
                        binding = self.binding_id,
                        key_path = self.key_path.name(),
                        label = self.label.as_deref(),
                        "absent value pushed with no fallback configured; slot left unchanged"
                    );
                }
            },
        }
    }

    /// Release the slot observation and the lifetime hook. Runs once.
    fn tear_down(&self) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.observation.dispose();
        self.lifetime_hook.dispose();
        tracing::debug!(
            binding = self.binding_id,
            key_path = self.key_path.name(),
            label = self.label.as_deref(),
            "property adapter torn down"
        );
    }

    /// The target, if it is still alive.
    #[must_use]
    pub fn target(&self) -> Option<Arc<O>> {
        self.target.upgrade()
    }

    #[must_use]
    pub fn key_path(&self) -> &KeyPath<O, V> {
        &self.key_path
    }

    /// Value written in place of absent pushes.
    #[must_use]
    pub fn fallback(&self) -> Option<&V> {
        self.fallback.as_ref()
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Whether the adapter has released its observation.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }
}

/// A binding to a property of a target object, plus its adapter.
pub struct PropertyBinding<O, V> {
    binding: Binding<V>,
    adapter: Arc<PropertyAdapter<O, V>>,
}

impl<O, V> Clone for PropertyBinding<O, V> {
    fn clone(&self) -> Self {
        Self {
            binding: self.binding.clone(),
            adapter: Arc::clone(&self.adapter),
        }
    }
}

impl<O, V> std::fmt::Debug for PropertyBinding<O, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyBinding")
            .field("binding", &self.binding)
            .field("adapter", &self.adapter)
            .finish()
    }
}

impl<O: Lifecycle, V: BindingValue> PropertyBinding<O, V> {
    /// Bind to `key_path` on `target`, writing `fallback` for absent pushes.
    pub fn new(target: &Arc<O>, key_path: KeyPath<O, V>, fallback: Option<V>) -> Self {
        let binding = Binding::new();
        let adapter = PropertyAdapter::attach(target, key_path, fallback, None, &binding);
        Self { binding, adapter }
    }

    /// Start a builder for a labelled or pre-allocated binding.
    #[must_use]
    pub fn builder() -> PropertyBindingBuilder<O, V> {
        PropertyBindingBuilder::new()
    }

    /// The consumer-facing endpoint.
    #[must_use]
    pub fn endpoint(&self) -> Endpoint<V> {
        self.binding.right_endpoint()
    }

    #[must_use]
    pub fn binding(&self) -> &Binding<V> {
        &self.binding
    }

    #[must_use]
    pub fn adapter(&self) -> &PropertyAdapter<O, V> {
        &self.adapter
    }

    /// Tear the binding down before the target is dropped.
    pub fn complete(&self) -> bool {
        self.binding.complete()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.binding.is_completed()
    }
}

/// Builder for [`PropertyBinding`].
///
/// `target` and `key_path` are required; everything else is optional.
pub struct PropertyBindingBuilder<O, V> {
    target: Option<Weak<O>>,
    key_path: Option<KeyPath<O, V>>,
    fallback: Option<V>,
    label: Option<String>,
    binding: Option<Binding<V>>,
}

impl<O, V> Default for PropertyBindingBuilder<O, V> {
    fn default() -> Self {
        Self {
            target: None,
            key_path: None,
            fallback: None,
            label: None,
            binding: None,
        }
    }
}

impl<O, V> std::fmt::Debug for PropertyBindingBuilder<O, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyBindingBuilder")
            .field("has_target", &self.target.is_some())
            .field("key_path", &self.key_path)
            .field("has_fallback", &self.fallback.is_some())
            .field("label", &self.label)
            .finish()
    }
}

impl<O: Lifecycle, V: BindingValue> PropertyBindingBuilder<O, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn target(mut self, target: &Arc<O>) -> Self {
        self.target = Some(Arc::downgrade(target));
        self
    }

    #[must_use]
    pub fn key_path(mut self, key_path: KeyPath<O, V>) -> Self {
        self.key_path = Some(key_path);
        self
    }

    /// Value written to the slot whenever an absent value is pushed.
    #[must_use]
    pub fn fallback(mut self, fallback: V) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Label attached to this binding's log events.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Drive an existing binding instead of allocating a new one.
    #[must_use]
    pub fn binding(mut self, binding: Binding<V>) -> Self {
        self.binding = Some(binding);
        self
    }

    /// Attach the adapter.
    ///
    /// # Errors
    ///
    /// - [`BindError::MissingTarget`] if no target was set.
    /// - [`BindError::MissingKeyPath`] if no key path was set.
    /// - [`BindError::TargetReleased`] if the target has already been dropped.
    pub fn build(self) -> Result<PropertyBinding<O, V>> {
        let target = self.target.ok_or(BindError::MissingTarget)?;
        let key_path = self.key_path.ok_or(BindError::MissingKeyPath)?;
        let target = target.upgrade().ok_or(BindError::TargetReleased)?;

        let binding = self.binding.unwrap_or_default();
        let adapter =
            PropertyAdapter::attach(&target, key_path, self.fallback, self.label, &binding);
        Ok(PropertyBinding { binding, adapter })
    }
}

/// Create a binding to `key_path` on `target` and return its consumer
/// endpoint.
///
/// The binding stays alive until `target` is dropped or the endpoint's
/// binding is completed.
pub fn create_property_binding<O: Lifecycle, V: BindingValue>(
    target: &Arc<O>,
    key_path: KeyPath<O, V>,
    fallback: Option<V>,
) -> Endpoint<V> {
    PropertyBinding::new(target, key_path, fallback).endpoint()
}
