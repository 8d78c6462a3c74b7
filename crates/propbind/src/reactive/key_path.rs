#![forbid(unsafe_code)]

//! Statically typed addressing of a mutable slot on a target object.
//!
//! A [`KeyPath<O, V>`] bundles three operations on an `O`:
//!
//! - read the slot's current value,
//! - write a new value,
//! - observe the slot for changes made by anyone.
//!
//! The observation hook is the host's business. [`KeyPath::observable`]
//! covers the common case of a slot stored as an [`Observable<V>`] field;
//! [`KeyPath::new`] takes arbitrary closures for everything else.

use std::sync::Arc;

use super::binding::BindingValue;
use super::observable::Observable;
use super::subscription::Subscription;

/// Change callback handed to a key path's observer.
pub type ChangeHook = Box<dyn Fn() + Send + Sync>;

type Getter<O, V> = Arc<dyn Fn(&O) -> V + Send + Sync>;
type Setter<O, V> = Arc<dyn Fn(&O, V) + Send + Sync>;
type Observer<O> = Arc<dyn Fn(&O, ChangeHook) -> Subscription + Send + Sync>;

/// Accessor, mutator and change observer for one slot of `O`.
pub struct KeyPath<O, V> {
    name: &'static str,
    get: Getter<O, V>,
    set: Setter<O, V>,
    observe: Observer<O>,
}

impl<O, V> Clone for KeyPath<O, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
            observe: Arc::clone(&self.observe),
        }
    }
}

impl<O, V> std::fmt::Debug for KeyPath<O, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPath").field("name", &self.name).finish()
    }
}

impl<O: 'static, V: BindingValue> KeyPath<O, V> {
    /// Build a key path from explicit closures.
    ///
    /// `observe` must call the supplied [`ChangeHook`] after every change to
    /// the slot, including changes made through `set`, until the returned
    /// [`Subscription`] is disposed.
    pub fn new(
        name: &'static str,
        get: impl Fn(&O) -> V + Send + Sync + 'static,
        set: impl Fn(&O, V) + Send + Sync + 'static,
        observe: impl Fn(&O, ChangeHook) -> Subscription + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            get: Arc::new(get),
            set: Arc::new(set),
            observe: Arc::new(observe),
        }
    }

    /// Key path over an [`Observable<V>`] field of `O`.
    ///
    /// ```ignore
    /// let temperature = KeyPath::observable("temperature", |t: &Thermostat| &t.temperature);
    /// ```
    pub fn observable<F>(name: &'static str, field: F) -> Self
    where
        F: Fn(&O) -> &Observable<V> + Send + Sync + 'static,
    {
        let field = Arc::new(field);
        let get_field = Arc::clone(&field);
        let set_field = Arc::clone(&field);
        Self::new(
            name,
            move |target: &O| get_field(target).get(),
            move |target: &O, value: V| set_field(target).set(value),
            move |target: &O, hook: ChangeHook| field(target).subscribe(move |_| hook()),
        )
    }

    /// Name used in log fields.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read the slot.
    pub fn get(&self, target: &O) -> V {
        (self.get)(target)
    }

    /// Write the slot.
    pub fn set(&self, target: &O, value: V) {
        (self.set)(target, value);
    }

    /// Observe the slot; `hook` runs after each change.
    pub fn observe(&self, target: &O, hook: ChangeHook) -> Subscription {
        (self.observe)(target, hook)
    }
}
