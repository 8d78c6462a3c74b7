#![forbid(unsafe_code)]

//! Two-way reactive property bindings.
//!
//! `propbind` links two mutable values so that a change to either reaches
//! the other, without feedback loops, tearing the link down when the object
//! that owns a bound property is dropped.
//!
//! ```ignore
//! use std::sync::Arc;
//! use propbind::{KeyPath, Lifecycle, Lifetime, Observable, create_property_binding};
//!
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
//!
//! let thermostat = Arc::new(Thermostat {
//!     temperature: Observable::new(20),
//!     lifetime: Lifetime::new(),
//! });
//! let temperature = create_property_binding(
//!     &thermostat,
//!     KeyPath::observable("temperature", |t: &Thermostat| &t.temperature),
//!     Some(0),
//! );
//!
//! let _sub = temperature.subscribe_next(|v| println!("temperature: {v:?}"));
//! temperature.push_value(25);
//! assert_eq!(thermostat.temperature.get(), 25);
//! ```

pub mod error;
pub mod reactive;

pub use error::BindError;
pub use reactive::{
    Binding, BindingScope, BindingValue, ChangeHook, Endpoint, EndpointLink, Event, KeyPath,
    Lifecycle, Lifetime, Observable, PropertyAdapter, PropertyBinding, PropertyBindingBuilder,
    Side, Subscription, bind_endpoints, create_property_binding,
};
