#![forbid(unsafe_code)]

//! Error types for binding construction.

/// Misuse detected while constructing a property binding.
///
/// Absent values and pushes after completion are not errors; only a
/// construction call with missing inputs fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    /// No target object was supplied.
    #[error("property binding requires a target object")]
    MissingTarget,
    /// No key path (accessor, mutator and observer) was supplied.
    #[error("property binding requires a key path")]
    MissingKeyPath,
    /// The target object was dropped before the binding was built.
    #[error("target object was released before the binding was built")]
    TargetReleased,
}

/// Convenience alias for binding construction results.
pub type Result<T> = std::result::Result<T, BindError>;
