//! Object-model error types.

use thiserror::Error;

/// Failure of the strict cast operation.
///
/// A cast converts an untyped reference into a strongly typed one; it fails
/// when the referenced object's class is not the requested class or one of
/// its registered subclasses, or when the reference does not designate a
/// heap object at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CastError {
    /// The object exists but its class is incompatible with the request.
    #[error("type mismatch: expected an instance of {expected}, found {found}")]
    TypeMismatch {
        /// Name of the requested class.
        expected: String,
        /// Name of the object's actual class.
        found: String,
    },

    /// The reference is a tagged small integer or the empty reference.
    #[error("expected an instance of {expected}, found a non-heap reference")]
    NotAHeapReference {
        /// Name of the requested class.
        expected: String,
    },
}
