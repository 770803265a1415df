//! Marshalling and registration errors.

use memory_manager::HeapError;
use object_model::CastError;
use thiserror::Error;

/// Recoverable marshalling failures at the native call boundary.
///
/// All three variants are reported before the routine runs; a failed
/// dispatch never partially invokes the routine. The caller decides how to
/// surface them (typically as a language-level exception).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MarshalError {
    /// Argument-array size does not match the signature's arity.
    #[error("wrong argument count: expected {expected}, got {found}")]
    WrongArgumentCount {
        /// Arity the signature requires (receiver included).
        expected: usize,
        /// Size of the argument array supplied.
        found: usize,
    },

    /// A heap-typed parameter's strict cast failed.
    #[error("type mismatch: {0}")]
    TypeMismatch(#[from] CastError),

    /// An integer-typed parameter received a non-integer reference.
    #[error("small integer expected in argument slot {slot}")]
    SmallIntegerExpected {
        /// Argument-array slot holding the offending value.
        slot: usize,
    },
}

/// Rejected native-method signatures, reported at registration time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The implicit engine-handle parameter may only come first.
    #[error("engine parameter allowed only in the first signature position")]
    EngineNotFirst,
}

/// Everything a native call can fail with: marshalling at the boundary, or
/// the heap underneath the routine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NativeCallError {
    /// The arguments did not fit the signature.
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// The routine hit a heap fault (allocation failure is fatal).
    #[error(transparent)]
    Heap(#[from] HeapError),
}
