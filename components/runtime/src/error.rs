//! The aggregate runtime error.

use memory_manager::HeapError;
use native_dispatch::{MarshalError, NativeCallError, SignatureError};
use object_model::CastError;
use thiserror::Error;

/// Everything an operation on the VM can fail with.
///
/// Heap faults are fatal and propagate to the process boundary; marshalling
/// and cast failures are recoverable at the send boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VmError {
    /// Heap fault (out of memory, corrupted frame chain, bad field access).
    #[error(transparent)]
    Heap(#[from] HeapError),

    /// A native call's arguments did not fit its signature.
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// A strict cast failed outside native dispatch.
    #[error(transparent)]
    Cast(#[from] CastError),

    /// A native method was registered with an invalid signature.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// A method id with no registry entry. Ids travel through the object
    /// world as tagged integers, so forged values can reach the registry.
    #[error("unknown method id {id}")]
    UnknownMethod {
        /// The raw id presented.
        id: u32,
    },

    /// No native binding and no bytecode method answer the selector.
    #[error("{class} does not understand #{selector}")]
    DoesNotUnderstand {
        /// The receiver's class name.
        class: String,
        /// The unanswered selector.
        selector: String,
    },
}

impl From<NativeCallError> for VmError {
    fn from(err: NativeCallError) -> Self {
        match err {
            NativeCallError::Marshal(err) => VmError::Marshal(err),
            NativeCallError::Heap(err) => VmError::Heap(err),
        }
    }
}
