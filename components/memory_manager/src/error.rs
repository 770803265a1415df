//! Heap and collector error types.

use object_model::ObjRef;
use thiserror::Error;

/// Errors raised by the heap.
///
/// `OutOfMemory` and `CorruptedFrameChain` are fatal: they propagate to the
/// process boundary and are never retried. The remaining variants report
/// misuse of the field-access contract.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HeapError {
    /// The requested allocation could not be satisfied even after a full
    /// collection cycle: the live set exceeds the semispace capacity.
    #[error(
        "out of memory: {requested_words} words requested after a full \
         collection ({capacity_words}-word semispace)"
    )]
    OutOfMemory {
        /// Size of the failed request, in words (header included).
        requested_words: usize,
        /// Capacity of each semispace, in words.
        capacity_words: usize,
    },

    /// A frame descriptor was popped out of LIFO order. The chain no longer
    /// describes the native call stack and collection would scan garbage.
    #[error("corrupted native frame chain: popped descriptor is not the current head")]
    CorruptedFrameChain,

    /// A field access went through a reference that is not a heap object.
    #[error("not a heap object: {reference:?}")]
    NotAnObject {
        /// The offending reference.
        reference: ObjRef,
    },

    /// A field index exceeded the object's fixed field count.
    #[error("field index {index} out of bounds for object with {count} fields")]
    FieldOutOfBounds {
        /// The requested field index.
        index: usize,
        /// The object's field count.
        count: usize,
    },
}
