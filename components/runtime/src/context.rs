//! Field layouts of the activation-record heap objects.
//!
//! A context is an ordinary heap object; natively compiled frames load its
//! fields once in their preamble and keep the derived state in frame
//! registers, invisible to everything but the root chain.

/// Context field: the activated method's registry id, as a tagged integer.
pub const CONTEXT_METHOD: usize = 0;
/// Context field: the arguments array (slot 0 is the receiver).
pub const CONTEXT_ARGUMENTS: usize = 1;
/// Context field: the temporaries array.
pub const CONTEXT_TEMPORARIES: usize = 2;
/// Context field: the literals array, cached from the method.
pub const CONTEXT_LITERALS: usize = 3;
/// Total context fields.
pub const CONTEXT_FIELDS: usize = 4;

/// Block field: the compiled block's id within its home method, tagged.
pub const BLOCK_ID: usize = 0;
/// Block field: the home context whose temporaries the block shares.
pub const BLOCK_HOME: usize = 1;
/// Total block fields.
pub const BLOCK_FIELDS: usize = 2;
