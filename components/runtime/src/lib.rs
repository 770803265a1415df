//! Runtime facade over the execution core.
//!
//! Ties the object model, heap, method registry, and native dispatch table
//! together behind one `Vm` value: bootstrap of the core classes and the
//! nil/true/false singletons, context construction for method activations,
//! barrier-aware field stores, and the native half of the send entry point.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod context;
mod error;
mod vm;

pub use context::{
    BLOCK_FIELDS, BLOCK_HOME, BLOCK_ID, CONTEXT_ARGUMENTS, CONTEXT_FIELDS, CONTEXT_LITERALS,
    CONTEXT_METHOD, CONTEXT_TEMPORARIES,
};
pub use error::VmError;
pub use vm::{CoreClasses, Vm};
