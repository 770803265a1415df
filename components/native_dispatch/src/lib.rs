//! Native method dispatch - typed marshalling for native routines.
//!
//! A native routine has a statically-typed signature; callers hand it a
//! dynamically-typed argument array. This component reconciles the two:
//! - Arity is validated before anything runs.
//! - Each argument is converted to its declared parameter type: heap
//!   parameters through the strict cast, integer parameters through the tag
//!   bit. Failures are recoverable [`MarshalError`] values, never a crash.
//! - The routine's result is boxed back into the object world; a routine
//!   with no result maps to the nil singleton.
//!
//! The [`DispatchTable`] maps selectors to bound routines; the send
//! mechanism consults it before falling back to bytecode execution.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod method;
mod signature;
mod table;

pub use error::{MarshalError, NativeCallError, SignatureError};
pub use method::{NativeCtx, NativeMethod, NativeRoutine};
pub use signature::{NativeValue, ParamSpec};
pub use table::DispatchTable;
