//! Core object model for the VM execution core.
//!
//! This crate provides the foundational types shared by every other
//! component:
//!
//! - [`ObjRef`] - one-word tagged object reference (small integer or heap
//!   address)
//! - [`Symbol`] / [`SymbolTable`] - interned selectors with identity equality
//!   and lexicographic ordering
//! - [`ClassId`] / [`ClassTable`] - the class registry and the strict cast
//!   compatibility check
//! - [`CastError`] - the single channel through which dynamic/static type
//!   mismatches surface
//!
//! # Examples
//!
//! ```
//! use object_model::ObjRef;
//!
//! let three = ObjRef::small_int(3);
//! assert!(three.is_small_int());
//! assert_eq!(three.as_small_int(), Some(3));
//!
//! let empty = ObjRef::EMPTY;
//! assert!(!empty.is_heap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod class;
mod error;
mod symbol;
mod value;

pub use class::{ClassId, ClassTable};
pub use error::CastError;
pub use symbol::{Symbol, SymbolTable};
pub use value::ObjRef;
