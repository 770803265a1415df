//! Native signature descriptions and converted argument values.

use object_model::{ClassId, ObjRef};
use std::cell::Cell;

/// One parameter of a native routine's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSpec {
    /// The implicit VM/engine handle. Allowed only in the first signature
    /// position; consumes no argument-array slot.
    Engine,
    /// A tagged small integer. The dynamic slot must actually carry the
    /// integer tag; nothing is coerced.
    SmallInt,
    /// A heap instance of the given class (or a subclass), checked by the
    /// strict cast.
    Instance(ClassId),
}

impl ParamSpec {
    /// Returns true if the parameter consumes an argument-array slot.
    pub fn takes_slot(self) -> bool {
        !matches!(self, ParamSpec::Engine)
    }
}

/// One argument after conversion to its declared parameter type.
///
/// Heap instances are handed out as references to rooted cells rather than
/// raw copies: the cells sit on the root chain for the routine's whole run,
/// so [`NativeValue::as_instance`] stays current even after the routine's
/// own allocation triggers a collection cycle.
#[derive(Clone, Copy)]
pub enum NativeValue<'a> {
    /// An untagged small-integer value.
    SmallInt(isize),
    /// A successfully cast heap reference, held in a rooted cell.
    Instance(&'a Cell<ObjRef>),
}

impl<'a> NativeValue<'a> {
    /// The integer payload, or `None` for an instance.
    pub fn as_small_int(self) -> Option<isize> {
        match self {
            NativeValue::SmallInt(value) => Some(value),
            NativeValue::Instance(_) => None,
        }
    }

    /// The heap reference, read through its rooted cell, or `None` for an
    /// integer. Re-read after every allocation; the collector may have
    /// rewritten the cell.
    pub fn as_instance(self) -> Option<ObjRef> {
        match self {
            NativeValue::Instance(cell) => Some(cell.get()),
            NativeValue::SmallInt(_) => None,
        }
    }
}
