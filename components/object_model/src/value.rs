//! Tagged object references.
//!
//! Every value in the system fits into one machine word:
//!
//! - Bit 0 set: a tagged small integer. The integer payload lives in the
//!   upper bits and is recovered with an arithmetic shift. Small integers
//!   are never allocated and never relocated by the collector.
//! - The zero word: the empty reference. Used for uninitialized slots and
//!   skipped by the collector.
//! - Anything else: the address of an object header in one of the heap
//!   semispaces. Heap addresses are word-aligned, so bit 0 is always clear.

use std::fmt;

/// A one-word tagged reference to a VM value.
///
/// `ObjRef` is `Copy` and carries no lifetime: a heap reference is only
/// valid until the next collection cycle, at which point every holder must
/// have had its copy rewritten through the collector's root-reporting
/// mechanism before dereferencing it again.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(usize);

impl ObjRef {
    /// The empty reference (uninitialized slot). Never a valid object.
    pub const EMPTY: ObjRef = ObjRef(0);

    /// Creates a tagged small integer.
    ///
    /// The value is shifted left by one; the top bit of `value` is lost,
    /// which matches the reduced range of tagged integers.
    pub fn small_int(value: isize) -> Self {
        ObjRef(((value as usize) << 1) | 1)
    }

    /// Creates a heap reference from a raw header address.
    ///
    /// The address must be word-aligned (bit 0 clear) and non-zero; this is
    /// guaranteed for addresses handed out by the heap allocator.
    pub fn from_address(address: usize) -> Self {
        debug_assert!(address != 0 && address & 1 == 0);
        ObjRef(address)
    }

    /// Returns true if this is a tagged small integer.
    pub fn is_small_int(self) -> bool {
        self.0 & 1 == 1
    }

    /// Returns true if this is the empty reference.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if this references a heap object.
    pub fn is_heap(self) -> bool {
        !self.is_empty() && !self.is_small_int()
    }

    /// Returns the integer payload if this is a tagged small integer.
    pub fn as_small_int(self) -> Option<isize> {
        if self.is_small_int() {
            Some((self.0 as isize) >> 1)
        } else {
            None
        }
    }

    /// Returns the header address if this is a heap reference.
    pub fn address(self) -> Option<usize> {
        if self.is_heap() {
            Some(self.0)
        } else {
            None
        }
    }

    /// Returns the raw word, tag bits included.
    pub fn raw(self) -> usize {
        self.0
    }

    /// Rebuilds a reference from a raw word read out of a heap slot.
    pub fn from_raw(word: usize) -> Self {
        ObjRef(word)
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "ObjRef::EMPTY")
        } else if let Some(n) = self.as_small_int() {
            write!(f, "SmallInt({})", n)
        } else {
            write!(f, "Heap({:#x})", self.0)
        }
    }
}
