//! Root reporting: the explicit root table and the native-frame root chain.
//!
//! The collector only ever sees two kinds of roots. Long-lived VM roots
//! (special objects, method literal arrays, whatever the external
//! interpreter registers) live in the [`RootTable`] and are rewritten in
//! place during a cycle. Short-lived roots inside natively compiled frames
//! are reported through a chain of [`FrameRoots`] descriptors: each frame
//! pushes its descriptor on entry and pops it on every exit path, so the
//! chain mirrors the native call stack exactly.

use object_model::ObjRef;
use std::cell::Cell;
use std::ptr;

/// Handle to an entry in the explicit root table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootIndex(u32);

/// Explicit VM-level roots, rewritten in place by the collector.
///
/// The table only grows; entries are permanent for the life of the VM
/// (special objects and method literal arrays are never unregistered).
#[derive(Default)]
pub(crate) struct RootTable {
    cells: Vec<ObjRef>,
}

impl RootTable {
    pub(crate) fn add(&mut self, reference: ObjRef) -> RootIndex {
        let index = RootIndex(self.cells.len() as u32);
        self.cells.push(reference);
        index
    }

    pub(crate) fn get(&self, index: RootIndex) -> ObjRef {
        self.cells[index.0 as usize]
    }

    pub(crate) fn set(&mut self, index: RootIndex, reference: ObjRef) {
        self.cells[index.0 as usize] = reference;
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn get_at(&self, position: usize) -> ObjRef {
        self.cells[position]
    }

    pub(crate) fn set_at(&mut self, position: usize, reference: ObjRef) {
        self.cells[position] = reference;
    }
}

/// One native frame's root descriptor.
///
/// The descriptor points at a buffer of [`Cell`]-wrapped reference slots
/// owned by the executing frame; the cells let the collector rewrite the
/// slots while the frame retains shared access to them. Slots holding a
/// tagged small integer or the empty reference are inert and skipped.
///
/// Ownership is strictly stack-disciplined: the descriptor must outlive its
/// registration on the chain, and frames must unlink in exact LIFO order.
/// A violation is detected by [`Heap::pop_frame`](crate::Heap::pop_frame)
/// and surfaced as a fatal [`HeapError`](crate::HeapError).
pub struct FrameRoots {
    pub(crate) next: *mut FrameRoots,
    pub(crate) slot_count: usize,
    pub(crate) slots: *const Cell<ObjRef>,
}

impl FrameRoots {
    /// Creates a descriptor over a frame's reference slots.
    ///
    /// The slice must stay alive and in place for as long as the descriptor
    /// is linked on the chain.
    pub fn new(slots: &[Cell<ObjRef>]) -> Self {
        FrameRoots {
            next: ptr::null_mut(),
            slot_count: slots.len(),
            slots: slots.as_ptr(),
        }
    }

    /// Returns the number of slots this frame reports.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }
}
