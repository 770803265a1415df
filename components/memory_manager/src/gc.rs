//! Cheney-style copying collection.
//!
//! A cycle copies the live object graph into the inactive space in
//! breadth-first order, using the forwarding header word to record each
//! relocated object's new address. Reachability starts from the explicit
//! root table and the native-frame root chain; the scan loop then forwards
//! every heap reference held in already-copied objects. The spaces swap
//! roles at the end, so no live reference ever points into the vacated
//! region.

use crate::heap::{
    read_word, write_word, Heap, HEADER_WORDS, OFF_COUNT, OFF_FORWARD, WORD_SIZE,
};
use object_model::ObjRef;
use std::mem;

impl Heap {
    /// Runs one full synchronous collection cycle.
    ///
    /// Every reference reachable through the root table, the frame chain,
    /// or a live object's fields is rewritten to the object's new address.
    /// References held anywhere else are stale after this returns.
    pub fn collect(&mut self) {
        let used_before = self.active.used_words();
        let objects_before = self.stats.objects_copied;

        self.inactive.reset();

        // Explicit roots.
        for position in 0..self.roots.len() {
            let forwarded = self.forward(self.roots.get_at(position));
            self.roots.set_at(position, forwarded);
        }

        // Native-frame slots, newest frame first.
        let mut entry = self.chain_head;
        while !entry.is_null() {
            // SAFETY: linked descriptors and their slot buffers outlive
            // their registration; push_frame's contract.
            unsafe {
                let slots = (*entry).slots;
                for i in 0..(*entry).slot_count {
                    let cell = &*slots.add(i);
                    cell.set(self.forward(cell.get()));
                }
                entry = (*entry).next;
            }
        }

        // Scan loop: forward the fields of everything copied so far. The
        // top grows as forwarding copies more objects.
        let mut scan = 0;
        while scan < self.inactive.top {
            let address = self.inactive.base() + scan * WORD_SIZE;
            // SAFETY: [base, top) holds whole copied objects.
            let count = unsafe { read_word(address + OFF_COUNT * WORD_SIZE) };
            for i in 0..count {
                let slot = address + (HEADER_WORDS + i) * WORD_SIZE;
                let forwarded = self.forward(ObjRef::from_raw(unsafe { read_word(slot) }));
                unsafe { write_word(slot, forwarded.raw()) };
            }
            scan += HEADER_WORDS + count;
        }

        mem::swap(&mut self.active, &mut self.inactive);
        self.remembered.clear();
        self.stats.collections += 1;

        tracing::debug!(
            cycle = self.stats.collections,
            used_before,
            used_after = self.active.used_words(),
            objects_copied = self.stats.objects_copied - objects_before,
            frames = self.frame_depth(),
            "collection cycle complete"
        );
    }

    /// Forwards one reference: copies the object on first encounter,
    /// returns the recorded destination on every later one. Tagged small
    /// integers and the empty reference pass through unchanged.
    fn forward(&mut self, reference: ObjRef) -> ObjRef {
        let old = match reference.address() {
            Some(address) => address,
            None => return reference,
        };
        if !self.active.contains(old) {
            return reference;
        }
        // SAFETY: old addresses a header in the source space.
        unsafe {
            let forwarding = read_word(old + OFF_FORWARD * WORD_SIZE);
            if forwarding != 0 {
                return ObjRef::from_address(forwarding);
            }

            let count = read_word(old + OFF_COUNT * WORD_SIZE);
            let words = HEADER_WORDS + count;
            let new = match self.inactive.bump(words) {
                Some(new) => new,
                // The destination has the same capacity as the source, so
                // the live set always fits.
                None => unreachable!("destination space overflow during copy"),
            };
            std::ptr::copy_nonoverlapping(old as *const usize, new as *mut usize, words);
            write_word(new + OFF_FORWARD * WORD_SIZE, 0);
            write_word(old + OFF_FORWARD * WORD_SIZE, new);

            self.stats.objects_copied += 1;
            self.stats.words_copied += words as u64;
            ObjRef::from_address(new)
        }
    }
}
