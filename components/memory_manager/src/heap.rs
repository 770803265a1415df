//! Heap structure: semispaces, bump allocation, field access, write barrier.
//!
//! Objects are laid out as a three-word header followed by their field
//! slots, all word-sized:
//!
//! ```text
//! +-------+-------------+------------+----------+----------+-----+
//! | class | field count | forwarding | field 0  | field 1  | ... |
//! +-------+-------------+------------+----------+----------+-----+
//! ```
//!
//! The forwarding word is zero for a live object; during a collection cycle
//! it holds the object's new address in the destination space.

use crate::config::HeapConfig;
use crate::error::HeapError;
use crate::roots::{FrameRoots, RootIndex, RootTable};
use object_model::{ClassId, ObjRef};
use std::collections::HashSet;
use std::ptr;

/// Size of one heap word, in bytes.
pub(crate) const WORD_SIZE: usize = std::mem::size_of::<usize>();
/// Words in an object header.
pub(crate) const HEADER_WORDS: usize = 3;
/// Header word offsets.
pub(crate) const OFF_CLASS: usize = 0;
pub(crate) const OFF_COUNT: usize = 1;
pub(crate) const OFF_FORWARD: usize = 2;

/// Reads one word at a raw heap address.
///
/// # Safety
///
/// `address` must lie within one of the heap's semispace buffers.
pub(crate) unsafe fn read_word(address: usize) -> usize {
    *(address as *const usize)
}

/// Writes one word at a raw heap address.
///
/// # Safety
///
/// `address` must lie within one of the heap's semispace buffers.
pub(crate) unsafe fn write_word(address: usize, word: usize) {
    *(address as *mut usize) = word;
}

/// One contiguous bump-allocated region.
pub(crate) struct SemiSpace {
    words: Box<[usize]>,
    /// Words handed out so far.
    pub(crate) top: usize,
}

impl SemiSpace {
    fn new(capacity_words: usize) -> Self {
        SemiSpace {
            words: vec![0usize; capacity_words].into_boxed_slice(),
            top: 0,
        }
    }

    pub(crate) fn base(&self) -> usize {
        self.words.as_ptr() as usize
    }

    pub(crate) fn capacity_words(&self) -> usize {
        self.words.len()
    }

    pub(crate) fn used_words(&self) -> usize {
        self.top
    }

    /// Bump-allocates `words` words, returning the base address.
    pub(crate) fn bump(&mut self, words: usize) -> Option<usize> {
        if self.top + words > self.words.len() {
            return None;
        }
        let address = self.base() + self.top * WORD_SIZE;
        self.top += words;
        Some(address)
    }

    pub(crate) fn contains(&self, address: usize) -> bool {
        let base = self.base();
        address >= base && address < base + self.words.len() * WORD_SIZE
    }

    pub(crate) fn reset(&mut self) {
        self.top = 0;
    }
}

/// Collector statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct GcStats {
    /// Completed collection cycles.
    pub collections: u64,
    /// Objects copied to the destination space, over all cycles.
    pub objects_copied: u64,
    /// Words copied, over all cycles.
    pub words_copied: u64,
    /// Instance-variable writes recorded by the barrier.
    pub remembered_writes: u64,
}

/// The heap: a pair of semispaces plus the root-reporting structures.
///
/// Allocation is a bump pointer into the active space. When an allocation
/// does not fit, a full synchronous collection cycle copies the live set
/// into the inactive space and the spaces swap roles. If the allocation
/// still does not fit afterwards, [`HeapError::OutOfMemory`] is returned.
pub struct Heap {
    pub(crate) active: SemiSpace,
    pub(crate) inactive: SemiSpace,
    pub(crate) roots: RootTable,
    pub(crate) chain_head: *mut FrameRoots,
    pub(crate) remembered: HashSet<usize>,
    pub(crate) stats: GcStats,
}

impl Heap {
    /// Creates a heap with the configured semispace capacity.
    pub fn new(config: HeapConfig) -> Self {
        let capacity_words = config.semispace_capacity / WORD_SIZE;
        Heap {
            active: SemiSpace::new(capacity_words),
            inactive: SemiSpace::new(capacity_words),
            roots: RootTable::default(),
            chain_head: ptr::null_mut(),
            remembered: HashSet::new(),
            stats: GcStats::default(),
        }
    }

    /// Allocates an object of `class` with `field_count` empty field slots.
    ///
    /// May trigger a full collection cycle; every reference held by the
    /// caller outside the root-reporting structures is stale afterwards.
    pub fn allocate(&mut self, class: ClassId, field_count: usize) -> Result<ObjRef, HeapError> {
        let words = HEADER_WORDS + field_count;
        let address = match self.active.bump(words) {
            Some(address) => address,
            None => {
                self.collect();
                match self.active.bump(words) {
                    Some(address) => address,
                    None => {
                        return Err(HeapError::OutOfMemory {
                            requested_words: words,
                            capacity_words: self.active.capacity_words(),
                        })
                    }
                }
            }
        };
        // SAFETY: bump() returned an in-bounds range of `words` words.
        unsafe {
            write_word(address + OFF_CLASS * WORD_SIZE, class.to_raw() as usize);
            write_word(address + OFF_COUNT * WORD_SIZE, field_count);
            write_word(address + OFF_FORWARD * WORD_SIZE, 0);
            for i in 0..field_count {
                write_word(
                    address + (HEADER_WORDS + i) * WORD_SIZE,
                    ObjRef::EMPTY.raw(),
                );
            }
        }
        Ok(ObjRef::from_address(address))
    }

    /// Returns the class of a heap object, or `None` for non-heap values.
    pub fn class_of(&self, reference: ObjRef) -> Option<ClassId> {
        let address = reference.address()?;
        // SAFETY: a heap reference addresses a header written by allocate().
        let raw = unsafe { read_word(address + OFF_CLASS * WORD_SIZE) };
        Some(ClassId::from_raw(raw as u32))
    }

    /// Returns the field count of a heap object, or `None` for non-heap
    /// values.
    pub fn field_count(&self, reference: ObjRef) -> Option<usize> {
        let address = reference.address()?;
        // SAFETY: see class_of().
        Some(unsafe { read_word(address + OFF_COUNT * WORD_SIZE) })
    }

    /// Reads field `index` of a heap object.
    pub fn field(&self, reference: ObjRef, index: usize) -> Result<ObjRef, HeapError> {
        let (address, count) = self.object_words(reference)?;
        if index >= count {
            return Err(HeapError::FieldOutOfBounds { index, count });
        }
        // SAFETY: index is within the object's field slots.
        let word = unsafe { read_word(address + (HEADER_WORDS + index) * WORD_SIZE) };
        Ok(ObjRef::from_raw(word))
    }

    /// Writes field `index` of a heap object.
    ///
    /// This is the raw store; instance-variable assignment must additionally
    /// run [`Heap::write_barrier`] on the holder.
    pub fn set_field(
        &mut self,
        reference: ObjRef,
        index: usize,
        value: ObjRef,
    ) -> Result<(), HeapError> {
        let (address, count) = self.object_words(reference)?;
        if index >= count {
            return Err(HeapError::FieldOutOfBounds { index, count });
        }
        // SAFETY: index is within the object's field slots.
        unsafe { write_word(address + (HEADER_WORDS + index) * WORD_SIZE, value.raw()) };
        Ok(())
    }

    /// Records a reference store into `holder` as a potential
    /// cross-generational write.
    ///
    /// The current collector runs only full cycles, which rewrite every
    /// live slot without consulting the set, so today this is pure
    /// bookkeeping; a generational split would scan remembered holders as
    /// roots of its minor cycles. The collector clears the set each cycle.
    pub fn write_barrier(&mut self, holder: ObjRef) {
        if let Some(address) = holder.address() {
            self.remembered.insert(address);
            self.stats.remembered_writes += 1;
        }
    }

    /// Registers a permanent explicit root.
    pub fn add_root(&mut self, reference: ObjRef) -> RootIndex {
        self.roots.add(reference)
    }

    /// Reads an explicit root (always current, the collector rewrites it).
    pub fn root(&self, index: RootIndex) -> ObjRef {
        self.roots.get(index)
    }

    /// Overwrites an explicit root.
    pub fn set_root(&mut self, index: RootIndex, reference: ObjRef) {
        self.roots.set(index, reference);
    }

    /// Links a native frame's descriptor onto the root chain.
    ///
    /// # Safety
    ///
    /// The descriptor and the slot buffer it points at must stay alive and
    /// in place until the matching [`Heap::pop_frame`]. Frames must unlink
    /// in exact LIFO order.
    pub unsafe fn push_frame(&mut self, frame: *mut FrameRoots) {
        (*frame).next = self.chain_head;
        self.chain_head = frame;
    }

    /// Unlinks a frame descriptor, restoring the previous chain head.
    ///
    /// Fails with [`HeapError::CorruptedFrameChain`] if `frame` is not the
    /// current head, which means some frame skipped its pop.
    pub fn pop_frame(&mut self, frame: &FrameRoots) -> Result<(), HeapError> {
        let expected = frame as *const FrameRoots as *mut FrameRoots;
        if self.chain_head != expected {
            return Err(HeapError::CorruptedFrameChain);
        }
        self.chain_head = frame.next;
        Ok(())
    }

    /// Returns the number of frames currently on the root chain.
    pub fn frame_depth(&self) -> usize {
        let mut depth = 0;
        let mut entry = self.chain_head;
        while !entry.is_null() {
            depth += 1;
            // SAFETY: linked descriptors outlive their registration.
            entry = unsafe { (*entry).next };
        }
        depth
    }

    /// Returns true if `reference` points into the active (allocation)
    /// space.
    pub fn is_in_active_space(&self, reference: ObjRef) -> bool {
        reference
            .address()
            .is_some_and(|address| self.active.contains(address))
    }

    /// Returns true if `reference` points into the inactive space - after a
    /// cycle this is the vacated region no live reference may point into.
    pub fn is_in_inactive_space(&self, reference: ObjRef) -> bool {
        reference
            .address()
            .is_some_and(|address| self.inactive.contains(address))
    }

    /// Words currently allocated in the active space.
    pub fn used_words(&self) -> usize {
        self.active.used_words()
    }

    /// Capacity of each semispace, in words.
    pub fn capacity_words(&self) -> usize {
        self.active.capacity_words()
    }

    /// Collector statistics.
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    fn object_words(&self, reference: ObjRef) -> Result<(usize, usize), HeapError> {
        let address = reference
            .address()
            .ok_or(HeapError::NotAnObject { reference })?;
        // SAFETY: a heap reference addresses a header written by allocate().
        let count = unsafe { read_word(address + OFF_COUNT * WORD_SIZE) };
        Ok((address, count))
    }
}
