//! Collector and root-chain integration tests.
//!
//! Verifies the forwarding contract across explicit roots, object fields,
//! and native-frame slots, and the LIFO discipline of the frame chain.

use memory_manager::{FrameRoots, Heap, HeapConfig, HeapError};
use object_model::{ClassId, ObjRef};
use std::cell::Cell;

const WORD: usize = std::mem::size_of::<usize>();

fn heap() -> Heap {
    Heap::new(HeapConfig::with_capacity(8 * 1024))
}

fn class() -> ClassId {
    ClassId::from_raw(1)
}

/// Every object reachable from any root before a cycle is reachable after
/// it, and nothing points into the vacated space.
#[test]
fn test_round_trip_forwarding() {
    let mut heap = heap();

    // A three-object chain hanging off an explicit root.
    let leaf = heap.allocate(class(), 1).unwrap();
    heap.set_field(leaf, 0, ObjRef::small_int(99)).unwrap();
    let middle = heap.allocate(class(), 1).unwrap();
    heap.set_field(middle, 0, leaf).unwrap();
    let top = heap.allocate(class(), 1).unwrap();
    heap.set_field(top, 0, middle).unwrap();
    let root = heap.add_root(top);

    // A separate object visible only through a native frame slot.
    let frame_only = heap.allocate(class(), 0).unwrap();
    let slots = [Cell::new(frame_only)];
    let mut frame = FrameRoots::new(&slots);
    unsafe { heap.push_frame(&mut frame) };

    heap.collect();

    let top = heap.root(root);
    let middle = heap.field(top, 0).unwrap();
    let leaf = heap.field(middle, 0).unwrap();
    for survivor in [top, middle, leaf, slots[0].get()] {
        assert!(heap.is_in_active_space(survivor));
        assert!(!heap.is_in_inactive_space(survivor));
    }
    assert_eq!(heap.field(leaf, 0).unwrap(), ObjRef::small_int(99));

    heap.pop_frame(&frame).unwrap();
}

/// Two distinct references to one object are rewritten to the same new
/// address.
#[test]
fn test_idempotent_addressing() {
    let mut heap = heap();
    let shared = heap.allocate(class(), 0).unwrap();
    let root_a = heap.add_root(shared);
    let root_b = heap.add_root(shared);
    let holder = heap.allocate(class(), 1).unwrap();
    heap.set_field(holder, 0, shared).unwrap();
    let holder_root = heap.add_root(holder);

    heap.collect();

    let via_a = heap.root(root_a);
    let via_b = heap.root(root_b);
    let via_field = heap.field(heap.root(holder_root), 0).unwrap();
    assert_ne!(via_a, shared);
    assert_eq!(via_a, via_b);
    assert_eq!(via_a, via_field);
}

/// Chain depth tracks nesting exactly and returns to zero.
#[test]
fn test_frame_nesting_depth() {
    let mut heap = heap();
    let slots: Vec<[Cell<ObjRef>; 1]> = (0..4).map(|_| [Cell::new(ObjRef::EMPTY)]).collect();
    let mut frames: Vec<FrameRoots> = slots.iter().map(|s| FrameRoots::new(s)).collect();

    for (depth, frame) in frames.iter_mut().enumerate() {
        assert_eq!(heap.frame_depth(), depth);
        unsafe { heap.push_frame(frame) };
    }
    assert_eq!(heap.frame_depth(), 4);

    for frame in frames.iter().rev() {
        heap.pop_frame(frame).unwrap();
    }
    assert_eq!(heap.frame_depth(), 0);
}

/// A skipped pop is detected rather than silently corrupting the walk.
#[test]
fn test_out_of_order_pop_is_fatal() {
    let mut heap = heap();
    let outer_slots = [Cell::new(ObjRef::EMPTY)];
    let inner_slots = [Cell::new(ObjRef::EMPTY)];
    let mut outer = FrameRoots::new(&outer_slots);
    let mut inner = FrameRoots::new(&inner_slots);
    unsafe {
        heap.push_frame(&mut outer);
        heap.push_frame(&mut inner);
    }

    assert_eq!(heap.pop_frame(&outer), Err(HeapError::CorruptedFrameChain));
    // The chain is untouched by the failed pop.
    assert_eq!(heap.frame_depth(), 2);
    heap.pop_frame(&inner).unwrap();
    heap.pop_frame(&outer).unwrap();
}

/// Collection triggered mid-frame rewrites the frame's slots, and garbage
/// referenced by nothing is reclaimed.
#[test]
fn test_collection_inside_a_frame() {
    let mut heap = Heap::new(HeapConfig::with_capacity(WORD * 96));
    let live = heap.allocate(class(), 2).unwrap();
    let slots = [Cell::new(live)];
    let mut frame = FrameRoots::new(&slots);
    unsafe { heap.push_frame(&mut frame) };

    // Churn enough garbage to force several cycles while the frame holds
    // its object.
    for _ in 0..64 {
        heap.allocate(class(), 4).unwrap();
    }
    assert!(heap.stats().collections >= 1);

    let live = slots[0].get();
    assert!(heap.is_in_active_space(live));
    assert_eq!(heap.class_of(live), Some(class()));
    assert_eq!(heap.field_count(live), Some(2));

    heap.pop_frame(&frame).unwrap();
}

/// Out of memory after a full cycle is surfaced, not retried.
#[test]
fn test_live_set_exceeding_capacity_is_fatal() {
    let mut heap = Heap::new(HeapConfig::with_capacity(WORD * 32));
    let big = heap.allocate(class(), 16).unwrap();
    heap.add_root(big);
    let err = heap.allocate(class(), 16).unwrap_err();
    assert!(matches!(err, HeapError::OutOfMemory { .. }));
}
