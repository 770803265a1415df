//! Bound native methods and their invocation path.

use crate::error::{MarshalError, NativeCallError, SignatureError};
use crate::signature::{NativeValue, ParamSpec};
use memory_manager::{FrameRoots, Heap, RootIndex};
use object_model::{CastError, ClassId, ClassTable, ObjRef, Symbol};
use std::cell::Cell;

/// What a native routine sees of the VM while it runs.
///
/// Holds the heap mutably (routines allocate) and the class table for
/// casts. The nil singleton is reached through its root-table handle rather
/// than a captured reference, so it stays valid when a routine's own
/// allocation triggers a collection cycle.
pub struct NativeCtx<'a> {
    /// The heap, for allocation and field access.
    pub heap: &'a mut Heap,
    /// The class registry, for casts and class lookups.
    pub classes: &'a ClassTable,
    nil_root: RootIndex,
}

impl<'a> NativeCtx<'a> {
    /// Creates a context over the VM's heap and class table.
    pub fn new(heap: &'a mut Heap, classes: &'a ClassTable, nil_root: RootIndex) -> Self {
        NativeCtx {
            heap,
            classes,
            nil_root,
        }
    }

    /// The nil singleton, read through the root table.
    pub fn nil(&self) -> ObjRef {
        self.heap.root(self.nil_root)
    }
}

/// The callable bound into a [`NativeMethod`].
///
/// Receives the VM context, the cast receiver in its rooted cell, and the
/// converted arguments; returns the result reference, or `None` for a void
/// routine. The receiver cell and the cells behind
/// [`NativeValue::Instance`] live on the root chain while the routine runs,
/// so a routine that allocates re-reads them afterwards and always sees the
/// objects' current addresses.
pub type NativeRoutine = Box<
    dyn Fn(&mut NativeCtx<'_>, &Cell<ObjRef>, &[NativeValue<'_>]) -> Result<Option<ObjRef>, NativeCallError>,
>;

/// A native routine bound to a selector, a receiver class, and a signature.
///
/// The argument-array slot of every signature parameter is computed once at
/// registration; invocation just walks the precomputed list.
pub struct NativeMethod {
    selector: Symbol,
    receiver_class: ClassId,
    /// Argument-array slot and conversion for every slot-consuming
    /// parameter, in signature order.
    bindings: Box<[(usize, ParamSpec)]>,
    routine: NativeRoutine,
}

impl NativeMethod {
    /// Binds a routine under `selector` for receivers of `receiver_class`.
    ///
    /// `params` describes the routine's parameters after the receiver. The
    /// engine handle may only appear first.
    pub fn new(
        selector: Symbol,
        receiver_class: ClassId,
        params: Vec<ParamSpec>,
        routine: NativeRoutine,
    ) -> Result<Self, SignatureError> {
        if params
            .iter()
            .skip(1)
            .any(|spec| matches!(spec, ParamSpec::Engine))
        {
            return Err(SignatureError::EngineNotFirst);
        }
        // Slot 0 is the receiver; the remaining parameters take consecutive
        // slots.
        let mut next = 1;
        let mut bindings = Vec::new();
        for spec in params {
            if spec.takes_slot() {
                bindings.push((next, spec));
                next += 1;
            }
        }
        Ok(NativeMethod {
            selector,
            receiver_class,
            bindings: bindings.into_boxed_slice(),
            routine,
        })
    }

    /// The selector the method answers to.
    pub fn selector(&self) -> &Symbol {
        &self.selector
    }

    /// The class receivers must cast to.
    pub fn receiver_class(&self) -> ClassId {
        self.receiver_class
    }

    /// Argument-array size the method requires, receiver included.
    pub fn arity(&self) -> usize {
        1 + self.bindings.len()
    }

    /// Invokes the routine with a dynamically-typed argument array.
    ///
    /// Arity is checked first; a mismatch never reaches the routine. The
    /// receiver is the strict cast of slot 0 to the receiver class; the
    /// remaining slots convert per their [`ParamSpec`]. The receiver and
    /// every cast heap argument sit in cells registered on the root chain
    /// for the routine's whole run, so the collector rewrites them in place
    /// if the routine allocates. A void result maps to nil.
    pub fn invoke(
        &self,
        ctx: &mut NativeCtx<'_>,
        args: &[ObjRef],
    ) -> Result<ObjRef, NativeCallError> {
        if args.len() != self.arity() {
            return Err(MarshalError::WrongArgumentCount {
                expected: self.arity(),
                found: args.len(),
            }
            .into());
        }

        cast_instance(ctx, args[0], self.receiver_class)?;

        // Marshal first; only then build the rooted slot buffer, so the
        // cell addresses stay fixed while the frame is on the chain.
        enum Slotted {
            Int(isize),
            Heap(usize),
        }
        let mut slots: Vec<Cell<ObjRef>> = Vec::with_capacity(1 + self.bindings.len());
        slots.push(Cell::new(args[0]));
        let mut marshalled = Vec::with_capacity(self.bindings.len());
        for &(slot, spec) in self.bindings.iter() {
            match spec {
                // The engine handle never consumes a slot.
                ParamSpec::Engine => {}
                ParamSpec::SmallInt => {
                    let value = args[slot]
                        .as_small_int()
                        .ok_or(MarshalError::SmallIntegerExpected { slot })?;
                    marshalled.push(Slotted::Int(value));
                }
                ParamSpec::Instance(expected) => {
                    cast_instance(ctx, args[slot], expected)?;
                    marshalled.push(Slotted::Heap(slots.len()));
                    slots.push(Cell::new(args[slot]));
                }
            }
        }
        let values: Vec<NativeValue<'_>> = marshalled
            .iter()
            .map(|entry| match entry {
                Slotted::Int(value) => NativeValue::SmallInt(*value),
                Slotted::Heap(index) => NativeValue::Instance(&slots[*index]),
            })
            .collect();

        let mut frame = FrameRoots::new(&slots);
        // SAFETY: the descriptor and slot buffer outlive the routine call
        // and the frame is popped on all paths.
        unsafe { ctx.heap.push_frame(&mut frame) };
        let result = (self.routine)(ctx, &slots[0], &values);
        let popped = ctx.heap.pop_frame(&frame);
        match (result, popped) {
            (Ok(Some(result)), Ok(())) => Ok(result),
            (Ok(None), Ok(())) => Ok(ctx.nil()),
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err.into()),
        }
    }
}

/// Strict-casts `reference` to `expected`, naming the class on failure.
fn cast_instance(
    ctx: &NativeCtx<'_>,
    reference: ObjRef,
    expected: ClassId,
) -> Result<ObjRef, MarshalError> {
    let class = ctx.heap.class_of(reference).ok_or_else(|| {
        MarshalError::TypeMismatch(CastError::NotAHeapReference {
            expected: ctx.classes.describe(expected),
        })
    })?;
    ctx.classes.check_cast(class, expected)?;
    Ok(reference)
}
