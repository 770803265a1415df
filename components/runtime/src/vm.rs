//! The VM facade.

use crate::context::{
    CONTEXT_ARGUMENTS, CONTEXT_FIELDS, CONTEXT_LITERALS, CONTEXT_METHOD, CONTEXT_TEMPORARIES,
};
use crate::error::VmError;
use bytecode_system::{Method, MethodId, MethodRegistry};
use memory_manager::{FrameRoots, Heap, HeapConfig, RootIndex};
use native_dispatch::{DispatchTable, MarshalError, NativeCtx, NativeMethod};
use object_model::{ClassId, ClassTable, ObjRef, Symbol, SymbolTable};
use std::cell::Cell;

/// The classes registered at bootstrap.
#[derive(Debug, Clone, Copy)]
pub struct CoreClasses {
    /// The root of the class hierarchy.
    pub object: ClassId,
    /// Class of the nil singleton.
    pub undefined_object: ClassId,
    /// Class of the true singleton.
    pub true_class: ClassId,
    /// Class of the false singleton.
    pub false_class: ClassId,
    /// Class reported for tagged small integers.
    pub small_integer: ClassId,
    /// Class of argument/literal/temporary arrays.
    pub array: ClassId,
    /// Class of method objects.
    pub method: ClassId,
    /// Class of activation contexts.
    pub context: ClassId,
    /// Class of block closures.
    pub block: ClassId,
}

/// The assembled execution core.
///
/// Owns the heap, the symbol and class registries, the method registry, and
/// the native dispatch table. Everything that allocates goes through here or
/// through a [`NativeCtx`] derived from here.
pub struct Vm {
    /// The semispace heap.
    pub heap: Heap,
    /// The symbol interning pool.
    pub symbols: SymbolTable,
    /// The class registry.
    pub classes: ClassTable,
    /// The bytecode method registry.
    pub methods: MethodRegistry,
    /// The native dispatch table.
    pub natives: DispatchTable,
    /// The bootstrap classes.
    pub core: CoreClasses,
    nil_root: RootIndex,
    true_root: RootIndex,
    false_root: RootIndex,
}

impl Vm {
    /// Bootstraps a VM: registers the core classes and allocates the
    /// nil/true/false singletons as permanent roots.
    pub fn new(config: HeapConfig) -> Result<Self, VmError> {
        let mut symbols = SymbolTable::new();
        let mut classes = ClassTable::new();
        let object = classes.register(symbols.intern("Object"), None);
        let undefined_object = classes.register(symbols.intern("UndefinedObject"), Some(object));
        let true_class = classes.register(symbols.intern("True"), Some(object));
        let false_class = classes.register(symbols.intern("False"), Some(object));
        let small_integer = classes.register(symbols.intern("SmallInteger"), Some(object));
        let array = classes.register(symbols.intern("Array"), Some(object));
        let method = classes.register(symbols.intern("Method"), Some(object));
        let context = classes.register(symbols.intern("Context"), Some(object));
        let block = classes.register(symbols.intern("Block"), Some(context));
        let core = CoreClasses {
            object,
            undefined_object,
            true_class,
            false_class,
            small_integer,
            array,
            method,
            context,
            block,
        };

        let mut heap = Heap::new(config);
        let nil = heap.allocate(undefined_object, 0)?;
        let nil_root = heap.add_root(nil);
        let truth = heap.allocate(true_class, 0)?;
        let true_root = heap.add_root(truth);
        let falsity = heap.allocate(false_class, 0)?;
        let false_root = heap.add_root(falsity);

        tracing::debug!(
            classes = classes.len(),
            capacity_words = heap.capacity_words(),
            "core bootstrapped"
        );

        Ok(Vm {
            heap,
            symbols,
            classes,
            methods: MethodRegistry::new(),
            natives: DispatchTable::new(),
            core,
            nil_root,
            true_root,
            false_root,
        })
    }

    /// The nil singleton.
    pub fn nil(&self) -> ObjRef {
        self.heap.root(self.nil_root)
    }

    /// The true singleton.
    pub fn truth(&self) -> ObjRef {
        self.heap.root(self.true_root)
    }

    /// The false singleton.
    pub fn falsity(&self) -> ObjRef {
        self.heap.root(self.false_root)
    }

    /// Maps a native boolean onto the singleton pair.
    pub fn boolean(&self, value: bool) -> ObjRef {
        if value {
            self.truth()
        } else {
            self.falsity()
        }
    }

    /// Root-table handle of the nil singleton, for [`NativeCtx`] hand-off.
    pub fn nil_root(&self) -> RootIndex {
        self.nil_root
    }

    /// Runs `body` with `slots` registered on the root chain.
    ///
    /// Any allocation inside `body` may trigger a collection cycle, after
    /// which the slots hold the rewritten references; `body` must re-read
    /// them rather than trust copies taken before an allocation. The frame
    /// is unlinked on every exit path.
    pub fn with_frame<R>(
        &mut self,
        slots: &[Cell<ObjRef>],
        body: impl FnOnce(&mut Vm) -> Result<R, VmError>,
    ) -> Result<R, VmError> {
        let mut frame = FrameRoots::new(slots);
        // SAFETY: the descriptor and the slot buffer outlive the body call
        // and the frame is popped below on all paths.
        unsafe { self.heap.push_frame(&mut frame) };
        let result = body(self);
        let popped = self.heap.pop_frame(&frame);
        match (result, popped) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err.into()),
        }
    }

    /// Allocates a plain object with empty fields.
    pub fn new_object(&mut self, class: ClassId, field_count: usize) -> Result<ObjRef, VmError> {
        Ok(self.heap.allocate(class, field_count)?)
    }

    /// Allocates an array holding `elements`.
    ///
    /// The elements are rooted for the duration, so the allocation may
    /// collect without invalidating them.
    pub fn new_array(&mut self, elements: &[ObjRef]) -> Result<ObjRef, VmError> {
        let slots: Vec<Cell<ObjRef>> = elements.iter().copied().map(Cell::new).collect();
        self.with_frame(&slots, |vm| {
            let array = vm.heap.allocate(vm.core.array, slots.len())?;
            for (i, cell) in slots.iter().enumerate() {
                vm.heap.set_field(array, i, cell.get())?;
            }
            Ok(array)
        })
    }

    /// The class of any reference: tagged integers report `SmallInteger`,
    /// the empty reference reports `UndefinedObject`.
    pub fn class_of_value(&self, reference: ObjRef) -> ClassId {
        if reference.is_small_int() {
            self.core.small_integer
        } else if reference.is_empty() {
            self.core.undefined_object
        } else {
            self.heap.class_of(reference).unwrap_or(self.core.object)
        }
    }

    /// Strict cast: verifies `reference` is usable as an instance of
    /// `expected`, returning it unchanged on success.
    pub fn checked_cast(&self, reference: ObjRef, expected: ClassId) -> Result<ObjRef, VmError> {
        self.classes
            .check_cast(self.class_of_value(reference), expected)?;
        Ok(reference)
    }

    /// Reads a field of a heap object.
    pub fn field(&self, object: ObjRef, index: usize) -> Result<ObjRef, VmError> {
        Ok(self.heap.field(object, index)?)
    }

    /// Writes a field of a heap object and records the store with the
    /// write barrier. This is the instance-variable assignment path.
    pub fn set_field(&mut self, object: ObjRef, index: usize, value: ObjRef) -> Result<(), VmError> {
        self.heap.set_field(object, index, value)?;
        self.heap.write_barrier(object);
        Ok(())
    }

    /// Registers a bytecode method on `class`.
    ///
    /// The literal array is allocated on the heap and pinned through the
    /// root table; `selectors` is the pool that send instructions index.
    #[allow(clippy::too_many_arguments)]
    pub fn install_method(
        &mut self,
        class: ClassId,
        selector: &str,
        bytecode: Vec<u8>,
        literals: &[ObjRef],
        selectors: &[&str],
        temporary_count: usize,
        argument_count: usize,
    ) -> Result<MethodId, VmError> {
        let literal_array = self.new_array(literals)?;
        let literals = self.heap.add_root(literal_array);
        let selector = self.symbols.intern(selector);
        let pool: Box<[Symbol]> = selectors.iter().map(|s| self.symbols.intern(s)).collect();
        Ok(self.methods.register(Method {
            class,
            selector,
            bytecode: bytecode.into_boxed_slice(),
            literals,
            selectors: pool,
            temporary_count,
            argument_count,
        }))
    }

    /// Builds an activation context for `method` over `args` (slot 0 is the
    /// receiver).
    ///
    /// Allocates the arguments array, a nil-filled temporaries array, and
    /// the context object itself, keeping every intermediate rooted across
    /// the later allocations.
    pub fn new_context(&mut self, method: MethodId, args: &[ObjRef]) -> Result<ObjRef, VmError> {
        let record = self
            .methods
            .get(method)
            .ok_or(VmError::UnknownMethod {
                id: method.to_raw(),
            })?;
        let argument_count = record.argument_count;
        let temporary_count = record.temporary_count;
        let literals_root = record.literals;
        if args.len() != argument_count {
            return Err(MarshalError::WrongArgumentCount {
                expected: argument_count,
                found: args.len(),
            }
            .into());
        }

        let count = args.len();
        let mut slots: Vec<Cell<ObjRef>> = args.iter().copied().map(Cell::new).collect();
        slots.push(Cell::new(ObjRef::EMPTY)); // arguments array
        slots.push(Cell::new(ObjRef::EMPTY)); // temporaries array
        self.with_frame(&slots, |vm| {
            let arguments = vm.heap.allocate(vm.core.array, count)?;
            for (i, cell) in slots[..count].iter().enumerate() {
                vm.heap.set_field(arguments, i, cell.get())?;
            }
            slots[count].set(arguments);

            let temporaries = vm.heap.allocate(vm.core.array, temporary_count)?;
            let nil = vm.nil();
            for i in 0..temporary_count {
                vm.heap.set_field(temporaries, i, nil)?;
            }
            slots[count + 1].set(temporaries);

            let context = vm.heap.allocate(vm.core.context, CONTEXT_FIELDS)?;
            vm.heap.set_field(
                context,
                CONTEXT_METHOD,
                ObjRef::small_int(method.to_raw() as isize),
            )?;
            vm.heap
                .set_field(context, CONTEXT_ARGUMENTS, slots[count].get())?;
            vm.heap
                .set_field(context, CONTEXT_TEMPORARIES, slots[count + 1].get())?;
            vm.heap
                .set_field(context, CONTEXT_LITERALS, vm.heap.root(literals_root))?;
            Ok(context)
        })
    }

    /// Installs a native method in the dispatch table.
    pub fn register_native(&mut self, method: NativeMethod) {
        self.natives.register(method);
    }

    /// The native half of the send entry point: consults the dispatch table
    /// and invokes the binding.
    ///
    /// Callers with a bytecode fallback (the method translator) try that on
    /// [`VmError::DoesNotUnderstand`].
    pub fn send(&mut self, selector: &Symbol, args: &[ObjRef]) -> Result<ObjRef, VmError> {
        if args.is_empty() {
            return Err(MarshalError::WrongArgumentCount {
                expected: 1,
                found: 0,
            }
            .into());
        }
        match self.natives.lookup(selector) {
            Some(method) => {
                let mut ctx = NativeCtx::new(&mut self.heap, &self.classes, self.nil_root);
                Ok(method.invoke(&mut ctx, args)?)
            }
            None => Err(self.does_not_understand(args[0], selector)),
        }
    }

    /// Builds the does-not-understand error for a receiver and selector.
    pub fn does_not_understand(&self, receiver: ObjRef, selector: &Symbol) -> VmError {
        VmError::DoesNotUnderstand {
            class: self.classes.describe(self.class_of_value(receiver)),
            selector: selector.to_string(),
        }
    }
}
