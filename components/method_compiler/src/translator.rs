//! Lazy translation, the frame executor, and the full send path.

use crate::compiled_code::{
    CompiledMethod, Op, REG_ARGUMENTS, REG_CONTEXT, REG_LITERALS, REG_SELF, REG_TEMPORARIES,
};
use crate::compiler::MethodCompiler;
use crate::error::{CompileError, ExecError};
use bytecode_system::MethodId;
use memory_manager::FrameRoots;
use native_dispatch::MarshalError;
use object_model::{ObjRef, Symbol};
use runtime::{
    Vm, VmError, BLOCK_FIELDS, BLOCK_HOME, BLOCK_ID, CONTEXT_ARGUMENTS, CONTEXT_LITERALS,
    CONTEXT_METHOD, CONTEXT_TEMPORARIES,
};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// Translation counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompilerStats {
    /// Methods translated (cache misses).
    pub methods_compiled: u64,
    /// Instructions emitted, block bodies included.
    pub ops_emitted: u64,
}

/// Translates methods on first invocation and executes their frames.
///
/// Each executing frame owns a register file of [`Cell`]-wrapped references
/// registered on the heap's root chain for the frame's whole lifetime, so a
/// collection cycle triggered by any allocation inside the frame rewrites
/// the registers in place.
#[derive(Default)]
pub struct MethodTranslator {
    cache: HashMap<MethodId, Rc<CompiledMethod>>,
    stats: CompilerStats,
}

impl MethodTranslator {
    /// Creates a translator with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Translation counters so far.
    pub fn stats(&self) -> &CompilerStats {
        &self.stats
    }

    /// Returns the compiled form of `method`, translating on first request.
    ///
    /// Method ids arrive out of context objects as tagged integers, so an
    /// id with no registry entry is a malformed activation record, not a
    /// panic.
    pub fn compiled(
        &mut self,
        vm: &Vm,
        method: MethodId,
    ) -> Result<Rc<CompiledMethod>, ExecError> {
        if let Some(hit) = self.cache.get(&method) {
            return Ok(hit.clone());
        }
        let record = vm
            .methods
            .get(method)
            .ok_or(ExecError::MalformedContext)?;
        let compiled = Rc::new(MethodCompiler::compile(record)?);
        self.stats.methods_compiled += 1;
        self.stats.ops_emitted += compiled.ops.len() as u64
            + compiled
                .blocks
                .iter()
                .map(|b| b.ops.len() as u64)
                .sum::<u64>();
        tracing::debug!(
            selector = %record.selector,
            ops = compiled.ops.len(),
            blocks = compiled.blocks.len(),
            "method translated"
        );
        self.cache.insert(method, compiled.clone());
        Ok(compiled)
    }

    /// Invokes a method activation: one context in, one result out.
    ///
    /// This is the compiled-method calling convention; the interpreter
    /// trampoline and compiled senders both enter here.
    pub fn invoke(&mut self, vm: &mut Vm, context: ObjRef) -> Result<ObjRef, ExecError> {
        let method = method_id_of(vm, context)?;
        let compiled = self.compiled(vm, method)?;
        let regs = frame_registers(vm, context, compiled.register_count)?;
        self.run_frame(vm, &compiled.ops, regs)
    }

    /// Calls a block closure with `args`, sharing its home context's
    /// temporaries.
    pub fn call_block(
        &mut self,
        vm: &mut Vm,
        block: ObjRef,
        args: &[ObjRef],
    ) -> Result<ObjRef, ExecError> {
        vm.checked_cast(block, vm.core.block)?;
        let home = vm.field(block, BLOCK_HOME)?;
        let index = vm
            .field(block, BLOCK_ID)?
            .as_small_int()
            .ok_or(ExecError::MalformedContext)? as usize;
        let method = method_id_of(vm, home)?;
        let compiled = self.compiled(vm, method)?;
        let plan = compiled
            .blocks
            .get(index)
            .ok_or(ExecError::MalformedContext)?;
        if args.len() != plan.argument_count {
            return Err(VmError::Marshal(MarshalError::WrongArgumentCount {
                expected: plan.argument_count,
                found: args.len(),
            })
            .into());
        }

        // Block arguments bind into the home temporaries, which is what
        // makes capture by reference work: the block and its home method
        // read and write the same slots.
        let temporaries = vm.field(home, CONTEXT_TEMPORARIES)?;
        for (i, arg) in args.iter().enumerate() {
            vm.set_field(temporaries, plan.temp_offset + i, *arg)?;
        }

        let regs = frame_registers(vm, home, plan.register_count)?;
        self.run_frame(vm, &plan.ops, regs)
    }

    /// The full send path: native dispatch table first, bytecode method
    /// lookup as the fallback, does-not-understand when both miss.
    pub fn send(
        &mut self,
        vm: &mut Vm,
        selector: &Symbol,
        args: &[ObjRef],
    ) -> Result<ObjRef, ExecError> {
        match vm.send(selector, args) {
            Ok(result) => Ok(result),
            Err(missing @ VmError::DoesNotUnderstand { .. }) => {
                let class = vm.class_of_value(args[0]);
                match vm.methods.lookup(&vm.classes, class, selector) {
                    Some(method) => {
                        let context = vm.new_context(method, args)?;
                        self.invoke(vm, context)
                    }
                    None => Err(missing.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Executes a register program with `regs` on the root chain.
    ///
    /// The frame descriptor is unlinked on every exit path, error returns
    /// included; the chain depth is the same before and after.
    fn run_frame(
        &mut self,
        vm: &mut Vm,
        ops: &[Op],
        regs: Vec<Cell<ObjRef>>,
    ) -> Result<ObjRef, ExecError> {
        let mut frame = FrameRoots::new(&regs);
        // SAFETY: the descriptor and register file outlive the execution
        // below and the frame is popped on all paths.
        unsafe { vm.heap.push_frame(&mut frame) };
        let result = self.run_ops(vm, ops, &regs);
        let popped = vm.heap.pop_frame(&frame);
        match (result, popped) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err.into()),
        }
    }

    fn run_ops(
        &mut self,
        vm: &mut Vm,
        ops: &[Op],
        regs: &[Cell<ObjRef>],
    ) -> Result<ObjRef, ExecError> {
        for op in ops {
            match op {
                Op::LoadField { object, index, dst } => {
                    let value = vm.field(regs[*object].get(), *index)?;
                    regs[*dst].set(value);
                }
                Op::LoadSmallInt { value, dst } => {
                    regs[*dst].set(ObjRef::small_int(*value));
                }
                Op::LoadNil { dst } => regs[*dst].set(vm.nil()),
                Op::LoadTrue { dst } => regs[*dst].set(vm.truth()),
                Op::LoadFalse { dst } => regs[*dst].set(vm.falsity()),
                Op::StoreField {
                    object,
                    index,
                    src,
                    barrier,
                } => {
                    let value = regs[*src].get();
                    let holder = regs[*object].get();
                    if *barrier {
                        vm.set_field(holder, *index, value)?;
                    } else {
                        vm.heap.set_field(holder, *index, value)?;
                    }
                }
                Op::MakeArray { srcs, dst } => {
                    // The allocation may collect; registers are re-read
                    // afterwards, when they already hold rewritten values.
                    let array = vm.heap.allocate(vm.core.array, srcs.len())?;
                    for (i, src) in srcs.iter().enumerate() {
                        vm.heap.set_field(array, i, regs[*src].get())?;
                    }
                    regs[*dst].set(array);
                }
                Op::MakeBlock { block, dst } => {
                    let closure = vm.heap.allocate(vm.core.block, BLOCK_FIELDS)?;
                    vm.heap
                        .set_field(closure, BLOCK_ID, ObjRef::small_int(*block as isize))?;
                    vm.heap
                        .set_field(closure, BLOCK_HOME, regs[REG_CONTEXT].get())?;
                    regs[*dst].set(closure);
                }
                Op::Send {
                    selector,
                    args,
                    dst,
                } => {
                    let result = self.send_array(vm, selector, regs[*args].get())?;
                    regs[*dst].set(result);
                }
                Op::Return { src } => return Ok(regs[*src].get()),
            }
        }
        // The compiler rejects streams without a return.
        Err(CompileError::MissingReturn.into())
    }

    /// Unpacks a marked argument array and issues the send.
    fn send_array(
        &mut self,
        vm: &mut Vm,
        selector: &Symbol,
        array: ObjRef,
    ) -> Result<ObjRef, ExecError> {
        let count = vm
            .heap
            .field_count(array)
            .ok_or(ExecError::MalformedContext)?;
        let mut argv = Vec::with_capacity(count);
        for i in 0..count {
            argv.push(vm.field(array, i)?);
        }
        self.send(vm, selector, &argv)
    }
}

/// Reads the activated method's id out of a context.
fn method_id_of(vm: &Vm, context: ObjRef) -> Result<MethodId, ExecError> {
    let raw = vm
        .field(context, CONTEXT_METHOD)?
        .as_small_int()
        .ok_or(ExecError::MalformedContext)?;
    Ok(MethodId::from_raw(raw as u32))
}

/// Builds a frame register file: the preamble loads of the compiled-code
/// ABI, everything else empty.
fn frame_registers(
    vm: &Vm,
    context: ObjRef,
    count: usize,
) -> Result<Vec<Cell<ObjRef>>, ExecError> {
    let regs: Vec<Cell<ObjRef>> = (0..count).map(|_| Cell::new(ObjRef::EMPTY)).collect();
    regs[REG_CONTEXT].set(context);
    let arguments = vm.field(context, CONTEXT_ARGUMENTS)?;
    regs[REG_ARGUMENTS].set(arguments);
    regs[REG_TEMPORARIES].set(vm.field(context, CONTEXT_TEMPORARIES)?);
    regs[REG_LITERALS].set(vm.field(context, CONTEXT_LITERALS)?);
    regs[REG_SELF].set(vm.field(arguments, 0)?);
    Ok(regs)
}
