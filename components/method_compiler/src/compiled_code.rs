//! The compiled form: register programs over a rooted frame register file.

use object_model::Symbol;

/// A frame register index.
pub type Reg = usize;

/// Register holding the activation context.
pub const REG_CONTEXT: Reg = 0;
/// Register holding the arguments array.
pub const REG_ARGUMENTS: Reg = 1;
/// Register holding the temporaries array.
pub const REG_TEMPORARIES: Reg = 2;
/// Register holding the literals array.
pub const REG_LITERALS: Reg = 3;
/// Register holding the receiver (arguments slot zero).
pub const REG_SELF: Reg = 4;
/// Registers loaded by the frame preamble; value registers start here.
pub const FIXED_REGS: usize = 5;

/// One instruction of the compiled form.
///
/// Registers are written once by the instruction that produces their value;
/// the executor's register file is the frame's root-chain slot buffer, so
/// any instruction that allocates may move the objects behind every
/// register, and the executor re-reads registers after each step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// `dst = object_register[index]` for a heap object's field.
    LoadField {
        /// Register holding the object.
        object: Reg,
        /// Field index.
        index: usize,
        /// Destination register.
        dst: Reg,
    },
    /// `dst = tagged(value)`.
    LoadSmallInt {
        /// The untagged integer value.
        value: isize,
        /// Destination register.
        dst: Reg,
    },
    /// `dst = nil`.
    LoadNil {
        /// Destination register.
        dst: Reg,
    },
    /// `dst = true`.
    LoadTrue {
        /// Destination register.
        dst: Reg,
    },
    /// `dst = false`.
    LoadFalse {
        /// Destination register.
        dst: Reg,
    },
    /// `object_register[index] = src`; `barrier` marks instance-variable
    /// stores the collector must hear about.
    StoreField {
        /// Register holding the object.
        object: Reg,
        /// Field index.
        index: usize,
        /// Source register.
        src: Reg,
        /// Whether to record the store with the write barrier.
        barrier: bool,
    },
    /// Allocate an array of the source registers' values, in order.
    MakeArray {
        /// Source registers, element order.
        srcs: Vec<Reg>,
        /// Destination register.
        dst: Reg,
    },
    /// Allocate a block closure over the current context.
    MakeBlock {
        /// Index into the compiled method's block list.
        block: usize,
        /// Destination register.
        dst: Reg,
    },
    /// Send `selector` to the argument array in `args` (slot 0 is the
    /// receiver); the result lands in `dst`.
    Send {
        /// The resolved selector.
        selector: Symbol,
        /// Register holding the marked argument array.
        args: Reg,
        /// Destination register.
        dst: Reg,
    },
    /// Return the value in `src` as the method result.
    Return {
        /// Source register.
        src: Reg,
    },
}

/// A nested block, compiled alongside its home method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledBlock {
    /// Arguments the block takes when called.
    pub argument_count: usize,
    /// Home-temporaries slot the block's arguments bind from.
    pub temp_offset: usize,
    /// The block body's register program.
    pub ops: Vec<Op>,
    /// Size of the block's register file.
    pub register_count: usize,
}

/// A fully translated method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledMethod {
    /// The method body's register program.
    pub ops: Vec<Op>,
    /// Size of the frame register file, fixed registers included.
    pub register_count: usize,
    /// Blocks compiled from the method's push-block instructions.
    pub blocks: Vec<CompiledBlock>,
}
