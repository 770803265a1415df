//! Method compiler - bytecode to native translation.
//!
//! Translates a method's stack-machine bytecode into a register program
//! over a fixed frame register file. The register file doubles as the
//! frame's root-chain slot buffer, so every reference a compiled frame
//! holds is visible to the collector and rewritten in place when an
//! allocation inside the frame triggers a cycle.
//!
//! The bytecode's operand stack exists only at compile time: pushes and
//! pops thread register handles through code generation and never appear
//! as a runtime structure.
//!
//! Translation is lazy: the [`MethodTranslator`] compiles a method on its
//! first invocation and caches the result by method id.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod compiled_code;
mod compiler;
mod error;
mod translator;

pub use compiled_code::{
    CompiledBlock, CompiledMethod, Op, Reg, FIXED_REGS, REG_ARGUMENTS, REG_CONTEXT, REG_LITERALS,
    REG_SELF, REG_TEMPORARIES,
};
pub use compiler::MethodCompiler;
pub use error::{CompileError, ExecError};
pub use translator::{CompilerStats, MethodTranslator};
