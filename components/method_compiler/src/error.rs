//! Structured compile-time and execution errors.
//!
//! A malformed instruction stream is a compile-time diagnostic returned to
//! the caller; the VM stays alive and can report it as a language-level
//! error.

use bytecode_system::DecodeError;
use memory_manager::HeapError;
use runtime::VmError;
use thiserror::Error;

/// Compile-time diagnostics for a method's bytecode.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    /// An opcode number outside the instruction set.
    #[error("unknown opcode {code} at offset {offset}")]
    UnknownOpcode {
        /// The raw opcode number.
        code: u8,
        /// Byte offset of the instruction.
        offset: usize,
    },

    /// The stream ended inside an instruction or an inline payload.
    #[error("bytecode truncated at offset {offset}")]
    TruncatedBytecode {
        /// Byte offset at which more input was required.
        offset: usize,
    },

    /// A push-constant operand outside every recognized constant class.
    #[error("unrecognized constant index {operand} at offset {offset}")]
    UnknownConstant {
        /// The offending operand.
        operand: u8,
        /// Byte offset of the instruction.
        offset: usize,
    },

    /// A send instruction indexed past the method's selector pool.
    #[error("selector pool index {index} out of range at offset {offset}")]
    UnknownSelector {
        /// The offending pool index.
        index: u8,
        /// Byte offset of the instruction.
        offset: usize,
    },

    /// A recognized instruction this backend does not translate.
    #[error("unsupported instruction {opcode}/{operand} at offset {offset}")]
    UnsupportedOpcode {
        /// The raw opcode number.
        opcode: u8,
        /// The operand.
        operand: u8,
        /// Byte offset of the instruction.
        offset: usize,
    },

    /// An instruction popped more values than the stream had pushed.
    #[error("operand stack underflow at offset {offset}")]
    StackUnderflow {
        /// Byte offset of the instruction.
        offset: usize,
    },

    /// The stream ended without computing a method result.
    #[error("instruction stream exhausted without a return")]
    MissingReturn,
}

impl From<DecodeError> for CompileError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnknownOpcode { code, offset } => {
                CompileError::UnknownOpcode { code, offset }
            }
            DecodeError::Truncated { offset } => CompileError::TruncatedBytecode { offset },
        }
    }
}

/// Everything invoking a compiled method can fail with.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecError {
    /// The method's bytecode failed to translate.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A runtime operation failed underneath the compiled frame.
    #[error(transparent)]
    Vm(#[from] VmError),

    /// A context or block object did not have the expected field layout.
    #[error("malformed activation record")]
    MalformedContext,
}

impl From<HeapError> for ExecError {
    fn from(err: HeapError) -> Self {
        ExecError::Vm(VmError::Heap(err))
    }
}
