//! Bytecode system - instruction set, decoder, and method records.
//!
//! This component defines the stack-machine instruction encoding consumed by
//! the method compiler:
//! - The opcode set and the special/constant sub-encodings
//! - The two-tier instruction decoder (4-bit opcode, 4-bit operand, with an
//!   escape form for operands beyond 15)
//! - The immutable `Method` record and the registry through which method
//!   lookup walks the class chain

#![warn(missing_docs)]
#![warn(clippy::all)]

mod instruction;
mod method;
mod opcode;

pub use instruction::{encode, DecodeError, Decoder, Instruction};
pub use method::{Method, MethodId, MethodRegistry};
pub use opcode::{Constant, Opcode, Special};
