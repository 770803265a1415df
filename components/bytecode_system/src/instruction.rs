//! Two-tier instruction decoding.
//!
//! Each instruction byte splits into a 4-bit opcode (high nibble) and a
//! 4-bit operand (low nibble). Opcode 0 is the escape form: the true opcode
//! is the low nibble and the operand is the following byte, which lets
//! common opcode/operand pairs fit one byte while allowing operands up to
//! 255.

use crate::opcode::Opcode;
use thiserror::Error;

/// Errors raised while decoding an instruction stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// An opcode number outside the assigned instruction set.
    #[error("unknown opcode {code} at offset {offset}")]
    UnknownOpcode {
        /// The raw opcode number.
        code: u8,
        /// Byte offset of the instruction.
        offset: usize,
    },

    /// The stream ended inside an instruction.
    #[error("bytecode stream truncated at offset {offset}")]
    Truncated {
        /// Byte offset at which more input was required.
        offset: usize,
    },
}

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// The decoded opcode.
    pub opcode: Opcode,
    /// The operand, widened from either encoding form.
    pub operand: u8,
    /// Byte offset of the instruction's first byte.
    pub offset: usize,
}

/// A cursor over a method's bytecode.
///
/// Besides whole instructions, the cursor exposes raw byte reads for the
/// inline payloads some instructions carry after their operand (nested
/// block bodies).
pub struct Decoder<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder at the start of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Decoder { bytes, position: 0 }
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns true when the stream is exhausted.
    pub fn is_at_end(&self) -> bool {
        self.position >= self.bytes.len()
    }

    /// Reads one raw byte.
    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .bytes
            .get(self.position)
            .ok_or(DecodeError::Truncated {
                offset: self.position,
            })?;
        self.position += 1;
        Ok(byte)
    }

    /// Reads `len` raw bytes as a slice.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.position + len;
        let slice = self
            .bytes
            .get(self.position..end)
            .ok_or(DecodeError::Truncated {
                offset: self.position,
            })?;
        self.position = end;
        Ok(slice)
    }

    /// Decodes the next instruction, or `None` at end of stream.
    pub fn next_instruction(&mut self) -> Result<Option<Instruction>, DecodeError> {
        if self.is_at_end() {
            return Ok(None);
        }
        let offset = self.position;
        let byte = self.read_byte()?;
        let (code, operand) = if byte >> 4 == 0 {
            // Escape form: true opcode in the low nibble, operand follows.
            (byte & 0x0f, self.read_byte()?)
        } else {
            (byte >> 4, byte & 0x0f)
        };
        let opcode = Opcode::from_raw(code).ok_or(DecodeError::UnknownOpcode { code, offset })?;
        Ok(Some(Instruction {
            opcode,
            operand,
            offset,
        }))
    }
}

/// Encodes one instruction, choosing the short form when the operand fits a
/// nibble. Used by tests and by loaders assembling method bytecode.
pub fn encode(opcode: Opcode, operand: u8, out: &mut Vec<u8>) {
    if operand <= 0x0f {
        out.push((opcode.to_raw() << 4) | operand);
    } else {
        out.push(opcode.to_raw());
        out.push(operand);
    }
}
