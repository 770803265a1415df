//! Bytecode translation: decode-dispatch over the instruction stream.

use crate::compiled_code::{
    CompiledBlock, CompiledMethod, Op, Reg, FIXED_REGS, REG_ARGUMENTS, REG_LITERALS, REG_SELF,
    REG_TEMPORARIES,
};
use crate::error::CompileError;
use bytecode_system::{Constant, Decoder, Method, Opcode, Special};

/// Translates one method's bytecode into a register program.
///
/// The compiler runs a compile-time operand stack of register handles that
/// models the bytecode's stack discipline; nothing of it survives into the
/// compiled form. Nested blocks compile recursively into the same method's
/// block list.
pub struct MethodCompiler<'a> {
    method: &'a Method,
    blocks: Vec<CompiledBlock>,
}

struct StreamBody {
    ops: Vec<Op>,
    register_count: usize,
}

impl<'a> MethodCompiler<'a> {
    /// Compiles `method`, returning the register program or a structured
    /// diagnostic. Malformed bytecode never aborts the process.
    pub fn compile(method: &'a Method) -> Result<CompiledMethod, CompileError> {
        let mut compiler = MethodCompiler {
            method,
            blocks: Vec::new(),
        };
        let body = compiler.compile_stream(&method.bytecode)?;
        Ok(CompiledMethod {
            ops: body.ops,
            register_count: body.register_count,
            blocks: compiler.blocks,
        })
    }

    fn compile_stream(&mut self, bytes: &[u8]) -> Result<StreamBody, CompileError> {
        let mut decoder = Decoder::new(bytes);
        let mut ops: Vec<Op> = Vec::new();
        let mut stack: Vec<Reg> = Vec::new();
        let mut next_reg: Reg = FIXED_REGS;
        let mut returned = false;

        while let Some(instruction) = decoder.next_instruction()? {
            let offset = instruction.offset;
            let operand = instruction.operand;
            match instruction.opcode {
                Opcode::PushInstance => {
                    let dst = next_reg;
                    next_reg += 1;
                    ops.push(Op::LoadField {
                        object: REG_SELF,
                        index: operand as usize,
                        dst,
                    });
                    stack.push(dst);
                }
                Opcode::PushArgument => {
                    let dst = next_reg;
                    next_reg += 1;
                    ops.push(Op::LoadField {
                        object: REG_ARGUMENTS,
                        index: operand as usize,
                        dst,
                    });
                    stack.push(dst);
                }
                Opcode::PushTemporary => {
                    let dst = next_reg;
                    next_reg += 1;
                    ops.push(Op::LoadField {
                        object: REG_TEMPORARIES,
                        index: operand as usize,
                        dst,
                    });
                    stack.push(dst);
                }
                Opcode::PushLiteral => {
                    let dst = next_reg;
                    next_reg += 1;
                    ops.push(Op::LoadField {
                        object: REG_LITERALS,
                        index: operand as usize,
                        dst,
                    });
                    stack.push(dst);
                }
                Opcode::PushConstant => {
                    let dst = next_reg;
                    next_reg += 1;
                    match Constant::from_operand(operand) {
                        Some(Constant::SmallInt(value)) => ops.push(Op::LoadSmallInt {
                            value: value as isize,
                            dst,
                        }),
                        Some(Constant::Nil) => ops.push(Op::LoadNil { dst }),
                        Some(Constant::True) => ops.push(Op::LoadTrue { dst }),
                        Some(Constant::False) => ops.push(Op::LoadFalse { dst }),
                        None => return Err(CompileError::UnknownConstant { operand, offset }),
                    }
                    stack.push(dst);
                }
                Opcode::AssignInstance => {
                    let src = stack.pop().ok_or(CompileError::StackUnderflow { offset })?;
                    // Instance-variable stores must reach the write barrier.
                    ops.push(Op::StoreField {
                        object: REG_SELF,
                        index: operand as usize,
                        src,
                        barrier: true,
                    });
                }
                Opcode::AssignTemporary => {
                    let src = stack.pop().ok_or(CompileError::StackUnderflow { offset })?;
                    ops.push(Op::StoreField {
                        object: REG_TEMPORARIES,
                        index: operand as usize,
                        src,
                        barrier: false,
                    });
                }
                Opcode::MarkArguments => {
                    let count = operand as usize;
                    if stack.len() < count {
                        return Err(CompileError::StackUnderflow { offset });
                    }
                    // The last `count` pushes become the array, first-pushed
                    // first, so the receiver ends up in slot 0.
                    let srcs = stack.split_off(stack.len() - count);
                    let dst = next_reg;
                    next_reg += 1;
                    ops.push(Op::MakeArray { srcs, dst });
                    stack.push(dst);
                }
                Opcode::SendMessage => {
                    let selector = self
                        .method
                        .selectors
                        .get(operand as usize)
                        .cloned()
                        .ok_or(CompileError::UnknownSelector {
                            index: operand,
                            offset,
                        })?;
                    let args = stack.pop().ok_or(CompileError::StackUnderflow { offset })?;
                    let dst = next_reg;
                    next_reg += 1;
                    ops.push(Op::Send {
                        selector,
                        args,
                        dst,
                    });
                    stack.push(dst);
                }
                Opcode::PushBlock => {
                    let argument_count = operand as usize;
                    let temp_offset = decoder.read_byte()? as usize;
                    let length = decoder.read_byte()? as usize;
                    let body = decoder.read_bytes(length)?;
                    let compiled = self.compile_stream(body)?;
                    let block = self.blocks.len();
                    self.blocks.push(CompiledBlock {
                        argument_count,
                        temp_offset,
                        ops: compiled.ops,
                        register_count: compiled.register_count,
                    });
                    let dst = next_reg;
                    next_reg += 1;
                    ops.push(Op::MakeBlock { block, dst });
                    stack.push(dst);
                }
                Opcode::SendUnary | Opcode::SendBinary | Opcode::DoPrimitive => {
                    return Err(CompileError::UnsupportedOpcode {
                        opcode: instruction.opcode.to_raw(),
                        operand,
                        offset,
                    });
                }
                Opcode::DoSpecial => match Special::from_operand(operand) {
                    Some(Special::SelfReturn) => {
                        ops.push(Op::Return { src: REG_SELF });
                        returned = true;
                    }
                    Some(Special::StackReturn) => {
                        let src = stack.pop().ok_or(CompileError::StackUnderflow { offset })?;
                        ops.push(Op::Return { src });
                        returned = true;
                    }
                    Some(Special::Duplicate) => {
                        let top = *stack.last().ok_or(CompileError::StackUnderflow { offset })?;
                        stack.push(top);
                    }
                    Some(Special::PopTop) => {
                        stack.pop().ok_or(CompileError::StackUnderflow { offset })?;
                    }
                    _ => {
                        return Err(CompileError::UnsupportedOpcode {
                            opcode: Opcode::DoSpecial.to_raw(),
                            operand,
                            offset,
                        });
                    }
                },
            }
        }

        if !returned {
            return Err(CompileError::MissingReturn);
        }
        Ok(StreamBody {
            ops,
            register_count: next_reg,
        })
    }
}
