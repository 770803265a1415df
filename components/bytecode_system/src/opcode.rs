//! Opcode numbering and the sub-encodings carried in operands.

/// Bytecode opcodes for the stack-machine encoding.
///
/// The numbering is part of the wire format: opcode 0 is reserved as the
/// escape marker of the two-tier encoding and never appears as a decoded
/// opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Load field `operand` of the receiver, push.
    PushInstance,
    /// Load slot `operand` of the arguments array, push.
    PushArgument,
    /// Load slot `operand` of the temporaries array, push.
    PushTemporary,
    /// Load slot `operand` of the literals array, push.
    PushLiteral,
    /// Push an inline constant; see [`Constant`].
    PushConstant,
    /// Pop a value, store into field `operand` of the receiver.
    AssignInstance,
    /// Pop a value, store into temporary slot `operand`.
    AssignTemporary,
    /// Pop `operand` values into a fresh argument array, push it.
    MarkArguments,
    /// Send the message named by selector-pool entry `operand` to a marked
    /// argument array.
    SendMessage,
    /// Send a unary builtin message.
    SendUnary,
    /// Send a binary builtin message.
    SendBinary,
    /// Compile a nested block; `operand` is its argument count.
    PushBlock,
    /// Invoke a primitive by number.
    DoPrimitive,
    /// Stack and control operations; see [`Special`].
    DoSpecial,
}

impl Opcode {
    /// Decodes a raw opcode number, `None` for unassigned numbers.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Opcode::PushInstance),
            2 => Some(Opcode::PushArgument),
            3 => Some(Opcode::PushTemporary),
            4 => Some(Opcode::PushLiteral),
            5 => Some(Opcode::PushConstant),
            6 => Some(Opcode::AssignInstance),
            7 => Some(Opcode::AssignTemporary),
            8 => Some(Opcode::MarkArguments),
            9 => Some(Opcode::SendMessage),
            10 => Some(Opcode::SendUnary),
            11 => Some(Opcode::SendBinary),
            12 => Some(Opcode::PushBlock),
            13 => Some(Opcode::DoPrimitive),
            15 => Some(Opcode::DoSpecial),
            _ => None,
        }
    }

    /// The raw opcode number of the wire format.
    pub fn to_raw(self) -> u8 {
        match self {
            Opcode::PushInstance => 1,
            Opcode::PushArgument => 2,
            Opcode::PushTemporary => 3,
            Opcode::PushLiteral => 4,
            Opcode::PushConstant => 5,
            Opcode::AssignInstance => 6,
            Opcode::AssignTemporary => 7,
            Opcode::MarkArguments => 8,
            Opcode::SendMessage => 9,
            Opcode::SendUnary => 10,
            Opcode::SendBinary => 11,
            Opcode::PushBlock => 12,
            Opcode::DoPrimitive => 13,
            Opcode::DoSpecial => 15,
        }
    }
}

/// The constant classes addressable by `PushConstant`.
///
/// Operands 0 through 9 push the corresponding exact tagged small integer;
/// 10, 11, and 12 push the nil/true/false singletons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    /// A tagged small integer 0..=9.
    SmallInt(u8),
    /// The nil singleton.
    Nil,
    /// The true singleton.
    True,
    /// The false singleton.
    False,
}

impl Constant {
    /// Decodes a `PushConstant` operand, `None` for unrecognized indices.
    pub fn from_operand(operand: u8) -> Option<Self> {
        match operand {
            0..=9 => Some(Constant::SmallInt(operand)),
            10 => Some(Constant::Nil),
            11 => Some(Constant::True),
            12 => Some(Constant::False),
            _ => None,
        }
    }
}

/// The sub-operations of `DoSpecial`, carried in its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    /// Return the receiver.
    SelfReturn,
    /// Return the top of stack.
    StackReturn,
    /// Return the top of stack from the block's home method.
    BlockReturn,
    /// Duplicate the top of stack.
    Duplicate,
    /// Discard the top of stack.
    PopTop,
    /// Unconditional branch.
    Branch,
    /// Branch when the top of stack is true.
    BranchIfTrue,
    /// Branch when the top of stack is false.
    BranchIfFalse,
    /// Send to the superclass implementation.
    SendToSuper,
}

impl Special {
    /// Decodes a `DoSpecial` operand, `None` for unassigned numbers.
    pub fn from_operand(operand: u8) -> Option<Self> {
        match operand {
            1 => Some(Special::SelfReturn),
            2 => Some(Special::StackReturn),
            3 => Some(Special::BlockReturn),
            4 => Some(Special::Duplicate),
            5 => Some(Special::PopTop),
            6 => Some(Special::Branch),
            7 => Some(Special::BranchIfTrue),
            8 => Some(Special::BranchIfFalse),
            11 => Some(Special::SendToSuper),
            _ => None,
        }
    }
}
