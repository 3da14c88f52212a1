//! Monk VM Instructions - Variable-width Format
//!
//! This module defines the instruction set for Monk's stack-based virtual machine.
//!
//! # Instruction Format
//!
//! An instruction is an opcode byte followed by zero or one big-endian `u16`
//! operand:
//! ```text
//! ┌────────────┐      ┌────────────┬────────────────────┐
//! │   Opcode   │  or  │   Opcode   │   Operand (u16 BE) │
//! │  (8 bits)  │      │  (8 bits)  │      (16 bits)     │
//! └────────────┘      └────────────┴────────────────────┘
//! ```
//!
//! The operand layout of every opcode lives in a single static table
//! ([`DEFINITIONS`]); [`make`] and [`read_operands`] are the only places that
//! interpret it.
//!
//! # Addressing
//!
//! Jump operands are absolute byte offsets into the instruction stream. The
//! compiler emits forward jumps with a placeholder operand and overwrites it
//! in place once the target is known, so no instruction ever moves.
//!
//! # Stack Discipline
//!
//! Stack effect notation: `[..., operand1, operand2] -> [..., result]`

use core::fmt;

use smallvec::SmallVec;
use thiserror::Error;

/// Single-byte operation tag.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Push constant from pool
    /// Operand: u16 index | Stack: [...] -> [..., value]
    Constant = 0x00,

    /// Stack: [..., a: Int, b: Int] -> [..., a + b]
    Add = 0x01,
    /// Stack: [..., a: Int, b: Int] -> [..., a - b]
    Sub = 0x02,
    /// Stack: [..., a: Int, b: Int] -> [..., a * b]
    Mul = 0x03,
    /// Truncating division.
    /// Stack: [..., a: Int, b: Int] -> [..., a / b]
    Div = 0x04,

    /// Stack: [...] -> [..., true]
    True = 0x05,
    /// Stack: [...] -> [..., false]
    False = 0x06,
    /// Stack: [...] -> [..., null]
    Null = 0x07,

    /// Stack: [..., a, b] -> [..., a == b]
    Equal = 0x08,
    /// Stack: [..., a, b] -> [..., a != b]
    NotEqual = 0x09,
    /// There is no less-than; the compiler swaps the operands instead.
    /// Stack: [..., a: Int, b: Int] -> [..., a > b]
    GreaterThan = 0x0A,

    /// Stack: [..., a: Int] -> [..., -a]
    Minus = 0x0B,
    /// Stack: [..., a] -> [..., !a]
    Bang = 0x0C,

    /// Unconditional jump
    /// Operand: u16 absolute address | Stack: [...] -> [...]
    Jump = 0x0D,
    /// Pop and jump if the popped value is not truthy
    /// Operand: u16 absolute address | Stack: [..., cond] -> [...]
    JumpNotTruthy = 0x0E,

    /// Stack: [..., a] -> [...]
    Pop = 0x0F,
}

static_assertions::assert_eq_size!(Opcode, u8);

impl Opcode {
    /// Every opcode, in discriminant order.
    pub const ALL: [Opcode; 16] = [
        Opcode::Constant,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::True,
        Opcode::False,
        Opcode::Null,
        Opcode::Equal,
        Opcode::NotEqual,
        Opcode::GreaterThan,
        Opcode::Minus,
        Opcode::Bang,
        Opcode::Jump,
        Opcode::JumpNotTruthy,
        Opcode::Pop,
    ];

    #[inline]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn definition(self) -> &'static Definition {
        &DEFINITIONS[self as usize]
    }

    /// Encoded size of an instruction with this opcode.
    #[inline]
    pub fn instruction_len(self) -> usize {
        1 + self.definition().operand_widths.iter().sum::<usize>()
    }

    pub const fn is_jump(self) -> bool {
        matches!(self, Opcode::Jump | Opcode::JumpNotTruthy)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = InvalidOpcode;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Opcode::ALL
            .get(byte as usize)
            .copied()
            .ok_or(InvalidOpcode(byte))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.definition().name)
    }
}

/// Human-readable name and operand layout of an opcode.
#[derive(Debug, PartialEq, Eq)]
pub struct Definition {
    pub name: &'static str,
    /// Byte width of each operand, in order.
    pub operand_widths: &'static [usize],
}

impl Definition {
    const fn new(name: &'static str, operand_widths: &'static [usize]) -> Self {
        Self {
            name,
            operand_widths,
        }
    }
}

/// Operand layout table, indexed by opcode byte.
pub static DEFINITIONS: [Definition; 16] = [
    Definition::new("OpConstant", &[2]),
    Definition::new("OpAdd", &[]),
    Definition::new("OpSub", &[]),
    Definition::new("OpMul", &[]),
    Definition::new("OpDiv", &[]),
    Definition::new("OpTrue", &[]),
    Definition::new("OpFalse", &[]),
    Definition::new("OpNull", &[]),
    Definition::new("OpEqual", &[]),
    Definition::new("OpNotEqual", &[]),
    Definition::new("OpGreaterThan", &[]),
    Definition::new("OpMinus", &[]),
    Definition::new("OpBang", &[]),
    Definition::new("OpJump", &[2]),
    Definition::new("OpJumpNotTruthy", &[2]),
    Definition::new("OpPop", &[]),
];

/// Looks up the definition of a raw opcode byte.
pub fn lookup(byte: u8) -> Result<&'static Definition, InvalidOpcode> {
    DEFINITIONS.get(byte as usize).ok_or(InvalidOpcode(byte))
}

/// One encoded instruction. Never longer than three bytes.
pub type Instruction = SmallVec<[u8; 3]>;

/// Decoded operands of one instruction.
pub type Operands = SmallVec<[usize; 1]>;

/// Encodes `op` with its operands.
///
/// Fails if the number of operands does not match the opcode's definition or
/// an operand does not fit its width.
pub fn make(op: Opcode, operands: &[usize]) -> Result<Instruction, EncodeError> {
    let def = op.definition();
    if operands.len() != def.operand_widths.len() {
        return Err(EncodeError::OperandCount {
            op,
            expected: def.operand_widths.len(),
            got: operands.len(),
        });
    }

    let mut instruction = Instruction::new();
    instruction.push(op.as_byte());
    for (&operand, &width) in operands.iter().zip(def.operand_widths) {
        match width {
            2 => {
                let value = u16::try_from(operand).map_err(|_| EncodeError::OperandOverflow {
                    op,
                    value: operand,
                    width,
                })?;
                instruction.extend_from_slice(&value.to_be_bytes());
            }
            _ => unreachable!("unsupported operand width {width} in definition of {op}"),
        }
    }
    Ok(instruction)
}

/// Reads a big-endian `u16` from the first two bytes of `bytes`.
///
/// Callers guarantee at least two bytes are present.
#[inline]
pub fn read_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Decodes the operands that follow an opcode.
///
/// `bytes` starts right after the opcode byte. Returns the operands and the
/// number of bytes they occupied, or `None` if `bytes` is too short.
pub fn read_operands(def: &Definition, bytes: &[u8]) -> Option<(Operands, usize)> {
    let mut operands = Operands::new();
    let mut offset = 0;
    for &width in def.operand_widths {
        let operand = bytes.get(offset..offset + width)?;
        match width {
            2 => operands.push(read_u16(operand) as usize),
            _ => unreachable!("unsupported operand width {width} in definition of {}", def.name),
        }
        offset += width;
    }
    Some((operands, offset))
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid opcode: 0x{0:02X}")]
pub struct InvalidOpcode(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("{op} expects {expected} operand(s), got {got}")]
    OperandCount {
        op: Opcode,
        expected: usize,
        got: usize,
    },
    #[error("operand {value} of {op} does not fit in {width} byte(s)")]
    OperandOverflow {
        op: Opcode,
        value: usize,
        width: usize,
    },
}
