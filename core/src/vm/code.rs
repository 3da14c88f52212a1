use core::{fmt, ops::Deref};

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::instruction_set::{Instruction, Opcode, Operands, read_operands};
use crate::{String, Vec, format, values::Value};

/// Flat instruction stream. Offsets into it are jump addresses.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instructions(Vec<u8>);

impl Instructions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an encoded instruction and returns its offset.
    pub fn push_instruction(&mut self, instruction: &[u8]) -> usize {
        let offset = self.0.len();
        self.0.extend_from_slice(instruction);
        offset
    }

    /// Overwrites the bytes starting at `offset` in place.
    ///
    /// The replacement must lie within the stream; nothing after it moves.
    pub fn overwrite(&mut self, offset: usize, bytes: &[u8]) {
        self.0[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Drops everything from `len` onwards.
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Walks the stream instruction by instruction.
    pub fn decode(&self) -> Decoder<'_> {
        Decoder {
            bytes: &self.0,
            offset: 0,
        }
    }
}

impl Deref for Instructions {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Instructions {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl FromIterator<Instruction> for Instructions {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        let mut instructions = Instructions::new();
        for instruction in iter {
            instructions.push_instruction(&instruction);
        }
        instructions
    }
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub offset: usize,
    pub op: Opcode,
    pub operands: Operands,
}

impl DecodedInstruction {
    pub fn len(&self) -> usize {
        self.op.instruction_len()
    }

    /// Absolute target, for jump instructions.
    pub fn jump_target(&self) -> Option<usize> {
        if self.op.is_jump() {
            self.operands.first().copied()
        } else {
            None
        }
    }
}

/// Iterator returned by [`Instructions::decode`]. Stops after the first error.
pub struct Decoder<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl Iterator for Decoder<'_> {
    type Item = Result<DecodedInstruction, BytecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.offset;
        let &byte = self.bytes.get(offset)?;

        let decoded = Opcode::try_from(byte)
            .map_err(|_| BytecodeError::InvalidOpcode { byte, offset })
            .and_then(|op| {
                let (operands, read) = read_operands(op.definition(), &self.bytes[offset + 1..])
                    .ok_or(BytecodeError::Truncated { op, offset })?;
                Ok((op, operands, read))
            });

        match decoded {
            Ok((op, operands, read)) => {
                self.offset = offset + 1 + read;
                Some(Ok(DecodedInstruction {
                    offset,
                    op,
                    operands,
                }))
            }
            Err(err) => {
                self.offset = self.bytes.len();
                Some(Err(err))
            }
        }
    }
}

/// Disassembly listing.
///
/// Jump targets get a label, and every jump names the label it lands on:
///
/// ```text
/// 0000      OpTrue
/// 0001      OpJumpNotTruthy 10 (to L0)
/// 0004      OpConstant 0
/// 0007      OpJump 11 (to L1)
/// 0010  L0: OpNull
/// 0011  L1: OpPop
/// ```
impl fmt::Display for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First pass: collect all jump targets to determine which addresses need labels
        let mut jump_targets: Vec<usize> = self
            .decode()
            .filter_map(|decoded| decoded.ok()?.jump_target())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        jump_targets.sort_unstable();
        let labels: HashMap<usize, usize> = jump_targets
            .into_iter()
            .enumerate()
            .map(|(label, addr)| (addr, label))
            .collect();

        // Second pass: print instructions with labels
        for decoded in self.decode() {
            let decoded = match decoded {
                Ok(decoded) => decoded,
                Err(err) => {
                    writeln!(f, "ERROR: {}", err)?;
                    break;
                }
            };

            let label = labels
                .get(&decoded.offset)
                .map(|label| format!("L{}:", label))
                .unwrap_or_default();
            write!(f, "{:04} {:>4} {}", decoded.offset, label, decoded.op)?;
            for operand in &decoded.operands {
                write!(f, " {}", operand)?;
            }
            if let Some(target) = decoded.jump_target() {
                match labels.get(&target) {
                    Some(label) => write!(f, " (to L{})", label)?,
                    None => write!(f, " (to @{})", target)?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Instructions {{")?;
        for line in format!("{}", self).lines() {
            writeln!(f, "  {}", line)?;
        }
        write!(f, "}}")
    }
}

/// Output of the compiler: the instruction stream and its constant pool.
///
/// Every constant index in the stream is in range for the pool, and every
/// jump lands on an instruction boundary (or exactly at the end).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bytecode {
    instructions: Instructions,
    constants: Vec<Value>,
}

static_assertions::assert_impl_all!(Bytecode: Send, Sync);

impl Bytecode {
    /// Pairs an instruction stream with its pool without checking them.
    ///
    /// Use [`Bytecode::validate`] for streams that did not come from the
    /// compiler.
    pub fn new(instructions: Instructions, constants: Vec<Value>) -> Self {
        Self {
            instructions,
            constants,
        }
    }

    pub fn instructions(&self) -> &Instructions {
        &self.instructions
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    /// Checks that every instruction decodes, every constant index is in
    /// range and every jump target is an instruction boundary.
    pub fn validate(&self) -> Result<(), BytecodeError> {
        let mut boundaries = HashSet::new();
        let mut jumps = Vec::new();

        for decoded in self.instructions.decode() {
            let decoded = decoded?;
            boundaries.insert(decoded.offset);
            match decoded.op {
                Opcode::Constant => {
                    let index = decoded.operands[0];
                    if index >= self.constants.len() {
                        return Err(BytecodeError::ConstantOutOfRange {
                            offset: decoded.offset,
                            index,
                            len: self.constants.len(),
                        });
                    }
                }
                Opcode::Jump | Opcode::JumpNotTruthy => {
                    jumps.push((decoded.offset, decoded.operands[0]));
                }
                _ => {}
            }
        }
        boundaries.insert(self.instructions.len());

        for (offset, target) in jumps {
            if !boundaries.contains(&target) {
                return Err(BytecodeError::InvalidJumpTarget { offset, target });
            }
        }
        Ok(())
    }

    /// Serializes the bytecode with postcard.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BytecodeError> {
        postcard::to_allocvec(self).map_err(|err| BytecodeError::Serialization(format!("{}", err)))
    }

    /// Deserializes and validates bytecode written by [`Bytecode::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BytecodeError> {
        let bytecode: Bytecode = postcard::from_bytes(bytes)
            .map_err(|err| BytecodeError::Serialization(format!("{}", err)))?;
        bytecode.validate()?;
        Ok(bytecode)
    }
}

/// Malformed instruction stream or serialized bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BytecodeError {
    #[error("invalid opcode 0x{byte:02X} at offset {offset}")]
    InvalidOpcode { byte: u8, offset: usize },

    #[error("truncated {op} instruction at offset {offset}")]
    Truncated { op: Opcode, offset: usize },

    #[error("constant index {index} at offset {offset} out of range (pool has {len} entries)")]
    ConstantOutOfRange {
        offset: usize,
        index: usize,
        len: usize,
    },

    #[error("jump at offset {offset} targets {target}, which is not an instruction boundary")]
    InvalidJumpTarget { offset: usize, target: usize },

    #[error("malformed bytecode: {0}")]
    Serialization(String),
}
