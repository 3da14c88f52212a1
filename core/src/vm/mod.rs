mod code;
mod error;
mod instruction_set;
mod runtime;
mod stack;

pub use code::{Bytecode, BytecodeError, DecodedInstruction, Decoder, Instructions};
pub use error::RuntimeError;
pub use instruction_set::{
    DEFINITIONS, Definition, EncodeError, Instruction, InvalidOpcode, Opcode, Operands, lookup,
    make, read_operands, read_u16,
};
pub use runtime::Vm;

pub(crate) use stack::Stack;

#[cfg(test)]
mod runtime_test;
