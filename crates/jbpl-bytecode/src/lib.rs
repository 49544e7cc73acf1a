//! Binary-side model of JVM class files: opcodes, descriptors and the
//! instruction nodes the assembler encodes into and decodes from.

pub mod access;
pub mod descriptor;
pub mod node;
pub mod opcode;

pub use descriptor::{MethodDescriptor, TypeDescriptor};
pub use node::{
    ClassNode, ClassVersion, Constant, FieldNode, Handle, HandleTag, InsnNode, InsnNodeKind,
    LabelId, MethodNode,
};
pub use opcode::{Opcode, OpcodeKind};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BytecodeError {
    #[error("unknown opcode '{0}'")]
    UnknownOpcode(String),
    #[error("invalid descriptor '{0}'")]
    InvalidDescriptor(String),
    #[error("{0} is not a valid class file version")]
    InvalidVersion(i64),
    #[error("opcode {opcode} is a {actual} instruction, expected {expected}")]
    OpcodeKindMismatch {
        opcode: Opcode,
        expected: OpcodeKind,
        actual: OpcodeKind,
    },
}

pub type Result<T> = std::result::Result<T, BytecodeError>;
