use jbpl_bytecode::Opcode;

use super::Expr;
use crate::span::TokenRange;
use crate::{common_enum, common_struct};

common_struct! {
    /// A structured JVM instruction. Operands are expressions evaluated when
    /// the instruction is bound or encoded.
    pub struct Instruction {
        pub kind: InstructionKind,
        pub range: TokenRange,
    }
}

common_enum! {
    pub enum InstructionKind {
        /// Zero-operand instructions: `iadd`, `ireturn`, `dup`, ...
        Opless(Opcode),
        /// `newarray` with its primitive array tag.
        Int { opcode: Opcode, operand: Expr },
        /// Local variable access; the slot is an index or the name of a declared local.
        Stack { opcode: Opcode, slot: Expr },
        Iinc { slot: Expr, increment: Expr },
        /// Conditional or unconditional branch to a named label.
        Jump { opcode: Opcode, target: Expr },
        /// `ldc`, `bipush`, `sipush` and the `*const_*` family.
        LoadConstant { opcode: Opcode, value: Expr },
        /// `new`, `checkcast`, `instanceof` and `anewarray`.
        Type { opcode: Opcode, ty: Expr },
        Field { opcode: Opcode, signature: Expr },
        Invoke { opcode: Opcode, signature: Expr },
        InvokeDynamic(InvokeDynamicInstruction),
        Label(LabelStatement),
    }
}

common_struct! {
    pub struct InvokeDynamicInstruction {
        /// Function signature whose owner is the produced interface type.
        pub instantiated: Expr,
        /// Erased signature of the functional interface method.
        pub sam: Expr,
        /// An invoke instruction naming the bootstrap method.
        pub bootstrap: Box<Expr>,
        /// An invoke instruction naming the implementation method.
        pub target: Box<Expr>,
        pub arguments: Vec<Expr>,
    }
}

common_struct! {
    pub struct LabelStatement {
        pub name: String,
    }
}

impl Instruction {
    pub fn new(kind: InstructionKind, range: TokenRange) -> Self {
        Self { kind, range }
    }

    pub fn synthetic(kind: InstructionKind) -> Self {
        Self::new(kind, TokenRange::Synthetic)
    }

    pub fn opless(opcode: Opcode) -> Self {
        Self::synthetic(InstructionKind::Opless(opcode))
    }

    pub fn label(name: impl Into<String>) -> Self {
        Self::synthetic(InstructionKind::Label(LabelStatement { name: name.into() }))
    }

    pub fn with_range(mut self, range: TokenRange) -> Self {
        self.range = range;
        self
    }

    /// The encoded opcode; labels have none.
    pub fn opcode(&self) -> Option<Opcode> {
        match &self.kind {
            InstructionKind::Opless(opcode)
            | InstructionKind::Int { opcode, .. }
            | InstructionKind::Stack { opcode, .. }
            | InstructionKind::Jump { opcode, .. }
            | InstructionKind::LoadConstant { opcode, .. }
            | InstructionKind::Type { opcode, .. }
            | InstructionKind::Field { opcode, .. }
            | InstructionKind::Invoke { opcode, .. } => Some(*opcode),
            InstructionKind::Iinc { .. } => Some(Opcode::IINC),
            InstructionKind::InvokeDynamic(_) => Some(Opcode::INVOKEDYNAMIC),
            InstructionKind::Label(_) => None,
        }
    }

    /// Operand expressions in evaluation order.
    pub fn operands(&self) -> Vec<&Expr> {
        match &self.kind {
            InstructionKind::Opless(_) | InstructionKind::Label(_) => Vec::new(),
            InstructionKind::Int { operand: expr, .. }
            | InstructionKind::Stack { slot: expr, .. }
            | InstructionKind::Jump { target: expr, .. }
            | InstructionKind::LoadConstant { value: expr, .. }
            | InstructionKind::Type { ty: expr, .. }
            | InstructionKind::Field {
                signature: expr, ..
            }
            | InstructionKind::Invoke {
                signature: expr, ..
            } => vec![expr],
            InstructionKind::Iinc { slot, increment } => vec![slot, increment],
            InstructionKind::InvokeDynamic(indy) => {
                let mut operands = vec![&indy.instantiated, &indy.sam, &*indy.bootstrap, &*indy.target];
                operands.extend(indy.arguments.iter());
                operands
            }
        }
    }

    /// Mutable counterpart of [`Instruction::operands`], same order.
    pub fn operands_mut(&mut self) -> Vec<&mut Expr> {
        match &mut self.kind {
            InstructionKind::Opless(_) | InstructionKind::Label(_) => Vec::new(),
            InstructionKind::Int { operand: expr, .. }
            | InstructionKind::Stack { slot: expr, .. }
            | InstructionKind::Jump { target: expr, .. }
            | InstructionKind::LoadConstant { value: expr, .. }
            | InstructionKind::Type { ty: expr, .. }
            | InstructionKind::Field {
                signature: expr, ..
            }
            | InstructionKind::Invoke {
                signature: expr, ..
            } => vec![expr],
            InstructionKind::Iinc { slot, increment } => vec![slot, increment],
            InstructionKind::InvokeDynamic(indy) => {
                let mut operands = vec![
                    &mut indy.instantiated,
                    &mut indy.sam,
                    &mut *indy.bootstrap,
                    &mut *indy.target,
                ];
                operands.extend(indy.arguments.iter_mut());
                operands
            }
        }
    }
}
