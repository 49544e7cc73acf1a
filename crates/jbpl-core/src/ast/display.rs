//! Source-like rendering of expressions and instructions, used in messages
//! and by string interpolation of instruction values.

use std::fmt::{Display, Formatter};

use itertools::Itertools;

use super::*;

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ExprKind::Literal(value) => write!(f, "{}", value),
            ExprKind::Binary(binary) => {
                write!(f, "{} {} {}", binary.lhs, binary.op.symbol(), binary.rhs)
            }
            ExprKind::Unary(unary) => match unary.op {
                UnaryOp::Plus => write!(f, "+{}", unary.operand),
                UnaryOp::Minus => write!(f, "-{}", unary.operand),
                UnaryOp::Inverse => write!(f, "~{}", unary.operand),
                UnaryOp::Not => write!(f, "!{}", unary.operand),
                UnaryOp::PreInc => write!(f, "++{}", unary.operand),
                UnaryOp::PreDec => write!(f, "--{}", unary.operand),
                UnaryOp::PostInc => write!(f, "{}++", unary.operand),
                UnaryOp::PostDec => write!(f, "{}--", unary.operand),
            },
            ExprKind::Reference(reference) => write!(f, "{}", reference.name),
            ExprKind::MacroCall(call) => write!(
                f,
                "{}({})",
                call.name,
                call.arguments.iter().join(", ")
            ),
            ExprKind::StringLerp(lerp) => {
                write!(f, "\"")?;
                for part in &lerp.parts {
                    match &part.kind {
                        ExprKind::Literal(crate::value::Value::String(text)) => write!(f, "{}", text)?,
                        _ => write!(f, "${{{}}}", part)?,
                    }
                }
                write!(f, "\"")
            }
            ExprKind::Array(array) => match &array.element_type {
                Some(ty) => write!(f, "{}{{{}}}", ty, array.values.iter().join(", ")),
                None => write!(f, "{{{}}}", array.values.iter().join(", ")),
            },
            ExprKind::ArrayAccess(access) => write!(f, "{}[{}]", access.reference, access.index),
            ExprKind::If(expr) => write!(f, "if({}) {{...}}", expr.condition),
            ExprKind::When(expr) => write!(f, "when({}) {{...}}", expr.value),
            ExprKind::As(expr) => write!(f, "{} as {}", expr.value, expr.ty),
            ExprKind::Is(expr) => write!(f, "{} is {}", expr.value, expr.ty),
            ExprKind::In(expr) => write!(f, "{} in {}", expr.value, expr.container),
            ExprKind::SizeOf(expr) => write!(f, "sizeof({})", expr),
            ExprKind::TypeOf(expr) => write!(f, "typeof({})", expr),
            ExprKind::OpcodeOf(expr) => write!(f, "opcodeof({})", expr),
            ExprKind::Default(expr) => write!(f, "default({})", expr),
            ExprKind::Range(range) => {
                let op = if range.inclusive { ".." } else { "..<" };
                write!(f, "{}{}{}", range.start, op, range.end)
            }
            ExprKind::FieldSignature(sig) => write!(f, "{}.{}: {}", sig.owner, sig.name, sig.ty),
            ExprKind::FunctionSignature(sig) => write!(
                f,
                "{}.{}({}): {}",
                sig.owner,
                sig.name,
                sig.params.iter().join(", "),
                sig.return_type
            ),
            ExprKind::PreproClass(expr) => write!(
                f,
                "{}{{{}}}",
                expr.name,
                expr.arguments.iter().join(", ")
            ),
            ExprKind::SelectorReference(name) => write!(f, "selector {}", name),
            ExprKind::Instruction(instruction) => write!(f, "{}", instruction),
        }
    }
}

impl Display for Argument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}: {}", name, self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            InstructionKind::Opless(opcode) => write!(f, "{}", opcode),
            InstructionKind::Int {
                opcode,
                operand: expr,
            }
            | InstructionKind::Stack { opcode, slot: expr }
            | InstructionKind::Jump {
                opcode,
                target: expr,
            }
            | InstructionKind::LoadConstant {
                opcode,
                value: expr,
            }
            | InstructionKind::Type { opcode, ty: expr }
            | InstructionKind::Field {
                opcode,
                signature: expr,
            }
            | InstructionKind::Invoke {
                opcode,
                signature: expr,
            } => write!(f, "{} {}", opcode, expr),
            InstructionKind::Iinc { slot, increment } => write!(f, "iinc {}, {}", slot, increment),
            InstructionKind::InvokeDynamic(indy) => {
                write!(
                    f,
                    "invokedynamic {}, {}, {}, {}",
                    indy.instantiated, indy.sam, indy.bootstrap, indy.target
                )?;
                for argument in &indy.arguments {
                    write!(f, ", {}", argument)?;
                }
                Ok(())
            }
            InstructionKind::Label(label) => write!(f, "{}:", label.name),
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            StatementKind::Return(ret) => match &ret.value {
                Some(value) => write!(f, "return {}", value),
                None => write!(f, "return"),
            },
            StatementKind::Local(local) => write!(f, "local {}", local.name),
            StatementKind::Define(define) => write!(f, "define {}: {} = {}", define.name, define.ty, define.value),
            StatementKind::Assert(assert) => write!(f, "assert {}", assert.condition),
            StatementKind::For(stmt) => write!(f, "for({} in {}) {{...}}", stmt.variable, stmt.value),
            StatementKind::Break => write!(f, "break"),
            StatementKind::Continue => write!(f, "continue"),
            StatementKind::Include(include) => write!(f, "include \"{}\"", include.path),
            StatementKind::Version(version) => write!(f, "version {}", version.version),
            StatementKind::TypeAlias(alias) => write!(f, "type {} = {}", alias.name, alias.ty),
            StatementKind::Yeet(yeet) => write!(f, "yeet {}", yeet.target),
            StatementKind::Compound(compound) => {
                write!(f, "{}", compound.statements.iter().join("; "))
            }
            StatementKind::Noop => write!(f, ";"),
            StatementKind::Instruction(instruction) => write!(f, "{}", instruction),
        }
    }
}
