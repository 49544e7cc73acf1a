//! Translation between structured instructions and binary instruction nodes.
//!
//! Encoding evaluates operand expressions through an [`EncodingContext`], so the
//! same code serves both live statements and instruction values whose operands
//! were bound earlier. Decoding goes through a [`DecoderRegistry`] with one
//! decoder per [`InsnNodeKind`].

mod constant;
mod decode;
mod indy;

pub use constant::*;
pub use decode::*;
pub use indy::*;

use jbpl_bytecode::{InsnNode, LabelId};
use jbpl_core::ast::{Expr, Instruction, InstructionKind};
use jbpl_core::error::{Error, Result};
use jbpl_core::trace;
use jbpl_core::types::{PreproType, Type};
use jbpl_core::value::{FieldSignature, FunctionSignature, Value};

/// What the encoder needs from its surroundings.
pub trait EncodingContext {
    fn operand(&mut self, expr: &Expr) -> Result<Value>;

    /// Label id for `name`, allocated on first use.
    fn label(&mut self, name: &str) -> LabelId;

    /// Slot of a declared local variable.
    fn local(&mut self, name: &str) -> Option<u16>;
}

pub fn encode(instruction: &Instruction, ctx: &mut dyn EncodingContext) -> Result<InsnNode> {
    let node = encode_kind(&instruction.kind, ctx).map_err(|error| error.at(instruction.range))?;
    node.validate()
        .map_err(|error| Error::from(error).at(instruction.range))?;
    trace!("encoded {} as {}", instruction, node);
    Ok(node)
}

fn encode_kind(kind: &InstructionKind, ctx: &mut dyn EncodingContext) -> Result<InsnNode> {
    Ok(match kind {
        InstructionKind::Opless(opcode) => InsnNode::Insn(*opcode),
        InstructionKind::Int { opcode, operand } => InsnNode::Int {
            opcode: *opcode,
            operand: int_operand(ctx, operand)?,
        },
        InstructionKind::Stack { opcode, slot } => InsnNode::Var {
            opcode: *opcode,
            slot: slot_operand(ctx, slot)?,
        },
        InstructionKind::Iinc { slot, increment } => {
            let slot = slot_operand(ctx, slot)?;
            let value = int_operand(ctx, increment)?;
            let increment = i16::try_from(value).map_err(|_| {
                Error::type_mismatch(
                    format!("Increment {} does not fit into iinc", value),
                    increment.range,
                )
            })?;
            InsnNode::Iinc { slot, increment }
        }
        InstructionKind::Jump { opcode, target } => InsnNode::Jump {
            opcode: *opcode,
            label: label_operand(ctx, target)?,
        },
        InstructionKind::LoadConstant { opcode, value } => {
            let constant = ctx.operand(value)?;
            encode_constant(*opcode, &constant).map_err(|error| error.at(value.range))?
        }
        InstructionKind::Type { opcode, ty } => InsnNode::Type {
            opcode: *opcode,
            descriptor: type_operand(ctx, ty)?
                .internal_name()
                .map_err(|error| error.at(ty.range))?,
        },
        InstructionKind::Field { opcode, signature } => {
            let signature = field_operand(ctx, signature)?;
            InsnNode::Field {
                opcode: *opcode,
                owner: signature.owner.internal_name()?,
                descriptor: signature.descriptor()?,
                name: signature.name,
            }
        }
        InstructionKind::Invoke { opcode, signature } => {
            let signature = function_operand(ctx, signature)?;
            InsnNode::Method {
                opcode: *opcode,
                owner: signature.owner.internal_name()?,
                descriptor: signature.descriptor()?.to_string(),
                name: signature.name,
                is_interface: *opcode == jbpl_bytecode::Opcode::INVOKEINTERFACE,
            }
        }
        InstructionKind::InvokeDynamic(indy) => encode_invoke_dynamic(indy, ctx)?,
        InstructionKind::Label(label) => InsnNode::Label(ctx.label(&label.name)),
    })
}

fn unexpected(expected: &str, value: &Value, range: jbpl_core::span::TokenRange) -> Error {
    Error::type_mismatch(
        format!("Expected {} operand but got {} of type {}", expected, value, value.ty()),
        range,
    )
}

pub(crate) fn int_operand(ctx: &mut dyn EncodingContext, expr: &Expr) -> Result<i32> {
    let value = ctx.operand(expr)?;
    value
        .as_i64()
        .and_then(|value| i32::try_from(value).ok())
        .ok_or_else(|| unexpected("an integer", &value, expr.range))
}

fn slot_operand(ctx: &mut dyn EncodingContext, expr: &Expr) -> Result<u16> {
    match ctx.operand(expr)? {
        Value::String(name) => ctx.local(&name).ok_or_else(|| {
            Error::unresolved(jbpl_core::error::SymbolKind::Local, name, expr.range)
        }),
        value => value
            .as_i64()
            .and_then(|slot| u16::try_from(slot).ok())
            .ok_or_else(|| unexpected("a local slot", &value, expr.range)),
    }
}

fn label_operand(ctx: &mut dyn EncodingContext, expr: &Expr) -> Result<LabelId> {
    match ctx.operand(expr)? {
        Value::String(name) => Ok(ctx.label(&name)),
        value => Err(unexpected("a label name", &value, expr.range)),
    }
}

pub(crate) fn type_operand(ctx: &mut dyn EncodingContext, expr: &Expr) -> Result<Type> {
    match ctx.operand(expr)? {
        Value::Type(ty) => Ok(ty),
        value => Err(unexpected(PreproType::Type.name(), &value, expr.range)),
    }
}

pub(crate) fn field_operand(ctx: &mut dyn EncodingContext, expr: &Expr) -> Result<FieldSignature> {
    match ctx.operand(expr)? {
        Value::FieldSignature(signature) => Ok(signature),
        value => Err(unexpected(PreproType::FieldSignature.name(), &value, expr.range)),
    }
}

pub(crate) fn function_operand(
    ctx: &mut dyn EncodingContext,
    expr: &Expr,
) -> Result<FunctionSignature> {
    match ctx.operand(expr)? {
        Value::FunctionSignature(signature) => Ok(signature),
        value => Err(unexpected(
            PreproType::FunctionSignature.name(),
            &value,
            expr.range,
        )),
    }
}

pub(crate) fn instruction_operand(
    ctx: &mut dyn EncodingContext,
    expr: &Expr,
) -> Result<Instruction> {
    match ctx.operand(expr)? {
        Value::Instruction(instruction) => Ok(*instruction),
        value => Err(unexpected(PreproType::Instruction.name(), &value, expr.range)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;

    /// Operands must already be literals; labels and locals come from plain maps.
    #[derive(Default)]
    pub struct LiteralContext {
        pub labels: HashMap<String, LabelId>,
        pub locals: HashMap<String, u16>,
    }

    impl EncodingContext for LiteralContext {
        fn operand(&mut self, expr: &Expr) -> Result<Value> {
            match &expr.kind {
                jbpl_core::ast::ExprKind::Literal(value) => Ok(value.clone()),
                jbpl_core::ast::ExprKind::Instruction(instruction) => {
                    Ok(Value::Instruction(instruction.clone()))
                }
                _ => Err(Error::evaluation("not a literal", expr.range)),
            }
        }

        fn label(&mut self, name: &str) -> LabelId {
            let next = LabelId(self.labels.len() as u32);
            *self.labels.entry(name.to_string()).or_insert(next)
        }

        fn local(&mut self, name: &str) -> Option<u16> {
            self.locals.get(name).copied()
        }
    }

    #[test]
    fn locals_are_resolved_by_name() {
        let mut ctx = LiteralContext::default();
        ctx.locals.insert("counter".into(), 3);
        let load = Instruction::synthetic(InstructionKind::Stack {
            opcode: jbpl_bytecode::Opcode::ILOAD,
            slot: Expr::literal("counter"),
        });
        assert_eq!(
            encode(&load, &mut ctx).unwrap(),
            InsnNode::Var {
                opcode: jbpl_bytecode::Opcode::ILOAD,
                slot: 3
            }
        );

        let missing = Instruction::synthetic(InstructionKind::Stack {
            opcode: jbpl_bytecode::Opcode::ILOAD,
            slot: Expr::literal("nope"),
        });
        assert!(encode(&missing, &mut ctx).is_err());
    }

    #[test]
    fn jumps_and_labels_share_ids() {
        let mut ctx = LiteralContext::default();
        let jump = Instruction::synthetic(InstructionKind::Jump {
            opcode: jbpl_bytecode::Opcode::GOTO,
            target: Expr::literal("end"),
        });
        let label = Instruction::label("end");
        let jump = encode(&jump, &mut ctx).unwrap();
        let label = encode(&label, &mut ctx).unwrap();
        assert_eq!(
            jump,
            InsnNode::Jump {
                opcode: jbpl_bytecode::Opcode::GOTO,
                label: LabelId(0)
            }
        );
        assert_eq!(label, InsnNode::Label(LabelId(0)));
    }

    #[test]
    fn opcode_shape_is_checked() {
        let mut ctx = LiteralContext::default();
        let wrong = Instruction::opless(jbpl_bytecode::Opcode::GOTO);
        assert!(encode(&wrong, &mut ctx).is_err());
    }
}
