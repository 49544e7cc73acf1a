use std::collections::HashMap;

use itertools::Itertools;
use jbpl_bytecode::{Constant, InsnNode, InsnNodeKind, LabelId, MethodDescriptor, TypeDescriptor};
use jbpl_core::ast::{Expr, Instruction, InstructionKind, InvokeDynamicInstruction, LabelStatement};
use jbpl_core::error::{Error, Result};
use jbpl_core::span::TokenRange;
use jbpl_core::types::Type;
use jbpl_core::value::{FieldSignature, Value};

use super::{decode_constant, handle_opcode, handle_signature, method_signature};

/// Names the labels of a method body while it is decoded.
pub trait LabelNames {
    fn name_of(&self, label: LabelId) -> String;
}

/// Labels are named after their id.
#[derive(Debug, Default, Clone, Copy)]
pub struct NumberedLabels;

impl LabelNames for NumberedLabels {
    fn name_of(&self, label: LabelId) -> String {
        label.to_string()
    }
}

impl LabelNames for HashMap<LabelId, String> {
    fn name_of(&self, label: LabelId) -> String {
        self.get(&label).cloned().unwrap_or_else(|| label.to_string())
    }
}

/// Turns one kind of binary node back into a structured instruction.
pub trait InsnDecoder {
    fn decode(&self, node: &InsnNode, labels: &dyn LabelNames) -> Result<Instruction>;
}

fn literal(value: impl Into<Value>) -> Expr {
    Expr::literal(value)
}

fn wrong_kind(node: &InsnNode) -> Error {
    Error::evaluation(
        format!("Decoder cannot handle {} node '{}'", node.kind(), node),
        TokenRange::Synthetic,
    )
}

/// Type instructions and member owners name arrays by descriptor and classes by internal name.
fn owner_descriptor(name: &str) -> Result<TypeDescriptor> {
    if name.starts_with('[') {
        Ok(name.parse()?)
    } else {
        Ok(TypeDescriptor::object(name))
    }
}

fn type_of_internal_name(name: &str) -> Result<Type> {
    Ok(Type::from_descriptor(&owner_descriptor(name)?))
}

struct OplessDecoder;

impl InsnDecoder for OplessDecoder {
    fn decode(&self, node: &InsnNode, _labels: &dyn LabelNames) -> Result<Instruction> {
        if let Some(value) = decode_constant(node) {
            let opcode = node.opcode().ok_or_else(|| wrong_kind(node))?;
            return Ok(Instruction::synthetic(InstructionKind::LoadConstant {
                opcode,
                value: literal(value),
            }));
        }
        match node {
            InsnNode::Insn(opcode) => Ok(Instruction::opless(*opcode)),
            other => Err(wrong_kind(other)),
        }
    }
}

struct IntDecoder;

impl InsnDecoder for IntDecoder {
    fn decode(&self, node: &InsnNode, _labels: &dyn LabelNames) -> Result<Instruction> {
        if let Some(value) = decode_constant(node) {
            let opcode = node.opcode().ok_or_else(|| wrong_kind(node))?;
            return Ok(Instruction::synthetic(InstructionKind::LoadConstant {
                opcode,
                value: literal(value),
            }));
        }
        match node {
            InsnNode::Int { opcode, operand } => Ok(Instruction::synthetic(InstructionKind::Int {
                opcode: *opcode,
                operand: literal(*operand),
            })),
            other => Err(wrong_kind(other)),
        }
    }
}

struct VarDecoder;

impl InsnDecoder for VarDecoder {
    fn decode(&self, node: &InsnNode, _labels: &dyn LabelNames) -> Result<Instruction> {
        match node {
            InsnNode::Var { opcode, slot } => Ok(Instruction::synthetic(InstructionKind::Stack {
                opcode: *opcode,
                slot: literal(*slot as i32),
            })),
            other => Err(wrong_kind(other)),
        }
    }
}

struct IincDecoder;

impl InsnDecoder for IincDecoder {
    fn decode(&self, node: &InsnNode, _labels: &dyn LabelNames) -> Result<Instruction> {
        match node {
            InsnNode::Iinc { slot, increment } => Ok(Instruction::synthetic(InstructionKind::Iinc {
                slot: literal(*slot as i32),
                increment: literal(*increment as i32),
            })),
            other => Err(wrong_kind(other)),
        }
    }
}

struct TypeDecoder;

impl InsnDecoder for TypeDecoder {
    fn decode(&self, node: &InsnNode, _labels: &dyn LabelNames) -> Result<Instruction> {
        match node {
            InsnNode::Type { opcode, descriptor } => Ok(Instruction::synthetic(InstructionKind::Type {
                opcode: *opcode,
                ty: Expr::ty(type_of_internal_name(descriptor)?),
            })),
            other => Err(wrong_kind(other)),
        }
    }
}

struct FieldDecoder;

impl InsnDecoder for FieldDecoder {
    fn decode(&self, node: &InsnNode, _labels: &dyn LabelNames) -> Result<Instruction> {
        match node {
            InsnNode::Field {
                opcode,
                owner,
                name,
                descriptor,
            } => {
                let signature = FieldSignature {
                    owner: type_of_internal_name(owner)?,
                    name: name.clone(),
                    ty: Type::from_descriptor(&descriptor.parse()?),
                };
                Ok(Instruction::synthetic(InstructionKind::Field {
                    opcode: *opcode,
                    signature: literal(signature),
                }))
            }
            other => Err(wrong_kind(other)),
        }
    }
}

struct MethodDecoder;

impl InsnDecoder for MethodDecoder {
    fn decode(&self, node: &InsnNode, _labels: &dyn LabelNames) -> Result<Instruction> {
        match node {
            InsnNode::Method {
                opcode,
                owner,
                name,
                descriptor,
                ..
            } => {
                let signature = method_signature(&owner_descriptor(owner)?, name, &descriptor.parse()?)?;
                Ok(Instruction::synthetic(InstructionKind::Invoke {
                    opcode: *opcode,
                    signature: literal(signature),
                }))
            }
            other => Err(wrong_kind(other)),
        }
    }
}

struct InvokeDynamicDecoder;

impl InvokeDynamicDecoder {
    fn handle_instruction(handle: &jbpl_bytecode::Handle) -> Result<Expr> {
        let opcode = handle_opcode(handle.tag).ok_or_else(|| {
            Error::evaluation(
                format!("Handle {} does not refer to a method", handle),
                TokenRange::Synthetic,
            )
        })?;
        Ok(Expr::instruction(Instruction::synthetic(InstructionKind::Invoke {
            opcode,
            signature: literal(handle_signature(handle)?),
        })))
    }
}

impl InsnDecoder for InvokeDynamicDecoder {
    fn decode(&self, node: &InsnNode, _labels: &dyn LabelNames) -> Result<Instruction> {
        let InsnNode::InvokeDynamic {
            name,
            descriptor,
            bootstrap,
            bootstrap_args,
        } = node
        else {
            return Err(wrong_kind(node));
        };
        let unsupported = || {
            Error::evaluation(
                format!(
                    "Cannot decode invokedynamic with bootstrap arguments [{}]",
                    bootstrap_args.iter().join(", ")
                ),
                TokenRange::Synthetic,
            )
        };
        let call_site: MethodDescriptor = descriptor.parse()?;
        let [Constant::MethodType(sam), Constant::Handle(target), Constant::MethodType(instantiated), rest @ ..] =
            bootstrap_args.as_slice()
        else {
            return Err(unsupported());
        };
        if !call_site.params.is_empty() {
            return Err(unsupported());
        }
        let owner = &call_site.return_type;
        Ok(Instruction::synthetic(InstructionKind::InvokeDynamic(
            InvokeDynamicInstruction {
                instantiated: literal(method_signature(owner, name, instantiated)?),
                sam: literal(method_signature(owner, name, sam)?),
                bootstrap: Box::new(Self::handle_instruction(bootstrap)?),
                target: Box::new(Self::handle_instruction(target)?),
                arguments: rest
                    .iter()
                    .map(|constant| literal(Value::from_constant(constant)))
                    .collect(),
            },
        )))
    }
}

struct JumpDecoder;

impl InsnDecoder for JumpDecoder {
    fn decode(&self, node: &InsnNode, labels: &dyn LabelNames) -> Result<Instruction> {
        match node {
            InsnNode::Jump { opcode, label } => Ok(Instruction::synthetic(InstructionKind::Jump {
                opcode: *opcode,
                target: literal(labels.name_of(*label)),
            })),
            other => Err(wrong_kind(other)),
        }
    }
}

struct LabelDecoder;

impl InsnDecoder for LabelDecoder {
    fn decode(&self, node: &InsnNode, labels: &dyn LabelNames) -> Result<Instruction> {
        match node {
            InsnNode::Label(label) => Ok(Instruction::synthetic(InstructionKind::Label(LabelStatement {
                name: labels.name_of(*label),
            }))),
            other => Err(wrong_kind(other)),
        }
    }
}

struct LdcDecoder;

impl InsnDecoder for LdcDecoder {
    fn decode(&self, node: &InsnNode, _labels: &dyn LabelNames) -> Result<Instruction> {
        let InsnNode::Ldc(constant) = node else {
            return Err(wrong_kind(node));
        };
        let value = match constant {
            Constant::MethodType(descriptor) => {
                let owner = TypeDescriptor::object("java/lang/Object");
                Value::FunctionSignature(method_signature(&owner, "", descriptor)?)
            }
            Constant::Handle(handle) => {
                return Err(Error::evaluation(
                    format!("Cannot decode ldc of method handle {}", handle),
                    TokenRange::Synthetic,
                ))
            }
            other => Value::from_constant(other),
        };
        Ok(Instruction::synthetic(InstructionKind::LoadConstant {
            opcode: jbpl_bytecode::Opcode::LDC,
            value: literal(value),
        }))
    }
}

/// Decoders keyed by the kind of node they accept.
pub struct DecoderRegistry {
    decoders: HashMap<InsnNodeKind, Box<dyn InsnDecoder>>,
}

impl DecoderRegistry {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// One decoder for every node kind.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(InsnNodeKind::Insn, OplessDecoder);
        registry.register(InsnNodeKind::Int, IntDecoder);
        registry.register(InsnNodeKind::Var, VarDecoder);
        registry.register(InsnNodeKind::Iinc, IincDecoder);
        registry.register(InsnNodeKind::Type, TypeDecoder);
        registry.register(InsnNodeKind::Field, FieldDecoder);
        registry.register(InsnNodeKind::Method, MethodDecoder);
        registry.register(InsnNodeKind::InvokeDynamic, InvokeDynamicDecoder);
        registry.register(InsnNodeKind::Jump, JumpDecoder);
        registry.register(InsnNodeKind::Label, LabelDecoder);
        registry.register(InsnNodeKind::Ldc, LdcDecoder);
        registry
    }

    pub fn register(&mut self, kind: InsnNodeKind, decoder: impl InsnDecoder + 'static) {
        self.decoders.insert(kind, Box::new(decoder));
    }

    pub fn contains(&self, kind: InsnNodeKind) -> bool {
        self.decoders.contains_key(&kind)
    }

    pub fn decode(&self, node: &InsnNode, labels: &dyn LabelNames) -> Result<Instruction> {
        let decoder = self.decoders.get(&node.kind()).ok_or_else(|| {
            Error::evaluation(
                format!("No decoder registered for {} nodes", node.kind()),
                TokenRange::Synthetic,
            )
        })?;
        decoder.decode(node, labels)
    }

    pub fn decode_all(&self, nodes: &[InsnNode], labels: &dyn LabelNames) -> Result<Vec<Instruction>> {
        nodes.iter().map(|node| self.decode(node, labels)).collect()
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{encode, tests::LiteralContext};
    use super::*;
    use jbpl_bytecode::Opcode;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    #[test]
    fn every_node_kind_has_a_decoder() {
        let registry = DecoderRegistry::standard();
        for kind in InsnNodeKind::iter() {
            assert!(registry.contains(kind), "missing decoder for {}", kind);
        }
    }

    #[test]
    fn decoded_instructions_encode_to_the_same_nodes() {
        let nodes = vec![
            InsnNode::Insn(Opcode::ICONST_3),
            InsnNode::Var {
                opcode: Opcode::ISTORE,
                slot: 1,
            },
            InsnNode::Iinc {
                slot: 1,
                increment: -2,
            },
            InsnNode::Type {
                opcode: Opcode::ANEWARRAY,
                descriptor: "[Ljava/lang/String;".into(),
            },
            InsnNode::Field {
                opcode: Opcode::GETSTATIC,
                owner: "java/lang/System".into(),
                name: "out".into(),
                descriptor: "Ljava/io/PrintStream;".into(),
            },
            InsnNode::Method {
                opcode: Opcode::INVOKEVIRTUAL,
                owner: "java/io/PrintStream".into(),
                name: "println".into(),
                descriptor: "(Ljava/lang/String;)V".into(),
                is_interface: false,
            },
            InsnNode::Jump {
                opcode: Opcode::GOTO,
                label: LabelId(0),
            },
            InsnNode::Label(LabelId(0)),
            InsnNode::Ldc(Constant::String("hello".into())),
            InsnNode::Insn(Opcode::RETURN),
        ];
        let registry = DecoderRegistry::standard();
        let decoded = registry.decode_all(&nodes, &NumberedLabels).unwrap();
        assert_eq!(decoded[7], Instruction::label("L0"));

        let mut ctx = LiteralContext::default();
        let encoded = decoded
            .iter()
            .map(|instruction| encode(instruction, &mut ctx))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(encoded, nodes);
    }
}
