use jbpl_bytecode::{Constant, Handle, HandleTag, InsnNode, MethodDescriptor, Opcode, TypeDescriptor};
use jbpl_core::ast::{Instruction, InstructionKind, InvokeDynamicInstruction};
use jbpl_core::error::{Error, Result};
use jbpl_core::span::TokenRange;
use jbpl_core::value::FunctionSignature;

use super::{function_operand, instruction_operand, EncodingContext};

/// Assembles an `invokedynamic` for a functional interface.
///
/// The call site produces the owner of the instantiated signature and takes no
/// captured arguments. Bootstrap arguments are, in order: the erased interface
/// method type, the implementation handle, the instantiated method type, then
/// any explicit constants.
pub fn encode_invoke_dynamic(
    indy: &InvokeDynamicInstruction,
    ctx: &mut dyn EncodingContext,
) -> Result<InsnNode> {
    let instantiated = function_operand(ctx, &indy.instantiated)?;
    let sam = function_operand(ctx, &indy.sam)?;
    let bootstrap = instruction_operand(ctx, &indy.bootstrap)?;
    let bootstrap = invoke_handle(&bootstrap, ctx)?;
    let target = instruction_operand(ctx, &indy.target)?;
    let target = invoke_handle(&target, ctx)?;

    let produced = instantiated.owner.materialize()?;
    let descriptor = MethodDescriptor::new(Vec::new(), produced);

    let mut bootstrap_args = vec![
        Constant::MethodType(sam.descriptor()?),
        Constant::Handle(target),
        Constant::MethodType(instantiated.descriptor()?),
    ];
    for argument in &indy.arguments {
        let value = ctx.operand(argument)?;
        let constant = value.to_constant()?.ok_or_else(|| {
            Error::type_mismatch(
                format!("Value of type {} is not a valid bootstrap argument", value.ty()),
                argument.range,
            )
        })?;
        bootstrap_args.push(constant);
    }

    Ok(InsnNode::InvokeDynamic {
        name: instantiated.name,
        descriptor: descriptor.to_string(),
        bootstrap,
        bootstrap_args,
    })
}

/// Method handle for the method an invoke instruction calls.
pub fn invoke_handle(instruction: &Instruction, ctx: &mut dyn EncodingContext) -> Result<Handle> {
    let InstructionKind::Invoke { opcode, signature } = &instruction.kind else {
        return Err(handle_error(instruction.range));
    };
    let tag = HandleTag::for_invoke(*opcode).ok_or_else(|| handle_error(instruction.range))?;
    let signature = function_operand(ctx, signature)?;
    Ok(Handle {
        tag,
        owner: signature.owner.internal_name()?,
        descriptor: signature.descriptor()?.to_string(),
        name: signature.name,
        is_interface: *opcode == Opcode::INVOKEINTERFACE,
    })
}

fn handle_error(range: TokenRange) -> Error {
    Error::evaluation(
        "Invoke handle requires INVOKESTATIC, INVOKEVIRTUAL, INVOKESPECIAL or INVOKEINTERFACE target",
        range,
    )
}

/// The invoke opcode that calls through a handle of this kind.
pub fn handle_opcode(tag: HandleTag) -> Option<Opcode> {
    match tag {
        HandleTag::InvokeVirtual => Some(Opcode::INVOKEVIRTUAL),
        HandleTag::InvokeStatic => Some(Opcode::INVOKESTATIC),
        HandleTag::InvokeSpecial | HandleTag::NewInvokeSpecial => Some(Opcode::INVOKESPECIAL),
        HandleTag::InvokeInterface => Some(Opcode::INVOKEINTERFACE),
        _ => None,
    }
}

/// Signature of the method a handle points at.
pub fn handle_signature(handle: &Handle) -> Result<FunctionSignature> {
    method_signature(
        &TypeDescriptor::object(handle.owner.clone()),
        &handle.name,
        &handle.descriptor.parse()?,
    )
}

pub(crate) fn method_signature(
    owner: &TypeDescriptor,
    name: &str,
    descriptor: &MethodDescriptor,
) -> Result<FunctionSignature> {
    use jbpl_core::types::Type;
    Ok(FunctionSignature {
        owner: Type::from_descriptor(owner),
        name: name.to_string(),
        return_type: Type::from_descriptor(&descriptor.return_type),
        params: descriptor.params.iter().map(Type::from_descriptor).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::super::tests::LiteralContext;
    use super::*;
    use jbpl_core::ast::Expr;
    use jbpl_core::types::Type;
    use jbpl_core::value::{FieldSignature, Value};
    use pretty_assertions::assert_eq;

    /// A bound signature operand, as the engine hands it to the encoder.
    fn signature(owner: &str, name: &str, return_type: Type, params: Vec<Type>) -> Expr {
        Expr::literal(Value::FunctionSignature(FunctionSignature {
            owner: Type::class(owner),
            name: name.to_string(),
            return_type,
            params,
        }))
    }

    fn invoke(opcode: Opcode, owner: &str, name: &str, ret: Type, params: Vec<Type>) -> Expr {
        Expr::instruction(Instruction::synthetic(InstructionKind::Invoke {
            opcode,
            signature: signature(owner, name, ret, params),
        }))
    }

    fn runnable(target: Expr) -> InvokeDynamicInstruction {
        let bootstrap_params = vec![
            Type::class("java/lang/invoke/MethodHandles$Lookup"),
            Type::STRING,
            Type::class("java/lang/invoke/MethodType"),
            Type::class("java/lang/invoke/MethodType"),
            Type::class("java/lang/invoke/MethodHandle"),
            Type::class("java/lang/invoke/MethodType"),
        ];
        InvokeDynamicInstruction {
            instantiated: signature("java/lang/Runnable", "run", Type::VOID, vec![]),
            sam: signature("java/lang/Runnable", "run", Type::VOID, vec![]),
            bootstrap: Box::new(invoke(
                Opcode::INVOKESTATIC,
                "java/lang/invoke/LambdaMetafactory",
                "metafactory",
                Type::class("java/lang/invoke/CallSite"),
                bootstrap_params,
            )),
            target: Box::new(target),
            arguments: vec![],
        }
    }

    #[test]
    fn lambda_metafactory_call_site() {
        let indy = runnable(invoke(Opcode::INVOKESTATIC, "demo/Main", "lambda$0", Type::VOID, vec![]));
        let node = encode_invoke_dynamic(&indy, &mut LiteralContext::default()).unwrap();
        let InsnNode::InvokeDynamic {
            name,
            descriptor,
            bootstrap,
            bootstrap_args,
        } = node
        else {
            panic!("expected invokedynamic");
        };
        assert_eq!(name, "run");
        assert_eq!(descriptor, "()Ljava/lang/Runnable;");
        assert_eq!(bootstrap.tag, HandleTag::InvokeStatic);
        assert_eq!(bootstrap.owner, "java/lang/invoke/LambdaMetafactory");
        assert_eq!(bootstrap_args.len(), 3);
        assert_eq!(bootstrap_args[0], Constant::MethodType("()V".parse().unwrap()));
        let Constant::Handle(target) = &bootstrap_args[1] else {
            panic!("expected the target handle second");
        };
        assert_eq!(target.name, "lambda$0");
        assert_eq!(target.descriptor, "()V");
        assert_eq!(bootstrap_args[2], Constant::MethodType("()V".parse().unwrap()));
    }

    #[test]
    fn handles_require_invoke_opcodes() {
        let field = Expr::instruction(Instruction::synthetic(InstructionKind::Field {
            opcode: Opcode::GETSTATIC,
            signature: Expr::literal(Value::FieldSignature(FieldSignature {
                owner: Type::class("demo/Main"),
                name: "f".to_string(),
                ty: Type::I32,
            })),
        }));
        let error = encode_invoke_dynamic(&runnable(field), &mut LiteralContext::default()).unwrap_err();
        assert!(error
            .to_string()
            .contains("Invoke handle requires INVOKESTATIC, INVOKEVIRTUAL, INVOKESPECIAL or INVOKEINTERFACE target"));
    }
}
