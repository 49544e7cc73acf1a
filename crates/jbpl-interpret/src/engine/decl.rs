use super::*;

use jbpl_bytecode::{access, ClassNode, FieldNode, MethodNode, Opcode};
use jbpl_core::types::BuiltinType;
use jbpl_core::value::{FieldSignature, FunctionSignature};

use crate::codec::encode_constant;
use crate::intrinsics::MemberRef;

fn check_modifiers(
    modifiers: &[AccessModifier],
    applicable: fn(AccessModifier) -> bool,
    target: &str,
    range: TokenRange,
) -> Result<()> {
    let invalid: Vec<AccessModifier> = modifiers
        .iter()
        .copied()
        .filter(|modifier| !applicable(*modifier))
        .collect();
    if invalid.is_empty() {
        return Ok(());
    }
    Err(Error::Modifier {
        message: format!(
            "Modifiers '{}' are not applicable to {}",
            AccessModifier::join(&invalid),
            target
        ),
        range,
    })
}

fn return_opcode(ty: &Type) -> Opcode {
    match ty {
        Type::Builtin(
            BuiltinType::I8 | BuiltinType::I16 | BuiltinType::I32 | BuiltinType::Char | BuiltinType::Bool,
        ) => Opcode::IRETURN,
        Type::Builtin(BuiltinType::I64) => Opcode::LRETURN,
        Type::Builtin(BuiltinType::F32) => Opcode::FRETURN,
        Type::Builtin(BuiltinType::F64) => Opcode::DRETURN,
        _ => Opcode::ARETURN,
    }
}

impl<'a> EvaluationContext<'a> {
    pub(crate) fn evaluate_declaration(&mut self, decl: &'a Declaration) -> Result<()> {
        let range = decl.range;
        match &decl.kind {
            DeclarationKind::Class(class) => self.declare_class(class, range),
            DeclarationKind::Field(field) => self.declare_field(field, range),
            DeclarationKind::Function(function) => self.declare_function(function, range),
            DeclarationKind::Injector(injector) => self.inject(injector, range),
            DeclarationKind::Block(block) => self.evaluate_scoped(ScopeOwner::Block(block)),
            // only ever looked up through the resolvers
            DeclarationKind::Macro(_)
            | DeclarationKind::PreproClass(_)
            | DeclarationKind::Selector(_)
            | DeclarationKind::Empty => Ok(()),
        }
    }

    fn declare_class(&mut self, class: &'a ClassDecl, range: TokenRange) -> Result<()> {
        check_modifiers(&class.modifiers, AccessModifier::applicable_to_class, "class", range)?;
        let name = self.internal_name(&class.ty)?;
        interp_ensure!(
            self.output.class(&name).is_none(),
            format!("Class '{}' is already declared", name),
            range
        );

        let mut node = ClassNode::new(name);
        node.version = self.version;
        node.access = AccessModifier::combine(&class.modifiers);
        if let Some(super_type) = &class.super_type {
            node.super_name = Some(self.internal_name(super_type)?);
        }
        for interface in &class.interfaces {
            node.interfaces.push(self.internal_name(interface)?);
        }
        self.output.add_class(node);
        Ok(())
    }

    fn internal_name(&mut self, expr: &'a Expr) -> Result<String> {
        self.eval_type(expr)?
            .internal_name()
            .map_err(|error| error.at(expr.range))
    }

    fn field_signature(&mut self, expr: &'a Expr) -> Result<FieldSignature> {
        match self.eval_expr(expr)? {
            Value::FieldSignature(signature) => Ok(signature),
            other => Err(Error::type_mismatch(
                format!("Expected a field signature but got {}", other.ty()),
                expr.range,
            )),
        }
    }

    pub(crate) fn function_signature(&mut self, expr: &'a Expr) -> Result<FunctionSignature> {
        match self.eval_expr(expr)? {
            Value::FunctionSignature(signature) => Ok(signature),
            other => Err(Error::type_mismatch(
                format!("Expected a function signature but got {}", other.ty()),
                expr.range,
            )),
        }
    }

    fn declare_field(&mut self, field: &'a FieldDecl, range: TokenRange) -> Result<()> {
        check_modifiers(&field.modifiers, AccessModifier::applicable_to_field, "field", range)?;
        let signature = self.field_signature(&field.signature)?;
        let owner = signature.owner.internal_name().map_err(|error| error.at(range))?;
        let descriptor = signature.descriptor().map_err(|error| error.at(range))?;
        let provider = Arc::clone(&self.options.class_provider);

        let node = FieldNode::new(
            AccessModifier::combine(&field.modifiers),
            signature.name.clone(),
            descriptor.clone(),
        );
        self.output.put_field(&owner, node, provider.as_ref(), range)?;

        let value = match &field.initializer {
            Some(initializer) => {
                let member = MemberRef::Field {
                    owner: owner.clone(),
                    name: signature.name.clone(),
                    descriptor: descriptor.clone(),
                };
                let frame = self
                    .frame(self.scope_of(ScopeOwner::Field(field)))
                    .define("access", IntrinsicDefine::Access(member))
                    .build();
                self.push_frame(frame)?;
                let value = self.eval_expr(initializer)?;
                self.pop_frame()?;
                Some(self.coerce(value, &signature.ty, initializer.range, || {
                    format!("field '{}'", signature.name)
                })?)
            }
            None => self.default_value(&signature.ty, range).ok(),
        };
        let constant = match value {
            Some(value) => value.to_constant().map_err(|error| error.at(range))?,
            None => None,
        };

        self.output
            .transform_class(&owner, provider.as_ref(), range, |class| {
                if let Some(node) = class
                    .fields
                    .iter_mut()
                    .find(|it| it.name == signature.name && it.descriptor == descriptor)
                {
                    node.value = constant;
                }
                Ok(())
            })
    }

    fn declare_function(&mut self, function: &'a FunctionDecl, range: TokenRange) -> Result<()> {
        check_modifiers(
            &function.modifiers,
            AccessModifier::applicable_to_function,
            "function",
            range,
        )?;
        let signature = self.function_signature(&function.signature)?;
        let owner = signature.owner.internal_name().map_err(|error| error.at(range))?;
        let descriptor = signature.descriptor().map_err(|error| error.at(range))?;
        let method_descriptor = descriptor.to_string();
        let flags = AccessModifier::combine(&function.modifiers);
        let provider = Arc::clone(&self.options.class_provider);

        self.output.put_method(
            &owner,
            MethodNode::new(flags, signature.name.clone(), method_descriptor.clone()),
            provider.as_ref(),
            range,
        )?;

        let member = MemberRef::Method {
            owner: owner.clone(),
            name: signature.name.clone(),
            descriptor: method_descriptor.clone(),
        };
        let this_slot = if access::is_static(flags) { 0 } else { 1 };
        let frame = self
            .frame(self.scope_of(ScopeOwner::Function(function)))
            .define("access", IntrinsicDefine::Access(member.clone()))
            .define("instructions", IntrinsicDefine::Instructions)
            .define("exceptions", IntrinsicDefine::Exceptions(member))
            .slots(Slots::starting_at(descriptor.params_slot_size() + this_slot, 0))
            .build();
        self.push_frame(frame)?;
        self.evaluate_elements(&function.body)?;
        if self.finish_callable(range)? {
            let value = self.top_mut()?.values.pop().unwrap_or(Value::Unit);
            self.emit_return(value, &signature.return_type, range)?;
        }
        let frame = self.pop_frame()?;
        debug!(
            "{}.{}{} has {} instructions",
            owner,
            signature.name,
            method_descriptor,
            frame.instructions.len()
        );

        let instructions = frame.instructions;
        self.output
            .transform_class(&owner, provider.as_ref(), range, |class| {
                let method = class
                    .method_mut(&signature.name, &method_descriptor)
                    .ok_or_else(|| Error::MissingTarget {
                        message: format!(
                            "Method {}.{}{} does not exist",
                            owner, signature.name, method_descriptor
                        ),
                        range,
                    })?;
                method.instructions = instructions;
                Ok(())
            })
    }

    /// Emits the constant load and return instruction for a function's `return`.
    fn emit_return(&mut self, value: Value, return_type: &Type, range: TokenRange) -> Result<()> {
        let nodes = match (value, return_type.is_void()) {
            (Value::Unit, true) => vec![InsnNode::Insn(Opcode::RETURN)],
            (Value::Unit, false) => {
                return Err(Error::type_mismatch(
                    format!("Function returning {} must return a value", return_type),
                    range,
                ))
            }
            (value, true) => {
                return Err(Error::type_mismatch(
                    format!("Cannot return {} of type {} from a void function", value, value.ty()),
                    range,
                ))
            }
            (value, false) => {
                let value = self.coerce(value, return_type, range, || "return value".to_string())?;
                let load = encode_constant(Opcode::LDC, &value).map_err(|error| error.at(range))?;
                vec![load, InsnNode::Insn(return_opcode(return_type))]
            }
        };
        self.top_mut()?.instructions.extend(nodes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn return_opcodes_follow_the_type() {
        assert_eq!(return_opcode(&Type::BOOL), Opcode::IRETURN);
        assert_eq!(return_opcode(&Type::I64), Opcode::LRETURN);
        assert_eq!(return_opcode(&Type::F64), Opcode::DRETURN);
        assert_eq!(return_opcode(&Type::STRING), Opcode::ARETURN);
    }

    #[test]
    fn inapplicable_modifiers_are_listed() {
        let error = check_modifiers(
            &[AccessModifier::Public, AccessModifier::Static],
            AccessModifier::applicable_to_class,
            "class",
            TokenRange::Synthetic,
        )
        .unwrap_err();
        assert!(matches!(error, Error::Modifier { .. }));
        assert_eq!(error.to_string(), "Modifiers 'static' are not applicable to class");
    }
}
