use super::*;

use jbpl_bytecode::{access, MethodDescriptor, MethodNode, Opcode};
use jbpl_core::value::FunctionSignature;

use crate::codec::encode;
use crate::intrinsics::MemberRef;

/// First local and label id not used by `method`, whose parameters are
/// described by `descriptor`.
fn free_slots(method: &MethodNode, descriptor: &MethodDescriptor) -> Slots {
    let this_slot = if access::is_static(method.access) { 0 } else { 1 };
    let mut next_local = descriptor.params_slot_size() + this_slot;
    let mut next_label = 0u32;
    for node in &method.instructions {
        match node {
            InsnNode::Var { opcode, slot } => {
                let width = match opcode {
                    Opcode::LLOAD | Opcode::DLOAD | Opcode::LSTORE | Opcode::DSTORE => 2,
                    _ => 1,
                };
                next_local = next_local.max(slot.saturating_add(width));
            }
            InsnNode::Iinc { slot, .. } => next_local = next_local.max(slot.saturating_add(1)),
            InsnNode::Label(LabelId(id)) | InsnNode::Jump { label: LabelId(id), .. } => {
                next_label = next_label.max(id + 1)
            }
            _ => {}
        }
    }
    Slots::starting_at(next_local, next_label)
}

impl<'a> EvaluationContext<'a> {
    /// Splices the code an injector body produces into its target method.
    pub(crate) fn inject(&mut self, injector: &'a InjectorDecl, range: TokenRange) -> Result<()> {
        let target = self.function_signature(&injector.target)?;
        let selector_name = match self.eval_expr(&injector.selector)? {
            Value::Selector(name) | Value::String(name) => name,
            other => {
                return Err(Error::type_mismatch(
                    format!("Expected a selector but got {}", other.ty()),
                    injector.selector.range,
                ))
            }
        };
        let scope = self.scope_of(ScopeOwner::Injector(injector));
        let selector = self
            .resolvers
            .selectors
            .resolve(&scope, &selector_name)
            .ok_or_else(|| {
                Error::unresolved(SymbolKind::Selector, selector_name.clone(), injector.selector.range)
            })?;

        let owner = target.owner.internal_name().map_err(|error| error.at(range))?;
        let descriptor = target.descriptor().map_err(|error| error.at(range))?;
        let method_descriptor = descriptor.to_string();
        let provider = Arc::clone(&self.options.class_provider);
        let method = self
            .output
            .class(&owner)
            .cloned()
            .or_else(|| provider.find_class(&owner))
            .and_then(|class| class.method(&target.name, &method_descriptor).cloned())
            .ok_or_else(|| Error::MissingTarget {
                message: format!("Method {}.{}{} does not exist", owner, target.name, method_descriptor),
                range,
            })?;

        let index = self.select(selector, &method, &target, range)?;
        debug!(
            "injecting at {} of {}.{}{} using selector {}",
            index, owner, target.name, method_descriptor, selector.name
        );

        let member = MemberRef::Method {
            owner: owner.clone(),
            name: target.name.clone(),
            descriptor: method_descriptor.clone(),
        };
        let frame = self
            .frame(scope)
            .define("access", IntrinsicDefine::Access(member.clone()))
            .define("instructions", IntrinsicDefine::Instructions)
            .define("exceptions", IntrinsicDefine::Exceptions(member))
            .slots(free_slots(&method, &descriptor))
            .build();
        self.push_frame(frame)?;
        self.evaluate_elements(&injector.body)?;
        if self.finish_callable(range)? {
            self.top_mut()?.values.pop();
        }
        let injected = self.pop_frame()?.instructions;

        self.output
            .transform_class(&owner, provider.as_ref(), range, |class| {
                let method = class
                    .method_mut(&target.name, &method_descriptor)
                    .ok_or_else(|| Error::MissingTarget {
                        message: format!("Method {}.{}{} does not exist", owner, target.name, method_descriptor),
                        range,
                    })?;
                interp_ensure!(
                    index <= method.instructions.len(),
                    format!("Selector '{}' points outside of method", selector_name),
                    range
                );
                method.instructions.splice(index..index, injected);
                Ok(())
            })
    }

    /// Index in `method` that `selector` points at: the first condition that
    /// matches wins, then the offset is applied.
    fn select(
        &mut self,
        selector: &'a SelectorDecl,
        method: &MethodNode,
        target: &FunctionSignature,
        range: TokenRange,
    ) -> Result<usize> {
        let mut found = None;
        for condition in &selector.conditions {
            let position = match &condition.target {
                ConditionTarget::Opcode(opcode) => method
                    .instructions
                    .iter()
                    .position(|node| node.opcode() == Some(*opcode)),
                ConditionTarget::Instruction(pattern) => {
                    let bound = self.bind_instruction(pattern)?;
                    let mut slots = Slots::default();
                    let node = encode(&bound, &mut FrameEncoder { slots: &mut slots })
                        .map_err(|error| error.at(condition.range))?;
                    method.instructions.iter().position(|it| *it == node)
                }
            };
            if let Some(position) = position {
                found = Some(match condition.order {
                    ConditionOrder::Before => position,
                    ConditionOrder::After => position + 1,
                });
                break;
            }
        }
        let index = found.ok_or_else(|| Error::MissingTarget {
            message: format!(
                "Selector '{}' did not match any instruction in {}",
                selector.name, target
            ),
            range,
        })?;

        let Some(offset) = &selector.offset else {
            return Ok(index);
        };
        let frame = self.frame(self.scope_of(ScopeOwner::Selector(selector))).build();
        self.push_frame(frame)?;
        let value = self.eval_expr(offset)?;
        self.pop_frame()?;
        let offset = value.as_i64().ok_or_else(|| {
            Error::type_mismatch(
                format!("Selector offset must be an integer but got {}", value.ty()),
                offset.range,
            )
        })?;
        let moved = index as i64 + offset;
        interp_ensure!(
            (0..=method.instructions.len() as i64).contains(&moved),
            format!("Selector '{}' points outside of method", selector.name),
            range
        );
        trace!("selector {} moved from {} to {}", selector.name, index, moved);
        Ok(moved as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn slots_of(method: &MethodNode) -> Slots {
        let descriptor: MethodDescriptor = method.descriptor.parse().unwrap();
        free_slots(method, &descriptor)
    }

    #[test]
    fn injected_code_uses_fresh_locals_and_labels() {
        let mut method = MethodNode::new(access::ACC_STATIC, "m", "(J)V");
        method.instructions = vec![
            InsnNode::Var {
                opcode: Opcode::LLOAD,
                slot: 1,
            },
            InsnNode::Label(LabelId(4)),
            InsnNode::Iinc {
                slot: 2,
                increment: 1,
            },
        ];
        let mut slots = slots_of(&method);
        assert_eq!(slots.declare_local("x", None), 3);
        assert_eq!(slots.label("l"), LabelId(5));
    }

    #[test]
    fn parameters_and_this_are_never_reused() {
        let method = MethodNode::new(0, "m", "(IJ)V");
        assert_eq!(slots_of(&method).declare_local("x", None), 4);

        let method = MethodNode::new(access::ACC_STATIC, "m", "(I)V");
        assert_eq!(slots_of(&method).declare_local("x", None), 1);
    }
}
