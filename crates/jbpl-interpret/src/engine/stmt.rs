use super::*;

use jbpl_core::scope::ScopeOwnerKind;
use jbpl_core::types::TypeCategory;

impl<'a> EvaluationContext<'a> {
    /// Evaluates elements in order until control flow is interrupted.
    pub(crate) fn evaluate_elements(&mut self, elements: &'a [Element]) -> Result<()> {
        for element in elements.iter().filter(|it| it.is_evaluated_directly()) {
            self.evaluate_element(element)?;
            if self.flow.is_interrupted() {
                break;
            }
        }
        Ok(())
    }

    pub(crate) fn evaluate_element(&mut self, element: &'a Element) -> Result<()> {
        match element {
            Element::Declaration(decl) => self.evaluate_declaration(decl),
            Element::Statement(stmt) => self.evaluate_statement(stmt),
            Element::Expr(expr) => match &expr.kind {
                ExprKind::If(branch) => self.eval_if(branch, Position::Statement).map(drop),
                ExprKind::When(branch) => self.eval_when(branch, Position::Statement).map(drop),
                _ => {
                    let value = self.eval_expr(expr)?;
                    self.consume_statement_value(value)
                }
            },
        }
    }

    pub(crate) fn evaluate_statement(&mut self, stmt: &'a Statement) -> Result<()> {
        let range = stmt.range;
        match &stmt.kind {
            StatementKind::Return(ret) => {
                let value = match &ret.value {
                    Some(value) => self.eval_expr(value)?,
                    None => Value::Unit,
                };
                self.push_value(value)?;
                self.flow.set(ControlFlow::Return);
            }
            StatementKind::Local(local) => self.declare_local(local, range)?,
            // both are read lazily through the resolvers
            StatementKind::Define(_) | StatementKind::TypeAlias(_) => {}
            StatementKind::Assert(assert) => self.check_assertion(assert, range)?,
            StatementKind::For(stmt) => self.evaluate_for(stmt, range)?,
            StatementKind::Break => self.flow.set(ControlFlow::Break),
            StatementKind::Continue => self.flow.set(ControlFlow::Continue),
            StatementKind::Include(include) => {
                return Err(interpretation_error_at(
                    format!("Include of '{}' must be expanded before evaluation", include.path),
                    range,
                ))
            }
            StatementKind::Version(version) => {
                let value = self.eval_expr(&version.version)?;
                let number = value.as_i64().ok_or_else(|| {
                    Error::type_mismatch(
                        format!("Class version must be an integer but got {}", value.ty()),
                        version.version.range,
                    )
                })?;
                self.version =
                    ClassVersion::from_number(number).map_err(|error| Error::from(error).at(range))?;
                debug!("class version set to {:?}", self.version);
            }
            StatementKind::Yeet(yeet) => self.yeet(yeet, range)?,
            StatementKind::Compound(compound) => {
                for statement in &compound.statements {
                    self.evaluate_statement(statement)?;
                    if self.flow.is_interrupted() {
                        break;
                    }
                }
            }
            StatementKind::Noop => {}
            StatementKind::Instruction(instruction) => {
                let bound = self.bind_instruction(instruction)?;
                self.emit(&bound)?;
            }
        }
        Ok(())
    }

    fn declare_local(&mut self, local: &'a LocalStatement, range: TokenRange) -> Result<()> {
        let index = match &local.index {
            Some(expr) => {
                let value = self.eval_expr(expr)?;
                let index = value.as_i64().and_then(|it| u16::try_from(it).ok());
                Some(index.ok_or_else(|| {
                    Error::type_mismatch(
                        format!("Local index must be an integer in 0..65536 but got {}", value),
                        expr.range,
                    )
                })?)
            }
            None => None,
        };
        let root = self.root_index()?;
        let kind = self.frames[root].owner().kind();
        interp_ensure!(
            matches!(kind, ScopeOwnerKind::Function | ScopeOwnerKind::Injector),
            format!(
                "Local '{}' cannot be declared outside of a function or injector",
                local.name
            ),
            range
        );
        let slot = self.frames[root].slots.declare_local(&local.name, index);
        trace!("local {} is slot {}", local.name, slot);
        Ok(())
    }

    fn check_assertion(&mut self, assert: &'a AssertStatement, range: TokenRange) -> Result<()> {
        if self.condition(&assert.condition)? {
            return Ok(());
        }
        let message = match &assert.message {
            Some(message) => format!("Assertion failed: {}", self.eval_expr(message)?),
            None => "Assertion failed".to_string(),
        };
        Err(interpretation_error_at(message, range))
    }

    fn evaluate_for(&mut self, stmt: &'a ForStatement, range: TokenRange) -> Result<()> {
        let values = match self.eval_expr(&stmt.value)? {
            Value::Array(array) => array.values,
            Value::Range(bounds) => {
                interp_ensure!(
                    matches!(
                        bounds.element_type.category(),
                        TypeCategory::Integer | TypeCategory::Char
                    ),
                    format!("Cannot iterate over range of type {}", bounds.element_type),
                    range
                );
                bounds.values().map_err(|error| error.at(range))?
            }
            other => {
                return Err(Error::type_mismatch(
                    format!(
                        "Cannot use value of type {} in right hand side of for loop",
                        other.ty()
                    ),
                    stmt.value.range,
                ))
            }
        };

        let scope = self.scope_of(ScopeOwner::For(stmt));
        for value in values {
            let frame = self
                .frame(Rc::clone(&scope))
                .value(stmt.variable.clone(), value)
                .build();
            self.push_frame(frame)?;
            self.evaluate_elements(&stmt.body)?;
            self.pop_frame()?;

            if self.flow.is_set(ControlFlow::Return) {
                break;
            }
            if self.flow.is_set(ControlFlow::Break) {
                self.flow.clear(ControlFlow::Break);
                self.flow.clear(ControlFlow::Continue);
                break;
            }
            self.flow.clear(ControlFlow::Continue);
        }
        Ok(())
    }

    fn yeet(&mut self, yeet: &'a YeetStatement, range: TokenRange) -> Result<()> {
        let provider = Arc::clone(&self.options.class_provider);
        let provider = provider.as_ref();
        match self.eval_expr(&yeet.target)? {
            Value::Type(ty) => {
                let name = ty.internal_name().map_err(|error| error.at(range))?;
                self.output.remove_class(&name);
            }
            Value::FunctionSignature(signature) => {
                let owner = signature.owner.internal_name().map_err(|error| error.at(range))?;
                let descriptor = signature.descriptor().map_err(|error| error.at(range))?;
                self.output.remove_method(
                    &owner,
                    &signature.name,
                    &descriptor.to_string(),
                    provider,
                    range,
                )?;
            }
            Value::FieldSignature(signature) => {
                let owner = signature.owner.internal_name().map_err(|error| error.at(range))?;
                let descriptor = signature.descriptor().map_err(|error| error.at(range))?;
                self.output
                    .remove_field(&owner, &signature.name, &descriptor, provider, range)?;
            }
            other => {
                return Err(interpretation_error_at(
                    format!("Unsupported target type for yeet: {}", other.ty()),
                    range,
                ))
            }
        }
        Ok(())
    }
}
