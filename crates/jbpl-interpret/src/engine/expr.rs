use super::ops;
use super::*;

use jbpl_core::scope::ScopeOwnerKind;
use jbpl_core::types::{common_type, BuiltinType, TypeCategory};
use jbpl_core::value::{FieldSignature, FunctionSignature, PreproClassValue, RangeValue};

use crate::codec::encode;

fn type_mismatch(message: impl Into<String>, range: TokenRange) -> Error {
    Error::type_mismatch(message, range)
}

fn index_of(index: &Value, length: usize, range: TokenRange) -> Result<usize> {
    let value = index
        .as_i64()
        .ok_or_else(|| type_mismatch(format!("Index must be an integer but got {}", index.ty()), range))?;
    usize::try_from(value)
        .ok()
        .filter(|index| *index < length)
        .ok_or_else(|| {
            interpretation_error_at(
                format!("Index {} out of bounds for length {}", value, length),
                range,
            )
        })
}

fn slice_bounds(slice: &RangeValue, length: usize, range: TokenRange) -> Result<(usize, usize)> {
    let out_of_bounds = |bound: i64| {
        interpretation_error_at(
            format!("Index {} out of bounds for length {}", bound, length),
            range,
        )
    };
    let start = usize::try_from(slice.start).map_err(|_| out_of_bounds(slice.start))?;
    let end = usize::try_from(slice.end).map_err(|_| out_of_bounds(slice.end))?;
    if end > length {
        return Err(out_of_bounds(slice.end));
    }
    Ok((start.min(end), end))
}

fn when_matches(subject: &Value, condition: &Value) -> bool {
    match condition {
        Value::Range(range) => subject.as_i64().is_some_and(|value| range.contains(value)),
        Value::Array(array) if !matches!(subject, Value::Array(_)) => {
            array.values.iter().any(|it| ops::equals(subject, it))
        }
        other => ops::equals(subject, other),
    }
}

/// Whether operand `index` of `instruction` may name a local or label instead of a value.
fn takes_name(instruction: &Instruction, index: usize) -> bool {
    index == 0
        && matches!(
            instruction.kind,
            InstructionKind::Stack { .. } | InstructionKind::Iinc { .. } | InstructionKind::Jump { .. }
        )
}

impl<'a> EvaluationContext<'a> {
    pub(crate) fn eval_expr(&mut self, expr: &'a Expr) -> Result<Value> {
        let range = expr.range;
        match &expr.kind {
            ExprKind::Literal(Value::Type(ty)) => Ok(Value::Type(self.resolve_type(ty, range)?)),
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::Binary(binary) => self.eval_binary(binary, range),
            ExprKind::Unary(unary) => self.eval_unary(unary, range),
            ExprKind::Reference(reference) => self.lookup(&reference.name, range),
            ExprKind::MacroCall(call) => self.call_macro(call, range),
            ExprKind::StringLerp(lerp) => {
                let mut text = String::new();
                for part in &lerp.parts {
                    text.push_str(&self.eval_expr(part)?.to_string());
                }
                Ok(Value::String(text))
            }
            ExprKind::Array(array) => self.eval_array(array, range),
            ExprKind::ArrayAccess(access) => {
                let container = self.eval_expr(&access.reference)?;
                let index = self.eval_expr(&access.index)?;
                element_of(&container, &index, range)
            }
            ExprKind::If(expr) => self.eval_if(expr, Position::Value),
            ExprKind::When(expr) => self.eval_when(expr, Position::Value),
            ExprKind::As(cast) => {
                let value = self.eval_expr(&cast.value)?;
                let ty = self.eval_type(&cast.ty)?;
                value.cast(&ty).map_err(|error| error.at(range))
            }
            ExprKind::Is(check) => {
                let value = self.eval_expr(&check.value)?;
                let ty = self.eval_type(&check.ty)?;
                Ok(Value::Bool(
                    ty == Type::OBJECT || ty.unfold().contains(&value.ty()),
                ))
            }
            ExprKind::In(check) => {
                let value = self.eval_expr(&check.value)?;
                let container = self.eval_expr(&check.container)?;
                contains(&container, &value, range).map(Value::Bool)
            }
            ExprKind::SizeOf(inner) => {
                let value = self.eval_expr(inner)?;
                size_of(&value, range)
            }
            ExprKind::TypeOf(inner) => Ok(Value::Type(self.eval_expr(inner)?.ty())),
            ExprKind::OpcodeOf(inner) => match self.eval_expr(inner)? {
                Value::Instruction(instruction) => instruction
                    .opcode()
                    .map(Value::Opcode)
                    .ok_or_else(|| interpretation_error_at("A label has no opcode", range)),
                Value::Opcode(opcode) => Ok(Value::Opcode(opcode)),
                other => Err(type_mismatch(
                    format!("Cannot take the opcode of {}", other.ty()),
                    range,
                )),
            },
            ExprKind::Default(inner) => {
                let ty = self.eval_type(inner)?;
                self.default_value(&ty, range)
            }
            ExprKind::Range(bounds) => self.eval_range(bounds, range),
            ExprKind::FieldSignature(signature) => {
                Ok(Value::FieldSignature(FieldSignature {
                    owner: self.eval_type(&signature.owner)?,
                    name: self.eval_name(&signature.name)?,
                    ty: self.eval_type(&signature.ty)?,
                }))
            }
            ExprKind::FunctionSignature(signature) => {
                let owner = self.eval_type(&signature.owner)?;
                let name = self.eval_name(&signature.name)?;
                let return_type = self.eval_type(&signature.return_type)?;
                let params = signature
                    .params
                    .iter()
                    .map(|param| self.eval_type(param))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::FunctionSignature(FunctionSignature {
                    owner,
                    name,
                    return_type,
                    params,
                }))
            }
            ExprKind::PreproClass(class) => self.instantiate(class, range),
            ExprKind::SelectorReference(name) => {
                let scope = Rc::clone(self.top()?.scope());
                match self.resolvers.selectors.resolve(&scope, name) {
                    Some(_) => Ok(Value::Selector(name.clone())),
                    None => Err(Error::unresolved(SymbolKind::Selector, name.clone(), range)),
                }
            }
            ExprKind::Instruction(instruction) => {
                Ok(Value::Instruction(Box::new(self.bind_instruction(instruction)?)))
            }
        }
    }

    /// Evaluates a condition of an `if`, `assert` or short-circuit operator.
    pub(crate) fn condition(&mut self, expr: &'a Expr) -> Result<bool> {
        match self.eval_expr(expr)? {
            Value::Bool(value) => Ok(value),
            other => Err(type_mismatch(
                format!("Condition must be of type bool but got {}", other.ty()),
                expr.range,
            )),
        }
    }

    fn eval_name(&mut self, expr: &'a Expr) -> Result<String> {
        match self.eval_expr(expr)? {
            Value::String(name) => Ok(name),
            other => Err(type_mismatch(
                format!("Expected a name but got {} of type {}", other, other.ty()),
                expr.range,
            )),
        }
    }

    // ===== OPERATORS =====

    fn eval_binary(&mut self, binary: &'a BinaryExpr, range: TokenRange) -> Result<Value> {
        if binary.op.is_assignment() {
            return self.eval_assignment(binary, range);
        }
        match binary.op {
            BinaryOp::ScAnd => Ok(Value::Bool(
                self.condition(&binary.lhs)? && self.condition(&binary.rhs)?,
            )),
            BinaryOp::ScOr => Ok(Value::Bool(
                self.condition(&binary.lhs)? || self.condition(&binary.rhs)?,
            )),
            op => {
                let lhs = self.eval_expr(&binary.lhs)?;
                let rhs = self.eval_expr(&binary.rhs)?;
                ops::binary(op, &lhs, &rhs, range)
            }
        }
    }

    fn eval_unary(&mut self, unary: &'a UnaryExpr, range: TokenRange) -> Result<Value> {
        if !unary.op.is_increment() {
            let operand = self.eval_expr(&unary.operand)?;
            return ops::unary(unary.op, &operand, range);
        }
        let old = self.eval_expr(&unary.operand)?;
        let up = matches!(unary.op, UnaryOp::PreInc | UnaryOp::PostInc);
        let new = ops::step(&old, up, range)?;
        self.store(&unary.operand, new.clone(), range)?;
        Ok(match unary.op {
            UnaryOp::PreInc | UnaryOp::PreDec => new,
            _ => old,
        })
    }

    // ===== ASSIGNMENT =====

    fn eval_assignment(&mut self, binary: &'a BinaryExpr, range: TokenRange) -> Result<Value> {
        let value = match binary.op.compound_base() {
            Some(base) => {
                let current = self.eval_expr(&binary.lhs)?;
                let rhs = self.eval_expr(&binary.rhs)?;
                ops::binary(base, &current, &rhs, range)?
            }
            None => self.eval_expr(&binary.rhs)?,
        };
        self.store(&binary.lhs, value, range)?;
        Ok(Value::Unit)
    }

    /// Writes `value` to an assignable expression.
    pub(crate) fn store(&mut self, target: &'a Expr, value: Value, range: TokenRange) -> Result<()> {
        let range = target.range.or(range);
        match &target.kind {
            ExprKind::Reference(reference) => self.assign(&reference.name, value, range),
            ExprKind::ArrayAccess(access) => {
                let container = self.eval_expr(&access.reference)?;
                let index = self.eval_expr(&access.index)?;
                let updated = with_element(container, &index, value, range)?;
                self.store(&access.reference, updated, range)
            }
            _ => Err(interpretation_error_at(
                format!("Cannot assign to {}", target),
                range,
            )),
        }
    }

    fn assign(&mut self, name: &str, value: Value, range: TokenRange) -> Result<()> {
        if let Some(define) = self.intrinsic_define(name) {
            return self.write_intrinsic(&define, value, range);
        }
        if let Some(current) = self.top()?.named(name) {
            let ty = current.ty();
            let value = self.coerce(value, &ty, range, || format!("'{}'", name))?;
            self.top_mut()?.named.insert(name.to_string(), value);
            return Ok(());
        }
        let Some((define, scope)) = self.find_define(name) else {
            return Err(Error::unresolved(SymbolKind::Define, name, range));
        };
        interp_ensure!(
            !define.is_final,
            format!("Cannot reassign final define '{}'", name),
            range
        );
        let ty = if define.ty.is_unit() {
            self.define_value(define, Rc::clone(&scope), range)?.ty()
        } else {
            self.literal_type_in(&define.ty, &scope)?
        };
        let value = self.coerce(value, &ty, range, || format!("define '{}'", name))?;
        trace!("define {} := {}", name, value);
        self.define_values.insert(NodeKey::of(define), value);
        Ok(())
    }

    // ===== COMPOSITES =====

    fn eval_array(&mut self, array: &'a ArrayExpr, range: TokenRange) -> Result<Value> {
        let values = array
            .values
            .iter()
            .map(|value| self.eval_expr(value))
            .collect::<Result<Vec<_>>>()?;
        let element_type = match &array.element_type {
            Some(ty) => self.eval_type(ty)?,
            None if values.is_empty() => Type::OBJECT,
            None => {
                let types = values.iter().map(Value::ty).collect::<Vec<_>>();
                common_type(&types).ok_or_else(|| {
                    type_mismatch("Cannot infer a common element type for array", range)
                })?
            }
        };
        let values = values
            .into_iter()
            .map(|value| self.coerce(value, &element_type, range, || "array element".to_string()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::array(element_type, values))
    }

    fn eval_range(&mut self, bounds: &'a RangeExpr, range: TokenRange) -> Result<Value> {
        let start = self.eval_expr(&bounds.start)?;
        let end = self.eval_expr(&bounds.end)?;
        let element_type = common_type([&start.ty(), &end.ty()])
            .filter(|ty| matches!(ty.category(), TypeCategory::Integer | TypeCategory::Char))
            .ok_or_else(|| {
                type_mismatch(
                    format!(
                        "Range bounds must be integers or chars but got {} and {}",
                        start.ty(),
                        end.ty()
                    ),
                    range,
                )
            })?;
        let mut value = RangeValue::new(element_type, &start, &end).map_err(|error| error.at(range))?;
        if bounds.inclusive {
            value.include_end().map_err(|error| error.at(range))?;
        }
        Ok(Value::Range(value))
    }

    fn instantiate(&mut self, class: &'a PreproClassExpr, range: TokenRange) -> Result<Value> {
        let scope = Rc::clone(self.top()?.scope());
        let decl = self
            .resolvers
            .classes
            .resolve(&scope, &class.name)
            .ok_or_else(|| Error::unresolved(SymbolKind::Type, class.name.clone(), range))?;
        let mut values: Vec<Option<Value>> = vec![None; decl.fields.len()];
        let mut position = 0;
        for argument in &class.arguments {
            let index = match &argument.name {
                Some(name) => decl
                    .fields
                    .iter()
                    .position(|field| &field.name == name)
                    .ok_or_else(|| {
                        interpretation_error_at(
                            format!("Compile-time class {} has no field '{}'", class.name, name),
                            argument.value.range,
                        )
                    })?,
                None => {
                    position += 1;
                    position - 1
                }
            };
            let slot = values.get_mut(index).ok_or_else(|| {
                interpretation_error_at(
                    format!("Too many arguments for compile-time class {}", class.name),
                    argument.value.range,
                )
            })?;
            interp_ensure!(
                slot.is_none(),
                format!(
                    "Field '{}' of {} is given more than once",
                    decl.fields[index].name, class.name
                ),
                argument.value.range
            );
            *slot = Some(self.eval_expr(&argument.value)?);
        }
        let mut fields = Vec::with_capacity(decl.fields.len());
        for (field, value) in decl.fields.iter().zip(values) {
            let ty = self.literal_type_in(&field.ty, &scope)?;
            let value = match value {
                Some(value) => self.coerce(value, &ty, range, || format!("field '{}'", field.name))?,
                None => self.default_value(&ty, range)?,
            };
            fields.push((field.name.clone(), value));
        }
        Ok(Value::Class(PreproClassValue {
            name: class.name.clone(),
            fields,
        }))
    }

    // ===== BRANCHES =====

    pub(crate) fn eval_if(&mut self, expr: &'a IfExpr, position: Position) -> Result<Value> {
        let mark = self.top()?.values.len();
        let branch = self.try_branches(expr)?;
        self.branch_result(branch, position, mark)
    }

    fn try_branches(&mut self, expr: &'a IfExpr) -> Result<Branch> {
        if self.condition(&expr.condition)? {
            self.evaluate_scoped(ScopeOwner::If(expr))?;
            return Ok(Branch::Taken);
        }
        for branch in &expr.else_ifs {
            if self.condition(&branch.condition)? {
                self.evaluate_scoped(ScopeOwner::ElseIf(branch))?;
                return Ok(Branch::Taken);
            }
        }
        if let Some(branch) = &expr.else_branch {
            self.evaluate_scoped(ScopeOwner::Else(branch))?;
            return Ok(Branch::Taken);
        }
        Ok(Branch::Skipped)
    }

    pub(crate) fn eval_when(&mut self, expr: &'a WhenExpr, position: Position) -> Result<Value> {
        let mark = self.top()?.values.len();
        let subject = self.eval_expr(&expr.value)?;
        let mut branch = Branch::Skipped;
        for candidate in &expr.branches {
            let condition = self.eval_expr(&candidate.condition)?;
            if when_matches(&subject, &condition) {
                self.run_when_branch(candidate)?;
                branch = Branch::Taken;
                break;
            }
        }
        if branch == Branch::Skipped {
            if let Some(default) = &expr.default {
                self.run_when_branch(default)?;
                branch = Branch::Taken;
            }
        }
        self.branch_result(branch, position, mark)
    }

    fn run_when_branch(&mut self, branch: &'a WhenBranch) -> Result<()> {
        if branch.is_scoped {
            self.evaluate_scoped(ScopeOwner::When(branch))
        } else {
            self.evaluate_elements(&branch.body)
        }
    }

    /// In value position the last value the taken branch left is the result,
    /// and a `return` inside the branch only ends the branch.
    fn branch_result(&mut self, branch: Branch, position: Position, mark: usize) -> Result<Value> {
        match (position, branch) {
            (Position::Statement, _) => Ok(Value::Unit),
            (Position::Value, Branch::Skipped) => Ok(Value::Unit),
            (Position::Value, Branch::Taken) => {
                self.flow.clear(ControlFlow::Return);
                self.take_result(mark)
            }
        }
    }

    // ===== INSTRUCTIONS =====

    /// Copies `instruction` with every operand replaced by its evaluated value.
    ///
    /// Local and label operands that name nothing visible stay names.
    pub(crate) fn bind_instruction(&mut self, instruction: &'a Instruction) -> Result<Instruction> {
        let mut values = Vec::new();
        for (index, operand) in instruction.operands().into_iter().enumerate() {
            let value = match &operand.kind {
                ExprKind::Reference(reference) if takes_name(instruction, index) => self
                    .reference_value(&reference.name, operand.range)?
                    .unwrap_or_else(|| Value::String(reference.name.clone())),
                _ => self.eval_expr(operand)?,
            };
            values.push(value);
        }
        let mut bound = instruction.clone();
        for (operand, value) in bound.operands_mut().into_iter().zip(values) {
            *operand = Expr::literal(value).with_range(operand.range);
        }
        Ok(bound)
    }

    /// Encodes a bound instruction into the current frame.
    pub(crate) fn emit(&mut self, instruction: &Instruction) -> Result<()> {
        let root = self.root_index()?;
        let owner = self.frames[root].owner();
        match owner.kind() {
            ScopeOwnerKind::Function | ScopeOwnerKind::Injector => {}
            ScopeOwnerKind::Macro => {
                debug!("dropping {} emitted inside {}", instruction, owner.describe());
                return Ok(());
            }
            _ => {
                return Err(interpretation_error_at(
                    format!(
                        "Instruction '{}' cannot be used outside of a function or injector",
                        instruction
                    ),
                    instruction.range,
                ))
            }
        }
        let slots = &mut self.frames[root].slots;
        if let InstructionKind::Label(label) = &instruction.kind {
            slots.place(&label.name, instruction.range)?;
        }
        let node = encode(instruction, &mut FrameEncoder { slots })?;
        self.top_mut()?.instructions.push(node);
        Ok(())
    }

    /// Emits instruction values; any other value is left on the value stack.
    pub(crate) fn consume_statement_value(&mut self, value: Value) -> Result<()> {
        match value {
            Value::Unit => Ok(()),
            Value::Instruction(instruction) => self.emit(&instruction),
            Value::Array(array)
                if !array.values.is_empty()
                    && array.values.iter().all(|it| matches!(it, Value::Instruction(_))) =>
            {
                for value in &array.values {
                    if let Value::Instruction(instruction) = value {
                        self.emit(instruction)?;
                    }
                }
                Ok(())
            }
            other => self.push_value(other),
        }
    }
}

fn element_of(container: &Value, index: &Value, range: TokenRange) -> Result<Value> {
    match (container, index) {
        (Value::Array(array), Value::Range(slice)) => {
            let (start, end) = slice_bounds(slice, array.values.len(), range)?;
            Ok(Value::array(
                array.element_type.clone(),
                array.values[start..end].to_vec(),
            ))
        }
        (Value::Array(array), _) => {
            let index = index_of(index, array.values.len(), range)?;
            Ok(array.values[index].clone())
        }
        (Value::String(text), Value::Range(slice)) => {
            let chars = text.chars().collect::<Vec<_>>();
            let (start, end) = slice_bounds(slice, chars.len(), range)?;
            Ok(Value::String(chars[start..end].iter().collect()))
        }
        (Value::String(text), _) => {
            let chars = text.chars().collect::<Vec<_>>();
            let index = index_of(index, chars.len(), range)?;
            Ok(Value::Char(chars[index]))
        }
        (Value::Class(class), Value::String(field)) => class.field(field).cloned().ok_or_else(|| {
            interpretation_error_at(
                format!("Compile-time class {} has no field '{}'", class.name, field),
                range,
            )
        }),
        _ => Err(type_mismatch(
            format!("Cannot index value of type {} with {}", container.ty(), index.ty()),
            range,
        )),
    }
}

fn with_element(container: Value, index: &Value, value: Value, range: TokenRange) -> Result<Value> {
    let convert = |value: Value, ty: &Type| {
        if !ty.is_assignable_from(&value.ty()) {
            return Err(type_mismatch(
                format!("Cannot store value of type {} as {}", value.ty(), ty),
                range,
            ));
        }
        value.cast(ty).map_err(|error| error.at(range))
    };
    match (container, index) {
        (Value::Array(mut array), _) => {
            let index = index_of(index, array.values.len(), range)?;
            array.values[index] = convert(value, &array.element_type)?;
            Ok(Value::Array(array))
        }
        (Value::String(text), _) => {
            let mut chars = text.chars().collect::<Vec<_>>();
            let index = index_of(index, chars.len(), range)?;
            match convert(value, &Type::CHAR)? {
                Value::Char(char) => chars[index] = char,
                other => return Err(type_mismatch(format!("Expected a char but got {}", other), range)),
            }
            Ok(Value::String(chars.into_iter().collect()))
        }
        (Value::Class(mut class), Value::String(name)) => {
            let (_, slot) = class
                .fields
                .iter_mut()
                .find(|(field, _)| field == name)
                .ok_or_else(|| {
                    interpretation_error_at(
                        format!("Compile-time class {} has no field '{}'", class.name, name),
                        range,
                    )
                })?;
            *slot = convert(value, &slot.ty())?;
            Ok(Value::Class(class))
        }
        (container, index) => Err(type_mismatch(
            format!("Cannot index value of type {} with {}", container.ty(), index.ty()),
            range,
        )),
    }
}

fn contains(container: &Value, value: &Value, range: TokenRange) -> Result<bool> {
    Ok(match (container, value) {
        (Value::String(text), _) => text.contains(&value.to_string()),
        (Value::Array(array), _) => array.values.iter().any(|it| ops::equals(it, value)),
        (Value::Range(bounds), _) => value.as_i64().is_some_and(|it| bounds.contains(it)),
        (Value::Type(ty), Value::Type(other)) => {
            let alternatives = ty.unfold();
            other.unfold().iter().all(|it| alternatives.contains(it))
        }
        (Value::FunctionSignature(signature), Value::String(name)) => &signature.name == name,
        (Value::FunctionSignature(signature), Value::Type(ty)) => {
            &signature.owner == ty || &signature.return_type == ty || signature.params.contains(ty)
        }
        (Value::FieldSignature(signature), Value::String(name)) => &signature.name == name,
        (Value::FieldSignature(signature), Value::Type(ty)) => {
            &signature.owner == ty || &signature.ty == ty
        }
        _ => {
            return Err(type_mismatch(
                format!(
                    "Cannot check whether {} is in a value of type {}",
                    value.ty(),
                    container.ty()
                ),
                range,
            ))
        }
    })
}

fn size_of(value: &Value, range: TokenRange) -> Result<Value> {
    let size = match value {
        Value::Type(Type::Builtin(builtin))
            if !matches!(builtin, BuiltinType::Object | BuiltinType::String) =>
        {
            builtin.byte_size() as usize
        }
        Value::String(text) => text.chars().count(),
        Value::Array(array) => array.values.len(),
        Value::Range(bounds) => bounds.len(),
        other => {
            return Err(type_mismatch(
                format!("Incompatible type {} for sizeof-expression", other.ty()),
                range,
            ))
        }
    };
    i32::try_from(size)
        .map(Value::I32)
        .map_err(|_| interpretation_error_at(format!("Size {} does not fit into i32", size), range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const AT: TokenRange = TokenRange::Synthetic;

    #[test]
    fn indexing_and_slicing() {
        let array = Value::array(Type::I32, vec![Value::I32(1), Value::I32(2), Value::I32(3)]);
        assert_eq!(element_of(&array, &Value::I32(1), AT).unwrap(), Value::I32(2));
        let slice = Value::Range(RangeValue {
            element_type: Type::I32,
            start: 1,
            end: 3,
        });
        assert_eq!(
            element_of(&array, &slice, AT).unwrap(),
            Value::array(Type::I32, vec![Value::I32(2), Value::I32(3)])
        );
        assert_eq!(
            element_of(&Value::from("hello"), &slice, AT).unwrap(),
            Value::from("el")
        );
        let error = element_of(&array, &Value::I32(3), AT).unwrap_err();
        assert_eq!(error.to_string(), "Index 3 out of bounds for length 3");
    }

    #[test]
    fn element_writes_are_typed() {
        let array = Value::array(Type::I64, vec![Value::I64(0)]);
        let updated = with_element(array.clone(), &Value::I32(0), Value::I8(7), AT).unwrap();
        assert_eq!(updated, Value::array(Type::I64, vec![Value::I64(7)]));
        assert!(with_element(array, &Value::I32(0), Value::from("x"), AT).is_err());
    }

    #[test]
    fn membership() {
        let range = Value::Range(RangeValue {
            element_type: Type::I32,
            start: 0,
            end: 10,
        });
        assert!(contains(&range, &Value::I32(9), AT).unwrap());
        assert!(!contains(&range, &Value::I32(10), AT).unwrap());
        assert!(contains(&Value::from("abc"), &Value::Char('b'), AT).unwrap());
        let intersection = Value::Type(Type::Intersection(vec![Type::I32, Type::I64]));
        assert!(contains(&intersection, &Value::Type(Type::I64), AT).unwrap());
        assert!(contains(&Value::Bool(true), &Value::I32(1), AT).is_err());
    }

    #[test]
    fn sizes() {
        assert_eq!(size_of(&Value::Type(Type::I64), AT).unwrap(), Value::I32(8));
        assert_eq!(size_of(&Value::from("four"), AT).unwrap(), Value::I32(4));
        assert!(size_of(&Value::Type(Type::STRING), AT).is_err());
    }

    #[test]
    fn when_conditions_match_ranges_and_arrays() {
        let range = Value::Range(RangeValue {
            element_type: Type::I32,
            start: 0,
            end: 3,
        });
        assert!(when_matches(&Value::I32(2), &range));
        let options = Value::array(Type::I32, vec![Value::I32(4), Value::I32(5)]);
        assert!(when_matches(&Value::I8(5), &options));
        assert!(!when_matches(&Value::I32(6), &options));
    }
}
