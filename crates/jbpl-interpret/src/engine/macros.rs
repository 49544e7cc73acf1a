use super::*;

use itertools::Itertools;
use jbpl_core::types::{match_best, TypeList};

use crate::intrinsics::IntrinsicCall;

/// How the arguments of a call map onto one macro's parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    /// Parameter index of every argument, in call order.
    Bound(Vec<usize>),
    /// Every argument found a parameter, but this one got none.
    Missing(String),
    /// An argument names an unknown parameter, repeats one, or has no room left.
    Rejected,
}

fn bind_arguments(decl: &MacroDecl, names: &[Option<&str>]) -> Binding {
    let mut bound = vec![false; decl.parameters.len()];
    let mut order = Vec::with_capacity(names.len());
    let mut next = 0;
    for name in names {
        let index = match name {
            Some(name) => match decl.parameters.iter().position(|it| it.name == *name) {
                Some(index) => index,
                None => return Binding::Rejected,
            },
            None => {
                while next < bound.len() && bound[next] {
                    next += 1;
                }
                if next == bound.len() {
                    return Binding::Rejected;
                }
                next
            }
        };
        if bound[index] {
            return Binding::Rejected;
        }
        bound[index] = true;
        order.push(index);
    }
    match bound.iter().position(|it| !it) {
        Some(index) => Binding::Missing(decl.parameters[index].name.clone()),
        None => Binding::Bound(order),
    }
}

impl<'a> EvaluationContext<'a> {
    pub(crate) fn call_macro(&mut self, call: &'a MacroCallExpr, range: TokenRange) -> Result<Value> {
        let mut names = Vec::with_capacity(call.arguments.len());
        let mut arguments = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            names.push(argument.name.as_deref());
            arguments.push(self.eval_expr(&argument.value)?);
        }

        let intrinsic = self.top()?.intrinsic_macros.get(&call.name).cloned();
        if let Some(intrinsic) = intrinsic {
            let frame = self.top()?;
            return intrinsic
                .call(&IntrinsicCall {
                    name: &call.name,
                    arguments: &arguments,
                    frame,
                    range,
                })
                .map_err(|error| error.at(range));
        }

        let scope = Rc::clone(self.top()?.scope());
        let candidates = self.resolvers.macros.resolve_overloads(&scope, &call.name);
        if candidates.is_empty() {
            return Err(Error::unresolved(SymbolKind::Macro, call.name.clone(), range));
        }

        let mut viable = Vec::with_capacity(candidates.len());
        let mut missing = None;
        for &candidate in &candidates {
            match bind_arguments(candidate, &names) {
                Binding::Bound(order) => {
                    let parameters = self.parameter_types(candidate)?;
                    let types = order.iter().map(|index| parameters[*index].clone()).collect();
                    viable.push(TypeList::new(types, (candidate, order)));
                }
                Binding::Missing(parameter) => missing = Some(parameter),
                Binding::Rejected => {}
            }
        }
        if let (true, Some(parameter)) = (candidates.len() == 1 && viable.is_empty(), missing) {
            return Err(interpretation_error_at(
                format!(
                    "Missing argument for parameter '{}' in call to macro {}",
                    parameter, call.name
                ),
                range,
            ));
        }

        let argument_types: Vec<Type> = arguments.iter().map(Value::ty).collect();
        let Some(matched) = match_best(viable, &argument_types) else {
            return Err(Error::type_mismatch(
                format!(
                    "No overload of macro {} accepts ({})",
                    call.name,
                    argument_types.iter().join(", ")
                ),
                range,
            ));
        };
        if matched.is_ambiguous() {
            return Err(Error::AmbiguousOverload {
                message: format!(
                    "Call to macro {} with ({}) is ambiguous",
                    call.name,
                    argument_types.iter().join(", ")
                ),
                range,
            });
        }

        let (decl, order) = matched.best.data;
        let mut ordered = vec![Value::Unit; decl.parameters.len()];
        for ((argument, ty), index) in arguments.into_iter().zip(&matched.best.types).zip(order) {
            ordered[index] = argument.cast(ty).map_err(|error| error.at(range))?;
        }
        self.invoke_macro(decl, ordered, range)
    }

    /// Runs a macro body with already bound arguments in parameter order.
    fn invoke_macro(&mut self, decl: &'a MacroDecl, arguments: Vec<Value>, range: TokenRange) -> Result<Value> {
        let scope = self.scope_of(ScopeOwner::Macro(decl));
        let return_type = if decl.return_type.is_unit() {
            Type::VOID
        } else {
            self.literal_type_in(&decl.return_type, &scope)?
        };

        // caller values stay visible; parameters shadow them
        let mut frame = self.frame(Rc::clone(&scope)).arguments(arguments.clone());
        for (parameter, value) in decl.parameters.iter().zip(arguments) {
            frame = frame.value(parameter.name.clone(), value);
        }

        let mark = self.top()?.values.len();
        self.push_frame(frame.build())?;
        self.evaluate_elements(&decl.body)?;
        self.finish_callable(range)?;
        self.pop_frame()?;
        let result = self.take_result(mark)?;

        if return_type.is_void() {
            return Ok(Value::Unit);
        }
        interp_ensure!(
            !result.is_unit(),
            format!("Macro {} must return a value of type {}", decl.name, return_type),
            range
        );
        self.coerce(result, &return_type, range, || format!("return value of macro {}", decl.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decl(parameters: &[&str]) -> MacroDecl {
        MacroDecl::new(
            "m",
            parameters
                .iter()
                .map(|name| MacroParameter {
                    name: name.to_string(),
                    ty: Expr::ty(Type::I32),
                })
                .collect(),
            Expr::unit(),
            Vec::new(),
        )
    }

    #[test]
    fn positional_arguments_fill_the_first_free_parameter() {
        let decl = decl(&["a", "b", "c"]);
        assert_eq!(
            bind_arguments(&decl, &[Some("b"), None, None]),
            Binding::Bound(vec![1, 0, 2])
        );
        assert_eq!(
            bind_arguments(&decl, &[None, Some("c")]),
            Binding::Missing("b".to_string())
        );
    }

    #[test]
    fn unknown_and_repeated_names_reject_the_candidate() {
        let decl = decl(&["a", "b"]);
        assert_eq!(bind_arguments(&decl, &[Some("z")]), Binding::Rejected);
        assert_eq!(bind_arguments(&decl, &[Some("a"), Some("a")]), Binding::Rejected);
        assert_eq!(bind_arguments(&decl, &[None, None, None]), Binding::Rejected);
    }
}
