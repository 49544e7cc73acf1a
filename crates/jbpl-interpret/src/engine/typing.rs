use super::*;

use jbpl_core::types::TypeEnvironment;

/// Type aliases and compile-time classes as seen from one scope.
pub struct ScopedTypes<'r, 'a> {
    pub resolvers: &'r Resolvers<'a>,
    pub scope: &'r Scope<'a>,
}

fn literal_type(expr: &Expr) -> Option<&Type> {
    match &expr.kind {
        ExprKind::Literal(Value::Type(ty)) => Some(ty),
        _ => None,
    }
}

impl TypeEnvironment for ScopedTypes<'_, '_> {
    fn resolve_alias(&self, name: &str) -> Option<Type> {
        let alias = self.resolvers.aliases.resolve(self.scope, name)?;
        literal_type(&alias.ty).cloned()
    }

    fn prepro_class_fields(&self, name: &str) -> Option<Vec<(String, Type)>> {
        let class = self.resolvers.classes.resolve(self.scope, name)?;
        class
            .fields
            .iter()
            .map(|field| Some((field.name.clone(), literal_type(&field.ty)?.clone())))
            .collect()
    }
}

impl<'a> EvaluationContext<'a> {
    pub(crate) fn types_in<'s>(&'s self, scope: &'s Scope<'a>) -> ScopedTypes<'s, 'a> {
        ScopedTypes {
            resolvers: &self.resolvers,
            scope,
        }
    }

    pub(crate) fn resolve_type(&self, ty: &Type, range: TokenRange) -> Result<Type> {
        let scope = self.top()?.scope();
        ty.resolve(&self.types_in(scope))
            .map_err(|error| error.at(range))
    }

    pub(crate) fn default_value(&self, ty: &Type, range: TokenRange) -> Result<Value> {
        let scope = self.top()?.scope();
        ty.default_value(&self.types_in(scope))
            .map_err(|error| error.at(range))
    }

    /// Evaluates an expression that has to produce a type.
    pub(crate) fn eval_type(&mut self, expr: &'a Expr) -> Result<Type> {
        match self.eval_expr(expr)? {
            Value::Type(ty) => Ok(ty),
            other => Err(Error::type_mismatch(
                format!("Expected a type but got {} of type {}", other, other.ty()),
                expr.range,
            )),
        }
    }

    /// Resolves a declared type in the scope it was declared in.
    pub(crate) fn literal_type_in(&mut self, expr: &'a Expr, scope: &Scope<'a>) -> Result<Type> {
        match literal_type(expr) {
            Some(ty) => ty
                .resolve(&self.types_in(scope))
                .map_err(|error| error.at(expr.range)),
            None => self.eval_type(expr),
        }
    }

    /// Parameter types of a macro, resolved where the macro is declared.
    pub(crate) fn parameter_types(&mut self, decl: &'a MacroDecl) -> Result<Vec<Type>> {
        let scope = self.scope_of(ScopeOwner::Macro(decl));
        decl.parameters
            .iter()
            .map(|parameter| self.literal_type_in(&parameter.ty, &scope))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jbpl_core::types::TypeEnvironment;
    use pretty_assertions::assert_eq;

    fn file() -> AssemblyFile {
        AssemblyFile::new("types.jbpl").with_elements([
            Element::from(TypeAliasStatement {
                name: "Int".into(),
                ty: Expr::ty(Type::I32),
                is_private: false,
            }),
            Element::from(PreproClassDecl::new(
                "Point",
                [
                    ("x".to_string(), Expr::ty(Type::I32)),
                    ("y".to_string(), Expr::ty(Type::Unresolved("Int".into()))),
                ],
            )),
        ])
    }

    #[test]
    fn aliases_and_classes_are_visible_from_the_file_scope() {
        let file = file();
        let index = ScopeIndex::build(&file);
        let resolvers = Resolvers::analyze(&index).unwrap();
        let types = ScopedTypes {
            resolvers: &resolvers,
            scope: index.root(),
        };

        assert_eq!(types.resolve_alias("Int"), Some(Type::I32));
        assert_eq!(
            Type::Unresolved("Point".into()).resolve(&types).unwrap(),
            Type::PreproClass("Point".into())
        );
        let fields = types.prepro_class_fields("Point").unwrap();
        assert_eq!(fields[1].1.resolve(&types).unwrap(), Type::I32);
        assert!(types.resolve_alias("Missing").is_none());
    }
}
