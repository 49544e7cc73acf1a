use jbpl_bytecode::ClassVersion;

use crate::ast::*;
use crate::error::{Error, Result};
use crate::span::TokenRange;

/// Structural checks on a file as parsed, before any pass runs.
pub fn validate_file(file: &AssemblyFile) -> Result<()> {
    let mut validator = Validator::default();
    validator.visit(&file.elements, Context::TopLevel)?;
    Ok(())
}

/// Every literal `version` statement must name a known class-file version.
pub fn validate_versions(file: &AssemblyFile) -> Result<()> {
    for element in &file.elements {
        let Some(Statement {
            kind: StatementKind::Version(version),
            range,
        }) = element.as_statement()
        else {
            continue;
        };
        let ExprKind::Literal(value) = &version.version.kind else {
            continue;
        };
        let number = value.as_i64().ok_or_else(|| {
            Error::lowering(format!("{} is not a valid class file version", value), *range)
        })?;
        if ClassVersion::from_number(number).is_err() {
            return Err(Error::lowering(
                format!("{} is not a valid class file version", number),
                *range,
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    TopLevel,
    Nested,
    /// Inside a macro body, where code after a `return` is rejected.
    Macro,
}

#[derive(Default)]
struct Validator {
    versions: usize,
}

impl Validator {
    fn visit(&mut self, elements: &[Element], context: Context) -> Result<()> {
        let mut returned = false;
        for element in elements {
            if returned && context == Context::Macro {
                return Err(Error::lowering("Statement can never be reached", element.range()));
            }
            match element {
                Element::Declaration(decl) => self.visit_declaration(decl, context)?,
                Element::Statement(stmt) => {
                    returned |= matches!(stmt.kind, StatementKind::Return(_));
                    self.visit_statement(stmt, context)?;
                }
                Element::Expr(expr) => self.visit_expr(expr, context)?,
            }
        }
        Ok(())
    }

    fn inner(context: Context) -> Context {
        match context {
            Context::TopLevel => Context::Nested,
            other => other,
        }
    }

    fn check_private(is_private: bool, context: Context, range: TokenRange) -> Result<()> {
        if is_private && context != Context::TopLevel {
            return Err(Error::lowering(
                "Private modifier can only be applied to top-level define/macro/type alias",
                range,
            ));
        }
        Ok(())
    }

    fn visit_declaration(&mut self, decl: &Declaration, context: Context) -> Result<()> {
        match &decl.kind {
            DeclarationKind::Function(function) => self.visit(&function.body, Self::inner(context)),
            DeclarationKind::Macro(macro_decl) => {
                Self::check_private(macro_decl.is_private, context, decl.range)?;
                self.visit(&macro_decl.body, Context::Macro)
            }
            DeclarationKind::Injector(injector) => self.visit(&injector.body, Self::inner(context)),
            DeclarationKind::Block(block) => self.visit(&block.body, Self::inner(context)),
            _ => Ok(()),
        }
    }

    fn visit_statement(&mut self, stmt: &Statement, context: Context) -> Result<()> {
        match &stmt.kind {
            StatementKind::Include(_) if context != Context::TopLevel => Err(Error::lowering(
                "Include statement must appear at the top level only",
                stmt.range,
            )),
            StatementKind::Version(_) => {
                self.versions += 1;
                if self.versions > 1 {
                    return Err(Error::lowering(
                        "Cannot set bytecode version more than once per file",
                        stmt.range,
                    ));
                }
                Ok(())
            }
            StatementKind::Define(define) => {
                Self::check_private(define.is_private, context, stmt.range)?;
                self.visit_expr(&define.value, Self::inner(context))
            }
            StatementKind::TypeAlias(alias) => {
                Self::check_private(alias.is_private, context, stmt.range)
            }
            StatementKind::For(for_stmt) => self.visit(&for_stmt.body, Self::inner(context)),
            StatementKind::Return(ReturnStatement { value: Some(value) }) => {
                self.visit_expr(value, Self::inner(context))
            }
            StatementKind::Compound(compound) => {
                for stmt in &compound.statements {
                    self.visit_statement(stmt, context)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn visit_expr(&mut self, expr: &Expr, context: Context) -> Result<()> {
        let context = Self::inner(context);
        match &expr.kind {
            ExprKind::If(if_expr) => {
                self.visit(&if_expr.body, context)?;
                for branch in &if_expr.else_ifs {
                    self.visit(&branch.body, context)?;
                }
                if let Some(branch) = &if_expr.else_branch {
                    self.visit(&branch.body, context)?;
                }
                Ok(())
            }
            ExprKind::When(when) => {
                for branch in when.branches.iter().chain(when.default.as_deref()) {
                    self.visit(&branch.body, context)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    fn version(number: i32) -> Element {
        Element::from(VersionStatement {
            version: Expr::literal(number),
        })
    }

    #[test]
    fn rejects_second_version_statement() {
        let file = AssemblyFile::new("a.jbpl").with_elements([version(17), version(21)]);
        let error = validate_file(&file).unwrap_err();
        assert!(error.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_nested_private_define() {
        let mut define = DefineStatement::new("x", Expr::ty(Type::I32), Expr::literal(1));
        define.is_private = true;
        let block = BlockDecl {
            name: "b".into(),
            body: vec![Element::from(define)],
        };
        let file = AssemblyFile::new("a.jbpl").with_elements([Element::from(block)]);
        assert!(validate_file(&file).is_err());
    }

    #[test]
    fn version_numbers_accept_release_and_major() {
        for number in [8, 17, 61] {
            let file = AssemblyFile::new("a.jbpl").with_elements([version(number)]);
            validate_versions(&file).unwrap();
        }
        let file = AssemblyFile::new("a.jbpl").with_elements([version(99)]);
        let error = validate_versions(&file).unwrap_err();
        assert!(error.to_string().contains("99 is not a valid class file version"));
    }
}
