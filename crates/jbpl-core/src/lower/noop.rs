use crate::ast::visit::{walk_declaration, walk_statement, Transformer};
use crate::ast::*;
use crate::error::Result;

/// Drops no-op statements and empty declarations.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRemoval;

impl Transformer for NoopRemoval {
    fn transform_element(&mut self, element: Element) -> Result<Vec<Element>> {
        match element {
            Element::Declaration(Declaration {
                kind: DeclarationKind::Empty,
                ..
            }) => Ok(Vec::new()),
            Element::Declaration(decl) => Ok(vec![Element::Declaration(walk_declaration(self, decl)?)]),
            Element::Statement(stmt) => Ok(self
                .transform_statement(stmt)?
                .into_iter()
                .map(Element::Statement)
                .collect()),
            Element::Expr(expr) => Ok(vec![Element::Expr(self.transform_expr(expr)?)]),
        }
    }

    fn transform_statement(&mut self, stmt: Statement) -> Result<Vec<Statement>> {
        if matches!(stmt.kind, StatementKind::Noop) {
            return Ok(Vec::new());
        }
        Ok(vec![walk_statement(self, stmt)?])
    }
}
