use crate::ast::visit::{walk_statement, Transformer};
use crate::ast::*;
use crate::error::Result;

/// Splices the statements of every compound statement into the parent list.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompoundLowering;

impl Transformer for CompoundLowering {
    fn transform_statement(&mut self, stmt: Statement) -> Result<Vec<Statement>> {
        let stmt = walk_statement(self, stmt)?;
        Ok(match stmt.kind {
            StatementKind::Compound(compound) => compound.statements,
            kind => vec![Statement {
                kind,
                range: stmt.range,
            }],
        })
    }
}
