//! The Element tree: declarations, statements, expressions and instructions.
//!
//! Children are owned by value and there are no parent pointers; `Clone`
//! is the deep, detached copy. Scope and ancestor information is carried by
//! [`crate::scope::Scope`] chains instead.

mod decl;
mod display;
mod expr;
mod instruction;
mod stmt;
pub mod visit;

pub use decl::*;
pub use expr::*;
pub use instruction::*;
pub use stmt::*;

use std::any::TypeId;

use derive_more::From;

use crate::span::TokenRange;
use crate::{common_enum, common_struct};

common_enum! {
    #[derive(From)]
    pub enum Element {
        Declaration(Declaration),
        Statement(Statement),
        Expr(Expr),
    }
}

impl Element {
    pub fn range(&self) -> TokenRange {
        match self {
            Element::Declaration(decl) => decl.range,
            Element::Statement(stmt) => stmt.range,
            Element::Expr(expr) => expr.range,
        }
    }

    /// Macros, compile-time classes, selectors, injectors, defines and type aliases are only
    /// reached through references; everything else runs when its container runs.
    pub fn is_evaluated_directly(&self) -> bool {
        match self {
            Element::Declaration(decl) => decl.is_evaluated_directly(),
            Element::Statement(stmt) => stmt.is_evaluated_directly(),
            Element::Expr(_) => true,
        }
    }

    pub fn as_declaration(&self) -> Option<&Declaration> {
        match self {
            Element::Declaration(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn as_statement(&self) -> Option<&Statement> {
        match self {
            Element::Statement(stmt) => Some(stmt),
            _ => None,
        }
    }

    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Element::Expr(expr) => Some(expr),
            _ => None,
        }
    }
}

impl From<Instruction> for Element {
    fn from(instruction: Instruction) -> Self {
        Element::Statement(Statement::from(instruction))
    }
}

common_struct! {
    /// Root of one source unit.
    pub struct AssemblyFile {
        pub path: String,
        pub elements: Vec<Element>,
        pub range: TokenRange,
    }
}

impl AssemblyFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            elements: Vec::new(),
            range: TokenRange::Undefined,
        }
    }

    pub fn with_elements(mut self, elements: impl IntoIterator<Item = Element>) -> Self {
        self.elements.extend(elements);
        self
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ===== CONTAINER PROTOCOLS =====

/// A node holding an ordered list of arbitrary elements. Order is evaluation order.
pub trait ElementContainer {
    fn elements(&self) -> &[Element];
    fn elements_mut(&mut self) -> &mut Vec<Element>;

    fn add_element(&mut self, element: impl Into<Element>)
    where
        Self: Sized,
    {
        self.elements_mut().push(element.into());
    }

    fn add_elements(&mut self, elements: impl IntoIterator<Item = Element>)
    where
        Self: Sized,
    {
        self.elements_mut().extend(elements);
    }

    fn remove_element(&mut self, index: usize) -> Option<Element> {
        (index < self.elements().len()).then(|| self.elements_mut().remove(index))
    }

    fn clear_elements(&mut self) {
        self.elements_mut().clear();
    }
}

/// A node holding an ordered list of statements only.
pub trait StatementContainer {
    fn statements(&self) -> &[Statement];
    fn statements_mut(&mut self) -> &mut Vec<Statement>;

    fn add_statement(&mut self, statement: impl Into<Statement>)
    where
        Self: Sized,
    {
        self.statements_mut().push(statement.into());
    }

    fn remove_statement(&mut self, index: usize) -> Option<Statement> {
        (index < self.statements().len()).then(|| self.statements_mut().remove(index))
    }

    fn clear_statements(&mut self) {
        self.statements_mut().clear();
    }
}

/// A node holding an ordered list of expressions only.
pub trait ExprContainer {
    fn exprs(&self) -> &[Expr];
    fn exprs_mut(&mut self) -> &mut Vec<Expr>;

    fn add_expr(&mut self, expr: Expr) {
        self.exprs_mut().push(expr);
    }

    fn remove_expr(&mut self, index: usize) -> Option<Expr> {
        (index < self.exprs().len()).then(|| self.exprs_mut().remove(index))
    }

    fn clear_exprs(&mut self) {
        self.exprs_mut().clear();
    }
}

macro_rules! element_container {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl ElementContainer for $ty {
                fn elements(&self) -> &[Element] {
                    &self.$field
                }

                fn elements_mut(&mut self) -> &mut Vec<Element> {
                    &mut self.$field
                }
            }
        )*
    };
}

element_container! {
    AssemblyFile => elements,
    FunctionDecl => body,
    MacroDecl => body,
    BlockDecl => body,
    InjectorDecl => body,
    IfExpr => body,
    ElseIfBranch => body,
    ElseBranch => body,
    WhenBranch => body,
    ForStatement => body,
}

impl StatementContainer for CompoundStatement {
    fn statements(&self) -> &[Statement] {
        &self.statements
    }

    fn statements_mut(&mut self) -> &mut Vec<Statement> {
        &mut self.statements
    }
}

impl ExprContainer for ArrayExpr {
    fn exprs(&self) -> &[Expr] {
        &self.values
    }

    fn exprs_mut(&mut self) -> &mut Vec<Expr> {
        &mut self.values
    }
}

impl ExprContainer for StringLerpExpr {
    fn exprs(&self) -> &[Expr] {
        &self.parts
    }

    fn exprs_mut(&mut self) -> &mut Vec<Expr> {
        &mut self.parts
    }
}

/// Identity of a node inside a tree that is not mutated while the key is in use.
///
/// A node may start at the same address as its first inline child, so the
/// node type is part of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey(TypeId, usize);

impl NodeKey {
    pub fn of<T: 'static>(node: &T) -> NodeKey {
        NodeKey(TypeId::of::<T>(), node as *const T as usize)
    }
}
