//! Lexical scopes.
//!
//! A [`Scope`] is one link of a chain that mirrors the nesting of scope-owning
//! elements. Chains are built once per lowered file by [`ScopeIndex`] and are
//! shared through `Rc`; every link borrows its owner from the tree.

mod resolver;

pub use resolver::*;

use std::collections::HashMap;
use std::rc::Rc;

use strum_macros::Display;

use crate::ast::*;
use crate::span::TokenRange;

/// What a frame does with its value stack and instruction buffer when it is popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    Nothing,
    Values,
    ValuesAndInstructions,
}

impl MergePolicy {
    pub fn merges_values(self) -> bool {
        !matches!(self, MergePolicy::Nothing)
    }

    pub fn merges_instructions(self) -> bool {
        matches!(self, MergePolicy::ValuesAndInstructions)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScopeOwnerKind {
    File,
    Function,
    Field,
    Macro,
    Selector,
    Injector,
    Block,
    If,
    ElseIf,
    Else,
    When,
    For,
}

/// A borrowed element that introduces a lexical scope.
#[derive(Debug, Clone, Copy)]
pub enum ScopeOwner<'a> {
    File(&'a AssemblyFile),
    Function(&'a FunctionDecl),
    Field(&'a FieldDecl),
    Macro(&'a MacroDecl),
    Selector(&'a SelectorDecl),
    Injector(&'a InjectorDecl),
    Block(&'a BlockDecl),
    If(&'a IfExpr),
    ElseIf(&'a ElseIfBranch),
    Else(&'a ElseBranch),
    When(&'a WhenBranch),
    For(&'a ForStatement),
}

impl<'a> ScopeOwner<'a> {
    pub fn kind(&self) -> ScopeOwnerKind {
        match self {
            ScopeOwner::File(_) => ScopeOwnerKind::File,
            ScopeOwner::Function(_) => ScopeOwnerKind::Function,
            ScopeOwner::Field(_) => ScopeOwnerKind::Field,
            ScopeOwner::Macro(_) => ScopeOwnerKind::Macro,
            ScopeOwner::Selector(_) => ScopeOwnerKind::Selector,
            ScopeOwner::Injector(_) => ScopeOwnerKind::Injector,
            ScopeOwner::Block(_) => ScopeOwnerKind::Block,
            ScopeOwner::If(_) => ScopeOwnerKind::If,
            ScopeOwner::ElseIf(_) => ScopeOwnerKind::ElseIf,
            ScopeOwner::Else(_) => ScopeOwnerKind::Else,
            ScopeOwner::When(_) => ScopeOwnerKind::When,
            ScopeOwner::For(_) => ScopeOwnerKind::For,
        }
    }

    pub fn key(&self) -> NodeKey {
        match self {
            ScopeOwner::File(node) => NodeKey::of(*node),
            ScopeOwner::Function(node) => NodeKey::of(*node),
            ScopeOwner::Field(node) => NodeKey::of(*node),
            ScopeOwner::Macro(node) => NodeKey::of(*node),
            ScopeOwner::Selector(node) => NodeKey::of(*node),
            ScopeOwner::Injector(node) => NodeKey::of(*node),
            ScopeOwner::Block(node) => NodeKey::of(*node),
            ScopeOwner::If(node) => NodeKey::of(*node),
            ScopeOwner::ElseIf(node) => NodeKey::of(*node),
            ScopeOwner::Else(node) => NodeKey::of(*node),
            ScopeOwner::When(node) => NodeKey::of(*node),
            ScopeOwner::For(node) => NodeKey::of(*node),
        }
    }

    /// Children evaluated when the owner runs; empty for owners without a body.
    pub fn elements(&self) -> &'a [Element] {
        match *self {
            ScopeOwner::File(node) => &node.elements,
            ScopeOwner::Function(node) => &node.body,
            ScopeOwner::Macro(node) => &node.body,
            ScopeOwner::Injector(node) => &node.body,
            ScopeOwner::Block(node) => &node.body,
            ScopeOwner::If(node) => &node.body,
            ScopeOwner::ElseIf(node) => &node.body,
            ScopeOwner::Else(node) => &node.body,
            ScopeOwner::When(node) => &node.body,
            ScopeOwner::For(node) => &node.body,
            ScopeOwner::Field(_) | ScopeOwner::Selector(_) => &[],
        }
    }

    /// Label used in stack traces.
    pub fn describe(&self) -> String {
        match self {
            ScopeOwner::File(file) => format!("file {}", file.path),
            ScopeOwner::Function(function) => format!("fun {}", function.signature),
            ScopeOwner::Field(field) => format!("field {}", field.signature),
            ScopeOwner::Macro(decl) => format!("macro {}", decl.name),
            ScopeOwner::Selector(selector) => format!("selector {}", selector.name),
            ScopeOwner::Injector(injector) => format!("inject {}", injector.target),
            ScopeOwner::Block(block) => format!("block {}", block.name),
            ScopeOwner::For(stmt) => format!("for {}", stmt.variable),
            other => other.kind().to_string(),
        }
    }

    pub fn range(&self) -> TokenRange {
        match self {
            ScopeOwner::File(file) => file.range,
            ScopeOwner::ElseIf(branch) => branch.range,
            ScopeOwner::Else(branch) => branch.range,
            ScopeOwner::When(branch) => branch.range,
            ScopeOwner::Function(function) => function.signature.range,
            ScopeOwner::Field(field) => field.signature.range,
            ScopeOwner::Injector(injector) => injector.target.range,
            ScopeOwner::If(expr) => expr.condition.range,
            ScopeOwner::For(stmt) => stmt.value.range,
            ScopeOwner::Macro(_) | ScopeOwner::Selector(_) | ScopeOwner::Block(_) => {
                TokenRange::Synthetic
            }
        }
    }

    pub fn merge_policy(&self) -> MergePolicy {
        match self {
            ScopeOwner::Macro(_) => MergePolicy::Values,
            ScopeOwner::If(_)
            | ScopeOwner::ElseIf(_)
            | ScopeOwner::Else(_)
            | ScopeOwner::When(_)
            | ScopeOwner::For(_)
            | ScopeOwner::Block(_) => MergePolicy::ValuesAndInstructions,
            ScopeOwner::File(_)
            | ScopeOwner::Function(_)
            | ScopeOwner::Field(_)
            | ScopeOwner::Selector(_)
            | ScopeOwner::Injector(_) => MergePolicy::Nothing,
        }
    }

    /// Owners whose frame keeps its own instruction buffer, locals and labels.
    pub fn is_instruction_root(&self) -> bool {
        self.merge_policy() != MergePolicy::ValuesAndInstructions
    }

    /// Owners that consume RETURN and reject stray BREAK/CONTINUE.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            ScopeOwner::Function(_) | ScopeOwner::Macro(_) | ScopeOwner::Injector(_)
        )
    }
}

#[derive(Debug)]
pub struct Scope<'a> {
    pub parent: Option<Rc<Scope<'a>>>,
    pub owner: ScopeOwner<'a>,
}

impl<'a> Scope<'a> {
    pub fn root(owner: ScopeOwner<'a>) -> Rc<Scope<'a>> {
        Rc::new(Scope {
            parent: None,
            owner,
        })
    }

    pub fn child(self: &Rc<Self>, owner: ScopeOwner<'a>) -> Rc<Scope<'a>> {
        Rc::new(Scope {
            parent: Some(Rc::clone(self)),
            owner,
        })
    }

    pub fn key(&self) -> NodeKey {
        self.owner.key()
    }

    /// Walks from this scope outwards and returns the first result the selector yields.
    pub fn find<T>(&self, mut selector: impl FnMut(&Scope<'a>) -> Option<T>) -> Option<T> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(result) = selector(scope) {
                return Some(result);
            }
            current = scope.parent.as_deref();
        }
        None
    }

    /// Every result the selector yields along the chain, innermost first.
    pub fn find_all<T>(&self, mut selector: impl FnMut(&Scope<'a>) -> Option<T>) -> Vec<T> {
        let mut results = Vec::new();
        let mut current = Some(self);
        while let Some(scope) = current {
            results.extend(selector(scope));
            current = scope.parent.as_deref();
        }
        results
    }

    /// Nearest enclosing owner of the given kind, including this scope.
    pub fn nearest(&self, kind: ScopeOwnerKind) -> Option<ScopeOwner<'a>> {
        self.find(|scope| (scope.owner.kind() == kind).then_some(scope.owner))
    }

    pub fn depth(&self) -> usize {
        self.find_all(|_| Some(())).len()
    }
}

/// Scope chain of every owner in one file, keyed by owner identity.
#[derive(Debug)]
pub struct ScopeIndex<'a> {
    root: Rc<Scope<'a>>,
    scopes: HashMap<NodeKey, Rc<Scope<'a>>>,
}

impl<'a> ScopeIndex<'a> {
    pub fn build(file: &'a AssemblyFile) -> Self {
        let root = Scope::root(ScopeOwner::File(file));
        let mut index = Self {
            root: Rc::clone(&root),
            scopes: HashMap::new(),
        };
        index.scopes.insert(root.key(), Rc::clone(&root));
        index.visit_elements(&root, &file.elements);
        index
    }

    pub fn root(&self) -> &Rc<Scope<'a>> {
        &self.root
    }

    pub fn get(&self, key: NodeKey) -> Option<&Rc<Scope<'a>>> {
        self.scopes.get(&key)
    }

    /// The scope owned by `owner`, falling back to the file scope for detached nodes.
    pub fn scope_of(&self, owner: &ScopeOwner<'a>) -> Rc<Scope<'a>> {
        self.scopes
            .get(&owner.key())
            .cloned()
            .unwrap_or_else(|| self.root.child(*owner))
    }

    pub fn scopes(&self) -> impl Iterator<Item = &Rc<Scope<'a>>> {
        self.scopes.values()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    fn open(&mut self, parent: &Rc<Scope<'a>>, owner: ScopeOwner<'a>) -> Rc<Scope<'a>> {
        let scope = parent.child(owner);
        self.scopes.insert(scope.key(), Rc::clone(&scope));
        scope
    }

    fn visit_elements(&mut self, scope: &Rc<Scope<'a>>, elements: &'a [Element]) {
        for element in elements {
            match element {
                Element::Declaration(decl) => self.visit_declaration(scope, decl),
                Element::Statement(stmt) => self.visit_statement(scope, stmt),
                Element::Expr(expr) => self.visit_expr(scope, expr),
            }
        }
    }

    fn visit_declaration(&mut self, scope: &Rc<Scope<'a>>, decl: &'a Declaration) {
        match &decl.kind {
            DeclarationKind::Function(function) => {
                let inner = self.open(scope, ScopeOwner::Function(function));
                self.visit_expr(scope, &function.signature);
                self.visit_elements(&inner, &function.body);
            }
            DeclarationKind::Field(field) => {
                let inner = self.open(scope, ScopeOwner::Field(field));
                if let Some(initializer) = &field.initializer {
                    self.visit_expr(&inner, initializer);
                }
            }
            DeclarationKind::Macro(decl) => {
                let inner = self.open(scope, ScopeOwner::Macro(decl));
                self.visit_elements(&inner, &decl.body);
            }
            DeclarationKind::Selector(selector) => {
                let inner = self.open(scope, ScopeOwner::Selector(selector));
                if let Some(offset) = &selector.offset {
                    self.visit_expr(&inner, offset);
                }
            }
            DeclarationKind::Injector(injector) => {
                let inner = self.open(scope, ScopeOwner::Injector(injector));
                self.visit_elements(&inner, &injector.body);
            }
            DeclarationKind::Block(block) => {
                let inner = self.open(scope, ScopeOwner::Block(block));
                self.visit_elements(&inner, &block.body);
            }
            DeclarationKind::Class(class) => {
                self.visit_expr(scope, &class.ty);
                if let Some(super_type) = &class.super_type {
                    self.visit_expr(scope, super_type);
                }
            }
            DeclarationKind::PreproClass(_) | DeclarationKind::Empty => {}
        }
    }

    fn visit_statement(&mut self, scope: &Rc<Scope<'a>>, stmt: &'a Statement) {
        match &stmt.kind {
            StatementKind::For(for_stmt) => {
                self.visit_expr(scope, &for_stmt.value);
                let inner = self.open(scope, ScopeOwner::For(for_stmt));
                self.visit_elements(&inner, &for_stmt.body);
            }
            StatementKind::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.visit_expr(scope, value);
                }
            }
            StatementKind::Define(define) => self.visit_expr(scope, &define.value),
            StatementKind::Assert(assert) => self.visit_expr(scope, &assert.condition),
            StatementKind::Compound(compound) => {
                for stmt in &compound.statements {
                    self.visit_statement(scope, stmt);
                }
            }
            StatementKind::Instruction(instruction) => {
                for operand in instruction.operands() {
                    self.visit_expr(scope, operand);
                }
            }
            _ => {}
        }
    }

    fn visit_expr(&mut self, scope: &Rc<Scope<'a>>, expr: &'a Expr) {
        match &expr.kind {
            ExprKind::If(if_expr) => {
                self.visit_expr(scope, &if_expr.condition);
                let inner = self.open(scope, ScopeOwner::If(if_expr));
                self.visit_elements(&inner, &if_expr.body);
                for branch in &if_expr.else_ifs {
                    self.visit_expr(scope, &branch.condition);
                    let inner = self.open(scope, ScopeOwner::ElseIf(branch));
                    self.visit_elements(&inner, &branch.body);
                }
                if let Some(branch) = &if_expr.else_branch {
                    let inner = self.open(scope, ScopeOwner::Else(branch));
                    self.visit_elements(&inner, &branch.body);
                }
            }
            ExprKind::When(when) => {
                self.visit_expr(scope, &when.value);
                for branch in when.branches.iter().chain(when.default.as_deref()) {
                    self.visit_expr(scope, &branch.condition);
                    let inner = self.open(scope, ScopeOwner::When(branch));
                    self.visit_elements(&inner, &branch.body);
                }
            }
            ExprKind::Binary(binary) => {
                self.visit_expr(scope, &binary.lhs);
                self.visit_expr(scope, &binary.rhs);
            }
            ExprKind::Unary(unary) => self.visit_expr(scope, &unary.operand),
            ExprKind::MacroCall(call) => {
                for argument in &call.arguments {
                    self.visit_expr(scope, &argument.value);
                }
            }
            ExprKind::PreproClass(class) => {
                for argument in &class.arguments {
                    self.visit_expr(scope, &argument.value);
                }
            }
            ExprKind::StringLerp(lerp) => {
                for part in &lerp.parts {
                    self.visit_expr(scope, part);
                }
            }
            ExprKind::Array(array) => {
                for value in &array.values {
                    self.visit_expr(scope, value);
                }
            }
            ExprKind::ArrayAccess(access) => {
                self.visit_expr(scope, &access.reference);
                self.visit_expr(scope, &access.index);
            }
            ExprKind::As(expr) => self.visit_expr(scope, &expr.value),
            ExprKind::Is(expr) => self.visit_expr(scope, &expr.value),
            ExprKind::In(expr) => {
                self.visit_expr(scope, &expr.value);
                self.visit_expr(scope, &expr.container);
            }
            ExprKind::SizeOf(inner)
            | ExprKind::TypeOf(inner)
            | ExprKind::OpcodeOf(inner)
            | ExprKind::Default(inner) => self.visit_expr(scope, inner),
            ExprKind::Range(range) => {
                self.visit_expr(scope, &range.start);
                self.visit_expr(scope, &range.end);
            }
            ExprKind::Instruction(instruction) => {
                for operand in instruction.operands() {
                    self.visit_expr(scope, operand);
                }
            }
            ExprKind::Literal(_)
            | ExprKind::Reference(_)
            | ExprKind::FieldSignature(_)
            | ExprKind::FunctionSignature(_)
            | ExprKind::SelectorReference(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    #[test]
    fn branches_are_siblings_of_their_if() {
        let if_expr = Expr::new(ExprKind::If(IfExpr {
            condition: Box::new(Expr::literal(true)),
            body: vec![],
            else_ifs: vec![],
            else_branch: Some(ElseBranch {
                body: vec![],
                range: TokenRange::Synthetic,
            }),
        }));
        let function = FunctionDecl::new(
            Expr::function_signature(Type::class("Foo"), "bar", Type::VOID, vec![]),
            vec![Element::Expr(if_expr)],
        );
        let file = AssemblyFile::new("test.jbpl").with_elements([Element::from(function)]);
        let index = ScopeIndex::build(&file);
        assert_eq!(index.len(), 4);

        let Element::Declaration(Declaration {
            kind: DeclarationKind::Function(function),
            ..
        }) = &file.elements[0]
        else {
            unreachable!()
        };
        let Element::Expr(Expr {
            kind: ExprKind::If(if_expr),
            ..
        }) = &function.body[0]
        else {
            unreachable!()
        };
        let else_branch = if_expr.else_branch.as_ref().unwrap();
        let else_scope = index.get(NodeKey::of(else_branch)).unwrap();
        let parent = else_scope.parent.as_ref().unwrap();
        assert_eq!(parent.owner.kind(), ScopeOwnerKind::Function);
        assert_eq!(else_scope.depth(), 3);
    }
}
