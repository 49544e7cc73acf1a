//! Bottom-up tree rewriting.
//!
//! Every `walk_*` function transforms a node's children first and writes the
//! results back in place; a [`Transformer`] overrides the hooks for the node
//! kinds it cares about and calls the matching `walk_*` to keep descending.

use super::*;
use crate::error::Result;

pub trait Transformer {
    fn transform_elements(&mut self, elements: Vec<Element>) -> Result<Vec<Element>> {
        walk_elements(self, elements)
    }

    /// One element may become zero or more elements in the parent list.
    fn transform_element(&mut self, element: Element) -> Result<Vec<Element>> {
        walk_element(self, element)
    }

    fn transform_declaration(&mut self, decl: Declaration) -> Result<Declaration> {
        walk_declaration(self, decl)
    }

    fn transform_statement(&mut self, stmt: Statement) -> Result<Vec<Statement>> {
        walk_statement(self, stmt).map(|stmt| vec![stmt])
    }

    fn transform_expr(&mut self, expr: Expr) -> Result<Expr> {
        walk_expr(self, expr)
    }

    fn transform_file(&mut self, mut file: AssemblyFile) -> Result<AssemblyFile> {
        file.elements = self.transform_elements(std::mem::take(&mut file.elements))?;
        Ok(file)
    }
}

pub fn walk_elements<T: Transformer + ?Sized>(
    t: &mut T,
    elements: Vec<Element>,
) -> Result<Vec<Element>> {
    let mut result = Vec::with_capacity(elements.len());
    for element in elements {
        result.extend(t.transform_element(element)?);
    }
    Ok(result)
}

pub fn walk_element<T: Transformer + ?Sized>(t: &mut T, element: Element) -> Result<Vec<Element>> {
    Ok(match element {
        Element::Declaration(decl) => vec![Element::Declaration(t.transform_declaration(decl)?)],
        Element::Statement(stmt) => t
            .transform_statement(stmt)?
            .into_iter()
            .map(Element::Statement)
            .collect(),
        Element::Expr(expr) => vec![Element::Expr(t.transform_expr(expr)?)],
    })
}

fn walk_opt_expr<T: Transformer + ?Sized>(t: &mut T, expr: Option<Expr>) -> Result<Option<Expr>> {
    expr.map(|expr| t.transform_expr(expr)).transpose()
}

fn walk_boxed<T: Transformer + ?Sized>(t: &mut T, expr: Box<Expr>) -> Result<Box<Expr>> {
    Ok(Box::new(t.transform_expr(*expr)?))
}

fn walk_exprs<T: Transformer + ?Sized>(t: &mut T, exprs: Vec<Expr>) -> Result<Vec<Expr>> {
    exprs.into_iter().map(|expr| t.transform_expr(expr)).collect()
}

pub fn walk_declaration<T: Transformer + ?Sized>(t: &mut T, decl: Declaration) -> Result<Declaration> {
    let Declaration { kind, range } = decl;
    let kind = match kind {
        DeclarationKind::Class(mut class) => {
            class.ty = t.transform_expr(class.ty)?;
            class.super_type = walk_opt_expr(t, class.super_type)?;
            class.interfaces = walk_exprs(t, class.interfaces)?;
            DeclarationKind::Class(class)
        }
        DeclarationKind::Field(mut field) => {
            field.signature = t.transform_expr(field.signature)?;
            field.initializer = walk_opt_expr(t, field.initializer)?;
            DeclarationKind::Field(field)
        }
        DeclarationKind::Function(mut function) => {
            function.signature = t.transform_expr(function.signature)?;
            function.body = t.transform_elements(function.body)?;
            DeclarationKind::Function(function)
        }
        DeclarationKind::Macro(mut decl) => {
            for parameter in &mut decl.parameters {
                parameter.ty = t.transform_expr(std::mem::replace(&mut parameter.ty, Expr::unit()))?;
            }
            decl.return_type = t.transform_expr(decl.return_type)?;
            decl.body = t.transform_elements(decl.body)?;
            DeclarationKind::Macro(decl)
        }
        DeclarationKind::PreproClass(mut class) => {
            for field in &mut class.fields {
                field.ty = t.transform_expr(std::mem::replace(&mut field.ty, Expr::unit()))?;
            }
            DeclarationKind::PreproClass(class)
        }
        DeclarationKind::Selector(mut selector) => {
            for condition in &mut selector.conditions {
                if let ConditionTarget::Instruction(instruction) = &mut condition.target {
                    walk_instruction(t, instruction)?;
                }
            }
            selector.offset = walk_opt_expr(t, selector.offset)?;
            DeclarationKind::Selector(selector)
        }
        DeclarationKind::Injector(mut injector) => {
            injector.target = t.transform_expr(injector.target)?;
            injector.selector = t.transform_expr(injector.selector)?;
            injector.body = t.transform_elements(injector.body)?;
            DeclarationKind::Injector(injector)
        }
        DeclarationKind::Block(mut block) => {
            block.body = t.transform_elements(block.body)?;
            DeclarationKind::Block(block)
        }
        DeclarationKind::Empty => DeclarationKind::Empty,
    };
    Ok(Declaration { kind, range })
}

pub fn walk_statement<T: Transformer + ?Sized>(t: &mut T, stmt: Statement) -> Result<Statement> {
    let Statement { kind, range } = stmt;
    let kind = match kind {
        StatementKind::Return(ret) => StatementKind::Return(ReturnStatement {
            value: walk_opt_expr(t, ret.value)?,
        }),
        StatementKind::Local(local) => StatementKind::Local(LocalStatement {
            name: local.name,
            index: walk_opt_expr(t, local.index)?,
        }),
        StatementKind::Define(mut define) => {
            define.ty = t.transform_expr(define.ty)?;
            define.value = t.transform_expr(define.value)?;
            StatementKind::Define(define)
        }
        StatementKind::Assert(assert) => StatementKind::Assert(AssertStatement {
            condition: t.transform_expr(assert.condition)?,
            message: walk_opt_expr(t, assert.message)?,
        }),
        StatementKind::For(mut stmt) => {
            stmt.value = t.transform_expr(stmt.value)?;
            stmt.body = t.transform_elements(stmt.body)?;
            StatementKind::For(stmt)
        }
        StatementKind::Version(version) => StatementKind::Version(VersionStatement {
            version: t.transform_expr(version.version)?,
        }),
        StatementKind::TypeAlias(mut alias) => {
            alias.ty = t.transform_expr(alias.ty)?;
            StatementKind::TypeAlias(alias)
        }
        StatementKind::Yeet(yeet) => StatementKind::Yeet(YeetStatement {
            target: t.transform_expr(yeet.target)?,
        }),
        StatementKind::Compound(compound) => {
            let mut statements = Vec::with_capacity(compound.statements.len());
            for stmt in compound.statements {
                statements.extend(t.transform_statement(stmt)?);
            }
            StatementKind::Compound(CompoundStatement { statements })
        }
        StatementKind::Instruction(mut instruction) => {
            walk_instruction(t, &mut instruction)?;
            StatementKind::Instruction(instruction)
        }
        kind @ (StatementKind::Break
        | StatementKind::Continue
        | StatementKind::Include(_)
        | StatementKind::Noop) => kind,
    };
    Ok(Statement { kind, range })
}

pub fn walk_instruction<T: Transformer + ?Sized>(t: &mut T, instruction: &mut Instruction) -> Result<()> {
    for operand in instruction.operands_mut() {
        *operand = t.transform_expr(std::mem::replace(operand, Expr::unit()))?;
    }
    Ok(())
}

fn walk_arguments<T: Transformer + ?Sized>(t: &mut T, arguments: Vec<Argument>) -> Result<Vec<Argument>> {
    arguments
        .into_iter()
        .map(|argument| {
            Ok(Argument {
                name: argument.name,
                value: t.transform_expr(argument.value)?,
            })
        })
        .collect()
}

fn walk_when_branch<T: Transformer + ?Sized>(t: &mut T, branch: WhenBranch) -> Result<WhenBranch> {
    Ok(WhenBranch {
        condition: t.transform_expr(branch.condition)?,
        body: t.transform_elements(branch.body)?,
        is_scoped: branch.is_scoped,
        range: branch.range,
    })
}

pub fn walk_expr<T: Transformer + ?Sized>(t: &mut T, expr: Expr) -> Result<Expr> {
    let Expr { kind, range } = expr;
    let kind = match kind {
        ExprKind::Binary(binary) => ExprKind::Binary(BinaryExpr {
            op: binary.op,
            lhs: walk_boxed(t, binary.lhs)?,
            rhs: walk_boxed(t, binary.rhs)?,
        }),
        ExprKind::Unary(unary) => ExprKind::Unary(UnaryExpr {
            op: unary.op,
            operand: walk_boxed(t, unary.operand)?,
        }),
        ExprKind::MacroCall(call) => ExprKind::MacroCall(MacroCallExpr {
            name: call.name,
            arguments: walk_arguments(t, call.arguments)?,
        }),
        ExprKind::StringLerp(lerp) => ExprKind::StringLerp(StringLerpExpr {
            parts: walk_exprs(t, lerp.parts)?,
        }),
        ExprKind::Array(array) => ExprKind::Array(ArrayExpr {
            element_type: array.element_type.map(|ty| walk_boxed(t, ty)).transpose()?,
            values: walk_exprs(t, array.values)?,
        }),
        ExprKind::ArrayAccess(access) => ExprKind::ArrayAccess(ArrayAccessExpr {
            reference: walk_boxed(t, access.reference)?,
            index: walk_boxed(t, access.index)?,
        }),
        ExprKind::If(expr) => {
            let mut else_ifs = Vec::with_capacity(expr.else_ifs.len());
            for branch in expr.else_ifs {
                else_ifs.push(ElseIfBranch {
                    condition: t.transform_expr(branch.condition)?,
                    body: t.transform_elements(branch.body)?,
                    range: branch.range,
                });
            }
            let else_branch = match expr.else_branch {
                Some(branch) => Some(ElseBranch {
                    body: t.transform_elements(branch.body)?,
                    range: branch.range,
                }),
                None => None,
            };
            ExprKind::If(IfExpr {
                condition: walk_boxed(t, expr.condition)?,
                body: t.transform_elements(expr.body)?,
                else_ifs,
                else_branch,
            })
        }
        ExprKind::When(expr) => ExprKind::When(WhenExpr {
            value: walk_boxed(t, expr.value)?,
            branches: expr
                .branches
                .into_iter()
                .map(|branch| walk_when_branch(t, branch))
                .collect::<Result<_>>()?,
            default: expr
                .default
                .map(|branch| walk_when_branch(t, *branch).map(Box::new))
                .transpose()?,
        }),
        ExprKind::As(expr) => ExprKind::As(AsExpr {
            value: walk_boxed(t, expr.value)?,
            ty: walk_boxed(t, expr.ty)?,
        }),
        ExprKind::Is(expr) => ExprKind::Is(IsExpr {
            value: walk_boxed(t, expr.value)?,
            ty: walk_boxed(t, expr.ty)?,
        }),
        ExprKind::In(expr) => ExprKind::In(InExpr {
            value: walk_boxed(t, expr.value)?,
            container: walk_boxed(t, expr.container)?,
        }),
        ExprKind::SizeOf(expr) => ExprKind::SizeOf(walk_boxed(t, expr)?),
        ExprKind::TypeOf(expr) => ExprKind::TypeOf(walk_boxed(t, expr)?),
        ExprKind::OpcodeOf(expr) => ExprKind::OpcodeOf(walk_boxed(t, expr)?),
        ExprKind::Default(expr) => ExprKind::Default(walk_boxed(t, expr)?),
        ExprKind::Range(range) => ExprKind::Range(RangeExpr {
            start: walk_boxed(t, range.start)?,
            end: walk_boxed(t, range.end)?,
            inclusive: range.inclusive,
        }),
        ExprKind::FieldSignature(sig) => ExprKind::FieldSignature(FieldSignatureExpr {
            owner: walk_boxed(t, sig.owner)?,
            name: walk_boxed(t, sig.name)?,
            ty: walk_boxed(t, sig.ty)?,
        }),
        ExprKind::FunctionSignature(sig) => ExprKind::FunctionSignature(FunctionSignatureExpr {
            owner: walk_boxed(t, sig.owner)?,
            name: walk_boxed(t, sig.name)?,
            return_type: walk_boxed(t, sig.return_type)?,
            params: walk_exprs(t, sig.params)?,
        }),
        ExprKind::PreproClass(expr) => ExprKind::PreproClass(PreproClassExpr {
            name: expr.name,
            arguments: walk_arguments(t, expr.arguments)?,
        }),
        ExprKind::Instruction(mut instruction) => {
            walk_instruction(t, &mut instruction)?;
            ExprKind::Instruction(instruction)
        }
        kind @ (ExprKind::Literal(_) | ExprKind::Reference(_) | ExprKind::SelectorReference(_)) => kind,
    };
    Ok(Expr { kind, range })
}
