use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use super::{Element, Instruction};
use crate::span::TokenRange;
use crate::types::Type;
use crate::value::Value;
use crate::{common_enum, common_struct};

common_struct! {
    pub struct Expr {
        pub kind: ExprKind,
        pub range: TokenRange,
    }
}

common_enum! {
    pub enum ExprKind {
        Literal(Value),
        Binary(BinaryExpr),
        Unary(UnaryExpr),
        Reference(ReferenceExpr),
        MacroCall(MacroCallExpr),
        StringLerp(StringLerpExpr),
        Array(ArrayExpr),
        ArrayAccess(ArrayAccessExpr),
        If(IfExpr),
        When(WhenExpr),
        As(AsExpr),
        Is(IsExpr),
        In(InExpr),
        SizeOf(Box<Expr>),
        TypeOf(Box<Expr>),
        OpcodeOf(Box<Expr>),
        Default(Box<Expr>),
        Range(RangeExpr),
        FieldSignature(FieldSignatureExpr),
        FunctionSignature(FunctionSignatureExpr),
        PreproClass(PreproClassExpr),
        SelectorReference(String),
        Instruction(Box<Instruction>),
    }
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            range: TokenRange::Synthetic,
        }
    }

    pub fn with_range(mut self, range: TokenRange) -> Self {
        self.range = range;
        self
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::new(ExprKind::Literal(value.into()))
    }

    pub fn unit() -> Self {
        Expr::literal(Value::Unit)
    }

    pub fn is_unit(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(Value::Unit))
    }

    pub fn ty(ty: Type) -> Self {
        Expr::literal(Value::Type(ty))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Expr::new(ExprKind::Reference(ReferenceExpr { name: name.into() }))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::new(ExprKind::Binary(BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }))
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::new(ExprKind::Unary(UnaryExpr {
            op,
            operand: Box::new(operand),
        }))
    }

    pub fn call(name: impl Into<String>, arguments: Vec<Argument>) -> Self {
        Expr::new(ExprKind::MacroCall(MacroCallExpr {
            name: name.into(),
            arguments,
        }))
    }

    pub fn array(element_type: Option<Type>, values: Vec<Expr>) -> Self {
        Expr::new(ExprKind::Array(ArrayExpr {
            element_type: element_type.map(|ty| Box::new(Expr::ty(ty))),
            values,
        }))
    }

    pub fn instruction(instruction: Instruction) -> Self {
        Expr::new(ExprKind::Instruction(Box::new(instruction)))
    }

    pub fn field_signature(owner: Type, name: impl Into<String>, ty: Type) -> Self {
        Expr::new(ExprKind::FieldSignature(FieldSignatureExpr {
            owner: Box::new(Expr::ty(owner)),
            name: Box::new(Expr::literal(name.into())),
            ty: Box::new(Expr::ty(ty)),
        }))
    }

    pub fn function_signature(
        owner: Type,
        name: impl Into<String>,
        return_type: Type,
        params: Vec<Type>,
    ) -> Self {
        Expr::new(ExprKind::FunctionSignature(FunctionSignatureExpr {
            owner: Box::new(Expr::ty(owner)),
            name: Box::new(Expr::literal(name.into())),
            return_type: Box::new(Expr::ty(return_type)),
            params: params.into_iter().map(Expr::ty).collect(),
        }))
    }

    /// Whether the expression can be the target of an assignment or increment.
    pub fn is_reference(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Reference(_) | ExprKind::ArrayAccess(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum BinaryOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Cmp,
    Lsh,
    Rsh,
    Ursh,
    And,
    Or,
    Xor,
    LshAssign,
    RshAssign,
    UrshAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ScAnd,
    ScOr,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Assign => "=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubAssign => "-=",
            BinaryOp::MulAssign => "*=",
            BinaryOp::DivAssign => "/=",
            BinaryOp::RemAssign => "%=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Cmp => "<=>",
            BinaryOp::Lsh => "<<",
            BinaryOp::Rsh => ">>",
            BinaryOp::Ursh => ">>>",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::LshAssign => "<<=",
            BinaryOp::RshAssign => ">>=",
            BinaryOp::UrshAssign => ">>>=",
            BinaryOp::AndAssign => "&=",
            BinaryOp::OrAssign => "|=",
            BinaryOp::XorAssign => "^=",
            BinaryOp::ScAnd => "&&",
            BinaryOp::ScOr => "||",
        }
    }

    pub fn is_assignment(self) -> bool {
        self == BinaryOp::Assign || self.compound_base().is_some()
    }

    /// The plain operator a compound assignment applies, `+=` to `+`.
    pub fn compound_base(self) -> Option<BinaryOp> {
        Some(match self {
            BinaryOp::AddAssign => BinaryOp::Add,
            BinaryOp::SubAssign => BinaryOp::Sub,
            BinaryOp::MulAssign => BinaryOp::Mul,
            BinaryOp::DivAssign => BinaryOp::Div,
            BinaryOp::RemAssign => BinaryOp::Rem,
            BinaryOp::LshAssign => BinaryOp::Lsh,
            BinaryOp::RshAssign => BinaryOp::Rsh,
            BinaryOp::UrshAssign => BinaryOp::Ursh,
            BinaryOp::AndAssign => BinaryOp::And,
            BinaryOp::OrAssign => BinaryOp::Or,
            BinaryOp::XorAssign => BinaryOp::Xor,
            _ => return None,
        })
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

common_struct! {
    pub struct BinaryExpr {
        pub op: BinaryOp,
        pub lhs: Box<Expr>,
        pub rhs: Box<Expr>,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Minus,
    /// Bitwise complement.
    Inverse,
    Not,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn is_increment(self) -> bool {
        matches!(
            self,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
        )
    }
}

common_struct! {
    pub struct UnaryExpr {
        pub op: UnaryOp,
        pub operand: Box<Expr>,
    }
}

common_struct! {
    /// A name looked up through intrinsic defines, frame values and defines, in that order.
    pub struct ReferenceExpr {
        pub name: String,
    }
}

common_struct! {
    pub struct Argument {
        pub name: Option<String>,
        pub value: Expr,
    }
}

impl Argument {
    pub fn positional(value: Expr) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: Expr) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

common_struct! {
    pub struct MacroCallExpr {
        pub name: String,
        pub arguments: Vec<Argument>,
    }
}

common_struct! {
    /// `"a ${b} c"`: parts are concatenated by their display form.
    pub struct StringLerpExpr {
        pub parts: Vec<Expr>,
    }
}

common_struct! {
    pub struct ArrayExpr {
        /// Inferred from the values when absent.
        pub element_type: Option<Box<Expr>>,
        pub values: Vec<Expr>,
    }
}

common_struct! {
    pub struct ArrayAccessExpr {
        pub reference: Box<Expr>,
        /// An integer, or a range selecting a slice.
        pub index: Box<Expr>,
    }
}

common_struct! {
    pub struct IfExpr {
        pub condition: Box<Expr>,
        pub body: Vec<Element>,
        pub else_ifs: Vec<ElseIfBranch>,
        pub else_branch: Option<ElseBranch>,
    }
}

common_struct! {
    pub struct ElseIfBranch {
        pub condition: Expr,
        pub body: Vec<Element>,
        pub range: TokenRange,
    }
}

common_struct! {
    pub struct ElseBranch {
        pub body: Vec<Element>,
        pub range: TokenRange,
    }
}

common_struct! {
    pub struct WhenExpr {
        pub value: Box<Expr>,
        pub branches: Vec<WhenBranch>,
        pub default: Option<Box<WhenBranch>>,
    }
}

common_struct! {
    /// One arm of a `when`. Scoped arms get their own frame; scopeless arms
    /// (`value -> expr`) evaluate straight into the enclosing frame.
    pub struct WhenBranch {
        pub condition: Expr,
        pub body: Vec<Element>,
        pub is_scoped: bool,
        pub range: TokenRange,
    }
}

common_struct! {
    pub struct AsExpr {
        pub value: Box<Expr>,
        pub ty: Box<Expr>,
    }
}

common_struct! {
    pub struct IsExpr {
        pub value: Box<Expr>,
        pub ty: Box<Expr>,
    }
}

common_struct! {
    pub struct InExpr {
        pub value: Box<Expr>,
        pub container: Box<Expr>,
    }
}

common_struct! {
    pub struct RangeExpr {
        pub start: Box<Expr>,
        pub end: Box<Expr>,
        pub inclusive: bool,
    }
}

common_struct! {
    pub struct FieldSignatureExpr {
        pub owner: Box<Expr>,
        pub name: Box<Expr>,
        pub ty: Box<Expr>,
    }
}

common_struct! {
    pub struct FunctionSignatureExpr {
        pub owner: Box<Expr>,
        pub name: Box<Expr>,
        pub return_type: Box<Expr>,
        pub params: Vec<Expr>,
    }
}

common_struct! {
    /// Instantiates a compile-time class; arguments map to fields like macro arguments do.
    pub struct PreproClassExpr {
        pub name: String,
        pub arguments: Vec<Argument>,
    }
}
