use super::{Element, Expr, Instruction};
use crate::span::TokenRange;
use crate::{common_enum, common_struct};

common_struct! {
    pub struct Statement {
        pub kind: StatementKind,
        pub range: TokenRange,
    }
}

common_enum! {
    pub enum StatementKind {
        Return(ReturnStatement),
        Local(LocalStatement),
        Define(DefineStatement),
        Assert(AssertStatement),
        For(ForStatement),
        Break,
        Continue,
        Include(IncludeStatement),
        Version(VersionStatement),
        TypeAlias(TypeAliasStatement),
        Yeet(YeetStatement),
        Compound(CompoundStatement),
        Noop,
        Instruction(Instruction),
    }
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            range: TokenRange::Synthetic,
        }
    }

    pub fn with_range(mut self, range: TokenRange) -> Self {
        self.range = range;
        self
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Statement::new(StatementKind::Return(ReturnStatement { value }))
    }

    /// Defines and type aliases are evaluated on reference, not in sequence.
    pub fn is_evaluated_directly(&self) -> bool {
        !matches!(
            self.kind,
            StatementKind::Define(_) | StatementKind::TypeAlias(_)
        )
    }
}

impl From<Instruction> for Statement {
    fn from(instruction: Instruction) -> Self {
        let range = instruction.range;
        Statement {
            kind: StatementKind::Instruction(instruction),
            range,
        }
    }
}

macro_rules! into_statement {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Statement {
                fn from(stmt: $ty) -> Self {
                    Statement::new(StatementKind::$variant(stmt))
                }
            }

            impl From<$ty> for Element {
                fn from(stmt: $ty) -> Self {
                    Element::Statement(Statement::from(stmt))
                }
            }
        )*
    };
}

into_statement! {
    Return(ReturnStatement),
    Local(LocalStatement),
    Define(DefineStatement),
    Assert(AssertStatement),
    For(ForStatement),
    Include(IncludeStatement),
    Version(VersionStatement),
    TypeAlias(TypeAliasStatement),
    Yeet(YeetStatement),
    Compound(CompoundStatement),
}

common_struct! {
    pub struct ReturnStatement {
        pub value: Option<Expr>,
    }
}

common_struct! {
    /// Declares a named local variable slot in the enclosing function.
    pub struct LocalStatement {
        pub name: String,
        /// Next free slot when absent.
        pub index: Option<Expr>,
    }
}

common_struct! {
    pub struct DefineStatement {
        pub name: String,
        pub ty: Expr,
        pub value: Expr,
        pub is_final: bool,
        pub is_private: bool,
    }
}

impl DefineStatement {
    pub fn new(name: impl Into<String>, ty: Expr, value: Expr) -> Self {
        Self {
            name: name.into(),
            ty,
            value,
            is_final: false,
            is_private: false,
        }
    }
}

common_struct! {
    pub struct AssertStatement {
        pub condition: Expr,
        pub message: Option<Expr>,
    }
}

common_struct! {
    pub struct ForStatement {
        pub variable: String,
        pub value: Expr,
        pub body: Vec<Element>,
    }
}

common_struct! {
    pub struct IncludeStatement {
        pub path: String,
    }
}

common_struct! {
    pub struct VersionStatement {
        pub version: Expr,
    }
}

common_struct! {
    pub struct TypeAliasStatement {
        pub name: String,
        /// A type literal.
        pub ty: Expr,
        pub is_private: bool,
    }
}

common_struct! {
    /// Removes a class, field or function from the output.
    pub struct YeetStatement {
        pub target: Expr,
    }
}

common_struct! {
    pub struct CompoundStatement {
        pub statements: Vec<Statement>,
    }
}
