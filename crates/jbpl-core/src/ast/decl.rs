use itertools::Itertools;
use jbpl_bytecode::access;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::{Element, Expr, Instruction};
use crate::span::TokenRange;
use crate::{common_enum, common_struct};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum AccessModifier {
    Public,
    Protected,
    Private,
    Static,
    Final,
    Sync,
}

impl AccessModifier {
    pub fn flag(self) -> u16 {
        match self {
            AccessModifier::Public => access::ACC_PUBLIC,
            AccessModifier::Protected => access::ACC_PROTECTED,
            AccessModifier::Private => access::ACC_PRIVATE,
            AccessModifier::Static => access::ACC_STATIC,
            AccessModifier::Final => access::ACC_FINAL,
            AccessModifier::Sync => access::ACC_SYNCHRONIZED,
        }
    }

    pub fn combine(modifiers: &[AccessModifier]) -> u16 {
        modifiers.iter().fold(0, |acc, modifier| acc | modifier.flag())
    }

    pub fn applicable_to_class(self) -> bool {
        matches!(self, AccessModifier::Public | AccessModifier::Final)
    }

    pub fn applicable_to_field(self) -> bool {
        !matches!(self, AccessModifier::Sync)
    }

    pub fn applicable_to_function(self) -> bool {
        true
    }

    pub fn join(modifiers: &[AccessModifier]) -> String {
        modifiers.iter().join(" ")
    }
}

common_struct! {
    pub struct Declaration {
        pub kind: DeclarationKind,
        pub range: TokenRange,
    }
}

common_enum! {
    pub enum DeclarationKind {
        Class(ClassDecl),
        Field(FieldDecl),
        Function(FunctionDecl),
        Macro(MacroDecl),
        PreproClass(PreproClassDecl),
        Selector(SelectorDecl),
        Injector(InjectorDecl),
        Block(BlockDecl),
        Empty,
    }
}

impl Declaration {
    pub fn new(kind: DeclarationKind) -> Self {
        Self {
            kind,
            range: TokenRange::Synthetic,
        }
    }

    pub fn with_range(mut self, range: TokenRange) -> Self {
        self.range = range;
        self
    }

    pub fn is_evaluated_directly(&self) -> bool {
        !matches!(
            self.kind,
            DeclarationKind::Macro(_)
                | DeclarationKind::PreproClass(_)
                | DeclarationKind::Selector(_)
                | DeclarationKind::Empty
        )
    }
}

macro_rules! into_declaration {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Declaration {
                fn from(decl: $ty) -> Self {
                    Declaration::new(DeclarationKind::$variant(decl))
                }
            }

            impl From<$ty> for Element {
                fn from(decl: $ty) -> Self {
                    Element::Declaration(Declaration::from(decl))
                }
            }
        )*
    };
}

into_declaration! {
    Class(ClassDecl),
    Field(FieldDecl),
    Function(FunctionDecl),
    Macro(MacroDecl),
    PreproClass(PreproClassDecl),
    Selector(SelectorDecl),
    Injector(InjectorDecl),
    Block(BlockDecl),
}

common_struct! {
    /// Creates a new class in the output.
    pub struct ClassDecl {
        pub ty: Expr,
        /// Defaults to `java/lang/Object`.
        pub super_type: Option<Expr>,
        pub interfaces: Vec<Expr>,
        pub modifiers: Vec<AccessModifier>,
    }
}

impl ClassDecl {
    pub fn new(ty: Expr) -> Self {
        Self {
            ty,
            super_type: None,
            interfaces: Vec::new(),
            modifiers: vec![AccessModifier::Public],
        }
    }
}

common_struct! {
    /// Adds a field to an existing or new class; the signature names the owner.
    pub struct FieldDecl {
        pub signature: Expr,
        pub initializer: Option<Expr>,
        pub modifiers: Vec<AccessModifier>,
    }
}

impl FieldDecl {
    pub fn new(signature: Expr) -> Self {
        Self {
            signature,
            initializer: None,
            modifiers: Vec::new(),
        }
    }
}

common_struct! {
    pub struct FunctionDecl {
        pub signature: Expr,
        pub modifiers: Vec<AccessModifier>,
        pub body: Vec<Element>,
    }
}

impl FunctionDecl {
    pub fn new(signature: Expr, body: Vec<Element>) -> Self {
        Self {
            signature,
            modifiers: Vec::new(),
            body,
        }
    }

    pub fn with_modifiers(mut self, modifiers: impl IntoIterator<Item = AccessModifier>) -> Self {
        self.modifiers.extend(modifiers);
        self
    }
}

common_struct! {
    pub struct MacroParameter {
        pub name: String,
        pub ty: Expr,
    }
}

impl MacroParameter {
    pub fn new(name: impl Into<String>, ty: Expr) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

common_struct! {
    pub struct MacroDecl {
        pub name: String,
        pub parameters: Vec<MacroParameter>,
        pub return_type: Expr,
        pub body: Vec<Element>,
        pub is_private: bool,
    }
}

impl MacroDecl {
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<MacroParameter>,
        return_type: Expr,
        body: Vec<Element>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            return_type,
            body,
            is_private: false,
        }
    }
}

common_struct! {
    pub struct PreproClassField {
        pub name: String,
        pub ty: Expr,
    }
}

common_struct! {
    /// A struct-like type that only exists while the preprocessor runs.
    pub struct PreproClassDecl {
        pub name: String,
        pub fields: Vec<PreproClassField>,
    }
}

impl PreproClassDecl {
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = (String, Expr)>) -> Self {
        Self {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(name, ty)| PreproClassField { name, ty })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConditionOrder {
    Before,
    After,
}

common_enum! {
    pub enum ConditionTarget {
        Opcode(jbpl_bytecode::Opcode),
        Instruction(Instruction),
    }
}

common_struct! {
    pub struct SelectorCondition {
        pub order: ConditionOrder,
        pub target: ConditionTarget,
        pub range: TokenRange,
    }
}

impl SelectorCondition {
    pub fn new(order: ConditionOrder, target: ConditionTarget) -> Self {
        Self {
            order,
            target,
            range: TokenRange::Synthetic,
        }
    }
}

common_struct! {
    /// Locates an insertion point inside an existing method body.
    pub struct SelectorDecl {
        pub name: String,
        pub conditions: Vec<SelectorCondition>,
        pub offset: Option<Expr>,
    }
}

impl SelectorDecl {
    pub fn new(name: impl Into<String>, conditions: Vec<SelectorCondition>) -> Self {
        Self {
            name: name.into(),
            conditions,
            offset: None,
        }
    }
}

common_struct! {
    /// Splices its body into the target function at the point a selector finds.
    pub struct InjectorDecl {
        pub target: Expr,
        pub selector: Expr,
        pub body: Vec<Element>,
    }
}

common_struct! {
    pub struct BlockDecl {
        pub name: String,
        pub body: Vec<Element>,
    }
}
