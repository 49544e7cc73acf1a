//! The closed set of compile-time types.
//!
//! Builtin types are declared in ascending "promotable size" order; numeric
//! widening is decided purely by that order, see [`Type::is_assignable_from`].

mod commonizer;
mod matcher;

pub use commonizer::*;
pub use matcher::*;

use std::fmt::{Display, Formatter};

use itertools::Itertools;
use jbpl_bytecode::{Opcode, TypeDescriptor};
use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString};

use crate::ast::{Instruction, InstructionKind};
use crate::error::{Error, Result};
use crate::value::{PreproClassValue, RangeValue, Value};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    StrumDisplay,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BuiltinType {
    Void,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
    Bool,
    Object,
    String,
}

impl BuiltinType {
    /// Size of a value in bytes; zero for reference types.
    pub fn byte_size(self) -> i32 {
        match self {
            BuiltinType::Void => 0,
            BuiltinType::I8 => 1,
            BuiltinType::I16 => 2,
            BuiltinType::I32 => 4,
            BuiltinType::I64 => 8,
            BuiltinType::F32 => 4,
            BuiltinType::F64 => 8,
            BuiltinType::Char => 2,
            BuiltinType::Bool => 1,
            BuiltinType::Object | BuiltinType::String => 0,
        }
    }

    pub fn category(self) -> TypeCategory {
        match self {
            BuiltinType::Void => TypeCategory::Void,
            BuiltinType::I8 | BuiltinType::I16 | BuiltinType::I32 | BuiltinType::I64 => {
                TypeCategory::Integer
            }
            BuiltinType::F32 | BuiltinType::F64 => TypeCategory::Float,
            BuiltinType::Char => TypeCategory::Char,
            BuiltinType::Bool => TypeCategory::Bool,
            BuiltinType::Object => TypeCategory::Object,
            BuiltinType::String => TypeCategory::String,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self.category(),
            TypeCategory::Integer | TypeCategory::Float
        )
    }

    pub fn descriptor(self) -> TypeDescriptor {
        match self {
            BuiltinType::Void => TypeDescriptor::Void,
            BuiltinType::I8 => TypeDescriptor::Byte,
            BuiltinType::I16 => TypeDescriptor::Short,
            BuiltinType::I32 => TypeDescriptor::Int,
            BuiltinType::I64 => TypeDescriptor::Long,
            BuiltinType::F32 => TypeDescriptor::Float,
            BuiltinType::F64 => TypeDescriptor::Double,
            BuiltinType::Char => TypeDescriptor::Char,
            BuiltinType::Bool => TypeDescriptor::Boolean,
            BuiltinType::Object => TypeDescriptor::object("java/lang/Object"),
            BuiltinType::String => TypeDescriptor::object("java/lang/String"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay)]
pub enum TypeCategory {
    Void,
    Integer,
    Float,
    Bool,
    Char,
    Array,
    String,
    Object,
    Intersection,
    Range,
    Preprocessor,
}

impl TypeCategory {
    pub fn is_materializable(self) -> bool {
        !matches!(
            self,
            TypeCategory::Intersection | TypeCategory::Range | TypeCategory::Preprocessor
        )
    }
}

/// Meta types that only exist while the preprocessor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum PreproType {
    Type,
    FieldSignature,
    FunctionSignature,
    Selector,
    Opcode,
    Instruction,
    Injector,
}

impl PreproType {
    pub fn name(self) -> &'static str {
        match self {
            PreproType::Type => "type",
            PreproType::FieldSignature => "signature(field)",
            PreproType::FunctionSignature => "signature(fun)",
            PreproType::Selector => "selector",
            PreproType::Opcode => "opcode",
            PreproType::Instruction => "instruction",
            PreproType::Injector => "injector",
        }
    }

    fn parse(name: &str) -> Option<PreproType> {
        use strum::IntoEnumIterator;
        let name = name.replace(' ', "").to_ascii_lowercase();
        PreproType::iter().find(|ty| ty.name() == name)
    }
}

/// How a value of one type reaches a slot of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeConversion {
    None,
    Coerce,
    Direct,
}

impl TypeConversion {
    /// Points contributed to an overload rating.
    pub fn rating(self) -> u32 {
        match self {
            TypeConversion::None => 0,
            TypeConversion::Coerce => 1,
            TypeConversion::Direct => 2,
        }
    }
}

/// Name lookups a type needs while resolving or building default values.
pub trait TypeEnvironment {
    fn resolve_alias(&self, name: &str) -> Option<Type>;
    /// Resolved field list of a compile-time class, in declaration order.
    fn prepro_class_fields(&self, name: &str) -> Option<Vec<(String, Type)>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Builtin(BuiltinType),
    /// A JVM class, by internal name.
    Class(String),
    Array(Box<Type>),
    Intersection(Vec<Type>),
    PreproClass(String),
    Prepro(PreproType),
    Range(Box<Type>),
    /// A bare name not yet looked up as alias or compile-time class.
    Unresolved(String),
}

impl Type {
    pub const VOID: Type = Type::Builtin(BuiltinType::Void);
    pub const I8: Type = Type::Builtin(BuiltinType::I8);
    pub const I16: Type = Type::Builtin(BuiltinType::I16);
    pub const I32: Type = Type::Builtin(BuiltinType::I32);
    pub const I64: Type = Type::Builtin(BuiltinType::I64);
    pub const F32: Type = Type::Builtin(BuiltinType::F32);
    pub const F64: Type = Type::Builtin(BuiltinType::F64);
    pub const CHAR: Type = Type::Builtin(BuiltinType::Char);
    pub const BOOL: Type = Type::Builtin(BuiltinType::Bool);
    pub const OBJECT: Type = Type::Builtin(BuiltinType::Object);
    pub const STRING: Type = Type::Builtin(BuiltinType::String);

    pub fn class(name: impl Into<String>) -> Type {
        Type::Class(name.into().replace('.', "/"))
    }

    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn range(element: Type) -> Type {
        Type::Range(Box::new(element))
    }

    pub fn as_builtin(&self) -> Option<BuiltinType> {
        match self {
            Type::Builtin(builtin) => Some(*builtin),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        *self == Type::VOID
    }

    pub fn category(&self) -> TypeCategory {
        match self {
            Type::Builtin(builtin) => builtin.category(),
            Type::Class(_) => TypeCategory::Object,
            Type::Array(_) => TypeCategory::Array,
            Type::Intersection(_) => TypeCategory::Intersection,
            Type::Range(_) => TypeCategory::Range,
            Type::PreproClass(_) | Type::Prepro(_) | Type::Unresolved(_) => {
                TypeCategory::Preprocessor
            }
        }
    }

    pub fn is_materializable(&self) -> bool {
        self.category().is_materializable()
    }

    /// Converts the type into its binary descriptor.
    pub fn materialize(&self) -> Result<TypeDescriptor> {
        match self {
            Type::Builtin(builtin) => Ok(builtin.descriptor()),
            Type::Class(name) => Ok(TypeDescriptor::object(name.clone())),
            Type::Array(element) => {
                if !element.is_materializable() {
                    return Err(Error::materialization(format!(
                        "array element type {} is not materializable",
                        element
                    )));
                }
                Ok(TypeDescriptor::array(element.materialize()?))
            }
            other => Err(Error::materialization(format!(
                "type {} only exists at compile time",
                other
            ))),
        }
    }

    /// Internal name of a class-like type (`java/lang/String`).
    pub fn internal_name(&self) -> Result<String> {
        Ok(self.materialize()?.internal_name())
    }

    pub fn from_descriptor(descriptor: &TypeDescriptor) -> Type {
        match descriptor {
            TypeDescriptor::Void => Type::VOID,
            TypeDescriptor::Byte => Type::I8,
            TypeDescriptor::Short => Type::I16,
            TypeDescriptor::Int => Type::I32,
            TypeDescriptor::Long => Type::I64,
            TypeDescriptor::Float => Type::F32,
            TypeDescriptor::Double => Type::F64,
            TypeDescriptor::Char => Type::CHAR,
            TypeDescriptor::Boolean => Type::BOOL,
            TypeDescriptor::Object(name) if name == "java/lang/Object" => Type::OBJECT,
            TypeDescriptor::Object(name) if name == "java/lang/String" => Type::STRING,
            TypeDescriptor::Object(name) => Type::Class(name.clone()),
            TypeDescriptor::Array(element) => Type::array(Type::from_descriptor(element)),
        }
    }

    /// Replaces aliases and compile-time class names with what they refer to.
    pub fn resolve(&self, env: &dyn TypeEnvironment) -> Result<Type> {
        Ok(match self {
            Type::Unresolved(name) => match env.resolve_alias(name) {
                Some(alias) => alias.resolve(env)?,
                None if env.prepro_class_fields(name).is_some() => {
                    Type::PreproClass(name.clone())
                }
                None => {
                    return Err(Error::unresolved(
                        crate::error::SymbolKind::Type,
                        name.clone(),
                        crate::span::TokenRange::Undefined,
                    ))
                }
            },
            Type::Array(element) => Type::array(element.resolve(env)?),
            Type::Range(element) => Type::range(element.resolve(env)?),
            Type::Intersection(types) => Type::Intersection(
                types
                    .iter()
                    .map(|ty| ty.resolve(env))
                    .collect::<Result<Vec<_>>>()?,
            ),
            other => other.clone(),
        })
    }

    /// Flattens nested intersections into a single list of alternatives.
    pub fn unfold(&self) -> Vec<Type> {
        match self {
            Type::Intersection(types) => types.iter().flat_map(Type::unfold).collect(),
            other => vec![other.clone()],
        }
    }

    pub fn intersect(types: impl IntoIterator<Item = Type>) -> Type {
        let types = types
            .into_iter()
            .flat_map(|ty| ty.unfold())
            .unique()
            .collect::<Vec<_>>();
        if types.len() == 1 {
            return types.into_iter().next().unwrap_or(Type::VOID);
        }
        Type::Intersection(types)
    }

    /// Whether a value of type `other` may be stored where `self` is expected.
    pub fn is_assignable_from(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Builtin(BuiltinType::Object), _) => true,
            (Type::Builtin(this), Type::Builtin(that)) if this.is_numeric() && that.is_numeric() => {
                that <= this
            }
            (Type::Intersection(_), _) => self
                .unfold()
                .iter()
                .any(|alternative| alternative.is_assignable_from(other)),
            _ => self == other,
        }
    }

    pub fn conversion_from(&self, other: &Type) -> TypeConversion {
        if self == other {
            TypeConversion::Direct
        } else if self.is_assignable_from(other) {
            TypeConversion::Coerce
        } else {
            TypeConversion::None
        }
    }

    pub fn default_value(&self, env: &dyn TypeEnvironment) -> Result<Value> {
        let value = match self {
            Type::Builtin(builtin) => match builtin {
                BuiltinType::Void => Value::Unit,
                BuiltinType::I8 => Value::I8(0),
                BuiltinType::I16 => Value::I16(0),
                BuiltinType::I32 => Value::I32(0),
                BuiltinType::I64 => Value::I64(0),
                BuiltinType::F32 => Value::F32(0.0),
                BuiltinType::F64 => Value::F64(0.0),
                BuiltinType::Char => Value::Char(' '),
                BuiltinType::Bool => Value::Bool(false),
                BuiltinType::String => Value::String(String::new()),
                BuiltinType::Object => return Err(self.no_default()),
            },
            Type::Array(element) => Value::array((**element).clone(), Vec::new()),
            Type::Range(element) => {
                let start = element.default_value(env)?;
                Value::Range(RangeValue::new((**element).clone(), &start, &start)?)
            }
            Type::Prepro(PreproType::Type) => Value::Type(Type::VOID),
            Type::Prepro(PreproType::Opcode) => Value::Opcode(Opcode::NOP),
            Type::Prepro(PreproType::Instruction) => Value::Instruction(Box::new(
                Instruction::synthetic(InstructionKind::Opless(Opcode::NOP)),
            )),
            Type::PreproClass(name) => {
                let fields = env.prepro_class_fields(name).ok_or_else(|| {
                    Error::unresolved(
                        crate::error::SymbolKind::Type,
                        name.clone(),
                        crate::span::TokenRange::Undefined,
                    )
                })?;
                let fields = fields
                    .into_iter()
                    .map(|(field, ty)| Ok((field, ty.default_value(env)?)))
                    .collect::<Result<Vec<_>>>()?;
                Value::Class(PreproClassValue {
                    name: name.clone(),
                    fields,
                })
            }
            Type::Unresolved(_) => return self.resolve(env)?.default_value(env),
            Type::Class(_) | Type::Intersection(_) | Type::Prepro(_) => {
                return Err(self.no_default())
            }
        };
        Ok(value)
    }

    fn no_default(&self) -> Error {
        Error::evaluation(
            format!("Type {} has no default value", self),
            crate::span::TokenRange::Undefined,
        )
    }

    /// Parses the textual form produced by `Display`.
    pub fn try_parse(text: &str) -> Option<Type> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Ok(builtin) = text.parse::<BuiltinType>() {
            return Some(Type::Builtin(builtin));
        }
        if let Some(prepro) = PreproType::parse(text) {
            return Some(Type::Prepro(prepro));
        }
        if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            return Type::try_parse(inner).map(Type::array);
        }
        if let Some(inner) = text.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            return (!inner.trim().is_empty()).then(|| Type::class(inner.trim()));
        }
        if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
            let types = split_top_level(inner, '|')
                .into_iter()
                .map(Type::try_parse)
                .collect::<Option<Vec<_>>>()?;
            return Some(Type::intersect(types));
        }
        let is_identifier = text
            .chars()
            .enumerate()
            .all(|(i, c)| c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()));
        is_identifier.then(|| Type::Unresolved(text.to_string()))
    }
}

fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        match c {
            '(' | '[' | '<' => depth += 1,
            ')' | ']' | '>' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(&text[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

impl From<BuiltinType> for Type {
    fn from(builtin: BuiltinType) -> Self {
        Type::Builtin(builtin)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Builtin(builtin) => write!(f, "{}", builtin),
            Type::Class(name) => write!(f, "<{}>", name),
            Type::Array(element) => write!(f, "[{}]", element),
            Type::Intersection(types) => write!(f, "({})", types.iter().join(" | ")),
            Type::PreproClass(name) | Type::Unresolved(name) => write!(f, "{}", name),
            Type::Prepro(prepro) => write!(f, "{}", prepro.name()),
            Type::Range(element) => write!(f, "range<{}>", element),
        }
    }
}
