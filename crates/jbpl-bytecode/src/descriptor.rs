use std::fmt::{Display, Formatter};
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::BytecodeError;

/// A JVM field type descriptor (`I`, `[J`, `Ljava/lang/String;`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDescriptor {
    Void,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    Boolean,
    /// Internal class name, slash separated.
    Object(String),
    Array(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    pub fn object(internal_name: impl Into<String>) -> Self {
        TypeDescriptor::Object(internal_name.into())
    }

    pub fn array(element: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(element))
    }

    /// Number of local variable / operand stack slots a value of this type occupies.
    pub fn slot_size(&self) -> u16 {
        match self {
            TypeDescriptor::Void => 0,
            TypeDescriptor::Long | TypeDescriptor::Double => 2,
            _ => 1,
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, TypeDescriptor::Object(_) | TypeDescriptor::Array(_))
    }

    /// The name used by type instructions: internal name for classes, the descriptor for arrays.
    pub fn internal_name(&self) -> String {
        match self {
            TypeDescriptor::Object(name) => name.clone(),
            other => other.to_string(),
        }
    }

    fn parse_prefix(input: &str) -> Result<(TypeDescriptor, &str), BytecodeError> {
        let mut chars = input.chars();
        let head = chars
            .next()
            .ok_or_else(|| BytecodeError::InvalidDescriptor(input.to_string()))?;
        let rest = chars.as_str();
        let descriptor = match head {
            'V' => TypeDescriptor::Void,
            'B' => TypeDescriptor::Byte,
            'S' => TypeDescriptor::Short,
            'I' => TypeDescriptor::Int,
            'J' => TypeDescriptor::Long,
            'F' => TypeDescriptor::Float,
            'D' => TypeDescriptor::Double,
            'C' => TypeDescriptor::Char,
            'Z' => TypeDescriptor::Boolean,
            'L' => {
                let end = rest
                    .find(';')
                    .ok_or_else(|| BytecodeError::InvalidDescriptor(input.to_string()))?;
                return Ok((TypeDescriptor::Object(rest[..end].to_string()), &rest[end + 1..]));
            }
            '[' => {
                let (element, rest) = Self::parse_prefix(rest)?;
                return Ok((TypeDescriptor::array(element), rest));
            }
            _ => return Err(BytecodeError::InvalidDescriptor(input.to_string())),
        };
        Ok((descriptor, rest))
    }
}

impl Display for TypeDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeDescriptor::Void => write!(f, "V"),
            TypeDescriptor::Byte => write!(f, "B"),
            TypeDescriptor::Short => write!(f, "S"),
            TypeDescriptor::Int => write!(f, "I"),
            TypeDescriptor::Long => write!(f, "J"),
            TypeDescriptor::Float => write!(f, "F"),
            TypeDescriptor::Double => write!(f, "D"),
            TypeDescriptor::Char => write!(f, "C"),
            TypeDescriptor::Boolean => write!(f, "Z"),
            TypeDescriptor::Object(name) => write!(f, "L{};", name),
            TypeDescriptor::Array(element) => write!(f, "[{}", element),
        }
    }
}

impl FromStr for TypeDescriptor {
    type Err = BytecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descriptor, rest) = TypeDescriptor::parse_prefix(s)?;
        if !rest.is_empty() {
            return Err(BytecodeError::InvalidDescriptor(s.to_string()));
        }
        Ok(descriptor)
    }
}

/// A JVM method descriptor, `(params)return`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub params: Vec<TypeDescriptor>,
    pub return_type: TypeDescriptor,
}

impl MethodDescriptor {
    pub fn new(params: Vec<TypeDescriptor>, return_type: TypeDescriptor) -> Self {
        Self {
            params,
            return_type,
        }
    }

    /// Slots taken by the parameters, not counting `this`.
    pub fn params_slot_size(&self) -> u16 {
        self.params.iter().map(TypeDescriptor::slot_size).sum()
    }
}

impl Display for MethodDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}){}", self.params.iter().join(""), self.return_type)
    }
}

impl FromStr for MethodDescriptor {
    type Err = BytecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix('(')
            .ok_or_else(|| BytecodeError::InvalidDescriptor(s.to_string()))?;
        let close = body
            .find(')')
            .ok_or_else(|| BytecodeError::InvalidDescriptor(s.to_string()))?;
        let mut params = Vec::new();
        let mut remaining = &body[..close];
        while !remaining.is_empty() {
            let (param, rest) = TypeDescriptor::parse_prefix(remaining)?;
            params.push(param);
            remaining = rest;
        }
        let return_type = body[close + 1..].parse()?;
        Ok(MethodDescriptor::new(params, return_type))
    }
}
