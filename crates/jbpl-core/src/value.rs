//! Compile-time values produced by evaluating expressions.

use std::fmt::{Display, Formatter};

use itertools::Itertools;
use jbpl_bytecode::{Constant, MethodDescriptor, Opcode};

use crate::ast::Instruction;
use crate::error::{Error, Result};
use crate::span::TokenRange;
use crate::types::{BuiltinType, PreproType, Type, TypeCategory};
use crate::{common_enum, common_struct};

common_enum! {
    pub enum Value {
        Unit,
        I8(i8),
        I16(i16),
        I32(i32),
        I64(i64),
        F32(f32),
        F64(f64),
        Bool(bool),
        Char(char),
        String(String),
        Type(Type),
        Opcode(Opcode),
        Instruction(Box<Instruction>),
        FieldSignature(FieldSignature),
        FunctionSignature(FunctionSignature),
        Array(ArrayValue),
        Range(RangeValue),
        Class(PreproClassValue),
        Selector(String),
    }
}

common_struct! {
    pub struct FieldSignature {
        pub owner: Type,
        pub name: String,
        pub ty: Type,
    }
}

impl FieldSignature {
    pub fn descriptor(&self) -> Result<String> {
        Ok(self.ty.materialize()?.to_string())
    }
}

impl Display for FieldSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}: {}", self.owner, self.name, self.ty)
    }
}

common_struct! {
    pub struct FunctionSignature {
        pub owner: Type,
        pub name: String,
        pub return_type: Type,
        pub params: Vec<Type>,
    }
}

impl FunctionSignature {
    pub fn descriptor(&self) -> Result<MethodDescriptor> {
        let params = self
            .params
            .iter()
            .map(Type::materialize)
            .collect::<Result<Vec<_>>>()?;
        Ok(MethodDescriptor::new(params, self.return_type.materialize()?))
    }
}

impl Display for FunctionSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}({}): {}",
            self.owner,
            self.name,
            self.params.iter().join(", "),
            self.return_type
        )
    }
}

common_struct! {
    pub struct ArrayValue {
        pub element_type: Type,
        pub values: Vec<Value>,
    }
}

/// Largest range that is expanded into its elements.
pub const MAX_RANGE_VALUES: usize = 1 << 20;

common_struct! {
    /// Integer-like range with an exclusive end.
    pub struct RangeValue {
        pub element_type: Type,
        pub start: i64,
        pub end: i64,
    }
}

impl RangeValue {
    pub fn new(element_type: Type, start: &Value, end: &Value) -> Result<Self> {
        let bound = |value: &Value| {
            value.as_i64().ok_or_else(|| {
                Error::type_mismatch(
                    format!("Range bound {} must be an integer or char", value),
                    TokenRange::Undefined,
                )
            })
        };
        Ok(Self {
            element_type,
            start: bound(start)?,
            end: bound(end)?,
        })
    }

    /// Makes the current end part of the range.
    pub fn include_end(&mut self) -> Result<()> {
        self.end = self.end.checked_add(1).ok_or_else(|| {
            Error::evaluation(
                format!("Inclusive range end {} is too large", self.end),
                TokenRange::Undefined,
            )
        })?;
        Ok(())
    }

    /// Number of elements, saturating at `usize::MAX`.
    pub fn len(&self) -> usize {
        let len = (i128::from(self.end) - i128::from(self.start)).max(0);
        usize::try_from(len).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, value: i64) -> bool {
        (self.start..self.end).contains(&value)
    }

    /// Every element of the range, typed as the range's element type.
    pub fn values(&self) -> Result<Vec<Value>> {
        if self.len() > MAX_RANGE_VALUES {
            return Err(Error::evaluation(
                format!(
                    "Range {}..<{} has too many elements to iterate",
                    self.start, self.end
                ),
                TokenRange::Undefined,
            ));
        }
        (self.start..self.end)
            .map(|index| Value::I64(index).cast(&self.element_type))
            .collect()
    }
}

common_struct! {
    /// Instance of a compile-time class; fields are kept in declaration order.
    pub struct PreproClassValue {
        pub name: String,
        pub fields: Vec<(String, Value)>,
    }
}

impl PreproClassValue {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

impl Value {
    pub fn array(element_type: Type, values: Vec<Value>) -> Value {
        Value::Array(ArrayValue {
            element_type,
            values,
        })
    }

    pub fn ty(&self) -> Type {
        match self {
            Value::Unit => Type::VOID,
            Value::I8(_) => Type::I8,
            Value::I16(_) => Type::I16,
            Value::I32(_) => Type::I32,
            Value::I64(_) => Type::I64,
            Value::F32(_) => Type::F32,
            Value::F64(_) => Type::F64,
            Value::Bool(_) => Type::BOOL,
            Value::Char(_) => Type::CHAR,
            Value::String(_) => Type::STRING,
            Value::Type(_) => Type::Prepro(PreproType::Type),
            Value::Opcode(_) => Type::Prepro(PreproType::Opcode),
            Value::Instruction(_) => Type::Prepro(PreproType::Instruction),
            Value::FieldSignature(_) => Type::Prepro(PreproType::FieldSignature),
            Value::FunctionSignature(_) => Type::Prepro(PreproType::FunctionSignature),
            Value::Array(array) => Type::array(array.element_type.clone()),
            Value::Range(range) => Type::range(range.element_type.clone()),
            Value::Class(class) => Type::PreproClass(class.name.clone()),
            Value::Selector(_) => Type::Prepro(PreproType::Selector),
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    /// Integer view of integral values and chars.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I8(v) => Some(*v as i64),
            Value::I16(v) => Some(*v as i64),
            Value::I32(v) => Some(*v as i64),
            Value::I64(v) => Some(*v),
            Value::Char(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&Type> {
        match self {
            Value::Type(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_instruction(&self) -> Option<&Instruction> {
        match self {
            Value::Instruction(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Converts the value for storage in a slot of type `target`, following the
    /// builtin cast table. Values already of the target type are returned unchanged.
    pub fn cast(&self, target: &Type) -> Result<Value> {
        let source = self.ty();
        if &source == target {
            return Ok(self.clone());
        }
        let fail = || {
            Error::type_mismatch(
                format!("Cannot cast value of type {} to type {}", source, target),
                TokenRange::Undefined,
            )
        };
        let builtin = match target {
            Type::Builtin(builtin) => *builtin,
            Type::Prepro(PreproType::Type) => {
                return match self {
                    Value::String(text) => Type::try_parse(text).map(Value::Type).ok_or_else(fail),
                    _ => Err(fail()),
                }
            }
            Type::Prepro(PreproType::Opcode) => {
                return match self {
                    Value::String(text) => Ok(Value::Opcode(Opcode::by_name(text)?)),
                    _ => Err(fail()),
                }
            }
            Type::Array(element) => {
                return match self {
                    Value::Array(array) => Ok(Value::array(
                        (**element).clone(),
                        array
                            .values
                            .iter()
                            .map(|value| value.cast(element))
                            .collect::<Result<_>>()?,
                    )),
                    _ => Err(fail()),
                }
            }
            Type::Intersection(_) if target.is_assignable_from(&source) => return Ok(self.clone()),
            _ => return Err(fail()),
        };
        match builtin {
            BuiltinType::Object => return Ok(self.clone()),
            BuiltinType::String => return Ok(Value::String(self.to_string())),
            BuiltinType::Void => return Err(fail()),
            _ => {}
        }
        let value = match self {
            Value::Bool(v) => match builtin {
                BuiltinType::Char => return Err(fail()),
                _ => Value::I64(*v as i64),
            },
            Value::String(text) => return parse_builtin(text, builtin).ok_or_else(fail),
            Value::F32(_) | Value::F64(_) => {
                let v = self.as_f64().ok_or_else(fail)?;
                return Ok(match builtin {
                    BuiltinType::F32 => Value::F32(v as f32),
                    BuiltinType::F64 => Value::F64(v),
                    BuiltinType::Bool => Value::Bool(v != 0.0),
                    _ => Value::I64(v as i64).cast(target)?,
                });
            }
            other if other.as_i64().is_some() => other.clone(),
            _ => return Err(fail()),
        };
        let v = value.as_i64().ok_or_else(fail)?;
        Ok(match builtin {
            BuiltinType::I8 => Value::I8(v as i8),
            BuiltinType::I16 => Value::I16(v as i16),
            BuiltinType::I32 => Value::I32(v as i32),
            BuiltinType::I64 => Value::I64(v),
            BuiltinType::F32 => Value::F32(v as f32),
            BuiltinType::F64 => Value::F64(v as f64),
            BuiltinType::Bool => Value::Bool(v != 0),
            BuiltinType::Char => Value::Char(char::from_u32(v as u32).ok_or_else(fail)?),
            BuiltinType::Void | BuiltinType::Object | BuiltinType::String => return Err(fail()),
        })
    }

    /// Constant pool entry for an `ldc` of this value; `None` for values that have none.
    pub fn to_constant(&self) -> Result<Option<Constant>> {
        Ok(Some(match self {
            Value::I8(v) => Constant::Int(*v as i32),
            Value::I16(v) => Constant::Int(*v as i32),
            Value::I32(v) => Constant::Int(*v),
            Value::Char(v) => Constant::Int(*v as i32),
            Value::Bool(v) => Constant::Int(*v as i32),
            Value::I64(v) => Constant::Long(*v),
            Value::F32(v) => Constant::Float(*v),
            Value::F64(v) => Constant::Double(*v),
            Value::String(v) => Constant::String(v.clone()),
            Value::Type(ty) => Constant::Type(ty.materialize()?),
            Value::FunctionSignature(sig) => Constant::MethodType(sig.descriptor()?),
            _ => return Ok(None),
        }))
    }

    pub fn from_constant(constant: &Constant) -> Value {
        match constant {
            Constant::Int(v) => Value::I32(*v),
            Constant::Long(v) => Value::I64(*v),
            Constant::Float(v) => Value::F32(*v),
            Constant::Double(v) => Value::F64(*v),
            Constant::String(v) => Value::String(v.clone()),
            Constant::Type(descriptor) => Value::Type(Type::from_descriptor(descriptor)),
            Constant::MethodType(descriptor) => Value::String(descriptor.to_string()),
            Constant::Handle(handle) => Value::String(handle.to_string()),
        }
    }

    pub fn category(&self) -> TypeCategory {
        self.ty().category()
    }
}

fn parse_builtin(text: &str, builtin: BuiltinType) -> Option<Value> {
    let text = text.trim();
    let integer = || -> Option<i64> {
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16).ok()?
        } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
            i64::from_str_radix(bin, 2).ok()?
        } else {
            digits.parse::<i64>().ok()?
        };
        Some(if negative { -magnitude } else { magnitude })
    };
    Some(match builtin {
        BuiltinType::I8 => Value::I8(i8::try_from(integer()?).ok()?),
        BuiltinType::I16 => Value::I16(i16::try_from(integer()?).ok()?),
        BuiltinType::I32 => Value::I32(i32::try_from(integer()?).ok()?),
        BuiltinType::I64 => Value::I64(integer()?),
        BuiltinType::F32 => Value::F32(text.parse().ok()?),
        BuiltinType::F64 => Value::F64(text.parse().ok()?),
        BuiltinType::Bool => Value::Bool(text.eq_ignore_ascii_case("true")),
        BuiltinType::Char => Value::Char(text.chars().next()?),
        _ => return None,
    })
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Unit => write!(f, "unit"),
            Value::I8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Type(v) => write!(f, "{}", v),
            Value::Opcode(v) => write!(f, "{}", v),
            Value::Instruction(v) => write!(f, "{}", v),
            Value::FieldSignature(v) => write!(f, "{}", v),
            Value::FunctionSignature(v) => write!(f, "{}", v),
            Value::Array(array) => write!(f, "[{}]", array.values.iter().join(", ")),
            Value::Range(range) => write!(f, "{}..<{}", range.start, range.end),
            Value::Class(class) => write!(
                f,
                "{}{{{}}}",
                class.name,
                class
                    .fields
                    .iter()
                    .map(|(name, value)| format!("{}: {}", name, value))
                    .join(", ")
            ),
            Value::Selector(name) => write!(f, "selector {}", name),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

value_from! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    char => Char,
    String => String,
    Type => Type,
    Opcode => Opcode,
    FieldSignature => FieldSignature,
    FunctionSignature => FunctionSignature,
    ArrayValue => Array,
    RangeValue => Range,
    PreproClassValue => Class,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Instruction> for Value {
    fn from(value: Instruction) -> Self {
        Value::Instruction(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn casts_follow_builtin_table() {
        assert_eq!(Value::I32(300).cast(&Type::I8).unwrap(), Value::I8(44));
        assert_eq!(Value::Bool(true).cast(&Type::I32).unwrap(), Value::I32(1));
        assert_eq!(Value::Char('A').cast(&Type::I64).unwrap(), Value::I64(65));
        assert_eq!(Value::from("0x10").cast(&Type::I16).unwrap(), Value::I16(16));
        assert_eq!(Value::F64(2.9).cast(&Type::I32).unwrap(), Value::I32(2));
        assert_eq!(Value::I32(7).cast(&Type::STRING).unwrap(), Value::from("7"));
        assert_eq!(
            Value::from("iadd").cast(&Type::Prepro(PreproType::Opcode)).unwrap(),
            Value::Opcode(Opcode::IADD)
        );
        assert!(Value::Bool(true).cast(&Type::CHAR).is_err());
        assert!(Value::Unit.cast(&Type::I32).is_err());
    }

    #[test]
    fn range_values_are_end_exclusive() {
        let range = RangeValue::new(Type::I32, &Value::I32(1), &Value::I32(4)).unwrap();
        assert_eq!(range.len(), 3);
        assert!(range.contains(3));
        assert!(!range.contains(4));
        assert_eq!(
            range.values().unwrap(),
            vec![Value::I32(1), Value::I32(2), Value::I32(3)]
        );
    }

    #[test]
    fn extreme_ranges_do_not_overflow() {
        let wide = RangeValue::new(Type::I64, &Value::I64(i64::MIN), &Value::I64(1)).unwrap();
        assert!(wide.len() > MAX_RANGE_VALUES);
        assert!(wide.values().is_err());

        let mut full = RangeValue::new(Type::I64, &Value::I64(0), &Value::I64(i64::MAX)).unwrap();
        assert!(full.include_end().is_err());
        assert_eq!(full.end, i64::MAX);
    }
}
