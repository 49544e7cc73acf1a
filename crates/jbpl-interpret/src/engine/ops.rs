//! Operator semantics on compile-time values.
//!
//! Numeric operands are promoted to the wider of the two builtin types, with
//! chars taking part as `i32`. Integer arithmetic wraps like the JVM's.

use std::cmp::Ordering;

use super::*;

use jbpl_core::types::{BuiltinType, TypeCategory};
use jbpl_core::value::ArrayValue;

fn unsupported(op: impl std::fmt::Display, lhs: &Value, rhs: &Value, range: TokenRange) -> Error {
    Error::type_mismatch(
        format!(
            "Operator {} is not defined for {} and {}",
            op,
            lhs.ty(),
            rhs.ty()
        ),
        range,
    )
}

fn numeric_type(value: &Value) -> Option<BuiltinType> {
    match value.ty().as_builtin()? {
        BuiltinType::Char => Some(BuiltinType::I32),
        builtin if builtin.is_numeric() => Some(builtin),
        _ => None,
    }
}

fn promote(lhs: &Value, rhs: &Value) -> Option<BuiltinType> {
    Some(numeric_type(lhs)?.max(numeric_type(rhs)?))
}

pub(crate) fn binary(op: BinaryOp, lhs: &Value, rhs: &Value, range: TokenRange) -> Result<Value> {
    let fail = || unsupported(op.symbol(), lhs, rhs, range);
    match op {
        BinaryOp::Eq => Ok(Value::Bool(equals(lhs, rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!equals(lhs, rhs))),
        BinaryOp::Lt => Ok(Value::Bool(compare(op, lhs, rhs, range)?.is_lt())),
        BinaryOp::Le => Ok(Value::Bool(compare(op, lhs, rhs, range)?.is_le())),
        BinaryOp::Gt => Ok(Value::Bool(compare(op, lhs, rhs, range)?.is_gt())),
        BinaryOp::Ge => Ok(Value::Bool(compare(op, lhs, rhs, range)?.is_ge())),
        BinaryOp::Cmp => Ok(Value::I32(match compare(op, lhs, rhs, range)? {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        })),
        BinaryOp::Add => match (lhs, rhs) {
            (Value::Array(array), _) => append(array, rhs, range),
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{}{}", lhs, rhs)))
            }
            _ => arithmetic(op, lhs, rhs, range),
        },
        BinaryOp::Sub => match lhs {
            Value::Array(array) => Ok(remove(array, rhs)),
            _ => arithmetic(op, lhs, rhs, range),
        },
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => match (lhs, rhs) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(match op {
                BinaryOp::And => a & b,
                BinaryOp::Or => a | b,
                _ => a ^ b,
            })),
            (Value::Type(a), Value::Type(b)) if op == BinaryOp::Or => {
                Ok(Value::Type(Type::intersect([a.clone(), b.clone()])))
            }
            _ => arithmetic(op, lhs, rhs, range),
        },
        BinaryOp::Mul
        | BinaryOp::Div
        | BinaryOp::Rem
        | BinaryOp::Lsh
        | BinaryOp::Rsh
        | BinaryOp::Ursh => arithmetic(op, lhs, rhs, range),
        _ => Err(fail()),
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value, range: TokenRange) -> Result<Value> {
    let fail = || unsupported(op.symbol(), lhs, rhs, range);
    let ty = promote(lhs, rhs).ok_or_else(fail)?;
    let target = Type::Builtin(ty);
    let result = match ty.category() {
        TypeCategory::Float => {
            let (a, b) = (lhs.as_f64().ok_or_else(fail)?, rhs.as_f64().ok_or_else(fail)?);
            Value::F64(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                _ => return Err(fail()),
            })
        }
        _ => {
            let (a, b) = (lhs.as_i64().ok_or_else(fail)?, rhs.as_i64().ok_or_else(fail)?);
            let mask = if ty == BuiltinType::I64 { 63 } else { 31 };
            Value::I64(match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div | BinaryOp::Rem => {
                    interp_ensure!(b != 0, "Division by zero", range);
                    if op == BinaryOp::Div {
                        a.wrapping_div(b)
                    } else {
                        a.wrapping_rem(b)
                    }
                }
                BinaryOp::And => a & b,
                BinaryOp::Or => a | b,
                BinaryOp::Xor => a ^ b,
                BinaryOp::Lsh => a.wrapping_shl((b & mask) as u32),
                BinaryOp::Rsh => a.wrapping_shr((b & mask) as u32),
                BinaryOp::Ursh if ty == BuiltinType::I64 => ((a as u64) >> (b & mask)) as i64,
                BinaryOp::Ursh => ((a as u32) >> (b & mask)) as i64,
                _ => return Err(fail()),
            })
        }
    };
    result.cast(&target).map_err(|error| error.at(range))
}

fn append(array: &ArrayValue, rhs: &Value, range: TokenRange) -> Result<Value> {
    let mut values = array.values.clone();
    match rhs {
        Value::Array(other) if array.element_type.is_assignable_from(&other.element_type) => {
            for value in &other.values {
                values.push(value.cast(&array.element_type).map_err(|error| error.at(range))?);
            }
        }
        value if array.element_type.is_assignable_from(&value.ty()) => {
            values.push(value.cast(&array.element_type).map_err(|error| error.at(range))?);
        }
        value => {
            return Err(Error::type_mismatch(
                format!(
                    "Cannot add value of type {} to array of {}",
                    value.ty(),
                    array.element_type
                ),
                range,
            ))
        }
    }
    Ok(Value::array(array.element_type.clone(), values))
}

fn remove(array: &ArrayValue, rhs: &Value) -> Value {
    let removed: &[Value] = match rhs {
        Value::Array(other) => &other.values,
        value => std::slice::from_ref(value),
    };
    Value::array(
        array.element_type.clone(),
        array
            .values
            .iter()
            .filter(|value| !removed.iter().any(|it| equals(value, it)))
            .cloned()
            .collect(),
    )
}

/// Equality with numeric values compared by magnitude across types.
pub(crate) fn equals(lhs: &Value, rhs: &Value) -> bool {
    match promote(lhs, rhs) {
        Some(ty) if ty.category() == TypeCategory::Float => lhs.as_f64() == rhs.as_f64(),
        Some(_) => lhs.as_i64() == rhs.as_i64(),
        None => lhs == rhs,
    }
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value, range: TokenRange) -> Result<Ordering> {
    let fail = || unsupported(op.symbol(), lhs, rhs, range);
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        _ => match promote(lhs, rhs).ok_or_else(fail)?.category() {
            TypeCategory::Float => lhs
                .as_f64()
                .zip(rhs.as_f64())
                .and_then(|(a, b)| a.partial_cmp(&b))
                .ok_or_else(fail),
            _ => lhs
                .as_i64()
                .zip(rhs.as_i64())
                .map(|(a, b)| a.cmp(&b))
                .ok_or_else(fail),
        },
    }
}

/// `+`, `-`, `~` and `!`; increments are handled where the operand is assigned.
pub(crate) fn unary(op: UnaryOp, operand: &Value, range: TokenRange) -> Result<Value> {
    let fail = || {
        Error::type_mismatch(
            format!("Operator {:?} is not defined for {}", op, operand.ty()),
            range,
        )
    };
    match (op, operand) {
        (UnaryOp::Not, Value::Bool(value)) => Ok(Value::Bool(!value)),
        (UnaryOp::Plus | UnaryOp::Minus | UnaryOp::Inverse, _) => {
            let ty = numeric_type(operand).ok_or_else(fail)?;
            let result = match (op, ty.category()) {
                (UnaryOp::Plus, _) => operand.clone(),
                (UnaryOp::Minus, TypeCategory::Float) => {
                    Value::F64(-operand.as_f64().ok_or_else(fail)?)
                }
                (UnaryOp::Minus, _) => Value::I64(operand.as_i64().ok_or_else(fail)?.wrapping_neg()),
                (UnaryOp::Inverse, TypeCategory::Integer) => {
                    Value::I64(!operand.as_i64().ok_or_else(fail)?)
                }
                _ => return Err(fail()),
            };
            result
                .cast(&Type::Builtin(ty))
                .map_err(|error| error.at(range))
        }
        _ => Err(fail()),
    }
}

/// The value one step up or down from `value`, keeping its type.
pub(crate) fn step(value: &Value, up: bool, range: TokenRange) -> Result<Value> {
    let delta = Value::I32(if up { 1 } else { -1 });
    let stepped = arithmetic(BinaryOp::Add, value, &delta, range)?;
    stepped.cast(&value.ty()).map_err(|error| error.at(range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const AT: TokenRange = TokenRange::Synthetic;

    #[test]
    fn integer_math_promotes_and_wraps() {
        assert_eq!(
            binary(BinaryOp::Add, &Value::I8(1), &Value::I32(2), AT).unwrap(),
            Value::I32(3)
        );
        assert_eq!(
            binary(BinaryOp::Add, &Value::I32(i32::MAX), &Value::I32(1), AT).unwrap(),
            Value::I32(i32::MIN)
        );
        assert_eq!(
            binary(BinaryOp::Mul, &Value::Char('a'), &Value::I32(2), AT).unwrap(),
            Value::I32(194)
        );
    }

    #[test]
    fn division_by_zero_fails() {
        let error = binary(BinaryOp::Div, &Value::I32(1), &Value::I32(0), AT).unwrap_err();
        assert_eq!(error.to_string(), "Division by zero");
        assert_eq!(
            binary(BinaryOp::Div, &Value::F64(1.0), &Value::F64(0.0), AT).unwrap(),
            Value::F64(f64::INFINITY)
        );
    }

    #[test]
    fn shifts_mask_their_distance() {
        assert_eq!(
            binary(BinaryOp::Lsh, &Value::I32(1), &Value::I32(33), AT).unwrap(),
            Value::I32(2)
        );
        assert_eq!(
            binary(BinaryOp::Ursh, &Value::I32(-1), &Value::I32(28), AT).unwrap(),
            Value::I32(15)
        );
        assert_eq!(
            binary(BinaryOp::Rsh, &Value::I64(-16), &Value::I32(2), AT).unwrap(),
            Value::I64(-4)
        );
    }

    #[test]
    fn strings_concatenate_and_compare() {
        assert_eq!(
            binary(BinaryOp::Add, &Value::from("x = "), &Value::I32(4), AT).unwrap(),
            Value::from("x = 4")
        );
        assert_eq!(
            binary(BinaryOp::Cmp, &Value::from("a"), &Value::from("b"), AT).unwrap(),
            Value::I32(-1)
        );
    }

    #[test]
    fn arrays_grow_and_shrink() {
        let array = Value::array(Type::I32, vec![Value::I32(1), Value::I32(2)]);
        let grown = binary(BinaryOp::Add, &array, &Value::I8(3), AT).unwrap();
        assert_eq!(
            grown,
            Value::array(Type::I32, vec![Value::I32(1), Value::I32(2), Value::I32(3)])
        );
        let shrunk = binary(BinaryOp::Sub, &grown, &Value::I32(2), AT).unwrap();
        assert_eq!(
            shrunk,
            Value::array(Type::I32, vec![Value::I32(1), Value::I32(3)])
        );
        assert!(binary(BinaryOp::Add, &array, &Value::from("no"), AT).is_err());
    }

    #[test]
    fn type_or_builds_an_intersection() {
        let result = binary(
            BinaryOp::Or,
            &Value::Type(Type::I32),
            &Value::Type(Type::STRING),
            AT,
        )
        .unwrap();
        assert_eq!(
            result,
            Value::Type(Type::Intersection(vec![Type::I32, Type::STRING]))
        );
    }

    #[test]
    fn unary_operators_keep_the_operand_type() {
        assert_eq!(unary(UnaryOp::Minus, &Value::I16(5), AT).unwrap(), Value::I16(-5));
        assert_eq!(unary(UnaryOp::Inverse, &Value::I32(0), AT).unwrap(), Value::I32(-1));
        assert_eq!(unary(UnaryOp::Not, &Value::Bool(true), AT).unwrap(), Value::Bool(false));
        assert!(unary(UnaryOp::Not, &Value::I32(1), AT).is_err());
        assert_eq!(step(&Value::Char('a'), true, AT).unwrap(), Value::Char('b'));
        assert_eq!(step(&Value::I64(0), false, AT).unwrap(), Value::I64(-1));
    }

    #[test]
    fn numeric_equality_ignores_width() {
        assert!(equals(&Value::I8(3), &Value::I64(3)));
        assert!(!equals(&Value::I32(3), &Value::from("3")));
    }
}
