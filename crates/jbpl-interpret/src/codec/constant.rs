use jbpl_bytecode::{Constant, InsnNode, Opcode};
use jbpl_core::error::{Error, Result};
use jbpl_core::span::TokenRange;
use jbpl_core::value::Value;

/// Picks the shortest encoding for loading `value`.
///
/// An explicit `bipush` or `sipush` forces that form; otherwise small ints,
/// longs, floats and doubles get their dedicated `*const_*` opcode, byte
/// literals `bipush`, short literals `sipush`, and everything else `ldc`.
pub fn encode_constant(opcode: Opcode, value: &Value) -> Result<InsnNode> {
    match opcode {
        Opcode::BIPUSH => return push(Opcode::BIPUSH, value, i8::MIN as i64, i8::MAX as i64),
        Opcode::SIPUSH => return push(Opcode::SIPUSH, value, i16::MIN as i64, i16::MAX as i64),
        _ => {}
    }
    if let Some(node) = short_form(value) {
        return Ok(node);
    }
    let constant = value.to_constant()?.ok_or_else(|| {
        Error::type_mismatch(
            format!("Cannot load constant of type {}", value.ty()),
            TokenRange::Undefined,
        )
    })?;
    Ok(InsnNode::Ldc(constant))
}

fn push(opcode: Opcode, value: &Value, min: i64, max: i64) -> Result<InsnNode> {
    let operand = value
        .as_i64()
        .filter(|operand| (min..=max).contains(operand))
        .ok_or_else(|| {
            Error::type_mismatch(
                format!("Value {} cannot be loaded with {}", value, opcode),
                TokenRange::Undefined,
            )
        })?;
    Ok(InsnNode::Int {
        opcode,
        operand: operand as i32,
    })
}

fn short_form(value: &Value) -> Option<InsnNode> {
    let insn = |opcode| Some(InsnNode::Insn(opcode));
    match value {
        Value::I8(v) => Some(InsnNode::Int {
            opcode: Opcode::BIPUSH,
            operand: *v as i32,
        }),
        Value::I16(v) => Some(InsnNode::Int {
            opcode: Opcode::SIPUSH,
            operand: *v as i32,
        }),
        Value::I32(_) | Value::Char(_) | Value::Bool(_) => {
            let v = match value {
                Value::Bool(b) => *b as i64,
                other => other.as_i64()?,
            };
            match v {
                -1 => insn(Opcode::ICONST_M1),
                0 => insn(Opcode::ICONST_0),
                1 => insn(Opcode::ICONST_1),
                2 => insn(Opcode::ICONST_2),
                3 => insn(Opcode::ICONST_3),
                4 => insn(Opcode::ICONST_4),
                5 => insn(Opcode::ICONST_5),
                v if (i8::MIN as i64..=i8::MAX as i64).contains(&v) => Some(InsnNode::Int {
                    opcode: Opcode::BIPUSH,
                    operand: v as i32,
                }),
                _ => None,
            }
        }
        Value::I64(0) => insn(Opcode::LCONST_0),
        Value::I64(1) => insn(Opcode::LCONST_1),
        Value::F32(v) if v.to_bits() == 0f32.to_bits() => insn(Opcode::FCONST_0),
        Value::F32(v) if *v == 1.0 => insn(Opcode::FCONST_1),
        Value::F32(v) if *v == 2.0 => insn(Opcode::FCONST_2),
        Value::F64(v) if v.to_bits() == 0f64.to_bits() => insn(Opcode::DCONST_0),
        Value::F64(v) if *v == 1.0 => insn(Opcode::DCONST_1),
        _ => None,
    }
}

/// The value a constant-loading node pushes, if it is one.
pub fn decode_constant(node: &InsnNode) -> Option<Value> {
    Some(match node {
        InsnNode::Insn(opcode) => match opcode {
            Opcode::ICONST_M1 => Value::I32(-1),
            Opcode::ICONST_0 => Value::I32(0),
            Opcode::ICONST_1 => Value::I32(1),
            Opcode::ICONST_2 => Value::I32(2),
            Opcode::ICONST_3 => Value::I32(3),
            Opcode::ICONST_4 => Value::I32(4),
            Opcode::ICONST_5 => Value::I32(5),
            Opcode::LCONST_0 => Value::I64(0),
            Opcode::LCONST_1 => Value::I64(1),
            Opcode::FCONST_0 => Value::F32(0.0),
            Opcode::FCONST_1 => Value::F32(1.0),
            Opcode::FCONST_2 => Value::F32(2.0),
            Opcode::DCONST_0 => Value::F64(0.0),
            Opcode::DCONST_1 => Value::F64(1.0),
            _ => return None,
        },
        InsnNode::Int {
            opcode: Opcode::BIPUSH,
            operand,
        } => Value::I8(*operand as i8),
        InsnNode::Int {
            opcode: Opcode::SIPUSH,
            operand,
        } => Value::I16(*operand as i16),
        InsnNode::Ldc(constant) => match constant {
            Constant::MethodType(_) | Constant::Handle(_) => return None,
            other => Value::from_constant(other),
        },
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn int_literals_pick_the_shortest_form() {
        let encoded = [-1, 0, 5, 6, 127, 200]
            .into_iter()
            .map(|v| encode_constant(Opcode::LDC, &Value::I32(v)).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            encoded,
            vec![
                InsnNode::Insn(Opcode::ICONST_M1),
                InsnNode::Insn(Opcode::ICONST_0),
                InsnNode::Insn(Opcode::ICONST_5),
                InsnNode::Int {
                    opcode: Opcode::BIPUSH,
                    operand: 6
                },
                InsnNode::Int {
                    opcode: Opcode::BIPUSH,
                    operand: 127
                },
                InsnNode::Ldc(Constant::Int(200)),
            ]
        );
    }

    #[test]
    fn wide_and_floating_constants() {
        assert_eq!(
            encode_constant(Opcode::LDC, &Value::I64(1)).unwrap(),
            InsnNode::Insn(Opcode::LCONST_1)
        );
        assert_eq!(
            encode_constant(Opcode::LDC, &Value::I64(2)).unwrap(),
            InsnNode::Ldc(Constant::Long(2))
        );
        assert_eq!(
            encode_constant(Opcode::LDC, &Value::F32(2.0)).unwrap(),
            InsnNode::Insn(Opcode::FCONST_2)
        );
        assert_eq!(
            encode_constant(Opcode::LDC, &Value::F32(-0.0)).unwrap(),
            InsnNode::Ldc(Constant::Float(-0.0))
        );
        assert_eq!(
            encode_constant(Opcode::LDC, &Value::F64(1.0)).unwrap(),
            InsnNode::Insn(Opcode::DCONST_1)
        );
        assert_eq!(
            encode_constant(Opcode::LDC, &Value::from("hi")).unwrap(),
            InsnNode::Ldc(Constant::String("hi".into()))
        );
    }

    #[test]
    fn explicit_push_opcodes_are_honoured() {
        assert_eq!(
            encode_constant(Opcode::SIPUSH, &Value::I32(3)).unwrap(),
            InsnNode::Int {
                opcode: Opcode::SIPUSH,
                operand: 3
            }
        );
        assert_eq!(
            encode_constant(Opcode::LDC, &Value::I16(300)).unwrap(),
            InsnNode::Int {
                opcode: Opcode::SIPUSH,
                operand: 300
            }
        );
        assert!(encode_constant(Opcode::BIPUSH, &Value::I32(200)).is_err());
        assert!(encode_constant(Opcode::LDC, &Value::Unit).is_err());
    }

    #[test]
    fn constants_decode_back_to_values() {
        for value in [Value::I32(-1), Value::I32(200), Value::I64(1), Value::from("s")] {
            let node = encode_constant(Opcode::LDC, &value).unwrap();
            assert_eq!(decode_constant(&node), Some(value));
        }
        assert_eq!(decode_constant(&InsnNode::Insn(Opcode::IADD)), None);
    }
}
