use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::BytecodeError;

/// Shape of the binary instruction node an opcode is encoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum OpcodeKind {
    Insn,
    IntInsn,
    Var,
    Iinc,
    Type,
    Field,
    Method,
    InvokeDynamic,
    Jump,
    Ldc,
    TableSwitch,
    LookupSwitch,
    MultiANewArray,
}

macro_rules! opcodes {
    ($($name:ident = $code:literal => $kind:ident,)*) => {
        /// Every JVM opcode the assembler can name, with its encoded value.
        #[allow(non_camel_case_types)]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
            Display, EnumString, EnumIter, IntoStaticStr,
        )]
        #[strum(serialize_all = "lowercase", ascii_case_insensitive)]
        pub enum Opcode {
            $($name,)*
        }

        impl Opcode {
            pub fn code(self) -> u8 {
                match self {
                    $(Opcode::$name => $code,)*
                }
            }

            pub fn kind(self) -> OpcodeKind {
                match self {
                    $(Opcode::$name => OpcodeKind::$kind,)*
                }
            }

            pub fn from_code(code: u8) -> Option<Opcode> {
                match code {
                    $($code => Some(Opcode::$name),)*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    NOP = 0 => Insn,
    ACONST_NULL = 1 => Insn,
    ICONST_M1 = 2 => Insn,
    ICONST_0 = 3 => Insn,
    ICONST_1 = 4 => Insn,
    ICONST_2 = 5 => Insn,
    ICONST_3 = 6 => Insn,
    ICONST_4 = 7 => Insn,
    ICONST_5 = 8 => Insn,
    LCONST_0 = 9 => Insn,
    LCONST_1 = 10 => Insn,
    FCONST_0 = 11 => Insn,
    FCONST_1 = 12 => Insn,
    FCONST_2 = 13 => Insn,
    DCONST_0 = 14 => Insn,
    DCONST_1 = 15 => Insn,
    BIPUSH = 16 => IntInsn,
    SIPUSH = 17 => IntInsn,
    LDC = 18 => Ldc,
    ILOAD = 21 => Var,
    LLOAD = 22 => Var,
    FLOAD = 23 => Var,
    DLOAD = 24 => Var,
    ALOAD = 25 => Var,
    IALOAD = 46 => Insn,
    LALOAD = 47 => Insn,
    FALOAD = 48 => Insn,
    DALOAD = 49 => Insn,
    AALOAD = 50 => Insn,
    BALOAD = 51 => Insn,
    CALOAD = 52 => Insn,
    SALOAD = 53 => Insn,
    ISTORE = 54 => Var,
    LSTORE = 55 => Var,
    FSTORE = 56 => Var,
    DSTORE = 57 => Var,
    ASTORE = 58 => Var,
    IASTORE = 79 => Insn,
    LASTORE = 80 => Insn,
    FASTORE = 81 => Insn,
    DASTORE = 82 => Insn,
    AASTORE = 83 => Insn,
    BASTORE = 84 => Insn,
    CASTORE = 85 => Insn,
    SASTORE = 86 => Insn,
    POP = 87 => Insn,
    POP2 = 88 => Insn,
    DUP = 89 => Insn,
    DUP_X1 = 90 => Insn,
    DUP_X2 = 91 => Insn,
    DUP2 = 92 => Insn,
    DUP2_X1 = 93 => Insn,
    DUP2_X2 = 94 => Insn,
    SWAP = 95 => Insn,
    IADD = 96 => Insn,
    LADD = 97 => Insn,
    FADD = 98 => Insn,
    DADD = 99 => Insn,
    ISUB = 100 => Insn,
    LSUB = 101 => Insn,
    FSUB = 102 => Insn,
    DSUB = 103 => Insn,
    IMUL = 104 => Insn,
    LMUL = 105 => Insn,
    FMUL = 106 => Insn,
    DMUL = 107 => Insn,
    IDIV = 108 => Insn,
    LDIV = 109 => Insn,
    FDIV = 110 => Insn,
    DDIV = 111 => Insn,
    IREM = 112 => Insn,
    LREM = 113 => Insn,
    FREM = 114 => Insn,
    DREM = 115 => Insn,
    INEG = 116 => Insn,
    LNEG = 117 => Insn,
    FNEG = 118 => Insn,
    DNEG = 119 => Insn,
    ISHL = 120 => Insn,
    LSHL = 121 => Insn,
    ISHR = 122 => Insn,
    LSHR = 123 => Insn,
    IUSHR = 124 => Insn,
    LUSHR = 125 => Insn,
    IAND = 126 => Insn,
    LAND = 127 => Insn,
    IOR = 128 => Insn,
    LOR = 129 => Insn,
    IXOR = 130 => Insn,
    LXOR = 131 => Insn,
    IINC = 132 => Iinc,
    I2L = 133 => Insn,
    I2F = 134 => Insn,
    I2D = 135 => Insn,
    L2I = 136 => Insn,
    L2F = 137 => Insn,
    L2D = 138 => Insn,
    F2I = 139 => Insn,
    F2L = 140 => Insn,
    F2D = 141 => Insn,
    D2I = 142 => Insn,
    D2L = 143 => Insn,
    D2F = 144 => Insn,
    I2B = 145 => Insn,
    I2C = 146 => Insn,
    I2S = 147 => Insn,
    LCMP = 148 => Insn,
    FCMPL = 149 => Insn,
    FCMPG = 150 => Insn,
    DCMPL = 151 => Insn,
    DCMPG = 152 => Insn,
    IFEQ = 153 => Jump,
    IFNE = 154 => Jump,
    IFLT = 155 => Jump,
    IFGE = 156 => Jump,
    IFGT = 157 => Jump,
    IFLE = 158 => Jump,
    IF_ICMPEQ = 159 => Jump,
    IF_ICMPNE = 160 => Jump,
    IF_ICMPLT = 161 => Jump,
    IF_ICMPGE = 162 => Jump,
    IF_ICMPGT = 163 => Jump,
    IF_ICMPLE = 164 => Jump,
    IF_ACMPEQ = 165 => Jump,
    IF_ACMPNE = 166 => Jump,
    GOTO = 167 => Jump,
    JSR = 168 => Jump,
    RET = 169 => Var,
    TABLESWITCH = 170 => TableSwitch,
    LOOKUPSWITCH = 171 => LookupSwitch,
    IRETURN = 172 => Insn,
    LRETURN = 173 => Insn,
    FRETURN = 174 => Insn,
    DRETURN = 175 => Insn,
    ARETURN = 176 => Insn,
    RETURN = 177 => Insn,
    GETSTATIC = 178 => Field,
    PUTSTATIC = 179 => Field,
    GETFIELD = 180 => Field,
    PUTFIELD = 181 => Field,
    INVOKEVIRTUAL = 182 => Method,
    INVOKESPECIAL = 183 => Method,
    INVOKESTATIC = 184 => Method,
    INVOKEINTERFACE = 185 => Method,
    INVOKEDYNAMIC = 186 => InvokeDynamic,
    NEW = 187 => Type,
    NEWARRAY = 188 => IntInsn,
    ANEWARRAY = 189 => Type,
    ARRAYLENGTH = 190 => Insn,
    ATHROW = 191 => Insn,
    CHECKCAST = 192 => Type,
    INSTANCEOF = 193 => Type,
    MONITORENTER = 194 => Insn,
    MONITOREXIT = 195 => Insn,
    MULTIANEWARRAY = 197 => MultiANewArray,
    IFNULL = 198 => Jump,
    IFNONNULL = 199 => Jump,
}

impl Opcode {
    /// Case-insensitive lookup by mnemonic.
    pub fn by_name(name: &str) -> Result<Opcode, BytecodeError> {
        name.trim()
            .parse()
            .map_err(|_| BytecodeError::UnknownOpcode(name.to_string()))
    }

    pub fn is_stack_load(self) -> bool {
        matches!(
            self,
            Opcode::ILOAD | Opcode::LLOAD | Opcode::FLOAD | Opcode::DLOAD | Opcode::ALOAD
        )
    }

    pub fn is_stack_store(self) -> bool {
        matches!(
            self,
            Opcode::ISTORE | Opcode::LSTORE | Opcode::FSTORE | Opcode::DSTORE | Opcode::ASTORE
        )
    }

    pub fn is_array_load(self) -> bool {
        (Opcode::IALOAD.code()..=Opcode::SALOAD.code()).contains(&self.code())
    }

    pub fn is_array_store(self) -> bool {
        (Opcode::IASTORE.code()..=Opcode::SASTORE.code()).contains(&self.code())
    }

    pub fn is_field_load(self) -> bool {
        matches!(self, Opcode::GETFIELD | Opcode::GETSTATIC)
    }

    pub fn is_field_store(self) -> bool {
        matches!(self, Opcode::PUTFIELD | Opcode::PUTSTATIC)
    }

    pub fn is_constant(self) -> bool {
        (Opcode::ACONST_NULL.code()..=Opcode::LDC.code()).contains(&self.code())
    }

    pub fn is_invoke(self) -> bool {
        matches!(
            self,
            Opcode::INVOKEVIRTUAL
                | Opcode::INVOKESPECIAL
                | Opcode::INVOKESTATIC
                | Opcode::INVOKEINTERFACE
                | Opcode::INVOKEDYNAMIC
        )
    }

    /// Single-operand conditional jumps comparing against zero or null.
    pub fn is_if(self) -> bool {
        (Opcode::IFEQ.code()..=Opcode::IFLE.code()).contains(&self.code())
            || matches!(self, Opcode::IFNULL | Opcode::IFNONNULL)
    }

    pub fn is_if_icmp(self) -> bool {
        (Opcode::IF_ICMPEQ.code()..=Opcode::IF_ICMPLE.code()).contains(&self.code())
    }

    pub fn is_if_acmp(self) -> bool {
        matches!(self, Opcode::IF_ACMPEQ | Opcode::IF_ACMPNE)
    }

    pub fn is_jump(self) -> bool {
        self.kind() == OpcodeKind::Jump
    }

    pub fn is_conversion(self) -> bool {
        (Opcode::I2L.code()..=Opcode::I2S.code()).contains(&self.code())
    }

    pub fn is_return(self) -> bool {
        (Opcode::IRETURN.code()..=Opcode::RETURN.code()).contains(&self.code())
    }

    pub fn mnemonic(self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn codes_are_unique_and_reversible() {
        for opcode in Opcode::iter() {
            assert_eq!(Opcode::from_code(opcode.code()), Some(opcode));
        }
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(Opcode::by_name("InvokeStatic").ok(), Some(Opcode::INVOKESTATIC));
        assert_eq!(Opcode::by_name("iconst_m1").ok(), Some(Opcode::ICONST_M1));
        assert!(Opcode::by_name("frobnicate").is_err());
    }

    #[test]
    fn display_is_lowercase_mnemonic() {
        assert_eq!(Opcode::IF_ICMPEQ.to_string(), "if_icmpeq");
        assert_eq!(Opcode::DUP2_X1.mnemonic(), "dup2_x1");
    }
}
