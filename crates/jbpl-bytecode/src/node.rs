use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumDiscriminants, EnumIter};

use crate::descriptor::{MethodDescriptor, TypeDescriptor};
use crate::opcode::{Opcode, OpcodeKind};
use crate::{BytecodeError, Result};

/// Identity of a label inside one method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabelId(pub u32);

impl Display for LabelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay)]
pub enum HandleTag {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl HandleTag {
    pub fn code(self) -> u8 {
        match self {
            HandleTag::GetField => 1,
            HandleTag::GetStatic => 2,
            HandleTag::PutField => 3,
            HandleTag::PutStatic => 4,
            HandleTag::InvokeVirtual => 5,
            HandleTag::InvokeStatic => 6,
            HandleTag::InvokeSpecial => 7,
            HandleTag::NewInvokeSpecial => 8,
            HandleTag::InvokeInterface => 9,
        }
    }

    /// The handle kind matching an invoke opcode; `None` for everything else.
    pub fn for_invoke(opcode: Opcode) -> Option<HandleTag> {
        match opcode {
            Opcode::INVOKEVIRTUAL => Some(HandleTag::InvokeVirtual),
            Opcode::INVOKESTATIC => Some(HandleTag::InvokeStatic),
            Opcode::INVOKESPECIAL => Some(HandleTag::InvokeSpecial),
            Opcode::INVOKEINTERFACE => Some(HandleTag::InvokeInterface),
            _ => None,
        }
    }
}

/// A `CONSTANT_MethodHandle` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub tag: HandleTag,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub is_interface: bool,
}

impl Display for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}.{}{}",
            self.tag, self.owner, self.name, self.descriptor
        )
    }
}

/// A loadable constant pool entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Type(TypeDescriptor),
    MethodType(MethodDescriptor),
    Handle(Handle),
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::Int(value) => write!(f, "{}", value),
            Constant::Long(value) => write!(f, "{}L", value),
            Constant::Float(value) => write!(f, "{}F", value),
            Constant::Double(value) => write!(f, "{}D", value),
            Constant::String(value) => write!(f, "{:?}", value),
            Constant::Type(value) => write!(f, "{}", value),
            Constant::MethodType(value) => write!(f, "{}", value),
            Constant::Handle(value) => write!(f, "{}", value),
        }
    }
}

/// One element of a method's binary instruction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants)]
#[strum_discriminants(name(InsnNodeKind), derive(Hash, EnumIter, StrumDisplay))]
pub enum InsnNode {
    Insn(Opcode),
    Int {
        opcode: Opcode,
        operand: i32,
    },
    Var {
        opcode: Opcode,
        slot: u16,
    },
    Iinc {
        slot: u16,
        increment: i16,
    },
    Type {
        opcode: Opcode,
        descriptor: String,
    },
    Field {
        opcode: Opcode,
        owner: String,
        name: String,
        descriptor: String,
    },
    Method {
        opcode: Opcode,
        owner: String,
        name: String,
        descriptor: String,
        is_interface: bool,
    },
    InvokeDynamic {
        name: String,
        descriptor: String,
        bootstrap: Handle,
        bootstrap_args: Vec<Constant>,
    },
    Jump {
        opcode: Opcode,
        label: LabelId,
    },
    Label(LabelId),
    Ldc(Constant),
}

impl InsnNode {
    pub fn kind(&self) -> InsnNodeKind {
        self.into()
    }

    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            InsnNode::Insn(opcode)
            | InsnNode::Int { opcode, .. }
            | InsnNode::Var { opcode, .. }
            | InsnNode::Type { opcode, .. }
            | InsnNode::Field { opcode, .. }
            | InsnNode::Method { opcode, .. }
            | InsnNode::Jump { opcode, .. } => Some(*opcode),
            InsnNode::Iinc { .. } => Some(Opcode::IINC),
            InsnNode::InvokeDynamic { .. } => Some(Opcode::INVOKEDYNAMIC),
            InsnNode::Ldc(_) => Some(Opcode::LDC),
            InsnNode::Label(_) => None,
        }
    }

    /// Checks that the opcode stored in the node agrees with the node's shape.
    pub fn validate(&self) -> Result<()> {
        let expected = match self {
            InsnNode::Insn(_) => OpcodeKind::Insn,
            InsnNode::Int { .. } => OpcodeKind::IntInsn,
            InsnNode::Var { .. } => OpcodeKind::Var,
            InsnNode::Type { .. } => OpcodeKind::Type,
            InsnNode::Field { .. } => OpcodeKind::Field,
            InsnNode::Method { .. } => OpcodeKind::Method,
            InsnNode::Jump { .. } => OpcodeKind::Jump,
            InsnNode::Iinc { .. }
            | InsnNode::InvokeDynamic { .. }
            | InsnNode::Label(_)
            | InsnNode::Ldc(_) => return Ok(()),
        };
        match self.opcode() {
            Some(opcode) if opcode.kind() == expected => Ok(()),
            Some(opcode) => Err(BytecodeError::OpcodeKindMismatch {
                opcode,
                expected,
                actual: opcode.kind(),
            }),
            None => Ok(()),
        }
    }
}

impl Display for InsnNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InsnNode::Insn(opcode) => write!(f, "{}", opcode),
            InsnNode::Int { opcode, operand } => write!(f, "{} {}", opcode, operand),
            InsnNode::Var { opcode, slot } => write!(f, "{} {}", opcode, slot),
            InsnNode::Iinc { slot, increment } => write!(f, "iinc {} {}", slot, increment),
            InsnNode::Type { opcode, descriptor } => write!(f, "{} {}", opcode, descriptor),
            InsnNode::Field {
                opcode,
                owner,
                name,
                descriptor,
            } => write!(f, "{} {}.{}:{}", opcode, owner, name, descriptor),
            InsnNode::Method {
                opcode,
                owner,
                name,
                descriptor,
                ..
            } => write!(f, "{} {}.{}{}", opcode, owner, name, descriptor),
            InsnNode::InvokeDynamic {
                name, descriptor, ..
            } => write!(f, "invokedynamic {}{}", name, descriptor),
            InsnNode::Jump { opcode, label } => write!(f, "{} {}", opcode, label),
            InsnNode::Label(label) => write!(f, "{}:", label),
            InsnNode::Ldc(constant) => write!(f, "ldc {}", constant),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub value: Option<Constant>,
}

impl FieldNode {
    pub fn new(access: u16, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            signature: None,
            value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodNode {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub exceptions: Vec<String>,
    pub instructions: Vec<InsnNode>,
}

impl MethodNode {
    pub fn new(access: u16, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            exceptions: Vec::new(),
            instructions: Vec::new(),
        }
    }
}

/// An in-memory class file, as edited by the evaluator and consumed by a class writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassNode {
    pub version: ClassVersion,
    pub access: u16,
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldNode>,
    pub methods: Vec<MethodNode>,
}

impl ClassNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: ClassVersion::default(),
            access: crate::access::ACC_PUBLIC,
            name: name.into(),
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn field(&self, name: &str, descriptor: &str) -> Option<&FieldNode> {
        self.fields
            .iter()
            .find(|field| field.name == name && field.descriptor == descriptor)
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodNode> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.descriptor == descriptor)
    }

    pub fn method_mut(&mut self, name: &str, descriptor: &str) -> Option<&mut MethodNode> {
        self.methods
            .iter_mut()
            .find(|method| method.name == name && method.descriptor == descriptor)
    }
}

/// Class file versions from Java 1.1 to Java 25.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter,
)]
pub enum ClassVersion {
    V1_1,
    V1_2,
    V1_3,
    V1_4,
    V1_5,
    V1_6,
    V1_7,
    V1_8,
    V9,
    V10,
    V11,
    V12,
    V13,
    V14,
    V15,
    V16,
    #[default]
    V17,
    V18,
    V19,
    V20,
    V21,
    V22,
    V23,
    V24,
    V25,
}

impl ClassVersion {
    pub fn major(self) -> u16 {
        45 + self as u16
    }

    pub fn minor(self) -> u16 {
        match self {
            ClassVersion::V1_1 => 3,
            _ => 0,
        }
    }

    /// Accepts either a Java release (`8`, `17`) or a class file major version (`52`, `61`).
    pub fn from_number(number: i64) -> Result<ClassVersion> {
        use strum::IntoEnumIterator;
        let major = match number {
            1..=25 => number + 44,
            45..=69 => number,
            _ => return Err(BytecodeError::InvalidVersion(number)),
        };
        ClassVersion::iter()
            .find(|version| i64::from(version.major()) == major)
            .ok_or(BytecodeError::InvalidVersion(number))
    }
}

impl Display for ClassVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}
