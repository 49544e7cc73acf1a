//! Reads and writes of the intrinsic defines `access`, `instructions` and `exceptions`.

use super::*;

use jbpl_bytecode::ClassNode;
use jbpl_core::types::PreproType;

use crate::codec::encode;
use crate::intrinsics::MemberRef;

fn missing_member(member: &MemberRef, range: TokenRange) -> Error {
    Error::MissingTarget {
        message: format!("{} does not exist", member),
        range,
    }
}

fn member_access<'c>(class: &'c mut ClassNode, member: &MemberRef) -> Option<&'c mut u16> {
    match member {
        MemberRef::Field {
            name, descriptor, ..
        } => class
            .fields
            .iter_mut()
            .find(|it| it.name == *name && it.descriptor == *descriptor)
            .map(|field| &mut field.access),
        MemberRef::Method {
            name, descriptor, ..
        } => class
            .method_mut(name, descriptor)
            .map(|method| &mut method.access),
    }
}

fn member_exceptions<'c>(class: &'c mut ClassNode, member: &MemberRef) -> Option<&'c mut Vec<String>> {
    match member {
        MemberRef::Field { .. } => None,
        MemberRef::Method {
            name, descriptor, ..
        } => class
            .method_mut(name, descriptor)
            .map(|method| &mut method.exceptions),
    }
}

impl<'a> EvaluationContext<'a> {
    /// The member's class as this evaluation currently sees it.
    fn member_class(&self, member: &MemberRef, range: TokenRange) -> Result<ClassNode> {
        let owner = member.owner();
        self.output
            .class(owner)
            .cloned()
            .or_else(|| self.options.class_provider.find_class(owner))
            .ok_or_else(|| missing_member(member, range))
    }

    pub(crate) fn read_intrinsic(&self, define: &IntrinsicDefine, range: TokenRange) -> Result<Value> {
        match define {
            IntrinsicDefine::Access(member) => {
                let mut class = self.member_class(member, range)?;
                let access = member_access(&mut class, member).ok_or_else(|| missing_member(member, range))?;
                Ok(Value::I32(i32::from(*access)))
            }
            IntrinsicDefine::Exceptions(member) => {
                let mut class = self.member_class(member, range)?;
                let exceptions =
                    member_exceptions(&mut class, member).ok_or_else(|| missing_member(member, range))?;
                Ok(Value::array(
                    Type::STRING,
                    exceptions.drain(..).map(Value::String).collect(),
                ))
            }
            IntrinsicDefine::Instructions => {
                let root = self.root_index()?;
                let nodes: Vec<InsnNode> = self.frames[root..]
                    .iter()
                    .flat_map(|frame| frame.instructions.iter().cloned())
                    .collect();
                let labels = self.frames[root].slots.label_names();
                let instructions = self
                    .decoders
                    .decode_all(&nodes, &labels)
                    .map_err(|error| error.at(range))?;
                Ok(Value::array(
                    Type::Prepro(PreproType::Instruction),
                    instructions.into_iter().map(Value::from).collect(),
                ))
            }
        }
    }

    pub(crate) fn write_intrinsic(
        &mut self,
        define: &IntrinsicDefine,
        value: Value,
        range: TokenRange,
    ) -> Result<()> {
        let value = self.coerce(value, &define.ty(), range, || "intrinsic define".to_string())?;
        let provider = Arc::clone(&self.options.class_provider);
        match define {
            IntrinsicDefine::Access(member) => {
                let flags = value
                    .as_i64()
                    .and_then(|it| u16::try_from(it).ok())
                    .ok_or_else(|| {
                        interpretation_error_at(format!("Access flags {} do not fit in 16 bits", value), range)
                    })?;
                self.output
                    .transform_class(member.owner(), provider.as_ref(), range, |class| {
                        let access = member_access(class, member).ok_or_else(|| missing_member(member, range))?;
                        *access = flags;
                        Ok(())
                    })
            }
            IntrinsicDefine::Exceptions(member) => {
                let names: Vec<String> = value
                    .as_array()
                    .map(|array| array.values.iter().map(ToString::to_string).collect())
                    .unwrap_or_default();
                self.output
                    .transform_class(member.owner(), provider.as_ref(), range, |class| {
                        let exceptions =
                            member_exceptions(class, member).ok_or_else(|| missing_member(member, range))?;
                        *exceptions = names;
                        Ok(())
                    })
            }
            IntrinsicDefine::Instructions => {
                let root = self.root_index()?;
                let mut nodes = Vec::new();
                let slots = &mut self.frames[root].slots;
                for value in value.as_array().map(|array| array.values.as_slice()).unwrap_or_default() {
                    if let Value::Instruction(instruction) = value {
                        nodes.push(encode(instruction, &mut FrameEncoder { slots: &mut *slots })?);
                    }
                }
                trace!("replacing code of {} with {} instructions", self.frames[root].describe(), nodes.len());
                self.frames[root].instructions = nodes;
                for frame in &mut self.frames[root + 1..] {
                    frame.instructions.clear();
                }
                Ok(())
            }
        }
    }
}
