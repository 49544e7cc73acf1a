//! Built-in macros and defines that exist without a declaration in source.
//!
//! Intrinsic macros live in a registry shared by every frame of one
//! evaluation. Intrinsic defines are attached to the frame of the field or
//! function declaration they describe and read or write the output class.

use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

use itertools::Itertools;
use jbpl_core::diagnostics::{Diagnostic, DiagnosticManager};
use jbpl_core::error::Result;
use jbpl_core::span::TokenRange;
use jbpl_core::types::Type;
use jbpl_core::value::Value;

use crate::engine::StackFrame;
use crate::error::interpretation_error_at;

/// Receives the messages of the `info` and `error` intrinsics.
pub type MessageSink = Rc<dyn Fn(&str)>;

// ===== INTRINSIC MACROS =====

/// Everything an intrinsic macro sees about its call site.
pub struct IntrinsicCall<'c, 'a> {
    pub name: &'c str,
    pub arguments: &'c [Value],
    /// The frame the call is evaluated in.
    pub frame: &'c StackFrame<'a>,
    pub range: TokenRange,
}

impl IntrinsicCall<'_, '_> {
    /// The single string argument of a message intrinsic.
    pub fn message(&self) -> Result<&str> {
        match self.arguments {
            [Value::String(message)] => Ok(message),
            _ => Err(interpretation_error_at(
                format!(
                    "Intrinsic macro {} expects a single string argument but got ({})",
                    self.name,
                    self.arguments.iter().map(Value::ty).join(", ")
                ),
                self.range,
            )),
        }
    }
}

type IntrinsicFn = dyn for<'c, 'a> Fn(&IntrinsicCall<'c, 'a>) -> Result<Value>;

/// A macro implemented by the host.
#[derive(Clone)]
pub struct IntrinsicMacro {
    pub name: String,
    func: Rc<IntrinsicFn>,
}

impl IntrinsicMacro {
    pub fn new(
        name: impl Into<String>,
        func: impl for<'c, 'a> Fn(&IntrinsicCall<'c, 'a>) -> Result<Value> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn call(&self, call: &IntrinsicCall<'_, '_>) -> Result<Value> {
        (self.func)(call)
    }
}

impl Debug for IntrinsicMacro {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntrinsicMacro")
            .field("name", &self.name)
            .finish()
    }
}

/// Intrinsic macros by name.
#[derive(Debug, Clone, Default)]
pub struct IntrinsicMacros {
    macros: HashMap<String, IntrinsicMacro>,
}

impl IntrinsicMacros {
    pub fn empty() -> Self {
        Self::default()
    }

    /// `info` and `error`, forwarding to the sinks and recording a diagnostic.
    pub fn standard(info: MessageSink, error: MessageSink, diagnostics: DiagnosticManager) -> Self {
        let mut registry = Self::empty();
        registry.register(message_intrinsic("info", info, diagnostics.clone(), |message| {
            Diagnostic::info(message)
        }));
        registry.register(message_intrinsic("error", error, diagnostics, |message| {
            Diagnostic::error(message)
        }));
        registry
    }

    /// Registers a macro, replacing any previous one of the same name.
    pub fn register(&mut self, intrinsic: IntrinsicMacro) {
        self.macros.insert(intrinsic.name.clone(), intrinsic);
    }

    pub fn get(&self, name: &str) -> Option<&IntrinsicMacro> {
        self.macros.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }
}

fn message_intrinsic(
    name: &'static str,
    sink: MessageSink,
    diagnostics: DiagnosticManager,
    level: fn(String) -> Diagnostic,
) -> IntrinsicMacro {
    IntrinsicMacro::new(name, move |call| {
        let message = call.message()?;
        diagnostics.add_diagnostic(level(message.to_string()).with_range(call.range));
        sink(message);
        Ok(Value::Unit)
    })
}

// ===== INTRINSIC DEFINES =====

/// The output member an intrinsic define reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberRef {
    Field {
        owner: String,
        name: String,
        descriptor: String,
    },
    Method {
        owner: String,
        name: String,
        descriptor: String,
    },
}

impl MemberRef {
    pub fn owner(&self) -> &str {
        match self {
            MemberRef::Field { owner, .. }
            | MemberRef::Method { owner, .. } => owner,
        }
    }
}

impl Display for MemberRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberRef::Field {
                owner,
                name,
                descriptor,
            } => write!(f, "{}.{}:{}", owner, name, descriptor),
            MemberRef::Method {
                owner,
                name,
                descriptor,
            } => write!(f, "{}.{}{}", owner, name, descriptor),
        }
    }
}

/// A frame-local name whose reads and writes go to the output or the frame's code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntrinsicDefine {
    /// `access`: the member's access flags as an i32.
    Access(MemberRef),
    /// `instructions`: the code accumulated so far, decoded.
    Instructions,
    /// `exceptions`: the checked exceptions a method declares.
    Exceptions(MemberRef),
}

impl IntrinsicDefine {
    pub fn ty(&self) -> Type {
        match self {
            IntrinsicDefine::Access(_) => Type::I32,
            IntrinsicDefine::Instructions => {
                Type::array(Type::Prepro(jbpl_core::types::PreproType::Instruction))
            }
            IntrinsicDefine::Exceptions(_) => Type::array(Type::STRING),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn custom_macros_replace_standard_ones() {
        let diagnostics = DiagnosticManager::new();
        let sink: MessageSink = Rc::new(|_: &str| {});
        let mut registry = IntrinsicMacros::standard(sink.clone(), sink, diagnostics);
        assert!(registry.contains("info"));
        assert!(registry.contains("error"));

        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        registry.register(IntrinsicMacro::new("info", move |_| {
            *counter.borrow_mut() += 1;
            Ok(Value::I32(1))
        }));
        assert_eq!(registry.get("info").map(|m| m.name.as_str()), Some("info"));
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn define_types() {
        assert_eq!(IntrinsicDefine::Instructions.ty().to_string(), "[instruction]");
        assert_eq!(
            IntrinsicDefine::Access(MemberRef::Field {
                owner: "a/B".into(),
                name: "x".into(),
                descriptor: "I".into(),
            })
            .ty(),
            Type::I32
        );
    }
}
