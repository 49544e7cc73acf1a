//! JBPL Interpreter
//!
//! Walks a lowered [`jbpl_core::ast::AssemblyFile`] with an explicit frame
//! stack, evaluating compile-time values and editing an output map of JVM
//! classes. The instruction codec translating between structured instructions
//! and binary nodes lives in [`codec`].

pub mod codec;
pub mod engine;
pub mod error;
pub mod intrinsics;

pub use engine::{
    evaluate_file, lower_and_evaluate, ClassPool, ClassProvider, EvaluationContext,
    EvaluationOptions, EvaluationOutcome, OutputMap,
};
