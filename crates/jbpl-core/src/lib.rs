//! Element model, scopes, type system and lowering passes of the JBPL
//! macro assembler. Evaluation lives in `jbpl-interpret`.

#[macro_use]
pub mod macros;

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod lower;
pub mod scope;
pub mod span;
pub mod types;
pub mod value;

// Re-export commonly used items for convenience
pub use tracing;

pub use jbpl_bytecode as bytecode;

// Alias for error types
pub type Error = crate::error::Error;
pub type Result<T> = crate::error::Result<T>;
