use std::fmt::{Display, Formatter};
use std::result;

use jbpl_bytecode::BytecodeError;
use strum_macros::Display as StrumDisplay;
use thiserror::Error;

use crate::span::TokenRange;

/// What kind of symbol a failed lookup was searching for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum SymbolKind {
    Macro,
    Define,
    Type,
    Local,
    Label,
    Selector,
    Class,
    Field,
    Function,
    Parameter,
    Intrinsic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackTraceFrame {
    pub owner: String,
    pub range: TokenRange,
}

/// Frames that were live when an evaluation error escaped, innermost first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackTrace {
    pub frames: Vec<StackTraceFrame>,
}

impl Display for StackTrace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for frame in &self.frames {
            writeln!(f, "    at {} ({})", frame.owner, frame.range)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not find {kind} '{name}'")]
    Unresolved {
        kind: SymbolKind,
        name: String,
        range: TokenRange,
    },
    #[error("Type mismatch: {message}")]
    TypeMismatch { message: String, range: TokenRange },
    #[error("{message}")]
    Modifier { message: String, range: TokenRange },
    #[error("Missing target: {message}")]
    MissingTarget { message: String, range: TokenRange },
    #[error("Cannot materialize: {message}")]
    Materialization { message: String, range: TokenRange },
    #[error("Ambiguous overload: {message}")]
    AmbiguousOverload { message: String, range: TokenRange },
    #[error("{message}")]
    Evaluation { message: String, range: TokenRange },
    #[error("Lowering error: {message}")]
    Lowering { message: String, range: TokenRange },
    #[error(transparent)]
    Bytecode(#[from] BytecodeError),
    #[error("{error}\n{trace}")]
    Traced {
        error: Box<Error>,
        trace: StackTrace,
    },
    #[error("Generic error: {0}")]
    Generic(String),
}

pub type Result<T> = result::Result<T, Error>;

impl Error {
    pub fn unresolved(kind: SymbolKind, name: impl Into<String>, range: TokenRange) -> Self {
        Error::Unresolved {
            kind,
            name: name.into(),
            range,
        }
    }

    pub fn type_mismatch(message: impl Into<String>, range: TokenRange) -> Self {
        Error::TypeMismatch {
            message: message.into(),
            range,
        }
    }

    pub fn evaluation(message: impl Into<String>, range: TokenRange) -> Self {
        Error::Evaluation {
            message: message.into(),
            range,
        }
    }

    pub fn materialization(message: impl Into<String>) -> Self {
        Error::Materialization {
            message: message.into(),
            range: TokenRange::Undefined,
        }
    }

    pub fn lowering(message: impl Into<String>, range: TokenRange) -> Self {
        Error::Lowering {
            message: message.into(),
            range,
        }
    }

    /// The source range the error points at, if any.
    pub fn range(&self) -> TokenRange {
        match self {
            Error::Unresolved { range, .. }
            | Error::TypeMismatch { range, .. }
            | Error::Modifier { range, .. }
            | Error::MissingTarget { range, .. }
            | Error::Materialization { range, .. }
            | Error::AmbiguousOverload { range, .. }
            | Error::Evaluation { range, .. }
            | Error::Lowering { range, .. } => *range,
            Error::Traced { error, .. } => error.range(),
            Error::Bytecode(_) | Error::Generic(_) => TokenRange::Undefined,
        }
    }

    /// Fills in a range for errors raised below the element layer.
    pub fn at(self, at: TokenRange) -> Self {
        match self {
            Error::Materialization { message, range } => Error::Materialization {
                message,
                range: range.or(at),
            },
            Error::TypeMismatch { message, range } => Error::TypeMismatch {
                message,
                range: range.or(at),
            },
            Error::Evaluation { message, range } => Error::Evaluation {
                message,
                range: range.or(at),
            },
            Error::Unresolved { kind, name, range } => Error::Unresolved {
                kind,
                name,
                range: range.or(at),
            },
            Error::Bytecode(error) => Error::Evaluation {
                message: error.to_string(),
                range: at,
            },
            other => other,
        }
    }

    pub fn with_trace(self, trace: StackTrace) -> Self {
        if matches!(self, Error::Traced { .. }) {
            return self;
        }
        Error::Traced {
            error: Box::new(self),
            trace,
        }
    }

    /// Strips an attached stack trace.
    pub fn root(&self) -> &Error {
        match self {
            Error::Traced { error, .. } => error.root(),
            other => other,
        }
    }

    /// Stable short code used in rendered diagnostics.
    pub fn code(&self) -> &'static str {
        match self.root() {
            Error::Unresolved { .. } => "jbpl::unresolved",
            Error::TypeMismatch { .. } => "jbpl::type_mismatch",
            Error::Modifier { .. } => "jbpl::modifier",
            Error::MissingTarget { .. } => "jbpl::missing_target",
            Error::Materialization { .. } => "jbpl::materialization",
            Error::AmbiguousOverload { .. } => "jbpl::ambiguous_overload",
            Error::Evaluation { .. } => "jbpl::evaluation",
            Error::Lowering { .. } => "jbpl::lowering",
            Error::Bytecode(_) => "jbpl::bytecode",
            Error::Traced { .. } | Error::Generic(_) => "jbpl::generic",
        }
    }
}

// Convert from eyre::Report to our Error type
impl From<eyre::Report> for Error {
    fn from(err: eyre::Report) -> Self {
        Error::Generic(err.to_string())
    }
}

// Convert from std::io::Error to our Error type
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Generic(e.to_string())
    }
}
impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(s)
    }
}
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Generic(e.to_string())
    }
}
