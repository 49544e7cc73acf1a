use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub type FileId = u64;

/// Byte range inside one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub file: FileId,
    pub lo: u32,
    pub hi: u32,
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Span({}:{}-{})", self.file, self.lo, self.hi)
    }
}

impl Span {
    pub fn new(file: FileId, lo: u32, hi: u32) -> Span {
        Span { file, lo, hi }
    }

    pub fn len(&self) -> u32 {
        self.hi.saturating_sub(self.lo)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where an element came from. Elements built by lowering or by the evaluator
/// itself are `Synthetic`; elements the front end could not place are `Undefined`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenRange {
    #[default]
    Undefined,
    Synthetic,
    Span(Span),
}

impl TokenRange {
    pub fn span(&self) -> Option<Span> {
        match self {
            TokenRange::Span(span) => Some(*span),
            _ => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, TokenRange::Span(_))
    }

    /// Prefers `self`, falling back to `other` when `self` carries no position.
    pub fn or(self, other: TokenRange) -> TokenRange {
        if self.is_defined() {
            self
        } else {
            other
        }
    }
}

impl From<Span> for TokenRange {
    fn from(span: Span) -> Self {
        TokenRange::Span(span)
    }
}

impl Display for TokenRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenRange::Undefined => write!(f, "<undefined>"),
            TokenRange::Synthetic => write!(f, "<synthetic>"),
            TokenRange::Span(span) => write!(f, "{}", span),
        }
    }
}
