use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

use miette::{NamedSource, SourceSpan};
use thiserror::Error;

use crate::error::Error;
use crate::span::TokenRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub range: TokenRange,
    pub suggestions: Vec<String>,
    pub code: Option<String>,
}

impl Diagnostic {
    fn with_level(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            range: TokenRange::Undefined,
            suggestions: Vec::new(),
            code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Info, message)
    }

    pub fn with_range(mut self, range: TokenRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl From<&Error> for Diagnostic {
    fn from(error: &Error) -> Self {
        Diagnostic::error(error.root().to_string())
            .with_range(error.range())
            .with_code(error.code())
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }

        if !self.suggestions.is_empty() {
            let hints = self.suggestions.join("; ");
            write!(f, " (hints: {})", hints)?;
        }

        Ok(())
    }
}

/// Collects messages emitted while a unit is evaluated. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticManager {
    diagnostics: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_diagnostic(&self, diagnostic: Diagnostic) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.push(diagnostic);
        }
    }

    pub fn get_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .lock()
            .map(|d| d.iter().any(|diag| diag.level == DiagnosticLevel::Error))
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.clear();
        }
    }
}

/// An evaluation error paired with the source text it points into, renderable by miette.
#[derive(Error, Debug, miette::Diagnostic)]
#[error("{message}")]
#[diagnostic(code(jbpl::evaluation))]
pub struct SourceDiagnostic {
    pub message: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("here")]
    pub span: Option<SourceSpan>,
    #[help]
    pub trace: Option<String>,
}

impl SourceDiagnostic {
    pub fn from_error(error: &Error, path: &str, source: impl Into<String>) -> Self {
        let source = source.into();
        let span = error.range().span().and_then(|span| {
            let lo = span.lo as usize;
            (lo <= source.len()).then(|| SourceSpan::new(lo.into(), span.len() as usize))
        });
        let trace = match error {
            Error::Traced { trace, .. } if !trace.frames.is_empty() => Some(trace.to_string()),
            _ => None,
        };
        Self {
            message: error.root().to_string(),
            src: NamedSource::new(path, source),
            span,
            trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    #[test]
    fn manager_tracks_error_level() {
        let manager = DiagnosticManager::new();
        manager.add_diagnostic(Diagnostic::info("hello"));
        assert!(!manager.has_errors());
        manager.clone().add_diagnostic(Diagnostic::error("boom"));
        assert!(manager.has_errors());
        assert_eq!(manager.get_diagnostics().len(), 2);
        manager.clear();
        assert!(manager.get_diagnostics().is_empty());
    }

    #[test]
    fn source_diagnostic_points_at_error_range() {
        let error = Error::evaluation("bad", TokenRange::Span(Span::new(0, 4, 7)));
        let diagnostic = SourceDiagnostic::from_error(&error, "test.jbpl", "foo bar baz");
        assert_eq!(diagnostic.message, "bad");
        assert_eq!(diagnostic.span, Some(SourceSpan::new(4.into(), 3)));
    }
}
