//! Invocation errors and non-fatal parse diagnostics.
//!
//! Malformed markup never fails a parse. It is reported as [`Diagnostic`]s
//! attached to the nearest node. [`ParseError`] is reserved for invalid
//! invocations that are rejected before any tree is built.
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::ast::SegmentId;

/// Errors that prevent a parse from starting.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The parser configuration cannot be used.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A tag registry was built inconsistently.
    #[error("Registry error: {message}")]
    Registry { message: String },

    /// Input bytes are not valid UTF-8.
    #[error("UTF-8 encoding error: {source}")]
    Utf8 {
        #[from]
        source: std::str::Utf8Error,
    },
}

/// Convenience type alias for results of parse invocations.
pub type Result<T> = std::result::Result<T, ParseError>;

impl ParseError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        ParseError::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn registry_error(message: impl Into<String>) -> Self {
        ParseError::Registry {
            message: message.into(),
        }
    }
}

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    /// Markup is broken; the affected region was recovered as text.
    Error,
    /// Markup is suspicious but was interpreted.
    Warning,
    /// Informational, e.g. a parsing decision worth surfacing in an editor.
    Info,
}

/// The closed set of problems the parser reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// A registered tag name whose opening tag never reaches `>` or `/>`.
    MalformedTag,
    /// An opening tag with no matching closing tag.
    UnterminatedTag,
    /// A closing tag of a registered name with nothing to close.
    UnmatchedClosingTag,
    /// Closing tag text differs from the opening tag (case or spelling).
    ClosingTagMismatch,
    /// A quoted attribute value that never closes.
    UnterminatedAttributeValue,
    /// An attribute name not followed by `=`.
    MissingEquals,
    /// A quote character outside of an attribute value.
    StrayQuote,
    /// An attribute value given without quotes.
    UnquotedAttributeValue,
    /// Any other token that does not belong in a tag.
    UnexpectedToken,
    /// `{{` inside an attribute value without a matching `}}`.
    UnterminatedTemplate,
    /// A tag whose body is a single element of the same name.
    AmbiguousSelfNesting,
    /// Tag nesting exceeded the configured maximum depth.
    NestingTooDeep,
    /// The input exceeded the configured maximum size.
    InputTooLarge,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::MalformedTag
            | DiagnosticKind::UnterminatedTag
            | DiagnosticKind::UnterminatedAttributeValue
            | DiagnosticKind::StrayQuote
            | DiagnosticKind::NestingTooDeep
            | DiagnosticKind::InputTooLarge => Severity::Error,
            DiagnosticKind::UnmatchedClosingTag
            | DiagnosticKind::ClosingTagMismatch
            | DiagnosticKind::MissingEquals
            | DiagnosticKind::UnquotedAttributeValue
            | DiagnosticKind::UnexpectedToken
            | DiagnosticKind::UnterminatedTemplate => Severity::Warning,
            DiagnosticKind::AmbiguousSelfNesting => Severity::Info,
        }
    }

    /// Returns true for the kinds produced by configured resource limits.
    pub fn is_resource_limit(self) -> bool {
        matches!(
            self,
            DiagnosticKind::NestingTooDeep | DiagnosticKind::InputTooLarge
        )
    }
}

/// A non-fatal problem found while parsing.
///
/// `start`/`end` are byte offsets of the offending source region. `node` is
/// the id of the segment the diagnostic is attached to; it is filled in when
/// the tree is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub start: usize,
    pub end: usize,
    pub node: Option<SegmentId>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, start: usize, end: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
            start,
            end,
            node: None,
        }
    }

    pub fn with_node(mut self, node: SegmentId) -> Self {
        self.node = Some(node);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} at {}..{}: {}",
            self.severity, self.start, self.end, self.message
        )
    }
}

/// Collects diagnostics up to an optional cap.
///
/// Diagnostics past the cap are counted but not stored.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    max: Option<usize>,
    dropped: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max(max: Option<usize>) -> Self {
        Self {
            items: Vec::new(),
            max,
            dropped: 0,
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if self.max.is_some_and(|max| self.items.len() >= max) {
            self.dropped += 1;
            return;
        }
        self.items.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of diagnostics discarded because the cap was reached.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Diagnostic> {
        self.items.iter_mut()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.items.iter().filter(|d| d.severity == severity).count()
    }

    pub fn count_by_kind(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        for diagnostic in iter {
            self.push(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ParseError::invalid_config("max_nesting_depth must be at least 1");
        let text = error.to_string();
        assert!(text.contains("Invalid configuration"));
        assert!(text.contains("max_nesting_depth"));
    }

    #[test]
    fn test_utf8_conversion() {
        let bytes = vec![0xFF, 0xFE];
        let utf8_error = std::str::from_utf8(&bytes).unwrap_err();
        let error: ParseError = utf8_error.into();
        assert!(matches!(error, ParseError::Utf8 { .. }));
    }

    #[test]
    fn test_kind_severity() {
        assert_eq!(DiagnosticKind::UnterminatedTag.severity(), Severity::Error);
        assert_eq!(DiagnosticKind::MissingEquals.severity(), Severity::Warning);
        assert_eq!(
            DiagnosticKind::AmbiguousSelfNesting.severity(),
            Severity::Info
        );
        assert!(DiagnosticKind::NestingTooDeep.is_resource_limit());
        assert!(!DiagnosticKind::StrayQuote.is_resource_limit());
    }

    #[test]
    fn test_diagnostics_cap() {
        let mut diagnostics = Diagnostics::with_max(Some(2));
        for i in 0..4 {
            diagnostics.push(Diagnostic::new(DiagnosticKind::MissingEquals, i, i + 1, "x"));
        }
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.dropped(), 2);
        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.count_by_severity(Severity::Warning), 2);
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic =
            Diagnostic::new(DiagnosticKind::StrayQuote, 3, 4, "stray quote").with_node(SegmentId(1));
        assert_eq!(diagnostic.to_string(), "Error at 3..4: stray quote");
        assert_eq!(diagnostic.node, Some(SegmentId(1)));
    }
}
