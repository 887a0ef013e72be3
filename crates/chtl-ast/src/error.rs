//! Compile-time diagnostics.
//!
//! Every stage of the pipeline reports through [`CompileError`]: the lexer
//! and parser record them on the [`Program`](crate::Program) and keep
//! going, the validator returns a batch of them, and the generator returns a
//! single one when evaluation has to abort.
//!
//! # Design
//!
//! - `CompileError` - one diagnostic with a primary span and optional labels/notes
//! - `ErrorKind` - closed category set, one name per kind
//! - `Severity` - note, warning or error
//! - `DiagnosticFormatter` - renders a diagnostic with its source line
//!
//! # Examples
//!
//! ```
//! # use chtl_ast::error::*;
//! # use chtl_ast::foundation::Span;
//! let error = CompileError::new(
//!     ErrorKind::UndefinedTemplate,
//!     Span::new(0, 4, 12, 1),
//!     "undefined template 'Theme'".to_string(),
//! );
//! assert_eq!(error.to_string(), "error: undefined template: undefined template 'Theme'");
//! ```

use crate::foundation::{SourceMap, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compilation diagnostic with source location and message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub severity: Severity,
    /// Primary source location
    pub span: Span,
    pub message: String,
    /// Related locations ("defined here")
    pub labels: Vec<Label>,
    /// Hints appended after the snippet
    pub notes: Vec<String>,
}

/// Category of a diagnostic.
///
/// # Invariant
///
/// Discriminants index `ERROR_KIND_NAMES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorKind {
    /// Illegal token: malformed block keyword or unrecognized character
    Lex = 0,
    /// Unexpected token, missing delimiter, unrecognized `@`-usage shape
    Syntax = 1,
    /// Imported file could not be read or did not contain the requested definition
    Import = 2,
    /// Import graph contains a cycle
    ImportCycle = 3,
    /// Nesting exceeded the configured limit
    DepthLimit = 4,
    /// Incompatible units in arithmetic
    UnitMismatch = 5,
    DivisionByZero = 6,
    /// `Template(Var)` names a property the template does not define
    UndefinedVariable = 7,
    /// Usage or variable access names an unknown template/custom
    UndefinedTemplate = 8,
    /// Condition of `?:` did not evaluate to a Bool
    NonBooleanCondition = 9,
    /// Operand or definition of the wrong type
    TypeMismatch = 10,
    /// An `except` constraint forbids this node
    ConstraintViolation = 11,
    /// Bug in the compiler
    Internal = 12,
}

const ERROR_KIND_NAMES: &[&str] = &[
    "illegal token",           // 0: Lex
    "syntax error",            // 1: Syntax
    "import error",            // 2: Import
    "import cycle",            // 3: ImportCycle
    "nesting too deep",        // 4: DepthLimit
    "unit mismatch",           // 5: UnitMismatch
    "division by zero",        // 6: DivisionByZero
    "undefined variable",      // 7: UndefinedVariable
    "undefined template",      // 8: UndefinedTemplate
    "non-boolean condition",   // 9: NonBooleanCondition
    "type mismatch",           // 10: TypeMismatch
    "constraint violation",    // 11: ConstraintViolation
    "internal compiler error", // 12: Internal
];

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

/// Secondary labeled span in a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl CompileError {
    /// Creates an error-severity diagnostic.
    pub fn new(kind: ErrorKind, span: Span, message: String) -> Self {
        Self::with_severity(kind, Severity::Error, span, message)
    }

    /// Creates a warning-severity diagnostic.
    pub fn warning(kind: ErrorKind, span: Span, message: String) -> Self {
        Self::with_severity(kind, Severity::Warning, span, message)
    }

    fn with_severity(kind: ErrorKind, severity: Severity, span: Span, message: String) -> Self {
        Self {
            kind,
            severity,
            span,
            message,
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Adds a secondary labeled span.
    pub fn with_label(mut self, span: Span, message: String) -> Self {
        self.labels.push(Label { span, message });
        self
    }

    /// Adds a note or hint.
    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        ERROR_KIND_NAMES[self as usize]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.kind.name(), self.message)
    }
}

impl std::error::Error for CompileError {}

/// Formats diagnostics with source code context.
///
/// ```text
/// error: unit mismatch: cannot add 'px' and 'em'
///  --> main.chtl:3:12
///   |
/// 3 |     width: 10px + 2em;
///   |            ^^^^^^^^^
/// ```
pub struct DiagnosticFormatter<'a> {
    sources: &'a SourceMap,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(sources: &'a SourceMap) -> Self {
        Self { sources }
    }

    pub fn format(&self, error: &CompileError) -> String {
        let mut output = format!("{}\n", error);
        let mut gutter = 1;

        if let Some(file) = self.sources.file(&error.span) {
            let (line, col) = file.line_col(error.span.start);
            gutter = line.to_string().len();
            let pad = " ".repeat(gutter);
            output.push_str(&format!("{}--> {}:{}:{}\n", pad, file.path.display(), line, col));

            if let Some(source_line) = file.line_text(line) {
                let start_col = col as usize;
                let span_len = error.span.len() as usize;
                let end_col = (start_col + span_len).min(source_line.len() + 1);
                let underline = " ".repeat(start_col.saturating_sub(1))
                    + &"^".repeat(end_col.saturating_sub(start_col).max(1));
                output.push_str(&format!("{} |\n", pad));
                output.push_str(&format!("{:>width$} | {}\n", line, source_line, width = gutter));
                output.push_str(&format!("{} | {}\n", pad, underline));
            }
        }

        let pad = " ".repeat(gutter);
        for label in &error.labels {
            output.push_str(&format!("{} = note: {}\n", pad, label.message));
            if let Some(path) = self.sources.file_path(&label.span) {
                let (line, col) = self.sources.line_col(&label.span);
                output.push_str(&format!("{}   at {}:{}:{}\n", pad, path.display(), line, col));
            }
        }

        for note in &error.notes {
            output.push_str(&format!("{} = help: {}\n", pad, note));
        }

        output
    }

    /// Formats every diagnostic, separated by blank lines.
    pub fn format_all(&self, errors: &[CompileError]) -> String {
        errors
            .iter()
            .map(|e| self.format(e))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sources() -> SourceMap {
        let mut sources = SourceMap::new();
        sources.add_file(
            PathBuf::from("main.chtl"),
            "div {\n  style { width: 1px + 2em; }\n}".to_string(),
        );
        sources
    }

    #[test]
    fn test_every_kind_has_a_name() {
        assert_eq!(ErrorKind::Lex.name(), "illegal token");
        assert_eq!(ErrorKind::ConstraintViolation.name(), "constraint violation");
        assert_eq!(ErrorKind::Internal.name(), "internal compiler error");
        assert_eq!(ERROR_KIND_NAMES.len(), ErrorKind::Internal as usize + 1);
    }

    #[test]
    fn test_builders() {
        let span = Span::new(0, 0, 3, 1);
        let err = CompileError::warning(ErrorKind::ImportCycle, span, "cycle".into())
            .with_label(span, "imported here".into())
            .with_note("remove one of the imports".into());
        assert_eq!(err.severity, Severity::Warning);
        assert!(!err.is_error());
        assert_eq!(err.labels.len(), 1);
        assert_eq!(err.notes, vec!["remove one of the imports".to_string()]);
    }

    #[test]
    fn test_formatter_underlines_span() {
        let sources = sources();
        // "1px + 2em" on line 2
        let err = CompileError::new(
            ErrorKind::UnitMismatch,
            Span::new(0, 23, 32, 2),
            "cannot add 'px' and 'em'".into(),
        );
        let out = DiagnosticFormatter::new(&sources).format(&err);
        assert_eq!(
            out,
            concat!(
                "error: unit mismatch: cannot add 'px' and 'em'\n",
                " --> main.chtl:2:18\n",
                "  |\n",
                "2 |   style { width: 1px + 2em; }\n",
                "  |                  ^^^^^^^^^\n",
            )
        );
    }

    #[test]
    fn test_formatter_gutter_follows_line_number_width() {
        let mut sources = SourceMap::new();
        let text = format!("{}p {{ $ }}", "\n".repeat(11));
        sources.add_file(PathBuf::from("long.chtl"), text);
        // "$" on line 12
        let err = CompileError::new(ErrorKind::Lex, Span::new(0, 15, 16, 12), "x".into())
            .with_note("remove it".into());
        let out = DiagnosticFormatter::new(&sources).format(&err);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[1], "  --> long.chtl:12:5");
        assert_eq!(lines[2], "   |");
        assert_eq!(lines[3], "12 | p { $ }");
        assert_eq!(lines[4], "   |     ^");
        assert_eq!(lines[5], "   = help: remove it");
    }

    #[test]
    fn test_formatter_without_source() {
        let sources = SourceMap::new();
        let err = CompileError::new(ErrorKind::Import, Span::zero(3), "missing".into());
        assert_eq!(
            DiagnosticFormatter::new(&sources).format(&err),
            "error: import error: missing\n"
        );
    }
}
