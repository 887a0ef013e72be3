// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! AST types for CHTL.
//!
//! This crate contains the node model, the registries that index it, source
//! tracking and the diagnostic type shared by every compiler stage.

pub mod ast;
pub mod error;
pub mod foundation;

pub use error::{CompileError, DiagnosticFormatter, ErrorKind, Severity};
pub use foundation::{SourceFile, SourceMap, Span};

pub use ast::*;
