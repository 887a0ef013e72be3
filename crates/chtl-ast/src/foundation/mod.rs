//! Foundation types shared by every compiler stage.

pub mod span;

pub use span::{compute_line_starts, SourceFile, SourceMap, Span};
