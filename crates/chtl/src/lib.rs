// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! # CHTL compiler
//!
//! Compiles CHTL documents into HTML with one aggregated stylesheet.
//!
//! This crate is a facade over the pipeline crates plus the generator and
//! the high-level compile API:
//!
//! ```text
//! chtl-ast      - spans, diagnostics, node arena, registries
//!     ↓
//! chtl-lexer    - tokens and keyword table
//!     ↓
//! chtl-parser   - documents, imports, registries
//!     ↓
//! chtl-resolve  - values, evaluation, except validation
//!     ↓
//! chtl          - HTML generation + compile API
//! ```
//!
//! ## Usage
//!
//! ```
//! use chtl::{compile_str, CompileOptions};
//!
//! let compiled = compile_str(
//!     "div { style { .box { color: red; } } }",
//!     &CompileOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(
//!     compiled.html,
//!     r#"<head><style>.box{color:red;}</style></head><div class="box"></div>"#
//! );
//! ```

pub use chtl_ast::{self as ast, *};

pub use chtl_lexer as lexer;
pub use chtl_parser as parser;
pub use chtl_parser::{parse_program, parse_source, parse_str, FsLoader, MemoryLoader, SourceLoader};
pub use chtl_resolve as resolve;
pub use chtl_resolve::{EvalContext, EvalError, Value};

pub mod compile;
pub mod generate;

pub use compile::{
    compile_dir, compile_file, compile_program, compile_str, compile_with_loader, format_errors,
    CompileFailure, CompileOptions, Compiled,
};
pub use generate::{Generator, Passthrough, ScriptProcessor};

/// Compiler version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
