// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Hand-written recursive descent parser for CHTL.
//!
//! Turns source documents into a [`Program`]: one node arena per document
//! plus the template and custom registries, with every import resolved.
//!
//! ## Architecture
//!
//! - [`parser`]: statement, definition and expression parsing for one
//!   document, with error recovery
//! - [`loader`]: where documents come from ([`FsLoader`], [`MemoryLoader`])
//! - [`import`]: the import dependency graph and registry replay
//!
//! # Examples
//!
//! ```
//! use chtl_parser::{parse_source, MemoryLoader, ParseOptions};
//!
//! let loader = MemoryLoader::new().with("theme.chtl", "[Template] @Var Theme { main: red; }");
//! let program = parse_source(
//!     "main.chtl",
//!     "[Import] @Var from \"theme\"; div { }".to_string(),
//!     &loader,
//!     &ParseOptions::default(),
//! );
//! assert!(program.diagnostics.is_empty());
//! assert_eq!(program.files.len(), 2);
//! assert_eq!(program.templates.len(), 1);
//! ```

pub mod import;
pub mod loader;
pub mod parser;

pub use import::ProgramBuilder;
pub use loader::{FsLoader, MemoryLoader, SourceLoader};
pub use parser::{ImportRequest, ParseError, ParseErrorKind, ParsedFile, Parser, SymbolEvent};

use chtl_ast::Program;
use chtl_lexer::KeywordTable;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default nesting limit for blocks and expressions.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Keyword table every document starts from
    pub keywords: KeywordTable,
    /// Deepest allowed nesting of statements and expressions
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            keywords: KeywordTable::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Load `entry` through `loader` and build its program.
///
/// Only a failure to read the entry document itself is an `Err`; problems
/// with imported documents are diagnostics on the returned program.
pub fn parse_program(
    entry: &Path,
    loader: &dyn SourceLoader,
    options: &ParseOptions,
) -> io::Result<Program> {
    let path = import::entry_key(entry);
    let source = loader.load(&path)?;
    Ok(parse_source(path, source, loader, options))
}

/// Build a program from an in-memory entry document. Imports resolve
/// relative to `path` through `loader`.
pub fn parse_source(
    path: impl Into<PathBuf>,
    source: String,
    loader: &dyn SourceLoader,
    options: &ParseOptions,
) -> Program {
    let path: PathBuf = path.into();
    let path = import::entry_key(&path);
    debug!(path = %path.display(), "parsing program");
    ProgramBuilder::new(loader, options).build(path, source)
}

/// Parse a standalone document with default options; imports are read from
/// the filesystem relative to the working directory.
pub fn parse_str(source: &str) -> Program {
    parse_source(
        "<input>",
        source.to_string(),
        &FsLoader,
        &ParseOptions::default(),
    )
}
