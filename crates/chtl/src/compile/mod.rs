use crate::generate::{Generator, Passthrough, ScriptProcessor};
use chtl_ast::{CompileError, DiagnosticFormatter, Program, SourceMap};
use chtl_parser::{parse_program, parse_source, FsLoader, ParseOptions, SourceLoader};
use chtl_resolve::validate;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Options for a whole compilation.
#[derive(Clone)]
pub struct CompileOptions {
    pub parse: ParseOptions,
    /// Nesting limit for generation and evaluation
    pub max_depth: usize,
    /// Receives the raw text of every `script { }` block
    pub script: Arc<dyn ScriptProcessor + Send + Sync>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        let parse = ParseOptions::default();
        Self {
            max_depth: parse.max_depth,
            parse,
            script: Arc::new(Passthrough),
        }
    }
}

impl fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOptions")
            .field("parse", &self.parse)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

/// Output of a successful compilation.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub html: String,
    /// Warnings, e.g. import cycles
    pub diagnostics: Vec<CompileError>,
    pub sources: SourceMap,
}

/// Why a compilation produced no output.
#[derive(Debug, thiserror::Error)]
pub enum CompileFailure {
    /// The entry document could not be read.
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Parsing, validation or generation reported errors.
    #[error(
        "compilation failed with {} error(s)",
        .diagnostics.iter().filter(|d| d.is_error()).count()
    )]
    Diagnostics {
        diagnostics: Vec<CompileError>,
        sources: SourceMap,
    },
}

impl CompileFailure {
    pub fn diagnostics(&self) -> &[CompileError] {
        match self {
            CompileFailure::Io { .. } => &[],
            CompileFailure::Diagnostics { diagnostics, .. } => diagnostics,
        }
    }

    /// Every diagnostic with its source snippet, or the I/O error.
    pub fn render(&self) -> String {
        match self {
            CompileFailure::Io { .. } => self.to_string(),
            CompileFailure::Diagnostics {
                diagnostics,
                sources,
            } => format_errors(diagnostics, sources),
        }
    }
}

/// Compile an in-memory document. Imports resolve against the working
/// directory.
pub fn compile_str(source: &str, options: &CompileOptions) -> Result<Compiled, CompileFailure> {
    let program = parse_source("<input>", source.to_string(), &FsLoader, &options.parse);
    compile_program(&program, options)
}

/// Compile the document at `path` and everything it imports.
pub fn compile_file(path: &Path, options: &CompileOptions) -> Result<Compiled, CompileFailure> {
    compile_with_loader(path, &FsLoader, options)
}

/// Compile `entry`, reading it and its imports through `loader`.
pub fn compile_with_loader(
    entry: &Path,
    loader: &dyn SourceLoader,
    options: &CompileOptions,
) -> Result<Compiled, CompileFailure> {
    let program =
        parse_program(entry, loader, &options.parse).map_err(|source| CompileFailure::Io {
            path: entry.to_path_buf(),
            source,
        })?;
    compile_program(&program, options)
}

/// Validate and generate an already parsed program.
///
/// Parse errors stop before validation; validation errors stop before
/// generation. Warnings never stop anything and are returned alongside
/// the output.
pub fn compile_program(program: &Program, options: &CompileOptions) -> Result<Compiled, CompileFailure> {
    let mut diagnostics = program.diagnostics.clone();
    let fail = |diagnostics: Vec<CompileError>| CompileFailure::Diagnostics {
        diagnostics,
        sources: program.sources.clone(),
    };
    if program.has_errors() {
        return Err(fail(diagnostics));
    }

    diagnostics.extend(validate(program));
    if diagnostics.iter().any(CompileError::is_error) {
        return Err(fail(diagnostics));
    }

    let html = Generator::new(program)
        .with_max_depth(options.max_depth)
        .with_script(&*options.script)
        .generate();
    match html {
        Ok(html) => {
            debug!(bytes = html.len(), warnings = diagnostics.len(), "compiled");
            Ok(Compiled {
                html,
                diagnostics,
                sources: program.sources.clone(),
            })
        }
        Err(err) => {
            diagnostics.push(err);
            Err(fail(diagnostics))
        }
    }
}

/// Compile every `*.chtl` file below `root`, in path order.
///
/// Each file is an independent compilation; only a failure to walk the
/// directory is an `Err`.
pub fn compile_dir(
    root: &Path,
    options: &CompileOptions,
) -> Result<Vec<(PathBuf, Result<Compiled, CompileFailure>)>, CompileFailure> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|err| CompileFailure::Io {
            path: err.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf),
            source: err.into(),
        })?;
        let is_source = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .map_or(false, |ext| ext == chtl_parser::loader::SOURCE_EXTENSION);
        if is_source {
            files.push(entry.into_path());
        }
    }
    files.sort();
    info!(root = %root.display(), files = files.len(), "compiling directory");

    Ok(files
        .into_iter()
        .map(|path| {
            let result = compile_file(&path, options);
            (path, result)
        })
        .collect())
}

/// Formats compilation errors with source context.
pub fn format_errors(errors: &[CompileError], sources: &SourceMap) -> String {
    DiagnosticFormatter::new(sources).format_all(errors)
}
