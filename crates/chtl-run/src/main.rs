//! CHTL Run - compiles CHTL documents to HTML
//!
//! Given a file, writes the generated HTML to `--output` or stdout. Given a
//! directory, compiles every `.chtl` file below it and writes each result
//! next to its source (or under `--output`, mirroring the tree).

use chtl::{compile_dir, compile_file, format_errors, CompileFailure, CompileOptions, Compiled};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "chtl-run")]
#[command(about = "Compile CHTL documents to HTML")]
struct Cli {
    /// A .chtl file or a directory of them
    input: PathBuf,

    /// Output file (for a file input) or directory (for a directory input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Nesting limit for parsing and generation
    #[arg(long, default_value_t = chtl::parser::DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chtl=info,chtl_run=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut options = CompileOptions::default();
    options.parse.max_depth = cli.max_depth;
    options.max_depth = cli.max_depth;

    let ok = if cli.input.is_dir() {
        run_dir(&cli.input, cli.output.as_deref(), &options)
    } else {
        run_file(&cli.input, cli.output.as_deref(), &options)
    };
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_file(input: &Path, output: Option<&Path>, options: &CompileOptions) -> bool {
    info!("Compiling {}", input.display());
    let Some(compiled) = report(input, compile_file(input, options)) else {
        return false;
    };
    match output {
        Some(path) => write_output(path, &compiled.html),
        None => {
            println!("{}", compiled.html);
            true
        }
    }
}

fn run_dir(root: &Path, output: Option<&Path>, options: &CompileOptions) -> bool {
    let results = match compile_dir(root, options) {
        Ok(results) => results,
        Err(err) => {
            error!("{}", err);
            return false;
        }
    };
    if results.is_empty() {
        warn!("No .chtl files found in {}", root.display());
    }

    let mut ok = true;
    for (path, result) in results {
        let Some(compiled) = report(&path, result) else {
            ok = false;
            continue;
        };
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let target = match output {
            Some(dir) => dir.join(relative),
            None => path.clone(),
        }
        .with_extension("html");
        ok &= write_output(&target, &compiled.html);
    }
    ok
}

/// Print diagnostics; `None` when the compilation failed.
fn report(path: &Path, result: Result<Compiled, CompileFailure>) -> Option<Compiled> {
    match result {
        Ok(compiled) => {
            if !compiled.diagnostics.is_empty() {
                eprintln!("{}", format_errors(&compiled.diagnostics, &compiled.sources));
            }
            Some(compiled)
        }
        Err(err) => {
            eprintln!("{}", err.render());
            error!("Failed to compile {}: {}", path.display(), err);
            None
        }
    }
}

fn write_output(path: &Path, html: &str) -> bool {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(err) = fs::create_dir_all(parent) {
            error!("Cannot create {}: {}", parent.display(), err);
            return false;
        }
    }
    match fs::write(path, html) {
        Ok(()) => {
            info!("Wrote {}", path.display());
            true
        }
        Err(err) => {
            error!("Cannot write {}: {}", path.display(), err);
            false
        }
    }
}
