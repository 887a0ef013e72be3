//! Source loading for imports.
//!
//! The parser never touches the filesystem directly. Every document, the
//! entry file included, comes through a [`SourceLoader`], which lets tests
//! and embedders compile from memory with [`MemoryLoader`].

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Default extension appended to import paths written without one.
pub const SOURCE_EXTENSION: &str = "chtl";

pub trait SourceLoader {
    /// Resolve an import path written in the document at `from`.
    ///
    /// Relative paths are taken from the importing document's directory,
    /// `.chtl` is appended when the path has no extension and the result is
    /// normalised lexically, so one file always maps to one key.
    fn resolve(&self, from: Option<&Path>, path: &str) -> PathBuf {
        let mut target = PathBuf::from(path);
        if target.extension().is_none() {
            target.set_extension(SOURCE_EXTENSION);
        }
        let joined = match from.and_then(Path::parent) {
            Some(dir) if target.is_relative() => dir.join(target),
            _ => target,
        };
        normalize(&joined)
    }

    /// Read a resolved document.
    fn load(&self, path: &Path) -> io::Result<String>;
}

/// Reads documents from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Serves documents from an in-memory map keyed by normalised path.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, source: impl Into<String>) {
        self.files.insert(normalize(path.as_ref()), source.into());
    }

    pub fn with(mut self, path: impl AsRef<Path>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no such document")
        })
    }
}

/// Drop `.` components and fold `..` into its parent without touching the
/// filesystem. Leading `..` components of a relative path are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize(Path::new("../x/y")), PathBuf::from("../x/y"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("/a/../../b")), PathBuf::from("/b"));
    }

    #[test]
    fn test_resolve_relative_to_importer() {
        let loader = FsLoader;
        assert_eq!(
            loader.resolve(Some(Path::new("src/pages/index.chtl")), "../lib/theme"),
            PathBuf::from("src/lib/theme.chtl")
        );
        assert_eq!(
            loader.resolve(Some(Path::new("main.chtl")), "ui.chtl"),
            PathBuf::from("ui.chtl")
        );
        assert_eq!(
            loader.resolve(Some(Path::new("src/main.chtl")), "/abs/x.chtl"),
            PathBuf::from("/abs/x.chtl")
        );
    }

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new().with("lib/./a.chtl", "div {}");
        assert_eq!(loader.load(Path::new("lib/a.chtl")).unwrap(), "div {}");
        let err = loader.load(Path::new("missing.chtl")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
