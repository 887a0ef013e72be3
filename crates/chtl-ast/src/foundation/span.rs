//! Source location tracking.
//!
//! - `Span` - byte range inside one source file plus its cached start line
//! - `SourceFile` - one loaded document with a line index
//! - `SourceMap` - every document that took part in a compilation, indexed by file id
//!
//! File id 0 is always the entry document; imported documents follow in the
//! order the import graph first reached them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Compact source location reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Index into `SourceMap`
    pub file_id: u16,
    /// Byte offset of the first character
    pub start: u32,
    /// Byte offset one past the last character
    pub end: u32,
    /// 1-based line of `start`
    pub start_line: u32,
}

impl Span {
    pub fn new(file_id: u16, start: u32, end: u32, start_line: u32) -> Self {
        Self {
            file_id,
            start,
            end,
            start_line,
        }
    }

    /// Zero-length span at the start of a file.
    pub fn zero(file_id: u16) -> Self {
        Self::new(file_id, 0, 0, 1)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Span covering both `self` and `other`.
    ///
    /// # Panics
    ///
    /// Panics if the spans belong to different files.
    pub fn merge(&self, other: &Span) -> Span {
        assert_eq!(
            self.file_id, other.file_id,
            "cannot merge spans from different files"
        );
        let (start_line, start) = if other.start < self.start {
            (other.start_line, other.start)
        } else {
            (self.start_line, self.start)
        };
        Span {
            file_id: self.file_id,
            start,
            end: self.end.max(other.end),
            start_line,
        }
    }
}

/// All documents taking part in one compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

/// One loaded document with a line index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub source: String,
    /// Byte offset of each line start, with an EOF sentinel at the end.
    pub line_starts: Vec<u32>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Register a document and return its file id.
    ///
    /// # Panics
    ///
    /// Panics if more than `u16::MAX` documents are registered.
    pub fn add_file(&mut self, path: PathBuf, source: String) -> u16 {
        let file_id = self.files.len();
        assert!(file_id < u16::MAX as usize, "too many source files");
        self.files.push(SourceFile::new(path, source));
        file_id as u16
    }

    pub fn get(&self, file_id: u16) -> Option<&SourceFile> {
        self.files.get(file_id as usize)
    }

    pub fn file(&self, span: &Span) -> Option<&SourceFile> {
        self.get(span.file_id)
    }

    pub fn file_path(&self, span: &Span) -> Option<&Path> {
        self.file(span).map(|f| f.path.as_path())
    }

    /// Source text covered by `span`, or `""` when the span is out of range.
    pub fn snippet(&self, span: &Span) -> &str {
        self.file(span)
            .and_then(|f| f.source.get(span.start as usize..span.end as usize))
            .unwrap_or("")
    }

    /// 1-based (line, column) of the span's start.
    pub fn line_col(&self, span: &Span) -> (u32, u32) {
        self.file(span)
            .map(|f| f.line_col(span.start))
            .unwrap_or((span.start_line, 1))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &SourceFile)> {
        self.files.iter().enumerate().map(|(id, f)| (id as u16, f))
    }
}

impl SourceFile {
    pub fn new(path: PathBuf, source: String) -> Self {
        let line_starts = compute_line_starts(&source);
        Self {
            path,
            source,
            line_starts,
        }
    }

    /// 1-based (line, column) for a byte offset. Offsets past EOF clamp to EOF.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.source.len() as u32);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx.min(self.line_starts.len().saturating_sub(2)),
            Err(idx) => idx.max(1) - 1,
        };
        let line = (line_idx + 1) as u32;
        let col = offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    /// Text of a 1-based line without its trailing newline.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        if line == 0 || line as usize >= self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[line as usize - 1] as usize;
        let end = self.line_starts[line as usize] as usize;
        self.source
            .get(start..end)
            .map(|text| text.trim_end_matches(['\n', '\r']))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len().saturating_sub(1)
    }
}

/// Byte offsets of line starts, always ending with an EOF sentinel.
pub fn compute_line_starts(source: &str) -> Vec<u32> {
    let mut line_starts = vec![0];
    for (idx, byte) in source.bytes().enumerate() {
        if byte == b'\n' {
            line_starts.push((idx + 1) as u32);
        }
    }
    if line_starts.last() != Some(&(source.len() as u32)) {
        line_starts.push(source.len() as u32);
    }
    line_starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_starts_with_and_without_trailing_newline() {
        assert_eq!(compute_line_starts("div\nspan\np"), vec![0, 4, 9, 10]);
        assert_eq!(compute_line_starts("div\nspan\n"), vec![0, 4, 9]);
        assert_eq!(compute_line_starts(""), vec![0]);
    }

    #[test]
    fn test_line_col() {
        let file = SourceFile::new(PathBuf::from("a.chtl"), "div {\n  span {}\n}\n".into());
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(4), (1, 5));
        assert_eq!(file.line_col(8), (2, 3));
        assert_eq!(file.line_col(16), (3, 1));
    }

    #[test]
    fn test_line_text_strips_newline() {
        let file = SourceFile::new(PathBuf::from("a.chtl"), "div {\r\n}\n".into());
        assert_eq!(file.line_text(1), Some("div {"));
        assert_eq!(file.line_text(2), Some("}"));
        assert_eq!(file.line_text(3), None);
    }

    #[test]
    fn test_source_map_snippet() {
        let mut map = SourceMap::new();
        let id = map.add_file(PathBuf::from("main.chtl"), "text { \"hi\" }".into());
        let span = Span::new(id, 7, 11, 1);
        assert_eq!(map.snippet(&span), "\"hi\"");
        assert_eq!(map.line_col(&span), (1, 8));
        assert_eq!(
            map.file_path(&span).and_then(|p| p.to_str()),
            Some("main.chtl")
        );
    }

    #[test]
    fn test_merge_keeps_earliest_line() {
        let a = Span::new(0, 10, 12, 2);
        let b = Span::new(0, 3, 5, 1);
        let merged = a.merge(&b);
        assert_eq!((merged.start, merged.end, merged.start_line), (3, 12, 1));
    }

    #[test]
    #[should_panic(expected = "cannot merge spans from different files")]
    fn test_merge_across_files_panics() {
        let _ = Span::new(0, 0, 1, 1).merge(&Span::new(1, 0, 1, 1));
    }
}
