//! The compiled program: every parsed document plus the resolved registries.

use super::arena::{Ast, NodeRef};
use super::node::{DefCategory, Definition, Node};
use super::registry::Registry;
use crate::error::CompileError;
use crate::foundation::{SourceMap, Span};
use serde::{Deserialize, Serialize};

/// Root of a compilation.
///
/// Owns one arena per document (entry file first, then imports) and the two
/// registries whose entries point into those arenas. Built once by the
/// parser; every later pass only reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub sources: SourceMap,
    /// Indexed by file id
    pub files: Vec<Ast>,
    pub templates: Registry,
    pub customs: Registry,
    pub settings: Settings,
    /// Lexing, parsing and import diagnostics in the order they were found
    pub diagnostics: Vec<CompileError>,
}

impl Program {
    pub fn ast(&self, file: u16) -> Option<&Ast> {
        self.files.get(file as usize)
    }

    pub fn node(&self, r: NodeRef) -> Option<&Node> {
        self.ast(r.file)?.get(r.node)
    }

    pub fn span(&self, r: NodeRef) -> Span {
        self.ast(r.file)
            .map(|ast| ast.span(r.node))
            .unwrap_or_else(|| Span::zero(r.file))
    }

    /// Top-level statements of the entry document.
    pub fn roots(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.files.iter().take(1).flat_map(|ast| {
            ast.roots()
                .iter()
                .map(move |id| NodeRef::new(ast.file_id(), *id))
        })
    }

    /// The template or custom definition stored at `r`.
    pub fn definition(&self, r: NodeRef) -> Option<(DefCategory, &Definition)> {
        match self.node(r)? {
            Node::TemplateDefinition(def) => Some((DefCategory::Template, def)),
            Node::CustomDefinition(def) => Some((DefCategory::Custom, def)),
            _ => None,
        }
    }

    pub fn registry(&self, category: DefCategory) -> &Registry {
        match category {
            DefCategory::Template => &self.templates,
            DefCategory::Custom => &self.customs,
        }
    }

    /// Namespace-first, global-fallback lookup in one registry.
    pub fn lookup(
        &self,
        category: DefCategory,
        namespace: &str,
        name: &str,
    ) -> Option<(NodeRef, &Definition)> {
        let r = self.registry(category).resolve(namespace, name)?;
        self.definition(r).map(|(_, def)| (r, def))
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(CompileError::is_error)
    }

    /// Diagnostics as plain strings; messages from imported documents are
    /// prefixed with that document's path.
    pub fn error_messages(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .map(|diag| match diag.span.file_id {
                0 => diag.message.clone(),
                _ => match self.sources.file_path(&diag.span) {
                    Some(path) => format!("{}: {}", path.display(), diag.message),
                    None => diag.message.clone(),
                },
            })
            .collect()
    }
}

/// Values set by `[Configuration]` blocks of the entry document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Base of `tag[n]` indices in element specializations
    pub index_initial_count: usize,
    /// Emit a trace event for every generated node
    pub debug_mode: bool,
}

impl Settings {
    /// Apply one `KEY = value` entry.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "INDEX_INITIAL_COUNT" => {
                self.index_initial_count = value.parse().map_err(|_| {
                    format!("INDEX_INITIAL_COUNT expects a non-negative integer, got '{}'", value)
                })?;
            }
            "DEBUG_MODE" => {
                self.debug_mode = match value {
                    "true" => true,
                    "false" => false,
                    _ => return Err(format!("DEBUG_MODE expects true or false, got '{}'", value)),
                };
            }
            _ => return Err(format!("unknown configuration key '{}'", key)),
        }
        Ok(())
    }
}
