//! Import resolution as an explicit dependency graph.
//!
//! Building a [`Program`] runs in four steps:
//!
//! 1. Parse the entry document into its own arena (file id 0).
//! 2. Walk import requests file by file, loading and parsing every
//!    referenced document exactly once. The visited map (normalised path to
//!    file id) lives for one build only.
//! 3. Detect cycles over the recorded edges and report each one.
//! 4. Replay every document's symbol events in source order to build its
//!    registries. An import event merges the imported document's finished
//!    tables at that point, so later entries overwrite earlier ones.
//!
//! Registry entries are `(file id, node index)` pairs; nothing is moved or
//! re-parented when tables are merged.

use crate::loader::SourceLoader;
use crate::parser::{ImportRequest, ParsedFile, Parser, SymbolEvent};
use crate::ParseOptions;
use chtl_ast::{
    CompileError, DefCategory, DefKind, ErrorKind, Node, NodeRef, Program, Registry, SourceMap,
    GLOBAL_NAMESPACE,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One parsed document and where each of its imports led.
struct FileUnit {
    path: PathBuf,
    parsed: ParsedFile,
    /// Resolved file id per entry of `parsed.imports`; `None` when loading failed
    targets: Vec<Option<u16>>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    templates: Registry,
    customs: Registry,
}

impl Tables {
    fn get(&self, category: DefCategory) -> &Registry {
        match category {
            DefCategory::Template => &self.templates,
            DefCategory::Custom => &self.customs,
        }
    }

    fn get_mut(&mut self, category: DefCategory) -> &mut Registry {
        match category {
            DefCategory::Template => &mut self.templates,
            DefCategory::Custom => &mut self.customs,
        }
    }
}

/// Three-colour marking for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

pub struct ProgramBuilder<'a> {
    loader: &'a dyn SourceLoader,
    options: &'a ParseOptions,
    sources: SourceMap,
    files: Vec<FileUnit>,
    visited: HashMap<PathBuf, u16>,
    diagnostics: Vec<CompileError>,
    /// Finished registries per file, filled by `replay`
    tables: Vec<Option<Tables>>,
    replaying: Vec<bool>,
}

impl<'a> ProgramBuilder<'a> {
    pub fn new(loader: &'a dyn SourceLoader, options: &'a ParseOptions) -> Self {
        Self {
            loader,
            options,
            sources: SourceMap::new(),
            files: Vec::new(),
            visited: HashMap::new(),
            diagnostics: Vec::new(),
            tables: Vec::new(),
            replaying: Vec::new(),
        }
    }

    /// Parse `source` as the entry document and resolve everything it
    /// imports.
    pub fn build(mut self, path: PathBuf, source: String) -> Program {
        if self.add_document(path, source).is_none() {
            return Program {
                diagnostics: self.diagnostics,
                ..Program::default()
            };
        }

        let mut next = 0;
        while next < self.files.len() {
            self.resolve_imports(next);
            next += 1;
        }

        self.detect_cycles();

        self.tables = vec![None; self.files.len()];
        self.replaying = vec![false; self.files.len()];
        let tables = self.replay(0);

        debug!(
            files = self.files.len(),
            templates = tables.templates.len(),
            customs = tables.customs.len(),
            diagnostics = self.diagnostics.len(),
            "program built"
        );

        let settings = self.files[0].parsed.settings.clone();
        Program {
            sources: self.sources,
            files: self.files.into_iter().map(|unit| unit.parsed.ast).collect(),
            templates: tables.templates,
            customs: tables.customs,
            settings,
            diagnostics: self.diagnostics,
        }
    }

    /// Register and parse one document. Returns its file id.
    fn add_document(&mut self, path: PathBuf, source: String) -> Option<u16> {
        let count = self.sources.file_count();
        if count >= u16::MAX as usize {
            self.diagnostics.push(CompileError::new(
                ErrorKind::Import,
                chtl_ast::Span::zero(0),
                format!("too many documents, cannot load '{}'", path.display()),
            ));
            return None;
        }
        let file_id = count as u16;

        let parsed = Parser::new(&source, file_id, self.options).parse_file();
        self.diagnostics
            .extend(parsed.errors.iter().cloned().map(CompileError::from));

        debug!(file_id, path = %path.display(), "loaded document");
        self.sources.add_file(path.clone(), source);
        self.visited.insert(path.clone(), file_id);
        self.files.push(FileUnit {
            path,
            parsed,
            targets: Vec::new(),
        });
        Some(file_id)
    }

    fn resolve_imports(&mut self, file: usize) {
        let from = self.files[file].path.clone();
        let requests = self.files[file].parsed.imports.clone();

        let mut targets = Vec::with_capacity(requests.len());
        for request in &requests {
            let resolved = self.loader.resolve(Some(&from), &request.import.path);
            let target = match self.visited.get(&resolved) {
                Some(id) => Some(*id),
                None => match self.loader.load(&resolved) {
                    Ok(source) => self.add_document(resolved, source),
                    Err(err) => {
                        warn!(path = %resolved.display(), error = %err, "import failed");
                        self.diagnostics.push(CompileError::new(
                            ErrorKind::Import,
                            request.span,
                            format!("cannot read '{}': {}", resolved.display(), err),
                        ));
                        None
                    }
                },
            };
            targets.push(target);
        }
        self.files[file].targets = targets;
    }

    fn detect_cycles(&mut self) {
        let mut marks = vec![Mark::Unvisited; self.files.len()];
        let mut stack = Vec::new();
        self.visit(0, &mut marks, &mut stack);
    }

    fn visit(&mut self, file: u16, marks: &mut [Mark], stack: &mut Vec<u16>) {
        marks[file as usize] = Mark::InProgress;
        stack.push(file);

        let edges: Vec<(u16, ImportRequest)> = {
            let unit = &self.files[file as usize];
            unit.targets
                .iter()
                .zip(&unit.parsed.imports)
                .filter_map(|(target, request)| target.map(|t| (t, request.clone())))
                .collect()
        };

        for (target, request) in edges {
            match marks[target as usize] {
                Mark::Unvisited => self.visit(target, marks, stack),
                Mark::InProgress => self.report_cycle(target, stack, &request),
                Mark::Done => {}
            }
        }

        stack.pop();
        marks[file as usize] = Mark::Done;
    }

    fn report_cycle(&mut self, target: u16, stack: &[u16], request: &ImportRequest) {
        let start = stack.iter().position(|f| *f == target).unwrap_or(0);
        let chain: Vec<String> = stack[start..]
            .iter()
            .chain(std::iter::once(&target))
            .map(|f| self.files[*f as usize].path.display().to_string())
            .collect();
        let description = chain.join(" → ");

        warn!(cycle = %description, "circular import");
        self.diagnostics.push(
            CompileError::warning(
                ErrorKind::ImportCycle,
                request.span,
                format!("circular import: {}", description),
            )
            .with_note("the import closing the cycle contributes no definitions".to_string()),
        );
    }

    /// Registries of `file` after all of its events.
    fn replay(&mut self, file: u16) -> Tables {
        if let Some(tables) = &self.tables[file as usize] {
            return tables.clone();
        }
        if self.replaying[file as usize] {
            // Reached again through a cycle that was already reported.
            return Tables::default();
        }
        self.replaying[file as usize] = true;

        let mut tables = Tables::default();
        let events = self.files[file as usize].parsed.events.clone();
        for event in events {
            match event {
                SymbolEvent::Define {
                    category,
                    namespace,
                    name,
                    node,
                } => {
                    let r = NodeRef::new(file, node);
                    if let Some(previous) = tables.get_mut(category).insert(&namespace, &name, r)
                    {
                        debug!(%name, %namespace, %previous, "definition replaced");
                    }
                }
                SymbolEvent::Import(idx) => {
                    let unit = &self.files[file as usize];
                    let request = unit.parsed.imports[idx].clone();
                    let Some(target) = unit.targets.get(idx).copied().flatten() else {
                        continue;
                    };
                    let imported = self.replay(target);
                    self.merge_import(&mut tables, &request, &imported, target);
                }
            }
        }

        self.replaying[file as usize] = false;
        self.tables[file as usize] = Some(tables.clone());
        tables
    }

    fn merge_import(
        &mut self,
        tables: &mut Tables,
        request: &ImportRequest,
        imported: &Tables,
        target: u16,
    ) {
        let import = &request.import;
        let categories: Vec<DefCategory> = match import.category {
            Some(category) => vec![category],
            None => vec![DefCategory::Template, DefCategory::Custom],
        };

        let Some(name) = &import.name else {
            for category in categories {
                for (namespace, name, r) in imported.get(category).iter() {
                    let accepted = self
                        .definition_kind(r)
                        .is_some_and(|kind| import.accepts(category, kind));
                    if accepted {
                        tables.get_mut(category).insert(namespace, name, r);
                    }
                }
            }
            return;
        };

        let found = categories.iter().find_map(|category| {
            let registry = imported.get(*category);
            registry
                .get(GLOBAL_NAMESPACE, name)
                .or_else(|| registry.find_any(name))
                .filter(|r| {
                    self.definition_kind(*r)
                        .is_some_and(|kind| import.accepts(*category, kind))
                })
                .map(|r| (*category, r))
        });

        match found {
            Some((category, r)) => {
                let local = import.alias.as_deref().unwrap_or(name);
                tables
                    .get_mut(category)
                    .insert(&request.namespace, local, r);
            }
            None => {
                let mut wanted = Vec::new();
                if let Some(category) = import.category {
                    wanted.push(category.to_string());
                }
                if let Some(kind) = import.kind {
                    wanted.push(kind.to_string());
                }
                wanted.push(name.clone());
                self.diagnostics.push(CompileError::new(
                    ErrorKind::Import,
                    request.span,
                    format!(
                        "'{}' does not define {}",
                        self.files[target as usize].path.display(),
                        wanted.join(" ")
                    ),
                ));
            }
        }
    }

    fn definition_kind(&self, r: NodeRef) -> Option<DefKind> {
        match self.files.get(r.file as usize)?.parsed.ast.get(r.node)? {
            Node::TemplateDefinition(def) | Node::CustomDefinition(def) => Some(def.kind),
            _ => None,
        }
    }
}

/// Entry path as the builder keys it.
pub(crate) fn entry_key(path: &Path) -> PathBuf {
    crate::loader::normalize(path)
}
