//! Style and variable template expansion.
//!
//! A usage expands to an ordered property list: inherited definitions
//! first, depth-first in the order they are listed, then the definition's
//! own properties. A later entry for the same name replaces the earlier
//! value but keeps its position. Custom specializations then delete or
//! override entries. Valueless custom properties that nothing filled in are
//! dropped.

use super::Generator;
use chtl_ast::{
    CompileError, DefCategory, DefKind, Definition, ErrorKind, Expr, Node, NodeId, NodeRef,
    Usage,
};
use chtl_resolve::EvalContext;
use indexmap::IndexMap;
use tracing::trace;

/// Property name to its expression; `None` for a valueless custom property.
type Properties<'p> = IndexMap<&'p str, Option<&'p Expr>>;

impl<'p> Generator<'p> {
    /// Expand a `@Style`/`@Var` usage into `out`, evaluating under `ctx`.
    pub(super) fn apply_style_usage(
        &self,
        ctx: &mut EvalContext<'p>,
        at: NodeRef,
        usage: &'p Usage,
        specializations: Option<&'p [NodeId]>,
        out: &mut IndexMap<String, String>,
    ) -> Result<(), CompileError> {
        if usage.kind == DefKind::Element {
            return Err(CompileError::new(
                ErrorKind::TypeMismatch,
                self.program.span(at),
                format!("'{}' cannot be used in a style block", usage),
            ));
        }
        let (def_ref, def) = self.resolve_usage(at, usage, specializations.is_some())?;
        let mut properties = self.gather(def_ref, def, 0)?;
        if let Some(specs) = specializations {
            self.specialize_properties(&mut properties, at.file, specs);
        }

        for (name, expr) in properties {
            let Some(expr) = expr else {
                trace!(property = name, "valueless property omitted");
                continue;
            };
            let value = ctx.eval(expr).map_err(|e| e.into_diagnostic(expr.span))?;
            out.insert(name.to_string(), value.to_string());
            ctx.bind(name, value);
        }
        Ok(())
    }

    /// Find the definition a usage names, namespace first.
    ///
    /// The `{ }` form only looks at customs. The `;` form prefers templates
    /// and falls back to a custom of the same name, applied unspecialized.
    pub(super) fn resolve_usage(
        &self,
        at: NodeRef,
        usage: &Usage,
        custom_form: bool,
    ) -> Result<(NodeRef, &'p Definition), CompileError> {
        let program = self.program;
        let namespace = usage.namespace.as_deref().unwrap_or(self.namespace());
        let found = if custom_form {
            program.lookup(DefCategory::Custom, namespace, &usage.name)
        } else {
            program
                .lookup(DefCategory::Template, namespace, &usage.name)
                .or_else(|| program.lookup(DefCategory::Custom, namespace, &usage.name))
        };
        let Some((def_ref, def)) = found else {
            let what = if custom_form { "custom" } else { "template" };
            return Err(CompileError::new(
                ErrorKind::UndefinedTemplate,
                program.span(at),
                format!("undefined {} '{}'", what, usage),
            ));
        };
        if def.kind != usage.kind {
            return Err(CompileError::new(
                ErrorKind::TypeMismatch,
                program.span(at),
                format!("'{}' names a {} definition", usage, def.kind),
            )
            .with_label(program.span(def_ref), "defined here".to_string()));
        }
        Ok((def_ref, def))
    }

    fn gather(
        &self,
        def_ref: NodeRef,
        def: &'p Definition,
        depth: usize,
    ) -> Result<Properties<'p>, CompileError> {
        if depth >= self.max_depth {
            return Err(CompileError::new(
                ErrorKind::DepthLimit,
                self.program.span(def_ref),
                format!(
                    "inheritance of '{} {}' nests deeper than {} levels",
                    def.kind, def.name, self.max_depth
                ),
            ));
        }
        let program = self.program;
        let mut properties = Properties::new();

        for id in &def.body {
            let at = def_ref.with_node(*id);
            let (usage, specializations) = match program.node(at) {
                Some(Node::TemplateUsage(usage)) => (usage, None),
                Some(Node::CustomUsage(custom)) => {
                    (&custom.usage, Some(custom.specializations.as_slice()))
                }
                _ => continue,
            };
            let (parent_ref, parent) = self.resolve_inherited(at, usage, def, specializations)?;
            let mut inherited = self.gather(parent_ref, parent, depth + 1)?;
            if let Some(specs) = specializations {
                self.specialize_properties(&mut inherited, def_ref.file, specs);
            }
            merge(&mut properties, inherited);
        }

        for id in &def.body {
            if let Some(Node::StyleProperty(prop)) = program.node(def_ref.with_node(*id)) {
                match &prop.value {
                    Some(expr) => {
                        properties.insert(&prop.name, Some(expr));
                    }
                    None => {
                        properties.entry(&prop.name).or_insert(None);
                    }
                }
            }
        }
        Ok(properties)
    }

    /// Inherited definitions must be of the same kind, except that a style
    /// may pull in variables and vice versa.
    fn resolve_inherited(
        &self,
        at: NodeRef,
        usage: &'p Usage,
        child: &Definition,
        specializations: Option<&[NodeId]>,
    ) -> Result<(NodeRef, &'p Definition), CompileError> {
        if usage.kind == DefKind::Element || child.kind == DefKind::Element {
            return Err(CompileError::new(
                ErrorKind::TypeMismatch,
                self.program.span(at),
                format!("{} {} cannot inherit '{}'", child.kind, child.name, usage),
            ));
        }
        self.resolve_usage(at, usage, specializations.is_some())
    }

    fn specialize_properties(&self, properties: &mut Properties<'p>, file: u16, specs: &'p [NodeId]) {
        for id in specs {
            match self.program.node(NodeRef::new(file, *id)) {
                Some(Node::Delete(selectors)) => {
                    for selector in selectors {
                        if properties.shift_remove(selector.name.as_str()).is_none() {
                            trace!(property = %selector, "delete of absent property");
                        }
                    }
                }
                Some(Node::StyleProperty(prop)) => {
                    if let Some(expr) = &prop.value {
                        properties.insert(&prop.name, Some(expr));
                    }
                }
                _ => {}
            }
        }
    }
}

/// Fold `inherited` into `into`; a value replaces, a valueless entry only
/// fills a gap.
fn merge<'p>(into: &mut Properties<'p>, inherited: Properties<'p>) {
    for (name, expr) in inherited {
        match expr {
            Some(_) => {
                into.insert(name, expr);
            }
            None => {
                into.entry(name).or_insert(None);
            }
        }
    }
}
