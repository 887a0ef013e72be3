//! HTML generation.
//!
//! One walk over the entry document writes the markup and collects every
//! style rule it meets. Afterwards the collected rules are evaluated, each
//! under a fresh [`EvalContext`], into one `<head><style>` block placed ahead
//! of the markup.
//!
//! ## Architecture
//!
//! - this module: the walk, element rendering and final assembly
//! - [`style`]: template/custom style expansion with inheritance and
//!   specialization
//! - [`splice`]: element template/custom usages and their delete/insert
//!   specializations
//! - [`script`]: the [`ScriptProcessor`] collaborator
//!
//! Evaluation failures abort generation with a single diagnostic.

mod splice;
mod style;

pub mod script;

#[cfg(test)]
mod tests;

pub use script::{Passthrough, ScriptProcessor};

use chtl_ast::{
    CompileError, DefKind, Element, ErrorKind, IfChain, Node, NodeId, NodeRef, OriginKind,
    Program, GLOBAL_NAMESPACE,
};
use chtl_resolve::{EvalContext, EvalError, DEFAULT_EVAL_DEPTH};
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

/// Elements written without a closing tag when they have no content.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// A style rule waiting for the stylesheet.
#[derive(Debug)]
struct CollectedRule<'p> {
    selector: String,
    properties: &'p [NodeId],
    file: u16,
    namespace: String,
}

/// Tree-walking HTML generator over one [`Program`].
pub struct Generator<'p> {
    program: &'p Program,
    script: &'p dyn ScriptProcessor,
    max_depth: usize,
    depth: usize,
    namespaces: Vec<String>,
    body: String,
    rules: Vec<CollectedRule<'p>>,
    origin_styles: Vec<&'p str>,
    doctype: bool,
}

impl<'p> Generator<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            script: &Passthrough,
            max_depth: DEFAULT_EVAL_DEPTH,
            depth: 0,
            namespaces: vec![GLOBAL_NAMESPACE.to_string()],
            body: String::new(),
            rules: Vec::new(),
            origin_styles: Vec::new(),
            doctype: false,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_script(mut self, script: &'p dyn ScriptProcessor) -> Self {
        self.script = script;
        self
    }

    /// Generate the document. Stops at the first evaluation failure.
    pub fn generate(mut self) -> Result<String, CompileError> {
        let roots: Vec<NodeRef> = self.program.roots().collect();
        for r in &roots {
            match self.program.node(*r) {
                Some(Node::Use(target)) if target == "html5" => self.doctype = true,
                Some(Node::Use(target)) => warn!("ignoring unknown use target '{}'", target),
                _ => {}
            }
        }
        for r in roots {
            self.visit(r)?;
        }
        self.assemble()
    }

    fn assemble(self) -> Result<String, CompileError> {
        let mut out = String::new();
        if self.doctype {
            out.push_str("<!DOCTYPE html>");
        }
        if !self.rules.is_empty() || !self.origin_styles.is_empty() {
            out.push_str("<head><style>");
            for rule in &self.rules {
                self.render_rule(rule, &mut out)?;
            }
            for css in &self.origin_styles {
                out.push_str(css);
            }
            out.push_str("</style></head>");
        }
        debug!(
            rules = self.rules.len(),
            bytes = out.len() + self.body.len(),
            "generation finished"
        );
        out.push_str(&self.body);
        Ok(out)
    }

    fn render_rule(&self, rule: &CollectedRule<'p>, out: &mut String) -> Result<(), CompileError> {
        let mut ctx = self.context_in(&rule.namespace);
        let mut declarations = IndexMap::new();
        for id in rule.properties {
            if let Some(Node::StyleProperty(prop)) = self.program.node(NodeRef::new(rule.file, *id)) {
                if let Some(expr) = &prop.value {
                    let value = ctx.eval(expr).map_err(|e| e.into_diagnostic(expr.span))?;
                    declarations.insert(prop.name.clone(), value.to_string());
                    ctx.bind(prop.name.clone(), value);
                }
            }
        }
        out.push_str(&rule.selector);
        out.push('{');
        write_declarations(out, &declarations);
        out.push('}');
        Ok(())
    }

    fn visit(&mut self, r: NodeRef) -> Result<(), CompileError> {
        if self.depth >= self.max_depth {
            return Err(CompileError::new(
                ErrorKind::DepthLimit,
                self.program.span(r),
                format!("generation nesting exceeds the limit of {} levels", self.max_depth),
            ));
        }
        self.depth += 1;
        let result = self.visit_node(r);
        self.depth -= 1;
        result
    }

    fn visit_node(&mut self, r: NodeRef) -> Result<(), CompileError> {
        let program = self.program;
        let Some(node) = program.node(r) else {
            return Err(CompileError::new(
                ErrorKind::Internal,
                program.span(r),
                format!("dangling node reference {}", r),
            ));
        };
        if program.settings.debug_mode {
            debug!(node = node.kind_name(), at = %r, depth = self.depth, "generate");
        } else {
            trace!(node = node.kind_name(), at = %r, "generate");
        }

        match node {
            Node::Element(element) => self.element(r, element)?,
            Node::Text(text) => escape_text(&mut self.body, text),
            Node::Comment(text) => {
                self.body.push_str("<!-- ");
                self.body.push_str(text);
                self.body.push_str(" -->");
            }
            Node::Style(items) => self.detached_style(r, items),
            Node::Script(raw) => {
                let processed = self.script.process(raw.trim());
                self.body.push_str("<script>");
                self.body.push_str(&processed);
                self.body.push_str("</script>");
            }
            Node::Origin(origin) => match origin.kind {
                OriginKind::Html => self.body.push_str(origin.content.trim()),
                OriginKind::Style => self.origin_styles.push(origin.content.trim()),
                OriginKind::JavaScript => {
                    self.body.push_str("<script>");
                    self.body.push_str(origin.content.trim());
                    self.body.push_str("</script>");
                }
            },
            Node::TemplateUsage(usage) => self.splice(r, usage, None)?,
            Node::CustomUsage(custom) => {
                self.splice(r, &custom.usage, Some(custom.specializations.as_slice()))?
            }
            Node::If(chain) => {
                let ctx = self.context_in(self.namespace());
                if let Some(body) = self.taken_branch(&ctx, chain)? {
                    for id in body {
                        if let Some(Node::StyleProperty(prop)) = program.node(r.with_node(*id)) {
                            warn!(property = %prop.name, "conditional property outside an element");
                        }
                    }
                    self.render_branch(r, body)?;
                }
            }
            Node::Namespace(ns) => {
                self.namespaces.push(ns.name.clone());
                let result = self.visit_all(r, &ns.body);
                self.namespaces.pop();
                result?;
            }
            Node::TemplateDefinition(_)
            | Node::CustomDefinition(_)
            | Node::Import(_)
            | Node::Except(_)
            | Node::Use(_)
            | Node::StyleRule(_)
            | Node::StyleProperty(_)
            | Node::Delete(_)
            | Node::Insert(_) => {}
        }
        Ok(())
    }

    fn visit_all(&mut self, parent: NodeRef, ids: &[NodeId]) -> Result<(), CompileError> {
        for id in ids {
            self.visit(parent.with_node(*id))?;
        }
        Ok(())
    }

    fn element(&mut self, r: NodeRef, element: &'p Element) -> Result<(), CompileError> {
        let program = self.program;
        let mut attributes: IndexMap<&str, String> = IndexMap::new();
        for attr in &element.attributes {
            attributes.insert(&attr.name, attr.value.clone());
        }

        let main_selector = self.main_selector(r, element);
        let mut ctx = self.context_in(self.namespace());
        let mut inline = IndexMap::new();
        let mut classes = Vec::new();
        let mut id = None;
        let mut taken: Vec<(NodeRef, &'p [NodeId])> = Vec::new();

        for child in &element.children {
            let child = r.with_node(*child);
            match program.node(child) {
                Some(Node::Style(items)) => {
                    for item in items {
                        let item = r.with_node(*item);
                        match program.node(item) {
                            Some(Node::StyleRule(rule)) => {
                                let selector = resolve_parent_selector(
                                    &rule.selector,
                                    main_selector.as_deref(),
                                    element,
                                );
                                if let Some(name) = selector.strip_prefix('.') {
                                    classes.push(leading_name(name).to_string());
                                } else if let Some(name) = selector.strip_prefix('#') {
                                    id.get_or_insert_with(|| leading_name(name).to_string());
                                }
                                let namespace = self.namespace().to_string();
                                self.rules.push(CollectedRule {
                                    selector,
                                    properties: &rule.properties,
                                    file: r.file,
                                    namespace,
                                });
                            }
                            Some(Node::StyleProperty(prop)) => {
                                if let Some(expr) = &prop.value {
                                    let value =
                                        ctx.eval(expr).map_err(|e| e.into_diagnostic(expr.span))?;
                                    inline.insert(prop.name.clone(), value.to_string());
                                    ctx.bind(prop.name.clone(), value);
                                }
                            }
                            Some(Node::TemplateUsage(usage)) => {
                                self.apply_style_usage(&mut ctx, item, usage, None, &mut inline)?
                            }
                            Some(Node::CustomUsage(custom)) => self.apply_style_usage(
                                &mut ctx,
                                item,
                                &custom.usage,
                                Some(custom.specializations.as_slice()),
                                &mut inline,
                            )?,
                            _ => {}
                        }
                    }
                }
                Some(Node::TemplateUsage(usage)) if usage.kind != DefKind::Element => {
                    self.apply_style_usage(&mut ctx, child, usage, None, &mut inline)?
                }
                Some(Node::CustomUsage(custom)) if custom.usage.kind != DefKind::Element => self
                    .apply_style_usage(
                        &mut ctx,
                        child,
                        &custom.usage,
                        Some(custom.specializations.as_slice()),
                        &mut inline,
                    )?,
                Some(Node::If(chain)) => {
                    if let Some(body) = self.taken_branch(&ctx, chain)? {
                        for item in body {
                            if let Some(Node::StyleProperty(prop)) = program.node(r.with_node(*item))
                            {
                                if let Some(expr) = &prop.value {
                                    let value =
                                        ctx.eval(expr).map_err(|e| e.into_diagnostic(expr.span))?;
                                    inline.insert(prop.name.clone(), value.to_string());
                                    ctx.bind(prop.name.clone(), value);
                                }
                            }
                        }
                        taken.push((child, body));
                    }
                }
                _ => {}
            }
        }

        for class in classes {
            match attributes.get_mut("class") {
                Some(existing) => {
                    if !existing.split_whitespace().any(|c| c == class) {
                        if !existing.is_empty() {
                            existing.push(' ');
                        }
                        existing.push_str(&class);
                    }
                }
                None => {
                    attributes.insert("class", class);
                }
            }
        }
        if let Some(id) = id {
            attributes.entry("id").or_insert(id);
        }
        if !inline.is_empty() {
            let mut style = String::new();
            write_declarations(&mut style, &inline);
            match attributes.get_mut("style") {
                Some(existing) => {
                    let trimmed = existing.trim_end();
                    if !trimmed.is_empty() && !trimmed.ends_with(';') {
                        existing.push(';');
                    }
                    existing.push_str(&style);
                }
                None => {
                    attributes.insert("style", style);
                }
            }
        }

        self.body.push('<');
        self.body.push_str(&element.tag);
        for (name, value) in &attributes {
            self.body.push(' ');
            self.body.push_str(name);
            self.body.push_str("=\"");
            escape_attribute(&mut self.body, value);
            self.body.push('"');
        }
        self.body.push('>');

        let start = self.body.len();
        for child in &element.children {
            let child = r.with_node(*child);
            let renders = match program.node(child) {
                Some(Node::Style(_)) => false,
                Some(Node::If(_)) => {
                    let body = taken.iter().find(|(at, _)| *at == child).map(|(_, b)| *b);
                    if let Some(body) = body {
                        self.render_branch(r, body)?;
                    }
                    false
                }
                Some(Node::TemplateUsage(usage)) => usage.kind == DefKind::Element,
                Some(Node::CustomUsage(custom)) => custom.usage.kind == DefKind::Element,
                _ => true,
            };
            if renders {
                self.visit(child)?;
            }
        }

        let is_void = VOID_ELEMENTS.contains(&element.tag.as_str());
        if !(is_void && self.body.len() == start) {
            self.body.push_str("</");
            self.body.push_str(&element.tag);
            self.body.push('>');
        }
        Ok(())
    }

    /// Body of the first `if`/`else if` whose condition holds, else the
    /// `else` body. Conditions must be booleans.
    fn taken_branch(
        &self,
        ctx: &EvalContext<'p>,
        chain: &'p IfChain,
    ) -> Result<Option<&'p [NodeId]>, CompileError> {
        for branch in &chain.branches {
            let span = branch.condition.span;
            let value = ctx
                .eval(&branch.condition)
                .map_err(|e| e.into_diagnostic(span))?;
            match value.as_bool() {
                Some(true) => return Ok(Some(&branch.body)),
                Some(false) => {}
                None => {
                    let found = value.type_name();
                    return Err(EvalError::NonBooleanCondition { found }.into_diagnostic(span));
                }
            }
        }
        Ok(chain.otherwise.as_deref())
    }

    /// Content of a taken branch; its style properties were applied already.
    fn render_branch(&mut self, parent: NodeRef, body: &'p [NodeId]) -> Result<(), CompileError> {
        for id in body {
            let node = parent.with_node(*id);
            if !matches!(self.program.node(node), Some(Node::StyleProperty(_))) {
                self.visit(node)?;
            }
        }
        Ok(())
    }

    /// First class or id rule selector among the element's style blocks.
    fn main_selector(&self, r: NodeRef, element: &Element) -> Option<String> {
        element
            .children
            .iter()
            .filter_map(|id| match self.program.node(r.with_node(*id)) {
                Some(Node::Style(items)) => Some(items),
                _ => None,
            })
            .flatten()
            .find_map(|item| match self.program.node(r.with_node(*item)) {
                Some(Node::StyleRule(rule))
                    if rule.selector.starts_with('.') || rule.selector.starts_with('#') =>
                {
                    let mut chars = rule.selector.chars();
                    let sigil = chars.next()?;
                    Some(format!("{}{}", sigil, leading_name(chars.as_str())))
                }
                _ => None,
            })
    }

    /// A `style { }` outside any element contributes its rules only.
    fn detached_style(&mut self, r: NodeRef, items: &'p [NodeId]) {
        let namespace = self.namespace().to_string();
        for item in items {
            match self.program.node(r.with_node(*item)) {
                Some(Node::StyleRule(rule)) => self.rules.push(CollectedRule {
                    selector: rule.selector.clone(),
                    properties: &rule.properties,
                    file: r.file,
                    namespace: namespace.clone(),
                }),
                Some(other) => trace!(node = other.kind_name(), "skipped outside an element"),
                None => {}
            }
        }
    }

    fn namespace(&self) -> &str {
        self.namespaces
            .last()
            .map(String::as_str)
            .unwrap_or(GLOBAL_NAMESPACE)
    }

    fn context_in(&self, namespace: &str) -> EvalContext<'p> {
        EvalContext::new(self.program)
            .with_namespace(namespace)
            .with_max_depth(self.max_depth)
    }
}

/// Substitute `&` with the element's main selector, falling back to its id
/// attribute, its first class, then its tag.
fn resolve_parent_selector(selector: &str, main: Option<&str>, element: &Element) -> String {
    if !selector.starts_with('&') {
        return selector.to_string();
    }
    let attribute = |name: &str| {
        element
            .attributes
            .iter()
            .rev()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    };
    let parent = match main {
        Some(main) => main.to_string(),
        None => match (attribute("id"), attribute("class")) {
            (Some(id), _) => format!("#{}", id),
            (None, Some(class)) => match class.split_whitespace().next() {
                Some(first) => format!(".{}", first),
                None => element.tag.clone(),
            },
            (None, None) => element.tag.clone(),
        },
    };
    selector.replacen('&', &parent, 1)
}

/// Class or id name at the start of a selector: `box` in `box:hover`.
fn leading_name(selector: &str) -> &str {
    let end = selector
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(selector.len());
    &selector[..end]
}

fn write_declarations(out: &mut String, declarations: &IndexMap<String, String>) {
    for (name, value) in declarations {
        out.push_str(name);
        out.push(':');
        out.push_str(value);
        out.push(';');
    }
}

fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
