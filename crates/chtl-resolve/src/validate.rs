//! `except` constraint checking.
//!
//! The validator walks the entry document with a stack of scopes. Entering
//! an element, namespace or element definition pushes the constraints of the
//! `except` statements directly in its body; every node below is checked
//! against all active scopes, so a constraint covers the whole subtree of
//! the node that declares it. Scopes pop in tree order.

use chtl_ast::{
    CompileError, Constraint, DefCategory, DefKind, ErrorKind, Node, NodeId, NodeRef,
    OriginKind, Program, Span, Usage, GLOBAL_NAMESPACE,
};
use std::fmt;
use tracing::debug;

/// Check the entry document of `program` against its `except` constraints.
pub fn validate(program: &Program) -> Vec<CompileError> {
    Validator::new(program).run()
}

/// What a node looks like to a constraint.
#[derive(Debug, Clone, Copy)]
enum Subject<'a> {
    Element(&'a str),
    Usage {
        category: DefCategory,
        kind: DefKind,
        name: &'a str,
    },
    Definition {
        category: DefCategory,
        kind: DefKind,
        name: &'a str,
    },
    HtmlOrigin,
}

impl Subject<'_> {
    fn matches(&self, constraint: &Constraint) -> bool {
        let html = constraint.type_name.as_deref() == Some("Html");
        match *self {
            Subject::Element(tag) => {
                if html {
                    return constraint.category.is_none() && constraint.name.is_none();
                }
                constraint.category.is_none()
                    && constraint.type_name.is_none()
                    && constraint.name.as_deref() == Some(tag)
            }
            Subject::HtmlOrigin => html && constraint.name.is_none(),
            Subject::Usage {
                category,
                kind,
                name,
            }
            | Subject::Definition {
                category,
                kind,
                name,
            } => {
                if html || (constraint.category.is_none() && constraint.type_name.is_none()) {
                    return false;
                }
                constraint.category.map_or(true, |c| c == category)
                    && constraint
                        .type_name
                        .as_deref()
                        .map_or(true, |t| t == kind.name())
                    && constraint.name.as_deref().map_or(true, |n| n == name)
            }
        }
    }
}

impl fmt::Display for Subject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Element(tag) => write!(f, "element '{}'", tag),
            Subject::Usage {
                category,
                kind,
                name,
            } => write!(f, "usage of {} {} {}", category, kind, name),
            Subject::Definition {
                category,
                kind,
                name,
            } => write!(f, "definition of {} {} {}", category, kind, name),
            Subject::HtmlOrigin => write!(f, "[Origin] @Html block"),
        }
    }
}

/// One `except` item with the span of the statement that declared it.
#[derive(Debug, Clone)]
struct ScopedConstraint {
    constraint: Constraint,
    span: Span,
}

pub struct Validator<'p> {
    program: &'p Program,
    scopes: Vec<Vec<ScopedConstraint>>,
    namespaces: Vec<String>,
    diagnostics: Vec<CompileError>,
}

impl<'p> Validator<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            scopes: Vec::new(),
            namespaces: vec![GLOBAL_NAMESPACE.to_string()],
            diagnostics: Vec::new(),
        }
    }

    /// Validate the entry document and return the violations found.
    pub fn run(mut self) -> Vec<CompileError> {
        let Some(ast) = self.program.ast(0) else {
            return Vec::new();
        };
        let roots = ast.roots().to_vec();
        self.with_scope(0, &roots, |v| {
            for id in &roots {
                v.visit(NodeRef::new(0, *id));
            }
        });
        debug!(violations = self.diagnostics.len(), "validation finished");
        self.diagnostics
    }

    fn visit(&mut self, r: NodeRef) {
        let program = self.program;
        let Some(node) = program.node(r) else {
            return;
        };
        match node {
            Node::Element(element) => {
                self.check(r, Subject::Element(&element.tag));
                self.visit_body(r, &element.children);
            }
            Node::Namespace(ns) => {
                self.namespaces.push(ns.name.clone());
                self.visit_body(r, &ns.body);
                self.namespaces.pop();
            }
            Node::TemplateDefinition(def) | Node::CustomDefinition(def) => {
                let category = match node {
                    Node::TemplateDefinition(_) => DefCategory::Template,
                    _ => DefCategory::Custom,
                };
                self.check(
                    r,
                    Subject::Definition {
                        category,
                        kind: def.kind,
                        name: &def.name,
                    },
                );
                self.visit_body(r, &def.body);
            }
            Node::TemplateUsage(usage) => {
                let category = self.usage_category(usage);
                self.check(
                    r,
                    Subject::Usage {
                        category,
                        kind: usage.kind,
                        name: &usage.name,
                    },
                );
            }
            Node::CustomUsage(custom) => {
                self.check(
                    r,
                    Subject::Usage {
                        category: DefCategory::Custom,
                        kind: custom.usage.kind,
                        name: &custom.usage.name,
                    },
                );
                self.visit_children(r, &custom.specializations);
            }
            Node::Insert(insert) => self.visit_children(r, &insert.body),
            Node::If(chain) => {
                for body in chain.bodies() {
                    self.visit_children(r, body);
                }
            }
            Node::Style(items) => self.visit_children(r, items),
            Node::Origin(origin) if origin.kind == OriginKind::Html => {
                self.check(r, Subject::HtmlOrigin);
            }
            Node::Origin(_)
            | Node::Text(_)
            | Node::Comment(_)
            | Node::StyleRule(_)
            | Node::StyleProperty(_)
            | Node::Script(_)
            | Node::Delete(_)
            | Node::Import(_)
            | Node::Except(_)
            | Node::Use(_) => {}
        }
    }

    /// Visit a body that may declare its own `except` statements.
    fn visit_body(&mut self, parent: NodeRef, body: &[NodeId]) {
        self.with_scope(parent.file, body, |v| v.visit_children(parent, body));
    }

    fn visit_children(&mut self, parent: NodeRef, children: &[NodeId]) {
        for id in children {
            self.visit(parent.with_node(*id));
        }
    }

    fn with_scope(&mut self, file: u16, body: &[NodeId], f: impl FnOnce(&mut Self)) {
        let mut scope = Vec::new();
        for id in body {
            let r = NodeRef::new(file, *id);
            if let Some(Node::Except(constraints)) = self.program.node(r) {
                let span = self.program.span(r);
                scope.extend(constraints.iter().cloned().map(|constraint| ScopedConstraint {
                    constraint,
                    span,
                }));
            }
        }
        self.scopes.push(scope);
        f(self);
        self.scopes.pop();
    }

    /// `[Custom]` when a `;`-form usage names something only the custom
    /// registry knows.
    fn usage_category(&self, usage: &Usage) -> DefCategory {
        let namespace = usage
            .namespace
            .as_deref()
            .or(self.namespaces.last().map(String::as_str))
            .unwrap_or(GLOBAL_NAMESPACE);
        let in_templates = self.program.templates.resolve(namespace, &usage.name).is_some();
        let in_customs = self.program.customs.resolve(namespace, &usage.name).is_some();
        if !in_templates && in_customs {
            DefCategory::Custom
        } else {
            DefCategory::Template
        }
    }

    fn check(&mut self, r: NodeRef, subject: Subject<'_>) {
        let hit = self
            .scopes
            .iter()
            .flatten()
            .find(|scoped| subject.matches(&scoped.constraint));
        if let Some(scoped) = hit {
            let diag = CompileError::new(
                ErrorKind::ConstraintViolation,
                self.program.span(r),
                format!("{} is not allowed here", subject),
            )
            .with_label(
                scoped.span,
                format!("excluded by 'except {}'", scoped.constraint),
            );
            self.diagnostics.push(diag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chtl_parser::parse_str;

    fn violations(source: &str) -> Vec<CompileError> {
        let program = parse_str(source);
        assert!(program.diagnostics.is_empty(), "{:?}", program.diagnostics);
        validate(&program)
    }

    #[test]
    fn test_nested_span_is_reported_once() {
        let diags = violations("div { except span; span {} p {} }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, ErrorKind::ConstraintViolation);
        assert_eq!(diags[0].message, "element 'span' is not allowed here");
        assert_eq!(diags[0].labels[0].message, "excluded by 'except span'");
    }

    #[test]
    fn test_constraint_covers_conditional_branches() {
        let found = violations(
            "div { except span; if { condition: true; p {} } else { span {} } }",
        );
        assert_eq!(found.len(), 1);
        assert!(found[0].message.contains("'span'"));
    }

    #[test]
    fn test_constraint_covers_descendants() {
        let diags = violations("div { except span; section { p { span {} } } }");
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_constraint_does_not_leak_to_siblings() {
        let diags = violations("div { except span; } section { span {} }");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_top_level_constraint() {
        let diags = violations("except a; div { a {} }");
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_html_type_constraint() {
        let diags = violations(
            "div { except @Html; p {} [Origin] @Html { <b>x</b> } text { \"ok\" } }",
        );
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[1].message, "[Origin] @Html block is not allowed here");
    }

    #[test]
    fn test_precise_usage_constraint() {
        let diags = violations(
            "[Custom] @Element Box { div {} }\n\
             [Custom] @Element Other { p {} }\n\
             body { except [Custom] @Element Box; @Element Box; @Element Other; }",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "usage of [Custom] @Element Box is not allowed here");
    }

    #[test]
    fn test_type_level_usage_constraint() {
        let diags = violations(
            "[Template] @Style S { color: red; }\n\
             [Custom] @Style C { color: blue; }\n\
             div { except [Template]; style { @Style S; @Style C; } }",
        );
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("[Template] @Style S"));
    }

    #[test]
    fn test_namespace_forbids_template_definitions() {
        let diags = violations(
            "[Namespace] ui { except [Template]; [Template] @Style A { a: 1; } [Custom] @Style B { b: 2; } }",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "definition of [Template] @Style A is not allowed here");
    }

    #[test]
    fn test_name_only_constraint_ignores_usages() {
        let diags = violations("[Template] @Element span { p {} } div { except span; @Element span; }");
        assert!(diags.is_empty());
    }
}
