//! Statement-level node kinds.
//!
//! `Node` is a closed sum type: every consumer (generator, validator,
//! registry builder) matches it exhaustively, so adding a kind forces each
//! pass to decide what to do with it. Children are arena indices into the
//! same file's [`Ast`](super::Ast).

use super::arena::NodeId;
use super::expr::Expr;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One statement-level node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Element(Element),
    /// `text { "..." }` or the `text: "..."` attribute shorthand
    Text(String),
    /// `# ...` generator comment, re-emitted as an HTML comment
    Comment(String),
    /// `style { ... }`: properties, rules and usages in source order
    Style(Vec<NodeId>),
    StyleRule(StyleRule),
    StyleProperty(StyleProperty),
    /// `script { ... }` raw content
    Script(String),
    Origin(Origin),
    TemplateDefinition(Definition),
    CustomDefinition(Definition),
    /// `@Type Name;`
    TemplateUsage(Usage),
    /// `@Type Name { specializations }`
    CustomUsage(CustomUsage),
    /// `delete a, b[1];` inside a custom usage
    Delete(Vec<Selector>),
    /// `insert <position> { ... }` inside an element custom usage
    Insert(Insert),
    Import(Import),
    Namespace(Namespace),
    Except(Vec<Constraint>),
    /// `use html5;`
    Use(String),
    /// `if { condition: expr; ... } else if { ... } else { ... }`
    If(IfChain),
}

impl Node {
    /// Short label for logs and diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Element(_) => "element",
            Node::Text(_) => "text",
            Node::Comment(_) => "comment",
            Node::Style(_) => "style block",
            Node::StyleRule(_) => "style rule",
            Node::StyleProperty(_) => "style property",
            Node::Script(_) => "script",
            Node::Origin(_) => "origin block",
            Node::TemplateDefinition(_) => "template definition",
            Node::CustomDefinition(_) => "custom definition",
            Node::TemplateUsage(_) => "template usage",
            Node::CustomUsage(_) => "custom usage",
            Node::Delete(_) => "delete specialization",
            Node::Insert(_) => "insert specialization",
            Node::Import(_) => "import",
            Node::Namespace(_) => "namespace",
            Node::Except(_) => "except constraint",
            Node::Use(_) => "use directive",
            Node::If(_) => "conditional block",
        }
    }
}

/// `tag { attr: value; children... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    /// Source order; duplicates allowed, the last value wins when rendered
    pub attributes: Vec<Attribute>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// `.box { ... }`, `#main { ... }`, `&:hover { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRule {
    pub selector: String,
    /// `StyleProperty` nodes
    pub properties: Vec<NodeId>,
}

/// `name: expr;` or a valueless `name;` inside a custom style definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProperty {
    pub name: String,
    pub value: Option<Expr>,
}

/// Type tag shared by definitions and usages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefKind {
    Style,
    Var,
    Element,
}

impl DefKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Style" => Some(DefKind::Style),
            "Var" => Some(DefKind::Var),
            "Element" => Some(DefKind::Element),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DefKind::Style => "Style",
            DefKind::Var => "Var",
            DefKind::Element => "Element",
        }
    }
}

impl fmt::Display for DefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name())
    }
}

/// Which registry a definition or usage belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefCategory {
    Template,
    Custom,
}

impl fmt::Display for DefCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefCategory::Template => write!(f, "[Template]"),
            DefCategory::Custom => write!(f, "[Custom]"),
        }
    }
}

/// Body of a `[Template]` or `[Custom]` definition.
///
/// Style and Var bodies hold `StyleProperty` nodes plus `TemplateUsage`
/// nodes naming inherited definitions; Element bodies hold arbitrary
/// statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub kind: DefKind,
    pub name: String,
    pub body: Vec<NodeId>,
}

/// `@Type Name [from namespace]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub kind: DefKind,
    pub name: String,
    /// Explicit namespace; `None` resolves against the active one
    pub namespace: Option<String>,
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)?;
        if let Some(ns) = &self.namespace {
            write!(f, " from {}", ns)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomUsage {
    pub usage: Usage,
    /// `Delete`, `Insert` and overriding `StyleProperty` nodes in source order
    pub specializations: Vec<NodeId>,
}

/// `name` or `name[index]`; a property name for style customs, a tag for
/// element customs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    pub name: String,
    pub index: Option<usize>,
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(idx) => write!(f, "{}[{}]", self.name, idx),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insert {
    pub position: InsertPosition,
    pub body: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertPosition {
    After(Selector),
    Before(Selector),
    Replace(Selector),
    AtTop,
    AtBottom,
}

/// An `if` block with its `else if` continuations and optional `else`.
///
/// Only the first branch whose condition is true contributes to the
/// enclosing element: its `StyleProperty` nodes join the inline style, its
/// other nodes render as children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfChain {
    pub branches: Vec<IfBranch>,
    pub otherwise: Option<Vec<NodeId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfBranch {
    pub condition: Expr,
    pub body: Vec<NodeId>,
}

impl IfChain {
    /// Every body in the chain, taken or not.
    pub fn bodies(&self) -> impl Iterator<Item = &[NodeId]> {
        self.branches
            .iter()
            .map(|b| b.body.as_slice())
            .chain(self.otherwise.as_deref())
    }
}

/// `[Origin] @Type [name] { raw }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub kind: OriginKind,
    pub name: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginKind {
    /// Emitted in place
    Html,
    /// Appended to the aggregated stylesheet
    Style,
    /// Wrapped in a `<script>` element
    JavaScript,
}

impl OriginKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Html" => Some(OriginKind::Html),
            "Style" => Some(OriginKind::Style),
            "JavaScript" => Some(OriginKind::JavaScript),
            _ => None,
        }
    }
}

/// `[Import] ... from "path" [as Alias];`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// `[Template]`/`[Custom]` scope; `None` imports both registries
    pub category: Option<DefCategory>,
    /// Type filter; `None` for `@Chtl` and untyped scoped imports
    pub kind: Option<DefKind>,
    /// Precise import of a single definition
    pub name: Option<String>,
    pub path: String,
    pub alias: Option<String>,
}

impl Import {
    pub fn is_precise(&self) -> bool {
        self.name.is_some()
    }

    /// Whether a definition of `category`/`kind` passes this import's filters.
    pub fn accepts(&self, category: DefCategory, kind: DefKind) -> bool {
        self.category.map_or(true, |c| c == category) && self.kind.map_or(true, |k| k == kind)
    }
}

/// `[Namespace] name { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,
    pub body: Vec<NodeId>,
}

/// One item of an `except` list.
///
/// Precise constraints carry a name (`span`, `[Custom] @Element Box`);
/// type-level constraints do not (`@Html`, `[Template]`, `[Custom] @Element`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    pub category: Option<DefCategory>,
    /// Name after `@`: `Html`, `Element`, `Style`, `Var`
    pub type_name: Option<String>,
    pub name: Option<String>,
}

impl Constraint {
    pub fn is_precise(&self) -> bool {
        self.name.is_some()
    }

    /// Path segments, e.g. `["[Custom]", "@Element", "Box"]`.
    pub fn path(&self) -> Vec<String> {
        let mut path = Vec::with_capacity(3);
        if let Some(category) = self.category {
            path.push(category.to_string());
        }
        if let Some(ty) = &self.type_name {
            path.push(format!("@{}", ty));
        }
        if let Some(name) = &self.name {
            path.push(name.clone());
        }
        path
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_paths() {
        let precise = Constraint {
            category: Some(DefCategory::Custom),
            type_name: Some("Element".into()),
            name: Some("Box".into()),
        };
        assert_eq!(precise.path(), vec!["[Custom]", "@Element", "Box"]);
        assert!(precise.is_precise());

        let html = Constraint {
            category: None,
            type_name: Some("Html".into()),
            name: None,
        };
        assert_eq!(html.to_string(), "@Html");
        assert!(!html.is_precise());
    }

    #[test]
    fn test_import_filters() {
        let import = Import {
            category: Some(DefCategory::Template),
            kind: Some(DefKind::Style),
            name: None,
            path: "theme.chtl".into(),
            alias: None,
        };
        assert!(import.accepts(DefCategory::Template, DefKind::Style));
        assert!(!import.accepts(DefCategory::Custom, DefKind::Style));
        assert!(!import.accepts(DefCategory::Template, DefKind::Var));
    }

    #[test]
    fn test_usage_display() {
        let usage = Usage {
            kind: DefKind::Element,
            name: "Card".into(),
            namespace: Some("ui".into()),
        };
        assert_eq!(usage.to_string(), "@Element Card from ui");
    }
}
