//! Element template and custom usages.
//!
//! An `@Element` usage is replaced by the definition's body, visited as if
//! it had been written at the usage site: lookups inside it use the usage
//! site's namespace. A custom usage first deletes and inserts body nodes.
//! `tag[n]` counts elements with that tag among the body's top-level nodes,
//! starting at `INDEX_INITIAL_COUNT`; a bare `tag` in `delete` removes every
//! such element and in `insert` targets the first one.

use super::Generator;
use chtl_ast::{
    CompileError, DefKind, ErrorKind, InsertPosition, Node, NodeId, NodeRef, Selector, Usage,
};
use tracing::warn;

impl<'p> Generator<'p> {
    pub(super) fn splice(
        &mut self,
        at: NodeRef,
        usage: &'p Usage,
        specializations: Option<&'p [NodeId]>,
    ) -> Result<(), CompileError> {
        if usage.kind != DefKind::Element {
            return Err(CompileError::new(
                ErrorKind::TypeMismatch,
                self.program.span(at),
                format!("'{}' can only be applied inside an element", usage),
            ));
        }
        let (def_ref, def) = self.resolve_usage(at, usage, specializations.is_some())?;
        let mut nodes: Vec<NodeRef> = def.body.iter().map(|id| def_ref.with_node(*id)).collect();
        if let Some(specs) = specializations {
            self.specialize_children(&mut nodes, at, usage, specs);
        }
        for node in nodes {
            self.visit(node)?;
        }
        Ok(())
    }

    fn specialize_children(
        &self,
        nodes: &mut Vec<NodeRef>,
        at: NodeRef,
        usage: &Usage,
        specs: &'p [NodeId],
    ) {
        for id in specs {
            let spec = at.with_node(*id);
            match self.program.node(spec) {
                Some(Node::Delete(selectors)) => {
                    for selector in selectors {
                        let matches = self.matching(nodes, selector);
                        if matches.is_empty() {
                            warn!(usage = %usage, target = %selector, "delete matched nothing");
                        }
                        for index in matches.into_iter().rev() {
                            nodes.remove(index);
                        }
                    }
                }
                Some(Node::Insert(insert)) => {
                    let body = insert.body.iter().map(|id| at.with_node(*id));
                    let index = match &insert.position {
                        InsertPosition::AtTop => 0,
                        InsertPosition::AtBottom => nodes.len(),
                        InsertPosition::Before(selector)
                        | InsertPosition::After(selector)
                        | InsertPosition::Replace(selector) => {
                            let Some(&target) = self.matching(nodes, selector).first() else {
                                warn!(usage = %usage, target = %selector, "insert target not found");
                                continue;
                            };
                            match &insert.position {
                                InsertPosition::After(_) => target + 1,
                                InsertPosition::Replace(_) => {
                                    nodes.remove(target);
                                    target
                                }
                                _ => target,
                            }
                        }
                    };
                    for (offset, node) in body.enumerate() {
                        nodes.insert(index + offset, node);
                    }
                }
                _ => {}
            }
        }
    }

    /// Positions in `nodes` of the elements `selector` picks.
    fn matching(&self, nodes: &[NodeRef], selector: &Selector) -> Vec<usize> {
        let base = self.program.settings.index_initial_count;
        let mut tagged = nodes.iter().enumerate().filter(|(_, r)| {
            matches!(self.program.node(**r), Some(Node::Element(el)) if el.tag == selector.name)
        });
        match selector.index {
            None => tagged.map(|(i, _)| i).collect(),
            Some(n) if n >= base => tagged.nth(n - base).map(|(i, _)| i).into_iter().collect(),
            Some(_) => Vec::new(),
        }
    }
}
