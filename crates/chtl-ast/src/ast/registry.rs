//! Namespace-keyed definition registries.
//!
//! A [`Registry`] maps namespace → definition name → [`NodeRef`]. Entries are
//! plain indices into the program's per-file arenas, so merging the tables of
//! imported files never invalidates anything.
//!
//! Lookup is namespace-first with a global fallback: `resolve("ui", "Card")`
//! returns `ui::Card` when it exists, else the global `Card`.

use super::arena::NodeRef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Namespace that holds top-level definitions.
pub const GLOBAL_NAMESPACE: &str = "_global";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    namespaces: IndexMap<String, IndexMap<String, NodeRef>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` in `namespace`, returning the entry it replaced.
    pub fn insert(&mut self, namespace: &str, name: &str, def: NodeRef) -> Option<NodeRef> {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), def)
    }

    /// Exact lookup without fallback.
    pub fn get(&self, namespace: &str, name: &str) -> Option<NodeRef> {
        self.namespaces.get(namespace)?.get(name).copied()
    }

    /// Namespace-first lookup falling back to the global namespace.
    pub fn resolve(&self, namespace: &str, name: &str) -> Option<NodeRef> {
        self.get(namespace, name)
            .or_else(|| self.get(GLOBAL_NAMESPACE, name))
    }

    /// First entry named `name` in any namespace, in registration order.
    pub fn find_any(&self, name: &str) -> Option<NodeRef> {
        self.namespaces.values().find_map(|defs| defs.get(name).copied())
    }

    /// Copy every entry of `other` into `self`; `other` wins on conflicts.
    pub fn merge_from(&mut self, other: &Registry) {
        for (namespace, name, def) in other.iter() {
            self.insert(namespace, name, def);
        }
    }

    /// All entries as `(namespace, name, node)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, NodeRef)> {
        self.namespaces.iter().flat_map(|(ns, defs)| {
            defs.iter()
                .map(move |(name, def)| (ns.as_str(), name.as_str(), *def))
        })
    }

    pub fn len(&self) -> usize {
        self.namespaces.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeId;

    fn r(file: u16, node: u32) -> NodeRef {
        NodeRef::new(file, NodeId(node))
    }

    #[test]
    fn test_namespace_first_then_global() {
        let mut reg = Registry::new();
        reg.insert(GLOBAL_NAMESPACE, "X", r(0, 1));
        reg.insert("N", "X", r(0, 2));

        assert_eq!(reg.resolve("N", "X"), Some(r(0, 2)));
        assert_eq!(reg.resolve("other", "X"), Some(r(0, 1)));
        assert_eq!(reg.resolve(GLOBAL_NAMESPACE, "X"), Some(r(0, 1)));
        assert_eq!(reg.resolve("N", "Y"), None);
    }

    #[test]
    fn test_later_insert_overwrites() {
        let mut reg = Registry::new();
        assert_eq!(reg.insert("N", "X", r(0, 1)), None);
        assert_eq!(reg.insert("N", "X", r(1, 0)), Some(r(0, 1)));
        assert_eq!(reg.get("N", "X"), Some(r(1, 0)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_merge_from_keeps_namespaces() {
        let mut a = Registry::new();
        a.insert(GLOBAL_NAMESPACE, "A", r(0, 0));
        let mut b = Registry::new();
        b.insert("lib", "B", r(1, 3));
        b.insert(GLOBAL_NAMESPACE, "A", r(1, 4));

        a.merge_from(&b);
        assert_eq!(a.get("lib", "B"), Some(r(1, 3)));
        assert_eq!(a.get(GLOBAL_NAMESPACE, "A"), Some(r(1, 4)));
        assert_eq!(a.find_any("B"), Some(r(1, 3)));
        assert_eq!(a.len(), 2);
    }
}
