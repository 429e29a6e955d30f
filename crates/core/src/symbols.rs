//! Symbol hierarchy construction
//!
//! Rebuilds the nesting of code symbols from the flat entries the external
//! tagger emits. Each entry carries at most a dotted scope string; the tree
//! resolves that scope to the deepest already-known ancestor, attaches the
//! symbol with duplicate suppression, and keeps a lookup from qualified
//! scope paths to nodes so later, partially qualified entries can resolve.
//!
//! Nodes live in a per-file arena indexed by [`SymbolId`]; children are
//! owned index vectors and parents are non-owning back-references, so no
//! ownership cycles exist.

use std::collections::HashMap;

/// Kinds that can own a scope and therefore act as parents.
const SCOPE_KINDS: &[&str] = &["class", "struct", "interface", "namespace", "module", "c"];

/// Stable handle to a node within one [`SymbolTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

/// A code symbol extracted from one tag entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Symbol name, possibly qualified (e.g. `Outer.inner`)
    pub name: String,
    /// Raw kind tag from the tagger
    pub kind: String,
    /// Display description (signature if available, else the tag pattern)
    pub description: String,
    /// Source line (1-indexed; 0 when the tagger omitted it)
    pub line: usize,
    /// Dotted scope string locating the symbol, if any
    pub scope: Option<String>,
    /// Type signature, if the tagger provided one
    pub signature: Option<String>,
    /// Raw type reference (`kind:SuperType`), if any
    pub type_ref: Option<String>,
    /// Declared supertype names extracted from the type reference
    pub inherits_from: Vec<String>,
}

impl Symbol {
    /// Base name with any qualifying prefix stripped.
    pub fn base_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
struct Node {
    symbol: Symbol,
    parent: Option<SymbolId>,
    children: Vec<SymbolId>,
}

/// Per-file symbol hierarchy.
#[derive(Debug, Default)]
pub struct SymbolTree {
    nodes: Vec<Node>,
    /// Root-level symbols keyed by name, in insertion order. A later root
    /// under the same name replaces the earlier one in place.
    roots: Vec<(String, SymbolId)>,
    /// Qualified scope path to the node owning that scope.
    scope_map: HashMap<String, SymbolId>,
}

impl SymbolTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of symbols added, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Add a symbol to the tree, maintaining parent/child relationships.
    ///
    /// Never fails: a scope that resolves to nothing (malformed, cyclic, or
    /// simply unknown) degrades to root-level placement.
    pub fn add_symbol(&mut self, symbol: Symbol, scope: Option<&str>) -> SymbolId {
        let scope = scope.filter(|s| !s.is_empty());
        let id = SymbolId(self.nodes.len());
        self.nodes.push(Node {
            symbol,
            parent: None,
            children: Vec::new(),
        });

        match scope.and_then(|s| self.resolve_parent(s)) {
            Some(parent) => self.attach_child(parent, id),
            None => self.insert_root(id),
        }
        self.register_scope(id, scope);
        id
    }

    /// Walk the cumulative prefixes of a dotted scope (`a`, `a.b`, `a.b.c`,
    /// ...); the last prefix that resolves wins, so the deepest known
    /// ancestor becomes the parent.
    fn resolve_parent(&self, scope: &str) -> Option<SymbolId> {
        let mut parent = None;
        let mut prefix = String::new();
        for part in scope.split('.') {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(part);
            if let Some(&id) = self.scope_map.get(prefix.as_str()) {
                parent = Some(id);
            }
        }
        parent
    }

    /// Append `child` under `parent` unless an existing sibling matches on
    /// base name, kind, and description or signature. The first occurrence
    /// wins; a duplicate is discarded silently.
    fn attach_child(&mut self, parent: SymbolId, child: SymbolId) {
        let incoming = &self.nodes[child.0].symbol;
        let duplicate = self.nodes[parent.0].children.iter().any(|&sibling| {
            let existing = &self.nodes[sibling.0].symbol;
            existing.base_name() == incoming.base_name()
                && existing.kind == incoming.kind
                && (existing.description == incoming.description
                    || existing.signature == incoming.signature)
        });
        if duplicate {
            return;
        }
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Insert at the root level, keyed by the symbol's own name. A second
    /// root under the same name replaces the first, keeping its position.
    fn insert_root(&mut self, id: SymbolId) {
        let name = self.nodes[id.0].symbol.name.clone();
        match self.roots.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = id,
            None => self.roots.push((name, id)),
        }
    }

    /// Register scope-bearing kinds under their fully qualified name and,
    /// if still free, their bare name, so later partially qualified scope
    /// strings can resolve to this node.
    fn register_scope(&mut self, id: SymbolId, scope: Option<&str>) {
        let symbol = &self.nodes[id.0].symbol;
        if !SCOPE_KINDS.contains(&symbol.kind.as_str()) {
            return;
        }
        let name = symbol.name.clone();
        let full_name = match scope {
            Some(scope) => format!("{scope}.{name}"),
            None => name.clone(),
        };
        self.scope_map.insert(full_name, id);
        self.scope_map.entry(name).or_insert(id);
    }

    /// Look up a symbol by qualified name: root names first, then the
    /// scope-owner map.
    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.roots
            .iter()
            .find(|(root, _)| root == name)
            .map(|&(_, id)| id)
            .or_else(|| self.scope_map.get(name).copied())
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.nodes[id.0].symbol
    }

    pub fn parent(&self, id: SymbolId) -> Option<SymbolId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: SymbolId) -> &[SymbolId] {
        &self.nodes[id.0].children
    }

    /// Root-level nodes in insertion order.
    pub fn roots(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.roots.iter().map(|&(_, id)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(name: &str, kind: &str) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind: kind.to_string(),
            description: format!("def {name}"),
            line: 1,
            scope: None,
            signature: None,
            type_ref: None,
            inherits_from: Vec::new(),
        }
    }

    #[test]
    fn test_root_placement_without_scope() {
        let mut tree = SymbolTree::new();
        let id = tree.add_symbol(symbol("main", "function"), None);
        assert_eq!(tree.get("main"), Some(id));
        assert_eq!(tree.roots().count(), 1);
    }

    #[test]
    fn test_scope_resolution_attaches_to_parent() {
        let mut tree = SymbolTree::new();
        let class = tree.add_symbol(symbol("Widget", "class"), None);
        let method = tree.add_symbol(symbol("draw", "function"), Some("Widget"));

        assert_eq!(tree.parent(method), Some(class));
        assert_eq!(tree.children(class), &[method]);
        assert_eq!(tree.roots().count(), 1);
    }

    #[test]
    fn test_deepest_known_ancestor_wins() {
        let mut tree = SymbolTree::new();
        let outer = tree.add_symbol(symbol("A", "class"), None);
        let inner = tree.add_symbol(symbol("B", "class"), Some("A"));
        let method = tree.add_symbol(symbol("run", "function"), Some("A.B"));

        assert_eq!(tree.parent(method), Some(inner));
        assert_eq!(tree.parent(inner), Some(outer));
    }

    #[test]
    fn test_partial_scope_attaches_to_nearest_prefix() {
        // Only "A" is known; an entry scoped "A.B" still lands under A
        // rather than at the root.
        let mut tree = SymbolTree::new();
        let outer = tree.add_symbol(symbol("A", "class"), None);
        let method = tree.add_symbol(symbol("run", "function"), Some("A.B"));

        assert_eq!(tree.parent(method), Some(outer));
        assert_eq!(tree.roots().count(), 1);
    }

    #[test]
    fn test_unresolvable_scope_degrades_to_root() {
        let mut tree = SymbolTree::new();
        tree.add_symbol(symbol("orphan", "function"), Some("No.Such.Scope"));
        assert!(tree.get("orphan").is_some());
        assert_eq!(tree.roots().count(), 1);
    }

    #[test]
    fn test_sibling_duplicates_keep_first_occurrence() {
        let mut tree = SymbolTree::new();
        let class = tree.add_symbol(symbol("Widget", "class"), None);
        let first = tree.add_symbol(symbol("draw", "function"), Some("Widget"));
        tree.add_symbol(symbol("draw", "function"), Some("Widget"));

        assert_eq!(tree.children(class), &[first]);
    }

    #[test]
    fn test_qualified_duplicate_matches_on_base_name() {
        let mut tree = SymbolTree::new();
        let class = tree.add_symbol(symbol("Widget", "class"), None);
        tree.add_symbol(symbol("draw", "function"), Some("Widget"));
        // Same base name and kind, same (absent) signature: suppressed.
        let mut qualified = symbol("Widget.draw", "function");
        qualified.description = "something else".to_string();
        tree.add_symbol(qualified, Some("Widget"));

        assert_eq!(tree.children(class).len(), 1);
    }

    #[test]
    fn test_differing_signatures_are_not_duplicates() {
        let mut tree = SymbolTree::new();
        let class = tree.add_symbol(symbol("Widget", "class"), None);
        let mut a = symbol("draw", "function");
        a.signature = Some("(x)".to_string());
        let mut b = symbol("draw", "function");
        b.description = "def draw(x, y)".to_string();
        b.signature = Some("(x, y)".to_string());
        tree.add_symbol(a, Some("Widget"));
        tree.add_symbol(b, Some("Widget"));

        assert_eq!(tree.children(class).len(), 2);
    }

    #[test]
    fn test_root_collision_is_last_write_wins() {
        let mut tree = SymbolTree::new();
        let first = tree.add_symbol(symbol("config", "variable"), None);
        let second = tree.add_symbol(symbol("config", "variable"), None);

        assert_ne!(first, second);
        assert_eq!(tree.get("config"), Some(second));
        assert_eq!(tree.roots().count(), 1);
    }

    #[test]
    fn test_bare_name_registration_resolves_partial_scopes() {
        let mut tree = SymbolTree::new();
        // Nested class registered under both "Outer.Inner" and "Inner".
        tree.add_symbol(symbol("Outer", "class"), None);
        let inner = tree.add_symbol(symbol("Inner", "class"), Some("Outer"));
        let method = tree.add_symbol(symbol("run", "function"), Some("Inner"));

        assert_eq!(tree.parent(method), Some(inner));
    }

    #[test]
    fn test_non_scope_kinds_do_not_own_scopes() {
        let mut tree = SymbolTree::new();
        tree.add_symbol(symbol("helper", "function"), None);
        let entry = tree.add_symbol(symbol("x", "variable"), Some("helper"));

        // Functions are not scope-bearing, so the entry lands at the root.
        assert!(tree.parent(entry).is_none());
        assert_eq!(tree.roots().count(), 2);
    }
}
