//! The dependency graph arena.
//!
//! Nodes are stored in a flat vector and addressed by small indices; edge
//! lists hold indices. This avoids shared ownership between nodes entirely
//! and makes cycle detection a standard DFS over integers.

use rustc_hash::FxHashMap;

use hewg_package::{PackageIdentifier, PackageType};

/// Whether a dependency's symbols propagate to the consumer's final link
/// (internal) or were already resolved by the dependency's own prior link
/// (external).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Internal,
    External,
}

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The current package; always the first node inserted.
    pub const ROOT: NodeId = NodeId(0);
}

#[derive(Debug, Clone)]
pub struct PackageNode {
    pub ident: PackageIdentifier,
    pub package_type: PackageType,
    pub edges: Vec<(EdgeKind, NodeId)>,
}

#[derive(Debug, Clone, Default)]
pub struct PackageGraph {
    nodes: Vec<PackageNode>,
    index: FxHashMap<PackageIdentifier, NodeId>,
}

impl PackageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, or return the existing one for the same identifier.
    pub fn add_node(&mut self, ident: PackageIdentifier, package_type: PackageType) -> NodeId {
        if let Some(&id) = self.index.get(&ident) {
            return id;
        }

        let id = NodeId(self.nodes.len());
        self.index.insert(ident.clone(), id);
        self.nodes.push(PackageNode {
            ident,
            package_type,
            edges: Vec::new(),
        });
        id
    }

    pub fn add_edge(&mut self, from: NodeId, kind: EdgeKind, to: NodeId) {
        let edges = &mut self.nodes[from.0].edges;
        if !edges.contains(&(kind, to)) {
            edges.push((kind, to));
        }
    }

    pub fn lookup(&self, ident: &PackageIdentifier) -> Option<NodeId> {
        self.index.get(ident).copied()
    }

    pub fn node(&self, id: NodeId) -> &PackageNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion (DFS discovery) order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &PackageNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hewg_package::TargetTriplet;
    use hewg_semver::SemVer;
    use pretty_assertions::assert_eq;

    fn ident(name: &str) -> PackageIdentifier {
        PackageIdentifier::new("crow", name, SemVer::new(1, 0, 0), TargetTriplet::host()).unwrap()
    }

    #[test]
    fn nodes_are_deduplicated_by_identifier() {
        let mut graph = PackageGraph::new();
        let a = graph.add_node(ident("app"), PackageType::Executable);
        let b = graph.add_node(ident("scl"), PackageType::StaticLibrary);
        let b_again = graph.add_node(ident("scl"), PackageType::StaticLibrary);

        assert_eq!(a, NodeId::ROOT);
        assert_eq!(b, b_again);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn duplicate_edges_collapse() {
        let mut graph = PackageGraph::new();
        let a = graph.add_node(ident("app"), PackageType::Executable);
        let b = graph.add_node(ident("scl"), PackageType::StaticLibrary);

        graph.add_edge(a, EdgeKind::Internal, b);
        graph.add_edge(a, EdgeKind::Internal, b);
        graph.add_edge(a, EdgeKind::External, b);

        assert_eq!(graph.node(a).edges.len(), 2);
    }

    #[test]
    fn lookup_finds_inserted_nodes() {
        let mut graph = PackageGraph::new();
        let id = graph.add_node(ident("scl"), PackageType::StaticLibrary);
        assert_eq!(graph.lookup(&ident("scl")), Some(id));
        assert_eq!(graph.lookup(&ident("other")), None);
    }
}
