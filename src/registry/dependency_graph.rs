//! Collection-level dependency graph.
//!
//! An edge `source → dependent` means records of `dependent` copy data out of
//! records of `source`. Each edge carries the join bindings: relation paths on
//! the dependent collection that hold references to a source record, together
//! with the destination each one feeds. The graph is append-only and is
//! populated while collections are declared; cascades only read it.
//!
//! Cycles are allowed. A cascade over a cyclic graph terminates because each
//! propagation session visits an instance pair at most once, so cycle
//! detection here is diagnostic only.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// One relation path on a dependent collection that references a source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinBinding {
    /// Relation path on the dependent collection.
    pub from: String,
    /// Denormalized destination fed by that relation.
    pub to: String,
}

impl JoinBinding {
    /// Create a binding.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is currently being visited (in the DFS stack).
    Gray,
    /// Node has been fully visited.
    Black,
}

/// Dependency graph between collections.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph, one node per collection name.
    graph: DiGraph<String, ()>,
    /// Map from collection names to their graph indices.
    node_map: HashMap<String, NodeIndex>,
    /// Join bindings keyed by `(source, dependent)`.
    bindings: HashMap<(String, String), Vec<JoinBinding>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the graph if it doesn't already exist.
    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(name) {
            index
        } else {
            let index = self.graph.add_node(name.to_string());
            self.node_map.insert(name.to_string(), index);
            index
        }
    }

    /// Record that `dependent` copies data from `source` through `binding`.
    ///
    /// The edge is created the first time the pair is seen; later bindings for
    /// the same pair accumulate under it. A binding already present is not
    /// added twice.
    pub fn add_binding(&mut self, source: &str, dependent: &str, binding: JoinBinding) {
        let source_idx = self.ensure_node(source);
        let dependent_idx = self.ensure_node(dependent);

        // Check if edge already exists to avoid duplicates
        if !self.graph.contains_edge(source_idx, dependent_idx) {
            self.graph.add_edge(source_idx, dependent_idx, ());
        }

        let bindings =
            self.bindings.entry((source.to_string(), dependent.to_string())).or_default();
        if !bindings.contains(&binding) {
            bindings.push(binding);
        }
    }

    /// Collections that depend on `source`, in the order their edges were added.
    pub fn dependents(&self, source: &str) -> Vec<&str> {
        let Some(&idx) = self.node_map.get(source) else {
            return Vec::new();
        };

        let mut edges: Vec<_> = self.graph.edges_directed(idx, Direction::Outgoing).collect();
        edges.sort_by_key(|edge| edge.id().index());
        edges.into_iter().map(|edge| self.graph[edge.target()].as_str()).collect()
    }

    /// Join bindings of the `source → dependent` edge.
    pub fn bindings(&self, source: &str, dependent: &str) -> &[JoinBinding] {
        self.bindings
            .get(&(source.to_string(), dependent.to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// True when `dependent` copies data from `source`.
    pub fn has_edge(&self, source: &str, dependent: &str) -> bool {
        match (self.node_map.get(source), self.node_map.get(dependent)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// Number of collections known to the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of `source → dependent` edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Find a cycle, if any, as the chain of collection names that closes it.
    ///
    /// The first and last entries of the returned chain are the same.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|node| (node, Color::White)).collect();
        let mut path: Vec<NodeIndex> = Vec::new();

        // DFS from each white node
        for node in self.graph.node_indices() {
            if matches!(colors.get(&node), Some(Color::White)) {
                if let Some(cycle) = self.dfs_visit(node, &mut colors, &mut path) {
                    return Some(cycle.into_iter().map(|idx| self.graph[idx].clone()).collect());
                }
            }
        }

        None
    }

    /// DFS visit for cycle detection.
    ///
    /// Returns `Some(cycle_path)` if a cycle is detected, None otherwise.
    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<NodeIndex>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        for neighbor in self.graph.neighbors(node) {
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    let start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(neighbor);
                    return Some(cycle);
                }
                Some(Color::White) => {
                    if let Some(cycle) = self.dfs_visit(neighbor, colors, path) {
                        return Some(cycle);
                    }
                }
                _ => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }
}
