//! Graph type definitions.
//!
//! - `ReferenceGraph`: directed graph of block-to-block references
//! - `NodeId`: `kind:type_label:name` identifier of a block node

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// Identifier of a node (`kind:type_label:name`).
pub type NodeId = String;

/// Default cap on the length of a followed reference chain.
pub const DEFAULT_MAX_TRAVERSAL_DEPTH: usize = 256;

/// Upper bound on node expansions per depth query. Dense cyclic graphs
/// would otherwise make the longest-chain search exponential.
const MAX_EXPANSIONS: usize = 200_000;

/// Directed graph of references between the blocks of one scope.
///
/// Node `i` corresponds to the `i`-th block passed to the builder. An edge
/// `A -> B` means block A references block B. Self-references are never
/// stored and parallel edges are collapsed.
///
/// ```text
/// ReferenceGraph
/// ├── inner: DiGraph<NodeId, ()>           // nodes in block order
/// ├── node_index: HashMap<NodeId, NodeIndex>  // first node per id
/// └── max_traversal_depth: usize
/// ```
#[derive(Debug, Clone)]
pub struct ReferenceGraph {
    inner: DiGraph<NodeId, ()>,
    node_index: HashMap<NodeId, NodeIndex>,
    max_traversal_depth: usize,
}

impl Default for ReferenceGraph {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRAVERSAL_DEPTH)
    }
}

impl ReferenceGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new(max_traversal_depth: usize) -> Self {
        Self {
            inner: DiGraph::new(),
            node_index: HashMap::new(),
            max_traversal_depth: max_traversal_depth.max(1),
        }
    }

    /// Add a node for a block. Blocks sharing an id get separate nodes;
    /// lookups by id return the first.
    pub fn add_node(&mut self, id: NodeId) -> NodeIndex {
        let idx = self.inner.add_node(id.clone());
        self.node_index.entry(id).or_insert(idx);
        idx
    }

    /// Add an edge. Returns false for self-loops and existing edges.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) -> bool {
        if from == to || self.inner.find_edge(from, to).is_some() {
            return false;
        }
        self.inner.add_edge(from, to, ());
        true
    }

    /// Look up a node by id.
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.node_index.get(id).copied()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Ids of the nodes a node references.
    #[cfg(test)]
    pub(crate) fn get_dependencies(&self, idx: NodeIndex) -> Vec<&NodeId> {
        self.inner
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| &self.inner[n])
            .collect()
    }

    /// Number of distinct blocks a node references.
    #[must_use]
    pub fn coupling(&self, idx: NodeIndex) -> usize {
        self.inner.neighbors_directed(idx, Direction::Outgoing).count()
    }

    /// Coupling of every node, in index order.
    #[must_use]
    pub fn all_couplings(&self) -> Vec<usize> {
        self.inner.node_indices().map(|idx| self.coupling(idx)).collect()
    }

    /// Length (in edges) of the longest acyclic reference chain starting at
    /// `idx`. Edges back into the current chain are not followed, so cycles
    /// terminate; chains longer than the traversal cap are cut there.
    #[must_use]
    pub fn graph_depth(&self, idx: NodeIndex) -> usize {
        let mut memo = HashMap::new();
        self.depth_with_memo(idx, &mut memo)
    }

    /// Depth of every node, in index order. Shares memoized results of
    /// acyclic regions across nodes.
    #[must_use]
    pub fn all_depths(&self) -> Vec<usize> {
        let mut memo = HashMap::new();
        self.inner
            .node_indices()
            .map(|idx| self.depth_with_memo(idx, &mut memo))
            .collect()
    }

    fn depth_with_memo(&self, idx: NodeIndex, memo: &mut HashMap<NodeIndex, usize>) -> usize {
        let mut search = ChainSearch {
            graph: &self.inner,
            limit: self.max_traversal_depth,
            on_path: HashSet::new(),
            memo,
            budget: MAX_EXPANSIONS,
            truncated: false,
        };
        let (depth, _) = search.longest(idx, 0);
        if search.truncated {
            tracing::debug!(
                node = %self.inner[idx],
                limit = self.max_traversal_depth,
                "Reference chain search truncated"
            );
        }
        depth
    }
}

struct ChainSearch<'g, 'm> {
    graph: &'g DiGraph<NodeId, ()>,
    limit: usize,
    /// Nodes on the current chain
    on_path: HashSet<NodeIndex>,
    /// Depths of nodes whose reachable set contains no cycle
    memo: &'m mut HashMap<NodeIndex, usize>,
    budget: usize,
    truncated: bool,
}

impl ChainSearch<'_, '_> {
    /// Returns the depth and whether the search from `node` met a back
    /// edge (or was cut short); only clean results are memoized.
    fn longest(&mut self, node: NodeIndex, level: usize) -> (usize, bool) {
        if let Some(&depth) = self.memo.get(&node) {
            return (depth, false);
        }
        if level >= self.limit || self.budget == 0 {
            self.truncated = true;
            return (0, true);
        }
        self.budget -= 1;

        self.on_path.insert(node);
        let mut best = 0;
        let mut tainted = false;
        let neighbors: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        for next in neighbors {
            if self.on_path.contains(&next) {
                tainted = true;
                continue;
            }
            let (depth, next_tainted) = self.longest(next, level + 1);
            best = best.max(depth + 1);
            tainted |= next_tainted;
        }
        self.on_path.remove(&node);

        if !tainted {
            self.memo.insert(node, best);
        }
        (best, tainted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(nodes: usize, edges: &[(usize, usize)]) -> (ReferenceGraph, Vec<NodeIndex>) {
        let mut graph = ReferenceGraph::default();
        let idx: Vec<_> = (0..nodes)
            .map(|i| graph.add_node(format!("resource:t_{i}:n")))
            .collect();
        for (a, b) in edges {
            graph.add_edge(idx[*a], idx[*b]);
        }
        (graph, idx)
    }

    #[test]
    fn test_chain_depth() {
        let (graph, idx) = graph_with(4, &[(0, 1), (1, 2), (2, 3)]);
        assert_eq!(graph.graph_depth(idx[0]), 3);
        assert_eq!(graph.graph_depth(idx[2]), 1);
        assert_eq!(graph.graph_depth(idx[3]), 0);
        assert_eq!(graph.all_depths(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_diamond_takes_longest_branch() {
        let (graph, idx) = graph_with(5, &[(0, 1), (0, 2), (2, 3), (3, 4), (1, 4)]);
        assert_eq!(graph.graph_depth(idx[0]), 3);
        assert_eq!(graph.coupling(idx[0]), 2);
        assert_eq!(graph.all_couplings(), vec![2, 1, 1, 1, 0]);
    }

    #[test]
    fn test_two_node_cycle_terminates() {
        let (graph, idx) = graph_with(2, &[(0, 1), (1, 0)]);
        assert_eq!(graph.graph_depth(idx[0]), 1);
        assert_eq!(graph.graph_depth(idx[1]), 1);
        assert_eq!(graph.all_depths(), vec![1, 1]);
    }

    #[test]
    fn test_three_node_cycle_terminates() {
        let (graph, _) = graph_with(3, &[(0, 1), (1, 2), (2, 0)]);
        assert_eq!(graph.all_depths(), vec![2, 2, 2]);
    }

    #[test]
    fn test_cycle_with_tail() {
        // 0 -> 1 -> 2 -> 1, 2 -> 3
        let (graph, _) = graph_with(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]);
        assert_eq!(graph.all_depths(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_self_loops_and_duplicates_are_ignored() {
        let mut graph = ReferenceGraph::default();
        let a = graph.add_node("resource:a_b:x".to_string());
        let b = graph.add_node("resource:a_b:y".to_string());
        assert!(!graph.add_edge(a, a));
        assert!(graph.add_edge(a, b));
        assert!(!graph.add_edge(a, b));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.coupling(a), 1);
        assert_eq!(graph.graph_depth(a), 1);
    }

    #[test]
    fn test_traversal_cap() {
        let edges: Vec<_> = (0..20).map(|i| (i, i + 1)).collect();
        let mut graph = ReferenceGraph::new(5);
        let idx: Vec<_> = (0..21)
            .map(|i| graph.add_node(format!("resource:t_{i}:n")))
            .collect();
        for (a, b) in edges {
            graph.add_edge(idx[a], idx[b]);
        }
        assert_eq!(graph.graph_depth(idx[0]), 5);
    }

    #[test]
    fn test_lookup_by_id() {
        let (graph, idx) = graph_with(2, &[(0, 1)]);
        assert_eq!(graph.index_of("resource:t_1:n"), Some(idx[1]));
        assert_eq!(graph.get_dependencies(idx[0]), vec!["resource:t_1:n"]);
        assert_eq!(graph.node_count(), 2);
    }
}
