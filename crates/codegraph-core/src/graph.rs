//! The transient, in-memory graph assembled by the graph builder (C4)
//! before C5/C8 shape and persist it. Nodes are keyed by their
//! content-addressed `NodeId`; petgraph only carries the traversal
//! structure (adjacency + edge payloads), never the storage identity.

use crate::model::*;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

pub struct Graph {
    inner: StableDiGraph<NodeId, GraphEdge>,
    index_of: HashMap<NodeId, NodeIndex>,
    nodes: HashMap<NodeId, GraphNode>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            inner: StableDiGraph::new(),
            index_of: HashMap::new(),
            nodes: HashMap::new(),
        }
    }

    /// Inserts or replaces a node, keyed by its content-addressed ID.
    pub fn add_node(&mut self, node: GraphNode) -> NodeId {
        let id = node.id.clone();
        if let Some(&idx) = self.index_of.get(&id) {
            *self.inner.node_weight_mut(idx).unwrap() = id.clone();
        } else {
            let idx = self.inner.add_node(id.clone());
            self.index_of.insert(id.clone(), idx);
        }
        self.nodes.insert(id.clone(), node);
        id
    }

    /// Adds an edge; both endpoints must already be present in this graph.
    /// Returns `false` (a no-op) if either endpoint is missing, honoring
    /// invariant 3 — relationships are only materialized between nodes the
    /// batch (or store) actually knows about.
    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        let (Some(&src), Some(&dst)) = (
            self.index_of.get(&edge.source),
            self.index_of.get(&edge.target),
        ) else {
            return false;
        };
        self.inner.add_edge(src, dst, edge);
        true
    }

    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index_of.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.inner.edge_references().map(|e| e.weight())
    }

    pub fn edges_from<'a>(&'a self, source: &NodeId) -> Box<dyn Iterator<Item = &'a GraphEdge> + 'a> {
        match self.index_of.get(source) {
            Some(&idx) => Box::new(
                self.inner
                    .edges_directed(idx, Direction::Outgoing)
                    .map(|e| e.weight()),
            ),
            None => Box::new(std::iter::empty()),
        }
    }

    pub fn edges_to<'a>(&'a self, target: &NodeId) -> Box<dyn Iterator<Item = &'a GraphEdge> + 'a> {
        match self.index_of.get(target) {
            Some(&idx) => Box::new(
                self.inner
                    .edges_directed(idx, Direction::Incoming)
                    .map(|e| e.weight()),
            ),
            None => Box::new(std::iter::empty()),
        }
    }

    pub fn has_edge_between(&self, source: &NodeId, target: &NodeId, kind: EdgeKind) -> bool {
        self.edges_from(source)
            .any(|e| &e.target == target && e.kind == kind)
    }

    /// First node with the given name (scans node-kind-agnostically).
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|n| n.name == name)
            .map(|n| n.id.clone())
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &NodeId> {
        self.nodes.values().filter(move |n| n.kind == kind).map(|n| &n.id)
    }

    /// Removes a node and every edge touching it (petgraph drops incident
    /// edges automatically on node removal).
    pub fn remove_node(&mut self, id: &NodeId) -> Option<GraphNode> {
        if let Some(idx) = self.index_of.remove(id) {
            self.inner.remove_node(idx);
        }
        self.nodes.remove(id)
    }

    /// Nodes reachable by walking `Contains` edges upward (i.e. the chain
    /// of containing entities — ultimately the containing File).
    pub fn ancestors(&self, node: &NodeId) -> HashSet<NodeId> {
        let mut ancestors = HashSet::new();
        let mut to_visit = vec![node.clone()];

        while let Some(current) = to_visit.pop() {
            for edge in self.edges_to(&current) {
                if edge.kind == EdgeKind::Contains && !ancestors.contains(&edge.source) {
                    ancestors.insert(edge.source.clone());
                    to_visit.push(edge.source.clone());
                }
            }
        }

        ancestors
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
