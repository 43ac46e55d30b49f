//
//  engine.rs
//  Orbit
//
//  Created by hak (tharun)
//

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use std::path::PathBuf;

use super::types::*;
use crate::naming::ObjectIdentity;

/// The object graph: one node per identity, edges point from an object to
/// what it depends on.
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    /// The directed graph storing object relationships.
    pub(crate) graph: DiGraph<NodeData, EdgeData>,
    /// Index: identity -> live node.
    pub(crate) identity_index: HashMap<ObjectIdentity, NodeIndex>,
    /// Index: relative source path -> node built from it.
    pub(crate) path_index: HashMap<PathBuf, NodeIndex>,
    /// Binder sources seen by ingest, keyed by path.
    pub(crate) binders: HashMap<PathBuf, (ObjectIdentity, BinderListing)>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Node Operations ────────────────────────────────────────

    /// Node for `identity`, created as a placeholder if unknown.
    pub(crate) fn ensure_node(&mut self, identity: &ObjectIdentity) -> NodeIndex {
        if let Some(&idx) = self.identity_index.get(identity) {
            return idx;
        }
        let idx = self.graph.add_node(NodeData::placeholder(identity.clone()));
        self.identity_index.insert(identity.clone(), idx);
        idx
    }

    /// Check if a node is live (exists and not soft-deleted).
    pub(crate) fn is_live(&self, idx: NodeIndex) -> bool {
        self.graph
            .node_weight(idx)
            .is_some_and(|n| !n.removed)
    }

    pub(crate) fn node(&self, identity: &ObjectIdentity) -> Option<(NodeIndex, &NodeData)> {
        let idx = *self.identity_index.get(identity)?;
        self.graph
            .node_weight(idx)
            .filter(|n| !n.removed)
            .map(|n| (idx, n))
    }

    /// Live nodes in insertion order.
    pub(crate) fn live_nodes(&self) -> impl Iterator<Item = (NodeIndex, &NodeData)> {
        self.graph
            .node_indices()
            .filter_map(move |idx| self.graph.node_weight(idx).filter(|n| !n.removed).map(|n| (idx, n)))
    }

    // ─── Edge Operations ────────────────────────────────────────

    /// Add a dependency edge after the node's existing ones.
    /// Duplicate targets and self edges are ignored.
    pub(crate) fn add_dependency(&mut self, from: NodeIndex, to: NodeIndex, kind: EdgeKind) -> bool {
        if from == to || self.graph.find_edge(from, to).is_some() {
            return false;
        }
        let order = self
            .graph
            .edges_directed(from, Direction::Outgoing)
            .map(|e| e.weight().order + 1)
            .max()
            .unwrap_or(0);
        self.graph.add_edge(from, to, EdgeData::new(kind, order));
        true
    }

    /// Outgoing dependency targets in declaration order.
    pub(crate) fn ordered_targets(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<(usize, NodeIndex)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| self.is_live(e.target()))
            .map(|e| (e.weight().order, e.target()))
            .collect();
        edges.sort_by_key(|(order, _)| *order);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Nodes with an edge into `idx`, in insertion order.
    pub(crate) fn dependents(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut sources: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| e.source())
            .filter(|&s| self.is_live(s))
            .collect();
        sources.sort();
        sources.dedup();
        sources
    }

    /// Remove edges matching `filter`. Indices are removed highest first,
    /// since petgraph moves the last edge into a freed slot.
    pub(crate) fn remove_edges_where(&mut self, filter: impl Fn(&EdgeData) -> bool) {
        let mut doomed: Vec<EdgeIndex> = self
            .graph
            .edge_indices()
            .filter(|&e| self.graph.edge_weight(e).is_some_and(&filter))
            .collect();
        doomed.sort_unstable_by(|a, b| b.cmp(a));
        for e in doomed {
            self.graph.remove_edge(e);
        }
    }

    /// Remove every outgoing edge of `idx`. Returns the former targets.
    pub(crate) fn clear_outgoing(&mut self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut doomed: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), e.target()))
            .collect();
        doomed.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        let targets = doomed.iter().map(|(_, t)| *t).collect();
        for (e, _) in doomed {
            self.graph.remove_edge(e);
        }
        targets
    }

    /// Soft-delete placeholders among `candidates` that nothing points at anymore.
    pub(crate) fn drop_orphans(&mut self, candidates: impl IntoIterator<Item = NodeIndex>) {
        for idx in candidates {
            let orphan = self.graph.node_weight(idx).is_some_and(|n| {
                !n.removed && n.is_placeholder()
            }) && self
                .graph
                .edges_directed(idx, Direction::Incoming)
                .next()
                .is_none();
            if orphan {
                self.soft_delete(idx);
            }
        }
    }

    /// Mark a node removed and drop it from the indexes.
    pub(crate) fn soft_delete(&mut self, idx: NodeIndex) {
        self.clear_outgoing(idx);
        if let Some(node) = self.graph.node_weight_mut(idx) {
            node.removed = true;
            let identity = node.identity.clone();
            if self.identity_index.get(&identity) == Some(&idx) {
                self.identity_index.remove(&identity);
            }
        }
        self.path_index.retain(|_, v| *v != idx);
    }

    pub(crate) fn removed_count(&self) -> usize {
        self.graph.node_weights().filter(|n| n.removed).count()
    }
}
