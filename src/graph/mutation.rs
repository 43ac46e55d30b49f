//
//  mutation.rs
//  Orbit
//
//  Created by hak (tharun)
//

use petgraph::graph::NodeIndex;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::engine::ObjectGraph;
use super::types::*;
use crate::naming::Resolution;

impl ObjectGraph {
    /// Upsert the node built from `path` and replace its whole outgoing edge set.
    ///
    /// Placeholders are created for new targets; placeholders left without
    /// any inbound edge are dropped.
    pub fn apply_scan(
        &mut self,
        path: &Path,
        resolution: &Resolution,
        extraction: &Extraction,
    ) -> NodeIndex {
        let identity = &resolution.identity;
        let idx = self.ensure_node(identity);

        // Last writer owns the identity; the earlier path no longer maps to it.
        let previous = self.graph[idx].source.info().map(|i| i.path.clone());
        if let Some(old) = previous.filter(|old| old != path) {
            debug!(
                object = %identity,
                old = %old.display(),
                new = %path.display(),
                "identity claimed by another source"
            );
            // a binder keeps its registration and is reported unmatched
            self.path_index.remove(&old);
        }

        let former = self.clear_outgoing(idx);

        if let Some(node) = self.graph.node_weight_mut(idx) {
            node.source = NodeSource::Resolved(SourceInfo {
                path: path.to_path_buf(),
                kind: resolution.kind,
                ambiguous: resolution.is_ambiguous(),
                includes: extraction.includes.clone(),
                imports: extraction.imports.clone(),
                exports: extraction.exports.clone(),
                no_main: extraction.no_main,
                binder: extraction.binder.clone(),
            });
            node.exports = None;
        }
        self.path_index.insert(path.to_path_buf(), idx);

        for reference in &extraction.references {
            let target = self.ensure_node(&reference.target);
            self.add_dependency(idx, target, reference.kind);
        }

        self.drop_orphans(former);

        match &extraction.binder {
            Some(listing) => {
                self.binders
                    .insert(path.to_path_buf(), (identity.clone(), listing.clone()));
            }
            None => {
                self.binders.remove(path);
            }
        }

        debug!(
            object = %identity,
            path = %path.display(),
            references = extraction.references.len(),
            "source applied"
        );
        idx
    }

    /// Drop the node built from `path`. Returns the nodes that depended on it.
    ///
    /// A node that is still referenced reverts to a placeholder instead of
    /// being deleted.
    pub fn remove_source(&mut self, path: &Path) -> Vec<NodeIndex> {
        self.binders.remove(path);
        let Some(idx) = self.path_index.remove(path) else {
            return Vec::new();
        };

        let dependents = self.dependents(idx);
        let former = self.clear_outgoing(idx);

        if dependents.is_empty() {
            self.soft_delete(idx);
        } else if let Some(node) = self.graph.node_weight_mut(idx) {
            node.source = NodeSource::Unresolved;
            node.exports = None;
        }
        self.drop_orphans(former);

        debug!(
            path = %path.display(),
            impacted = dependents.len(),
            "source removed from graph"
        );
        dependents
    }

    /// Rebuild the graph without soft-deleted nodes to reclaim memory.
    /// Live nodes keep their relative order.
    pub fn compact(&mut self) {
        info!(tombstones = self.removed_count(), "compacting object graph");
        let mut new_graph = ObjectGraph::new();
        let mut old_to_new: HashMap<NodeIndex, NodeIndex> = HashMap::new();

        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            if node.removed {
                continue;
            }
            let new_idx = new_graph.graph.add_node(node.clone());
            new_graph
                .identity_index
                .insert(node.identity.clone(), new_idx);
            if let Some(info) = node.source.info() {
                if self.path_index.get(&info.path) == Some(&idx) {
                    new_graph.path_index.insert(info.path.clone(), new_idx);
                }
            }
            old_to_new.insert(idx, new_idx);
        }

        for edge in self.graph.edge_indices() {
            if let Some((src, tgt)) = self.graph.edge_endpoints(edge) {
                if let (Some(&new_src), Some(&new_tgt)) =
                    (old_to_new.get(&src), old_to_new.get(&tgt))
                {
                    new_graph
                        .graph
                        .add_edge(new_src, new_tgt, self.graph[edge].clone());
                }
            }
        }

        new_graph.binders = std::mem::take(&mut self.binders);
        *self = new_graph;

        let stats = self.stats();
        info!(
            nodes = stats.total_nodes,
            edges = stats.total_edges,
            "compact complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::{resolve_path, ObjectIdentity, ObjectType};
    use std::path::PathBuf;

    fn reference(name: &str, t: ObjectType, kind: EdgeKind) -> Reference {
        Reference {
            target: ObjectIdentity::new(name, t),
            kind,
            line: 1,
        }
    }

    fn scan(graph: &mut ObjectGraph, path: &str, refs: Vec<Reference>) -> NodeIndex {
        let resolution = resolve_path(Path::new(path)).unwrap();
        let extraction = Extraction {
            references: refs,
            ..Default::default()
        };
        graph.apply_scan(Path::new(path), &resolution, &extraction)
    }

    fn names(graph: &ObjectGraph, idx: NodeIndex) -> Vec<String> {
        graph
            .ordered_targets(idx)
            .into_iter()
            .map(|t| graph.graph[t].identity.to_string())
            .collect()
    }

    #[test]
    fn test_scan_creates_placeholders() {
        let mut graph = ObjectGraph::new();
        let a = scan(
            &mut graph,
            "a.pgm.rpgle",
            vec![
                reference("B", ObjectType::Include, EdgeKind::Include),
                reference("C", ObjectType::Program, EdgeKind::Call),
            ],
        );
        assert_eq!(names(&graph, a), vec!["B.INCLUDE", "C.PGM"]);
        let (_, c) = graph.node(&ObjectIdentity::new("C", ObjectType::Program)).unwrap();
        assert!(c.is_placeholder());
    }

    #[test]
    fn test_rescan_replaces_edges_and_drops_orphans() {
        let mut graph = ObjectGraph::new();
        scan(
            &mut graph,
            "a.pgm.rpgle",
            vec![reference("OLD", ObjectType::File, EdgeKind::File)],
        );
        let a = scan(
            &mut graph,
            "a.pgm.rpgle",
            vec![reference("NEW", ObjectType::File, EdgeKind::File)],
        );
        assert_eq!(names(&graph, a), vec!["NEW.FILE"]);
        assert!(graph.node(&ObjectIdentity::new("OLD", ObjectType::File)).is_none());
    }

    #[test]
    fn test_placeholder_fill_keeps_inbound_edges() {
        let mut graph = ObjectGraph::new();
        let a = scan(
            &mut graph,
            "a.pgm.rpgle",
            vec![reference("C", ObjectType::Program, EdgeKind::Call)],
        );
        let c = scan(&mut graph, "c.pgm.clle", vec![]);
        assert_eq!(graph.ordered_targets(a), vec![c]);
        assert!(!graph.graph[c].is_placeholder());
    }

    #[test]
    fn test_last_writer_wins() {
        let mut graph = ObjectGraph::new();
        let first = scan(&mut graph, "src1/emps.pf", vec![]);
        let second = scan(&mut graph, "src2/emps.pf", vec![]);
        assert_eq!(first, second);
        assert!(!graph.path_index.contains_key(&PathBuf::from("src1/emps.pf")));
        assert_eq!(graph.path_index.get(&PathBuf::from("src2/emps.pf")), Some(&first));
    }

    #[test]
    fn test_remove_reverts_referenced_node() {
        let mut graph = ObjectGraph::new();
        let a = scan(
            &mut graph,
            "a.pgm.rpgle",
            vec![reference("B", ObjectType::Include, EdgeKind::Include)],
        );
        let b = scan(&mut graph, "b.rpgleinc", vec![]);
        assert_eq!(graph.remove_source(Path::new("b.rpgleinc")), vec![a]);
        assert!(graph.graph[b].is_placeholder());
        assert!(graph.is_live(b));

        assert!(graph.remove_source(Path::new("b.rpgleinc")).is_empty());
    }

    #[test]
    fn test_remove_unreferenced_node() {
        let mut graph = ObjectGraph::new();
        scan(
            &mut graph,
            "a.pgm.rpgle",
            vec![reference("C", ObjectType::Program, EdgeKind::Call)],
        );
        assert!(graph.remove_source(Path::new("a.pgm.rpgle")).is_empty());
        assert_eq!(graph.live_nodes().count(), 0, "placeholder C went with it");
    }

    #[test]
    fn test_compact_preserves_order_and_edges() {
        let mut graph = ObjectGraph::new();
        scan(&mut graph, "gone.pgm.rpgle", vec![]);
        scan(
            &mut graph,
            "a.pgm.rpgle",
            vec![reference("C", ObjectType::Program, EdgeKind::Call)],
        );
        graph.remove_source(Path::new("gone.pgm.rpgle"));
        assert_eq!(graph.removed_count(), 1);

        graph.compact();
        assert_eq!(graph.removed_count(), 0);
        let order: Vec<String> = graph.live_nodes().map(|(_, n)| n.identity.to_string()).collect();
        assert_eq!(order, vec!["A.PGM", "C.PGM"]);
        let a = graph.path_index[&PathBuf::from("a.pgm.rpgle")];
        assert_eq!(names(&graph, a), vec!["C.PGM"]);
    }
}
