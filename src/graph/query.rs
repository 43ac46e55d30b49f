//
//  query.rs
//  Orbit
//
//  Created by hak (tharun)
//

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::HashSet;
use std::path::Path;

use super::engine::ObjectGraph;
use super::types::*;
use crate::naming::ObjectIdentity;

impl ObjectGraph {
    /// Snapshot of one node.
    pub(crate) fn object_at(&self, idx: NodeIndex) -> IleObject {
        let node = &self.graph[idx];
        let source = match &node.source {
            NodeSource::Unresolved => ObjectSource::Unresolved,
            NodeSource::Resolved(info) => ObjectSource::Resolved {
                path: info.path.clone(),
                kind: info.kind,
            },
        };
        IleObject {
            identity: node.identity.clone(),
            source,
            dependencies: self.dependency_identities(idx),
            exports: node.exports.clone(),
        }
    }

    fn dependency_identities(&self, idx: NodeIndex) -> Vec<ObjectIdentity> {
        self.ordered_targets(idx)
            .into_iter()
            .map(|t| self.graph[t].identity.clone())
            .collect()
    }

    /// Every live node, in insertion order.
    pub fn objects(&self) -> Vec<IleObject> {
        self.live_nodes().map(|(idx, _)| self.object_at(idx)).collect()
    }

    /// Every live node as a dependency record, in insertion order.
    pub fn dependency_records(&self) -> Vec<DependencyRecord> {
        self.live_nodes()
            .map(|(idx, node)| DependencyRecord {
                object: node.identity.clone(),
                dependencies: self.dependency_identities(idx),
            })
            .collect()
    }

    pub fn dependencies_of(&self, identity: &ObjectIdentity) -> Option<DependencyRecord> {
        let (idx, node) = self.node(identity)?;
        Some(DependencyRecord {
            object: node.identity.clone(),
            dependencies: self.dependency_identities(idx),
        })
    }

    /// Nodes whose dependency list contains `identity`.
    pub fn dependents_of(&self, identity: &ObjectIdentity) -> Vec<IleObject> {
        match self.node(identity) {
            Some((idx, _)) => self
                .dependents(idx)
                .into_iter()
                .map(|d| self.object_at(d))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn object(&self, identity: &ObjectIdentity) -> Option<IleObject> {
        self.node(identity).map(|(idx, _)| self.object_at(idx))
    }

    /// Node currently built from `path`.
    pub fn object_for_path(&self, path: &Path) -> Option<IleObject> {
        let idx = *self.path_index.get(path)?;
        self.is_live(idx).then(|| self.object_at(idx))
    }

    /// Service programs with a resolved export list, in insertion order.
    pub fn exports(&self) -> Vec<ExportRecord> {
        self.live_nodes()
            .filter_map(|(_, node)| {
                node.exports.as_ref().map(|symbols| ExportRecord {
                    object: node.identity.clone(),
                    symbols: symbols.clone(),
                })
            })
            .collect()
    }

    /// Resolved sources in insertion order.
    pub(crate) fn sources(&self) -> impl Iterator<Item = (&ObjectIdentity, &SourceInfo)> {
        self.live_nodes()
            .filter_map(|(_, node)| node.source.info().map(|info| (&node.identity, info)))
    }

    /// Names some live source calls as a program.
    pub(crate) fn called_program_names(&self) -> HashSet<String> {
        self.graph
            .edge_references()
            .filter(|e| e.weight().kind == EdgeKind::Call && self.is_live(e.source()))
            .map(|e| self.graph[e.target()].identity.name.clone())
            .collect()
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            total_edges: self.graph.edge_count(),
            ..Default::default()
        };
        for node in self.graph.node_weights() {
            if node.removed {
                stats.removed_count += 1;
                continue;
            }
            stats.total_nodes += 1;
            if node.is_placeholder() {
                stats.placeholder_count += 1;
            } else {
                stats.source_count += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::{resolve_path, ObjectType};

    fn scan(graph: &mut ObjectGraph, path: &str, refs: &[(&str, ObjectType)]) {
        let resolution = resolve_path(Path::new(path)).unwrap();
        let extraction = Extraction {
            references: refs
                .iter()
                .map(|(n, t)| Reference {
                    target: ObjectIdentity::new(n, *t),
                    kind: EdgeKind::File,
                    line: 1,
                })
                .collect(),
            ..Default::default()
        };
        graph.apply_scan(Path::new(path), &resolution, &extraction);
    }

    #[test]
    fn test_records_in_insertion_order() {
        let mut graph = ObjectGraph::new();
        scan(&mut graph, "a.pgm.rpgle", &[("EMPS", ObjectType::File)]);
        scan(&mut graph, "emps.pf", &[]);
        scan(&mut graph, "b.pgm.rpgle", &[("EMPS", ObjectType::File)]);

        let records = graph.dependency_records();
        let order: Vec<String> = records.iter().map(|r| r.object.to_string()).collect();
        assert_eq!(order, vec!["A.PGM", "EMPS.FILE", "B.PGM"]);

        let emps = ObjectIdentity::new("EMPS", ObjectType::File);
        let dependents: Vec<String> = graph
            .dependents_of(&emps)
            .iter()
            .map(|o| o.identity.to_string())
            .collect();
        assert_eq!(dependents, vec!["A.PGM", "B.PGM"]);
        assert_eq!(
            graph.object(&emps).unwrap().path(),
            Some(&std::path::PathBuf::from("emps.pf"))
        );
    }

    #[test]
    fn test_dependencies_of_unknown() {
        let graph = ObjectGraph::new();
        assert!(graph
            .dependencies_of(&ObjectIdentity::new("NOPE", ObjectType::Program))
            .is_none());
        assert!(graph.object_for_path(Path::new("nope.pgm.rpgle")).is_none());
    }

    #[test]
    fn test_stats() {
        let mut graph = ObjectGraph::new();
        scan(&mut graph, "a.pgm.rpgle", &[("EMPS", ObjectType::File)]);
        let stats = graph.stats();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.source_count, 1);
        assert_eq!(stats.placeholder_count, 1);
        assert_eq!(stats.total_edges, 1);
        assert!(graph.exports().is_empty());
    }
}
