//
//  impact.rs
//  Orbit
//
//  Created by hak (tharun)
//

use std::fmt;
use std::path::{Path, PathBuf};

use super::engine::ObjectGraph;
use crate::naming::ObjectIdentity;

#[derive(Debug, Clone)]
struct ImpactNode {
    identity: ObjectIdentity,
    source: Option<PathBuf>,
    /// Positions of the nodes depending on this one, in insertion order.
    dependents: Vec<usize>,
}

/// "Who depends on this object", transitively.
///
/// Built from a snapshot so it can be walked and printed after the graph
/// lock is released. A node is skipped only when it already appears on the
/// current branch, so a shared dependent shows up once under every path
/// that reaches it.
#[derive(Debug, Clone)]
pub struct ImpactTree {
    nodes: Vec<ImpactNode>,
    root: usize,
}

/// One printed line of an impact tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImpactLine<'a> {
    pub depth: usize,
    pub identity: &'a ObjectIdentity,
    pub source: Option<&'a Path>,
}

impl fmt::Display for ImpactLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            f.write_str("\t")?;
        }
        match self.source {
            Some(path) => write!(f, "{} ({})", self.identity, path.display()),
            None => write!(f, "{} (no source)", self.identity),
        }
    }
}

impl ImpactTree {
    pub fn root(&self) -> &ObjectIdentity {
        &self.nodes[self.root].identity
    }

    /// Depth-first walk, root first.
    pub fn walk(&self) -> ImpactWalk<'_> {
        ImpactWalk {
            tree: self,
            stack: vec![(self.root, 0)],
            branch: Vec::new(),
        }
    }

    /// Objects affected by a change to the root, root excluded, each listed once.
    pub fn affected(&self) -> Vec<&ObjectIdentity> {
        let mut seen: Vec<&ObjectIdentity> = Vec::new();
        for line in self.walk().skip(1) {
            if !seen.contains(&line.identity) {
                seen.push(line.identity);
            }
        }
        seen
    }
}

impl fmt::Display for ImpactTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.walk() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Iterator over an [`ImpactTree`]. Uses an explicit work list and a
/// per-branch ancestor vector, so depth is bounded only by memory.
pub struct ImpactWalk<'a> {
    tree: &'a ImpactTree,
    stack: Vec<(usize, usize)>,
    branch: Vec<usize>,
}

impl<'a> Iterator for ImpactWalk<'a> {
    type Item = ImpactLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (pos, depth) = self.stack.pop()?;
        self.branch.truncate(depth);
        self.branch.push(pos);

        let node = &self.tree.nodes[pos];
        for &child in node.dependents.iter().rev() {
            if !self.branch.contains(&child) {
                self.stack.push((child, depth + 1));
            }
        }

        Some(ImpactLine {
            depth,
            identity: &node.identity,
            source: node.source.as_deref(),
        })
    }
}

impl ObjectGraph {
    /// Reverse-dependency tree rooted at `identity`. An unknown identity
    /// yields a single source-less line.
    pub fn impact(&self, identity: &ObjectIdentity) -> ImpactTree {
        let mut positions = std::collections::HashMap::new();
        let mut nodes = Vec::new();
        for (idx, node) in self.live_nodes() {
            positions.insert(idx, nodes.len());
            nodes.push(ImpactNode {
                identity: node.identity.clone(),
                source: node.source.info().map(|i| i.path.clone()),
                dependents: Vec::new(),
            });
        }
        for (&idx, &pos) in &positions {
            nodes[pos].dependents = self
                .dependents(idx)
                .into_iter()
                .filter_map(|d| positions.get(&d).copied())
                .collect();
            nodes[pos].dependents.sort_unstable();
        }

        let root = match self.node(identity).and_then(|(idx, _)| positions.get(&idx)) {
            Some(&pos) => pos,
            None => {
                nodes.push(ImpactNode {
                    identity: identity.clone(),
                    source: None,
                    dependents: Vec::new(),
                });
                nodes.len() - 1
            }
        };

        ImpactTree { nodes, root }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::{EdgeKind, Extraction, Reference};
    use crate::naming::{resolve_path, ObjectType};

    fn scan(graph: &mut ObjectGraph, path: &str, refs: &[(&str, ObjectType)]) {
        let resolution = resolve_path(Path::new(path)).unwrap();
        let extraction = Extraction {
            references: refs
                .iter()
                .map(|(n, t)| Reference {
                    target: ObjectIdentity::new(n, *t),
                    kind: EdgeKind::Call,
                    line: 1,
                })
                .collect(),
            ..Default::default()
        };
        graph.apply_scan(Path::new(path), &resolution, &extraction);
    }

    fn rendered(graph: &ObjectGraph, name: &str, t: ObjectType) -> String {
        graph.impact(&ObjectIdentity::new(name, t)).to_string()
    }

    #[test]
    fn test_cycle_terminates() {
        let mut graph = ObjectGraph::new();
        scan(&mut graph, "a.pgm.clle", &[("B", ObjectType::Program)]);
        scan(&mut graph, "b.pgm.clle", &[("A", ObjectType::Program)]);

        let out = rendered(&graph, "A", ObjectType::Program);
        assert_eq!(out, "A.PGM (a.pgm.clle)\n\tB.PGM (b.pgm.clle)\n");
    }

    #[test]
    fn test_diamond_printed_per_path() {
        // D is used by B and C, both used by A.
        let mut graph = ObjectGraph::new();
        scan(&mut graph, "d.pf", &[]);
        scan(&mut graph, "b.pgm.rpgle", &[("D", ObjectType::File)]);
        scan(&mut graph, "c.pgm.rpgle", &[("D", ObjectType::File)]);
        scan(
            &mut graph,
            "a.pgm.rpgle",
            &[("B", ObjectType::Program), ("C", ObjectType::Program)],
        );

        let tree = graph.impact(&ObjectIdentity::new("D", ObjectType::File));
        let lines: Vec<(usize, String)> = tree
            .walk()
            .map(|l| (l.depth, l.identity.to_string()))
            .collect();
        assert_eq!(
            lines,
            vec![
                (0, "D.FILE".to_string()),
                (1, "B.PGM".to_string()),
                (2, "A.PGM".to_string()),
                (1, "C.PGM".to_string()),
                (2, "A.PGM".to_string()),
            ]
        );
        let affected: Vec<String> = tree.affected().iter().map(|i| i.to_string()).collect();
        assert_eq!(affected, vec!["B.PGM", "A.PGM", "C.PGM"]);
    }

    #[test]
    fn test_placeholder_and_unknown_root() {
        let mut graph = ObjectGraph::new();
        scan(&mut graph, "a.pgm.rpgle", &[("EXT", ObjectType::Program)]);
        assert_eq!(
            rendered(&graph, "EXT", ObjectType::Program),
            "EXT.PGM (no source)\n\tA.PGM (a.pgm.rpgle)\n"
        );
        assert_eq!(rendered(&graph, "NOPE", ObjectType::File), "NOPE.FILE (no source)\n");
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let mut graph = ObjectGraph::new();
        for i in 0..5000 {
            let path = format!("p{i}.pgm.clle");
            let next = format!("P{}", i + 1);
            scan(&mut graph, &path, &[(next.as_str(), ObjectType::Program)]);
        }
        let tree = graph.impact(&ObjectIdentity::new("P5000", ObjectType::Program));
        assert_eq!(tree.walk().count(), 5001);
    }
}
