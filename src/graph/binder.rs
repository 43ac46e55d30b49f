//! Binder pass: attaches export lists to service programs and binds
//! procedure imports to the objects that export them.
//!
//! Bound edges are owned entirely by this pass. Every run starts by
//! dropping the previous run's edges, so running it twice in a row
//! yields the same graph.

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

use super::engine::ObjectGraph;
use super::types::*;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Severity};
use crate::naming::{ObjectIdentity, ObjectType};

impl ObjectGraph {
    /// Run the binder pass over every registered binder source.
    /// Returns the binding-phase diagnostics.
    pub fn resolve_binding(&mut self) -> Vec<Diagnostic> {
        let previously_bound: Vec<NodeIndex> = self
            .graph
            .edge_references()
            .filter(|e| e.weight().kind.is_bound())
            .map(|e| e.target())
            .collect();
        self.remove_edges_where(|e| e.kind.is_bound());
        for node in self.graph.node_weights_mut() {
            node.exports = None;
        }

        let mut diagnostics = Vec::new();
        let providers = self.procedure_providers();
        let mut service_programs: HashMap<String, NodeIndex> = HashMap::new();

        let mut binders: Vec<(PathBuf, ObjectIdentity, BinderListing)> = self
            .binders
            .iter()
            .map(|(path, (identity, listing))| (path.clone(), identity.clone(), listing.clone()))
            .collect();
        binders.sort_by(|a, b| a.0.cmp(&b.0));

        for (path, identity, listing) in binders {
            let target = ObjectIdentity::new(&identity.name, ObjectType::ServiceProgram);
            // The service program must still be built from this binder source.
            // A later source claiming the same identity leaves it unmatched.
            let owned = self.node(&target).filter(|(_, node)| {
                node.source.info().is_some_and(|info| info.path == path)
            });
            let Some((srvpgm, _)) = owned else {
                let owner = self
                    .node(&target)
                    .and_then(|(_, node)| node.source.info())
                    .map(|info| info.path.clone());
                let message = match owner {
                    Some(owner) => format!(
                        "{target} is built from {}; this export list is not used",
                        owner.display()
                    ),
                    None => format!("no service program {target} for this export list"),
                };
                diagnostics.push(Diagnostic::new(
                    &path,
                    Severity::Warning,
                    DiagnosticKind::UnmatchedBinderTarget,
                    message,
                ));
                continue;
            };

            let symbols = listing.export_symbols();
            for symbol in &symbols {
                let key = symbol.to_ascii_uppercase();
                service_programs.entry(key.clone()).or_insert(srvpgm);

                let modules = providers.get(&key).map(Vec::as_slice).unwrap_or(&[]);
                if modules.is_empty() {
                    diagnostics.push(Diagnostic::new(
                        &path,
                        Severity::Info,
                        DiagnosticKind::UnresolvedReference,
                        format!("no module exports '{symbol}'"),
                    ));
                }
                for &module in modules {
                    self.add_dependency(srvpgm, module, EdgeKind::Export);
                }
            }

            debug!(object = %target, exports = symbols.len(), "export list attached");
            if let Some(node) = self.graph.node_weight_mut(srvpgm) {
                node.exports = Some(symbols);
            }
        }

        // Imports bind to the service program first, then to any exporting module.
        let importers: Vec<(NodeIndex, Vec<String>)> = self
            .live_nodes()
            .filter_map(|(idx, node)| {
                let info = node.source.info()?;
                (!info.imports.is_empty()).then(|| (idx, info.imports.clone()))
            })
            .collect();

        let mut bound = 0usize;
        for (importer, imports) in importers {
            for symbol in imports {
                let key = symbol.to_ascii_uppercase();
                let provider = service_programs
                    .get(&key)
                    .copied()
                    .filter(|&p| p != importer)
                    .or_else(|| {
                        providers
                            .get(&key)
                            .and_then(|m| m.iter().copied().find(|&p| p != importer))
                    });
                match provider {
                    Some(p) => {
                        if self.add_dependency(importer, p, EdgeKind::Import) {
                            bound += 1;
                        }
                    }
                    None => debug!(procedure = %symbol, "import has no provider in the project"),
                }
            }
        }

        self.drop_orphans(previously_bound);

        info!(
            binders = self.binders.len(),
            bound_imports = bound,
            diagnostics = diagnostics.len(),
            "binding resolved"
        );
        diagnostics
    }

    /// Upper-cased exported procedure -> nodes whose source exports it.
    fn procedure_providers(&self) -> HashMap<String, Vec<NodeIndex>> {
        let mut providers: HashMap<String, Vec<NodeIndex>> = HashMap::new();
        for (idx, node) in self.live_nodes() {
            let Some(info) = node.source.info() else {
                continue;
            };
            for symbol in &info.exports {
                let list = providers.entry(symbol.to_ascii_uppercase()).or_default();
                if !list.contains(&idx) {
                    list.push(idx);
                }
            }
        }
        providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::resolve_path;
    use std::path::Path;

    fn scan(graph: &mut ObjectGraph, path: &str, extraction: Extraction) {
        let resolution = resolve_path(Path::new(path)).unwrap();
        graph.apply_scan(Path::new(path), &resolution, &extraction);
    }

    fn exporting(symbols: &[&str]) -> Extraction {
        Extraction {
            exports: symbols.iter().map(|s| s.to_string()).collect(),
            no_main: true,
            ..Default::default()
        }
    }

    fn importing(symbols: &[&str]) -> Extraction {
        Extraction {
            imports: symbols.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn binder(symbols: &[&str]) -> Extraction {
        Extraction {
            binder: Some(BinderListing {
                blocks: vec![ExportBlock {
                    current: true,
                    signature: None,
                    symbols: symbols.iter().map(|s| s.to_string()).collect(),
                }],
            }),
            ..Default::default()
        }
    }

    fn deps(graph: &ObjectGraph, name: &str, t: ObjectType) -> Vec<String> {
        graph
            .dependencies_of(&ObjectIdentity::new(name, t))
            .unwrap()
            .dependencies
            .iter()
            .map(|d| d.to_string())
            .collect()
    }

    #[test]
    fn test_export_list_declared_order_dedup() {
        let mut graph = ObjectGraph::new();
        scan(&mut graph, "srva.bnd", binder(&["X", "Y", "X"]));
        graph.resolve_binding();

        let exports = graph.exports();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].object.to_string(), "SRVA.SRVPGM");
        assert_eq!(exports[0].symbols, vec!["X", "Y"]);
    }

    #[test]
    fn test_export_and_import_edges() {
        let mut graph = ObjectGraph::new();
        scan(&mut graph, "main.pgm.rpgle", importing(&["getcust"]));
        scan(&mut graph, "custmod.rpgle", exporting(&["GETCUST"]));
        scan(&mut graph, "custsrv.bnd", binder(&["GETCUST"]));
        let diagnostics = graph.resolve_binding();
        assert!(diagnostics.is_empty());

        assert_eq!(deps(&graph, "CUSTSRV", ObjectType::ServiceProgram), vec!["CUSTMOD.MODULE"]);
        assert_eq!(deps(&graph, "MAIN", ObjectType::Program), vec!["CUSTSRV.SRVPGM"]);
    }

    #[test]
    fn test_import_falls_back_to_module() {
        let mut graph = ObjectGraph::new();
        scan(&mut graph, "main.pgm.rpgle", importing(&["CALC"]));
        scan(&mut graph, "calc.rpgle", exporting(&["CALC"]));
        graph.resolve_binding();
        assert_eq!(deps(&graph, "MAIN", ObjectType::Program), vec!["CALC.MODULE"]);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut graph = ObjectGraph::new();
        scan(&mut graph, "main.pgm.rpgle", importing(&["GETCUST"]));
        scan(&mut graph, "custmod.rpgle", exporting(&["GETCUST"]));
        scan(&mut graph, "custsrv.bnd", binder(&["GETCUST", "MISSING"]));

        let first_diags = graph.resolve_binding();
        let first = graph.dependency_records();
        let second_diags = graph.resolve_binding();
        assert_eq!(first, graph.dependency_records());
        assert_eq!(first_diags, second_diags);
        assert_eq!(first_diags.len(), 1);
        assert_eq!(first_diags[0].kind, DiagnosticKind::UnresolvedReference);
    }

    #[test]
    fn test_rescan_drops_bound_edges_until_finalize() {
        let mut graph = ObjectGraph::new();
        scan(&mut graph, "main.pgm.rpgle", importing(&["CALC"]));
        scan(&mut graph, "calc.rpgle", exporting(&["CALC"]));
        graph.resolve_binding();

        scan(&mut graph, "main.pgm.rpgle", importing(&["CALC"]));
        assert!(deps(&graph, "MAIN", ObjectType::Program).is_empty());
        graph.resolve_binding();
        assert_eq!(deps(&graph, "MAIN", ObjectType::Program), vec!["CALC.MODULE"]);
    }

    #[test]
    fn test_binder_claimed_by_later_source_is_unmatched() {
        let mut graph = ObjectGraph::new();
        scan(&mut graph, "calc.rpgle", exporting(&["CALC"]));
        scan(&mut graph, "utils.bnd", binder(&["CALC"]));
        assert!(graph.resolve_binding().is_empty());
        assert_eq!(
            deps(&graph, "UTILS", ObjectType::ServiceProgram),
            vec!["CALC.MODULE"]
        );

        // last writer wins: the SQL function now builds UTILS
        scan(&mut graph, "utils.sqludf", Extraction::default());
        let diagnostics = graph.resolve_binding();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnmatchedBinderTarget);
        assert_eq!(diagnostics[0].path, PathBuf::from("utils.bnd"));
        assert!(diagnostics[0].message.contains("utils.sqludf"));
        assert!(graph.exports().is_empty());

        // removing the binder file drops its registration
        graph.remove_source(Path::new("utils.bnd"));
        assert!(graph.resolve_binding().is_empty());
    }

    #[test]
    fn test_unmatched_binder_target() {
        let mut graph = ObjectGraph::new();
        let listing = BinderListing::default();
        graph.binders.insert(
            PathBuf::from("ghost.bnd"),
            (ObjectIdentity::new("GHOST", ObjectType::ServiceProgram), listing),
        );
        let diagnostics = graph.resolve_binding();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnmatchedBinderTarget);
        assert_eq!(diagnostics[0].path, PathBuf::from("ghost.bnd"));
    }
}
