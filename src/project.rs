//
//  project.rs
//  Orbit
//
//  Created by hak (tharun)
//

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::config::OrbitConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticsLog, Severity};
use crate::error::{OrbitError, Result};
use crate::graph::{
    DependencyRecord, ExportRecord, Extraction, GraphStats, IleObject, ImpactTree, ObjectGraph,
    ObjectSource,
};
use crate::naming::{resolve_path, NamingNote, ObjectIdentity, Resolution};
use crate::parser::extract_source;
use crate::suggest::{self, LineEdit, Suggestions};

/// A source read and extracted, not yet applied to the graph.
#[derive(Debug)]
pub(crate) struct ScannedSource {
    relative: PathBuf,
    resolution: Resolution,
    extraction: Extraction,
    diagnostics: Vec<Diagnostic>,
}

/// One source tree: its graph, its diagnostics and its configuration.
///
/// Paths handed in may be absolute or relative to the root; the graph and
/// the log key everything by the relative form.
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    config: OrbitConfig,
    graph: RwLock<ObjectGraph>,
    log: DiagnosticsLog,
}

impl Project {
    /// Open a project, reading `orbit.toml` from the root when present.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let config = OrbitConfig::load_from_root(&root);
        Self::with_config(root, config)
    }

    pub fn with_config(root: impl Into<PathBuf>, config: OrbitConfig) -> Self {
        Self {
            root: root.into(),
            config,
            graph: RwLock::new(ObjectGraph::new()),
            log: DiagnosticsLog::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &OrbitConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, ObjectGraph> {
        self.graph.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ObjectGraph> {
        self.graph.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Key used by the graph and the log.
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }

    fn absolute(&self, relative: &Path) -> PathBuf {
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.root.join(relative)
        }
    }

    // ─── Ingestion ──────────────────────────────────────────────

    /// Read `path` from disk and (re)build its node.
    pub fn ingest(&self, path: &Path) -> Result<IleObject> {
        let scanned = self.scan_file(path)?;
        Ok(self.commit(&scanned))
    }

    /// Same as `ingest`, for text that is not on disk (an editor buffer).
    pub fn ingest_source(&self, path: &Path, text: &str) -> Result<IleObject> {
        let relative = self.relative(path);
        let resolution = resolve_path(&relative)?;
        Ok(self.commit(&self.scan_text(relative, resolution, text)))
    }

    /// Resolve, read and extract `path` without touching the graph.
    pub(crate) fn scan_file(&self, path: &Path) -> Result<ScannedSource> {
        let relative = self.relative(path);
        let resolution = resolve_path(&relative)?;
        let full = self.absolute(&relative);
        let bytes = fs::read(&full).map_err(|source| OrbitError::Io {
            path: full.clone(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(self.scan_text(relative, resolution, &text))
    }

    fn scan_text(&self, relative: PathBuf, resolution: Resolution, text: &str) -> ScannedSource {
        let mut extraction = extract_source(&relative, resolution.kind, &resolution.identity, text);
        let mut diagnostics = naming_diagnostics(&relative, &resolution);
        diagnostics.append(&mut extraction.diagnostics);
        ScannedSource {
            relative,
            resolution,
            extraction,
            diagnostics,
        }
    }

    /// Replace the node's edge set and scan diagnostics under the write lock.
    pub(crate) fn commit(&self, scanned: &ScannedSource) -> IleObject {
        let mut graph = self.write();
        let idx = graph.apply_scan(&scanned.relative, &scanned.resolution, &scanned.extraction);
        let object = graph.object_at(idx);
        self.log
            .replace_scan(&scanned.relative, scanned.diagnostics.clone());
        self.maybe_compact(&mut graph);
        object
    }

    /// Drop the node built from `path`. Returns every object that depended on it.
    pub fn remove(&self, path: &Path) -> Vec<IleObject> {
        let relative = self.relative(path);
        let mut graph = self.write();
        let dependents: Vec<IleObject> = graph
            .remove_source(&relative)
            .into_iter()
            .map(|idx| graph.object_at(idx))
            .collect();
        self.log.clear(&relative);
        self.maybe_compact(&mut graph);
        dependents
    }

    fn maybe_compact(&self, graph: &mut ObjectGraph) {
        if graph.removed_count() > self.config.graph.compact_threshold {
            graph.compact();
        }
    }

    /// Attach export lists and bind imports. Call after a batch of ingests.
    pub fn finalize_binding(&self) {
        let diagnostics = self.write().resolve_binding();
        debug!(root = %self.root.display(), diagnostics = diagnostics.len(), "binding finalized");
        self.log.replace_binding(diagnostics);
    }

    // ─── Queries ────────────────────────────────────────────────

    /// The object `path` builds: the live node when one owns the path,
    /// otherwise what the naming resolver says it would be.
    pub fn resolve_identity(&self, path: &Path) -> Result<IleObject> {
        let relative = self.relative(path);
        if let Some(object) = self.read().object_for_path(&relative) {
            return Ok(object);
        }
        let resolution = resolve_path(&relative)?;
        Ok(IleObject {
            identity: resolution.identity,
            source: ObjectSource::Resolved {
                path: relative,
                kind: resolution.kind,
            },
            dependencies: Vec::new(),
            exports: None,
        })
    }

    /// Look up `NAME.TYPE`, or a path relative to the root.
    pub fn lookup(&self, query: &str) -> Result<IleObject> {
        if let Some(identity) = ObjectIdentity::parse(query) {
            if let Some(object) = self.read().object(&identity) {
                return Ok(object);
            }
        }
        self.resolve_identity(Path::new(query))
    }

    pub fn object(&self, identity: &ObjectIdentity) -> Option<IleObject> {
        self.read().object(identity)
    }

    pub fn objects(&self) -> Vec<IleObject> {
        self.read().objects()
    }

    pub fn dependency_records(&self) -> Vec<DependencyRecord> {
        self.read().dependency_records()
    }

    pub fn dependencies_of(&self, identity: &ObjectIdentity) -> Option<DependencyRecord> {
        self.read().dependencies_of(identity)
    }

    pub fn dependents_of(&self, identity: &ObjectIdentity) -> Vec<IleObject> {
        self.read().dependents_of(identity)
    }

    pub fn exports(&self) -> Vec<ExportRecord> {
        self.read().exports()
    }

    pub fn impact(&self, identity: &ObjectIdentity) -> ImpactTree {
        self.read().impact(identity)
    }

    pub fn stats(&self) -> GraphStats {
        self.read().stats()
    }

    pub fn diagnostics_for(&self, path: &Path) -> Vec<Diagnostic> {
        self.log.logs_for(&self.relative(path))
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.log.all()
    }

    // ─── Suggestions ────────────────────────────────────────────

    /// The suggestion passes enabled in `[suggestions]`.
    pub fn suggestions(&self) -> Suggestions {
        let mut out = Suggestions::default();
        if self.config.suggestions.renames {
            out.renames = self.rename_suggestions();
        }
        if self.config.suggestions.includes {
            out.include_fixes = self.include_fixes();
        }
        info!(
            renames = out.renames.len(),
            include_fixes = out.include_fixes.len(),
            "suggestions computed"
        );
        out
    }

    pub fn rename_suggestions(&self) -> std::collections::BTreeMap<PathBuf, PathBuf> {
        suggest::rename_suggestions(&self.read())
    }

    pub fn include_fixes(&self) -> std::collections::BTreeMap<PathBuf, Vec<LineEdit>> {
        let include_paths = self.config.resolve_include_paths(&self.root);
        suggest::include_fixes(&self.read(), &self.root, &include_paths)
    }
}

fn naming_diagnostics(path: &Path, resolution: &Resolution) -> Vec<Diagnostic> {
    resolution
        .notes
        .iter()
        .map(|note| match note {
            NamingNote::AmbiguousType {
                assumed,
                alternative,
            } => Diagnostic::new(
                path,
                Severity::Info,
                DiagnosticKind::AmbiguousIdentity,
                format!(
                    "no '{}' infix; treated as {} rather than {}",
                    crate::naming::PROGRAM_INFIX,
                    assumed.as_str(),
                    alternative.as_str()
                ),
            ),
            NamingNote::NameTooLong { original } => Diagnostic::new(
                path,
                Severity::Warning,
                DiagnosticKind::NameTooLong,
                format!(
                    "'{original}' is longer than a system name; using '{}'",
                    resolution.identity.name
                ),
            ),
        })
        .collect()
}
