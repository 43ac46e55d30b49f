//
//  types.rs
//  Orbit
//
//  Created by hak (tharun)
//

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::diagnostics::Diagnostic;
use crate::naming::{ObjectIdentity, SourceKind};

// ─── Edges ──────────────────────────────────────────────────────

/// Why one object depends on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Copy/include directive.
    Include,
    /// Dynamic program call (EXTPGM, CALL).
    Call,
    /// Database, display or printer file use.
    File,
    DataArea,
    /// Binding directory named on the control options.
    BindingDirectory,
    MessageFile,
    /// Entry listed in a binding directory source.
    Entry,
    /// Imported procedure bound to the object exporting it. Added by the binder pass.
    Import,
    /// Service program to a module providing one of its exports. Added by the binder pass.
    Export,
}

impl EdgeKind {
    /// Edges owned by the binder pass rather than by file content.
    pub fn is_bound(self) -> bool {
        matches!(self, EdgeKind::Import | EdgeKind::Export)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeData {
    pub kind: EdgeKind,
    /// Position in the owner's dependency list.
    pub order: usize,
}

impl EdgeData {
    pub fn new(kind: EdgeKind, order: usize) -> Self {
        Self { kind, order }
    }
}

// ─── Extraction ─────────────────────────────────────────────────

/// A structural reference found in source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub target: ObjectIdentity,
    pub kind: EdgeKind,
    pub line: usize,
}

/// Where an include directive points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum IncludeTarget {
    /// Member of a source physical file, e.g. `QRPGLESRC,MEMBER`.
    Member {
        library: Option<String>,
        file: Option<String>,
        member: String,
    },
    /// Stream file path, as written.
    Path { path: String },
}

/// Which statement spelled the include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeSyntax {
    /// RPG `/COPY` or `/INCLUDE`.
    RpgCopy,
    /// CL `INCLUDE` command.
    ClInclude,
    /// COBOL `COPY`.
    CobolCopy,
}

/// One include directive, kept for the include-fix suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeDirective {
    pub line: usize,
    /// The directive line as written.
    pub text: String,
    /// Leading text before the directive keyword (indent or sequence area).
    pub indent: String,
    /// Directive keyword as written, e.g. `/copy`.
    pub keyword: String,
    pub syntax: IncludeSyntax,
    pub target: IncludeTarget,
    pub identity: ObjectIdentity,
}

/// One `STRPGMEXP`..`ENDPGMEXP` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportBlock {
    pub current: bool,
    pub signature: Option<String>,
    pub symbols: Vec<String>,
}

/// Parsed binder source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinderListing {
    pub blocks: Vec<ExportBlock>,
}

impl BinderListing {
    /// Current-level symbols, then any other block's symbols not listed yet.
    pub fn export_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::new();
        let current = self.blocks.iter().filter(|b| b.current);
        let previous = self.blocks.iter().filter(|b| !b.current);
        for block in current.chain(previous) {
            for symbol in &block.symbols {
                if !symbols.contains(symbol) {
                    symbols.push(symbol.clone());
                }
            }
        }
        symbols
    }
}

/// Everything the extractor pulled out of one file.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub references: Vec<Reference>,
    pub includes: Vec<IncludeDirective>,
    /// Procedures this source calls by bound call.
    pub imports: Vec<String>,
    /// Procedures this source exports.
    pub exports: Vec<String>,
    pub no_main: bool,
    pub binder: Option<BinderListing>,
    pub diagnostics: Vec<Diagnostic>,
}

// ─── Nodes ──────────────────────────────────────────────────────

/// Content-derived data of a node whose source has been scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Path relative to the project root.
    pub path: PathBuf,
    pub kind: SourceKind,
    /// Type came from the fallback rather than the file name.
    pub ambiguous: bool,
    pub includes: Vec<IncludeDirective>,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub no_main: bool,
    pub binder: Option<BinderListing>,
}

/// Whether a node's source is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSource {
    /// Known only because something references it.
    Unresolved,
    Resolved(SourceInfo),
}

impl NodeSource {
    pub fn info(&self) -> Option<&SourceInfo> {
        match self {
            NodeSource::Unresolved => None,
            NodeSource::Resolved(info) => Some(info),
        }
    }
}

/// Node weight in the object graph.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub identity: ObjectIdentity,
    pub source: NodeSource,
    /// Export list resolved by the binder pass (service programs).
    pub exports: Option<Vec<String>>,
    /// Soft-deleted; reclaimed by `compact`.
    pub removed: bool,
}

impl NodeData {
    pub fn placeholder(identity: ObjectIdentity) -> Self {
        Self {
            identity,
            source: NodeSource::Unresolved,
            exports: None,
            removed: false,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.source, NodeSource::Unresolved)
    }
}

// ─── Snapshots ──────────────────────────────────────────────────

/// Source of an object, as exposed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ObjectSource {
    Unresolved,
    Resolved { path: PathBuf, kind: SourceKind },
}

impl ObjectSource {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ObjectSource::Unresolved => None,
            ObjectSource::Resolved { path, .. } => Some(path),
        }
    }
}

/// Snapshot of one graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IleObject {
    #[serde(flatten)]
    pub identity: ObjectIdentity,
    pub source: ObjectSource,
    pub dependencies: Vec<ObjectIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports: Option<Vec<String>>,
}

impl IleObject {
    pub fn path(&self) -> Option<&PathBuf> {
        self.source.path()
    }
}

/// An object and what it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    pub object: ObjectIdentity,
    pub dependencies: Vec<ObjectIdentity>,
}

/// A service program and its resolved exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub object: ObjectIdentity,
    pub symbols: Vec<String>,
}

/// Graph statistics (excludes soft-deleted nodes).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub source_count: usize,
    pub placeholder_count: usize,
    pub removed_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_symbols_current_first() {
        let listing = BinderListing {
            blocks: vec![
                ExportBlock {
                    current: false,
                    signature: None,
                    symbols: vec!["X".into(), "OLD".into()],
                },
                ExportBlock {
                    current: true,
                    signature: Some("V2".into()),
                    symbols: vec!["X".into(), "Y".into(), "X".into()],
                },
            ],
        };
        assert_eq!(listing.export_symbols(), vec!["X", "Y", "OLD"]);
    }
}
