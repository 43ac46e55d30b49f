//! # Orbit
//!
//! Build-dependency graph engine for IBM i (ILE) source trees.
//!
//! Orbit names every source member after the object it builds, pulls the
//! structural references out of its text (copy members, program calls,
//! files, data areas, binder exports) and keeps an incrementally updated
//! graph of objects that answers "what does this need" and "what breaks if
//! this changes".
//!
//! ## Key Features
//!
//! - **Many languages**: RPG (free and fixed), CL, COBOL, DDS, SQL, binder source
//! - **Incremental**: re-ingesting one file replaces only that file's edges
//! - **Cycle-safe**: impact walks terminate on cyclic and diamond-shaped graphs
//! - **Never fails on content**: anything not understood becomes a diagnostic
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use orbit::{build_project, scan_sources, ObjectIdentity, Project};
//! use std::path::Path;
//!
//! let root = Path::new("my-ibmi-project");
//! let project = Project::open(root);
//! let files = scan_sources(root, None).unwrap();
//! build_project(&project, &files);
//!
//! let emps = ObjectIdentity::parse("EMPS.FILE").unwrap();
//! print!("{}", project.impact(&emps));
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod naming;
pub mod parser;
pub mod project;
pub mod suggest;
pub mod watcher;
pub mod workspace;

// Re-exports for convenience
pub use config::OrbitConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticsLog, Severity};
pub use error::{OrbitError, Result};
pub use graph::{
    build_project, scan_sources, BuildReport, DependencyRecord, ExportRecord, GraphStats,
    IleObject, ImpactLine, ImpactTree, ImpactWalk, ObjectGraph, ObjectSource,
};
pub use naming::{resolve_path, ObjectIdentity, ObjectType, Resolution, SourceKind};
pub use project::Project;
pub use suggest::{LineEdit, Suggestions};
pub use watcher::{start_watching, WatcherHandle};
pub use workspace::Workspaces;
