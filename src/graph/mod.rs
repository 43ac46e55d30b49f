//! Object graph: the structural backbone of Orbit.
//!
//! Nodes are ILE objects keyed by identity; edges point from an object to
//! what it needs at build time. Ingestion, removal, binding, impact walks and
//! source enumeration all live here.

pub mod binder;
pub mod builder;
pub mod engine;
pub mod impact;
pub mod mutation;
pub mod query;
pub mod types;

pub use builder::{build_project, scan_sources, BuildReport};
pub use engine::ObjectGraph;
pub use impact::{ImpactLine, ImpactTree, ImpactWalk};
pub use types::{
    BinderListing, DependencyRecord, EdgeData, EdgeKind, ExportBlock, ExportRecord, Extraction,
    GraphStats, IleObject, IncludeDirective, IncludeSyntax, IncludeTarget, NodeData, NodeSource,
    ObjectSource, Reference, SourceInfo,
};
