//
//  mod.rs
//  Orbit
//
//  Created by hak (tharun)
//

mod binder;
mod cl;
mod cobol;
mod dds;
pub(crate) mod helpers;
mod rpg;
mod sql;

use std::path::Path;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Severity};
use crate::graph::types::*;
use crate::naming::{is_system_name, Language, ObjectIdentity, ObjectType, SourceKind};

/// Extract references, includes, imports and exports from one source text.
///
/// Never fails: anything that cannot be understood becomes a diagnostic.
pub fn extract_source(
    path: &Path,
    kind: SourceKind,
    owner: &ObjectIdentity,
    text: &str,
) -> Extraction {
    let mut collector = Collector::new(path, owner);
    match kind.language() {
        Language::Rpg => rpg::extract(&mut collector, kind, text),
        Language::Cl => cl::extract(&mut collector, text),
        Language::Cobol => cobol::extract(&mut collector, kind, text),
        Language::Dds => dds::extract(&mut collector, text),
        Language::Sql => sql::extract(&mut collector, text),
        Language::Binder => binder::extract_binder(&mut collector, text),
        Language::BindingDirectory => binder::extract_directory(&mut collector, text),
        Language::Plain => {}
    }
    collector.finish()
}

/// Accumulates one file's extraction; de-duplicates as it goes.
pub(crate) struct Collector<'a> {
    path: &'a Path,
    owner: &'a ObjectIdentity,
    out: Extraction,
}

impl<'a> Collector<'a> {
    fn new(path: &'a Path, owner: &'a ObjectIdentity) -> Self {
        Self {
            path,
            owner,
            out: Extraction::default(),
        }
    }

    /// Record a reference to `name` as written (library qualifier and quotes
    /// already stripped). Names that are not valid system names are reported
    /// instead. Returns true if a reference was recorded or already present.
    pub(crate) fn reference(&mut self, name: &str, object_type: ObjectType, kind: EdgeKind, line: usize) -> bool {
        let name = name.trim();
        if name.starts_with('&') {
            self.info(
                line,
                DiagnosticKind::UnresolvedReference,
                format!("{object_type} name comes from variable {name}"),
            );
            return false;
        }
        if !is_system_name(name) {
            self.warning(
                line,
                DiagnosticKind::UnresolvedReference,
                format!("'{name}' is not a valid {object_type} name"),
            );
            return false;
        }
        let target = ObjectIdentity::new(name, object_type);
        self.reference_identity(target, kind, line);
        true
    }

    fn reference_identity(&mut self, target: ObjectIdentity, kind: EdgeKind, line: usize) {
        if &target == self.owner || self.out.references.iter().any(|r| r.target == target) {
            return;
        }
        self.out.references.push(Reference { target, kind, line });
    }

    /// Record an include directive and its INCLUDE reference.
    pub(crate) fn include(&mut self, directive: IncludeDirective) {
        if !is_system_name(&directive.identity.name) {
            self.warning(
                directive.line,
                DiagnosticKind::UnresolvedReference,
                format!("include target '{}' is not a valid member name", directive.identity.name),
            );
            return;
        }
        self.reference_identity(directive.identity.clone(), EdgeKind::Include, directive.line);
        self.out.includes.push(directive);
    }

    pub(crate) fn import(&mut self, procedure: &str) {
        push_unique(&mut self.out.imports, procedure);
    }

    pub(crate) fn export(&mut self, procedure: &str) {
        push_unique(&mut self.out.exports, procedure);
    }

    pub(crate) fn set_no_main(&mut self) {
        self.out.no_main = true;
    }

    pub(crate) fn set_binder(&mut self, listing: BinderListing) {
        self.out.binder = Some(listing);
    }

    pub(crate) fn malformed(&mut self, line: usize, message: impl Into<String>) {
        self.warning(line, DiagnosticKind::MalformedDirective, message);
    }

    pub(crate) fn unresolved(&mut self, line: usize, message: impl Into<String>) {
        self.warning(line, DiagnosticKind::UnresolvedReference, message);
    }

    pub(crate) fn info(&mut self, line: usize, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(Severity::Info, line, kind, message);
    }

    fn warning(&mut self, line: usize, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(Severity::Warning, line, kind, message);
    }

    fn push(&mut self, severity: Severity, line: usize, kind: DiagnosticKind, message: impl Into<String>) {
        self.out
            .diagnostics
            .push(Diagnostic::new(self.path, severity, kind, message).at_line(line));
    }

    fn finish(self) -> Extraction {
        self.out
    }
}

/// INCLUDE identity an include target stands for.
pub(crate) fn include_identity(target: &IncludeTarget) -> ObjectIdentity {
    let name = match target {
        IncludeTarget::Member { member, .. } => member.clone(),
        IncludeTarget::Path { path } => helpers::path_base_name(path),
    };
    ObjectIdentity::new(name, ObjectType::Include)
}

fn push_unique(list: &mut Vec<String>, procedure: &str) {
    let procedure = procedure.trim();
    if procedure.is_empty() || list.iter().any(|p| p.eq_ignore_ascii_case(procedure)) {
        return;
    }
    list.push(procedure.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> ObjectIdentity {
        ObjectIdentity::new("A", ObjectType::Program)
    }

    #[test]
    fn test_collector_dedups_and_drops_self() {
        let owner = owner();
        let mut c = Collector::new(Path::new("a.pgm.clle"), &owner);
        assert!(c.reference("b", ObjectType::Program, EdgeKind::Call, 1));
        assert!(c.reference("B", ObjectType::Program, EdgeKind::Call, 5));
        assert!(c.reference("A", ObjectType::Program, EdgeKind::Call, 6));
        let out = c.finish();
        assert_eq!(out.references.len(), 1);
        assert_eq!(out.references[0].line, 1);
    }

    #[test]
    fn test_collector_reports_bad_names() {
        let owner = owner();
        let mut c = Collector::new(Path::new("a.pgm.clle"), &owner);
        assert!(!c.reference("&PGM", ObjectType::Program, EdgeKind::Call, 2));
        assert!(!c.reference("WAY_TOO_LONG_NAME", ObjectType::File, EdgeKind::File, 3));
        let out = c.finish();
        assert!(out.references.is_empty());
        assert_eq!(out.diagnostics.len(), 2);
        assert_eq!(out.diagnostics[0].severity, Severity::Info);
        assert_eq!(out.diagnostics[1].kind, DiagnosticKind::UnresolvedReference);
    }

    #[test]
    fn test_plain_sources_have_no_references() {
        let owner = ObjectIdentity::new("CFG", ObjectType::DataArea);
        let out = extract_source(Path::new("cfg.dtaara"), SourceKind::DataArea, &owner, "anything FROM X");
        assert!(out.references.is_empty());
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_imports_dedup_case_insensitively() {
        let owner = owner();
        let mut c = Collector::new(Path::new("a.pgm.rpgle"), &owner);
        c.import("getCust");
        c.import("GETCUST");
        c.export("Helper");
        let out = c.finish();
        assert_eq!(out.imports, vec!["getCust"]);
        assert_eq!(out.exports, vec!["Helper"]);
    }
}
