//
//  workspace.rs
//  Orbit
//
//  Created by hak (tharun)
//

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::graph::{build_project, scan_sources, DependencyRecord, IleObject};
use crate::project::Project;

/// Projects of an editor session, keyed by workspace root.
#[derive(Debug, Default)]
pub struct Workspaces {
    projects: RwLock<HashMap<PathBuf, Arc<Project>>>,
}

impl Workspaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `root` and build its project. An existing project is returned
    /// as is unless `overwrite` is set.
    pub fn initialise(&self, root: &Path, overwrite: bool) -> Result<Arc<Project>> {
        if !overwrite {
            if let Some(existing) = self.get(root) {
                return Ok(existing);
            }
        }

        let project = Project::open(root);
        let files = scan_sources(root, project.config().scan.glob.as_deref())?;
        let report = build_project(&project, &files);
        for path in &report.unrecognized {
            warn!(path = %path.display(), "unrecognized source left out of the graph");
        }

        let project = Arc::new(project);
        self.projects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(root.to_path_buf(), Arc::clone(&project));
        info!(root = %root.display(), files = files.len(), "workspace initialised");
        Ok(project)
    }

    /// Forget a workspace. Returns false when it was not known.
    pub fn destroy(&self, root: &Path) -> bool {
        self.projects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(root)
            .is_some()
    }

    pub fn get(&self, root: &Path) -> Option<Arc<Project>> {
        self.projects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(root)
            .cloned()
    }

    /// Project whose root is the longest prefix of `path`.
    pub fn project_for_file(&self, path: &Path) -> Option<Arc<Project>> {
        let projects = self.projects.read().unwrap_or_else(PoisonError::into_inner);
        projects
            .iter()
            .filter(|(root, _)| path.starts_with(root))
            .max_by_key(|(root, _)| root.components().count())
            .map(|(_, project)| Arc::clone(project))
    }

    /// Re-read one changed file and re-run binding. `None` when no
    /// workspace holds the file.
    pub fn refresh_single(&self, path: &Path) -> Result<Option<IleObject>> {
        let Some(project) = self.project_for_file(path) else {
            debug!(path = %path.display(), "refresh outside any workspace");
            return Ok(None);
        };
        let object = project.ingest(path)?;
        project.finalize_binding();
        Ok(Some(object))
    }

    /// Drop a deleted file, then re-read every source that depended on it.
    /// Returns the impacted objects.
    pub fn remove_single(&self, path: &Path) -> Vec<IleObject> {
        let Some(project) = self.project_for_file(path) else {
            return Vec::new();
        };
        let impacted = project.remove(path);
        for object in &impacted {
            let Some(source) = object.path() else {
                continue;
            };
            if let Err(e) = project.ingest(source) {
                warn!(path = %source.display(), error = %e, "impacted source not refreshed");
            }
        }
        project.finalize_binding();
        impacted
    }

    /// Dependencies of the object built from `path`.
    pub fn dependencies_for(&self, path: &Path) -> Option<DependencyRecord> {
        let project = self.project_for_file(path)?;
        let object = project.resolve_identity(path).ok()?;
        project.dependencies_of(&object.identity)
    }

    pub fn logs_for(&self, path: &Path) -> Vec<Diagnostic> {
        self.project_for_file(path)
            .map(|project| project.diagnostics_for(path))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, text: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    fn dep_names(record: Option<DependencyRecord>) -> Vec<String> {
        record
            .map(|r| r.dependencies.iter().map(|d| d.to_string()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_initialise_and_reuse() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let a = write(root, "qclsrc/a.pgm.clle", "CALL PGM(B)\n");
        write(root, "qclsrc/b.pgm.clle", "RETURN\n");

        let workspaces = Workspaces::new();
        let first = workspaces.initialise(root, false).unwrap();
        let again = workspaces.initialise(root, false).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        let rebuilt = workspaces.initialise(root, true).unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));

        assert_eq!(dep_names(workspaces.dependencies_for(&a)), vec!["B.PGM"]);
        assert!(workspaces.destroy(root));
        assert!(!workspaces.destroy(root));
        assert!(workspaces.dependencies_for(&a).is_none());
    }

    #[test]
    fn test_refresh_single_picks_up_edits() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let a = write(root, "a.pgm.clle", "CALL PGM(B)\n");

        let workspaces = Workspaces::new();
        workspaces.initialise(root, false).unwrap();
        write(root, "a.pgm.clle", "CALL PGM(C)\nCALL\n");
        let object = workspaces.refresh_single(&a).unwrap().unwrap();

        assert_eq!(object.dependencies[0].to_string(), "C.PGM");
        assert_eq!(workspaces.logs_for(&a).len(), 1);
        assert!(workspaces
            .refresh_single(Path::new("/elsewhere/x.pgm.clle"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_remove_single_refreshes_dependents() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let inc = write(root, "protos/b.rpgleinc", "**free\n");
        let a = write(root, "src/a.pgm.rpgle", "**free\n/copy 'protos/b.rpgleinc'\n");

        let workspaces = Workspaces::new();
        let project = workspaces.initialise(root, false).unwrap();
        fs::remove_file(&inc).unwrap();
        let impacted = workspaces.remove_single(&inc);

        let names: Vec<String> = impacted.iter().map(|o| o.identity.to_string()).collect();
        assert_eq!(names, vec!["A.PGM"]);
        assert_eq!(dep_names(workspaces.dependencies_for(&a)), vec!["B.INCLUDE"]);
        let b = project
            .object(&crate::naming::ObjectIdentity::new("B", crate::naming::ObjectType::Include))
            .unwrap();
        assert!(b.path().is_none());
    }

    #[test]
    fn test_nested_roots_pick_the_closest() {
        let dir = tempdir().unwrap();
        let outer = dir.path();
        let inner = outer.join("lib");
        let file = write(outer, "lib/x.pgm.clle", "RETURN\n");

        let workspaces = Workspaces::new();
        workspaces.initialise(outer, false).unwrap();
        workspaces.initialise(&inner, false).unwrap();
        let project = workspaces.project_for_file(&file).unwrap();
        assert_eq!(project.root(), inner.as_path());
    }
}
