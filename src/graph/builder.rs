//
//  builder.rs
//  Orbit
//
//  Created by hak (tharun)
//

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{OrbitError, Result};
use crate::naming::SourceKind;
use crate::project::{Project, ScannedSource};

/// Directories that never hold sources worth scanning, even without .gitignore.
const BUILTIN_IGNORE: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    ".vscode",
    ".idea",
    ".evfevent",
    ".logs",
    "node_modules",
    "target",
];

/// Check if a path contains any built-in ignored directory.
fn is_builtin_ignored(path: &Path) -> bool {
    path.components().any(|c| {
        if let std::path::Component::Normal(name) = c {
            BUILTIN_IGNORE.contains(&name.to_str().unwrap_or(""))
        } else {
            false
        }
    })
}

/// Every recognized source under `root`, sorted.
///
/// Respects .gitignore and `.orbitignore`. `glob` narrows the walk and is
/// matched case-insensitively, so `**/*.rpgle` also finds `ORDENT.RPGLE`.
pub fn scan_sources(root: &Path, glob: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut walker = WalkBuilder::new(root);
    walker
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .add_custom_ignore_filename(".orbitignore");

    if let Some(glob) = glob {
        let mut overrides = OverrideBuilder::new(root);
        overrides
            .case_insensitive(true)
            .map_err(|e| OrbitError::Glob(e.to_string()))?;
        overrides
            .add(glob)
            .map_err(|e| OrbitError::Glob(format!("{glob}: {e}")))?;
        let overrides = overrides
            .build()
            .map_err(|e| OrbitError::Glob(format!("{glob}: {e}")))?;
        walker.overrides(overrides);
    }

    let mut files: Vec<PathBuf> = walker
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter(|entry| !is_builtin_ignored(entry.path()))
        .filter(|entry| SourceKind::from_path(entry.path()).is_some())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    Ok(files)
}

/// Outcome of a batch build.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub ingested: usize,
    /// Files whose names the naming resolver could not classify.
    pub unrecognized: Vec<PathBuf>,
    /// Files that could not be read.
    pub failed: Vec<(PathBuf, String)>,
}

/// Read and extract `files` in parallel, apply them to `project` in path
/// order, then run the binder pass once. The resulting node order depends
/// only on the set of files.
pub fn build_project(project: &Project, files: &[PathBuf]) -> BuildReport {
    let mut files: Vec<&PathBuf> = files.iter().collect();
    files.sort();
    files.dedup();

    let scans: Vec<(&PathBuf, Result<ScannedSource>)> = files
        .par_iter()
        .map(|path| (*path, project.scan_file(path)))
        .collect();

    let mut report = BuildReport::default();
    for (path, scan) in scans {
        match scan {
            Ok(scanned) => {
                project.commit(&scanned);
                report.ingested += 1;
            }
            Err(OrbitError::UnrecognizedSource(path)) => report.unrecognized.push(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "source skipped");
                report.failed.push((path.clone(), e.to_string()));
            }
        }
    }

    project.finalize_binding();

    info!(
        root = %project.root().display(),
        ingested = report.ingested,
        unrecognized = report.unrecognized.len(),
        failed = report.failed.len(),
        "project built"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_scan_keeps_recognized_sources() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(root, "qrpglesrc/ordent.pgm.rpgle", "");
        touch(root, "qrpglesrc/README.md", "");
        touch(root, "qddssrc/CUSTMAST.PF", "");
        touch(root, ".git/hooks/x.clle", "");
        touch(root, "node_modules/pkg/y.sql", "");

        let files = scan_sources(root, None).unwrap();
        assert_eq!(
            relative(root, &files),
            vec!["qddssrc/CUSTMAST.PF", "qrpglesrc/ordent.pgm.rpgle"]
        );
    }

    #[test]
    fn test_scan_glob_is_case_insensitive() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(root, "src/a.pgm.rpgle", "");
        touch(root, "src/B.PGM.RPGLE", "");
        touch(root, "src/c.clle", "");

        let files = scan_sources(root, Some("**/*.rpgle")).unwrap();
        assert_eq!(relative(root, &files), vec!["src/B.PGM.RPGLE", "src/a.pgm.rpgle"]);
    }

    #[test]
    fn test_bad_glob_is_an_error() {
        let dir = tempdir().unwrap();
        let err = scan_sources(dir.path(), Some("src/[a")).unwrap_err();
        assert!(matches!(err, OrbitError::Glob(_)));
    }

    #[test]
    fn test_build_project_reports() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(root, "a.pgm.clle", "CALL PGM(B)\n");
        touch(root, "b.pgm.clle", "RETURN\n");

        let project = Project::open(root);
        let mut files = scan_sources(root, None).unwrap();
        files.push(root.join("notes.txt"));
        let report = build_project(&project, &files);

        assert_eq!(report.ingested, 2);
        assert_eq!(report.unrecognized.len(), 1);
        assert!(report.failed.is_empty());
        let record = project
            .dependencies_of(&crate::naming::ObjectIdentity::new("A", crate::naming::ObjectType::Program))
            .unwrap();
        assert_eq!(record.dependencies[0].to_string(), "B.PGM");
    }

    #[test]
    fn test_build_order_is_stable() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for i in 0..64 {
            touch(root, &format!("src/p{i}.pgm.clle"), &format!("CALL PGM(P{})\n", (i + 1) % 64));
        }
        let mut files = scan_sources(root, None).unwrap();

        let first = Project::open(root);
        build_project(&first, &files);
        files.reverse();
        let second = Project::open(root);
        build_project(&second, &files);

        let order = |p: &Project| -> Vec<String> {
            p.dependency_records().iter().map(|r| r.object.to_string()).collect()
        };
        assert_eq!(order(&first), order(&second));
        assert_eq!(first.dependency_records(), second.dependency_records());
        assert_eq!(order(&first)[0], "P0.PGM");
    }
}
