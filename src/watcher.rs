//
//  watcher.rs
//  Orbit
//
//  Created by hak (tharun)
//

use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{OrbitError, Result};
use crate::naming::SourceKind;
use crate::workspace::Workspaces;

/// Keeps a watch alive. Dropping it stops the watcher and lets the worker
/// thread drain and exit.
pub struct WatcherHandle {
    debouncer: Option<Debouncer<RecommendedWatcher>>,
    worker: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// Stop watching and wait for queued events to be applied.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.debouncer.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("watcher worker panicked");
            }
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Watch `root` and feed changed sources into its workspace: existing
/// files are refreshed, vanished ones removed.
pub fn start_watching(
    root: &Path,
    workspaces: Arc<Workspaces>,
    debounce_ms: u64,
) -> Result<WatcherHandle> {
    let (tx, rx) = channel::<DebounceEventResult>();
    let mut debouncer = new_debouncer(Duration::from_millis(debounce_ms), tx)
        .map_err(|e| OrbitError::Watch(e.to_string()))?;
    debouncer
        .watcher()
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| OrbitError::Watch(format!("{}: {e}", root.display())))?;
    info!(root = %root.display(), debounce_ms, "watching for source changes");

    let worker = thread::Builder::new()
        .name("orbit-watcher".into())
        .spawn(move || drain(rx, &workspaces))
        .map_err(|e| OrbitError::Watch(e.to_string()))?;

    Ok(WatcherHandle {
        debouncer: Some(debouncer),
        worker: Some(worker),
    })
}

fn drain(rx: Receiver<DebounceEventResult>, workspaces: &Workspaces) {
    for result in rx {
        match result {
            Ok(events) => {
                let mut paths: Vec<PathBuf> = events
                    .into_iter()
                    .map(|e| e.path)
                    .filter(|p| SourceKind::from_path(p).is_some())
                    .collect();
                paths.sort();
                paths.dedup();
                for path in paths {
                    apply_change(workspaces, &path);
                }
            }
            Err(e) => warn!(error = %e, "watch error"),
        }
    }
    debug!("watcher channel closed");
}

fn apply_change(workspaces: &Workspaces, path: &Path) {
    if path.is_file() {
        match workspaces.refresh_single(path) {
            Ok(Some(object)) => debug!(path = %path.display(), object = %object.identity, "refreshed"),
            Ok(None) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "refresh failed"),
        }
    } else {
        let impacted = workspaces.remove_single(path);
        debug!(path = %path.display(), impacted = impacted.len(), "removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_apply_change_refreshes_and_removes() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let a = root.join("a.pgm.clle");
        fs::write(&a, "CALL PGM(B)\n").unwrap();
        fs::write(root.join("b.pgm.clle"), "RETURN\n").unwrap();

        let workspaces = Workspaces::new();
        let project = workspaces.initialise(root, false).unwrap();

        fs::write(&a, "CALL PGM(C)\n").unwrap();
        apply_change(&workspaces, &a);
        let record = workspaces.dependencies_for(&a).unwrap();
        assert_eq!(record.dependencies[0].to_string(), "C.PGM");

        fs::remove_file(&a).unwrap();
        apply_change(&workspaces, &a);
        let removed = crate::naming::ObjectIdentity::new("A", crate::naming::ObjectType::Program);
        assert!(project.object(&removed).is_none());
    }
}
