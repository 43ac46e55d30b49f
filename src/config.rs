//
//  config.rs
//  Orbit
//
//  Created by hak (tharun)
//

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{OrbitError, Result};

/// File name of the project configuration, relative to the project root.
pub const CONFIG_FILE: &str = "orbit.toml";

/// Top-level Orbit configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrbitConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub suggestions: SuggestionConfig,
    #[serde(default)]
    pub graph: GraphConfig,
}

/// Project-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Extra directories (relative to the root) searched when deciding
    /// whether a quoted include path points at a local source.
    #[serde(default)]
    pub include_paths: Vec<String>,
}

/// Source enumeration settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Case-insensitive glob; all recognized extensions when absent.
    #[serde(default)]
    pub glob: Option<String>,
}

/// Which advisory passes run after a scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionConfig {
    #[serde(default)]
    pub renames: bool,
    #[serde(default)]
    pub includes: bool,
}

/// Graph engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Soft-deleted nodes tolerated before the graph is compacted.
    #[serde(default = "default_compact_threshold")]
    pub compact_threshold: usize,
}

fn default_compact_threshold() -> usize {
    256
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            compact_threshold: default_compact_threshold(),
        }
    }
}

impl OrbitConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring invalid config");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Load `orbit.toml` from a project root.
    pub fn load_from_root(root: &Path) -> Self {
        Self::load(&root.join(CONFIG_FILE))
    }

    /// Parse config text.
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| OrbitError::Config(e.to_string()))
    }

    /// Include directories resolved against the project root.
    pub fn resolve_include_paths(&self, root: &Path) -> Vec<PathBuf> {
        self.project
            .include_paths
            .iter()
            .map(|p| root.join(p))
            .collect()
    }
}
