//! Orbit CLI - build-dependency graph for IBM i source trees.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use orbit::{
    build_project, scan_sources, start_watching, DependencyRecord, ExportRecord, IleObject,
    LineEdit, ObjectIdentity, OrbitError, Project, Workspaces,
};

#[derive(Parser)]
#[command(name = "orbit")]
#[command(about = "Orbit - build dependencies and change impact for IBM i sources", long_about = None)]
struct Cli {
    /// Project root (default: current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Only scan files matching this glob (case-insensitive)
    #[arg(short, long)]
    glob: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the project and print a summary
    Scan {
        /// Scan only these files instead of walking the root
        #[arg(long, num_args = 1..)]
        files: Vec<PathBuf>,

        /// Write targets, resolved objects and exports as JSON ("-" for stdout)
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Show everything affected by a change to an object or file
    Lookup {
        /// NAME.TYPE (e.g. EMPS.FILE) or a path relative to the root
        #[arg(short = 'l', long = "lookup")]
        query: String,
    },

    /// Show what an object depends on
    Deps {
        /// NAME.TYPE or a path relative to the root
        query: String,
    },

    /// Propose renames and include rewrites
    Suggest {
        /// Rename suggestions (default: as configured)
        #[arg(long)]
        renames: bool,

        /// Include-fix suggestions (default: as configured)
        #[arg(long)]
        includes: bool,

        /// Apply include fixes to the files
        #[arg(long)]
        apply: bool,
    },

    /// Print diagnostics, for one file or for the whole project
    Logs {
        path: Option<PathBuf>,
    },

    /// Keep the graph current while files change
    Watch {
        /// Debounce window in milliseconds
        #[arg(long, default_value_t = 200)]
        debounce_ms: u64,
    },
}

#[derive(Serialize)]
struct JsonDump {
    targets: Vec<DependencyRecord>,
    resolved: Vec<IleObject>,
    exports: Vec<ExportRecord>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Watch { debounce_ms } = cli.command {
        return watch(&cli.root, debounce_ms);
    }

    let project = Project::open(&cli.root);
    let files = match &cli.command {
        Commands::Scan { files, .. } if !files.is_empty() => files.clone(),
        _ => {
            let glob = scan_glob(cli.glob.as_deref(), &project);
            scan_sources(&cli.root, glob)
                .with_context(|| format!("scanning {}", cli.root.display()))?
        }
    };
    let report = build_project(&project, &files);
    for path in &report.unrecognized {
        eprintln!("⚠ {} (please report this file)", OrbitError::UnrecognizedSource(path.clone()));
    }
    for (path, error) in &report.failed {
        eprintln!("⚠ {}: {}", path.display(), error);
    }

    match cli.command {
        Commands::Scan { json, .. } => {
            let stats = project.stats();
            println!("Orbit Scan");
            println!("──────────");
            println!("Root: {}", project.root().display());
            println!("Sources: {}", stats.source_count);
            println!("Objects: {}", stats.total_nodes);
            println!("Unresolved: {}", stats.placeholder_count);
            println!("Dependencies: {}", stats.total_edges);
            println!("Diagnostics: {}", project.diagnostics().len());

            if let Some(out) = json {
                let dump = JsonDump {
                    targets: project.dependency_records(),
                    resolved: project.objects(),
                    exports: project.exports(),
                };
                let text = serde_json::to_string_pretty(&dump)?;
                if out.as_os_str() == "-" {
                    println!("{}", text);
                } else {
                    fs::write(&out, text).with_context(|| format!("writing {}", out.display()))?;
                    println!("✓ Wrote {}", out.display());
                }
            }
        }

        Commands::Lookup { query } => {
            let object = project.lookup(&query)?;
            print!("{}", project.impact(&object.identity));
        }

        Commands::Deps { query } => {
            let object = project.lookup(&query)?;
            match project.dependencies_of(&object.identity) {
                Some(record) if !record.dependencies.is_empty() => {
                    println!("{} ({}):", record.object, source_label(&project, &record.object));
                    for dep in &record.dependencies {
                        println!("  - {} ({})", dep, source_label(&project, dep));
                    }
                }
                _ => println!("{} has no dependencies.", object.identity),
            }
        }

        Commands::Suggest {
            renames,
            includes,
            apply,
        } => {
            let mut suggestions = if renames || includes {
                Default::default()
            } else {
                project.suggestions()
            };
            if renames {
                suggestions.renames = project.rename_suggestions();
            }
            if includes {
                suggestions.include_fixes = project.include_fixes();
            }

            if suggestions.is_empty() {
                println!("No suggestions.");
            }
            for (from, to) in &suggestions.renames {
                println!("rename {} -> {}", from.display(), to.display());
            }
            for (path, edits) in &suggestions.include_fixes {
                for edit in edits {
                    println!("{}:{}: {}", path.display(), edit.line, edit.replacement.trim());
                }
                if apply {
                    apply_edits(&project.root().join(path), edits)?;
                }
            }
        }

        Commands::Logs { path } => {
            let logs = match path {
                Some(path) => project.diagnostics_for(&path),
                None => project.diagnostics(),
            };
            if logs.is_empty() {
                println!("No diagnostics.");
            }
            for log in logs {
                println!("{}", log);
            }
        }

        Commands::Watch { .. } => {}
    }

    Ok(())
}

/// `--glob` wins over `[scan] glob` from orbit.toml.
fn scan_glob<'a>(flag: Option<&'a str>, project: &'a Project) -> Option<&'a str> {
    flag.or(project.config().scan.glob.as_deref())
}

fn source_label(project: &Project, identity: &ObjectIdentity) -> String {
    project
        .object(identity)
        .and_then(|o| o.path().map(|p| p.display().to_string()))
        .unwrap_or_else(|| "no source".to_string())
}

fn apply_edits(path: &Path, edits: &[LineEdit]) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    fs::write(path, LineEdit::apply(&text, edits))
        .with_context(|| format!("writing {}", path.display()))?;
    println!("✓ Updated {}", path.display());
    Ok(())
}

fn watch(root: &Path, debounce_ms: u64) -> Result<()> {
    let workspaces = Arc::new(Workspaces::new());
    let project = workspaces.initialise(root, false)?;
    println!(
        "Watching {} ({} objects). Press Ctrl-C to stop.",
        root.display(),
        project.stats().total_nodes
    );
    let _handle = start_watching(root, Arc::clone(&workspaces), debounce_ms)?;
    loop {
        std::thread::park();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit::OrbitConfig;

    #[test]
    fn test_glob_flag_overrides_config() {
        let mut config = OrbitConfig::default();
        config.scan.glob = Some("qrpglesrc/**".into());
        let project = Project::with_config(".", config);

        assert_eq!(scan_glob(None, &project), Some("qrpglesrc/**"));
        assert_eq!(scan_glob(Some("**/*.clle"), &project), Some("**/*.clle"));

        let bare = Project::with_config(".", OrbitConfig::default());
        assert_eq!(scan_glob(None, &bare), None);
    }
}
