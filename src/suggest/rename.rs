//
//  rename.rs
//  Orbit
//
//  Created by hak (tharun)
//

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::graph::ObjectGraph;
use crate::naming::{Language, PROGRAM_INFIX};

/// Renames for sources whose type had to be guessed.
///
/// A member another source includes becomes an include member; an RPG
/// source with a main procedure, or a CL/COBOL source something calls,
/// gets the program infix.
pub(crate) fn rename_suggestions(graph: &ObjectGraph) -> BTreeMap<PathBuf, PathBuf> {
    let included: HashSet<&str> = graph
        .sources()
        .flat_map(|(_, info)| info.includes.iter())
        .map(|d| d.identity.name.as_str())
        .collect();
    let called = graph.called_program_names();

    let mut renames = BTreeMap::new();
    for (identity, info) in graph.sources() {
        if !info.ambiguous {
            continue;
        }
        let renamed = if included.contains(identity.name.as_str()) {
            info.kind
                .include_extension()
                .and_then(|ext| with_extension(&info.path, ext))
        } else {
            let program = match info.kind.language() {
                Language::Rpg => !info.no_main,
                Language::Cl | Language::Cobol => called.contains(&identity.name),
                _ => false,
            };
            if program {
                with_program_infix(&info.path)
            } else {
                None
            }
        };
        if let Some(new_path) = renamed {
            debug!(from = %info.path.display(), to = %new_path.display(), "rename suggested");
            renames.insert(info.path.clone(), new_path);
        }
    }
    renames
}

/// Case follows the current extension: `A.RPGLE` → `A.RPGLEINC`.
fn with_extension(path: &Path, ext: &str) -> Option<PathBuf> {
    let current = path.extension()?.to_str()?;
    let ext = match_case(current, ext);
    Some(path.with_extension(ext))
}

/// `a.rpgle` → `a.pgm.rpgle`, keeping any other infixes.
fn with_program_infix(path: &Path) -> Option<PathBuf> {
    let file_name = path.file_name()?.to_str()?;
    let (stem, ext) = file_name.rsplit_once('.')?;
    let infix = match_case(ext, PROGRAM_INFIX);
    Some(path.with_file_name(format!("{stem}.{infix}.{ext}")))
}

fn match_case(sample: &str, text: &str) -> String {
    let upper = sample.chars().any(|c| c.is_ascii_uppercase())
        && !sample.chars().any(|c| c.is_ascii_lowercase());
    if upper {
        text.to_ascii_uppercase()
    } else {
        text.to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::resolve_path;
    use crate::parser::extract_source;

    fn scan(graph: &mut ObjectGraph, path: &str, text: &str) {
        let path = Path::new(path);
        let resolution = resolve_path(path).unwrap();
        let extraction = extract_source(path, resolution.kind, &resolution.identity, text);
        graph.apply_scan(path, &resolution, &extraction);
    }

    #[test]
    fn test_program_and_include_renames() {
        let mut graph = ObjectGraph::new();
        scan(&mut graph, "qrpglesrc/ordent.rpgle", "**free\n/copy qrpglesrc,protos\ndsply 'hi';\n");
        scan(&mut graph, "qrpglesrc/PROTOS.RPGLE", "**free\ndcl-pr getCust;\nend-pr;\n");
        scan(&mut graph, "qrpglesrc/utils.rpgle", "**free\nctl-opt nomain;\n");
        scan(&mut graph, "qclsrc/nightly.clle", "PGM\nCALL PGM(CLEANUP)\nENDPGM\n");
        scan(&mut graph, "qclsrc/cleanup.clle", "PGM\nENDPGM\n");
        scan(&mut graph, "qclsrc/helper.clle", "PGM\nENDPGM\n");
        scan(&mut graph, "qrpglesrc/done.pgm.rpgle", "**free\n");

        let renames = rename_suggestions(&graph);
        let expected: BTreeMap<PathBuf, PathBuf> = [
            ("qclsrc/cleanup.clle", "qclsrc/cleanup.pgm.clle"),
            ("qrpglesrc/PROTOS.RPGLE", "qrpglesrc/PROTOS.RPGLEINC"),
            ("qrpglesrc/ordent.rpgle", "qrpglesrc/ordent.pgm.rpgle"),
        ]
        .into_iter()
        .map(|(a, b)| (PathBuf::from(a), PathBuf::from(b)))
        .collect();
        assert_eq!(renames, expected);
    }

    #[test]
    fn test_case_follows_extension() {
        assert_eq!(match_case("RPGLE", "pgm"), "PGM");
        assert_eq!(match_case("Rpgle", "pgm"), "pgm");
        assert_eq!(
            with_program_infix(Path::new("x/A.CLLE")),
            Some(PathBuf::from("x/A.PGM.CLLE"))
        );
    }
}
