//
//  includes.rs
//  Orbit
//
//  Created by hak (tharun)
//

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::LineEdit;
use crate::graph::{IncludeDirective, IncludeSyntax, IncludeTarget, ObjectGraph};
use crate::naming::{Language, SourceKind};

/// Rewrites for RPG and CL include directives that do not point at a local
/// source, when a local source of the same name exists.
///
/// Quoted paths are looked up relative to the root, the including file's
/// directory and each of `include_paths`.
pub(crate) fn include_fixes(
    graph: &ObjectGraph,
    root: &Path,
    include_paths: &[PathBuf],
) -> BTreeMap<PathBuf, Vec<LineEdit>> {
    let mut by_name: HashMap<&str, Vec<(&Path, SourceKind)>> = HashMap::new();
    for (identity, info) in graph.sources() {
        by_name
            .entry(identity.name.as_str())
            .or_default()
            .push((info.path.as_path(), info.kind));
    }

    let mut fixes: BTreeMap<PathBuf, Vec<LineEdit>> = BTreeMap::new();
    for (_, info) in graph.sources() {
        for directive in &info.includes {
            if directive.syntax == IncludeSyntax::CobolCopy || continues(directive) {
                continue;
            }
            if let IncludeTarget::Path { path } = &directive.target {
                if resolves_locally(root, &info.path, include_paths, path) {
                    continue;
                }
            }
            let Some(candidates) = by_name.get(directive.identity.name.as_str()) else {
                continue;
            };
            let family = match directive.syntax {
                IncludeSyntax::ClInclude => Language::Cl,
                _ => Language::Rpg,
            };
            let local = candidates
                .iter()
                .filter(|(path, kind)| *path != info.path && kind.language() == family)
                .min_by_key(|(path, kind)| (!kind.is_include(), *path));
            let Some((local, _)) = local else {
                continue;
            };

            let replacement = rewrite(directive, local);
            if replacement == directive.text {
                continue;
            }
            debug!(
                path = %info.path.display(),
                line = directive.line,
                target = %local.display(),
                "include fix suggested"
            );
            fixes.entry(info.path.clone()).or_default().push(LineEdit {
                line: directive.line,
                original: directive.text.clone(),
                replacement,
            });
        }
    }
    fixes
}

/// A CL command continued on the next line cannot be replaced line by line.
fn continues(directive: &IncludeDirective) -> bool {
    directive.syntax == IncludeSyntax::ClInclude
        && matches!(directive.text.trim_end().chars().last(), Some('+') | Some('-'))
}

fn resolves_locally(root: &Path, including: &Path, include_paths: &[PathBuf], path: &str) -> bool {
    let wanted = Path::new(path);
    if wanted.is_absolute() {
        return wanted.is_file();
    }
    let including_dir = including.parent().map(|p| root.join(p));
    std::iter::once(root.to_path_buf())
        .chain(including_dir)
        .chain(include_paths.iter().cloned())
        .any(|dir| dir.join(wanted).is_file())
}

fn rewrite(directive: &IncludeDirective, local: &Path) -> String {
    let path = local.to_string_lossy().replace('\\', "/");
    let mut line = match directive.syntax {
        IncludeSyntax::ClInclude => {
            format!("{}{} SRCSTMF('{}')", directive.indent, directive.keyword, path)
        }
        _ => format!("{}{} '{}'", directive.indent, directive.keyword, path),
    };
    let marker = match directive.syntax {
        IncludeSyntax::ClInclude => "/*",
        _ => "//",
    };
    if let Some(comment) = trailing_comment(&directive.text, marker) {
        line.push(' ');
        line.push_str(comment);
    }
    line
}

/// Comment starting at the first `marker` outside quotes.
fn trailing_comment<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let mut quote = false;
    for (i, ch) in text.char_indices() {
        match ch {
            '\'' => quote = !quote,
            _ if !quote && text[i..].starts_with(marker) => return Some(text[i..].trim_end()),
            _ => {}
        }
    }
    None
}
