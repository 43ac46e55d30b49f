//! Advisory passes over a built graph: file renames that make the naming
//! resolver's guess unnecessary, and include directives rewritten to point at
//! local sources. Nothing here mutates the graph or the file system.

mod includes;
mod rename;

pub(crate) use includes::include_fixes;
pub(crate) use rename::rename_suggestions;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Proposed replacement of one source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineEdit {
    /// 1-based line number.
    pub line: usize,
    pub original: String,
    pub replacement: String,
}

impl LineEdit {
    /// Apply `edits` to `text`. An edit whose line no longer reads as
    /// `original` is skipped. Line endings are kept as they are.
    pub fn apply(text: &str, edits: &[LineEdit]) -> String {
        let mut out = String::with_capacity(text.len());
        for (idx, chunk) in text.split_inclusive('\n').enumerate() {
            let body = chunk.strip_suffix('\n').unwrap_or(chunk);
            let body = body.strip_suffix('\r').unwrap_or(body);
            let edit = edits
                .iter()
                .find(|e| e.line == idx + 1 && e.original == body);
            match edit {
                Some(edit) => {
                    out.push_str(&edit.replacement);
                    out.push_str(&chunk[body.len()..]);
                }
                None => out.push_str(chunk),
            }
        }
        out
    }
}

/// Output of the suggestion passes, keyed by relative source path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestions {
    pub renames: BTreeMap<PathBuf, PathBuf>,
    pub include_fixes: BTreeMap<PathBuf, Vec<LineEdit>>,
}

impl Suggestions {
    pub fn is_empty(&self) -> bool {
        self.renames.is_empty() && self.include_fixes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_skips_stale_edits() {
        let text = "a\n/copy QRPGLESRC,B\nc\n";
        let edits = vec![
            LineEdit {
                line: 2,
                original: "/copy QRPGLESRC,B".into(),
                replacement: "/copy 'qrpglesrc/b.rpgleinc'".into(),
            },
            LineEdit {
                line: 3,
                original: "changed since".into(),
                replacement: "x".into(),
            },
            LineEdit {
                line: 9,
                original: "".into(),
                replacement: "y".into(),
            },
        ];
        assert_eq!(
            LineEdit::apply(text, &edits),
            "a\n/copy 'qrpglesrc/b.rpgleinc'\nc\n"
        );
    }

    #[test]
    fn test_apply_keeps_crlf_endings() {
        let edits = vec![LineEdit {
            line: 2,
            original: "/copy QRPGLESRC,B".into(),
            replacement: "/copy 'b.rpgleinc'".into(),
        }];
        assert_eq!(
            LineEdit::apply("a\r\n/copy QRPGLESRC,B\r\nc\r\n", &edits),
            "a\r\n/copy 'b.rpgleinc'\r\nc\r\n"
        );
        // no terminator on the last line
        assert_eq!(
            LineEdit::apply("a\n/copy QRPGLESRC,B", &edits),
            "a\n/copy 'b.rpgleinc'"
        );
    }
}
