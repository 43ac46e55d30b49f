//
//  dds.rs
//  Orbit
//
//  Created by hak (tharun)
//

use super::helpers::*;
use super::Collector;
use crate::graph::types::EdgeKind;
use crate::naming::ObjectType;

/// Keywords start in column 45 of an A-spec.
const KEYWORD_COLUMN: usize = 45;

pub(super) fn extract(c: &mut Collector, text: &str) {
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        if column(raw, 7) == Some('*') {
            continue;
        }
        let keywords = columns(raw, KEYWORD_COLUMN, 80);
        if keywords.trim().is_empty() {
            continue;
        }

        // REF([LIB/]FILE [RCDFMT])
        for arg in keyword_args(keywords, "REF") {
            if let Some(file) = tokens(&arg).first() {
                file_ref(c, line, file);
            }
        }
        // REFFLD([RCD/]FIELD [[LIB/]FILE])
        for arg in keyword_args(keywords, "REFFLD") {
            if let Some(file) = tokens(&arg).get(1) {
                file_ref(c, line, file);
            }
        }
        for keyword in ["PFILE", "JFILE"] {
            for arg in keyword_args(keywords, keyword) {
                for file in tokens(&arg) {
                    file_ref(c, line, &file);
                }
            }
        }
    }
}

fn file_ref(c: &mut Collector, line: usize, operand: &str) {
    let name = unqualify(operand);
    if name.is_empty() || name.starts_with('*') || name.starts_with('&') {
        return;
    }
    c.reference(name, ObjectType::File, EdgeKind::File, line);
}

#[cfg(test)]
mod tests {
    use super::super::extract_source;
    use crate::graph::types::Extraction;
    use crate::naming::{ObjectIdentity, ObjectType, SourceKind};
    use std::path::Path;

    fn run(kind: SourceKind, text: &str) -> Extraction {
        let owner = ObjectIdentity::new("OWNER", ObjectType::File);
        extract_source(Path::new("owner.lf"), kind, &owner, text)
    }

    fn targets(out: &Extraction) -> Vec<String> {
        out.references.iter().map(|r| r.target.to_string()).collect()
    }

    /// Pad the name area so `keywords` starts in column 45.
    fn spec(name_area: &str, keywords: &str) -> String {
        format!("{name_area:<44}{keywords}\n")
    }

    #[test]
    fn test_logical_file_keywords() {
        let mut text = String::new();
        text.push_str("     A* PFILE(COMMENTED)\n");
        text.push_str(&spec("     A                                 ", "REF(MYLIB/FLDREF)"));
        text.push_str(&spec("     A          R CUSTR", "PFILE(CUSTMAST)"));
        text.push_str(&spec("     A            CUSTNO    R", "REFFLD(CUSTNO *SRC)"));
        text.push_str(&spec("     A            ORDNO     R", "REFFLD(ORDR/ORDNO ORDERS)"));
        text.push_str(&spec("     A          R JOINR", "JFILE(CUSTMAST ORDERS)"));
        let out = run(SourceKind::LogicalFile, &text);
        assert_eq!(targets(&out), vec!["FLDREF.FILE", "CUSTMAST.FILE", "ORDERS.FILE"]);
        assert_eq!(out.references[1].line, 3);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_short_lines_are_ignored() {
        let out = run(SourceKind::DisplayFile, "     A          R SCREEN\n");
        assert!(out.references.is_empty());
    }
}
