//
//  cobol.rs
//  Orbit
//
//  Created by hak (tharun)
//

use once_cell::sync::Lazy;
use regex::Regex;

use super::helpers::*;
use super::{include_identity, sql, Collector};
use crate::diagnostics::DiagnosticKind;
use crate::graph::types::*;
use crate::naming::{ObjectType, SourceKind};

static COPY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^(\s*)(COPY)\b\s*('[^']*'?|"[^"]*"?|[A-Z0-9_$#@\-]+)?(?:\s+(?:OF|IN)\s+([A-Z0-9_$#@/\-]+))?"#)
        .expect("copy pattern")
});

static CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bCALL\s+((?:LINKAGE\s+(?:TYPE\s+)?(?:IS\s+)?)?(PROCEDURE|PRC|PROGRAM|PGM)?\s*)('[^']+'|[A-Z][A-Z0-9\-]*)")
        .expect("call pattern")
});

static ASSIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bASSIGN\s+(?:TO\s+)?(?:DATABASE|WORKSTATION|PRINTER|DISK|FORMATFILE)-([A-Z0-9_$#@]+)")
        .expect("assign pattern")
});

static EXEC_SQL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bEXEC\s+SQL\b(.*?)(\bEND-EXEC\b|$)").expect("exec sql pattern"));

pub(super) fn extract(c: &mut Collector, kind: SourceKind, text: &str) {
    let mut sql_block: Option<(usize, String)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        if matches!(column(raw, 7), Some('*') | Some('/')) {
            continue;
        }
        let code = columns(raw, 8, 72);
        if code.trim().is_empty() {
            continue;
        }

        if kind.has_embedded_sql() {
            if let Some((start, mut text)) = sql_block.take() {
                text.push(' ');
                match code.to_ascii_uppercase().find("END-EXEC") {
                    Some(end) => {
                        text.push_str(&code[..end]);
                        sql::scan_statement(c, start, &text);
                    }
                    None => {
                        text.push_str(code);
                        sql_block = Some((start, text));
                    }
                }
                continue;
            }
            if let Some(caps) = EXEC_SQL.captures(code) {
                let body = caps.get(1).map_or("", |m| m.as_str()).to_string();
                if caps.get(2).is_some_and(|m| !m.as_str().is_empty()) {
                    sql::scan_statement(c, line, &body);
                } else {
                    sql_block = Some((line, body));
                }
                continue;
            }
        }

        if let Some(caps) = COPY.captures(code).filter(|caps| is_copy_statement(code, caps)) {
            copy_statement(c, line, raw, &caps);
            continue;
        }

        for caps in CALL.captures_iter(code) {
            let bound = caps
                .get(2)
                .is_some_and(|m| matches!(m.as_str().to_ascii_uppercase().as_str(), "PROCEDURE" | "PRC"));
            let operand = caps.get(3).map_or("", |m| m.as_str());
            match (quoted(operand), bound) {
                (Some(procedure), true) => c.import(procedure),
                (Some(program), false) => {
                    c.reference(unqualify(program), ObjectType::Program, EdgeKind::Call, line);
                }
                (None, _) => c.info(
                    line,
                    DiagnosticKind::UnresolvedReference,
                    format!("CALL {operand} is only known at run time"),
                ),
            }
        }

        for caps in ASSIGN.captures_iter(code) {
            if let Some(file) = caps.get(1) {
                c.reference(file.as_str(), ObjectType::File, EdgeKind::File, line);
            }
        }
    }

    if let Some((start, text)) = sql_block {
        sql::scan_statement(c, start, &text);
    }
}

/// `COPY` followed by a blank, a period or the end of the line; not a data name like `COPY-FLAG`.
fn is_copy_statement(code: &str, caps: &regex::Captures) -> bool {
    let end = caps.get(2).map_or(0, |m| m.end());
    code[end..]
        .chars()
        .next()
        .map_or(true, |ch| ch.is_whitespace() || ch == '.')
}

fn copy_statement(c: &mut Collector, line: usize, raw: &str, caps: &regex::Captures) {
    let Some(operand) = caps.get(3).map(|m| m.as_str().trim_end_matches('.')) else {
        c.malformed(line, "COPY without a member name");
        return;
    };
    let library_file = caps.get(4).map(|m| m.as_str().trim_end_matches('.').to_ascii_uppercase());

    let upper = operand.to_ascii_uppercase();
    if upper.starts_with("DDS-") || upper.starts_with("DDSR-") {
        // COPY DDS-ALL-FORMATS OF CUSTMAST
        match library_file {
            Some(file) => {
                c.reference(unqualify(&file), ObjectType::File, EdgeKind::File, line);
            }
            None => c.malformed(line, "COPY DDS needs OF or IN with a file name"),
        }
        return;
    }

    let target = if operand.starts_with('\'') || operand.starts_with('"') {
        match quoted(operand) {
            Some(path) if !path.trim().is_empty() => IncludeTarget::Path {
                path: path.trim().to_string(),
            },
            Some(_) => {
                c.malformed(line, "COPY with an empty path");
                return;
            }
            None => {
                c.malformed(line, "COPY path has an unterminated quote");
                return;
            }
        }
    } else {
        let (library, file) = match library_file.as_deref().map(|f| f.split_once('/')) {
            Some(Some((lib, file))) => (Some(lib.to_string()), Some(file.to_string())),
            Some(None) => (None, library_file.clone()),
            None => (None, None),
        };
        IncludeTarget::Member {
            library,
            file,
            member: upper,
        }
    };

    // the sequence area and indicator column count as indent
    let prefix = columns(raw, 1, 7);
    let indent = format!("{prefix}{}", caps.get(1).map_or("", |m| m.as_str()));
    let identity = include_identity(&target);
    c.include(IncludeDirective {
        line,
        text: raw.to_string(),
        indent,
        keyword: caps.get(2).map_or("COPY", |m| m.as_str()).to_string(),
        syntax: IncludeSyntax::CobolCopy,
        target,
        identity,
    });
}
