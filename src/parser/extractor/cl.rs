//
//  cl.rs
//  Orbit
//
//  Created by hak (tharun)
//

use super::helpers::*;
use super::{include_identity, Collector};
use crate::diagnostics::DiagnosticKind;
use crate::graph::types::*;
use crate::naming::ObjectType;

/// Special values that name a system-provided data area.
const LOCAL_DATA_AREAS: &[&str] = &["*LDA", "*GDA", "*PDA"];

pub(super) fn extract(c: &mut Collector, text: &str) {
    for command in cl_commands(text) {
        let body = strip_label(&command.text).to_string();
        scan_command(c, &command, &body, true);
    }
}

fn scan_command(c: &mut Collector, command: &Command, body: &str, top_level: bool) {
    let tokens = tokens(body);
    let Some(name) = tokens.first().map(|t| t.to_ascii_uppercase()) else {
        return;
    };
    let line = command.line;
    let positional = |n: usize| tokens.get(n).filter(|t| !t.contains('(')).cloned();

    match name.as_str() {
        "CALL" => {
            let operand = keyword_arg(body, "PGM").or_else(|| positional(1));
            match operand.as_deref().map(str::trim) {
                None | Some("") => c.malformed(line, "CALL without a program name"),
                Some(program) => {
                    let program = quoted(program).unwrap_or(program);
                    c.reference(unqualify(program), ObjectType::Program, EdgeKind::Call, line);
                }
            }
        }
        "CALLPRC" => {
            let operand = keyword_arg(body, "PRC").or_else(|| positional(1));
            match operand.as_deref().map(str::trim) {
                None | Some("") => c.malformed(line, "CALLPRC without a procedure name"),
                Some(procedure) if procedure.starts_with('&') => c.info(
                    line,
                    DiagnosticKind::UnresolvedReference,
                    format!("CALLPRC {procedure} is only known at run time"),
                ),
                Some(procedure) => match quoted(procedure) {
                    Some(literal) => c.import(literal),
                    None => c.import(&procedure.to_ascii_uppercase()),
                },
            }
        }
        "DCLF" => {
            if let Some(file) = keyword_arg(body, "FILE").or_else(|| positional(1)) {
                object(c, line, &file, ObjectType::File, EdgeKind::File);
            }
        }
        "OVRDBF" | "OVRDSPF" | "OVRPRTF" => {
            if let Some(file) = keyword_arg(body, "TOFILE") {
                object(c, line, &file, ObjectType::File, EdgeKind::File);
            }
        }
        "RTVDTAARA" | "CHGDTAARA" => {
            if let Some(arg) = keyword_arg(body, "DTAARA") {
                // DTAARA(LIB/NAME (start length))
                let first = arg.split_whitespace().next().unwrap_or("").to_string();
                if !LOCAL_DATA_AREAS.contains(&first.to_ascii_uppercase().as_str()) {
                    object(c, line, &first, ObjectType::DataArea, EdgeKind::DataArea);
                }
            }
        }
        "INCLUDE" => include(c, command, body),
        "SBMJOB" if top_level => {
            if let Some(inner) = keyword_arg(body, "CMD") {
                scan_command(c, command, &inner, false);
            }
        }
        _ => {}
    }

    if let Some(msgf) = keyword_arg(body, "MSGF") {
        object(c, line, &msgf, ObjectType::MessageFile, EdgeKind::MessageFile);
    }
}

/// Object operand that may be a special value (`*FILE`, `*LIBL/...`) or a variable.
fn object(c: &mut Collector, line: usize, operand: &str, object_type: ObjectType, kind: EdgeKind) {
    let operand = operand.trim();
    let name = unqualify(quoted(operand).unwrap_or(operand));
    if name.is_empty() || name.starts_with('*') {
        return;
    }
    c.reference(name, object_type, kind, line);
}

/// `INCLUDE SRCMBR(X) [SRCFILE([LIB/]F)]` or `INCLUDE SRCSTMF('path')`.
fn include(c: &mut Collector, command: &Command, body: &str) {
    let line = command.line;
    let target = if let Some(stmf) = keyword_arg(body, "SRCSTMF") {
        match quoted(&stmf).map(str::trim) {
            Some(path) if !path.is_empty() => IncludeTarget::Path {
                path: path.to_string(),
            },
            _ => {
                c.malformed(line, "INCLUDE SRCSTMF needs a quoted path");
                return;
            }
        }
    } else if let Some(member) = keyword_arg(body, "SRCMBR") {
        if member.is_empty() {
            c.malformed(line, "INCLUDE without a member name");
            return;
        }
        let (library, file) = match keyword_arg(body, "SRCFILE") {
            Some(srcfile) => match srcfile.split_once('/') {
                Some((lib, file)) => (Some(lib.trim().to_ascii_uppercase()), Some(file.trim().to_ascii_uppercase())),
                None => (None, Some(srcfile.trim().to_ascii_uppercase())),
            },
            None => (None, None),
        };
        IncludeTarget::Member {
            library: library.filter(|l| !l.starts_with('*')),
            file,
            member: member.to_ascii_uppercase(),
        }
    } else {
        c.malformed(line, "INCLUDE without SRCMBR or SRCSTMF");
        return;
    };

    let first = command.first_line.as_str();
    let indent_len = first.len() - first.trim_start().len();
    let keyword = first
        .trim_start()
        .split_whitespace()
        .next()
        .unwrap_or("INCLUDE")
        .to_string();
    let identity = include_identity(&target);
    c.include(IncludeDirective {
        line,
        text: first.to_string(),
        indent: first[..indent_len].to_string(),
        keyword,
        syntax: IncludeSyntax::ClInclude,
        target,
        identity,
    });
}
