//
//  rpg.rs
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

/// `/COPY` or `/INCLUDE`, in any column, optionally after a sequence area.
/// The sequence area holds blanks, digits or change tags, never `//`.
static COPY_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\s*|[ \w]{5}\s*)(/(?:copy|include))(?:\s+(.*))?$").expect("copy pattern")
});

/// Fixed-form prototype waiting for its keyword continuation lines.
struct Prototype {
    name: String,
    line: usize,
    keywords: String,
}

struct RpgState {
    embedded_sql: bool,
    /// Free-form statement collected up to its `;`.
    statement: Option<(usize, String)>,
    prototype: Option<Prototype>,
    /// Fixed-form `C/EXEC SQL` block.
    sql: Option<(usize, String)>,
}

pub(super) fn extract(c: &mut Collector, kind: SourceKind, text: &str) {
    let mut state = RpgState {
        embedded_sql: kind.has_embedded_sql(),
        statement: None,
        prototype: None,
        sql: None,
    };

    let fully_free = text
        .lines()
        .next()
        .is_some_and(|l| l.to_ascii_uppercase().starts_with("**FREE"));

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        if raw.starts_with("**") {
            if line == 1 && fully_free {
                continue;
            }
            // compile-time data follows
            break;
        }

        if let Some(caps) = COPY_DIRECTIVE.captures(raw) {
            state.flush_prototype(c);
            copy_directive(c, line, raw, &caps);
            continue;
        }

        if fully_free {
            state.free_code(c, line, raw);
            continue;
        }

        let spec = column(raw, 6)
            .map(|ch| ch.to_ascii_uppercase())
            .filter(|ch| "HFDPCIO".contains(*ch));
        match (spec, column(raw, 7)) {
            (_, Some('*')) => continue,
            (Some('C'), Some('/')) | (Some('C'), Some('+')) => {
                state.fixed_sql(c, line, raw);
                continue;
            }
            (_, Some('/')) => continue,
            _ => {}
        }

        match spec {
            Some(spec) => state.fixed_spec(c, line, raw, spec),
            None => state.free_code(c, line, columns(raw, 8, 100)),
        }
    }

    state.finish(c);
}

fn copy_directive(c: &mut Collector, line: usize, raw: &str, caps: &regex::Captures) {
    let operand = caps.get(3).map_or("", |m| m.as_str());
    match parse_copy_operand(operand) {
        Ok(target) => {
            let identity = include_identity(&target);
            c.include(IncludeDirective {
                line,
                text: raw.to_string(),
                indent: caps.get(1).map_or("", |m| m.as_str()).to_string(),
                keyword: caps.get(2).map_or("", |m| m.as_str()).to_string(),
                syntax: IncludeSyntax::RpgCopy,
                target,
                identity,
            });
        }
        Err(reason) => c.malformed(line, format!("copy directive: {reason}")),
    }
}

/// Operand of `/COPY`: quoted path, `[LIB/]FILE,MEMBER`, bare member or unquoted path.
pub(crate) fn parse_copy_operand(operand: &str) -> Result<IncludeTarget, &'static str> {
    let operand = strip_rpg_comment(operand).trim();
    if operand.is_empty() {
        return Err("missing member name");
    }

    if operand.starts_with('\'') || operand.starts_with('"') {
        return match quoted(operand) {
            Some(path) if !path.trim().is_empty() => Ok(IncludeTarget::Path {
                path: path.trim().to_string(),
            }),
            Some(_) => Err("empty path"),
            None => Err("unterminated quote"),
        };
    }

    let token = operand.split_whitespace().next().unwrap_or(operand);
    if let Some((qualifier, member)) = token.rsplit_once(',') {
        let member = member.trim();
        if member.is_empty() {
            return Err("missing member name");
        }
        let (library, file) = match qualifier.split_once('/') {
            Some((library, file)) => (Some(library), file),
            None => (None, qualifier),
        };
        let upper = |s: &str| Some(s.trim().to_ascii_uppercase()).filter(|s| !s.is_empty());
        return Ok(IncludeTarget::Member {
            library: library.and_then(upper),
            file: upper(file),
            member: member.to_ascii_uppercase(),
        });
    }

    if token.contains('/') || token.contains('.') {
        return Ok(IncludeTarget::Path {
            path: token.to_string(),
        });
    }
    Ok(IncludeTarget::Member {
        library: None,
        file: None,
        member: token.to_ascii_uppercase(),
    })
}

/// Byte offset of `needle` outside quotes.
fn find_unquoted(text: &str, needle: char) -> Option<usize> {
    let mut quote = false;
    for (i, ch) in text.char_indices() {
        match ch {
            '\'' => quote = !quote,
            _ if ch == needle && !quote => return Some(i),
            _ => {}
        }
    }
    None
}

impl RpgState {
    fn free_code(&mut self, c: &mut Collector, line: usize, code: &str) {
        let code = strip_rpg_comment(code);
        if self.statement.is_none() && code.trim_start().starts_with('/') {
            // compiler directive such as /IF or /EJECT
            return;
        }
        let mut rest = code;
        while !rest.trim().is_empty() {
            let (start, mut buffer) = self
                .statement
                .take()
                .unwrap_or_else(|| (line, String::new()));
            buffer.push(' ');
            match find_unquoted(rest, ';') {
                Some(pos) => {
                    buffer.push_str(&rest[..pos]);
                    self.statement_done(c, start, buffer.trim());
                    rest = &rest[pos + 1..];
                }
                None => {
                    buffer.push_str(rest);
                    self.statement = Some((start, buffer));
                    break;
                }
            }
        }
    }

    fn statement_done(&mut self, c: &mut Collector, line: usize, statement: &str) {
        self.flush_prototype(c);
        let words: Vec<&str> = statement.split_whitespace().collect();
        let Some(opcode) = words.first().map(|w| w.to_ascii_lowercase()) else {
            return;
        };
        let name = words.get(1).copied().unwrap_or("");

        match opcode.as_str() {
            "ctl-opt" => control_options(c, line, statement),
            "dcl-f" if !name.is_empty() => file_declaration(c, line, name, statement),
            "dcl-pr" if !name.is_empty() && !name.starts_with('*') => {
                prototype(c, line, name, statement)
            }
            "dcl-proc" if !name.is_empty() => {
                if let Some(arg) = keyword_arg(statement, "EXPORT") {
                    if arg.eq_ignore_ascii_case("*DCLCASE") {
                        c.export(name);
                    } else {
                        c.export(&name.to_ascii_uppercase());
                    }
                } else if has_keyword(statement, "EXPORT") {
                    c.export(&name.to_ascii_uppercase());
                }
            }
            "exec" if name.eq_ignore_ascii_case("sql") => {
                if self.embedded_sql {
                    let body = statement
                        .splitn(3, char::is_whitespace)
                        .nth(2)
                        .unwrap_or("");
                    sql::scan_statement(c, line, body);
                }
                return;
            }
            _ => {}
        }
        common_keywords(c, line, statement, false);
    }

    fn fixed_spec(&mut self, c: &mut Collector, line: usize, raw: &str, spec: char) {
        let keywords = columns(raw, 44, 100);
        match spec {
            'H' => {
                self.flush_prototype(c);
                control_options(c, line, columns(raw, 7, 100));
            }
            'F' => {
                self.flush_prototype(c);
                let name = columns(raw, 7, 16).trim();
                if !name.is_empty() {
                    file_declaration(c, line, name, keywords);
                }
            }
            'D' => {
                let name = columns(raw, 7, 21).trim();
                let declaration = columns(raw, 24, 25).trim().to_ascii_uppercase();
                if !name.is_empty() || !declaration.is_empty() {
                    self.flush_prototype(c);
                }
                if declaration == "PR" && !name.is_empty() {
                    self.prototype = Some(Prototype {
                        name: name.to_string(),
                        line,
                        keywords: keywords.to_string(),
                    });
                    return;
                }
                if let Some(proto) = self.prototype.as_mut() {
                    proto.keywords.push(' ');
                    proto.keywords.push_str(keywords);
                    return;
                }
                common_keywords(c, line, keywords, true);
            }
            'P' => {
                self.flush_prototype(c);
                let name = columns(raw, 7, 21).trim();
                let begin = column(raw, 24).is_some_and(|ch| ch.eq_ignore_ascii_case(&'B'));
                if begin && !name.is_empty() && has_keyword(keywords, "EXPORT") {
                    c.export(&name.to_ascii_uppercase());
                }
            }
            'C' => {
                self.flush_prototype(c);
                calculation(c, line, raw);
            }
            _ => self.flush_prototype(c),
        }
    }

    /// `C/EXEC SQL`, `C+` continuation and `C/END-EXEC` lines.
    fn fixed_sql(&mut self, c: &mut Collector, line: usize, raw: &str) {
        let body = columns(raw, 8, 100);
        let upper = body.trim().to_ascii_uppercase();
        if column(raw, 7) == Some('+') {
            if let Some((_, text)) = self.sql.as_mut() {
                text.push(' ');
                text.push_str(body.trim());
            }
            return;
        }
        if upper.starts_with("EXEC SQL") {
            let rest = body.trim().get(8..).unwrap_or("");
            self.sql = Some((line, rest.to_string()));
        } else if upper.starts_with("END-EXEC") {
            if let Some((start, text)) = self.sql.take() {
                if self.embedded_sql {
                    sql::scan_statement(c, start, &text);
                }
            }
        }
    }

    fn flush_prototype(&mut self, c: &mut Collector) {
        if let Some(proto) = self.prototype.take() {
            prototype(c, proto.line, &proto.name, &proto.keywords);
        }
    }

    fn finish(mut self, c: &mut Collector) {
        if let Some((line, statement)) = self.statement.take() {
            self.statement_done(c, line, statement.trim());
        }
        self.flush_prototype(c);
    }
}

/// `ctl-opt` or H-spec keywords.
fn control_options(c: &mut Collector, line: usize, keywords: &str) {
    if has_keyword(keywords, "NOMAIN") {
        c.set_no_main();
    }
    for arg in keyword_args(keywords, "BNDDIR") {
        for param in split_params(&arg, ':') {
            match quoted(&param) {
                Some(name) => {
                    c.reference(
                        unqualify(name),
                        ObjectType::BindingDirectory,
                        EdgeKind::BindingDirectory,
                        line,
                    );
                }
                None => c.unresolved(line, format!("BNDDIR entry {param} is not a literal")),
            }
        }
    }
}

fn file_declaration(c: &mut Collector, line: usize, name: &str, keywords: &str) {
    let described = keyword_arg(keywords, "EXTDESC")
        .and_then(|arg| quoted(&arg).map(|q| unqualify(q).to_string()));
    let file = described.as_deref().unwrap_or(name);
    c.reference(file, ObjectType::File, EdgeKind::File, line);
}

/// Keywords that name objects wherever they appear: EXTNAME and DTAARA.
fn common_keywords(c: &mut Collector, line: usize, keywords: &str, fixed: bool) {
    for arg in keyword_args(keywords, "EXTNAME") {
        let params = split_params(&arg, ':');
        let Some(first) = params.first() else {
            continue;
        };
        let name = quoted(first).unwrap_or(first);
        c.reference(unqualify(name), ObjectType::File, EdgeKind::File, line);
    }

    for arg in keyword_args(keywords, "DTAARA") {
        let params = split_params(&arg, ':');
        // *AUTO / *USRCTL / *VAR options come first in free form
        let named = params.iter().find_map(|p| match quoted(p) {
            Some(q) => Some(q.to_string()),
            None if fixed && !p.starts_with('*') => Some(p.clone()),
            None => None,
        });
        if let Some(name) = named {
            c.reference(unqualify(&name), ObjectType::DataArea, EdgeKind::DataArea, line);
        }
    }
}

/// EXTPGM, EXTPROC or the prototype name itself.
fn prototype(c: &mut Collector, line: usize, name: &str, keywords: &str) {
    if has_keyword(keywords, "EXTPGM") {
        match keyword_arg(keywords, "EXTPGM") {
            None => {
                c.reference(name, ObjectType::Program, EdgeKind::Call, line);
            }
            Some(arg) if arg.is_empty() => {
                c.reference(name, ObjectType::Program, EdgeKind::Call, line);
            }
            Some(arg) => match quoted(&arg) {
                Some(program) => {
                    c.reference(unqualify(program), ObjectType::Program, EdgeKind::Call, line);
                }
                None => c.info(
                    line,
                    DiagnosticKind::UnresolvedReference,
                    format!("EXTPGM({arg}) on {name} is only known at run time"),
                ),
            },
        }
        return;
    }

    if let Some(arg) = keyword_arg(keywords, "EXTPROC") {
        let params = split_params(&arg, ':');
        if params
            .first()
            .is_some_and(|p| p.eq_ignore_ascii_case("*JAVA"))
        {
            return;
        }
        match params.last() {
            Some(target) => match quoted(target) {
                Some(procedure) => c.import(procedure),
                None if target.eq_ignore_ascii_case("*DCLCASE") => c.import(name),
                None => c.info(
                    line,
                    DiagnosticKind::UnresolvedReference,
                    format!("EXTPROC({target}) on {name} is a procedure pointer"),
                ),
            },
            None => c.import(&name.to_ascii_uppercase()),
        }
        return;
    }

    c.import(&name.to_ascii_uppercase());
}

/// Fixed-form C-spec: CALL, CALLB and `*DTAARA DEFINE`.
fn calculation(c: &mut Collector, line: usize, raw: &str) {
    let opcode = columns(raw, 26, 35).trim().to_ascii_uppercase();
    let opcode = opcode.split('(').next().unwrap_or("");
    let factor1 = columns(raw, 12, 25).trim();
    let factor2 = columns(raw, 36, 49).trim();
    if factor2.is_empty() {
        return;
    }

    match opcode {
        "CALL" => match quoted(factor2) {
            Some(program) => {
                c.reference(unqualify(program), ObjectType::Program, EdgeKind::Call, line);
            }
            None => c.info(
                line,
                DiagnosticKind::UnresolvedReference,
                format!("CALL {factor2} is only known at run time"),
            ),
        },
        "CALLB" => match quoted(factor2) {
            Some(procedure) => c.import(procedure),
            None => c.info(
                line,
                DiagnosticKind::UnresolvedReference,
                format!("CALLB {factor2} is a procedure pointer"),
            ),
        },
        "DEFINE" if factor1.eq_ignore_ascii_case("*DTAARA") => {
            let name = quoted(factor2).unwrap_or(factor2);
            c.reference(unqualify(name), ObjectType::DataArea, EdgeKind::DataArea, line);
        }
        _ => {}
    }
}
