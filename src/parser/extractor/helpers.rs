//
//  helpers.rs
//  Orbit
//
//  Created by hak (tharun)
//

use once_cell::sync::Lazy;
use regex::Regex;

use crate::naming::MAX_NAME_LEN;

static CL_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[A-Za-z$#@][A-Za-z0-9_$#@]*:\s*").expect("label pattern"));

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '$' | '#' | '@' | '*')
}

/// Byte offsets of `keyword` in `text` as a whole word, case-insensitively.
pub fn find_keyword(text: &str, keyword: &str) -> Vec<usize> {
    let upper = text.to_ascii_uppercase();
    let keyword = keyword.to_ascii_uppercase();
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(pos) = upper[from..].find(&keyword) {
        let start = from + pos;
        let end = start + keyword.len();
        let before_ok = upper[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !is_word_char(c));
        let after_ok = upper[end..].chars().next().map_or(true, |c| !is_word_char(c));
        if before_ok && after_ok {
            found.push(start);
        }
        from = end;
    }
    found
}

pub fn has_keyword(text: &str, keyword: &str) -> bool {
    !find_keyword(text, keyword).is_empty()
}

/// Contents of every `KEYWORD( ... )` in `text`, honoring nested parentheses and quotes.
pub fn keyword_args(text: &str, keyword: &str) -> Vec<String> {
    let mut args = Vec::new();
    for start in find_keyword(text, keyword) {
        let rest = &text[start + keyword.len()..];
        let trimmed = rest.trim_start();
        if !trimmed.starts_with('(') {
            continue;
        }
        if let Some(inner) = balanced_inner(trimmed) {
            args.push(inner.to_string());
        }
    }
    args
}

/// First `KEYWORD( ... )` argument, trimmed.
pub fn keyword_arg(text: &str, keyword: &str) -> Option<String> {
    keyword_args(text, keyword)
        .into_iter()
        .next()
        .map(|a| a.trim().to_string())
}

/// Given text starting with `(`, the text up to the matching `)`.
/// An unbalanced group yields everything after the opening parenthesis.
fn balanced_inner(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(&text[1..i]);
                    }
                }
                _ => {}
            },
        }
    }
    text.get(1..)
}

/// Split on `sep` outside quotes and parentheses.
pub fn split_params(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                current.push(c);
            }
            None => {
                if c == sep && depth == 0 {
                    parts.push(current.trim().to_string());
                    current.clear();
                    continue;
                }
                match c {
                    '\'' | '"' => quote = Some(c),
                    '(' => depth += 1,
                    ')' => depth = depth.saturating_sub(1),
                    _ => {}
                }
                current.push(c);
            }
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Whitespace-separated tokens outside quotes and parentheses.
pub fn tokens(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                current.push(c);
            }
            None => {
                if c.is_whitespace() && depth == 0 {
                    if !current.is_empty() {
                        out.push(std::mem::take(&mut current));
                    }
                    continue;
                }
                match c {
                    '\'' | '"' => quote = Some(c),
                    '(' => depth += 1,
                    ')' => depth = depth.saturating_sub(1),
                    _ => {}
                }
                current.push(c);
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Inner text of a quoted literal (`'x'` or `"x"`).
pub fn quoted(text: &str) -> Option<&str> {
    let t = text.trim();
    let q = t.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let rest = &t[1..];
    rest.find(q).map(|end| &rest[..end])
}

/// Strip a library qualifier: `LIB/NAME` → `NAME`.
pub fn unqualify(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name).trim()
}

/// Identity name for a stream file path, as the naming resolver would derive it.
pub fn path_base_name(path: &str) -> String {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let base = file.split('.').next().unwrap_or(file);
    base.chars().take(MAX_NAME_LEN).collect()
}

/// Remove an RPG `//` comment that is outside quotes.
pub fn strip_rpg_comment(line: &str) -> &str {
    let mut quote = false;
    let bytes = line.as_bytes();
    for i in 0..bytes.len() {
        match bytes[i] {
            b'\'' => quote = !quote,
            b'/' if !quote && bytes.get(i + 1) == Some(&b'/') => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Columns `from..=to` (1-based) of a fixed-format line, empty when out of range.
pub fn columns(line: &str, from: usize, to: usize) -> &str {
    let start = from.saturating_sub(1);
    if start >= line.len() {
        return "";
    }
    let end = to.min(line.len());
    line.get(start..end).unwrap_or("")
}

/// Character at a 1-based column.
pub fn column(line: &str, col: usize) -> Option<char> {
    line.as_bytes().get(col.wrapping_sub(1)).map(|b| *b as char)
}

/// A CL-style command with the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub line: usize,
    /// First physical line, as written.
    pub first_line: String,
    pub text: String,
}

/// Split CL or binder language text into commands: `/* */` comments removed,
/// `+` and `-` continuations joined.
pub fn cl_commands(text: &str) -> Vec<Command> {
    let mut commands = Vec::new();
    let mut in_comment = false;
    let mut pending: Option<Command> = None;

    for (idx, raw) in text.lines().enumerate() {
        let mut code = String::new();
        let mut quote = false;
        let chars: Vec<char> = raw.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();
            if in_comment {
                if c == '*' && next == Some('/') {
                    in_comment = false;
                    i += 1;
                }
            } else if !quote && c == '/' && next == Some('*') {
                in_comment = true;
                i += 1;
            } else {
                if c == '\'' {
                    quote = !quote;
                }
                code.push(c);
            }
            i += 1;
        }

        let trimmed = code.trim_end();
        let (body, continues) = match trimmed.chars().last() {
            Some('+') | Some('-') => (&trimmed[..trimmed.len() - 1], true),
            _ => (trimmed, false),
        };

        match pending.as_mut() {
            Some(cmd) => {
                cmd.text.push(' ');
                cmd.text.push_str(body.trim());
            }
            None => {
                if body.trim().is_empty() && !continues {
                    continue;
                }
                pending = Some(Command {
                    line: idx + 1,
                    first_line: raw.to_string(),
                    text: body.trim().to_string(),
                });
            }
        }

        if !continues {
            if let Some(cmd) = pending.take() {
                if !cmd.text.trim().is_empty() {
                    commands.push(cmd);
                }
            }
        }
    }

    if let Some(cmd) = pending {
        if !cmd.text.trim().is_empty() {
            commands.push(cmd);
        }
    }
    commands
}

/// Drop a leading `LABEL:` from a CL command.
pub fn strip_label(text: &str) -> &str {
    match CL_LABEL.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_args() {
        let text = "dcl-pr run extpgm('ORDLIB/ORDENT') extproc(*dclcase);";
        assert_eq!(keyword_arg(text, "extpgm").as_deref(), Some("'ORDLIB/ORDENT'"));
        assert_eq!(keyword_arg(text, "EXTPROC").as_deref(), Some("*dclcase"));
        assert_eq!(keyword_arg(text, "pr"), None);
        assert!(has_keyword(text, "EXTPGM"));
        // part of a longer word is not a match
        assert!(!has_keyword("dcl-proc x;", "proc"));
    }

    #[test]
    fn test_nested_args() {
        let text = "DTAARA(MYLIB/CFG (1 10)) RTNVAR(&X)";
        assert_eq!(keyword_arg(text, "DTAARA").as_deref(), Some("MYLIB/CFG (1 10)"));
    }

    #[test]
    fn test_split_params_and_tokens() {
        assert_eq!(split_params("'A':'B:C'", ':'), vec!["'A'", "'B:C'"]);
        assert_eq!(tokens("CALL PGM(A B) PARM('x y')"), vec!["CALL", "PGM(A B)", "PARM('x y')"]);
    }

    #[test]
    fn test_quoted_and_unqualify() {
        assert_eq!(quoted("'lib/b.rpgleinc'"), Some("lib/b.rpgleinc"));
        assert_eq!(quoted("'open"), None);
        assert_eq!(quoted("name"), None);
        assert_eq!(unqualify("*LIBL/EMPS"), "EMPS");
        assert_eq!(path_base_name("qprotosrc/Orders.pgm.rpgleinc"), "Orders");
    }

    #[test]
    fn test_strip_rpg_comment() {
        assert_eq!(strip_rpg_comment("dcl-s a int(10); // note"), "dcl-s a int(10); ");
        assert_eq!(strip_rpg_comment("url = 'http://x';"), "url = 'http://x';");
    }

    #[test]
    fn test_columns() {
        let line = "     FEMPS      IF   E           K DISK";
        assert_eq!(column(line, 6), Some('F'));
        assert_eq!(columns(line, 7, 16).trim(), "EMPS");
        assert_eq!(columns("short", 7, 16), "");
    }

    #[test]
    fn test_cl_commands_join_and_comments() {
        let text = "PGM\n/* a comment */\n  CALL PGM(MYLIB/ +\n     ORDENT)\nLOOP: DCLF FILE(EMPS) /* x */\nENDPGM\n";
        let cmds = cl_commands(text);
        let texts: Vec<&str> = cmds.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["PGM", "CALL PGM(MYLIB/ ORDENT)", "LOOP: DCLF FILE(EMPS)", "ENDPGM"]);
        assert_eq!(cmds[1].line, 3);
        assert_eq!(strip_label(&cmds[2].text), "DCLF FILE(EMPS)");
    }
}
