//
//  sql.rs
//  Orbit
//
//  Created by hak (tharun)
//

use super::Collector;
use crate::graph::types::EdgeKind;
use crate::naming::{ObjectType, MAX_NAME_LEN};

/// Words that can follow FROM/JOIN without being a table name.
const NOT_A_TABLE: &[&str] = &[
    "SELECT", "TABLE", "LATERAL", "UNNEST", "FINAL", "NEW", "OLD", "XMLTABLE", "JSON_TABLE",
    "VALUES", "DUAL",
];

/// Words that end a FROM list rather than naming an alias.
const CLAUSE_WORDS: &[&str] = &[
    "WHERE", "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "EXCEPTION", "ON", "GROUP",
    "ORDER", "HAVING", "UNION", "EXCEPT", "INTERSECT", "FETCH", "LIMIT", "OFFSET", "FOR", "WITH",
    "SET", "USING", "WHEN", "THEN", "ELSE", "END", "NATURAL", "WINDOW", "OPTIMIZE", "SKIP",
    "RETURN", "INTO", "VALUES", "AND", "OR",
];

/// Scalar functions whose argument syntax uses FROM.
const FROM_FUNCTIONS: &[&str] = &["EXTRACT", "TRIM", "SUBSTRING", "OVERLAY", "POSITION"];

/// Catalog schemas whose objects are never project sources.
const SYSTEM_SCHEMAS: &[&str] = &[
    "SYSIBM", "SYSIBMADM", "QSYS", "QSYS2", "SYSTOOLS", "SYSPROC", "SYSCAT", "SYSSTAT", "SYSFUN",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Identifier or keyword, possibly qualified with `.` or `/`.
    Word(String),
    /// `'literal'`
    Quoted(String),
    /// `"Delimited identifier"`
    Delimited(String),
    Punct(char),
}

impl Token {
    fn keyword(&self) -> Option<String> {
        match self {
            Token::Word(w) => Some(w.to_ascii_uppercase()),
            _ => None,
        }
    }

    fn is_keyword(&self, kw: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(kw))
    }
}

fn is_word_start(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '$' | '#' | '@')
}

fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if ch.is_whitespace() {
            i += 1;
        } else if ch == '\'' || ch == '"' {
            let mut value = String::new();
            i += 1;
            while i < chars.len() {
                if chars[i] == ch {
                    // doubled quote is an escaped quote
                    if chars.get(i + 1) == Some(&ch) {
                        value.push(ch);
                        i += 2;
                        continue;
                    }
                    break;
                }
                value.push(chars[i]);
                i += 1;
            }
            i += 1;
            tokens.push(if ch == '\'' {
                Token::Quoted(value)
            } else {
                Token::Delimited(value)
            });
        } else if is_word_start(ch) {
            let start = i;
            while i < chars.len() && (is_word_start(chars[i]) || matches!(chars[i], '.' | '/')) {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
        } else {
            tokens.push(Token::Punct(ch));
            i += 1;
        }
    }
    tokens
}

/// Scan a script: `--` and `/* */` comments stripped, statements split on `;`.
pub(super) fn extract(c: &mut Collector, text: &str) {
    let mut statement = String::new();
    let mut start: Option<usize> = None;
    let mut quote: Option<char> = None;
    let mut in_block = false;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let chars: Vec<char> = raw.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let ch = chars[i];
            let next = chars.get(i + 1).copied();
            if in_block {
                if ch == '*' && next == Some('/') {
                    in_block = false;
                    i += 1;
                }
            } else if let Some(q) = quote {
                statement.push(ch);
                if ch == q {
                    quote = None;
                }
            } else if ch == '-' && next == Some('-') {
                break;
            } else if ch == '/' && next == Some('*') {
                in_block = true;
                i += 1;
            } else if ch == ';' {
                if let Some(first) = start.take() {
                    scan_statement(c, first, &statement);
                }
                statement.clear();
            } else {
                if ch == '\'' || ch == '"' {
                    quote = Some(ch);
                }
                if !ch.is_whitespace() && start.is_none() {
                    start = Some(line);
                }
                statement.push(ch);
            }
            i += 1;
        }
        statement.push(' ');
    }

    if let Some(first) = start {
        scan_statement(c, first, &statement);
    }
}

/// Scan one statement for the tables and programs it names.
pub(super) fn scan_statement(c: &mut Collector, line: usize, text: &str) {
    let tokens = tokenize(text);
    let head: Vec<String> = tokens
        .iter()
        .take_while(|t| !matches!(t, Token::Punct('(')) && !t.is_keyword("ON"))
        .filter_map(Token::keyword)
        .collect();
    let creates = head.first().is_some_and(|w| w == "CREATE");
    let creates_table = creates && head.iter().any(|w| w == "TABLE");
    let index_or_trigger = creates && head.iter().any(|w| w == "INDEX" || w == "TRIGGER");
    let ctes = common_table_names(&tokens);

    let mut functions: Vec<Option<String>> = Vec::new();
    let mut on_seen = false;
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Punct('(') => {
                functions.push(i.checked_sub(1).and_then(|p| tokens[p].keyword()));
            }
            Token::Punct(')') => {
                functions.pop();
            }
            Token::Word(word) => {
                let kw = word.to_ascii_uppercase();
                let previous = i.checked_sub(1).and_then(|p| tokens[p].keyword());
                let previous = previous.as_deref().unwrap_or("");
                match kw.as_str() {
                    "FROM" | "JOIN" => {
                        let in_function = functions
                            .last()
                            .and_then(|f| f.as_deref())
                            .is_some_and(|f| FROM_FUNCTIONS.contains(&f));
                        if !in_function {
                            i = table_list(c, line, &tokens, i + 1, kw == "FROM", &ctes);
                            continue;
                        }
                    }
                    "INTO" if matches!(previous, "INSERT" | "MERGE") => {
                        table(c, line, tokens.get(i + 1), &ctes);
                    }
                    "UPDATE"
                        if !matches!(
                            previous,
                            "ON" | "FOR" | "OF" | "OR" | "BEFORE" | "AFTER" | "INSTEAD" | "KEEP"
                        ) =>
                    {
                        table(c, line, tokens.get(i + 1), &ctes);
                    }
                    "REFERENCES" => {
                        table(c, line, tokens.get(i + 1), &ctes);
                    }
                    "LIKE" if creates_table => {
                        table(c, line, tokens.get(i + 1), &ctes);
                    }
                    "ON" if index_or_trigger && !on_seen => {
                        on_seen = true;
                        table(c, line, tokens.get(i + 1), &ctes);
                    }
                    "EXTERNAL" if tokens.get(i + 1).is_some_and(|t| t.is_keyword("NAME")) => {
                        external_name(c, line, tokens.get(i + 2), tokens.get(i + 3));
                    }
                    "CALL" => routine(c, line, tokens.get(i + 1)),
                    _ => {}
                }
            }
            _ => {}
        }
        i += 1;
    }
}

/// Names defined by `WITH name AS (` so they are not taken for tables.
fn common_table_names(tokens: &[Token]) -> Vec<String> {
    let mut names = Vec::new();
    for window in tokens.windows(3) {
        if let [Token::Word(name), as_kw, Token::Punct('(')] = window {
            if as_kw.is_keyword("AS") {
                names.push(name.to_ascii_uppercase());
            }
        }
    }
    names
}

/// FROM/JOIN targets starting at `start`; returns the index after the list.
fn table_list(
    c: &mut Collector,
    line: usize,
    tokens: &[Token],
    start: usize,
    comma_list: bool,
    ctes: &[String],
) -> usize {
    let mut j = start;
    loop {
        if !table(c, line, tokens.get(j), ctes) {
            return j;
        }
        j += 1;
        // optional correlation name
        match tokens.get(j) {
            Some(t) if t.is_keyword("AS") => j += 2,
            Some(Token::Word(w)) if !CLAUSE_WORDS.contains(&w.to_ascii_uppercase().as_str()) => {
                j += 1
            }
            _ => {}
        }
        if comma_list && tokens.get(j) == Some(&Token::Punct(',')) {
            j += 1;
            continue;
        }
        return j;
    }
}

/// Record a table reference from one token. Returns false if the token is
/// not a table name.
fn table(c: &mut Collector, line: usize, token: Option<&Token>, ctes: &[String]) -> bool {
    let name = match token {
        Some(Token::Word(word)) => {
            let upper = word.to_ascii_uppercase();
            if NOT_A_TABLE.contains(&upper.as_str()) || ctes.contains(&upper) {
                return false;
            }
            let mut parts = word.rsplitn(2, ['.', '/']);
            let name = parts.next().unwrap_or(word);
            if let Some(schema) = parts.next() {
                let schema = schema.rsplit(['.', '/']).next().unwrap_or(schema);
                if SYSTEM_SCHEMAS.contains(&schema.to_ascii_uppercase().as_str()) {
                    return true;
                }
            }
            name.to_string()
        }
        Some(Token::Delimited(name)) => name.clone(),
        _ => return false,
    };
    object(c, line, &name, ObjectType::File, EdgeKind::File);
    true
}

fn object(c: &mut Collector, line: usize, name: &str, object_type: ObjectType, kind: EdgeKind) {
    if name.chars().count() > MAX_NAME_LEN {
        c.unresolved(
            line,
            format!("SQL name {name} is longer than a system name; its system name is unknown"),
        );
        return;
    }
    c.reference(name, object_type, kind, line);
}

/// `EXTERNAL NAME '[LIB/]PGM'` or `'[LIB/]SRVPGM(PROC)'`.
fn external_name(c: &mut Collector, line: usize, token: Option<&Token>, after: Option<&Token>) {
    let (value, bound) = match token {
        Some(Token::Quoted(value)) => (value.clone(), value.contains('(')),
        Some(Token::Word(word)) => (word.clone(), after == Some(&Token::Punct('('))),
        _ => return,
    };
    let program = value.split('(').next().unwrap_or(&value);
    let name = program.rsplit(['/', '.']).next().unwrap_or(program).trim();
    let object_type = if bound {
        ObjectType::ServiceProgram
    } else {
        ObjectType::Program
    };
    object(c, line, name, object_type, EdgeKind::Call);
}

/// `CALL [schema.]procedure`
fn routine(c: &mut Collector, line: usize, token: Option<&Token>) {
    let name = match token {
        Some(Token::Word(word)) => word.rsplit(['.', '/']).next().unwrap_or(word).to_string(),
        Some(Token::Delimited(name)) => name.clone(),
        _ => return,
    };
    object(c, line, &name, ObjectType::Program, EdgeKind::Call);
}

#[cfg(test)]
mod tests {
    use super::super::extract_source;
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::graph::types::Extraction;
    use crate::naming::{ObjectIdentity, SourceKind};
    use std::path::Path;

    fn run(kind: SourceKind, text: &str) -> Extraction {
        let owner = ObjectIdentity::new("OWNER", ObjectType::File);
        extract_source(Path::new("owner.sql"), kind, &owner, text)
    }

    fn targets(out: &Extraction) -> Vec<String> {
        out.references.iter().map(|r| r.target.to_string()).collect()
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("select 'it''s' from mylib.emps"),
            vec![
                Token::Word("select".into()),
                Token::Quoted("it's".into()),
                Token::Word("from".into()),
                Token::Word("mylib.emps".into()),
            ]
        );
    }

    #[test]
    fn test_view_with_joins() {
        let text = "-- employees by department\n\
                    create view empdept as\n\
                    select e.name, d.title\n\
                    from mylib.emps e, depts d\n\
                    left join locs l on l.id = d.loc\n\
                    where e.dept = d.id;";
        let out = run(SourceKind::SqlView, text);
        assert_eq!(targets(&out), vec!["EMPS.FILE", "DEPTS.FILE", "LOCS.FILE"]);
        assert_eq!(out.references[0].line, 2);
    }

    #[test]
    fn test_table_constraints_and_like() {
        let text = "CREATE TABLE ORDERS (\n\
                      ID INT,\n\
                      CUST INT REFERENCES CUSTS (ID) ON DELETE CASCADE ON UPDATE RESTRICT\n\
                    );\n\
                    CREATE TABLE ORDHIST LIKE ORDERS;\n";
        let out = run(SourceKind::SqlTable, text);
        assert_eq!(targets(&out), vec!["CUSTS.FILE", "ORDERS.FILE"]);
    }

    #[test]
    fn test_index_and_trigger_targets() {
        let out = run(SourceKind::SqlIndex, "create index empidx on emps (name);");
        assert_eq!(targets(&out), vec!["EMPS.FILE"]);

        let text = "create trigger audt after update of salary on emps\n\
                    referencing new as n for each row\n\
                    insert into audit values(n.id);";
        let out = run(SourceKind::SqlTrigger, text);
        assert_eq!(targets(&out), vec!["EMPS.FILE", "AUDIT.FILE"]);
    }

    #[test]
    fn test_dml_and_host_variables() {
        let text = "update emps set x = 1 where id = :id;\n\
                    delete from oldemps where 1 = 1;\n\
                    select count(*) into :n from sysibm.sysdummy1;\n\
                    select extract(year from hired) from emps;";
        let out = run(SourceKind::SqlScript, text);
        assert_eq!(targets(&out), vec!["EMPS.FILE", "OLDEMPS.FILE"]);
    }

    #[test]
    fn test_common_table_expressions_and_subqueries() {
        let text = "with recent as (select * from orders where d > current date - 7 days)\n\
                    select * from recent r join (select id from custs) c on c.id = r.cust;";
        let out = run(SourceKind::SqlScript, text);
        assert_eq!(targets(&out), vec!["ORDERS.FILE", "CUSTS.FILE"]);
    }

    #[test]
    fn test_external_name() {
        let text = "create procedure updcust (in id int)\n\
                    language rpgle\n\
                    external name 'MYLIB/UPDCUST';\n\
                    create function getrate (code char(3)) returns dec(9,4)\n\
                    external name 'MYLIB/RATESRV(GETRATE)';";
        let out = run(SourceKind::SqlProcedure, text);
        assert_eq!(targets(&out), vec!["UPDCUST.PGM", "RATESRV.SRVPGM"]);
    }

    #[test]
    fn test_long_names_are_unresolved() {
        let out = run(
            SourceKind::SqlScript,
            "/* block\n comment */ select * from employee_master;",
        );
        assert!(out.references.is_empty());
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::UnresolvedReference);
        assert_eq!(out.diagnostics[0].line, Some(2));
    }
}
