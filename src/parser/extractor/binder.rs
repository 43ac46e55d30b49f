//
//  binder.rs
//  Orbit
//
//  Created by hak (tharun)
//

use super::helpers::*;
use super::Collector;
use crate::graph::types::{BinderListing, EdgeKind, ExportBlock};
use crate::naming::ObjectType;

/// Binder language: `STRPGMEXP` .. `EXPORT SYMBOL(x)` .. `ENDPGMEXP`.
pub(super) fn extract_binder(c: &mut Collector, text: &str) {
    let mut listing = BinderListing::default();
    let mut open: Option<(usize, ExportBlock)> = None;

    for command in cl_commands(text) {
        let body = strip_label(&command.text);
        let line = command.line;
        let name = tokens(body)
            .first()
            .map(|t| t.to_ascii_uppercase())
            .unwrap_or_default();

        match name.as_str() {
            "STRPGMEXP" => {
                if let Some((_, block)) = open.take() {
                    c.malformed(line, "STRPGMEXP inside an open export block");
                    listing.blocks.push(block);
                }
                open = Some((line, start_block(body)));
            }
            "EXPORT" => {
                let Some((_, block)) = open.as_mut() else {
                    c.malformed(line, "EXPORT outside STRPGMEXP/ENDPGMEXP");
                    continue;
                };
                match keyword_arg(body, "SYMBOL").filter(|s| !s.is_empty()) {
                    Some(symbol) => {
                        let symbol = match quoted(&symbol) {
                            Some(literal) => literal.to_string(),
                            None => symbol.to_ascii_uppercase(),
                        };
                        if !block.symbols.contains(&symbol) {
                            block.symbols.push(symbol);
                        }
                    }
                    None => c.malformed(line, "EXPORT without SYMBOL"),
                }
            }
            "ENDPGMEXP" => match open.take() {
                Some((_, block)) => listing.blocks.push(block),
                None => c.malformed(line, "ENDPGMEXP without STRPGMEXP"),
            },
            other => c.malformed(line, format!("unknown binder command '{other}'")),
        }
    }

    if let Some((line, block)) = open {
        c.malformed(line, "export block is never closed with ENDPGMEXP");
        listing.blocks.push(block);
    }
    c.set_binder(listing);
}

fn start_block(body: &str) -> ExportBlock {
    let current = keyword_arg(body, "PGMLVL")
        .map_or(true, |level| !level.eq_ignore_ascii_case("*PRV"));
    let signature = keyword_arg(body, "SIGNATURE").and_then(|sig| {
        if sig.eq_ignore_ascii_case("*GEN") || sig.is_empty() {
            None
        } else if let Some(literal) = quoted(&sig) {
            Some(literal.to_string())
        } else {
            // hex form, X'...'
            Some(sig.to_ascii_uppercase())
        }
    });
    ExportBlock {
        current,
        signature,
        symbols: Vec::new(),
    }
}

/// Binding directory listing: `[(][LIB/]NAME [*SRVPGM|*MODULE][)]` per line.
pub(super) fn extract_directory(c: &mut Collector, text: &str) {
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let entry = raw.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }
        let entry = entry.trim_start_matches('(').trim_end_matches(')');
        let mut parts = entry.split_whitespace();
        let Some(name) = parts.next() else {
            continue;
        };
        let object_type = match parts.next().map(str::to_ascii_uppercase).as_deref() {
            None | Some("*SRVPGM") => ObjectType::ServiceProgram,
            Some("*MODULE") => ObjectType::Module,
            Some(other) => {
                c.malformed(line, format!("binding directory entry type {other} is not *SRVPGM or *MODULE"));
                continue;
            }
        };
        c.reference(unqualify(name), object_type, EdgeKind::Entry, line);
    }
}
