//! Naming resolver: maps a source path to the object it builds.
//!
//! Pure with respect to graph state. The identity is the upper-cased base
//! name of the file; the type comes from the extension, with the `pgm`
//! infix deciding between program and module for ILE language sources.

pub mod kind;
pub mod types;

pub use kind::{all_extensions, Language, SourceKind};
pub use types::{is_system_name, ObjectIdentity, ObjectType, MAX_NAME_LEN};

use std::path::Path;

use crate::error::{OrbitError, Result};

/// Infix marking an ILE language member as a program entry.
pub const PROGRAM_INFIX: &str = "pgm";

/// Something the resolver had to guess while naming a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingNote {
    /// No `pgm` infix; assumed a module.
    AmbiguousType {
        assumed: ObjectType,
        alternative: ObjectType,
    },
    /// The base name exceeded the system name length and was cut.
    NameTooLong { original: String },
}

/// Outcome of naming one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub identity: ObjectIdentity,
    pub kind: SourceKind,
    pub notes: Vec<NamingNote>,
}

impl Resolution {
    pub fn is_ambiguous(&self) -> bool {
        self.notes
            .iter()
            .any(|n| matches!(n, NamingNote::AmbiguousType { .. }))
    }
}

/// Split a file name into (base, infixes, extension).
pub(crate) fn split_file_name(file_name: &str) -> Option<(&str, Vec<&str>, &str)> {
    let parts: Vec<&str> = file_name.split('.').collect();
    if parts.len() < 2 || parts[0].is_empty() {
        return None;
    }
    let ext = parts[parts.len() - 1];
    let infixes = parts[1..parts.len() - 1].to_vec();
    Some((parts[0], infixes, ext))
}

/// Resolve the identity for a source path.
pub fn resolve_path(path: &Path) -> Result<Resolution> {
    let unrecognized = || OrbitError::UnrecognizedSource(path.to_path_buf());

    let file_name = path
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(unrecognized)?;
    let (base, infixes, ext) = split_file_name(file_name).ok_or_else(unrecognized)?;
    let kind = SourceKind::from_extension(ext).ok_or_else(unrecognized)?;

    let mut notes = Vec::new();

    let object_type = match kind.fixed_type() {
        Some(t) => t,
        None => {
            let is_program = infixes
                .iter()
                .any(|i| i.eq_ignore_ascii_case(PROGRAM_INFIX));
            if is_program {
                ObjectType::Program
            } else {
                notes.push(NamingNote::AmbiguousType {
                    assumed: ObjectType::Module,
                    alternative: ObjectType::Program,
                });
                ObjectType::Module
            }
        }
    };

    let name: String = if base.chars().count() > MAX_NAME_LEN {
        notes.push(NamingNote::NameTooLong {
            original: base.to_string(),
        });
        base.chars().take(MAX_NAME_LEN).collect()
    } else {
        base.to_string()
    };

    Ok(Resolution {
        identity: ObjectIdentity::new(name, object_type),
        kind,
        notes,
    })
}
