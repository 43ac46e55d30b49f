//
//  types.rs
//  Orbit
//
//  Created by hak (tharun)
//

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of an IBM i system object name.
pub const MAX_NAME_LEN: usize = 10;

/// Kind of object a source member builds, or is tracked as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectType {
    Program,
    ServiceProgram,
    Module,
    File,
    BindingDirectory,
    DataArea,
    DataQueue,
    Command,
    Menu,
    MessageFile,
    /// Copy book pulled in by an include directive. Not compiled on its own.
    Include,
}

impl ObjectType {
    pub const ALL: [ObjectType; 11] = [
        ObjectType::Program,
        ObjectType::ServiceProgram,
        ObjectType::Module,
        ObjectType::File,
        ObjectType::BindingDirectory,
        ObjectType::DataArea,
        ObjectType::DataQueue,
        ObjectType::Command,
        ObjectType::Menu,
        ObjectType::MessageFile,
        ObjectType::Include,
    ];

    /// Long tag, e.g. `SERVICE_PROGRAM`.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Program => "PROGRAM",
            ObjectType::ServiceProgram => "SERVICE_PROGRAM",
            ObjectType::Module => "MODULE",
            ObjectType::File => "FILE",
            ObjectType::BindingDirectory => "BINDING_DIRECTORY",
            ObjectType::DataArea => "DATA_AREA",
            ObjectType::DataQueue => "DATA_QUEUE",
            ObjectType::Command => "COMMAND",
            ObjectType::Menu => "MENU",
            ObjectType::MessageFile => "MESSAGE_FILE",
            ObjectType::Include => "INCLUDE",
        }
    }

    /// ILE short name, e.g. `SRVPGM`.
    pub fn short_name(self) -> &'static str {
        match self {
            ObjectType::Program => "PGM",
            ObjectType::ServiceProgram => "SRVPGM",
            ObjectType::Module => "MODULE",
            ObjectType::File => "FILE",
            ObjectType::BindingDirectory => "BNDDIR",
            ObjectType::DataArea => "DTAARA",
            ObjectType::DataQueue => "DTAQ",
            ObjectType::Command => "CMD",
            ObjectType::Menu => "MENU",
            ObjectType::MessageFile => "MSGF",
            ObjectType::Include => "INCLUDE",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for ObjectType {
    type Err = String;

    /// Accepts the long tag or the short name, with or without a leading `*`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('*').to_ascii_uppercase();
        ObjectType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted || t.short_name() == wanted)
            .ok_or_else(|| format!("unknown object type '{s}'"))
    }
}

/// Unique key of an object: upper-cased name plus type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectIdentity {
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: ObjectType,
}

impl ObjectIdentity {
    pub fn new(name: impl AsRef<str>, object_type: ObjectType) -> Self {
        Self {
            name: name.as_ref().trim().to_ascii_uppercase(),
            object_type,
        }
    }

    /// Parse `NAME.TYPE` (e.g. `EMPS.FILE`, `ORDENT.PGM`).
    pub fn parse(query: &str) -> Option<Self> {
        let (name, kind) = query.trim().rsplit_once('.')?;
        let object_type = kind.parse().ok()?;
        if !is_system_name(name) {
            return None;
        }
        Some(Self::new(name, object_type))
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.object_type)
    }
}

/// True if `name` is a valid IBM i system name: 1-10 characters,
/// starting with a letter or `$#@`, followed by letters, digits, `$#@_.`.
pub fn is_system_name(name: &str) -> bool {
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '$' | '#' | '@'));
    first_ok
        && name.len() <= MAX_NAME_LEN
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '$' | '#' | '@' | '_' | '.'))
}
