//
//  kind.rs
//  Orbit
//
//  Created by hak (tharun)
//

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::types::ObjectType;

/// Every recognized source kind. Adding a kind means adding a variant here,
/// a row in `EXTENSIONS`, and an arm in each match below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Rpgle,
    SqlRpgle,
    RpgleInclude,
    Rpg,
    Clle,
    Clp,
    ClInclude,
    Cblle,
    SqlCblle,
    Cobol,
    CobolInclude,
    PhysicalFile,
    LogicalFile,
    DisplayFile,
    PrinterFile,
    SqlTable,
    SqlView,
    SqlIndex,
    SqlScript,
    SqlProcedure,
    SqlTrigger,
    SqlFunction,
    Binder,
    BindingDirectory,
    Command,
    DataArea,
    DataQueue,
    Menu,
    MessageFile,
}

/// Source language family, selecting the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rpg,
    Cl,
    Cobol,
    Dds,
    Sql,
    Binder,
    BindingDirectory,
    /// Sources that never reference other objects.
    Plain,
}

/// Extension table. Lower-case; lookups are case-insensitive.
const EXTENSIONS: &[(&str, SourceKind)] = &[
    ("rpgle", SourceKind::Rpgle),
    ("sqlrpgle", SourceKind::SqlRpgle),
    ("rpgleinc", SourceKind::RpgleInclude),
    ("sqlrpgleinc", SourceKind::RpgleInclude),
    ("rpg", SourceKind::Rpg),
    ("sqlrpg", SourceKind::Rpg),
    ("clle", SourceKind::Clle),
    ("clp", SourceKind::Clp),
    ("cl", SourceKind::Clp),
    ("clinc", SourceKind::ClInclude),
    ("cblle", SourceKind::Cblle),
    ("sqlcblle", SourceKind::SqlCblle),
    ("cbl", SourceKind::Cobol),
    ("sqlcbl", SourceKind::Cobol),
    ("cblinc", SourceKind::CobolInclude),
    ("pf", SourceKind::PhysicalFile),
    ("lf", SourceKind::LogicalFile),
    ("dspf", SourceKind::DisplayFile),
    ("prtf", SourceKind::PrinterFile),
    ("table", SourceKind::SqlTable),
    ("view", SourceKind::SqlView),
    ("index", SourceKind::SqlIndex),
    ("sql", SourceKind::SqlScript),
    ("sqlprc", SourceKind::SqlProcedure),
    ("procedure", SourceKind::SqlProcedure),
    ("sqltrg", SourceKind::SqlTrigger),
    ("trigger", SourceKind::SqlTrigger),
    ("sqludf", SourceKind::SqlFunction),
    ("function", SourceKind::SqlFunction),
    ("bnd", SourceKind::Binder),
    ("binder", SourceKind::Binder),
    ("bnddir", SourceKind::BindingDirectory),
    ("cmd", SourceKind::Command),
    ("dtaara", SourceKind::DataArea),
    ("dtaq", SourceKind::DataQueue),
    ("menu", SourceKind::Menu),
    ("msgf", SourceKind::MessageFile),
];

/// All recognized extensions, lower-case, in table order.
pub fn all_extensions() -> Vec<&'static str> {
    EXTENSIONS.iter().map(|(ext, _)| *ext).collect()
}

impl SourceKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        EXTENSIONS
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, kind)| *kind)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn language(self) -> Language {
        use SourceKind::*;
        match self {
            Rpgle | SqlRpgle | RpgleInclude | Rpg => Language::Rpg,
            Clle | Clp | ClInclude => Language::Cl,
            Cblle | SqlCblle | Cobol | CobolInclude => Language::Cobol,
            PhysicalFile | LogicalFile | DisplayFile | PrinterFile => Language::Dds,
            SqlTable | SqlView | SqlIndex | SqlScript | SqlProcedure | SqlTrigger
            | SqlFunction => Language::Sql,
            Binder => Language::Binder,
            BindingDirectory => Language::BindingDirectory,
            Command | DataArea | DataQueue | Menu | MessageFile => Language::Plain,
        }
    }

    /// Object type when the extension alone decides it. `None` for kinds
    /// that need the `pgm` infix to tell a program from a module.
    pub fn fixed_type(self) -> Option<ObjectType> {
        use SourceKind::*;
        match self {
            Rpgle | SqlRpgle | Clle | Cblle | SqlCblle => None,
            RpgleInclude | ClInclude | CobolInclude => Some(ObjectType::Include),
            Rpg | Clp | Cobol | SqlProcedure | SqlTrigger => Some(ObjectType::Program),
            PhysicalFile | LogicalFile | DisplayFile | PrinterFile | SqlTable | SqlView
            | SqlIndex | SqlScript => Some(ObjectType::File),
            SqlFunction | Binder => Some(ObjectType::ServiceProgram),
            BindingDirectory => Some(ObjectType::BindingDirectory),
            Command => Some(ObjectType::Command),
            DataArea => Some(ObjectType::DataArea),
            DataQueue => Some(ObjectType::DataQueue),
            Menu => Some(ObjectType::Menu),
            MessageFile => Some(ObjectType::MessageFile),
        }
    }

    pub fn is_ambiguous(self) -> bool {
        self.fixed_type().is_none()
    }

    pub fn is_include(self) -> bool {
        self.fixed_type() == Some(ObjectType::Include)
    }

    /// Extension an ambiguous member should carry when it is only ever included.
    pub fn include_extension(self) -> Option<&'static str> {
        use SourceKind::*;
        match self {
            Rpgle | SqlRpgle => Some("rpgleinc"),
            Clle => Some("clinc"),
            Cblle | SqlCblle => Some("cblinc"),
            _ => None,
        }
    }

    /// SQL precompiled sources whose embedded statements are scanned too.
    pub fn has_embedded_sql(self) -> bool {
        matches!(self, SourceKind::SqlRpgle | SourceKind::SqlCblle)
    }
}
