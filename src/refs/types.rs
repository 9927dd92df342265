use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Kind of database object a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ObjectKind {
    Table,
    View,
    Procedure,
    Function,
    Schema,
    Database,
    Column,
    Unknown,
    Other
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "Table"),
            Self::View => write!(f, "View"),
            Self::Procedure => write!(f, "Procedure"),
            Self::Function => write!(f, "Function"),
            Self::Schema => write!(f, "Schema"),
            Self::Database => write!(f, "Database"),
            Self::Column => write!(f, "Column"),
            Self::Unknown => write!(f, "Unknown"),
            Self::Other => write!(f, "Other")
        }
    }
}

/// A database object touched by a script.
///
/// `name` is `schema.object` or `schema.table.column`; single-part names are
/// never produced by extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReference {
    pub name: CompactString,
    pub kind: ObjectKind
}

impl ObjectReference {
    pub fn new(name: impl Into<CompactString>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind
        }
    }

    /// Number of dot-separated segments in the name
    pub fn segments(&self) -> usize {
        self.name.split('.').count()
    }
}
