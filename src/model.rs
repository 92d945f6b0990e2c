use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a record, fixed at construction.
///
/// The kind decides where a record lives on disk: each kind maps to a
/// top-level directory under the storage root (`config/`, `lang/`,
/// `userdata/`, or a custom label), and a record's file is
/// `<dir>/<name>.json` within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Config,
    Lang,
    UserData,
    Custom(String),
}

impl RecordKind {
    /// Storage sub-directory for this kind, always lowercase.
    pub fn dir_name(&self) -> String {
        match self {
            RecordKind::Config => "config".to_string(),
            RecordKind::Lang => "lang".to_string(),
            RecordKind::UserData => "userdata".to_string(),
            RecordKind::Custom(label) => label.to_lowercase(),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dir_name())
    }
}
