use std::path::PathBuf;

use crate::version::VersionTag;

/// A validated mod. Records only exist fully populated; see
/// [`crate::registry::ModRegistry::load_mod_info`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModRecord {
    pub name: String,
    pub title: String,
    pub description: String,
    pub version: VersionTag,
    pub path: PathBuf,
    pub is_archive: bool,
    pub enabled: bool,
}

impl ModRecord {
    pub fn kind(&self) -> &'static str {
        if self.is_archive {
            "zip"
        } else {
            "dir"
        }
    }
}
