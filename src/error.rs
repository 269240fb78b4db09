use std::path::PathBuf;

use thiserror::Error;

use crate::script::CopyError;
use crate::version::VersionTag;

pub type Result<T> = std::result::Result<T, Error>;

/// Flat error codes, mirroring the registry's log vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotAMod,
    InvalidJson,
    HigherVersionPresent,
    FsEntryDoesNotExist,
    AlreadyLoaded,
    InvalidFilename,
    ModIncompatible,
    ModIgnored,
    InvalidVersionString,
    ArchiveNotSupported,
    InvalidPrototype,
    ScriptError,
    Io,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Given path does not point to a mod: {0}")]
    NotAMod(PathBuf),
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),
    #[error("Invalid version string: {0}")]
    InvalidVersionString(String),
    #[error("Mod {name} targets engine version {required}, which is not compatible with {engine}")]
    ModIncompatible {
        name: String,
        required: VersionTag,
        engine: VersionTag,
    },
    #[error("The mod {0} is in the ignored list")]
    ModIgnored(String),
    #[error("The mod {name} already has version {present} present (candidate was {candidate})")]
    HigherVersionPresent {
        name: String,
        present: VersionTag,
        candidate: VersionTag,
    },
    #[error("File system entry does not exist: {0}")]
    FsEntryDoesNotExist(PathBuf),
    #[error("Already loaded: {0}")]
    AlreadyLoaded(String),
    #[error("Archive mods are not supported yet: {0}")]
    ArchiveNotSupported(PathBuf),
    #[error("Invalid prototype: {0}")]
    InvalidPrototype(String),
    #[error("Script error in mod {name}: {source}")]
    Script {
        name: String,
        #[source]
        source: mlua::Error,
    },
    #[error(transparent)]
    Copy(#[from] CopyError),
    #[error(transparent)]
    Lua(#[from] mlua::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NotAMod(_) => ErrorCode::NotAMod,
            Error::InvalidJson(_) => ErrorCode::InvalidJson,
            Error::InvalidFilename(_) => ErrorCode::InvalidFilename,
            Error::InvalidVersionString(_) => ErrorCode::InvalidVersionString,
            Error::ModIncompatible { .. } => ErrorCode::ModIncompatible,
            Error::ModIgnored(_) => ErrorCode::ModIgnored,
            Error::HigherVersionPresent { .. } => ErrorCode::HigherVersionPresent,
            Error::FsEntryDoesNotExist(_) => ErrorCode::FsEntryDoesNotExist,
            Error::AlreadyLoaded(_) => ErrorCode::AlreadyLoaded,
            Error::ArchiveNotSupported(_) => ErrorCode::ArchiveNotSupported,
            Error::InvalidPrototype(_) => ErrorCode::InvalidPrototype,
            Error::Script { .. } | Error::Copy(_) | Error::Lua(_) => ErrorCode::ScriptError,
            Error::Io(_) => ErrorCode::Io,
        }
    }

    /// Errors that mean an input file is malformed rather than a single mod
    /// being unusable. These abort directory scans and configuration merges.
    pub fn is_structural(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::InvalidJson | ErrorCode::InvalidFilename | ErrorCode::InvalidVersionString
        )
    }
}
