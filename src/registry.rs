use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::decider::Decider;
use crate::fs::FileSystem;
use crate::json::{JsonValue, Object};
use crate::model::ModRecord;
use crate::version::VersionTag;
use crate::{Error, ErrorCode, Result};

/// File inside a mod directory that is never treated as a mod.
pub const CONFIGURATION_FILE: &str = "configuration.json";
/// Manifest file at the root of every mod.
pub const MANIFEST_FILE: &str = "info.json";
/// Extension of archive mods.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Splits `<name>_<version>` at the rightmost `_` whose suffix is a complete
/// version. Without such a suffix the whole filename is the name.
pub fn split_filename(file_name: &str) -> (&str, Option<VersionTag>) {
    file_name
        .rmatch_indices('_')
        .find_map(|(index, _)| {
            VersionTag::parse_exact(&file_name[index + 1..])
                .map(|version| (&file_name[..index], Some(version)))
        })
        .unwrap_or((file_name, None))
}

/// Accepted mods plus the sources they were discovered from.
pub struct ModRegistry {
    fs: Arc<dyn FileSystem>,
    engine_version: VersionTag,
    mods: BTreeMap<String, ModRecord>,
    directories: BTreeMap<PathBuf, PathBuf>,
    additional: BTreeMap<PathBuf, PathBuf>,
    ignored: BTreeMap<String, PathBuf>,
}

impl ModRegistry {
    pub fn new(fs: Arc<dyn FileSystem>, engine_version: VersionTag) -> Self {
        ModRegistry {
            fs,
            engine_version,
            mods: BTreeMap::new(),
            directories: BTreeMap::new(),
            additional: BTreeMap::new(),
            ignored: BTreeMap::new(),
        }
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn engine_version(&self) -> VersionTag {
        self.engine_version
    }

    pub fn mods(&self) -> &BTreeMap<String, ModRecord> {
        &self.mods
    }

    pub fn mod_info(&self, name: &str) -> Option<&ModRecord> {
        self.mods.get(name)
    }

    pub fn mod_mut(&mut self, name: &str) -> Option<&mut ModRecord> {
        self.mods.get_mut(name)
    }

    /// Tracked mod directories, canonical path to the path they were added with.
    pub fn directories(&self) -> &BTreeMap<PathBuf, PathBuf> {
        &self.directories
    }

    /// Individually added mods, canonical path to the path they were added with.
    pub fn additional(&self) -> &BTreeMap<PathBuf, PathBuf> {
        &self.additional
    }

    pub fn ignored(&self) -> &BTreeMap<String, PathBuf> {
        &self.ignored
    }

    /// Returns `false` if no mod with that name is loaded.
    pub fn set_mod_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.mods.get_mut(name) {
            Some(record) => {
                record.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Validates the mod at `path` without registering it.
    pub fn load_mod_info(&self, path: &Path) -> Result<ModRecord> {
        let path = self.fs.correct_path(path);

        if !self.fs.exists(&path) {
            return Err(Error::FsEntryDoesNotExist(path));
        }

        let is_archive = !self.fs.is_directory(&path);
        if is_archive
            && path.extension().and_then(|e| e.to_str()) != Some(ARCHIVE_EXTENSION)
        {
            return Err(Error::NotAMod(path));
        }

        let file_name = if is_archive {
            path.file_stem()
        } else {
            path.file_name()
        }
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::InvalidFilename(path.display().to_string()))?;

        let (file_mod_name, file_version) = split_filename(file_name);

        if is_archive {
            if file_version.is_none() {
                return Err(Error::InvalidFilename(format!(
                    "archive {} must be named <name>_<version>.{}",
                    path.display(),
                    ARCHIVE_EXTENSION
                )));
            }
            return Err(Error::ArchiveNotSupported(path));
        }

        let manifest_path = path.join(MANIFEST_FILE);
        if !self.fs.is_file(&manifest_path) {
            return Err(Error::FsEntryDoesNotExist(manifest_path));
        }

        let text = self.fs.read_to_string(&manifest_path)?;
        let manifest = JsonValue::parse(&text)
            .map_err(|e| Error::InvalidJson(format!("{}: {e}", manifest_path.display())))?;
        let manifest = manifest.as_object().ok_or_else(|| {
            Error::InvalidJson(format!(
                "{}: root must be an object, found {}",
                manifest_path.display(),
                manifest.type_name()
            ))
        })?;

        let string_field = |key: &str| -> Result<&str> {
            manifest.get(key).and_then(JsonValue::as_str).ok_or_else(|| {
                Error::InvalidJson(format!(
                    "{}: field '{key}' must be a string",
                    manifest_path.display()
                ))
            })
        };

        let engine_version = string_field("engine_version")?;
        let name = string_field("name")?;
        let title = string_field("title")?;
        let version = string_field("version")?;
        let description = match manifest.get("description") {
            Some(JsonValue::String(description)) => description.clone(),
            Some(other) => {
                warn!(
                    "{}: ignoring 'description' of type {}",
                    manifest_path.display(),
                    other.type_name()
                );
                String::new()
            }
            None => String::new(),
        };

        let required = VersionTag::parse_exact(engine_version)
            .filter(|v| v.major_set && v.minor_set)
            .ok_or_else(|| {
                Error::InvalidVersionString(format!(
                    "engine_version '{engine_version}' of mod {name} needs at least major.minor"
                ))
            })?;
        if !required.is_compatible_with(&self.engine_version) {
            return Err(Error::ModIncompatible {
                name: name.to_string(),
                required,
                engine: self.engine_version,
            });
        }

        let version = VersionTag::parse_exact(version).ok_or_else(|| {
            Error::InvalidVersionString(format!("version '{version}' of mod {name}"))
        })?;

        if file_mod_name != name {
            return Err(Error::InvalidFilename(format!(
                "{} does not match mod name {name}",
                path.display()
            )));
        }
        if let Some(file_version) = file_version {
            if file_version != version {
                return Err(Error::InvalidFilename(format!(
                    "{} does not match mod version {version}",
                    path.display()
                )));
            }
        }

        Ok(ModRecord {
            name: name.to_string(),
            title: title.to_string(),
            description,
            version,
            path: self.fs.canonicalize(&path)?,
            is_archive,
            enabled: true,
        })
    }

    /// Validates and registers a single mod.
    ///
    /// An incumbent with the same name wins unless the candidate's version is
    /// strictly higher. `is_additional` marks an explicit add: it is remembered
    /// separately from directory scans as soon as the manifest validates, even
    /// if the candidate then loses to the incumbent, and it overrides an
    /// ignore entry.
    pub fn add_mod(&mut self, path: &Path, is_additional: bool) -> Result<ModRecord> {
        let record = self.load_mod_info(path)?;

        if is_additional {
            self.additional
                .insert(record.path.clone(), path.to_path_buf());
        }

        if self.ignored.contains_key(&record.name) {
            if !is_additional {
                return Err(Error::ModIgnored(record.name));
            }
            debug!("Explicit add of {} clears its ignore entry", record.name);
            self.ignored.remove(&record.name);
        }

        if let Some(present) = self.mods.get(&record.name) {
            if present.version >= record.version {
                return Err(Error::HigherVersionPresent {
                    name: record.name,
                    present: present.version,
                    candidate: record.version,
                });
            }
            debug!(
                "Replacing {} {} with {}",
                record.name, present.version, record.version
            );
        }

        info!(
            "Added mod {} {} from {}",
            record.name,
            record.version,
            record.path.display()
        );
        self.mods.insert(record.name.clone(), record.clone());
        Ok(record)
    }

    /// Unloads a mod. A mod that came from a tracked directory is also ignored
    /// so a rescan does not bring it back; an additional mod is simply forgotten.
    pub fn remove_mod(&mut self, name: &str) -> Option<ModRecord> {
        let record = self.mods.remove(name)?;

        if self.additional.remove(&record.path).is_none() {
            let tracked = record
                .path
                .parent()
                .is_some_and(|parent| self.directories.contains_key(parent));
            if tracked {
                self.ignored.insert(record.name.clone(), record.path.clone());
            }
        }

        info!("Removed mod {}", record.name);
        Some(record)
    }

    /// Unloads a mod (if loaded) and remembers its name as ignored.
    pub fn add_ignored_mod(&mut self, name: &str) {
        let path = match self.mods.remove(name) {
            Some(record) => {
                self.additional.remove(&record.path);
                record.path
            }
            None => self
                .ignored
                .get(name)
                .cloned()
                .unwrap_or_default(),
        };

        debug!("Ignoring mod {name}");
        self.ignored.insert(name.to_string(), path);
    }

    /// Forgets an ignore entry and adds the mod back from its remembered path.
    ///
    /// Returns `Ok(None)` if the name was not ignored or no path is known for it.
    pub fn remove_ignored_mod(&mut self, name: &str) -> Result<Option<ModRecord>> {
        let Some(path) = self.ignored.remove(name) else {
            return Ok(None);
        };
        if path.as_os_str().is_empty() {
            return Ok(None);
        }

        let tracked = path
            .parent()
            .is_some_and(|parent| self.directories.contains_key(parent));
        self.add_mod(&path, !tracked).map(Some)
    }

    /// Starts tracking a directory of mods and adds every mod inside it.
    ///
    /// Returns the number of mods accepted. A structurally invalid entry stops
    /// the scan and is returned; any other per-mod failure is logged and
    /// skipped. Mods accepted before the failure stay registered.
    pub fn add_mod_directory(&mut self, path: &Path) -> Result<usize> {
        let corrected = self.fs.correct_path(path);

        if !self.fs.is_directory(&corrected) {
            warn!(
                "Mod directory {} does not exist, tracking it anyway",
                corrected.display()
            );
            self.directories
                .insert(corrected.clone(), path.to_path_buf());
            return Err(Error::FsEntryDoesNotExist(corrected));
        }

        let canonical = self.fs.canonicalize(&corrected)?;
        if self.directories.contains_key(&canonical) {
            info!("Mod directory {} is already tracked", canonical.display());
            return Ok(0);
        }
        self.directories
            .insert(canonical.clone(), path.to_path_buf());

        let mut accepted = 0;
        for entry in self.fs.entries(&canonical)? {
            if entry.file_name().and_then(|n| n.to_str()) == Some(CONFIGURATION_FILE) {
                continue;
            }

            match self.add_mod(&entry, false) {
                Ok(_) => accepted += 1,
                Err(e) if e.is_structural() => return Err(e),
                Err(e) => debug!("Skipping {}: {e}", entry.display()),
            }
        }

        info!(
            "Scanned {}, {accepted} mod(s) accepted",
            canonical.display()
        );
        Ok(accepted)
    }

    /// Stops tracking a directory and unloads every mod it provided, except
    /// mods that were also added individually.
    ///
    /// Returns `false` if the directory was not tracked.
    pub fn remove_mod_directory(&mut self, path: &Path) -> bool {
        let key = self
            .fs
            .canonicalize(path)
            .unwrap_or_else(|_| self.fs.correct_path(path));

        if self.directories.remove(&key).is_none() {
            return false;
        }

        let additional = &self.additional;
        self.mods.retain(|name, record| {
            let keep =
                record.path.parent() != Some(key.as_path()) || additional.contains_key(&record.path);
            if !keep {
                debug!("Unloading {name} with its directory");
            }
            keep
        });

        info!("Stopped tracking {}", key.display());
        true
    }

    /// Merges a configuration file into the current state.
    ///
    /// Each `configuration` entry is XORed with `invert` and then combined with
    /// the mod's enabled state from before the merge using `decider`. A mod that
    /// was unknown before the merge takes the loaded value directly. If the
    /// merge fails, the registry is left as it was.
    pub fn load_configuration(&mut self, path: &Path, decider: Decider, invert: bool) -> Result<()> {
        let corrected = self.fs.correct_path(path);
        if !self.fs.is_file(&corrected) {
            return Err(Error::FsEntryDoesNotExist(corrected));
        }

        let text = self.fs.read_to_string(&corrected)?;
        let config = JsonValue::parse(&text)
            .map_err(|e| Error::InvalidJson(format!("{}: {e}", corrected.display())))?;
        let config = match config {
            JsonValue::Object(config) => config,
            other => {
                return Err(Error::InvalidJson(format!(
                    "{}: root must be an object, found {}",
                    corrected.display(),
                    other.type_name()
                )))
            }
        };

        let snapshot = (
            self.mods.clone(),
            self.directories.clone(),
            self.additional.clone(),
            self.ignored.clone(),
        );

        match self.apply_configuration(&config, decider, invert) {
            Ok(()) => {
                info!(
                    "Loaded configuration {} with decider {decider}",
                    corrected.display()
                );
                Ok(())
            }
            Err(e) => {
                (self.mods, self.directories, self.additional, self.ignored) = snapshot;
                Err(e)
            }
        }
    }

    fn apply_configuration(&mut self, config: &Object, decider: Decider, invert: bool) -> Result<()> {
        let previous: BTreeMap<String, bool> = self
            .mods
            .iter()
            .map(|(name, record)| (name.clone(), record.enabled))
            .collect();

        for directory in string_array(config, "directories")?.unwrap_or_default() {
            match self.add_mod_directory(Path::new(directory)) {
                Ok(_) => {}
                Err(e) if e.is_structural() => return Err(e),
                Err(e) => warn!("Mod directory {directory}: {e}"),
            }
        }

        for mod_path in string_array(config, "additional")?.unwrap_or_default() {
            match self.add_mod(Path::new(mod_path), true) {
                Ok(_) => {}
                Err(e) if matches!(e.code(), ErrorCode::InvalidJson | ErrorCode::InvalidFilename) => {
                    return Err(e)
                }
                Err(e) => warn!("Additional mod {mod_path}: {e}"),
            }
        }

        for name in string_array(config, "ignored")?.unwrap_or_default() {
            self.add_ignored_mod(name);
        }

        let Some(configuration) = config.get("configuration") else {
            debug!("Configuration has no 'configuration' object");
            return Ok(());
        };
        let configuration = configuration.as_object().ok_or_else(|| {
            Error::InvalidJson(format!(
                "'configuration' must be an object, found {}",
                configuration.type_name()
            ))
        })?;

        for (name, value) in configuration {
            let Some(loaded) = value.as_integer() else {
                warn!("Enabled state of {name} must be 0 or 1, found {value}");
                continue;
            };
            let loaded = (loaded != 0) ^ invert;

            let Some(record) = self.mods.get_mut(name) else {
                warn!("Configuration mentions unknown mod {name}");
                continue;
            };

            record.enabled = match previous.get(name) {
                Some(&previous) => decider.decide(previous, loaded),
                None => loaded,
            };
        }

        Ok(())
    }

    /// Writes the registry state as a configuration file.
    pub fn save_configuration(&self, path: &Path) -> Result<()> {
        let paths = |map: &BTreeMap<PathBuf, PathBuf>| -> JsonValue {
            JsonValue::Array(
                map.values()
                    .map(|p| JsonValue::from(p.to_string_lossy().into_owned()))
                    .collect(),
            )
        };

        let mut config = Object::new();
        config.insert("directories".into(), paths(&self.directories));
        config.insert("additional".into(), paths(&self.additional));
        config.insert(
            "ignored".into(),
            JsonValue::Array(self.ignored.keys().map(|n| JsonValue::from(n.as_str())).collect()),
        );
        config.insert(
            "configuration".into(),
            JsonValue::Object(
                self.mods
                    .iter()
                    .map(|(name, record)| (name.clone(), JsonValue::from(record.enabled as i64)))
                    .collect(),
            ),
        );

        self.fs
            .write(path, &JsonValue::Object(config).to_string())?;
        info!("Saved configuration to {}", self.fs.correct_path(path).display());
        Ok(())
    }
}

/// Reads an optional array-of-strings field.
fn string_array<'a>(config: &'a Object, key: &str) -> Result<Option<Vec<&'a str>>> {
    let Some(value) = config.get(key) else {
        debug!("Configuration has no '{key}' array");
        return Ok(None);
    };

    let array = value.as_array().ok_or_else(|| {
        Error::InvalidJson(format!("'{key}' must be an array, found {}", value.type_name()))
    })?;

    array
        .iter()
        .map(|item| {
            item.as_str().ok_or_else(|| {
                Error::InvalidJson(format!(
                    "'{key}' entries must be strings, found {}",
                    item.type_name()
                ))
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}
