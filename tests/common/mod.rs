#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use modloader::fs::{FileSystem, LocalFileSystem};
use modloader::registry::ModRegistry;
use modloader::version::ENGINE_VERSION;

/// `engine_version` string compatible with the compiled engine.
pub fn engine() -> String {
    format!("{}.{}", ENGINE_VERSION.major, ENGINE_VERSION.minor)
}

pub fn manifest(name: &str, version: &str) -> String {
    format!(
        r#"{{"engine_version":"{}","name":"{name}","title":"The {name} mod","version":"{version}","description":"Adds {name}"}}"#,
        engine()
    )
}

/// Creates `<parent>/<dir_name>/info.json` with the given manifest text.
pub fn write_mod_with(parent: &Path, dir_name: &str, manifest: &str) -> PathBuf {
    let root = parent.join(dir_name);
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("info.json"), manifest).unwrap();
    root
}

pub fn write_mod(parent: &Path, dir_name: &str, name: &str, version: &str) -> PathBuf {
    write_mod_with(parent, dir_name, &manifest(name, version))
}

/// Adds a `data.lua` (and optionally more files) to a mod directory.
pub fn write_script(root: &Path, relative: &str, source: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, source).unwrap();
}

pub fn file_system(base: &Path) -> Arc<dyn FileSystem> {
    let mut fs = LocalFileSystem::new(base);
    fs.add_template("__appdata__", base);
    Arc::new(fs)
}

pub fn registry(base: &Path) -> ModRegistry {
    ModRegistry::new(file_system(base), ENGINE_VERSION)
}

pub fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap()
}
