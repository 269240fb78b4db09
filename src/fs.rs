use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use tracing_unwrap::OptionExt;

/// Filesystem capability the registry and the script sandbox work through.
///
/// Paths handed to the registry may be templated (`__appdata__/mods`), so every
/// operation resolves its argument with [`FileSystem::correct_path`] first.
pub trait FileSystem: Send + Sync {
    /// Resolves path templates and makes relative paths absolute.
    fn correct_path(&self, path: &Path) -> PathBuf;

    fn exists(&self, path: &Path) -> bool {
        self.correct_path(path).exists()
    }

    fn is_directory(&self, path: &Path) -> bool {
        self.correct_path(path).is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        self.correct_path(path).is_file()
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        self.correct_path(path).canonicalize()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(self.correct_path(path))
    }

    /// Writes `contents`, creating the file and its parent directories if needed.
    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let path = self.correct_path(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(self.correct_path(path))
    }

    /// Immediate children of a directory, sorted by path.
    fn entries(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = self
            .correct_path(path)
            .read_dir()?
            .map(|entry| -> io::Result<PathBuf> { Ok(entry?.path()) })
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }
}

/// [`FileSystem`] over the local disk with `__name__` path templates.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    base: PathBuf,
    templates: BTreeMap<String, PathBuf>,
}

impl LocalFileSystem {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        LocalFileSystem {
            base: base.into(),
            templates: BTreeMap::new(),
        }
    }

    /// `__local__` is the working directory, `__root__` the directory holding
    /// the executable and `__appdata__` the per-user data directory.
    pub fn with_default_templates() -> io::Result<Self> {
        let local = std::env::current_dir()?;
        let root = std::env::current_exe()?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| local.clone());
        let appdata = dirs::data_dir()
            .expect_or_log("Failed to get user data directory")
            .join("FactAstra");

        if !appdata.is_dir() {
            debug!("Creating data directory {}", appdata.display());
            std::fs::create_dir_all(&appdata)?;
        }

        let mut fs = LocalFileSystem::new(&root);
        fs.add_template("__local__", local);
        fs.add_template("__root__", root);
        fs.add_template("__appdata__", appdata);
        Ok(fs)
    }

    pub fn add_template(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.templates.insert(name.into(), path.into());
    }
}

impl FileSystem for LocalFileSystem {
    fn correct_path(&self, path: &Path) -> PathBuf {
        let mut components = path.components();

        if let Some(Component::Normal(first)) = components.next() {
            if let Some(target) = first.to_str().and_then(|name| self.templates.get(name)) {
                return target.join(components.as_path());
            }
        }

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }
}
