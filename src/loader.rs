use std::path::PathBuf;
use std::sync::Arc;

use itertools::Itertools;
use mlua::Value;
use tracing::{debug, info, warn};

use crate::fs::FileSystem;
use crate::model::ModRecord;
use crate::registry::ModRegistry;
use crate::script::{sandbox, DefinitionStore, ScriptRuntime};
use crate::{Error, Result};

/// Script run for every mod, relative to the mod root.
pub const DATA_SCRIPT: &str = "data.lua";

/// What a script state needs to know about the mod it runs for.
pub struct ModContext {
    pub name: String,
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Mods whose script ran (or that had none), in load order.
    pub loaded: Vec<String>,
    /// Enabled mods that could not be loaded, such as archives.
    pub skipped: Vec<String>,
    pub prototypes: usize,
}

/// Enabled mods in load order: `core`, then `base`, then the rest by name.
pub fn load_order(registry: &ModRegistry) -> Vec<&ModRecord> {
    registry
        .mods()
        .values()
        .filter(|record| record.enabled)
        .sorted_by_key(|record| match record.name.as_str() {
            "core" => 0,
            "base" => 1,
            _ => 2,
        })
        .collect()
}

/// Runs every enabled mod's script against one definition store, one script
/// state per mod.
pub struct ModLoader {
    store: DefinitionStore,
    runtime: ScriptRuntime<ModContext>,
}

impl ModLoader {
    pub fn new() -> Result<Self> {
        let store = DefinitionStore::new()?;
        let mut runtime = ScriptRuntime::new();

        let api = store.clone();
        runtime.set_prepare(move |lua, context: &ModContext| {
            lua.globals().set("storage", api.push(lua)?)?;
            sandbox::install_require(lua, context.fs.clone(), context.root.clone())
        });
        runtime.set_cleanup(|lua, _| lua.globals().set("storage", Value::Nil));

        Ok(ModLoader { store, runtime })
    }

    pub fn store(&self) -> &DefinitionStore {
        &self.store
    }

    /// Runs all enabled mods and materializes their prototypes.
    ///
    /// The first failing script aborts the load. Loading again requires
    /// [`ModLoader::clear`].
    pub fn load(&mut self, registry: &ModRegistry) -> Result<LoadReport> {
        if self.store.is_loaded() {
            return Err(Error::AlreadyLoaded("mod prototypes".into()));
        }

        let mut report = LoadReport::default();

        for record in load_order(registry) {
            if record.is_archive {
                warn!("Skipping {}: archive mods are not supported", record.name);
                report.skipped.push(record.name.clone());
                continue;
            }

            let context = ModContext {
                name: record.name.clone(),
                root: record.path.clone(),
                fs: registry.file_system().clone(),
            };

            self.store.set_current_mod(Some(&record.name));
            let result = self.run_mod(&context);
            let disposed = self.runtime.dispose(&context);
            self.store.set_current_mod(None);

            result?;
            disposed.map_err(|source| Error::Script {
                name: record.name.clone(),
                source,
            })?;

            info!("Loaded mod {} {}", record.name, record.version);
            report.loaded.push(record.name.clone());
        }

        report.prototypes = self.store.load()?;
        Ok(report)
    }

    fn run_mod(&mut self, context: &ModContext) -> Result<()> {
        let script_error = |source: mlua::Error| Error::Script {
            name: context.name.clone(),
            source,
        };

        self.runtime.create(context).map_err(script_error)?;

        let script = context.root.join(DATA_SCRIPT);
        if !context.fs.is_file(&script) {
            debug!("Mod {} has no {DATA_SCRIPT}", context.name);
            return Ok(());
        }

        let source = context.fs.read_to_string(&script)?;
        self.runtime
            .run(context, |lua, _| {
                lua.load(source)
                    .set_name(format!("@{}", script.display()))
                    .exec()
            })
            .unwrap_or(Ok(()))
            .map_err(script_error)
    }

    /// Forgets loaded prototypes and provenance so mods can be loaded again.
    pub fn clear(&mut self) {
        self.store.clear();
    }
}
