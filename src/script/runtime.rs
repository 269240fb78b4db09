use mlua::Lua;
use tracing::debug;

use super::sandbox;

type Hook<D> = Box<dyn FnMut(&Lua, &D) -> mlua::Result<()>>;

/// Owns at most one transient Lua state at a time.
///
/// `prepare` runs on every freshly created state and `cleanup` right before a
/// state is dropped. Both default to no-ops and can be swapped between load
/// phases.
pub struct ScriptRuntime<D> {
    lua: Option<Lua>,
    prepare: Hook<D>,
    cleanup: Hook<D>,
}

impl<D> Default for ScriptRuntime<D> {
    fn default() -> Self {
        ScriptRuntime {
            lua: None,
            prepare: Box::new(|_, _| Ok(())),
            cleanup: Box::new(|_, _| Ok(())),
        }
    }
}

impl<D> ScriptRuntime<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_prepare(&mut self, hook: impl FnMut(&Lua, &D) -> mlua::Result<()> + 'static) {
        self.prepare = Box::new(hook);
    }

    pub fn set_cleanup(&mut self, hook: impl FnMut(&Lua, &D) -> mlua::Result<()> + 'static) {
        self.cleanup = Box::new(hook);
    }

    pub fn is_active(&self) -> bool {
        self.lua.is_some()
    }

    /// Replaces the active state, if any, with a fresh prepared one.
    ///
    /// If `prepare` fails the runtime is left without a state.
    pub fn create(&mut self, data: &D) -> mlua::Result<()> {
        self.dispose(data)?;

        let lua = sandbox::new_state()?;
        (self.prepare)(&lua, data)?;
        debug!("Script state created");
        self.lua = Some(lua);
        Ok(())
    }

    /// Runs `cleanup` and drops the active state. The state is dropped even if
    /// `cleanup` fails.
    pub fn dispose(&mut self, data: &D) -> mlua::Result<()> {
        let Some(lua) = self.lua.take() else {
            return Ok(());
        };

        let result = (self.cleanup)(&lua, data);
        drop(lua);
        debug!("Script state disposed");
        result
    }

    /// Calls `f` with the active state, or returns `None` without a state.
    pub fn run<R>(&self, data: &D, f: impl FnOnce(&Lua, &D) -> R) -> Option<R> {
        self.lua.as_ref().map(|lua| f(lua, data))
    }
}
