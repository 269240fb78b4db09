//! Lua state bring-up for mod scripts and the definition store.

use std::path::PathBuf;
use std::sync::Arc;

use mlua::{Function, Lua, LuaOptions, MultiValue, StdLib, Value};
use tracing::debug;

use crate::fs::FileSystem;

/// Standard libraries available to mod scripts on top of the base library.
pub fn script_libs() -> StdLib {
    StdLib::MATH | StdLib::STRING | StdLib::TABLE
}

/// Creates a state with [`script_libs`] and without file access globals.
///
/// Functions are moved between states as bytecode, which mlua only loads in
/// states created in unsafe mode. Scripts themselves get a `load` restricted
/// to text chunks, so only host code can load bytecode.
pub fn new_state() -> mlua::Result<Lua> {
    // SAFETY: binary chunks are only loaded by the host from `Function::dump`
    // output; the script-visible `load` is replaced by a text-only one below.
    let lua = unsafe { Lua::unsafe_new_with(script_libs(), LuaOptions::default()) };

    let globals = lua.globals();
    globals.set("dofile", Value::Nil)?;
    globals.set("loadfile", Value::Nil)?;

    let load: Function = globals.get("load")?;
    let text_load = lua.create_function(move |lua, args: MultiValue| {
        let mut args = args.into_iter();
        let chunk = args.next().unwrap_or(Value::Nil);
        let name = args.next().unwrap_or(Value::Nil);
        let _mode = args.next();

        let mut forwarded = vec![chunk, name, Value::String(lua.create_string("t")?)];
        // An explicit nil environment differs from no environment at all.
        forwarded.extend(args.next());
        load.call::<MultiValue>(MultiValue::from_vec(forwarded))
    })?;
    globals.set("load", text_load)?;

    Ok(lua)
}

/// Installs a `require` that resolves `a.b` to `<root>/a/b.lua` through `fs`.
///
/// Modules are cached per state in the same way as the stock `require`, and a
/// module that returns nothing is cached as `true`.
pub fn install_require(lua: &Lua, fs: Arc<dyn FileSystem>, root: PathBuf) -> mlua::Result<()> {
    let loaded = lua.create_table()?;

    let require = lua.create_function(move |lua, module: String| {
        let cached: Value = loaded.raw_get(module.as_str())?;
        if !cached.is_nil() {
            return Ok(cached);
        }

        if module.is_empty() || module.split('.').any(|part| part.is_empty() || part == "..") {
            return Err(mlua::Error::runtime(format!("invalid module name '{module}'")));
        }

        let mut path = root.clone();
        path.extend(module.split('.'));
        path.set_extension("lua");

        let source = fs.read_to_string(&path).map_err(|e| {
            mlua::Error::runtime(format!("module '{module}' not found at {}: {e}", path.display()))
        })?;
        debug!("Loading module {module} from {}", path.display());

        let value: Value = lua
            .load(source)
            .set_name(format!("@{}", path.display()))
            .call(module.as_str())?;
        let value = if value.is_nil() { Value::Boolean(true) } else { value };

        loaded.raw_set(module.as_str(), value.clone())?;
        Ok(value)
    })?;

    lua.globals().set("require", require)
}
