use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use mlua::{Lua, Table, Value};
use tracing::{debug, info};

use super::prototype::{self, Prototype, PrototypeKind};
use super::sandbox;
use super::value::ScriptValue;
use crate::{Error, Result};

type History = BTreeMap<String, BTreeMap<String, Vec<String>>>;
type PrototypeSet = BTreeMap<PrototypeKind, BTreeMap<String, Rc<dyn Prototype>>>;

struct StoreState {
    lua: Lua,
    /// Type name to bucket table, held in `lua`.
    root: Table,
    history: History,
    current_mod: Option<String>,
    prototypes: Option<PrototypeSet>,
}

/// Durable store of definitions contributed by mod scripts.
///
/// Definitions live in a Lua state of their own that outlives every script
/// state. Scripts reach it through the table built by [`DefinitionStore::push`];
/// everything they add is deep-copied in, so nothing in the store refers back
/// into a script state.
#[derive(Clone)]
pub struct DefinitionStore {
    state: Rc<RefCell<StoreState>>,
}

impl DefinitionStore {
    pub fn new() -> Result<Self> {
        let lua = sandbox::new_state()?;
        let root = lua.create_table()?;
        let mut history = History::new();

        for kind in PrototypeKind::ALL {
            root.raw_set(kind.type_name(), lua.create_table()?)?;
            history.insert(kind.type_name().to_string(), BTreeMap::new());
        }

        Ok(DefinitionStore {
            state: Rc::new(RefCell::new(StoreState {
                lua,
                root,
                history,
                current_mod: None,
                prototypes: None,
            })),
        })
    }

    /// Builds the `add`/`extend`/`get`/`get_name_list`/`get_type_list` table
    /// inside a script state.
    pub fn push(&self, lua: &Lua) -> mlua::Result<Table> {
        let api = lua.create_table()?;

        let state = self.state.clone();
        api.set(
            "add",
            lua.create_function(move |_, definition: Value| add_definition(&state, &definition))?,
        )?;

        let state = self.state.clone();
        api.set(
            "extend",
            lua.create_function(move |_, definitions: Value| {
                let Value::Table(definitions) = definitions else {
                    return Err(mlua::Error::runtime(format!(
                        "invalid value for #1 (prototype array): table expected, got {}",
                        definitions.type_name()
                    )));
                };
                for definition in definitions.sequence_values::<Value>() {
                    add_definition(&state, &definition?)?;
                }
                Ok(())
            })?,
        )?;

        let state = self.state.clone();
        api.set(
            "get",
            lua.create_function(move |lua, (type_name, name): (String, String)| {
                let value = lookup(&state.borrow(), &type_name, &name)?;
                value.to_lua(lua)
            })?,
        )?;

        let state = self.state.clone();
        api.set(
            "get_name_list",
            lua.create_function(move |_, type_name: String| {
                name_list(&state.borrow(), &type_name)
            })?,
        )?;

        api.set(
            "get_type_list",
            lua.create_function(|_, ()| Ok(type_list()))?,
        )?;

        Ok(api)
    }

    /// Attributes subsequent `add` calls to `name` in the provenance history.
    pub fn set_current_mod(&self, name: Option<&str>) {
        self.state.borrow_mut().current_mod = name.map(str::to_string);
    }

    /// Copy of a stored definition, or `None` if the name is not defined.
    pub fn get(&self, type_name: &str, name: &str) -> Result<Option<ScriptValue>> {
        match lookup(&self.state.borrow(), type_name, name)? {
            ScriptValue::Nil => Ok(None),
            value => Ok(Some(value)),
        }
    }

    pub fn name_list(&self, type_name: &str) -> Result<Vec<String>> {
        Ok(name_list(&self.state.borrow(), type_name)?)
    }

    pub fn type_list(&self) -> Vec<String> {
        type_list()
    }

    /// Mods that defined `type_name`/`name`, in load order.
    pub fn history(&self, type_name: &str, name: &str) -> Vec<String> {
        self.state
            .borrow()
            .history
            .get(type_name)
            .and_then(|names| names.get(name))
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.borrow().prototypes.is_some()
    }

    /// Turns every stored definition into a typed prototype.
    ///
    /// Any invalid definition fails the whole load and nothing is kept.
    pub fn load(&self) -> Result<usize> {
        let mut state = self.state.borrow_mut();
        if state.prototypes.is_some() {
            return Err(Error::AlreadyLoaded("prototypes".into()));
        }

        let mut prototypes = PrototypeSet::new();
        let mut count = 0;

        for kind in PrototypeKind::ALL {
            let bucket: Table = state.root.raw_get(kind.type_name())?;
            let histories = state.history.get(kind.type_name());
            let built = prototypes.entry(kind).or_default();

            for pair in bucket.pairs::<String, Table>() {
                let (name, definition) = pair?;
                let history = histories
                    .and_then(|h| h.get(&name))
                    .cloned()
                    .unwrap_or_default();

                let prototype = prototype::build(kind, &definition, history)
                    .map_err(|e| match e {
                        Error::InvalidPrototype(reason) => {
                            Error::InvalidPrototype(format!("{kind} '{name}': {reason}"))
                        }
                        other => other,
                    })?;
                debug!("Loaded {kind} {name} with id {}", prototype.id());
                built.insert(name, prototype);
                count += 1;
            }
        }

        info!("Loaded {count} prototype(s)");
        state.prototypes = Some(prototypes);
        Ok(count)
    }

    /// Loaded prototypes of `base`, plus every kind below it when `recursive`.
    pub fn find_prototypes(&self, base: PrototypeKind, recursive: bool) -> BTreeMap<PrototypeKind, Vec<Rc<dyn Prototype>>> {
        let state = self.state.borrow();
        let kinds = if recursive {
            base.with_descendants()
        } else {
            vec![base]
        };

        kinds
            .into_iter()
            .map(|kind| {
                let found = state
                    .prototypes
                    .as_ref()
                    .and_then(|set| set.get(&kind))
                    .map(|named| named.values().cloned().collect())
                    .unwrap_or_default();
                (kind, found)
            })
            .collect()
    }

    pub fn get_prototype(&self, kind: PrototypeKind, name: &str) -> Option<Rc<dyn Prototype>> {
        self.state
            .borrow()
            .prototypes
            .as_ref()?
            .get(&kind)?
            .get(name)
            .cloned()
    }

    /// Drops loaded prototypes and provenance history. Stored definitions are
    /// kept.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.prototypes = None;
        for names in state.history.values_mut() {
            names.clear();
        }
    }
}

fn add_definition(state: &RefCell<StoreState>, definition: &Value) -> mlua::Result<()> {
    let Value::Table(table) = definition else {
        return Err(mlua::Error::runtime(format!(
            "invalid prototype: table expected, got {}",
            definition.type_name()
        )));
    };

    let type_name = string_field(table, "type")?;
    let name = string_field(table, "name")?;

    let copied = ScriptValue::from_lua(definition).map_err(mlua::Error::external)?;

    let mut state = state.borrow_mut();
    bucket(&state, &type_name)?.raw_set(name.as_str(), copied.to_lua(&state.lua)?)?;

    if let Some(current_mod) = state.current_mod.clone() {
        state
            .history
            .entry(type_name.clone())
            .or_default()
            .entry(name.clone())
            .or_default()
            .push(current_mod);
    }

    debug!("Stored {type_name} {name}");
    Ok(())
}

fn string_field(table: &Table, key: &str) -> mlua::Result<String> {
    match table.raw_get::<Value>(key)? {
        Value::String(value) => Ok(value.to_str()?.to_string()),
        _ => Err(mlua::Error::runtime(format!(
            "missing field `{key}` at ROOT, string expected"
        ))),
    }
}

fn bucket(state: &StoreState, type_name: &str) -> mlua::Result<Table> {
    match state.root.raw_get(type_name)? {
        Value::Table(bucket) => Ok(bucket),
        _ => Err(mlua::Error::runtime(format!(
            "unknown prototype type '{type_name}'"
        ))),
    }
}

fn lookup(state: &StoreState, type_name: &str, name: &str) -> mlua::Result<ScriptValue> {
    let value: Value = bucket(state, type_name)?.raw_get(name)?;
    ScriptValue::from_lua(&value).map_err(mlua::Error::external)
}

fn name_list(state: &StoreState, type_name: &str) -> mlua::Result<Vec<String>> {
    let mut names = bucket(state, type_name)?
        .pairs::<String, Value>()
        .map(|pair| pair.map(|(name, _)| name))
        .collect::<mlua::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

fn type_list() -> Vec<String> {
    PrototypeKind::ALL
        .iter()
        .map(|kind| kind.type_name().to_string())
        .collect()
}
