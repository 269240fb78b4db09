//! Typed definitions materialized from the definition store.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use mlua::{Lua, Table, Value};

use crate::{Error, Result};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Kinds of definitions. The discriminant is the stable type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrototypeKind {
    /// Abstract root of the tree.
    Prototype = 1,
    Controller = 2,
}

impl PrototypeKind {
    pub const ALL: [PrototypeKind; 2] = [PrototypeKind::Prototype, PrototypeKind::Controller];

    pub fn type_id(self) -> u64 {
        self as u64
    }

    pub fn type_name(self) -> &'static str {
        match self {
            PrototypeKind::Prototype => "prototype",
            PrototypeKind::Controller => "controller",
        }
    }

    pub fn from_type_name(name: &str) -> Option<PrototypeKind> {
        PrototypeKind::ALL.into_iter().find(|k| k.type_name() == name)
    }

    /// Direct children in the type tree.
    pub fn children(self) -> &'static [PrototypeKind] {
        match self {
            PrototypeKind::Prototype => &[PrototypeKind::Controller],
            PrototypeKind::Controller => &[],
        }
    }

    /// `self` followed by every kind below it, depth first.
    pub fn with_descendants(self) -> Vec<PrototypeKind> {
        let mut kinds = vec![self];
        for child in self.children() {
            kinds.extend(child.with_descendants());
        }
        kinds
    }
}

impl fmt::Display for PrototypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    UInt64(u64),
    String(String),
}

#[derive(Clone)]
pub enum FieldValue {
    Literal(Literal),
    Vector(Vec<FieldValue>),
    Prototype(Rc<dyn Prototype>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Literal(Literal::UInt64(value)) => write!(f, "{value}"),
            FieldValue::Literal(Literal::String(value)) => f.write_str(value),
            FieldValue::Vector(items) => {
                f.write_char('{')?;
                for (index, item) in items.iter().enumerate() {
                    write!(f, "{index} = {item}, ")?;
                }
                f.write_char('}')
            }
            FieldValue::Prototype(prototype) => {
                fmt::Display::fmt(&DescriptionDump(&prototype.description()), f)
            }
        }
    }
}

/// Field name to value, used for dumping.
pub type Description = BTreeMap<String, FieldValue>;

/// Displays a description as `{\nname = value,\n...}`.
pub struct DescriptionDump<'a>(pub &'a Description);

impl fmt::Display for DescriptionDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{\n")?;
        for (name, field) in self.0 {
            writeln!(f, "{name} = {field},")?;
        }
        f.write_char('}')
    }
}

pub fn dump_description(description: &Description) -> String {
    DescriptionDump(description).to_string()
}

/// Fields every definition carries.
#[derive(Debug, Clone)]
pub struct PrototypeBase {
    id: u64,
    name: String,
    history: Vec<String>,
}

impl PrototypeBase {
    /// Validates the common shape of `definition` and assigns the next id.
    pub fn from_definition(kind: PrototypeKind, definition: &Table, history: Vec<String>) -> Result<Self> {
        let name = match definition.raw_get::<Value>("name")? {
            Value::String(name) => name.to_str()?.to_string(),
            other => {
                return Err(Error::InvalidPrototype(format!(
                    "{kind}: ROOT.name must be a string, found {}",
                    other.type_name()
                )))
            }
        };

        Ok(PrototypeBase {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name,
            history,
        })
    }

    pub fn describe(&self) -> Description {
        let mut description = Description::new();
        description.insert(
            "name".into(),
            FieldValue::Literal(Literal::String(self.name.clone())),
        );
        description.insert("id".into(), FieldValue::Literal(Literal::UInt64(self.id)));
        description.insert(
            "history".into(),
            FieldValue::Vector(
                self.history
                    .iter()
                    .map(|m| FieldValue::Literal(Literal::String(m.clone())))
                    .collect(),
            ),
        );
        description
    }
}

pub trait Prototype {
    fn kind(&self) -> PrototypeKind;

    fn base(&self) -> &PrototypeBase;

    fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }

    fn id(&self) -> u64 {
        self.base().id
    }

    fn name(&self) -> &str {
        &self.base().name
    }

    /// Mods that defined this prototype, in load order. The last one owns it.
    fn history(&self) -> &[String] {
        &self.base().history
    }

    fn description(&self) -> Description {
        self.base().describe()
    }

    fn dump(&self) -> String {
        dump_description(&self.description())
    }

    /// Builds an API table exposing this prototype to scripts.
    fn to_lua_table(&self, lua: &Lua) -> mlua::Result<Table> {
        let table = lua.create_table()?;

        let type_name = self.type_name();
        table.set("get_type_name", lua.create_function(move |_, ()| Ok(type_name))?)?;

        let name = self.name().to_string();
        table.set("get_name", lua.create_function(move |_, ()| Ok(name.clone()))?)?;

        let id = self.id();
        table.set("get_id", lua.create_function(move |_, ()| Ok(id))?)?;

        let history = self.history().to_vec();
        table.set("get_history", lua.create_function(move |_, ()| Ok(history.clone()))?)?;

        Ok(table)
    }
}

pub struct ControllerPrototype {
    base: PrototypeBase,
}

impl ControllerPrototype {
    pub fn from_definition(definition: &Table, history: Vec<String>) -> Result<Self> {
        Ok(ControllerPrototype {
            base: PrototypeBase::from_definition(PrototypeKind::Controller, definition, history)?,
        })
    }
}

impl Prototype for ControllerPrototype {
    fn kind(&self) -> PrototypeKind {
        PrototypeKind::Controller
    }

    fn base(&self) -> &PrototypeBase {
        &self.base
    }
}

/// Constructs the concrete prototype for `kind`.
pub fn build(kind: PrototypeKind, definition: &Table, history: Vec<String>) -> Result<Rc<dyn Prototype>> {
    match kind {
        PrototypeKind::Controller => Ok(Rc::new(ControllerPrototype::from_definition(definition, history)?)),
        PrototypeKind::Prototype => Err(Error::InvalidPrototype(format!(
            "type '{kind}' is abstract and cannot be instantiated"
        ))),
    }
}
