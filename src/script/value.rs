//! Interpreter-independent snapshot of a Lua value.
//!
//! Moving a value from one Lua state to another goes through [`ScriptValue`]:
//! the source is fully extracted first and only then rebuilt in the
//! destination, so a failed extraction never touches the destination state
//! and the destination never holds a reference into the source.

use std::collections::HashSet;
use std::ffi::c_void;

use mlua::{ChunkMode, LightUserData, Lua, Table, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CopyError {
    #[error("recursive data: a table contains itself")]
    RecursiveData,
    #[error("values of type {0} cannot be copied between interpreters")]
    UnsupportedValue(&'static str),
    #[error("native functions cannot be copied between interpreters")]
    NativeFunction,
    #[error(transparent)]
    Lua(#[from] mlua::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(Vec<u8>),
    LightUserData(LightUserData),
    /// Function bytecode.
    Function(Vec<u8>),
    /// Key/value pairs in traversal order, which is unspecified.
    Table(Vec<(ScriptValue, ScriptValue)>),
}

impl ScriptValue {
    /// Extracts `value` from its interpreter.
    ///
    /// Fails with [`CopyError::RecursiveData`] if a table is reachable from
    /// itself. A table referenced twice without forming a cycle is copied
    /// twice.
    pub fn from_lua(value: &Value) -> Result<ScriptValue, CopyError> {
        let mut visiting = HashSet::new();
        Self::extract(value, &mut visiting)
    }

    fn extract(value: &Value, visiting: &mut HashSet<*const c_void>) -> Result<ScriptValue, CopyError> {
        Ok(match value {
            Value::Nil => ScriptValue::Nil,
            Value::Boolean(b) => ScriptValue::Boolean(*b),
            Value::Integer(i) => ScriptValue::Integer(*i),
            Value::Number(n) => ScriptValue::Number(*n),
            Value::String(s) => ScriptValue::String(s.as_bytes().to_vec()),
            Value::LightUserData(ud) => ScriptValue::LightUserData(*ud),
            Value::Function(f) => {
                let bytecode = f.dump(false);
                if bytecode.is_empty() {
                    return Err(CopyError::NativeFunction);
                }
                ScriptValue::Function(bytecode)
            }
            Value::Table(table) => Self::extract_table(table, visiting)?,
            other => return Err(CopyError::UnsupportedValue(other.type_name())),
        })
    }

    fn extract_table(table: &Table, visiting: &mut HashSet<*const c_void>) -> Result<ScriptValue, CopyError> {
        let identity = table.to_pointer();
        if !visiting.insert(identity) {
            return Err(CopyError::RecursiveData);
        }

        let mut pairs = Vec::new();
        for pair in table.pairs::<Value, Value>() {
            let (key, value) = pair?;
            pairs.push((Self::extract(&key, visiting)?, Self::extract(&value, visiting)?));
        }

        visiting.remove(&identity);
        Ok(ScriptValue::Table(pairs))
    }

    /// Rebuilds the value inside `lua`.
    pub fn to_lua(&self, lua: &Lua) -> mlua::Result<Value> {
        Ok(match self {
            ScriptValue::Nil => Value::Nil,
            ScriptValue::Boolean(b) => Value::Boolean(*b),
            ScriptValue::Integer(i) => Value::Integer(*i),
            ScriptValue::Number(n) => Value::Number(*n),
            ScriptValue::String(bytes) => Value::String(lua.create_string(bytes)?),
            ScriptValue::LightUserData(ud) => Value::LightUserData(*ud),
            ScriptValue::Function(bytecode) => Value::Function(
                lua.load(bytecode.as_slice())
                    .set_mode(ChunkMode::Binary)
                    .set_name("=copied function")
                    .into_function()?,
            ),
            ScriptValue::Table(pairs) => {
                let table = lua.create_table_with_capacity(0, pairs.len())?;
                for (key, value) in pairs {
                    table.raw_set(key.to_lua(lua)?, value.to_lua(lua)?)?;
                }
                Value::Table(table)
            }
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Nil => "nil",
            ScriptValue::Boolean(_) => "boolean",
            ScriptValue::Integer(_) => "integer",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::LightUserData(_) => "lightuserdata",
            ScriptValue::Function(_) => "function",
            ScriptValue::Table(_) => "table",
        }
    }

    /// Looks up a string-keyed field of a table.
    pub fn field(&self, name: &str) -> Option<&ScriptValue> {
        let ScriptValue::Table(pairs) = self else {
            return None;
        };
        pairs.iter().find_map(|(key, value)| match key {
            ScriptValue::String(bytes) if bytes == name.as_bytes() => Some(value),
            _ => None,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }
}
