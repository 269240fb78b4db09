mod prototype;
mod runtime;
pub mod sandbox;
mod storage;
mod value;

pub use prototype::{
    build as build_prototype, dump_description, ControllerPrototype, Description, DescriptionDump,
    FieldValue, Literal, Prototype, PrototypeBase, PrototypeKind,
};
pub use runtime::ScriptRuntime;
pub use storage::DefinitionStore;
pub use value::{CopyError, ScriptValue};
