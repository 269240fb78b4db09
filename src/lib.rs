//! Mod discovery, validation and script loading for the FactAstra engine.
//!
//! [`registry::ModRegistry`] tracks which mods exist and are enabled,
//! [`loader::ModLoader`] runs each enabled mod's `data.lua` and collects the
//! definitions it contributes into a [`script::DefinitionStore`].

pub mod commands;
pub mod decider;
pub mod error;
pub mod fs;
pub mod json;
pub mod loader;
pub mod model;
pub mod registry;
pub mod script;
pub mod version;

pub use error::{Error, ErrorCode, Result};
