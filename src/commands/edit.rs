use std::io::{self, Write};

use super::util::{self, ModFilter};
use crate::registry::ModRegistry;

/// Mod that can never be disabled or removed from the console.
pub const CORE_MOD: &str = "core";
/// Mod that can only be disabled explicitly and never removed.
pub const BASE_MOD: &str = "base";

pub fn enable(registry: &mut ModRegistry, args: &[String], out: &mut dyn Write) -> io::Result<()> {
    set_enabled(registry, args, true, out)
}

pub fn disable(registry: &mut ModRegistry, args: &[String], out: &mut dyn Write) -> io::Result<()> {
    set_enabled(registry, args, false, out)
}

fn set_enabled(registry: &mut ModRegistry, args: &[String], enabled: bool, out: &mut dyn Write) -> io::Result<()> {
    let args = util::parse_arguments(args, &util::FILTER_OPTIONS, &["includebase"]);
    let include_base = args.flag("includebase");
    let protected = |name: &str| !enabled && (name == CORE_MOD || (name == BASE_MOD && !include_base));

    if let Some(name) = args.first() {
        if protected(name) {
            return writeln!(out, "Attempt to disable core/base mod.");
        }
        if !registry.set_mod_enabled(name, enabled) {
            writeln!(out, "Specified mod is not present in the configuration.")?;
        }
        return Ok(());
    }

    let filter = match ModFilter::from_arguments(&args) {
        Ok(filter) => filter,
        Err(e) => return writeln!(out, "Invalid -r pattern: {e}"),
    };

    let selected: Vec<String> = registry
        .mods()
        .values()
        .filter(|record| filter.matches(record) && !protected(&record.name))
        .map(|record| record.name.clone())
        .collect();

    for name in &selected {
        registry.set_mod_enabled(name, enabled);
    }
    writeln!(
        out,
        "{} {} mod(s).",
        if enabled { "Enabled" } else { "Disabled" },
        selected.len()
    )
}
