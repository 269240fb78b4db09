use std::io::{self, Write};
use std::path::Path;

use super::util;
use crate::decider::Decider;
use crate::registry::ModRegistry;

pub fn saveconfig(registry: &ModRegistry, args: &[String], out: &mut dyn Write) -> io::Result<()> {
    let args = util::parse_arguments(args, &[], &[]);
    let Some(path) = args.first() else {
        return writeln!(out, "Missing value for parameter <path>.");
    };

    match registry.save_configuration(Path::new(path)) {
        Ok(()) => writeln!(out, "Configuration saved."),
        Err(e) => writeln!(out, "Operation failed because of an error: {e}"),
    }
}

pub fn loadconfig(registry: &mut ModRegistry, args: &[String], out: &mut dyn Write) -> io::Result<()> {
    let args = util::parse_arguments(args, &[("o", Decider::Override.name())], &["negate"]);
    let Some(path) = args.first() else {
        return writeln!(out, "Missing value for parameter <path>.");
    };

    let decider = match args.option("o").parse::<Decider>() {
        Ok(decider) => decider,
        Err(e) => return writeln!(out, "{e}"),
    };

    match registry.load_configuration(Path::new(path), decider, args.flag("negate")) {
        Ok(()) => writeln!(out, "Configuration loaded."),
        Err(e) => writeln!(out, "Operation failed because of an error: {e}"),
    }
}
