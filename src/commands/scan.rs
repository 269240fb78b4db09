use std::io::{self, Write};
use std::path::Path;

use super::edit::{BASE_MOD, CORE_MOD};
use super::util;
use crate::registry::ModRegistry;

fn missing(out: &mut dyn Write, parameter: &str) -> io::Result<()> {
    writeln!(out, "Missing value for parameter <{parameter}>.")
}

pub fn pushmod(registry: &mut ModRegistry, args: &[String], out: &mut dyn Write) -> io::Result<()> {
    let args = util::parse_arguments(args, &[], &[]);
    let Some(path) = args.first() else {
        return missing(out, "path");
    };

    match registry.add_mod(Path::new(path), true) {
        Ok(record) => writeln!(out, "Added mod {} {}.", record.name, record.version),
        Err(e) => writeln!(out, "Operation failed because of an error: {e}"),
    }
}

pub fn pushdir(registry: &mut ModRegistry, args: &[String], out: &mut dyn Write) -> io::Result<()> {
    let args = util::parse_arguments(args, &[], &[]);
    let Some(path) = args.first() else {
        return missing(out, "path");
    };

    match registry.add_mod_directory(Path::new(path)) {
        Ok(count) => writeln!(out, "Added {count} mod(s)."),
        Err(e) => writeln!(out, "Operation failed because of an error: {e}"),
    }
}

pub fn rmmod(registry: &mut ModRegistry, args: &[String], out: &mut dyn Write) -> io::Result<()> {
    let args = util::parse_arguments(args, &[], &[]);
    let Some(name) = args.first() else {
        return missing(out, "name");
    };

    if name == CORE_MOD || name == BASE_MOD {
        return writeln!(out, "Attempt to remove core/base mod. Base mod can only be disabled.");
    }

    match registry.remove_mod(name) {
        Some(record) => writeln!(out, "Removed mod {}.", record.name),
        None => writeln!(out, "Specified mod is not present in the configuration."),
    }
}

pub fn rmdir(registry: &mut ModRegistry, args: &[String], out: &mut dyn Write) -> io::Result<()> {
    let args = util::parse_arguments(args, &[], &[]);
    let Some(path) = args.first() else {
        return missing(out, "path");
    };

    if registry.remove_mod_directory(Path::new(path)) {
        writeln!(out, "Removed directory {path}.")
    } else {
        writeln!(out, "Directory {path} is not tracked.")
    }
}

pub fn unignore(registry: &mut ModRegistry, args: &[String], out: &mut dyn Write) -> io::Result<()> {
    let args = util::parse_arguments(args, &[], &[]);
    let Some(name) = args.first() else {
        return missing(out, "name");
    };

    match registry.remove_ignored_mod(name) {
        Ok(Some(record)) => writeln!(out, "Restored mod {} {}.", record.name, record.version),
        Ok(None) => writeln!(out, "Mod {name} is no longer ignored."),
        Err(e) => writeln!(out, "Operation failed because of an error: {e}"),
    }
}
