use std::io::{self, Write};
use std::path::Path;

use colored::Colorize;

use super::util::{self, ModFilter};
use crate::error::ErrorCode;
use crate::model::ModRecord;
use crate::registry::ModRegistry;

pub fn list(registry: &ModRegistry, args: &[String], out: &mut dyn Write) -> io::Result<()> {
    let args = util::parse_arguments(args, &util::FILTER_OPTIONS, &[]);
    let filter = match ModFilter::from_arguments(&args) {
        Ok(filter) => filter,
        Err(e) => return writeln!(out, "Invalid -r pattern: {e}"),
    };

    for record in registry.mods().values().filter(|r| filter.matches(r)) {
        let name = if record.enabled {
            record.name.green()
        } else {
            record.name.red()
        };
        writeln!(
            out,
            "{} {} [{}] {}",
            name.bold(),
            record.version,
            record.kind(),
            record.title
        )?;
    }

    Ok(())
}

pub fn info(registry: &ModRegistry, args: &[String], out: &mut dyn Write) -> io::Result<()> {
    let args = util::parse_arguments(args, &[], &[]);
    let Some(target) = args.first() else {
        return writeln!(out, "Missing value for parameter <name/path>.");
    };

    let loaded;
    let record = match registry.mod_info(target) {
        Some(record) => record,
        None => match registry.load_mod_info(Path::new(target)) {
            Ok(record) => {
                loaded = record;
                &loaded
            }
            Err(e) => {
                return writeln!(
                    out,
                    "Operation has failed because of an error when loading mod information: {e}"
                )
            }
        },
    };

    write_info(record, out)
}

fn write_info(record: &ModRecord, out: &mut dyn Write) -> io::Result<()> {
    util::write_tree(
        out,
        &record.name,
        &[
            ("Title", record.title.clone()),
            ("Description", record.description.clone()),
            ("Version", record.version.to_string()),
            ("Path", record.path.display().to_string()),
            ("Type", record.kind().to_string()),
            (
                "Enabled",
                if record.enabled { "yes" } else { "no" }.to_string(),
            ),
        ],
    )
}

/// Prints a validity report for every loaded mod, a loaded mod by name, or a
/// mod on disk by path.
pub fn checkvalid(registry: &ModRegistry, args: &[String], out: &mut dyn Write) -> io::Result<()> {
    let args = util::parse_arguments(args, &[], &[]);
    writeln!(out, "{}", "Note: dependency checking is not implemented.".yellow())?;

    let valid = |name: &str, out: &mut dyn Write| -> io::Result<()> {
        util::write_tree(
            out,
            name,
            &[
                ("File structure", "valid".green().to_string()),
                ("info.json", "valid".green().to_string()),
                ("Dependencies", "valid".green().to_string()),
            ],
        )
    };

    let Some(target) = args.first() else {
        for name in registry.mods().keys() {
            valid(name, &mut *out)?;
        }
        return Ok(());
    };

    if registry.mod_info(target).is_some() {
        return valid(target, &mut *out);
    }

    let error = match registry.load_mod_info(Path::new(target)) {
        Ok(record) => return valid(&record.name, &mut *out),
        Err(error) => error,
    };

    let invalid = "invalid".red().to_string();
    let unknown = "unknown".to_string();
    match error.code() {
        ErrorCode::FsEntryDoesNotExist | ErrorCode::InvalidFilename => util::write_tree(
            out,
            target,
            &[
                ("File structure", invalid),
                ("Reason", error.to_string()),
                ("info.json", unknown.clone()),
                ("Dependencies", unknown),
            ],
        ),
        ErrorCode::InvalidJson | ErrorCode::InvalidVersionString => util::write_tree(
            out,
            target,
            &[
                ("File structure", "valid".green().to_string()),
                ("info.json", invalid),
                ("Reason", error.to_string()),
                ("Dependencies", unknown),
            ],
        ),
        ErrorCode::NotAMod => writeln!(out, "The path does not point to a mod."),
        _ => writeln!(out, "Unexpected error occurred: {error}"),
    }
}
