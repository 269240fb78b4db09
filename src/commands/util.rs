use std::collections::BTreeMap;
use std::io::{self, Write};

use colored::Colorize;
use regex::Regex;

use crate::model::ModRecord;

/// Console arguments split into `-option value` pairs, `--flag`s and the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    pub options: BTreeMap<String, String>,
    pub flags: BTreeMap<String, bool>,
    pub unparsed: Vec<String>,
}

impl Arguments {
    pub fn option(&self, name: &str) -> &str {
        self.options.get(name).map(String::as_str).unwrap_or_default()
    }

    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn first(&self) -> Option<&str> {
        self.unparsed.first().map(String::as_str)
    }
}

/// Parses arguments against known options (with defaults) and known flags.
///
/// Unknown options and flags, and an option missing its value, end up in
/// `unparsed` together with positional arguments.
pub fn parse_arguments(args: &[String], options: &[(&str, &str)], flags: &[&str]) -> Arguments {
    let mut parsed = Arguments {
        options: options
            .iter()
            .map(|(name, default)| (name.to_string(), default.to_string()))
            .collect(),
        flags: flags.iter().map(|name| (name.to_string(), false)).collect(),
        unparsed: Vec::new(),
    };

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        if let Some(flag) = arg.strip_prefix("--") {
            match parsed.flags.get_mut(flag) {
                Some(value) => *value = true,
                None => parsed.unparsed.push(arg.clone()),
            }
        } else if let Some(option) = arg.strip_prefix('-').filter(|o| !o.is_empty()) {
            match (parsed.options.get_mut(option), args.clone().next()) {
                (Some(value), Some(next)) => {
                    *value = next.clone();
                    args.next();
                }
                _ => parsed.unparsed.push(arg.clone()),
            }
        } else {
            parsed.unparsed.push(arg.clone());
        }
    }

    parsed
}

/// `-t`, `-r` and `-f` selection shared by `list`, `enable` and `disable`.
pub const FILTER_OPTIONS: [(&str, &str); 3] = [("t", "all"), ("r", ".+"), ("f", "all")];

pub struct ModFilter {
    include_dir: bool,
    include_zip: bool,
    include_enabled: bool,
    include_disabled: bool,
    pattern: Regex,
}

impl ModFilter {
    /// The pattern must match the whole mod name.
    pub fn from_arguments(args: &Arguments) -> Result<Self, regex::Error> {
        Ok(ModFilter {
            include_dir: args.option("t") != "zip",
            include_zip: args.option("t") != "dir",
            include_enabled: args.option("f") != "disabled",
            include_disabled: args.option("f") != "enabled",
            pattern: Regex::new(&format!("^(?:{})$", args.option("r")))?,
        })
    }

    pub fn matches(&self, record: &ModRecord) -> bool {
        let kind = if record.is_archive {
            self.include_zip
        } else {
            self.include_dir
        };
        let state = if record.enabled {
            self.include_enabled
        } else {
            self.include_disabled
        };
        kind && state && self.pattern.is_match(&record.name)
    }
}

/// Draws a titled box with one branch per row.
pub fn write_tree(out: &mut dyn Write, title: &str, rows: &[(&str, String)]) -> io::Result<()> {
    let title_corner = boxy::Char::upper_left(boxy::Weight::Thick);
    let title_side_h = boxy::Char::horizontal(boxy::Weight::Thick).to_string();
    let title_side_v = boxy::Char::vertical(boxy::Weight::Thick);
    let title_branch = boxy::Char::right_tee(boxy::Weight::Thick).down(boxy::Weight::Normal);
    let left_branch_more = boxy::Char::right_tee(boxy::Weight::Normal);
    let left_branch_done = boxy::Char::lower_left(boxy::Weight::Normal);
    let left_node = boxy::Char::left_half(boxy::Weight::Normal);

    let width = title.chars().count() + 2;
    writeln!(
        out,
        "{}{}{}",
        title_corner,
        title_side_h.repeat(width),
        title_corner.rotate_cw(1)
    )?;
    writeln!(out, "{} {} {}", title_side_v, title.bold(), title_side_v)?;
    writeln!(
        out,
        "{}{}{}",
        title_branch,
        title_side_h.repeat(width),
        title_corner.rotate_cw(2)
    )?;

    let mut rows = rows.iter().peekable();
    while let Some((label, value)) = rows.next() {
        let branch = if rows.peek().is_some() {
            left_branch_more
        } else {
            left_branch_done
        };
        writeln!(out, "{}{}{} {}", branch, left_node, format!("{label}:").bold(), value)?;
    }

    Ok(())
}
