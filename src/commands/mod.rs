mod config;
mod edit;
mod list;
mod scan;
mod util;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use itertools::Itertools;
use parking_lot::Mutex;
use tracing::debug;

use crate::registry::ModRegistry;

pub use config::{loadconfig, saveconfig};
pub use edit::{disable, enable, BASE_MOD, CORE_MOD};
pub use list::{checkvalid, info, list};
pub use scan::{pushdir, pushmod, rmdir, rmmod, unignore};
pub use util::{parse_arguments, Arguments, ModFilter};

/// Name of the command module driving the mod registry.
pub const MODMANAGER: &str = "modmanager";

pub const COMMANDS: [&str; 12] = [
    "list",
    "checkvalid",
    "info",
    "enable",
    "disable",
    "saveconfig",
    "loadconfig",
    "pushmod",
    "pushdir",
    "rmmod",
    "rmdir",
    "unignore",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Line-oriented command console: `<module> <command> [args...]` or `quit`.
pub struct Console {
    registry: Arc<Mutex<ModRegistry>>,
    modmanager: bool,
}

impl Console {
    pub fn new(registry: Arc<Mutex<ModRegistry>>, modmanager: bool) -> Self {
        Console {
            registry,
            modmanager,
        }
    }

    /// Reads commands until `quit` or end of input.
    pub fn run(&self, input: impl BufRead, mut out: impl Write) -> io::Result<()> {
        write!(out, ">>> ")?;
        out.flush()?;

        for line in input.lines() {
            if self.execute(&line?, &mut out)? == Flow::Quit {
                break;
            }
            write!(out, ">>> ")?;
            out.flush()?;
        }

        writeln!(out, "Terminating console.")
    }

    pub fn execute(&self, line: &str, out: &mut dyn Write) -> io::Result<Flow> {
        let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();

        let (module, command, args) = match tokens.as_slice() {
            [] => return Ok(Flow::Continue),
            [quit] if quit == "quit" => return Ok(Flow::Quit),
            [single] => {
                writeln!(out, "Command '{single}' not recognized.")?;
                return Ok(Flow::Continue);
            }
            [module, command, args @ ..] => (module, command, args),
        };

        if module != MODMANAGER || !self.modmanager {
            writeln!(out, "Module '{module}' not recognized.")?;
            return Ok(Flow::Continue);
        }

        debug!("Console: {module} {command} {args:?}");
        let mut registry = self.registry.lock();
        match command.as_str() {
            "list" => list(&registry, args, out)?,
            "checkvalid" => checkvalid(&registry, args, out)?,
            "info" => info(&registry, args, out)?,
            "enable" => enable(&mut registry, args, out)?,
            "disable" => disable(&mut registry, args, out)?,
            "saveconfig" => saveconfig(&registry, args, out)?,
            "loadconfig" => loadconfig(&mut registry, args, out)?,
            "pushmod" => pushmod(&mut registry, args, out)?,
            "pushdir" => pushdir(&mut registry, args, out)?,
            "rmmod" => rmmod(&mut registry, args, out)?,
            "rmdir" => rmdir(&mut registry, args, out)?,
            "unignore" => unignore(&mut registry, args, out)?,
            _ => writeln!(
                out,
                "Command '{module} -> {command}' not recognized. Available: {}",
                COMMANDS.iter().join(", ")
            )?,
        }

        Ok(Flow::Continue)
    }
}
