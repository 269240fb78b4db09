mod common;

use std::path::Path;
use std::sync::Arc;

use common::*;
use modloader::commands::{Console, Flow};
use parking_lot::Mutex;

struct Session {
    console: Console,
    registry: Arc<Mutex<modloader::registry::ModRegistry>>,
}

impl Session {
    fn new(base: &Path, names: &[&str]) -> Self {
        colored::control::set_override(false);

        let mods = base.join("mods");
        std::fs::create_dir_all(&mods).unwrap();
        for name in names {
            write_mod(&mods, name, name, "1.0.0");
        }
        let mut registry = registry(base);
        registry.add_mod_directory(&mods).unwrap();

        let registry = Arc::new(Mutex::new(registry));
        Session {
            console: Console::new(registry.clone(), true),
            registry,
        }
    }

    fn run(&self, line: &str) -> String {
        let mut out = Vec::new();
        assert_eq!(self.console.execute(line, &mut out).unwrap(), Flow::Continue);
        String::from_utf8(out).unwrap()
    }

    fn enabled(&self, name: &str) -> bool {
        self.registry.lock().mod_info(name).unwrap().enabled
    }
}

#[test]
fn list_applies_filters() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new(dir.path(), &["core", "base", "alpha"]);
    session.registry.lock().set_mod_enabled("alpha", false);

    let all = session.run("modmanager list");
    assert_eq!(all.lines().count(), 3);
    assert!(all.contains("alpha 1.0.0 [dir] The alpha mod"), "{all}");

    let enabled = session.run("modmanager list -f enabled");
    assert!(!enabled.contains("alpha"));
    assert!(enabled.contains("core"));

    let pattern = session.run("modmanager list -r a.*");
    assert_eq!(pattern.lines().collect::<Vec<_>>(), ["alpha 1.0.0 [dir] The alpha mod"]);

    assert!(session.run("modmanager list -t zip").is_empty());
    assert!(session.run("modmanager list -r (").contains("Invalid -r pattern"));
}

#[test]
fn core_and_base_are_protected() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new(dir.path(), &["core", "base", "alpha"]);

    assert!(session.run("modmanager disable core").contains("Attempt to disable core/base mod."));
    assert!(session.run("modmanager disable base").contains("Attempt to disable core/base mod."));
    assert!(session.enabled("core"));
    assert!(session.enabled("base"));

    session.run("modmanager disable base --includebase");
    assert!(!session.enabled("base"));

    let output = session.run("modmanager disable");
    assert!(output.contains("Disabled 1 mod(s)."), "{output}");
    assert!(session.enabled("core"));
    assert!(!session.enabled("alpha"));

    assert!(session.run("modmanager rmmod base").contains("Attempt to remove core/base mod."));
    assert!(session.registry.lock().mod_info("base").is_some());
}

#[test]
fn enable_and_remove_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new(dir.path(), &["alpha", "beta"]);

    session.run("modmanager disable alpha");
    assert!(!session.enabled("alpha"));
    session.run("modmanager enable alpha");
    assert!(session.enabled("alpha"));

    assert!(session
        .run("modmanager enable ghost")
        .contains("Specified mod is not present in the configuration."));

    assert!(session.run("modmanager rmmod beta").contains("Removed mod beta."));
    assert!(session.registry.lock().ignored().contains_key("beta"));
    assert!(session.run("modmanager unignore beta").contains("Restored mod beta"));
    assert!(session.registry.lock().mod_info("beta").is_some());
}

#[test]
fn info_by_name_and_by_path() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new(dir.path(), &["alpha"]);
    let outside = write_mod(dir.path(), "outside", "outside", "3.1");

    let by_name = session.run("modmanager info alpha");
    assert!(by_name.contains("Title: The alpha mod"), "{by_name}");
    assert!(by_name.contains("Version: 1.0.0"));
    assert!(by_name.contains("Enabled: yes"));

    let by_path = session.run(&format!("modmanager info {}", outside.display()));
    assert!(by_path.contains("outside"), "{by_path}");
    assert!(by_path.contains("Description: Adds outside"));
    assert!(session.registry.lock().mod_info("outside").is_none());

    let missing = session.run("modmanager info nowhere");
    assert!(missing.contains("error when loading mod information"), "{missing}");
    assert!(session.run("modmanager info").contains("Missing value for parameter <name/path>."));
}

#[test]
fn checkvalid_reports_broken_manifests() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new(dir.path(), &["alpha"]);
    let broken = write_mod_with(dir.path(), "broken", "{ not json");

    let report = session.run(&format!("modmanager checkvalid {}", broken.display()));
    assert!(report.contains("dependency checking is not implemented"));
    assert!(report.contains("info.json: invalid"), "{report}");
    assert!(report.contains("File structure: valid"));

    let loaded = session.run("modmanager checkvalid alpha");
    assert!(loaded.contains("info.json: valid"), "{loaded}");

    let empty = dir.path().join("empty");
    std::fs::create_dir_all(&empty).unwrap();
    let no_manifest = session.run(&format!("modmanager checkvalid {}", empty.display()));
    assert!(no_manifest.contains("File structure: invalid"), "{no_manifest}");

    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "hello").unwrap();
    let not_a_mod = session.run(&format!("modmanager checkvalid {}", notes.display()));
    assert!(not_a_mod.contains("does not point to a mod"), "{not_a_mod}");
}

#[test]
fn configuration_commands() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new(dir.path(), &["alpha", "beta"]);
    let saved = dir.path().join("config.json");

    session.run("modmanager disable beta");
    assert!(session
        .run(&format!("modmanager saveconfig {}", saved.display()))
        .contains("Configuration saved."));

    session.run("modmanager enable beta");
    let bad = session.run(&format!("modmanager loadconfig {} -o maybe", saved.display()));
    assert!(bad.contains("Unknown decider 'maybe'"), "{bad}");
    assert!(session.enabled("beta"));

    let loaded = session.run(&format!("modmanager loadconfig {} -o and", saved.display()));
    assert!(loaded.contains("Configuration loaded."), "{loaded}");
    assert!(!session.enabled("beta"));
    assert!(session.enabled("alpha"));

    session.run(&format!("modmanager loadconfig {} --negate", saved.display()));
    assert!(session.enabled("beta"));
    assert!(!session.enabled("alpha"));
}

#[test]
fn directory_commands() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new(dir.path(), &[]);
    let more = dir.path().join("more");
    write_mod(&more, "gamma", "gamma", "1.0");
    let single = write_mod(dir.path(), "single", "single", "1.0");

    assert!(session
        .run(&format!("modmanager pushdir {}", more.display()))
        .contains("Added 1 mod(s)."));
    assert!(session
        .run(&format!("modmanager pushmod {}", single.display()))
        .contains("Added mod single 1.0"));
    assert!(session.run("modmanager pushmod").contains("Missing value for parameter <path>."));

    assert!(session
        .run(&format!("modmanager rmdir {}", more.display()))
        .contains("Removed directory"));
    assert!(session.registry.lock().mod_info("gamma").is_none());
    assert!(session.registry.lock().mod_info("single").is_some());
}

#[test]
fn unknown_input_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new(dir.path(), &[]);

    assert!(session.run("").is_empty());
    assert_eq!(session.run("list"), "Command 'list' not recognized.\n");
    assert_eq!(session.run("other list"), "Module 'other' not recognized.\n");

    let unknown = session.run("modmanager frobnicate");
    assert!(unknown.contains("not recognized"));
    assert!(unknown.contains("list, checkvalid, info"), "{unknown}");

    let mut out = Vec::new();
    assert_eq!(session.console.execute("quit", &mut out).unwrap(), Flow::Quit);
}

#[test]
fn modmanager_commands_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new(dir.path(), &["alpha"]);
    let console = Console::new(session.registry.clone(), false);

    let mut out = Vec::new();
    console.execute("modmanager list", &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "Module 'modmanager' not recognized.\n");
}

#[test]
fn run_reads_until_quit() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new(dir.path(), &["alpha"]);

    let input = "modmanager list\nquit\nmodmanager disable alpha\n";
    let mut out = Vec::new();
    session.console.run(input.as_bytes(), &mut out).unwrap();

    let transcript = String::from_utf8(out).unwrap();
    assert!(transcript.starts_with(">>> alpha 1.0.0"), "{transcript}");
    assert!(transcript.ends_with("Terminating console.\n"));
    assert!(session.enabled("alpha"));
}
