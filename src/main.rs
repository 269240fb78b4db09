use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use parking_lot::Mutex;
use tracing::{error, info};
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

use modloader::commands::Console;
use modloader::decider::Decider;
use modloader::fs::{FileSystem, LocalFileSystem};
use modloader::loader::ModLoader;
use modloader::registry::ModRegistry;
use modloader::version::ENGINE_VERSION;

const CONFIGURATION: &str = "__appdata__/mods/configuration.json";
const MODS_DIRECTORY: &str = "__appdata__/mods";
const DEFAULT_LOG: &str = "__appdata__/log.log";

/// Loads FactAstra mods and manages their configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Start the interactive console. Implied when no other flag is given.
    #[arg(long)]
    console: bool,

    /// Enable the modmanager console commands
    #[arg(long)]
    modmanager: bool,

    /// Log file, or a directory to create log.log in
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Validate mods without running their scripts
    #[arg(long)]
    no_load: bool,
}

fn init_logging(path: &Path) -> io::Result<tracing_appender::non_blocking::WorkerGuard> {
    let path = if path.is_dir() {
        path.join("log.log")
    } else {
        path.to_path_buf()
    };
    let directory = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(directory)?;

    let file_name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("log.log"));
    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_timer(LocalTime::rfc_3339())
        .with_ansi(false)
        .with_writer(writer)
        .init();

    Ok(guard)
}

fn main() -> modloader::Result<()> {
    let mut args = Args::parse();
    if !args.console && !args.modmanager && !args.no_load && args.log.is_none() {
        args.console = true;
    }
    if args.console {
        args.modmanager = true;
    }

    let fs = LocalFileSystem::with_default_templates()?;
    let log_path = fs.correct_path(args.log.as_deref().unwrap_or(Path::new(DEFAULT_LOG)));
    let _guard = init_logging(&log_path)?;
    info!(
        "Starting modloader version {} (engine {ENGINE_VERSION})",
        env!("CARGO_PKG_VERSION")
    );
    info!("Flags: {args:?}");

    let fs: Arc<dyn FileSystem> = Arc::new(fs);
    fs.create_dir_all(Path::new(MODS_DIRECTORY))?;

    let mut registry = ModRegistry::new(fs.clone(), ENGINE_VERSION);
    let configuration = Path::new(CONFIGURATION);
    let startup = if fs.is_file(configuration) {
        registry.load_configuration(configuration, Decider::Override, false)
    } else {
        registry
            .add_mod_directory(Path::new(MODS_DIRECTORY))
            .map(|_| ())
    };
    if let Err(e) = startup {
        error!("Startup failed: {e}");
        return Err(e);
    }

    if !args.no_load {
        let mut loader = ModLoader::new()?;
        match loader.load(&registry) {
            Ok(report) => info!(
                "Loaded {} mod(s) with {} prototype(s), skipped {:?}",
                report.loaded.len(),
                report.prototypes,
                report.skipped
            ),
            Err(e) => error!("Loading mods failed: {e}"),
        }
    }

    let registry = Arc::new(Mutex::new(registry));

    if args.console || args.modmanager {
        let console = Console::new(registry.clone(), args.modmanager);
        let handle = std::thread::spawn(move || console.run(io::stdin().lock(), io::stderr()));

        info!("Joining console thread...");
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Console failed: {e}"),
            Err(_) => error!("Console thread panicked"),
        }
    }

    registry.lock().save_configuration(configuration)?;
    info!("Safely terminating the process.");
    Ok(())
}
