use std::{env, process::ExitCode, sync::Arc};

use panelsh::core::config::{ConfigLoader, ConfigPaths};
use panelsh::error::ShellError;
use panelsh::flags::Flags;
use panelsh::process::{signal, SystemShell};
use panelsh::shell::{Engine, Shell, ShellOptions};
use panelsh::store::{FileStore, MemoryStore, Store};
use tracing::{debug, info};

const LINE_HISTORY_FILE: &str = "readline_history";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("panelsh: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), ShellError> {
    let mut flags = Flags::new();
    let args: Vec<String> = env::args().skip(1).collect();
    flags.parse(&args)?;

    if flags.is_set("help") {
        flags.print_help();
        return Ok(());
    }

    if flags.is_set("version") {
        println!("panelsh {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    init_logging(log_level(flags.is_set("debug"), flags.is_set("quiet")));

    let paths = ConfigPaths::new()?.with_overrides(flags.get_value("config"), flags.get_value("data-dir"));
    let (config, source) = ConfigLoader::new(&paths, flags.is_set("config")).load()?;
    debug!(?source, root = %config.root_panel_id, "configuration ready");

    let ephemeral = flags.is_set("ephemeral");
    let kept = config.history.memory_entries;
    let store: Arc<dyn Store> = if ephemeral {
        info!("using in-memory store");
        Arc::new(MemoryStore::with_history_capacity(kept))
    } else {
        Arc::new(FileStore::open_with_capacity(&paths.data_dir, kept)?)
    };

    let term = signal::TerminationFlag::install()?;
    signal::ignore_interrupts()?;

    let executor = SystemShell::from_config(&config.shell);
    let engine = Engine::new(&config, store, executor, env::current_dir()?)?;

    let options = ShellOptions {
        history_file: (!ephemeral).then(|| paths.data_dir.join(LINE_HISTORY_FILE)),
        quiet: flags.is_set("quiet"),
        output_limit: config.display.output_limit_chars,
    };
    Shell::new(engine, term, options)?.run()
}

// RUST_LOG still wins over both flags.
fn log_level(debug: bool, quiet: bool) -> &'static str {
    match (debug, quiet) {
        (true, _) => "debug",
        (false, true) => "error",
        (false, false) => "warn",
    }
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
