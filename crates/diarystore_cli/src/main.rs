//! Command-line entry point for inspecting and attaching the diary stores.
//!
//! # Responsibility
//! - Print the resolved store layout without touching the stores.
//! - Attach both stores through the default coordinator and report
//!   migration events.
//! - Keep output deterministic for scripting.

use clap::{Parser, Subcommand};
use diarystore_core::coordinator::DATA_DIR_ENV;
use diarystore_core::{
    core_version, default_log_level, init_default_coordinator, init_logging,
    teardown_default_coordinator, with_default_coordinator, CoordinatorConfig, MigrationEvent,
    StoreLayout,
};
use log::error;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "diarystore", version, about = "Dual-store diary coordinator")]
struct Cli {
    /// Application-data root holding both stores.
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    root: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off when unset.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[arg(long, global = true)]
    log_level: Option<String>,

    /// SQLite busy timeout in milliseconds; the core default applies when unset.
    #[arg(long, global = true)]
    busy_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print store descriptors as JSON.
    Paths,
    /// Attach both stores, migrating them when needed, then detach.
    Attach,
    /// Print the core version.
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={}", err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    let mut config = match cli.root {
        Some(root) => CoordinatorConfig::new(root),
        None => CoordinatorConfig::from_env(),
    };
    if let Some(millis) = cli.busy_timeout_ms {
        config = config.with_busy_timeout(Duration::from_millis(millis));
    }

    match cli.command {
        Command::Paths => {
            let layout = StoreLayout::new(config.app_data_root);
            println!("{}", serde_json::to_string_pretty(&layout.descriptors())?);
        }
        Command::Attach => attach(config)?,
        Command::Version => println!("diarystore_core version={}", core_version()),
    }
    Ok(())
}

fn attach(config: CoordinatorConfig) -> Result<(), Box<dyn Error>> {
    init_default_coordinator(config)?;

    let result = with_default_coordinator(|coordinator| {
        coordinator
            .observers_mut()
            .subscribe(|event: MigrationEvent| println!("migration event={event}"));
        coordinator.add_stores()?;
        for kind in coordinator.attached_stores() {
            println!("attached store={kind}");
        }
        Ok::<_, diarystore_core::CoordinatorError>(())
    });

    teardown_default_coordinator();
    result.map_err(Into::into)
}
