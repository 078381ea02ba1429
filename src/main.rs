//! flowlog - reference driver for the flow-logger engine.
//!
//! Boots the logger over a card directory and a flash directory, then either
//! runs one maintenance-style command or drives the engine from stdin:
//!   flowlog init                       # write config, create directories
//!   flowlog run < readings.csv         # log one record per stdin line
//!   flowlog status --format json       # persisted state
//!   flowlog files                      # log files on the card
//!   flowlog diagnostics                # boot and report

mod cli;

use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use flow_logger::application::{
    format_files_table, format_maintenance, format_recovery, format_state, format_summary,
    to_json, Diagnostics, EngineMaintenance, LogEngine, MaintenanceReport, OutputFormat,
    StateMachine, StorageManager, StorageSummary, Supervisor, TickReport,
};
use flow_logger::domain::log_file::LOG_DIR;
use flow_logger::domain::{AppConfig, LogFileInfo, PersistedState};
use flow_logger::infrastructure::{
    ensure_config_exists, load_config, load_config_from_file, Clock, DirectoryBackend,
    FileStateStore, KeyValueCodec, StateCodec, StateStore, StorageBackend, SystemClock,
    STATE_FILE,
};

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
fn run(cli: Cli) -> Result<()> {
    let format = cli.output_format().map_err(anyhow::Error::msg)?;
    let config = match cli.config.as_deref() {
        Some(path) => load_config_from_file(path),
        None => load_config(),
    }
    .context("Failed to load configuration")?;

    match cli.command {
        Commands::Init => cmd_init(&config),
        Commands::Run { paused } => cmd_run(&config, paused),
        Commands::Status => cmd_status(&config, format),
        Commands::Files => cmd_files(&config, format),
        Commands::Diagnostics => cmd_diagnostics(&config, format),
        Commands::Rotate => cmd_rotate(&config, format),
        Commands::Maintain => cmd_maintain(&config, format),
        Commands::Recover { clear } => cmd_recover(&config, clear, format),
    }
}

/// Wire the engine over the configured card and flash directories.
fn build_engine(config: &AppConfig) -> Result<(LogEngine, Rc<dyn Clock>)> {
    let clock: Rc<dyn Clock> = Rc::new(SystemClock::new());

    let store = FileStateStore::open(config.flash_dir()).context("Failed to open state store")?;
    let state = StateMachine::new(Box::new(store), Box::new(KeyValueCodec), Rc::clone(&clock));
    let storage = StorageManager::new(
        Box::new(DirectoryBackend::new(config.card_root())),
        Rc::clone(&clock),
        config.storage.mount_policy(),
    );

    let engine = LogEngine::new(config.logger.clone(), state, storage, Rc::clone(&clock));
    Ok((engine, clock))
}

/// Build and start the engine, failing if it does not reach `READY`.
fn boot(config: &AppConfig) -> Result<LogEngine> {
    let (mut engine, _) = build_engine(config)?;
    engine.start().with_context(|| {
        format!(
            "Failed to start logger (card root: {})",
            config.card_root().display()
        )
    })?;
    Ok(engine)
}

/// Initialize config and directories.
fn cmd_init(config: &AppConfig) -> Result<()> {
    let config_path = ensure_config_exists().context("Failed to create config")?;

    for dir in [config.card_root(), config.flash_dir()] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    println!("{} Initialized flow logger", "✓".green());
    println!("  Config: {}", config_path.display());
    println!("  Card:   {}", config.card_root().display());
    println!("  Flash:  {}", config.flash_dir().display());
    Ok(())
}

/// Show the persisted state without booting.
fn cmd_status(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let store = FileStateStore::open(config.flash_dir()).context("Failed to open state store")?;
    let mut state = PersistedState::default();
    if let Some(text) = store.read(STATE_FILE)? {
        KeyValueCodec.decode_state(&text, &mut state);
    }

    match format {
        OutputFormat::Text => println!("{}", format_state(&state)),
        OutputFormat::Json => println!("{}", to_json(&state)?),
    }
    Ok(())
}

/// List log files on the card without booting.
fn cmd_files(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let mut backend = DirectoryBackend::new(config.card_root());
    backend.mount().context("Card directory not available")?;

    let files: Vec<LogFileInfo> = backend
        .list_files(LOG_DIR)?
        .into_iter()
        .map(LogFileInfo::from)
        .collect();

    match format {
        OutputFormat::Text if files.is_empty() => println!("No log files found."),
        OutputFormat::Text => println!("{}", format_files_table(&files)),
        OutputFormat::Json => println!("{}", to_json(&files)?),
    }
    Ok(())
}

#[derive(Serialize)]
struct DiagnosticsOutput {
    diagnostics: Diagnostics,
    storage: StorageSummary,
}

/// Boot, report, shut down.
fn cmd_diagnostics(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let mut engine = boot(config)?;
    let output = DiagnosticsOutput {
        diagnostics: engine.diagnostics(),
        storage: engine.storage().summary()?,
    };
    engine.shutdown()?;

    match format {
        OutputFormat::Text => {
            println!("{}", output.diagnostics);
            println!();
            println!("{}", format_summary(&output.storage));
        }
        OutputFormat::Json => println!("{}", to_json(&output)?),
    }
    Ok(())
}

/// Boot and switch to a new log file.
fn cmd_rotate(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let mut engine = boot(config)?;
    let file = engine.switch_log_file().context("Failed to switch log file")?;
    engine.shutdown()?;

    match format {
        OutputFormat::Text => println!("{} Now logging to {file}", "✓".green()),
        OutputFormat::Json => println!("{}", to_json(&file)?),
    }
    Ok(())
}

#[derive(Serialize)]
struct MaintenanceOutput {
    engine: EngineMaintenance,
    storage: MaintenanceReport,
}

/// Boot and run engine then storage maintenance.
fn cmd_maintain(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let mut engine = boot(config)?;
    let output = MaintenanceOutput {
        engine: engine.perform_maintenance()?,
        storage: engine.storage_maintenance()?,
    };
    engine.shutdown()?;

    match format {
        OutputFormat::Text => println!("{}", format_maintenance(&output.engine, &output.storage)),
        OutputFormat::Json => println!("{}", to_json(&output)?),
    }
    Ok(())
}

/// Boot, apply the recovery point and settle on a log file.
fn cmd_recover(config: &AppConfig, clear: bool, format: OutputFormat) -> Result<()> {
    let mut engine = boot(config)?;

    match engine.state_mut().attempt_recovery() {
        Ok(point) => tracing::info!(file = %point.current_log_file, "Applied recovery point"),
        Err(e) => tracing::info!(reason = %e, "Recovery point not applied"),
    }
    let outcome = engine.attempt_recovery()?;
    engine.shutdown()?;

    if clear {
        engine.clear_recovery_data()?;
    }

    match format {
        OutputFormat::Text => println!("{}", format_recovery(&outcome)),
        OutputFormat::Json => println!("{}", to_json(&outcome)?),
    }
    Ok(())
}

/// Drive the engine from stdin until EOF or Ctrl-C.
fn cmd_run(config: &AppConfig, paused: bool) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(drive(config, paused))
}

async fn drive(config: &AppConfig, paused: bool) -> Result<()> {
    let (mut engine, clock) = build_engine(config)?;
    let mut want_logging = !paused;

    // A failed boot leaves the engine in ERROR; the supervisor retries.
    if let Err(e) = engine.start() {
        tracing::warn!(error = %e, "Boot failed, waiting for storage");
    }
    sync_logging(&mut engine, want_logging);

    let mut supervisor = Supervisor::new(config.supervisor.clone(), clock);
    let mut ticker = tokio::time::interval(Duration::from_millis(config.supervisor.tick_ms.max(1)));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = supervisor.tick(&mut engine);
                if report.recovered.is_some() {
                    sync_logging(&mut engine, want_logging);
                }
                log_tick(&report);
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => handle_line(&mut engine, &line, &mut want_logging),
                Ok(None) => {
                    tracing::info!("Input closed");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read input");
                    break;
                }
            },
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested");
                break;
            }
        }
    }

    engine.shutdown().context("Shutdown did not complete cleanly")?;
    println!(
        "{} Logged {} records in {} flushes",
        "✓".green(),
        engine.records_accepted(),
        engine.buffer_flush_count()
    );
    Ok(())
}

/// Bring the engine's logging flag in line with what the operator asked for.
fn sync_logging(engine: &mut LogEngine, want_logging: bool) {
    if want_logging == engine.state().is_logging_active() {
        return;
    }
    let result = if want_logging {
        engine.start_logging()
    } else {
        engine.stop_logging()
    };
    if let Err(e) = result {
        tracing::warn!(error = %e, "Failed to change logging state");
    }
}

/// Records are plain lines; lines starting with `:` are control commands.
fn handle_line(engine: &mut LogEngine, line: &str, want_logging: &mut bool) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    if let Some(command) = line.strip_prefix(':') {
        match command {
            "start" => *want_logging = true,
            "stop" => *want_logging = false,
            "flush" => report_command(engine.force_flush_buffer(), "flush"),
            "rotate" => report_command(engine.switch_log_file().map(|_| ()), "rotate"),
            "diag" => println!("{}", engine.diagnostics()),
            other => tracing::warn!(command = other, "Unknown control command"),
        }
        sync_logging(engine, *want_logging);
        return;
    }

    if !engine.state().is_logging_active() {
        tracing::debug!("Logging stopped, record dropped");
        return;
    }

    match engine.log_data(line) {
        Ok(outcome) => tracing::trace!(?outcome, "Record handled"),
        Err(e) => tracing::warn!(error = %e, "Record not logged"),
    }
}

fn report_command(result: flow_logger::domain::Result<()>, command: &str) {
    match result {
        Ok(()) => tracing::info!(command, "Control command done"),
        Err(e) => tracing::warn!(command, error = %e, "Control command failed"),
    }
}

fn log_tick(report: &TickReport) {
    if report.storage_lost {
        tracing::warn!("Storage lost");
    }
    if let Some(outcome) = &report.recovered {
        tracing::info!(%outcome, "Recovered");
    }
    if let Some(err) = &report.recovery_error {
        tracing::debug!(error = %err, "Recovery pending");
    }
    if let Some(err) = &report.update_error {
        tracing::warn!(error = %err, "Update failed");
    }
}

/// Setup tracing/logging.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
