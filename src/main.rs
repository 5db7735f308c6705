//! Interactive host for the thing simulator.
//!
//! Reads console commands from stdin, writes events to an append-only JSON-lines
//! file and diagnostics to a separate log file. SIGINT/SIGTERM/SIGQUIT or EOF on
//! stdin trigger the same orderly teardown as `q`.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use thingvisor::console::Console;
use thingvisor::{Config, Supervisor, SupervisorError, wait_for_shutdown_signal};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "thingvisor")]
#[command(about = "Simulates telemetry-producing things and logs their events")]
#[command(version)]
struct Cli {
    /// Create one thing of each type on startup
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    autostart: bool,

    /// Diagnostic log filter (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Directory for the diagnostic log and, by default, the event log
    #[arg(long, default_value = "log")]
    log_dir: PathBuf,

    /// Event log file (defaults to <log-dir>/events.txt)
    #[arg(long)]
    events_file: Option<PathBuf>,

    /// Maximum number of things a single command may create
    #[arg(long, default_value_t = 100)]
    max_quantity: usize,
}

fn init_tracing(cli: &Cli) -> Result<()> {
    std::fs::create_dir_all(&cli.log_dir)
        .with_context(|| format!("creating log directory {}", cli.log_dir.display()))?;
    let path = cli.log_dir.join("thingvisor.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening diagnostic log {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn prompt() {
    print!("Command (h for help): ");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let events_file = cli
        .events_file
        .clone()
        .unwrap_or_else(|| cli.log_dir.join("events.txt"));
    let cfg = Config {
        max_quantity: cli.max_quantity,
        autostart: cli.autostart,
        ..Config::default()
    };

    let sup = Supervisor::new(cfg);
    sup.configure_path(&events_file)
        .await
        .with_context(|| format!("opening event log {}", events_file.display()))?;
    let started = sup.autostart().await?;
    info!(events_file = %events_file.display(), autostarted = started.len(), "thingvisor started");

    println!("thingvisor {}", env!("CARGO_PKG_VERSION"));
    println!("events -> {}", events_file.display());
    println!(
        "{} thing(s) started, up to {} per command\n",
        started.len(),
        sup.config().max_quantity
    );

    let mut console = Console::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let signal = wait_for_shutdown_signal();
    tokio::pin!(signal);

    loop {
        prompt();
        tokio::select! {
            res = &mut signal => {
                match res {
                    Ok(sig) => info!(signal = %sig, "termination signal received"),
                    Err(err) => error!(error = %err, "installing signal handlers"),
                }
                println!();
                break;
            }
            _ = sup.terminated() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let out = console.dispatch(&sup, &line).await;
                    println!("{}", out.text);
                    if out.exit {
                        break;
                    }
                }
                Ok(None) => {
                    info!("stdin closed");
                    println!();
                    break;
                }
                Err(err) => {
                    error!(error = %err, "reading console input");
                    break;
                }
            },
        }
    }

    match sup.stop_all(true).await {
        Ok(report) => {
            let written = report.drain.map(|d| d.written).unwrap_or(0);
            println!("stopped {} thing(s), {written} event(s) written", report.stopped.len());
        }
        // Already torn down by `q`.
        Err(SupervisorError::ShuttingDown) => {}
        Err(err) => return Err(err.into()),
    }
    info!("thingvisor exited");
    Ok(())
}
