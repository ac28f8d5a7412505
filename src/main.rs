mod commands;
mod reminders;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use intouch_core::{config, shellexpand, traits::SystemClock};
use intouch_memory::{FileBlobStore, NotificationLog, Store};
use reminders::{sinks::build_sink, Reminders};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "intouch",
    version,
    about = "InTouch — reminders to reach out to the people you care about"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show contacts, most overdue first.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Turn reminders on for a contact.
    Enable { name: String },
    /// Turn reminders off for a contact.
    Disable { name: String },
    /// Set how many days may pass before a contact is due.
    Interval { name: String, days: i64 },
    /// Run one reminder check now.
    Check,
    /// Run reminder checks periodically until interrupted.
    Run,
    /// Add an address-book entry.
    Add {
        name: String,
        /// Phone numbers, in any format.
        #[arg(required = true)]
        numbers: Vec<String>,
    },
    /// Record an outgoing message to a number.
    Sent {
        number: String,
        /// When it was sent (RFC 3339). Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },
    /// Show recently sent notifications.
    History {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show configuration and roster counts.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load(&cli.config)?;
    let _log_guard = init_tracing(&cfg, matches!(cli.command, Commands::Run))?;

    let store = Store::new(&cfg.store).await?;

    match cli.command {
        Commands::Add { name, numbers } => {
            let id = store.add_contact(&name, &numbers).await?;
            println!("Added {name} ({id})");
        }
        Commands::Sent { number, at } => {
            let at = match at {
                Some(raw) => DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| anyhow::anyhow!("invalid --at {raw:?}: {e}"))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };
            store.record_sent(&number, at).await?;
            println!("Recorded message to {number} at {at}");
        }
        Commands::History { limit } => {
            let log = NotificationLog::new(store.pool().clone());
            let rows = log.recent(limit).await?;
            print!("{}", commands::format_history(&rows));
        }
        Commands::List { json } => {
            let listing = build_reminders(&cfg, store)?.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                print!("{}", commands::format_list(&listing));
            }
        }
        Commands::Enable { name } => {
            build_reminders(&cfg, store)?.set_notify(&name, true).await?;
            println!("Reminders on for {name}");
        }
        Commands::Disable { name } => {
            build_reminders(&cfg, store)?.set_notify(&name, false).await?;
            println!("Reminders off for {name}");
        }
        Commands::Interval { name, days } => {
            build_reminders(&cfg, store)?.set_interval(&name, days).await?;
            println!("{name}: reminder every {days} days");
        }
        Commands::Check => {
            let report = build_reminders(&cfg, store)?.tick().await?;
            println!("{}", commands::format_tick(&report));
        }
        Commands::Run => {
            println!("InTouch — running, Ctrl-C to stop");
            Arc::new(build_reminders(&cfg, store)?).run().await?;
        }
        Commands::Status => {
            let status = build_reminders(&cfg, store)?.status().await?;
            println!("{}", commands::format_status(&cfg, &status));
        }
    }

    Ok(())
}

/// Console logging, plus a daily log file for the long-running daemon.
///
/// `RUST_LOG` overrides the configured level.
fn init_tracing(cfg: &config::Config, to_file: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.intouch.log_level));

    if !to_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    }

    let log_dir = std::path::PathBuf::from(shellexpand(&cfg.intouch.data_dir)).join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let (file, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "intouch.log"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(file).with_ansi(false))
        .init();
    Ok(Some(guard))
}

/// Wire the reminder service to the SQLite sources and the preference file.
fn build_reminders(cfg: &config::Config, store: Store) -> anyhow::Result<Reminders> {
    let log = NotificationLog::new(store.pool().clone());
    let store = Arc::new(store);
    let blob = FileBlobStore::new(shellexpand(&cfg.store.prefs_path));

    Ok(Reminders::new(
        store.clone(),
        store,
        build_sink(&cfg.notify),
        Arc::new(blob),
        Arc::new(SystemClock),
        Some(log),
        &cfg.reminder,
        &cfg.notify,
    )?)
}
