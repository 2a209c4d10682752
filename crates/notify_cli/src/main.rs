//! Command-line front-end for the notification core.
//!
//! # Responsibility
//! - Map subcommands onto `NotificationService` operations.
//! - Resolve configuration from `NOTIFY_*` variables overridden by flags.
//!
//! Without `--db` (or `NOTIFY_DB_PATH`) every invocation starts from an empty
//! in-memory store, which is mostly useful for `demo`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use notify_core::db::open_db;
use notify_core::{
    core_version, InMemoryNotificationRepository, LogDeliverySink, MarketSnapshot,
    NotificationId, NotificationRepository, NotificationService, NotifyConfig,
    SqliteNotificationRepository,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "notify", version, about = "Market-data notification lifecycle")]
struct Cli {
    /// SQLite database file. Overrides NOTIFY_DB_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// trace|debug|info|warn|error. Overrides NOTIFY_LOG_LEVEL.
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Absolute log directory. Overrides NOTIFY_LOG_DIR.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store a new notification and print it as JSON.
    Create {
        #[arg(long, allow_negative_numbers = true)]
        btc_price: f64,
        #[arg(long, allow_negative_numbers = true)]
        trade_volume: f64,
        #[arg(long, allow_negative_numbers = true)]
        intraday_high: f64,
        #[arg(long, allow_negative_numbers = true)]
        market_cap: f64,
    },
    /// Deliver one notification to a destination address.
    Send {
        /// Notification id (the UUID printed by `create`).
        id: NotificationId,
        destination: String,
    },
    /// Print active notifications as a JSON array.
    List {
        /// CREATED, SENT or FAILED. Empty lists every state.
        #[arg(long, default_value = "")]
        state: String,
    },
    /// Soft-delete one notification.
    Delete {
        /// Notification id (the UUID printed by `create`).
        id: NotificationId,
    },
    /// Walk through create, send, list, delete and a rejected re-send.
    Demo {
        #[arg(long, default_value = "hello@example.com")]
        destination: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli);
    config.validate().map_err(anyhow::Error::msg)?;
    config.init_logging().map_err(anyhow::Error::msg)?;
    info!(
        "event=cli_start module=cli status=ok version={} store={}",
        core_version(),
        if config.db_path.is_some() { "sqlite" } else { "memory" }
    );

    match &config.db_path {
        Some(path) => {
            let conn = open_db(path)
                .with_context(|| format!("failed to open database `{}`", path.display()))?;
            let repo = SqliteNotificationRepository::try_new(conn)?;
            run(repo, cli.command)
        }
        None => {
            warn!("event=cli_start module=cli status=ok store=memory durable=false");
            run(InMemoryNotificationRepository::new(), cli.command)
        }
    }
}

fn resolve_config(cli: &Cli) -> NotifyConfig {
    let mut config = NotifyConfig::from_env();
    if let Some(db) = &cli.db {
        config.db_path = Some(db.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    config
}

fn run<R: NotificationRepository>(repo: R, command: Command) -> Result<()> {
    let service = NotificationService::new(repo, LogDeliverySink);

    match command {
        Command::Create {
            btc_price,
            trade_volume,
            intraday_high,
            market_cap,
        } => {
            let created = service.create(MarketSnapshot::new(
                btc_price,
                trade_volume,
                intraday_high,
                market_cap,
            ))?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
        Command::Send { id, destination } => {
            service.send(id, &destination)?;
            println!("sent {id} to {destination}");
        }
        Command::List { state } => {
            let notifications = service.list(&state)?;
            println!("{}", serde_json::to_string_pretty(&notifications)?);
        }
        Command::Delete { id } => {
            service.delete(id)?;
            println!("deleted {id}");
        }
        Command::Demo { destination } => run_demo(&service, &destination)?,
    }

    Ok(())
}

fn run_demo<R: NotificationRepository>(
    service: &NotificationService<R, LogDeliverySink>,
    destination: &str,
) -> Result<()> {
    let first = service.create(MarketSnapshot::new(120.0, 7000.0, 10000.0, 500.0))?;
    service.create(MarketSnapshot::new(110.0, 7000.0, 10000.0, 500.0))?;
    println!("created {}", first.id);

    service.send(first.id, destination)?;
    println!("sent {} to {destination}", first.id);

    println!("active notifications:");
    println!("{}", serde_json::to_string_pretty(&service.list("")?)?);

    service.delete(first.id)?;
    println!("deleted {}", first.id);

    match service.send(first.id, destination) {
        Ok(()) => println!("unexpected: deleted notification was sent"),
        Err(err) => println!("re-send rejected: {err}"),
    }
    Ok(())
}
