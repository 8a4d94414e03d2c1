mod config_commands;
mod db_commands;

use std::{path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    tempvoice_config::TempVoiceConfig,
    tempvoice_store::SqliteRecordStore,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "tempvoice", about = "Temporary voice rooms for Discord")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./tempvoice.toml and the user config dir).
    #[arg(long, global = true, env = "TEMPVOICE_CONFIG")]
    config: Option<PathBuf>,
    /// Custom data directory (overrides default data dir).
    #[arg(long, global = true, env = "TEMPVOICE_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot (default when no subcommand is provided).
    Run,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
    /// Record database management (migrate, list, clear).
    Db {
        #[command(subcommand)]
        action: db_commands::DbAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn database_path(cli: &Cli, config: &TempVoiceConfig) -> PathBuf {
    let data_dir = cli.data_dir.clone().unwrap_or_else(tempvoice_config::data_dir);
    config.storage.resolve_database_path(&data_dir)
}

/// Only a delivered signal stops the bot; a failed listener keeps it running.
fn shutdown_requested(signal: std::io::Result<()>) -> bool {
    match signal {
        Ok(()) => {
            info!("received ctrl-c, shutting down");
            true
        },
        Err(e) => {
            warn!(error = %e, "failed to listen for ctrl-c, continuing without it");
            false
        },
    }
}

async fn run_bot(cli: &Cli) -> anyhow::Result<()> {
    let config = tempvoice_config::load_or_discover(cli.config.as_deref())?;
    let db_path = database_path(cli, &config);
    let store = SqliteRecordStore::open(&db_path).await?;
    info!(path = %db_path.display(), "record store ready");

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if shutdown_requested(tokio::signal::ctrl_c().await) {
            on_signal.cancel();
        }
    });

    tempvoice_discord::run(&config, Arc::new(store), cancel).await?;
    info!("tempvoice stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let mut cli = Cli::parse();

    init_telemetry(&cli);

    match cli.command.take() {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "tempvoice starting");
            run_bot(&cli).await
        },
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
        Some(Commands::Db { action }) => {
            let config = tempvoice_config::load_or_discover(cli.config.as_deref())?;
            db_commands::handle_db(action, &database_path(&cli, &config)).await
        },
    }
}
