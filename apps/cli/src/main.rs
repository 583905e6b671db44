//! Kiln CLI - Artifact staging for platform training runs
//!
//! This CLI provides a `kiln` command for mirroring local training
//! outputs into the platform's object storage.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::stage::StageCommand;

/// Kiln CLI - Stage training artifacts into object storage
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    author,
    version,
    about = "Kiln - training artifact staging",
    long_about = "Kiln mirrors the outputs of a platform training run (checkpoints, model \ntrees, adapters) into object storage and drops final model files where the \nplatform collects them."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Base URL of the object-storage service
    #[arg(long, default_value = "http://localhost:9500", global = true)]
    storage_url: String,

    /// Bearer token for the storage service
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stage training artifacts into object storage
    #[command(subcommand)]
    Stage(StageCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = args.log_level.parse::<Level>().unwrap_or(Level::WARN);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store = match args.api_key {
        Some(key) => kiln_platform::HttpObjectStore::with_api_key(args.storage_url, key),
        None => kiln_platform::HttpObjectStore::new(args.storage_url),
    };

    match args.command {
        Command::Stage(command) => commands::stage::execute(&store, command).await,
    }
}
