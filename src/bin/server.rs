//! Registry server binary

use clap::{Parser, Subcommand};
use minireg::{Journal, RegistryConfig, RegistryStorage};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minireg-server")]
#[command(about = "minireg registry node replicated through a compacted journal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a registry node
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Node ID
        #[arg(long)]
        node_id: Option<String>,

        /// Journal data directory
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Number of journal partitions
        #[arg(long)]
        partitions: Option<u32>,

        /// Log level (trace, debug, info, warn, error)
        #[arg(long)]
        log_level: Option<String>,
    },

    /// Compact the journal in place; run while no node is serving
    Compact {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Journal data directory
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Topic to compact (defaults to the configured topic)
        #[arg(long)]
        topic: Option<String>,
    },
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            node_id,
            data_dir,
            partitions,
            log_level,
        } => {
            // Load config from file, then override with CLI arguments
            let mut cfg = RegistryConfig::load(config.as_deref())?;
            if let Some(node_id) = node_id {
                cfg.node_id = node_id;
            }
            if let Some(data_dir) = data_dir {
                cfg.journal.data_dir = data_dir;
            }
            if let Some(partitions) = partitions {
                cfg.journal.partitions = partitions;
            }
            if let Some(log_level) = log_level {
                cfg.log_level = log_level;
            }
            init_tracing(&cfg.log_level);
            serve(cfg).await
        }
        Commands::Compact {
            config,
            data_dir,
            topic,
        } => {
            let mut cfg = RegistryConfig::load(config.as_deref())?;
            if let Some(data_dir) = data_dir {
                cfg.journal.data_dir = data_dir;
            }
            init_tracing(&cfg.log_level);
            compact(cfg, topic)
        }
    }
}

async fn serve(config: RegistryConfig) -> anyhow::Result<()> {
    tracing::info!("Starting minireg server: {}", config.node_id);
    tracing::info!("  version: {}", minireg::BUILD_INFO);
    tracing::info!("  data dir: {}", config.journal.data_dir.display());
    tracing::info!(
        "  topic: {} ({} partitions)",
        config.journal.topic,
        config.journal.partitions
    );
    tracing::info!("  sync policy: {:?}", config.journal.sync);
    tracing::info!("  response timeout: {}ms", config.engine.response_timeout_ms);

    let journal = Arc::new(Journal::open(&config.journal)?);
    let mut registry = RegistryStorage::start(Arc::clone(&journal), &config)?;

    tracing::info!("Registry node ready");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutdown signal received, stopping dispatch loop");
    registry.shutdown().await;
    journal.close()?;
    tracing::info!(
        "Journal closed after {} applied records",
        registry.processed_records()
    );
    Ok(())
}

fn compact(config: RegistryConfig, topic: Option<String>) -> anyhow::Result<()> {
    let topic = topic.unwrap_or_else(|| config.journal.topic.clone());
    let journal = Journal::open(&config.journal)?;
    let stats = journal.compact(&topic)?;
    tracing::info!(
        "Compacted topic {}: scanned {}, kept {}, purged {} keys",
        topic,
        stats.scanned,
        stats.kept,
        stats.purged_keys
    );
    journal.close()?;
    Ok(())
}
