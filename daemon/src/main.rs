//! dirchain daemon: entry point for running a node or porting a remote chain.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dirchain_node::{init_logging, Node, NodeConfig};
use dirchain_overlay::Overlay;
use dirchain_porter::{ApiClient, Fetcher, Porter, RetryPolicy};
use dirchain_store_lmdb::LmdbStore;
use dirchain_types::NetworkId;

#[derive(Parser)]
#[command(name = "dirchain-daemon", about = "dirchain directory-block node daemon")]
struct Cli {
    /// Network: "main", "test", or "local".
    /// When a config file is provided, defaults to the file's network value.
    #[arg(long, env = "DIRCHAIN_NETWORK")]
    network: Option<NetworkId>,

    /// Data directory for the block store and journal.
    #[arg(long, env = "DIRCHAIN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Hex Ed25519 seed of this node's identity key.
    #[arg(long, env = "DIRCHAIN_IDENTITY_SEED", hide_env_values = true)]
    identity_seed: Option<String>,

    /// Federated server identity chain ids (comma-separated hex).
    #[arg(long, env = "DIRCHAIN_FEDERATED_SERVERS", value_delimiter = ',')]
    federated_servers: Vec<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "DIRCHAIN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "DIRCHAIN_LOG_FORMAT")]
    log_format: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "DIRCHAIN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Node operations.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },

    /// Copy a remote directory chain into the local data directory.
    Port {
        /// Base URL of the remote API, e.g. http://localhost:8088.
        #[arg(long, env = "DIRCHAIN_PORT_SERVER")]
        server: String,

        /// Attempts per request before giving up.
        #[arg(long, default_value_t = 8)]
        max_attempts: u32,

        #[arg(long, default_value_t = 250)]
        initial_backoff_ms: u64,

        #[arg(long, default_value_t = 10_000)]
        max_backoff_ms: u64,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until SIGINT/SIGTERM.
    Run {
        /// Re-inject the journal before going live.
        #[arg(long)]
        replay_journal: bool,
    },
}

impl Cli {
    /// File config (or defaults) with CLI flags and env vars laid over it.
    fn node_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let path_str = path.to_str().context("config path is not valid UTF-8")?;
                NodeConfig::from_toml_file(path_str)
                    .with_context(|| format!("loading {}", path.display()))?
            }
            None => NodeConfig::default(),
        };
        if let Some(network) = self.network {
            config.network = network;
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(seed) = &self.identity_seed {
            config.identity_seed = Some(seed.clone());
        }
        if !self.federated_servers.is_empty() {
            config.federated_servers = self.federated_servers.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

async fn run_node(mut config: NodeConfig, replay_journal: bool) -> anyhow::Result<()> {
    config.replay_journal |= replay_journal;
    tracing::info!(
        network = config.network.as_str(),
        data_dir = %config.data_dir.display(),
        last_minute = config.last_minute,
        "starting dirchain node"
    );

    let mut node = Node::open_lmdb(config).context("opening node")?;
    node.start()?;

    node.shutdown.wait_for_signal().await?;
    tracing::info!("shutdown signal received, stopping node");
    node.stop().await?;

    if node.config.enable_metrics {
        tracing::info!(metrics = %node.metrics.encode_text(), "final metrics");
    }
    tracing::info!("dirchain daemon exited cleanly");
    Ok(())
}

async fn run_port(config: &NodeConfig, server: &str, policy: RetryPolicy) -> anyhow::Result<()> {
    let path = config.store_path();
    let store = LmdbStore::open(&path, config.map_size)
        .with_context(|| format!("opening store at {}", path.display()))?;
    let overlay = Overlay::new(store);

    tracing::info!(server, ?policy, "porting remote chain");
    let fetcher = Fetcher::new(ApiClient::new(server), policy);
    let report = Porter::new(fetcher, &overlay).port().await;
    let result = match report {
        Ok(report) => {
            let verified = overlay.verify_directory_chain()?;
            tracing::info!(
                directory_blocks = report.directory_blocks,
                sub_blocks = report.sub_blocks,
                entries = report.entries,
                head_height = ?report.head_height,
                verified,
                "port finished"
            );
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context("porting remote chain")),
    };
    overlay.close()?;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.node_config()?;
    init_logging(config.log_format()?, &config.log_level)?;

    match cli.command {
        Command::Node { action } => match action {
            NodeAction::Run { replay_journal } => run_node(config, replay_journal).await?,
        },
        Command::Port {
            server,
            max_attempts,
            initial_backoff_ms,
            max_backoff_ms,
        } => {
            let policy = RetryPolicy {
                max_attempts,
                initial_backoff: Duration::from_millis(initial_backoff_ms),
                max_backoff: Duration::from_millis(max_backoff_ms),
            };
            run_port(&config, &server, policy).await?;
        }
    }

    Ok(())
}
