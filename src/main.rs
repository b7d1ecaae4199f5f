use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tiered_dfs::balancer::{self, service::GlobalBalancer};
use tiered_dfs::client::client::DfsClient;
use tiered_dfs::client::delete::DeleteOutcome;
use tiered_dfs::cluster::{self, manager::ClusterManager};
use tiered_dfs::config::{
    BalancerConfig, CHUNK_PENALTY_MB, ClientConfig, ClusterConfig, NodeConfig,
    cluster_map_or_degraded, node_list_or_degraded,
};
use tiered_dfs::node::{self, store::ChunkStore};

/// Tiered distributed file store: storage nodes, cluster managers, a global
/// balancer and the client commands that use them.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Log at DEBUG instead of INFO.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a storage node.
    Node {
        #[arg(long, default_value = "127.0.0.1:5001")]
        bind: SocketAddr,
        #[arg(long, default_value = "data/node")]
        data_dir: PathBuf,
        #[arg(long, default_value_t = 1024)]
        capacity_mb: u64,
    },
    /// Run a cluster manager in front of a set of storage nodes.
    Cluster {
        #[arg(long, default_value = "127.0.0.1:7001")]
        bind: SocketAddr,
        /// JSON array of storage node URLs.
        #[arg(long, env = "NODES", default_value = "[]")]
        nodes: String,
        #[arg(long, default_value_t = 5, value_parser = positive_secs())]
        heartbeat_secs: u64,
        #[arg(long, default_value_t = 5, value_parser = positive_secs())]
        timeout_secs: u64,
        #[arg(long, default_value_t = CHUNK_PENALTY_MB)]
        chunk_penalty: u64,
        /// Fixes the tie-break RNG.
        #[arg(long)]
        selection_seed: Option<u64>,
    },
    /// Run the global balancer in front of the cluster managers.
    Balancer {
        #[arg(long, default_value = "127.0.0.1:6001")]
        bind: SocketAddr,
        /// JSON object mapping cluster names to manager URLs.
        #[arg(long, env = "CLUSTERS", default_value = "{}")]
        clusters: String,
        #[arg(long, default_value_t = 30, value_parser = positive_secs())]
        heartbeat_secs: u64,
        #[arg(long, default_value_t = 5, value_parser = positive_secs())]
        timeout_secs: u64,
    },
    /// Upload a file.
    Put {
        file: PathBuf,
        #[command(flatten)]
        client: ClientArgs,
    },
    /// Download a file into the workspace.
    Get {
        filename: String,
        #[command(flatten)]
        client: ClientArgs,
    },
    /// Delete a file from the store.
    Rm {
        filename: String,
        #[command(flatten)]
        client: ClientArgs,
    },
    /// List stored files.
    Ls {
        #[command(flatten)]
        client: ClientArgs,
    },
    /// Search stored files.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[command(flatten)]
        client: ClientArgs,
    },
}

/// Intervals and timeouts must be at least one second; a zero interval would
/// panic the heartbeat task.
fn positive_secs() -> clap::builder::RangedU64ValueParser<u64> {
    clap::value_parser!(u64).range(1..)
}

#[derive(Args)]
struct ClientArgs {
    #[arg(long, env = "BALANCER_URL", default_value = "http://127.0.0.1:6001")]
    balancer: String,
    #[arg(long, env = "DFS_WORKSPACE", default_value = "dfs_workspace")]
    workspace: PathBuf,
    #[arg(long, default_value_t = 5, value_parser = positive_secs())]
    timeout_secs: u64,
}

impl ClientArgs {
    fn open(self) -> anyhow::Result<DfsClient> {
        let mut config = ClientConfig::new(self.balancer, self.workspace);
        config.request_timeout = Duration::from_secs(self.timeout_secs);
        Ok(DfsClient::open(config)?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Command::Node {
            bind,
            data_dir,
            capacity_mb,
        } => {
            run_node(NodeConfig {
                bind,
                data_dir,
                capacity_mb,
            })
            .await
        }
        Command::Cluster {
            bind,
            nodes,
            heartbeat_secs,
            timeout_secs,
            chunk_penalty,
            selection_seed,
        } => {
            let mut config = ClusterConfig::new(node_list_or_degraded(&nodes));
            config.heartbeat_interval = Duration::from_secs(heartbeat_secs);
            config.request_timeout = Duration::from_secs(timeout_secs);
            config.chunk_penalty = chunk_penalty;
            config.selection_seed = selection_seed;

            let manager = ClusterManager::new(config);
            manager.clone().start().await;
            serve(bind, cluster::router(manager), "Cluster manager").await
        }
        Command::Balancer {
            bind,
            clusters,
            heartbeat_secs,
            timeout_secs,
        } => {
            let mut config = BalancerConfig::new(cluster_map_or_degraded(&clusters));
            config.heartbeat_interval = Duration::from_secs(heartbeat_secs);
            config.request_timeout = Duration::from_secs(timeout_secs);

            let global = GlobalBalancer::new(config);
            global.clone().start().await;
            serve(bind, balancer::router(global), "Global balancer").await
        }
        Command::Put { file, client } => {
            let report = client.open()?.upload_file(&file).await?;
            println!("Stored {} in {} chunks", report.filename, report.metadata.len());
            if let Some(warning) = report.index_warning {
                println!("warning: search index not updated: {}", warning);
            }
            Ok(())
        }
        Command::Get { filename, client } => {
            let path = client.open()?.download(&filename).await?;
            println!("Downloaded {} to {}", filename, path.display());
            Ok(())
        }
        Command::Rm { filename, client } => {
            match client.open()?.delete(&filename).await? {
                DeleteOutcome::Deleted => println!("Deleted {}", filename),
                DeleteOutcome::DeletedWithWarning(warning) => {
                    println!("Deleted {} (warning: {})", filename, warning)
                }
            }
            Ok(())
        }
        Command::Ls { client } => {
            for filename in client.open()?.list().await? {
                println!("{}", filename);
            }
            Ok(())
        }
        Command::Search {
            query,
            limit,
            client,
        } => {
            for (filename, score) in client.open()?.search(&query, limit).await? {
                println!("{:>4}  {}", score, filename);
            }
            Ok(())
        }
    }
}

async fn run_node(config: NodeConfig) -> anyhow::Result<()> {
    let store = Arc::new(ChunkStore::open(&config.data_dir, config.capacity_mb).await?);
    serve(config.bind, node::router(store), "Storage node").await
}

async fn serve(bind: SocketAddr, app: axum::Router, role: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("{} listening on {}", role, listener.local_addr()?);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app).await?;
    Ok(())
}
