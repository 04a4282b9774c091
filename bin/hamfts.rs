use anyhow::Result;
use clap::{Parser, ValueEnum};
use hamfts::{AppState, IndexConfig, SearchIndex, SearchMetrics, ServerConfig, SnapshotFormat};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Json,
    Bincode,
}

impl From<FormatArg> for SnapshotFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => SnapshotFormat::Json,
            FormatArg::Bincode => SnapshotFormat::Bincode,
        }
    }
}

#[derive(Parser)]
#[command(name = "hamfts")]
#[command(about = "Disk-backed full-text search server", long_about = None)]
struct Args {
    /// Address for the HTTP API
    #[arg(long, env = "HAMFTS_BIND_ADDR", default_value = "127.0.0.1:8080")]
    bind_addr: String,

    /// Data directory for the record log and metadata snapshot
    #[arg(long, env = "HAMFTS_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Encoding of the metadata snapshot
    #[arg(long, env = "HAMFTS_SNAPSHOT_FORMAT", value_enum, default_value = "json")]
    snapshot_format: FormatArg,

    /// Skip fsync of the record log before each snapshot write
    #[arg(long, env = "HAMFTS_NO_SYNC")]
    no_sync: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let config = ServerConfig::new(
        args.bind_addr,
        IndexConfig::new(args.data_dir)
            .with_snapshot_format(args.snapshot_format.into())
            .with_sync_on_persist(!args.no_sync),
    );

    info!("Starting hamfts v{}", hamfts::VERSION);
    info!("  Data directory: {:?}", config.index.data_dir);
    info!("  Snapshot format: {:?}", config.index.snapshot_format);
    info!("  Sync on persist: {}", config.index.sync_on_persist);

    let index = Arc::new(SearchIndex::open(config.index.clone())?);
    let metrics = Arc::new(SearchMetrics::new()?);
    let stats = index.stats()?;
    metrics.set_index_size(stats.document_count, stats.store_size_bytes);

    let app = hamfts::create_router(AppState::new(index.clone(), metrics));
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("HTTP API server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received shutdown signal, gracefully shutting down");
        })
        .await?;

    index.close()?;
    info!("Index closed");

    Ok(())
}
