mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use anthracite_ingest::{CarbonServer, DebugWriter, Ingester, LatencyBuckets, Writer};

/// Carbon metrics ingester daemon.
#[derive(Parser)]
#[command(name = "anthracite", about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print version information and exit.
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Version) = &cli.command {
        println!("anthracite {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;

    fmt().with_env_filter(filter).with_target(true).init();

    let cfg = match &cli.config {
        Some(path) => config::Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => config::Config::default(),
    };

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting anthracite");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    rt.block_on(async { run(cfg).await })
}

async fn run(cfg: config::Config) -> Result<()> {
    let cancel = CancellationToken::new();

    // Signal handling: first signal starts a graceful drain.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let ctrl_c = tokio::signal::ctrl_c();
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    tracing::info!("received SIGINT, shutting down");
                }
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM, shutting down");
                }
            }

            cancel.cancel();
        });
    }

    // The debug writer stands in for the external downsampler-and-writer.
    let writer: Arc<dyn Writer> = Arc::new(DebugWriter);

    let ingester = Arc::new(
        Ingester::new(
            writer,
            cfg.carbon.clone(),
            &cfg.worker_pool,
            LatencyBuckets::default(),
            cancel.clone(),
        )
        .context("building carbon ingester")?,
    );

    // Seed the rule set from the statically configured topology. A live
    // namespace watcher would call on_update instead.
    let namespaces = cfg.cluster_namespaces();
    if namespaces.is_empty() {
        tracing::warn!("no namespaces configured, metrics will be dropped until a topology update");
    } else {
        ingester.on_update(&namespaces);
    }

    // Periodic metrics snapshot logging.
    {
        let ingester = Arc::clone(&ingester);
        let cancel = cancel.clone();
        let interval = cfg.metrics_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let snap = ingester.metrics().snapshot();
                        let pool = ingester.pool_snapshot();
                        tracing::info!(
                            success = snap.success,
                            errors = snap.errors,
                            malformed = snap.malformed,
                            writes_recorded = snap.writes_recorded,
                            pool_hits = pool.hits,
                            pool_misses = pool.misses,
                            "carbon ingestion metrics"
                        );
                    }
                    _ = cancel.cancelled() => break,
                }
            }
        });
    }

    let server = CarbonServer::new(cfg.server.clone(), ingester);
    server
        .run(cancel.clone())
        .await
        .context("running carbon server")?;

    tracing::info!("anthracite stopped");

    Ok(())
}
