use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use patronix::{IndexerManager, PostgresStore, RpcLedgerClient, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap();

    // Load configuration
    let settings = Settings::new()
        .context("Failed to load config.yaml. Please ensure it exists and is valid")?;

    info!(
        "Starting indexer for package {} on {}",
        settings.ledger.package, settings.ledger.network
    );

    // Store unreachable at boot is fatal: exit non-zero, leave nothing running
    let store = PostgresStore::new(&settings.postgres)
        .await
        .context("Failed to initialize PostgreSQL connection")?;
    store.migrate().await.context("Failed to run migrations")?;

    let ledger = RpcLedgerClient::new(
        settings.ledger.rpc_url.clone(),
        Duration::from_millis(settings.ledger.request_timeout_ms),
    )
    .context("Failed to create ledger RPC client")?;

    let manager = IndexerManager::new(
        Arc::new(ledger),
        Arc::new(store.clone()),
        settings.ledger.package.clone(),
        Duration::from_millis(settings.indexer.poll_interval_ms),
        settings.indexer.page_size,
    );

    let cancellation_token = CancellationToken::new();
    let manager_token = cancellation_token.clone();
    let manager_handle = tokio::spawn(async move { manager.run(manager_token).await });

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    info!("Indexer running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
    }

    // Let every poller finish its in-flight page, then release the store
    info!("Draining pollers...");
    cancellation_token.cancel();
    let _ = manager_handle.await;

    store.close();
    info!("Indexer stopped");
    Ok(())
}
