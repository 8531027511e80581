//! Spawns and drains the per-event-type pollers.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::EventKind;
use crate::ledger::LedgerClient;
use crate::retry::RetryConfig;
use crate::store::Store;
use crate::worker::handlers::EventHandlers;
use crate::worker::poller::EventPoller;

/// Timeout for a poller to finish its in-flight page on shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs one independent poll cycle per tracked event type.
///
/// The cycles share no mutable state beyond the store, whose writes are all
/// idempotent natural-key upserts, so no coordination between them is
/// needed. On shutdown every poller drains its current page before the
/// manager returns.
pub struct IndexerManager {
    ledger: Arc<dyn LedgerClient>,
    store: Arc<dyn Store>,
    package: String,
    poll_interval: Duration,
    page_size: usize,
}

impl IndexerManager {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        store: Arc<dyn Store>,
        package: String,
        poll_interval: Duration,
        page_size: usize,
    ) -> Self {
        Self {
            ledger,
            store,
            package,
            poll_interval,
            page_size,
        }
    }

    pub async fn run(self, cancellation_token: CancellationToken) -> anyhow::Result<()> {
        let handlers = Arc::new(EventHandlers::new(
            self.store.clone(),
            RetryConfig::dependency_wait(),
        ));

        let mut running: Vec<(EventKind, JoinHandle<()>)> = Vec::with_capacity(EventKind::ALL.len());

        for kind in EventKind::ALL {
            let poller = EventPoller::new(
                kind,
                &self.package,
                self.ledger.clone(),
                self.store.clone(),
                handlers.clone(),
                self.poll_interval,
                self.page_size,
            );

            let poller_token = cancellation_token.child_token();
            let handle = tokio::spawn(async move {
                if let Err(e) = poller.run(poller_token).await {
                    error!("Poller for {} failed: {:#}", kind, e);
                }
            });

            running.push((kind, handle));
            info!("Poller for {} started", kind);
        }

        cancellation_token.cancelled().await;
        info!("IndexerManager: stopping all pollers...");

        for (kind, handle) in running {
            match tokio::time::timeout(DRAIN_TIMEOUT, handle).await {
                Ok(_) => info!("Poller for {} stopped gracefully", kind),
                Err(_) => warn!(
                    "Poller for {} did not stop within {:?}, continuing...",
                    kind, DRAIN_TIMEOUT
                ),
            }
        }

        info!("IndexerManager: shutdown complete");
        Ok(())
    }
}
