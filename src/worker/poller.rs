//! Per-event-type poll cycle.
//!
//! Each tracked event type runs this loop independently: fetch one page of
//! events after the current cursor, dispatch them in ascending sequence
//! order, persist the new watermark as a checkpoint, then either fetch the
//! next page immediately (more pending) or sleep for the poll interval
//! (caught up). Cancellation is observed between pages only, so an in-flight
//! page always drains before shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use log::{debug, error, info, warn};
use num_bigint::BigUint;
use tokio_util::sync::CancellationToken;

use crate::events::EventKind;
use crate::ledger::{EventCursor, EventPage, LedgerClient, LedgerError};
use crate::store::models::{Checkpoint, DeadLetter};
use crate::store::Store;
use crate::utils::biguint_to_string;
use crate::worker::handlers::EventHandlers;

pub struct EventPoller {
    kind: EventKind,
    /// Rendered ledger-side filter expression for this kind.
    event_type: String,
    ledger: Arc<dyn LedgerClient>,
    store: Arc<dyn Store>,
    handlers: Arc<EventHandlers>,
    poll_interval: Duration,
    page_size: usize,
}

/// What one dispatched page produced.
struct PageOutcome {
    /// Watermark after the page: highest sequence whose handler succeeded.
    watermark: Option<BigUint>,
    /// Checkpoint to persist, present when at least one handler succeeded.
    checkpoint: Option<(BigUint, String)>,
    succeeded: usize,
    failed: usize,
    skipped: usize,
}

impl EventPoller {
    pub fn new(
        kind: EventKind,
        package: &str,
        ledger: Arc<dyn LedgerClient>,
        store: Arc<dyn Store>,
        handlers: Arc<EventHandlers>,
        poll_interval: Duration,
        page_size: usize,
    ) -> Self {
        Self {
            kind,
            event_type: kind.event_type(package),
            ledger,
            store,
            handlers,
            poll_interval,
            page_size,
        }
    }

    pub async fn run(self, cancellation_token: CancellationToken) -> anyhow::Result<()> {
        // Resume from the persisted checkpoint, or from the beginning when
        // this kind has never been checkpointed.
        let checkpoint = self
            .store
            .get_checkpoint(self.kind)
            .await
            .with_context(|| format!("Failed to load checkpoint for {}", self.kind))?;

        let mut cursor: Option<EventCursor> = checkpoint.as_ref().map(|cp| EventCursor {
            tx_digest: cp.last_tx_digest.clone(),
            event_seq: biguint_to_string(&cp.last_event_seq),
        });
        let mut watermark: Option<BigUint> = checkpoint.map(|cp| cp.last_event_seq);

        match &watermark {
            Some(seq) => info!(
                "Poller for {} resuming after seq {}",
                self.kind,
                biguint_to_string(seq)
            ),
            None => info!("Poller for {} starting from the beginning", self.kind),
        }

        loop {
            if cancellation_token.is_cancelled() {
                info!("Poller for {} received cancellation signal", self.kind);
                break;
            }

            let page = match self
                .ledger
                .query_events(&self.event_type, cursor.clone(), self.page_size)
                .await
            {
                Ok(page) => page,
                Err(LedgerError::InvalidCursor) => {
                    // The resume point no longer resolves on the ledger. We
                    // cannot continue precisely, so catch up from scratch;
                    // idempotent handlers make the replay harmless.
                    warn!(
                        "Ledger rejected cursor for {}, resetting to a full re-scan",
                        self.kind
                    );
                    cursor = None;
                    self.sleep(&cancellation_token).await;
                    continue;
                },
                Err(e) => {
                    warn!("Ledger query for {} failed: {}", self.kind, e);
                    self.sleep(&cancellation_token).await;
                    continue;
                },
            };

            let has_more = page.has_more;
            let next_cursor = page.next_cursor.clone();
            let outcome = self.dispatch_page(page, watermark.clone()).await;

            if outcome.succeeded > 0 || outcome.failed > 0 || outcome.skipped > 0 {
                debug!(
                    "{}: page done ({} ok, {} failed, {} skipped)",
                    self.kind, outcome.succeeded, outcome.failed, outcome.skipped
                );
            }

            if let Some((seq, tx_digest)) = outcome.checkpoint {
                let checkpoint = Checkpoint::new(self.kind, seq, tx_digest);
                if let Err(e) = self.store.set_checkpoint(&checkpoint).await {
                    // The old checkpoint row is intact. Keep the old cursor
                    // and watermark so the same page is refetched and the
                    // idempotent handlers re-apply it on the next cycle.
                    error!(
                        "Failed to persist checkpoint for {}: {:#}. Retrying cycle.",
                        self.kind, e
                    );
                    self.sleep(&cancellation_token).await;
                    continue;
                }
            }

            watermark = outcome.watermark;
            // An empty caught-up page carries no cursor; keep the old one
            // rather than falling back to a full re-scan.
            if let Some(next) = next_cursor {
                cursor = Some(next);
            }

            if !has_more {
                self.sleep(&cancellation_token).await;
            }
        }

        Ok(())
    }

    /// Dispatch one page in ascending sequence order.
    ///
    /// Events at or below the watermark are skipped without invoking their
    /// handler (ledger pages can overlap at the cursor boundary). A handler
    /// failure does not halt the page: it is logged, dead-lettered, and the
    /// watermark simply does not advance past it.
    async fn dispatch_page(&self, page: EventPage, watermark: Option<BigUint>) -> PageOutcome {
        let mut watermark = watermark;
        let mut outcome = PageOutcome {
            watermark: None,
            checkpoint: None,
            succeeded: 0,
            failed: 0,
            skipped: 0,
        };

        for event in page.events {
            if let Some(seen) = watermark.as_ref() {
                if event.sequence <= *seen {
                    outcome.skipped += 1;
                    continue;
                }
            }

            match self.handlers.dispatch(self.kind, &event).await {
                Ok(()) => {
                    watermark = Some(event.sequence.clone());
                    outcome.checkpoint = Some((event.sequence, event.tx_digest));
                    outcome.succeeded += 1;
                },
                Err(e) => {
                    error!(
                        "Handler for {} failed at seq {} (tx {}): {}",
                        self.kind,
                        biguint_to_string(&event.sequence),
                        event.tx_digest,
                        e
                    );

                    let dead_letter = DeadLetter::new(
                        self.kind,
                        event.sequence,
                        event.tx_digest,
                        e.to_string(),
                        event.parsed_json,
                    );
                    if let Err(e) = self.store.record_dead_letter(&dead_letter).await {
                        error!("Failed to record dead letter for {}: {:#}", self.kind, e);
                    }

                    outcome.failed += 1;
                },
            }
        }

        outcome.watermark = watermark;
        outcome
    }

    async fn sleep(&self, cancellation_token: &CancellationToken) {
        tokio::select! {
            _ = cancellation_token.cancelled() => {},
            _ = tokio::time::sleep(self.poll_interval) => {},
        }
    }
}
