//! Ledger query boundary.
//!
//! The indexer's sole inbound data source: a bounded "query events" call
//! against a fullnode, returning one ascending page of events per request.
//! Delivery is at-least-once — after a cursor reset the same events can be
//! observed again, so everything downstream must be idempotent.

pub mod rpc;

use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use rpc::RpcLedgerClient;

/// Opaque resumption point for event pagination.
///
/// The pair (transaction digest, event sequence) identifies the last event
/// already seen; the next query returns events strictly after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCursor {
    #[serde(rename = "txDigest")]
    pub tx_digest: String,
    #[serde(rename = "eventSeq")]
    pub event_seq: String,
}

/// One event as delivered by the ledger.
#[derive(Debug, Clone)]
pub struct LedgerEvent {
    /// Decoded Move event fields, still untyped at this boundary.
    pub parsed_json: serde_json::Value,
    pub tx_digest: String,
    /// Global, monotonically increasing per event type. Arbitrary precision:
    /// long-running chains overflow u64.
    pub sequence: BigUint,
    pub timestamp_ms: Option<u64>,
}

/// One bounded page of events, ascending by sequence.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<LedgerEvent>,
    pub next_cursor: Option<EventCursor>,
    pub has_more: bool,
}

/// Errors from the ledger boundary.
///
/// `InvalidCursor` is classified by the fullnode's explicit error code, not
/// by message text, so the poller can distinguish "resume point no longer
/// valid, re-scan from the beginning" from ordinary transport failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid or stale cursor rejected by ledger")]
    InvalidCursor,

    #[error("ledger rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("ledger transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode ledger response: {0}")]
    Decode(String),
}

/// Pull interface to the ledger, injected into the poll loop so it can be
/// driven by a fake in tests.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fetch up to `limit` events matching `event_type`, strictly after
    /// `cursor` (or from the beginning when `None`), in ascending order.
    async fn query_events(
        &self,
        event_type: &str,
        cursor: Option<EventCursor>,
        limit: usize,
    ) -> Result<EventPage, LedgerError>;
}
