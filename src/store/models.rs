//! Rows held in the relational store.
//!
//! Every entity is keyed by its natural on-chain identifier, never by a
//! surrogate id, so the same event applied twice converges to the same row.

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::events::EventKind;

/// Indexing progress checkpoint, one row per tracked event type.
///
/// Holds the last successfully processed event's sequence number and the
/// digest of the transaction that emitted it, so the poll loop can rebuild a
/// resumable cursor after a restart. Only advanced after handler success.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub kind: EventKind,
    pub last_event_seq: BigUint,
    pub last_tx_digest: String,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(kind: EventKind, last_event_seq: BigUint, last_tx_digest: String) -> Self {
        Self {
            kind,
            last_event_seq,
            last_tx_digest,
            updated_at: Utc::now(),
        }
    }
}

/// Creator profile, keyed by on-chain address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub address: String,
    pub name: String,
    pub bio: Option<String>,
    pub avatar_cid: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Subscription tier, keyed by on-chain tier object id.
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub tier_id: String,
    pub creator_address: String,
    pub name: String,
    /// Price in base units. Arbitrary precision, never a float.
    pub price: BigUint,
    pub duration_days: i32,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

/// Published content item, keyed by on-chain content object id.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub content_id: String,
    pub creator_address: String,
    /// Tiers whose subscribers can access this item.
    pub tier_ids: Vec<String>,
    pub title: String,
    pub payload_cid: String,
    pub updated_at: DateTime<Utc>,
}

/// Purchased subscription, keyed by on-chain subscription object id.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub subscription_id: String,
    pub subscriber_address: String,
    pub tier_id: String,
    pub creator_address: String,
    /// Amount paid in base units.
    pub amount: BigUint,
    pub expires_at_ms: i64,
    pub updated_at: DateTime<Utc>,
}

/// Notification channel mapping, keyed by (user, creator) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMapping {
    pub user_address: String,
    pub creator_address: String,
    pub channel_id: String,
    pub updated_at: DateTime<Utc>,
}

/// An event whose handler exhausted its retries. Recorded for operator
/// visibility; the checkpoint watermark does not advance past failures.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub kind: EventKind,
    pub event_seq: BigUint,
    pub tx_digest: String,
    pub error: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(
        kind: EventKind,
        event_seq: BigUint,
        tx_digest: String,
        error: String,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            event_seq,
            tx_digest,
            error,
            payload,
            created_at: Utc::now(),
        }
    }
}
