//! Relational store boundary.
//!
//! Every write is an idempotent upsert keyed by a natural on-chain
//! identifier; no multi-entity transaction is assumed. The trait seam lets
//! the poll loop and handlers run against the in-memory store in tests and
//! PostgreSQL in production.

pub mod memory;
pub mod models;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;

pub use memory::MemoryStore;
pub use models::{Checkpoint, ChannelMapping, Content, Creator, DeadLetter, Subscription, Tier};
pub use postgres::PostgresStore;

use crate::events::EventKind;

#[async_trait]
pub trait Store: Send + Sync {
    // Checkpoints
    async fn get_checkpoint(&self, kind: EventKind) -> Result<Option<Checkpoint>>;
    async fn set_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()>;

    // Creators
    async fn upsert_creator(&self, creator: &Creator) -> Result<()>;
    async fn get_creator(&self, address: &str) -> Result<Option<Creator>>;

    // Tiers
    async fn upsert_tier(&self, tier: &Tier) -> Result<()>;
    async fn get_tier(&self, tier_id: &str) -> Result<Option<Tier>>;

    // Content
    async fn upsert_content(&self, content: &Content) -> Result<()>;
    async fn get_content(&self, content_id: &str) -> Result<Option<Content>>;

    // Subscriptions
    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()>;
    async fn get_subscription(&self, subscription_id: &str) -> Result<Option<Subscription>>;

    // Channel mappings
    async fn upsert_channel_mapping(&self, mapping: &ChannelMapping) -> Result<()>;
    async fn get_channel_mapping(
        &self,
        user_address: &str,
        creator_address: &str,
    ) -> Result<Option<ChannelMapping>>;

    // Dead letters
    async fn record_dead_letter(&self, dead_letter: &DeadLetter) -> Result<()>;
}
