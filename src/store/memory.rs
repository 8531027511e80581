//! In-memory `Store` backed by hash maps.
//!
//! Used by the test suite to drive the poll loop and handlers without a
//! database. Upsert semantics mirror the PostgreSQL implementation exactly:
//! last write wins, keyed by natural identifier.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::events::EventKind;
use crate::store::models::{
    ChannelMapping, Checkpoint, Content, Creator, DeadLetter, Subscription, Tier,
};
use crate::store::Store;

#[derive(Default)]
struct Inner {
    checkpoints: HashMap<EventKind, Checkpoint>,
    creators: HashMap<String, Creator>,
    tiers: HashMap<String, Tier>,
    content: HashMap<String, Content>,
    subscriptions: HashMap<String, Subscription>,
    channel_mappings: HashMap<(String, String), ChannelMapping>,
    dead_letters: Vec<DeadLetter>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dead letters recorded so far, for assertions.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.inner.read().await.dead_letters.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_checkpoint(&self, kind: EventKind) -> Result<Option<Checkpoint>> {
        Ok(self.inner.read().await.checkpoints.get(&kind).cloned())
    }

    async fn set_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.inner
            .write()
            .await
            .checkpoints
            .insert(checkpoint.kind, checkpoint.clone());
        Ok(())
    }

    async fn upsert_creator(&self, creator: &Creator) -> Result<()> {
        self.inner
            .write()
            .await
            .creators
            .insert(creator.address.clone(), creator.clone());
        Ok(())
    }

    async fn get_creator(&self, address: &str) -> Result<Option<Creator>> {
        Ok(self.inner.read().await.creators.get(address).cloned())
    }

    async fn upsert_tier(&self, tier: &Tier) -> Result<()> {
        self.inner
            .write()
            .await
            .tiers
            .insert(tier.tier_id.clone(), tier.clone());
        Ok(())
    }

    async fn get_tier(&self, tier_id: &str) -> Result<Option<Tier>> {
        Ok(self.inner.read().await.tiers.get(tier_id).cloned())
    }

    async fn upsert_content(&self, content: &Content) -> Result<()> {
        self.inner
            .write()
            .await
            .content
            .insert(content.content_id.clone(), content.clone());
        Ok(())
    }

    async fn get_content(&self, content_id: &str) -> Result<Option<Content>> {
        Ok(self.inner.read().await.content.get(content_id).cloned())
    }

    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()> {
        self.inner
            .write()
            .await
            .subscriptions
            .insert(subscription.subscription_id.clone(), subscription.clone());
        Ok(())
    }

    async fn get_subscription(&self, subscription_id: &str) -> Result<Option<Subscription>> {
        Ok(self
            .inner
            .read()
            .await
            .subscriptions
            .get(subscription_id)
            .cloned())
    }

    async fn upsert_channel_mapping(&self, mapping: &ChannelMapping) -> Result<()> {
        let key = (
            mapping.user_address.clone(),
            mapping.creator_address.clone(),
        );
        self.inner
            .write()
            .await
            .channel_mappings
            .insert(key, mapping.clone());
        Ok(())
    }

    async fn get_channel_mapping(
        &self,
        user_address: &str,
        creator_address: &str,
    ) -> Result<Option<ChannelMapping>> {
        let key = (user_address.to_string(), creator_address.to_string());
        Ok(self.inner.read().await.channel_mappings.get(&key).cloned())
    }

    async fn record_dead_letter(&self, dead_letter: &DeadLetter) -> Result<()> {
        self.inner.write().await.dead_letters.push(dead_letter.clone());
        Ok(())
    }
}
