use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::events::EventKind;
use crate::store::models::{
    ChannelMapping, Checkpoint, Content, Creator, DeadLetter, Subscription, Tier,
};
use crate::store::postgres::PostgresStore;
use crate::store::Store;
use crate::utils::{biguint_to_string, parse_biguint};

#[async_trait]
impl Store for PostgresStore {
    // ==================== CHECKPOINTS ====================

    async fn get_checkpoint(&self, kind: EventKind) -> Result<Option<Checkpoint>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT last_event_seq, last_tx_digest, updated_at
            FROM indexer.checkpoints
            WHERE event_kind = $1
        "#;

        let row = client.query_opt(query, &[&kind.as_str()]).await?;
        row.map(|r| {
            let seq: String = r.get("last_event_seq");
            let last_event_seq = parse_biguint(&seq)
                .ok_or_else(|| anyhow!("corrupt checkpoint sequence for {}: {:?}", kind, seq))?;
            Ok(Checkpoint {
                kind,
                last_event_seq,
                last_tx_digest: r.get("last_tx_digest"),
                updated_at: r.get("updated_at"),
            })
        })
        .transpose()
    }

    async fn set_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO indexer.checkpoints (event_kind, last_event_seq, last_tx_digest, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_kind) DO UPDATE SET
                last_event_seq = EXCLUDED.last_event_seq,
                last_tx_digest = EXCLUDED.last_tx_digest,
                updated_at = EXCLUDED.updated_at
        "#;

        client
            .execute(
                query,
                &[
                    &checkpoint.kind.as_str(),
                    &biguint_to_string(&checkpoint.last_event_seq),
                    &checkpoint.last_tx_digest,
                    &checkpoint.updated_at,
                ],
            )
            .await
            .with_context(|| format!("Failed to upsert checkpoint for {}", checkpoint.kind))?;

        Ok(())
    }

    // ==================== CREATORS ====================

    async fn upsert_creator(&self, creator: &Creator) -> Result<()> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO indexer.creators (address, name, bio, avatar_cid, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (address) DO UPDATE SET
                name = EXCLUDED.name,
                bio = EXCLUDED.bio,
                avatar_cid = EXCLUDED.avatar_cid,
                updated_at = EXCLUDED.updated_at
        "#;

        client
            .execute(
                query,
                &[
                    &creator.address,
                    &creator.name,
                    &creator.bio,
                    &creator.avatar_cid,
                    &creator.updated_at,
                ],
            )
            .await
            .with_context(|| format!("Failed to upsert creator {}", creator.address))?;

        Ok(())
    }

    async fn get_creator(&self, address: &str) -> Result<Option<Creator>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT address, name, bio, avatar_cid, updated_at
            FROM indexer.creators
            WHERE address = $1
        "#;

        let row = client.query_opt(query, &[&address]).await?;
        Ok(row.map(|r| Creator {
            address: r.get("address"),
            name: r.get("name"),
            bio: r.get("bio"),
            avatar_cid: r.get("avatar_cid"),
            updated_at: r.get("updated_at"),
        }))
    }

    // ==================== TIERS ====================

    async fn upsert_tier(&self, tier: &Tier) -> Result<()> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO indexer.tiers (tier_id, creator_address, name, price, duration_days, active, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (tier_id) DO UPDATE SET
                creator_address = EXCLUDED.creator_address,
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                duration_days = EXCLUDED.duration_days,
                active = EXCLUDED.active,
                updated_at = EXCLUDED.updated_at
        "#;

        client
            .execute(
                query,
                &[
                    &tier.tier_id,
                    &tier.creator_address,
                    &tier.name,
                    &biguint_to_string(&tier.price),
                    &tier.duration_days,
                    &tier.active,
                    &tier.updated_at,
                ],
            )
            .await
            .with_context(|| format!("Failed to upsert tier {}", tier.tier_id))?;

        Ok(())
    }

    async fn get_tier(&self, tier_id: &str) -> Result<Option<Tier>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT tier_id, creator_address, name, price, duration_days, active, updated_at
            FROM indexer.tiers
            WHERE tier_id = $1
        "#;

        let row = client.query_opt(query, &[&tier_id]).await?;
        row.map(|r| {
            let price: String = r.get("price");
            let price = parse_biguint(&price)
                .ok_or_else(|| anyhow!("corrupt price for tier {}: {:?}", tier_id, price))?;
            Ok(Tier {
                tier_id: r.get("tier_id"),
                creator_address: r.get("creator_address"),
                name: r.get("name"),
                price,
                duration_days: r.get("duration_days"),
                active: r.get("active"),
                updated_at: r.get("updated_at"),
            })
        })
        .transpose()
    }

    // ==================== CONTENT ====================

    async fn upsert_content(&self, content: &Content) -> Result<()> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO indexer.content (content_id, creator_address, tier_ids, title, payload_cid, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (content_id) DO UPDATE SET
                creator_address = EXCLUDED.creator_address,
                tier_ids = EXCLUDED.tier_ids,
                title = EXCLUDED.title,
                payload_cid = EXCLUDED.payload_cid,
                updated_at = EXCLUDED.updated_at
        "#;

        client
            .execute(
                query,
                &[
                    &content.content_id,
                    &content.creator_address,
                    &content.tier_ids,
                    &content.title,
                    &content.payload_cid,
                    &content.updated_at,
                ],
            )
            .await
            .with_context(|| format!("Failed to upsert content {}", content.content_id))?;

        Ok(())
    }

    async fn get_content(&self, content_id: &str) -> Result<Option<Content>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT content_id, creator_address, tier_ids, title, payload_cid, updated_at
            FROM indexer.content
            WHERE content_id = $1
        "#;

        let row = client.query_opt(query, &[&content_id]).await?;
        Ok(row.map(|r| Content {
            content_id: r.get("content_id"),
            creator_address: r.get("creator_address"),
            tier_ids: r.get("tier_ids"),
            title: r.get("title"),
            payload_cid: r.get("payload_cid"),
            updated_at: r.get("updated_at"),
        }))
    }

    // ==================== SUBSCRIPTIONS ====================

    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<()> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO indexer.subscriptions
                (subscription_id, subscriber_address, tier_id, creator_address, amount, expires_at_ms, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (subscription_id) DO UPDATE SET
                subscriber_address = EXCLUDED.subscriber_address,
                tier_id = EXCLUDED.tier_id,
                creator_address = EXCLUDED.creator_address,
                amount = EXCLUDED.amount,
                expires_at_ms = EXCLUDED.expires_at_ms,
                updated_at = EXCLUDED.updated_at
        "#;

        client
            .execute(
                query,
                &[
                    &subscription.subscription_id,
                    &subscription.subscriber_address,
                    &subscription.tier_id,
                    &subscription.creator_address,
                    &biguint_to_string(&subscription.amount),
                    &subscription.expires_at_ms,
                    &subscription.updated_at,
                ],
            )
            .await
            .with_context(|| {
                format!(
                    "Failed to upsert subscription {}",
                    subscription.subscription_id
                )
            })?;

        Ok(())
    }

    async fn get_subscription(&self, subscription_id: &str) -> Result<Option<Subscription>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT subscription_id, subscriber_address, tier_id, creator_address, amount, expires_at_ms, updated_at
            FROM indexer.subscriptions
            WHERE subscription_id = $1
        "#;

        let row = client.query_opt(query, &[&subscription_id]).await?;
        row.map(|r| {
            let amount: String = r.get("amount");
            let amount = parse_biguint(&amount).ok_or_else(|| {
                anyhow!(
                    "corrupt amount for subscription {}: {:?}",
                    subscription_id,
                    amount
                )
            })?;
            Ok(Subscription {
                subscription_id: r.get("subscription_id"),
                subscriber_address: r.get("subscriber_address"),
                tier_id: r.get("tier_id"),
                creator_address: r.get("creator_address"),
                amount,
                expires_at_ms: r.get("expires_at_ms"),
                updated_at: r.get("updated_at"),
            })
        })
        .transpose()
    }

    // ==================== CHANNEL MAPPINGS ====================

    async fn upsert_channel_mapping(&self, mapping: &ChannelMapping) -> Result<()> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO indexer.channel_mappings (user_address, creator_address, channel_id, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_address, creator_address) DO UPDATE SET
                channel_id = EXCLUDED.channel_id,
                updated_at = EXCLUDED.updated_at
        "#;

        client
            .execute(
                query,
                &[
                    &mapping.user_address,
                    &mapping.creator_address,
                    &mapping.channel_id,
                    &mapping.updated_at,
                ],
            )
            .await
            .with_context(|| {
                format!(
                    "Failed to upsert channel mapping ({}, {})",
                    mapping.user_address, mapping.creator_address
                )
            })?;

        Ok(())
    }

    async fn get_channel_mapping(
        &self,
        user_address: &str,
        creator_address: &str,
    ) -> Result<Option<ChannelMapping>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT user_address, creator_address, channel_id, updated_at
            FROM indexer.channel_mappings
            WHERE user_address = $1 AND creator_address = $2
        "#;

        let row = client
            .query_opt(query, &[&user_address, &creator_address])
            .await?;
        Ok(row.map(|r| ChannelMapping {
            user_address: r.get("user_address"),
            creator_address: r.get("creator_address"),
            channel_id: r.get("channel_id"),
            updated_at: r.get("updated_at"),
        }))
    }

    // ==================== DEAD LETTERS ====================

    async fn record_dead_letter(&self, dead_letter: &DeadLetter) -> Result<()> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO indexer.dead_letters (event_kind, event_seq, tx_digest, error, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#;

        let payload = serde_json::to_string(&dead_letter.payload)
            .context("Failed to serialize dead-letter payload")?;

        client
            .execute(
                query,
                &[
                    &dead_letter.kind.as_str(),
                    &biguint_to_string(&dead_letter.event_seq),
                    &dead_letter.tx_digest,
                    &dead_letter.error,
                    &payload,
                    &dead_letter.created_at,
                ],
            )
            .await
            .with_context(|| {
                format!(
                    "Failed to record dead letter for {} seq {}",
                    dead_letter.kind,
                    biguint_to_string(&dead_letter.event_seq)
                )
            })?;

        Ok(())
    }
}
