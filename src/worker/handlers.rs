//! One handler per tracked event type.
//!
//! Every handler performs an idempotent natural-key upsert. Where the event
//! references a parent entity written by a different event type's poll cycle
//! (tier -> creator, subscription -> tier, content -> creator + tiers), the
//! handler resolves the parent first and raises `DependencyNotFound` through
//! the retry engine, since cross-type delivery order is not guaranteed.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use log::debug;

use crate::error::HandlerError;
use crate::events::{
    decode_payload, ChannelMappingCreatedPayload, ContentPublishedPayload, EventKind,
    ProfileCreatedPayload, ProfileUpdatedPayload, SubscriptionPurchasedPayload,
    TierCreatedPayload, TierPriceUpdatedPayload,
};
use crate::ledger::LedgerEvent;
use crate::retry::{execute_with_retry, RetryConfig};
use crate::store::models::{ChannelMapping, Content, Creator, Subscription, Tier};
use crate::store::Store;
use crate::utils::{normalize_address, parse_biguint};

pub struct EventHandlers {
    store: Arc<dyn Store>,
    dependency_retry: RetryConfig,
}

impl EventHandlers {
    pub fn new(store: Arc<dyn Store>, dependency_retry: RetryConfig) -> Self {
        Self {
            store,
            dependency_retry,
        }
    }

    /// Apply one event to the store. Replays of an already-applied event
    /// converge to the same row, so redelivery after a cursor reset or a
    /// restart is harmless.
    pub async fn dispatch(
        &self,
        kind: EventKind,
        event: &LedgerEvent,
    ) -> Result<(), HandlerError> {
        debug!(
            "Dispatching {} event seq {} (tx {})",
            kind, event.sequence, event.tx_digest
        );

        match kind {
            EventKind::ProfileCreated => self.handle_profile_created(event).await,
            EventKind::ProfileUpdated => self.handle_profile_updated(event).await,
            EventKind::TierCreated => self.handle_tier_created(event).await,
            EventKind::TierPriceUpdated => self.handle_tier_price_updated(event).await,
            EventKind::ContentPublished => self.handle_content_published(event).await,
            EventKind::SubscriptionPurchased => self.handle_subscription_purchased(event).await,
            EventKind::ChannelMappingCreated => self.handle_channel_mapping_created(event).await,
        }
    }

    async fn handle_profile_created(&self, event: &LedgerEvent) -> Result<(), HandlerError> {
        let payload: ProfileCreatedPayload = decode_payload(&event.parsed_json)?;

        let creator = Creator {
            address: normalize_address(&payload.creator_address),
            name: payload.name,
            bio: payload.bio,
            avatar_cid: payload.avatar_cid,
            updated_at: event_time(event),
        };
        self.store.upsert_creator(&creator).await?;
        Ok(())
    }

    async fn handle_profile_updated(&self, event: &LedgerEvent) -> Result<(), HandlerError> {
        let payload: ProfileUpdatedPayload = decode_payload(&event.parsed_json)?;
        let address = normalize_address(&payload.creator_address);

        // The creation event may still be in flight on its own poll cycle.
        self.wait_for_creator(&address).await?;

        let creator = Creator {
            address,
            name: payload.name,
            bio: payload.bio,
            avatar_cid: payload.avatar_cid,
            updated_at: event_time(event),
        };
        self.store.upsert_creator(&creator).await?;
        Ok(())
    }

    async fn handle_tier_created(&self, event: &LedgerEvent) -> Result<(), HandlerError> {
        let payload: TierCreatedPayload = decode_payload(&event.parsed_json)?;
        let creator_address = normalize_address(&payload.creator_address);

        self.wait_for_creator(&creator_address).await?;

        let price = parse_biguint(&payload.price)
            .ok_or_else(|| HandlerError::Payload(format!("bad tier price {:?}", payload.price)))?;
        let duration_days = i32::try_from(payload.duration_days).map_err(|_| {
            HandlerError::Payload(format!("bad tier duration {}", payload.duration_days))
        })?;

        let tier = Tier {
            tier_id: payload.tier_id,
            creator_address,
            name: payload.name,
            price,
            duration_days,
            active: true,
            updated_at: event_time(event),
        };
        self.store.upsert_tier(&tier).await?;
        Ok(())
    }

    async fn handle_tier_price_updated(&self, event: &LedgerEvent) -> Result<(), HandlerError> {
        let payload: TierPriceUpdatedPayload = decode_payload(&event.parsed_json)?;

        let mut tier = self.wait_for_tier(&payload.tier_id).await?;

        tier.price = parse_biguint(&payload.new_price).ok_or_else(|| {
            HandlerError::Payload(format!("bad tier price {:?}", payload.new_price))
        })?;
        tier.updated_at = event_time(event);
        self.store.upsert_tier(&tier).await?;
        Ok(())
    }

    async fn handle_content_published(&self, event: &LedgerEvent) -> Result<(), HandlerError> {
        let payload: ContentPublishedPayload = decode_payload(&event.parsed_json)?;
        let creator_address = normalize_address(&payload.creator_address);

        // Creator and every gating tier must exist before the content row is
        // written; all of them can lag behind this event.
        execute_with_retry(
            || async {
                if self.store.get_creator(&creator_address).await?.is_none() {
                    return Err(HandlerError::DependencyNotFound(format!(
                        "creator {}",
                        creator_address
                    )));
                }
                for tier_id in &payload.tier_ids {
                    if self.store.get_tier(tier_id).await?.is_none() {
                        return Err(HandlerError::DependencyNotFound(format!(
                            "tier {}",
                            tier_id
                        )));
                    }
                }
                Ok(())
            },
            HandlerError::is_retryable,
            &self.dependency_retry,
        )
        .await?;

        let content = Content {
            content_id: payload.content_id,
            creator_address,
            tier_ids: payload.tier_ids,
            title: payload.title,
            payload_cid: payload.payload_cid,
            updated_at: event_time(event),
        };
        self.store.upsert_content(&content).await?;
        Ok(())
    }

    async fn handle_subscription_purchased(
        &self,
        event: &LedgerEvent,
    ) -> Result<(), HandlerError> {
        let payload: SubscriptionPurchasedPayload = decode_payload(&event.parsed_json)?;

        let tier = self.wait_for_tier(&payload.tier_id).await?;

        let amount = parse_biguint(&payload.amount).ok_or_else(|| {
            HandlerError::Payload(format!("bad subscription amount {:?}", payload.amount))
        })?;
        let expires_at_ms = i64::try_from(payload.expires_at_ms).map_err(|_| {
            HandlerError::Payload(format!("bad expiry timestamp {}", payload.expires_at_ms))
        })?;

        let subscription = Subscription {
            subscription_id: payload.subscription_id,
            subscriber_address: normalize_address(&payload.subscriber_address),
            tier_id: tier.tier_id,
            creator_address: tier.creator_address,
            amount,
            expires_at_ms,
            updated_at: event_time(event),
        };
        self.store.upsert_subscription(&subscription).await?;
        Ok(())
    }

    async fn handle_channel_mapping_created(
        &self,
        event: &LedgerEvent,
    ) -> Result<(), HandlerError> {
        let payload: ChannelMappingCreatedPayload = decode_payload(&event.parsed_json)?;

        let mapping = ChannelMapping {
            user_address: normalize_address(&payload.user_address),
            creator_address: normalize_address(&payload.creator_address),
            channel_id: payload.channel_id,
            updated_at: event_time(event),
        };
        self.store.upsert_channel_mapping(&mapping).await?;
        Ok(())
    }

    /// Resolve a creator, retrying with backoff while the profile event is
    /// still in flight.
    async fn wait_for_creator(&self, address: &str) -> Result<Creator, HandlerError> {
        execute_with_retry(
            || async {
                self.store
                    .get_creator(address)
                    .await?
                    .ok_or_else(|| {
                        HandlerError::DependencyNotFound(format!("creator {}", address))
                    })
            },
            HandlerError::is_retryable,
            &self.dependency_retry,
        )
        .await
    }

    /// Resolve a tier, retrying with backoff while the tier event is still
    /// in flight.
    async fn wait_for_tier(&self, tier_id: &str) -> Result<Tier, HandlerError> {
        execute_with_retry(
            || async {
                self.store
                    .get_tier(tier_id)
                    .await?
                    .ok_or_else(|| HandlerError::DependencyNotFound(format!("tier {}", tier_id)))
            },
            HandlerError::is_retryable,
            &self.dependency_retry,
        )
        .await
    }
}

/// Row timestamps come from the event itself so a replay writes an identical
/// row. Events without a usable timestamp fall back to the epoch, which is
/// equally deterministic across replays.
fn event_time(event: &LedgerEvent) -> DateTime<Utc> {
    event
        .timestamp_ms
        .and_then(|ms| i64::try_from(ms).ok())
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
