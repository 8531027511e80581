//! Tracked event types and their typed payloads.
//!
//! `EventKind::ALL` is the static registry driving the poll loop: one entry
//! per Move event struct emitted by the subscription package, each rendered
//! into a ledger-side event-type filter. Payloads decode from the events'
//! `parsed_json` with serde; addresses normalize to lowercase hex and
//! monetary fields arrive as decimal strings so they decode to `BigUint`
//! without precision loss.

use serde::Deserialize;

use crate::error::HandlerError;

/// Every event type the indexer tracks. Each gets its own independent poll
/// cycle and checkpoint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ProfileCreated,
    ProfileUpdated,
    TierCreated,
    TierPriceUpdated,
    ContentPublished,
    SubscriptionPurchased,
    ChannelMappingCreated,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::ProfileCreated,
        EventKind::ProfileUpdated,
        EventKind::TierCreated,
        EventKind::TierPriceUpdated,
        EventKind::ContentPublished,
        EventKind::SubscriptionPurchased,
        EventKind::ChannelMappingCreated,
    ];

    /// Stable name used as the checkpoint key and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ProfileCreated => "profile_created",
            EventKind::ProfileUpdated => "profile_updated",
            EventKind::TierCreated => "tier_created",
            EventKind::TierPriceUpdated => "tier_price_updated",
            EventKind::ContentPublished => "content_published",
            EventKind::SubscriptionPurchased => "subscription_purchased",
            EventKind::ChannelMappingCreated => "channel_mapping_created",
        }
    }

    /// Move module and struct name inside the subscription package.
    fn move_struct(&self) -> (&'static str, &'static str) {
        match self {
            EventKind::ProfileCreated => ("creator", "ProfileCreated"),
            EventKind::ProfileUpdated => ("creator", "ProfileUpdated"),
            EventKind::TierCreated => ("tier", "TierCreated"),
            EventKind::TierPriceUpdated => ("tier", "TierPriceUpdated"),
            EventKind::ContentPublished => ("content", "ContentPublished"),
            EventKind::SubscriptionPurchased => ("subscription", "SubscriptionPurchased"),
            EventKind::ChannelMappingCreated => ("channel", "ChannelMappingCreated"),
        }
    }

    /// Render the ledger-side event-type filter for this kind.
    pub fn event_type(&self, package: &str) -> String {
        let (module, name) = self.move_struct();
        format!("{}::{}::{}", package, module, name)
    }

    pub fn from_str(s: &str) -> Option<EventKind> {
        EventKind::ALL.iter().copied().find(|k| k.as_str() == s)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileCreatedPayload {
    pub creator_address: String,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_cid: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdatedPayload {
    pub creator_address: String,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_cid: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TierCreatedPayload {
    pub tier_id: String,
    pub creator_address: String,
    pub name: String,
    /// Price in base units, decimal string.
    pub price: String,
    pub duration_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TierPriceUpdatedPayload {
    pub tier_id: String,
    /// New price in base units, decimal string.
    pub new_price: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentPublishedPayload {
    pub content_id: String,
    pub creator_address: String,
    /// Tiers gating access; every one must already exist.
    pub tier_ids: Vec<String>,
    pub title: String,
    pub payload_cid: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionPurchasedPayload {
    pub subscription_id: String,
    pub subscriber_address: String,
    pub tier_id: String,
    /// Amount paid in base units, decimal string.
    pub amount: String,
    pub expires_at_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelMappingCreatedPayload {
    pub user_address: String,
    pub creator_address: String,
    pub channel_id: String,
}

/// Decode a payload struct out of an event's `parsed_json`. Decode failures
/// are not retryable: the payload will never change shape on redelivery.
pub fn decode_payload<T: serde::de::DeserializeOwned>(
    value: &serde_json::Value,
) -> Result<T, HandlerError> {
    serde_json::from_value(value.clone()).map_err(HandlerError::payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_rendering() {
        let pkg = "0xabc";
        assert_eq!(
            EventKind::SubscriptionPurchased.event_type(pkg),
            "0xabc::subscription::SubscriptionPurchased"
        );
        assert_eq!(
            EventKind::ProfileCreated.event_type(pkg),
            "0xabc::creator::ProfileCreated"
        );
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::from_str("unknown"), None);
    }

    #[test]
    fn test_decode_subscription_payload() {
        let value = serde_json::json!({
            "subscription_id": "0xsub1",
            "subscriber_address": "0xuser",
            "tier_id": "0xtier",
            "amount": "5000000000",
            "expires_at_ms": 1700000000000u64,
        });
        let payload: SubscriptionPurchasedPayload = decode_payload(&value).unwrap();
        assert_eq!(payload.amount, "5000000000");
        assert_eq!(payload.expires_at_ms, 1700000000000);
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let value = serde_json::json!({ "tier_id": "0xtier" });
        let err = decode_payload::<TierPriceUpdatedPayload>(&value).unwrap_err();
        assert!(matches!(err, HandlerError::Payload(_)));
    }
}
