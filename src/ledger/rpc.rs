//! JSON-RPC ledger client.
//!
//! Speaks the fullnode's `queryEvents` method: filter by Move event type,
//! resume from an opaque `(txDigest, eventSeq)` cursor, bounded page size,
//! ascending order.

use std::time::Duration;

use log::debug;
use serde::Deserialize;
use serde_json::json;

use crate::ledger::{EventCursor, EventPage, LedgerClient, LedgerError, LedgerEvent};
use crate::utils::parse_biguint;

/// JSON-RPC "invalid params" — the code the fullnode answers with when a
/// continuation cursor no longer resolves (pruned or from another epoch).
const RPC_INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<RpcEventPage>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcEventPage {
    data: Vec<RpcEvent>,
    #[serde(rename = "nextCursor")]
    next_cursor: Option<EventCursor>,
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct RpcEvent {
    id: EventCursor,
    #[serde(rename = "parsedJson")]
    parsed_json: serde_json::Value,
    #[serde(rename = "timestampMs")]
    timestamp_ms: Option<String>,
}

/// Production `LedgerClient` over HTTP JSON-RPC.
pub struct RpcLedgerClient {
    http: reqwest::Client,
    rpc_url: String,
}

impl RpcLedgerClient {
    pub fn new(rpc_url: String, request_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self { http, rpc_url })
    }
}

#[async_trait::async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn query_events(
        &self,
        event_type: &str,
        cursor: Option<EventCursor>,
        limit: usize,
    ) -> Result<EventPage, LedgerError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "suix_queryEvents",
            "params": [
                { "MoveEventType": event_type },
                cursor,
                limit,
                // descending_order
                false,
            ],
        });

        debug!("Querying ledger for {} (limit {})", event_type, limit);

        let response: RpcResponse = self
            .http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = response.error {
            if err.code == RPC_INVALID_PARAMS {
                return Err(LedgerError::InvalidCursor);
            }
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        let page = response
            .result
            .ok_or_else(|| LedgerError::Decode("response carried neither result nor error".into()))?;

        let mut events = Vec::with_capacity(page.data.len());
        for raw in page.data {
            let sequence = parse_biguint(&raw.id.event_seq).ok_or_else(|| {
                LedgerError::Decode(format!("unparseable event sequence {:?}", raw.id.event_seq))
            })?;
            let timestamp_ms = raw.timestamp_ms.as_deref().and_then(|t| t.parse().ok());

            events.push(LedgerEvent {
                parsed_json: raw.parsed_json,
                tx_digest: raw.id.tx_digest,
                sequence,
                timestamp_ms,
            });
        }

        Ok(EventPage {
            events,
            next_cursor: page.next_cursor,
            has_more: page.has_next_page,
        })
    }
}
