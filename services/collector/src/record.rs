//! Persistence records and the sink port
//!
//! A [`PersistenceRecord`] is the unit the batch cache and sink operate
//! on: a tagged union of {periodic full-state snapshot, trade event,
//! order book event} with a common envelope. Records are created at
//! decode/sample time, enqueued into the cache, and dropped from memory
//! once a flush succeeds.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use types::book::OrderBookSnapshot;
use types::symbol::Symbol;
use types::trade::Trade;

use crate::state::SymbolState;

/// Sub-source labels for the three record origins.
const SUB_SOURCE_SAMPLER: &str = "sampler";
const SUB_SOURCE_TRADE: &str = "trade";
const SUB_SOURCE_DEPTH: &str = "depth";

/// One persistable document.
///
/// `event_time` is when the event happened (exchange clock for trades,
/// sample time for periodic snapshots); `received_at` is the local wall
/// clock at ingestion. `symbol` is absent for the periodic case, which
/// spans the whole tracked set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceRecord {
    /// Originating exchange environment (e.g. "binance_us").
    pub source: String,
    /// Which path produced the record: "sampler", "trade", or "depth".
    pub sub_source: String,
    /// When the event occurred.
    pub event_time: DateTime<Utc>,
    /// Local wall clock at ingestion/sampling.
    pub received_at: DateTime<Utc>,
    /// Symbol the record concerns; `None` for multi-symbol snapshots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Symbol>,
    /// Event type tag plus type-specific payload.
    #[serde(flatten)]
    pub payload: RecordPayload,
}

/// Event-specific payloads, adjacently tagged so persisted documents
/// carry `event_type` and `data` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "data", rename_all = "snake_case")]
pub enum RecordPayload {
    /// Periodic full-state snapshot: symbol → state copy.
    Snapshot(BTreeMap<Symbol, SymbolState>),
    /// A single decoded trade event.
    Trade(Trade),
    /// A single order book event.
    OrderBook(OrderBookSnapshot),
}

impl PersistenceRecord {
    /// Wrap a full-state copy as a periodic snapshot record.
    pub fn periodic(
        source: &str,
        states: BTreeMap<Symbol, SymbolState>,
        sampled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.to_string(),
            sub_source: SUB_SOURCE_SAMPLER.to_string(),
            event_time: sampled_at,
            received_at: sampled_at,
            symbol: None,
            payload: RecordPayload::Snapshot(states),
        }
    }

    /// Wrap a single decoded trade as a record.
    pub fn trade_event(
        source: &str,
        symbol: Symbol,
        trade: Trade,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.to_string(),
            sub_source: SUB_SOURCE_TRADE.to_string(),
            event_time: trade.trade_time,
            received_at,
            symbol: Some(symbol),
            payload: RecordPayload::Trade(trade),
        }
    }

    /// Wrap a single order book snapshot as a record.
    ///
    /// Depth payloads carry no exchange timestamp, so the receive
    /// instant doubles as the event time.
    pub fn book_event(
        source: &str,
        symbol: Symbol,
        book: OrderBookSnapshot,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.to_string(),
            sub_source: SUB_SOURCE_DEPTH.to_string(),
            event_time: received_at,
            received_at,
            symbol: Some(symbol),
            payload: RecordPayload::OrderBook(book),
        }
    }

    /// Get the event type as a string label for logging.
    pub fn event_type_label(&self) -> &'static str {
        match &self.payload {
            RecordPayload::Snapshot(_) => "snapshot",
            RecordPayload::Trade(_) => "trade",
            RecordPayload::OrderBook(_) => "order_book",
        }
    }
}

/// Error returned by a failed sink write.
///
/// The batch that failed is retained by the cache for a later retry;
/// this error only reports the failure upward.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("sink write failed: {reason}")]
pub struct SinkWriteError {
    pub reason: String,
}

impl SinkWriteError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Opaque persistent-store collaborator accepting batches of records.
///
/// The write is bounded by the sink's own timeout policy; the collector
/// propagates failures but does not override timeouts.
#[async_trait]
pub trait RecordSink<R: Send + Sync>: Send + Sync {
    async fn write_batch(&self, records: &[R]) -> Result<(), SinkWriteError>;
}

#[async_trait]
impl<R, S> RecordSink<R> for std::sync::Arc<S>
where
    R: Send + Sync,
    S: RecordSink<R> + ?Sized,
{
    async fn write_batch(&self, records: &[R]) -> Result<(), SinkWriteError> {
        (**self).write_batch(records).await
    }
}
