//! Message decoding for raw feed payloads
//!
//! The feed delivers JSON objects keyed by short exchange-defined tags
//! (`t` trade id, `p` price, `q` quantity, `b`/`a` order ids, `T`
//! epoch-millis timestamp, `m` buyer-is-maker). Multiplexed messages
//! arrive wrapped in an envelope `{"stream": "<symbol>@<kind>", "data": ...}`.
//!
//! Decoding is a pure transformation: no side effects, and timestamps
//! are parsed from epoch milliseconds so the result never depends on
//! the process-local timezone.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use types::book::{OrderBookSnapshot, PriceLevel};
use types::symbol::Symbol;
use types::trade::Trade;

/// Errors that can occur while decoding a raw feed message.
///
/// Both variants are per-message failures: the offending message is
/// dropped and logged, never allowed to abort the callback loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed message: missing or invalid tag `{tag}`")]
    MalformedMessage { tag: &'static str },

    #[error("unknown stream format: `{stream}`")]
    UnknownStreamFormat { stream: String },
}

/// Stream kinds the collector understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Public trade stream (`<symbol>@trade`).
    Trade,
    /// Order book depth stream (`<symbol>@depth...`).
    Depth,
}

impl StreamKind {
    /// Stream suffix used when building subscription identifiers.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Trade => "trade",
            StreamKind::Depth => "depth",
        }
    }

    /// Parse a stream-kind suffix. Depth streams may carry extra
    /// qualifiers (`depth@20@100ms`), so a prefix match is used.
    fn parse(kind: &str) -> Option<Self> {
        if kind == "trade" {
            Some(StreamKind::Trade)
        } else if kind.starts_with("depth") {
            Some(StreamKind::Depth)
        } else {
            None
        }
    }
}

/// Split a multiplexed envelope into (symbol, stream kind, payload).
///
/// Expects `{"stream": "<symbol>@<kind>", "data": <payload>}`. A stream
/// string without the `@` separator, or an unrecognized kind, fails
/// with [`DecodeError::UnknownStreamFormat`].
pub fn classify(envelope: &Value) -> Result<(Symbol, StreamKind, &Value), DecodeError> {
    let stream = envelope
        .get("stream")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MalformedMessage { tag: "stream" })?;

    let (symbol, kind) = stream
        .split_once('@')
        .ok_or_else(|| DecodeError::UnknownStreamFormat {
            stream: stream.to_string(),
        })?;

    let kind = StreamKind::parse(kind).ok_or_else(|| DecodeError::UnknownStreamFormat {
        stream: stream.to_string(),
    })?;

    let payload = envelope
        .get("data")
        .ok_or(DecodeError::MalformedMessage { tag: "data" })?;

    Ok((Symbol::new(symbol), kind, payload))
}

/// Decode a raw trade message into a [`Trade`].
///
/// Tag mapping: `t` → trade id, `p` → price, `q` → quantity,
/// `b` → buy order id, `a` → sell order id, `T` → trade time
/// (epoch millis), `m` → is-limit-buy.
pub fn decode_trade(raw: &Value) -> Result<Trade, DecodeError> {
    Ok(Trade {
        trade_id: tag_id(raw, "t")?,
        price: tag_decimal(raw, "p")?,
        quantity: tag_decimal(raw, "q")?,
        buy_order_id: tag_id(raw, "b")?,
        sell_order_id: tag_id(raw, "a")?,
        trade_time: tag_instant(raw, "T")?,
        is_limit_buy: tag_bool(raw, "m")?,
    })
}

/// Decode a raw depth payload into an [`OrderBookSnapshot`].
///
/// Expects `bids` and `asks` arrays of `[price, quantity]` pairs.
/// Sides are sorted into canonical order and truncated to `depth` by
/// the snapshot constructor.
pub fn decode_orderbook(raw: &Value, depth: usize) -> Result<OrderBookSnapshot, DecodeError> {
    let bids = tag_levels(raw, "bids")?;
    let asks = tag_levels(raw, "asks")?;
    Ok(OrderBookSnapshot::from_levels(bids, asks, depth))
}

// ── Tag extraction helpers ──────────────────────────────────────────

/// Extract an identifier tag. The exchange sends ids as integers on
/// some streams and strings on others; both normalize to a string.
fn tag_id(raw: &Value, tag: &'static str) -> Result<String, DecodeError> {
    match raw.get(tag) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(DecodeError::MalformedMessage { tag }),
    }
}

fn tag_decimal(raw: &Value, tag: &'static str) -> Result<Decimal, DecodeError> {
    let text = match raw.get(tag) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(DecodeError::MalformedMessage { tag }),
    };
    Decimal::from_str(&text).map_err(|_| DecodeError::MalformedMessage { tag })
}

fn tag_instant(raw: &Value, tag: &'static str) -> Result<DateTime<Utc>, DecodeError> {
    let millis = raw
        .get(tag)
        .and_then(Value::as_i64)
        .ok_or(DecodeError::MalformedMessage { tag })?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or(DecodeError::MalformedMessage { tag })
}

fn tag_bool(raw: &Value, tag: &'static str) -> Result<bool, DecodeError> {
    raw.get(tag)
        .and_then(Value::as_bool)
        .ok_or(DecodeError::MalformedMessage { tag })
}

fn tag_levels(raw: &Value, tag: &'static str) -> Result<Vec<PriceLevel>, DecodeError> {
    let entries = raw
        .get(tag)
        .and_then(Value::as_array)
        .ok_or(DecodeError::MalformedMessage { tag })?;

    let mut levels = Vec::with_capacity(entries.len());
    for entry in entries {
        let pair = entry
            .as_array()
            .filter(|p| p.len() >= 2)
            .ok_or(DecodeError::MalformedMessage { tag })?;
        let price = decimal_value(&pair[0]).ok_or(DecodeError::MalformedMessage { tag })?;
        let quantity = decimal_value(&pair[1]).ok_or(DecodeError::MalformedMessage { tag })?;
        levels.push(PriceLevel::new(price, quantity));
    }
    Ok(levels)
}

fn decimal_value(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Decimal::from_str(&text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_trade() -> Value {
        json!({
            "e": "trade",
            "E": 1708123456800i64,
            "s": "ADABTC",
            "t": 12345,
            "p": "0.00312000",
            "q": "41.50000000",
            "b": 88,
            "a": 50,
            "T": 1708123456789i64,
            "m": true,
            "M": true
        })
    }

    #[test]
    fn test_decode_trade_tag_mapping() {
        let trade = decode_trade(&raw_trade()).unwrap();

        assert_eq!(trade.trade_id, "12345");
        assert_eq!(trade.price, Decimal::from_str("0.00312000").unwrap());
        assert_eq!(trade.quantity, Decimal::from_str("41.50000000").unwrap());
        assert_eq!(trade.buy_order_id, "88");
        assert_eq!(trade.sell_order_id, "50");
        assert_eq!(trade.trade_time.timestamp_millis(), 1708123456789);
        assert!(trade.is_limit_buy);
    }

    #[test]
    fn test_decode_trade_missing_tag() {
        let mut raw = raw_trade();
        raw.as_object_mut().unwrap().remove("p");

        let err = decode_trade(&raw).unwrap_err();
        assert_eq!(err, DecodeError::MalformedMessage { tag: "p" });
    }

    #[test]
    fn test_decode_trade_unparseable_price() {
        let mut raw = raw_trade();
        raw["p"] = json!("not-a-number");

        let err = decode_trade(&raw).unwrap_err();
        assert_eq!(err, DecodeError::MalformedMessage { tag: "p" });
    }

    #[test]
    fn test_decode_trade_bad_timestamp() {
        let mut raw = raw_trade();
        raw["T"] = json!("yesterday");

        let err = decode_trade(&raw).unwrap_err();
        assert_eq!(err, DecodeError::MalformedMessage { tag: "T" });
    }

    #[test]
    fn test_classify_trade_envelope() {
        let envelope = json!({
            "stream": "adabtc@trade",
            "data": raw_trade(),
        });

        let (symbol, kind, payload) = classify(&envelope).unwrap();
        assert_eq!(symbol, Symbol::new("adabtc"));
        assert_eq!(kind, StreamKind::Trade);
        assert_eq!(payload["t"], json!(12345));
    }

    #[test]
    fn test_classify_depth_with_qualifiers() {
        let envelope = json!({
            "stream": "ethbtc@depth@20@100ms",
            "data": { "bids": [], "asks": [] },
        });

        let (symbol, kind, _) = classify(&envelope).unwrap();
        assert_eq!(symbol, Symbol::new("ethbtc"));
        assert_eq!(kind, StreamKind::Depth);
    }

    #[test]
    fn test_classify_missing_separator() {
        let envelope = json!({ "stream": "adabtctrade", "data": {} });

        let err = classify(&envelope).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownStreamFormat {
                stream: "adabtctrade".to_string()
            }
        );
    }

    #[test]
    fn test_classify_unknown_kind() {
        let envelope = json!({ "stream": "adabtc@kline_1m", "data": {} });

        let err = classify(&envelope).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownStreamFormat { .. }));
    }

    #[test]
    fn test_classify_missing_data() {
        let envelope = json!({ "stream": "adabtc@trade" });

        let err = classify(&envelope).unwrap_err();
        assert_eq!(err, DecodeError::MalformedMessage { tag: "data" });
    }

    #[test]
    fn test_decode_orderbook_sorted_and_truncated() {
        let raw = json!({
            "bids": [["0.0030", "1.0"], ["0.0032", "2.0"], ["0.0031", "3.0"]],
            "asks": [["0.0035", "1.0"], ["0.0033", "2.0"], ["0.0034", "3.0"]],
        });

        let snap = decode_orderbook(&raw, 2).unwrap();
        assert_eq!(snap.bids.len(), 2);
        assert_eq!(snap.asks.len(), 2);
        assert_eq!(snap.bids[0].price, Decimal::from_str("0.0032").unwrap());
        assert_eq!(snap.asks[0].price, Decimal::from_str("0.0033").unwrap());
        assert_eq!(snap.depth, 2);
    }

    #[test]
    fn test_decode_orderbook_missing_side() {
        let raw = json!({ "bids": [["0.0030", "1.0"]] });

        let err = decode_orderbook(&raw, 10).unwrap_err();
        assert_eq!(err, DecodeError::MalformedMessage { tag: "asks" });
    }

    #[test]
    fn test_decode_orderbook_malformed_level() {
        let raw = json!({
            "bids": [["0.0030"]],
            "asks": [],
        });

        let err = decode_orderbook(&raw, 10).unwrap_err();
        assert_eq!(err, DecodeError::MalformedMessage { tag: "bids" });
    }
}
