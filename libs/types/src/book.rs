//! Order book price levels and snapshots
//!
//! The feed delivers a complete depth view on every update, so a
//! snapshot always replaces the previous one wholesale — there is no
//! incremental-patch reconciliation anywhere in the system.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single price level: price and resting quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        Self { price, quantity }
    }
}

/// A point-in-time view of one symbol's order book.
///
/// Invariants enforced by [`OrderBookSnapshot::from_levels`]:
/// - `bids` sorted descending by price (best bid first)
/// - `asks` sorted ascending by price (best ask first)
/// - each side truncated to `depth` levels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Bid levels, best (highest) price first.
    pub bids: Vec<PriceLevel>,
    /// Ask levels, best (lowest) price first.
    pub asks: Vec<PriceLevel>,
    /// Depth at which the feed view was truncated.
    pub depth: usize,
}

impl OrderBookSnapshot {
    /// Build a snapshot from raw levels, sorting each side into its
    /// canonical order and truncating to `depth`.
    pub fn from_levels(
        mut bids: Vec<PriceLevel>,
        mut asks: Vec<PriceLevel>,
        depth: usize,
    ) -> Self {
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        bids.truncate(depth);
        asks.truncate(depth);

        Self { bids, asks, depth }
    }

    /// Best (highest) bid level, if any.
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Best (lowest) ask level, if any.
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Spread between best ask and best bid, if both sides are present.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask.price - bid.price),
            _ => None,
        }
    }
}
