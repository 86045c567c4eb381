//! Executed trade records
//!
//! A `Trade` is an immutable record of one execution reported by the
//! feed. Identifiers are carried as strings exactly as the exchange
//! supplies them; prices and quantities use `Decimal` for deterministic
//! arithmetic.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single executed trade as delivered by the feed.
///
/// Never mutated after creation. `trade_time` is the exchange-supplied
/// execution instant, not the local receive time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Exchange-assigned trade identifier.
    pub trade_id: String,
    /// Execution price.
    pub price: Decimal,
    /// Executed quantity.
    pub quantity: Decimal,
    /// Identifier of the resting/aggressing buy order.
    pub buy_order_id: String,
    /// Identifier of the resting/aggressing sell order.
    pub sell_order_id: String,
    /// Exchange-supplied execution timestamp.
    pub trade_time: DateTime<Utc>,
    /// Whether the buyer was the passive (limit) side.
    pub is_limit_buy: bool,
}

impl Trade {
    /// Notional value of the trade (price × quantity).
    pub fn value(&self) -> Decimal {
        self.price * self.quantity
    }
}
