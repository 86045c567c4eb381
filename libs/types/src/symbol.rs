//! Tradable instrument identifiers
//!
//! A `Symbol` is an exchange pair identifier (e.g., "adabtc"). The feed
//! addresses streams by lowercase symbol, so the constructor normalizes
//! case once and every downstream lookup stays consistent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a tradable instrument (trading pair).
///
/// Stored lowercase to match the feed's stream naming
/// (`"<symbol>@<kind>"`). Ordered so it can key a `BTreeMap` for
/// deterministic iteration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol, normalizing to lowercase.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into().to_ascii_lowercase())
    }

    /// Get the symbol string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build a stream identifier for this symbol and stream kind,
    /// e.g. `"adabtc@trade"`.
    pub fn stream(&self, kind: &str) -> String {
        format!("{}@{}", self.0, kind)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
