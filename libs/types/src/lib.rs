//! Types library for the market data collector
//!
//! This library provides the core domain types shared between the
//! collector service and any external launcher, ensuring type safety
//! and deterministic behavior.
//!
//! # Modules
//! - `symbol`: Tradable instrument identifiers
//! - `trade`: Executed trade records
//! - `book`: Order book price levels and snapshots

// Public modules
pub mod book;
pub mod symbol;
pub mod trade;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::book::*;
    pub use crate::symbol::*;
    pub use crate::trade::*;
}
