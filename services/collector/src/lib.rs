//! Market Data Collector Service
//!
//! Consumes live exchange feed messages (trades, order book depth) and
//! produces:
//! - A bounded in-memory view of recent per-symbol state
//! - Periodic point-in-time snapshots of that state
//! - Size-bounded batches of persistence records for the sink
//!
//! # Architecture
//!
//! ```text
//!  Feed callbacks (external threads)        Sampler (periodic task)
//!        │                                        │
//!    ┌───▼────┐                                   │ every snap_every
//!    │ Decode │  ← classify / decode_trade /      │
//!    └───┬────┘    decode_orderbook               │
//!        │                                        │
//!  ┌─────▼──────────┐   snapshot_all()   ┌────────▼───────┐
//!  │ SymbolStateStore│◄──────────────────│ PersistenceRec │
//!  │ (per-symbol mux)│                   └────────┬───────┘
//!  └────────────────┘                             │ append
//!                                         ┌───────▼───────┐
//!                                         │  BatchCache   │
//!                                         └───────┬───────┘
//!                                                 │ write_batch
//!                                             ┌───▼───┐
//!                                             │ Sink  │
//!                                             └───────┘
//! ```
//!
//! Feed callbacks mutate state and return promptly; persistence is the
//! sampler's and cache's responsibility alone.

pub mod cache;
pub mod config;
pub mod decode;
pub mod pipeline;
pub mod record;
pub mod sampler;
pub mod state;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
