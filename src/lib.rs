//! Splitledger - commission manager for multi-level real-estate splits
//!
//! Tracks agents in a referral hierarchy, listed properties, and the
//! per-level commission tables, and turns a property sale into an
//! atomic batch of commission records.
//!
//! ## Pieces
//!
//! - **Directory**: people and properties with write-side validation
//! - **Chain**: referral chain resolution over `referred_by` links
//! - **Levels**: the flat and referral commission tables
//! - **Engine**: pure share calculation for one sale
//! - **Ledger**: preview/commit facade over the append-only record
//! - **Store**: the narrow data-access contract (MongoDB or in-memory)

pub mod chain;
pub mod config;
pub mod db;
pub mod directory;
pub mod engine;
pub mod ledger;
pub mod levels;
pub mod money;
pub mod store;
pub mod types;

pub use config::Args;
pub use engine::{CommissionEngine, CommissionPreview, EngineConfig, SplitPolicy};
pub use ledger::CommissionLedger;
pub use store::CommissionStore;
pub use types::{LedgerError, Result};
