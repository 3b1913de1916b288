//! Shared error and result types
//!
//! One crate-wide error enum; validation errors are caller-correctable,
//! `Database` wraps whole-batch persistence failures.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Error type for all splitledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Commission percentage outside the 0..=100 range
    #[error("Invalid commission percentage: {0} (must be between 0 and 100)")]
    InvalidPercentage(Decimal),

    /// Calculation requested for a property with no seller
    #[error("Property {0} has no seller assigned")]
    MissingSeller(Uuid),

    /// Calculation requested without a property or with a negative price
    #[error("Missing property or invalid price")]
    MissingPropertyOrPrice,

    /// Username already taken by another person
    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    /// The referred_by graph revisited a person during traversal.
    /// Data-integrity violation; surfaced, never silently truncated.
    #[error("Referral cycle detected at person {0}")]
    CycleDetected(Uuid),

    /// A second commit was attempted for a property that already has
    /// committed commissions, without an explicit override
    #[error("Commissions already committed for property {0} (use force to recompute)")]
    AlreadyCommitted(Uuid),

    /// Lookup miss for a required reference
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// Storage-layer failure; the whole batch is rolled back
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Whether the caller can correct this error by changing input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidPercentage(_)
                | Self::MissingSeller(_)
                | Self::MissingPropertyOrPrice
                | Self::DuplicateUsername(_)
        )
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, LedgerError>;
