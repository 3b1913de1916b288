//! Commission record schema
//!
//! One immutable ledger entry per recipient per property sale.
//! Records are only ever inserted; corrections are new compensating
//! records, so the history of every payout stays auditable.

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for commission records
pub const COMMISSION_COLLECTION: &str = "commissions";

/// Collection name for per-property commit markers
pub const COMMISSION_EVENT_COLLECTION: &str = "commission_events";

/// What a commission record was paid for
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommissionBasis {
    /// Share of a flat level's pool, split across the roster
    Level { level_id: Uuid, level_order: u32 },
    /// Referral payout for an ancestor at the given chain depth
    Referral { depth: u32 },
}

/// Commission ledger entry
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CommissionDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub oid: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Logical identifier
    pub id: Uuid,

    pub property_id: Uuid,
    pub person_id: Uuid,

    pub basis: CommissionBasis,

    /// Percentage applied, as configured at calculation time
    pub commission_percentage: Decimal,

    /// Amount owed, full precision (rounded only for display)
    pub commission_amount: Decimal,

    /// When the calculation event ran
    pub calculated_at: DateTime<Utc>,
}

impl CommissionDoc {
    pub fn new(
        property_id: Uuid,
        person_id: Uuid,
        basis: CommissionBasis,
        commission_percentage: Decimal,
        commission_amount: Decimal,
        calculated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            oid: None,
            metadata: Metadata::new(),
            id: Uuid::new_v4(),
            property_id,
            person_id,
            basis,
            commission_percentage,
            commission_amount,
            calculated_at,
        }
    }
}

impl IntoIndexes for CommissionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "property_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("commission_property_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "person_id": 1, "calculated_at": 1 },
                Some(
                    IndexOptions::builder()
                        .name("commission_person_time_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for CommissionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Marker for a property's committed calculation events.
///
/// One document per property, written in the same transaction as the
/// record batch. The unique index on `property_id` is what excludes
/// the concurrent double-commit race: when two transactions both see
/// no marker and both insert one, the unique index fails the loser. A
/// forced recompute rewrites this document instead, so concurrent
/// forced commits conflict on it and one aborts.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CommissionEventDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub oid: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    pub property_id: Uuid,

    /// When the most recent batch was committed
    pub last_committed_at: DateTime<Utc>,
}

impl CommissionEventDoc {
    pub fn new(property_id: Uuid, last_committed_at: DateTime<Utc>) -> Self {
        Self {
            oid: None,
            metadata: Metadata::new(),
            property_id,
            last_committed_at,
        }
    }
}

impl IntoIndexes for CommissionEventDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "property_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("commission_event_property_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for CommissionEventDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
