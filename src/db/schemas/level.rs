//! Level document schema
//!
//! A commission tier: either a fixed slot people are assigned to
//! (flat scope) or a payout keyed by referral depth (referral scope).
//! `level_order` is unique within a scope.

use std::fmt;
use std::str::FromStr;

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for levels
pub const LEVEL_COLLECTION: &str = "levels";

/// Collection name for flat-level roster assignments
pub const LEVEL_ASSIGNMENT_COLLECTION: &str = "level_people";

/// Which commission table a level belongs to
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LevelScope {
    /// Fixed tiers with assigned rosters; payouts split evenly
    Flat,
    /// Tiers keyed by referral depth; one recipient per depth
    Referral,
}

impl fmt::Display for LevelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => f.write_str("flat"),
            Self::Referral => f.write_str("referral"),
        }
    }
}

impl FromStr for LevelScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "referral" => Ok(Self::Referral),
            other => Err(format!("Unknown level scope: {}", other)),
        }
    }
}

/// Level document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LevelDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub oid: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Logical identifier used across collections
    pub id: Uuid,

    pub name: String,

    pub scope: LevelScope,

    /// Position within the scope, 1-based
    pub level_order: u32,

    /// Percentage of the sale price, 0..=100
    pub commission_percentage: Decimal,

    /// True when this row came from default seeding rather than an
    /// admin edit
    #[serde(default)]
    pub seeded: bool,
}

impl LevelDoc {
    pub fn new(scope: LevelScope, level_order: u32, commission_percentage: Decimal) -> Self {
        Self {
            oid: None,
            metadata: Metadata::new(),
            id: Uuid::new_v4(),
            name: format!("Level {}", level_order),
            scope,
            level_order,
            commission_percentage,
            seeded: false,
        }
    }
}

impl IntoIndexes for LevelDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("level_id_unique".to_string())
                        .build(),
                ),
            ),
            // One row per (scope, order)
            (
                doc! { "scope": 1, "level_order": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("scope_order_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for LevelDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Roster membership for a flat level
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LevelAssignmentDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub oid: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    pub level_id: Uuid,
    pub person_id: Uuid,
}

impl LevelAssignmentDoc {
    pub fn new(level_id: Uuid, person_id: Uuid) -> Self {
        Self {
            oid: None,
            metadata: Metadata::new(),
            level_id,
            person_id,
        }
    }
}

impl IntoIndexes for LevelAssignmentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // A person appears in a level's roster at most once
            (
                doc! { "level_id": 1, "person_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("level_person_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for LevelAssignmentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
