//! Property document schema
//!
//! A listed property with its sale price and optional seller. Once
//! commissions are committed against a property, the ledger guard
//! keeps recomputation from silently altering historical records.

use std::fmt;
use std::str::FromStr;

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for properties
pub const PROPERTY_COLLECTION: &str = "properties";

/// Property category
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Residential,
    Commercial,
    Industrial,
    Land,
    Luxury,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Residential => "residential",
            Self::Commercial => "commercial",
            Self::Industrial => "industrial",
            Self::Land => "land",
            Self::Luxury => "luxury",
        };
        f.write_str(s)
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "residential" => Ok(Self::Residential),
            "commercial" => Ok(Self::Commercial),
            "industrial" => Ok(Self::Industrial),
            "land" => Ok(Self::Land),
            "luxury" => Ok(Self::Luxury),
            other => Err(format!("Unknown property type: {}", other)),
        }
    }
}

/// Property document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PropertyDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub oid: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Logical identifier used across collections
    pub id: Uuid,

    pub name: String,

    /// Sale price; Decimal keeps money exact at any magnitude
    pub price: Decimal,

    pub property_type: PropertyType,

    pub address: String,

    /// The person who sold this property, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sold_by: Option<Uuid>,
}

impl PropertyDoc {
    pub fn new(
        name: String,
        price: Decimal,
        property_type: PropertyType,
        address: String,
        sold_by: Option<Uuid>,
    ) -> Self {
        Self {
            oid: None,
            metadata: Metadata::new(),
            id: Uuid::new_v4(),
            name,
            price,
            property_type,
            address,
            sold_by,
        }
    }
}

impl IntoIndexes for PropertyDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("property_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "sold_by": 1 },
                Some(
                    IndexOptions::builder()
                        .name("sold_by_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PropertyDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
