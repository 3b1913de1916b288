//! Person document schema
//!
//! An agent in the referral hierarchy. `referred_by` links to another
//! person; the relation must stay acyclic. `referral_level` is derived
//! (1 at a root, 1 + referrer's level otherwise) and never supplied by
//! callers.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for people
pub const PERSON_COLLECTION: &str = "people";

/// Person document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PersonDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub oid: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Logical identifier used across collections
    pub id: Uuid,

    /// Unique username
    pub username: String,

    pub first_name: String,
    pub last_name: String,
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// The person who referred this one, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<Uuid>,

    /// Derived depth in the referral tree (1 = root)
    pub referral_level: u32,
}

impl PersonDoc {
    pub fn new(
        username: String,
        first_name: String,
        last_name: String,
        email: String,
        phone: Option<String>,
        referred_by: Option<Uuid>,
        referral_level: u32,
    ) -> Self {
        Self {
            oid: None,
            metadata: Metadata::new(),
            id: Uuid::new_v4(),
            username,
            first_name,
            last_name,
            email,
            phone,
            referred_by,
            referral_level,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {} (@{})", self.first_name, self.last_name, self.username)
    }
}

impl IntoIndexes for PersonDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("person_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "username": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("username_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "referred_by": 1 },
                Some(
                    IndexOptions::builder()
                        .name("referred_by_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PersonDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
