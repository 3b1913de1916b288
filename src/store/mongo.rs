//! MongoDB-backed store
//!
//! Thin mapping from the store contract onto typed collections. The
//! commission commit writes a per-property marker document in the same
//! transaction as the batch; the marker's unique index is what turns a
//! concurrent double commit into a hard failure for the loser, since
//! two snapshot-isolated transactions inserting distinct record
//! documents would otherwise both commit.

use async_trait::async_trait;
use bson::doc;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::schemas::{
    CommissionDoc, CommissionEventDoc, LevelAssignmentDoc, LevelDoc, LevelScope, PersonDoc,
    PropertyDoc, COMMISSION_COLLECTION, COMMISSION_EVENT_COLLECTION,
    LEVEL_ASSIGNMENT_COLLECTION, LEVEL_COLLECTION, PERSON_COLLECTION, PROPERTY_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::store::CommissionStore;
use crate::types::{LedgerError, Result};

/// Store backed by MongoDB collections
#[derive(Clone)]
pub struct MongoStore {
    client: MongoClient,
    people: MongoCollection<PersonDoc>,
    properties: MongoCollection<PropertyDoc>,
    levels: MongoCollection<LevelDoc>,
    assignments: MongoCollection<LevelAssignmentDoc>,
    commissions: MongoCollection<CommissionDoc>,
    events: MongoCollection<CommissionEventDoc>,
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(we))
            if we.code == 11000
    )
}

impl MongoStore {
    /// Open all collections, creating indexes as needed
    pub async fn new(client: MongoClient) -> Result<Self> {
        Ok(Self {
            people: client.collection(PERSON_COLLECTION).await?,
            properties: client.collection(PROPERTY_COLLECTION).await?,
            levels: client.collection(LEVEL_COLLECTION).await?,
            assignments: client.collection(LEVEL_ASSIGNMENT_COLLECTION).await?,
            commissions: client.collection(COMMISSION_COLLECTION).await?,
            events: client.collection(COMMISSION_EVENT_COLLECTION).await?,
            client,
        })
    }
}

#[async_trait]
impl CommissionStore for MongoStore {
    async fn get_person(&self, id: Uuid) -> Result<Option<PersonDoc>> {
        self.people.find_one(doc! { "id": id.to_string() }).await
    }

    async fn get_person_by_username(&self, username: &str) -> Result<Option<PersonDoc>> {
        self.people.find_one(doc! { "username": username }).await
    }

    async fn list_people(&self) -> Result<Vec<PersonDoc>> {
        self.people.find_sorted(doc! {}, doc! { "username": 1 }).await
    }

    async fn count_people(&self) -> Result<u64> {
        self.people.count(doc! {}).await
    }

    async fn insert_person(&self, person: PersonDoc) -> Result<()> {
        self.people.insert_one(person).await
    }

    async fn update_person(&self, person: PersonDoc) -> Result<()> {
        let filter = doc! { "id": person.id.to_string() };
        self.people.replace_one(filter, person).await
    }

    async fn get_property(&self, id: Uuid) -> Result<Option<PropertyDoc>> {
        self.properties.find_one(doc! { "id": id.to_string() }).await
    }

    async fn list_properties(&self) -> Result<Vec<PropertyDoc>> {
        self.properties
            .find_sorted(doc! {}, doc! { "metadata.created_at": -1 })
            .await
    }

    async fn insert_property(&self, property: PropertyDoc) -> Result<()> {
        self.properties.insert_one(property).await
    }

    async fn get_levels(&self, scope: LevelScope) -> Result<Vec<LevelDoc>> {
        self.levels
            .find_sorted(doc! { "scope": scope.to_string() }, doc! { "level_order": 1 })
            .await
    }

    async fn upsert_level(&self, level: LevelDoc) -> Result<()> {
        let filter = doc! {
            "scope": level.scope.to_string(),
            "level_order": level.level_order as i64,
        };
        self.levels.replace_one(filter, level).await
    }

    async fn roster_for_level(&self, level_id: Uuid) -> Result<Vec<PersonDoc>> {
        let assignments = self
            .assignments
            .find_sorted(doc! { "level_id": level_id.to_string() }, doc! {})
            .await?;

        let mut roster = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            match self.get_person(assignment.person_id).await? {
                Some(person) => roster.push(person),
                None => warn!(
                    "Roster references missing person {} for level {}",
                    assignment.person_id, level_id
                ),
            }
        }
        roster.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(roster)
    }

    async fn assign_to_level(&self, level_id: Uuid, person_id: Uuid) -> Result<()> {
        let filter = doc! {
            "level_id": level_id.to_string(),
            "person_id": person_id.to_string(),
        };
        // Upsert keeps assignment idempotent under the unique index
        self.assignments
            .replace_one(filter, LevelAssignmentDoc::new(level_id, person_id))
            .await
    }

    async fn remove_from_level(&self, level_id: Uuid, person_id: Uuid) -> Result<bool> {
        let filter = doc! {
            "level_id": level_id.to_string(),
            "person_id": person_id.to_string(),
        };
        self.assignments.delete_one(filter).await
    }

    async fn commit_commissions(
        &self,
        property_id: Uuid,
        batch: Vec<CommissionDoc>,
        force: bool,
    ) -> Result<()> {
        let mut session = self.client.start_session().await?;
        session
            .start_transaction()
            .await
            .map_err(|e| LedgerError::Database(format!("Failed to start transaction: {}", e)))?;

        let committed_at = batch
            .first()
            .map(|r| r.calculated_at)
            .unwrap_or_else(Utc::now);
        let marker_filter = doc! { "property_id": property_id.to_string() };
        let existing = self
            .events
            .find_one_in_session(marker_filter.clone(), &mut session)
            .await?;

        match existing {
            Some(_) if !force => {
                let _ = session.abort_transaction().await;
                return Err(LedgerError::AlreadyCommitted(property_id));
            }
            Some(mut marker) => {
                // Rewriting the marker makes two concurrent forced
                // commits conflict; one aborts instead of both landing.
                marker.last_committed_at = committed_at;
                if let Err(e) = self
                    .events
                    .replace_one_in_session(marker_filter, marker, &mut session)
                    .await
                {
                    let _ = session.abort_transaction().await;
                    return Err(e);
                }
            }
            None => {
                // Both racers see no marker under snapshot isolation;
                // the unique index on property_id fails the loser here.
                let marker = CommissionEventDoc::new(property_id, committed_at);
                if let Err(e) = self.events.insert_one_in_session(marker, &mut session).await {
                    let _ = session.abort_transaction().await;
                    return Err(if is_duplicate_key(&e) {
                        LedgerError::AlreadyCommitted(property_id)
                    } else {
                        LedgerError::Database(format!("Insert failed: {}", e))
                    });
                }
            }
        }

        if let Err(e) = self
            .commissions
            .insert_many_in_session(batch, &mut session)
            .await
        {
            let _ = session.abort_transaction().await;
            return Err(e);
        }

        session
            .commit_transaction()
            .await
            .map_err(|e| LedgerError::Database(format!("Commit failed: {}", e)))?;

        debug!("Committed commission batch for property {}", property_id);
        Ok(())
    }

    async fn has_commissions_for(&self, property_id: Uuid) -> Result<bool> {
        let found = self
            .commissions
            .find_one(doc! { "property_id": property_id.to_string() })
            .await?;
        Ok(found.is_some())
    }

    async fn sum_commissions_for_person(&self, person_id: Uuid) -> Result<Decimal> {
        // Amounts are stored as decimal strings; summation happens
        // client-side in Decimal to stay exact.
        let records = self.commissions_for_person(person_id).await?;
        Ok(records.iter().map(|r| r.commission_amount).sum())
    }

    async fn commissions_for_person(&self, person_id: Uuid) -> Result<Vec<CommissionDoc>> {
        self.commissions
            .find_sorted(
                doc! { "person_id": person_id.to_string() },
                doc! { "calculated_at": 1, "_id": 1 },
            )
            .await
    }
}
