//! In-memory store
//!
//! Backs dev mode and the test suite with the same contract semantics
//! as the Mongo store. The commission ledger sits behind one mutex so
//! the duplicate guard and the batch append are a single atomic step.

use bson::DateTime;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use async_trait::async_trait;

use crate::db::schemas::{CommissionDoc, LevelDoc, LevelScope, PersonDoc, PropertyDoc};
use crate::store::CommissionStore;
use crate::types::{LedgerError, Result};

/// Store held entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    people: DashMap<Uuid, PersonDoc>,
    properties: DashMap<Uuid, PropertyDoc>,
    levels: DashMap<(LevelScope, u32), LevelDoc>,
    /// (level_id, person_id) roster membership
    assignments: DashMap<(Uuid, Uuid), ()>,
    /// Append-only ledger; mutex covers guard check + append
    commissions: Mutex<Vec<CommissionDoc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn stamp<T: crate::db::MutMetadata>(mut item: T) -> T {
    let metadata = item.mut_metadata();
    if metadata.created_at.is_none() {
        metadata.created_at = Some(DateTime::now());
    }
    metadata.updated_at = Some(DateTime::now());
    item
}

#[async_trait]
impl CommissionStore for MemoryStore {
    async fn get_person(&self, id: Uuid) -> Result<Option<PersonDoc>> {
        Ok(self.people.get(&id).map(|p| p.clone()))
    }

    async fn get_person_by_username(&self, username: &str) -> Result<Option<PersonDoc>> {
        Ok(self
            .people
            .iter()
            .find(|p| p.username == username)
            .map(|p| p.clone()))
    }

    async fn list_people(&self) -> Result<Vec<PersonDoc>> {
        let mut people: Vec<PersonDoc> = self.people.iter().map(|p| p.clone()).collect();
        people.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(people)
    }

    async fn count_people(&self) -> Result<u64> {
        Ok(self.people.len() as u64)
    }

    async fn insert_person(&self, person: PersonDoc) -> Result<()> {
        let person = stamp(person);
        self.people.insert(person.id, person);
        Ok(())
    }

    async fn update_person(&self, person: PersonDoc) -> Result<()> {
        let person = stamp(person);
        self.people.insert(person.id, person);
        Ok(())
    }

    async fn get_property(&self, id: Uuid) -> Result<Option<PropertyDoc>> {
        Ok(self.properties.get(&id).map(|p| p.clone()))
    }

    async fn list_properties(&self) -> Result<Vec<PropertyDoc>> {
        let mut properties: Vec<PropertyDoc> =
            self.properties.iter().map(|p| p.clone()).collect();
        properties.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
        Ok(properties)
    }

    async fn insert_property(&self, property: PropertyDoc) -> Result<()> {
        let property = stamp(property);
        self.properties.insert(property.id, property);
        Ok(())
    }

    async fn get_levels(&self, scope: LevelScope) -> Result<Vec<LevelDoc>> {
        let mut levels: Vec<LevelDoc> = self
            .levels
            .iter()
            .filter(|entry| entry.key().0 == scope)
            .map(|entry| entry.value().clone())
            .collect();
        levels.sort_by_key(|l| l.level_order);
        Ok(levels)
    }

    async fn upsert_level(&self, level: LevelDoc) -> Result<()> {
        let level = stamp(level);
        self.levels.insert((level.scope, level.level_order), level);
        Ok(())
    }

    async fn roster_for_level(&self, level_id: Uuid) -> Result<Vec<PersonDoc>> {
        let mut roster = Vec::new();
        for entry in self.assignments.iter() {
            let (lid, pid) = *entry.key();
            if lid == level_id {
                if let Some(person) = self.people.get(&pid) {
                    roster.push(person.clone());
                }
            }
        }
        roster.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(roster)
    }

    async fn assign_to_level(&self, level_id: Uuid, person_id: Uuid) -> Result<()> {
        self.assignments.insert((level_id, person_id), ());
        Ok(())
    }

    async fn remove_from_level(&self, level_id: Uuid, person_id: Uuid) -> Result<bool> {
        Ok(self.assignments.remove(&(level_id, person_id)).is_some())
    }

    async fn commit_commissions(
        &self,
        property_id: Uuid,
        batch: Vec<CommissionDoc>,
        force: bool,
    ) -> Result<()> {
        let mut ledger = self.commissions.lock().await;

        if !force && ledger.iter().any(|r| r.property_id == property_id) {
            return Err(LedgerError::AlreadyCommitted(property_id));
        }

        ledger.extend(batch.into_iter().map(stamp));
        Ok(())
    }

    async fn has_commissions_for(&self, property_id: Uuid) -> Result<bool> {
        let ledger = self.commissions.lock().await;
        Ok(ledger.iter().any(|r| r.property_id == property_id))
    }

    async fn sum_commissions_for_person(&self, person_id: Uuid) -> Result<Decimal> {
        let ledger = self.commissions.lock().await;
        Ok(ledger
            .iter()
            .filter(|r| r.person_id == person_id)
            .map(|r| r.commission_amount)
            .sum())
    }

    async fn commissions_for_person(&self, person_id: Uuid) -> Result<Vec<CommissionDoc>> {
        let ledger = self.commissions.lock().await;
        let mut records: Vec<CommissionDoc> = ledger
            .iter()
            .filter(|r| r.person_id == person_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.calculated_at);
        Ok(records)
    }
}
