//! Store contract for splitledger
//!
//! The single narrow interface between the core (resolver, engine,
//! ledger) and whatever holds the data. Constructed once and passed by
//! reference into the core; nothing in the crate reaches for a global
//! client.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::schemas::{CommissionDoc, LevelDoc, LevelScope, PersonDoc, PropertyDoc};
use crate::types::Result;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Persistent operations the core consumes.
///
/// `commit_commissions` is the only mutation the ledger performs and
/// must be atomic: either the whole batch lands or none of it does.
/// Implementations also own the same-property duplicate guard so that
/// two concurrent commits cannot double-count.
#[async_trait]
pub trait CommissionStore: Send + Sync {
    async fn get_person(&self, id: Uuid) -> Result<Option<PersonDoc>>;
    async fn get_person_by_username(&self, username: &str) -> Result<Option<PersonDoc>>;
    async fn list_people(&self) -> Result<Vec<PersonDoc>>;
    async fn count_people(&self) -> Result<u64>;
    async fn insert_person(&self, person: PersonDoc) -> Result<()>;
    async fn update_person(&self, person: PersonDoc) -> Result<()>;

    async fn get_property(&self, id: Uuid) -> Result<Option<PropertyDoc>>;
    async fn list_properties(&self) -> Result<Vec<PropertyDoc>>;
    async fn insert_property(&self, property: PropertyDoc) -> Result<()>;

    /// Levels for a scope, ordered by ascending level_order
    async fn get_levels(&self, scope: LevelScope) -> Result<Vec<LevelDoc>>;
    async fn upsert_level(&self, level: LevelDoc) -> Result<()>;

    /// Roster for a flat level, ordered by username for stable output
    async fn roster_for_level(&self, level_id: Uuid) -> Result<Vec<PersonDoc>>;
    /// Idempotent: assigning an already-assigned person is a no-op
    async fn assign_to_level(&self, level_id: Uuid, person_id: Uuid) -> Result<()>;
    async fn remove_from_level(&self, level_id: Uuid, person_id: Uuid) -> Result<bool>;

    /// Atomically persist one calculation event's batch.
    ///
    /// Fails with `AlreadyCommitted` when the property already has
    /// records and `force` is false; the guard check and the insert
    /// happen under the same transaction/lock.
    async fn commit_commissions(
        &self,
        property_id: Uuid,
        batch: Vec<CommissionDoc>,
        force: bool,
    ) -> Result<()>;

    async fn has_commissions_for(&self, property_id: Uuid) -> Result<bool>;

    /// Sum of all commission amounts ever recorded for a person
    async fn sum_commissions_for_person(&self, person_id: Uuid) -> Result<Decimal>;

    /// All records for a person, chronological by calculation time
    async fn commissions_for_person(&self, person_id: Uuid) -> Result<Vec<CommissionDoc>>;
}
