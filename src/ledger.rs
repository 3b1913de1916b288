//! Commission ledger facade
//!
//! Ties the resolver, level tables, and engine together over the store
//! contract. `preview` computes a calculation event without writing;
//! `commit` persists one atomically. Both run the same engine on the
//! same loaded inputs, so a commit records exactly what the preview
//! showed.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::chain::ChainResolver;
use crate::db::schemas::{CommissionDoc, LevelDoc, LevelScope, PersonDoc};
use crate::engine::{CommissionEngine, CommissionPreview, EngineConfig};
use crate::store::CommissionStore;
use crate::types::{LedgerError, Result};

/// Append-only commission ledger over a store
pub struct CommissionLedger<'a, S: CommissionStore + ?Sized> {
    store: &'a S,
    engine: CommissionEngine,
}

impl<'a, S: CommissionStore + ?Sized> CommissionLedger<'a, S> {
    pub fn new(store: &'a S, config: EngineConfig) -> Self {
        Self {
            store,
            engine: CommissionEngine::new(config),
        }
    }

    /// Compute the full calculation event for a property without
    /// persisting anything. Fails whole, not partially: any missing
    /// reference aborts before a single share is produced.
    pub async fn preview(&self, property_id: Uuid) -> Result<CommissionPreview> {
        let property = self
            .store
            .get_property(property_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Property", property_id))?;
        let seller_id = property
            .sold_by
            .ok_or(LedgerError::MissingSeller(property_id))?;

        let mut flat_levels: Vec<(LevelDoc, Vec<PersonDoc>)> = Vec::new();
        for level in self.store.get_levels(LevelScope::Flat).await? {
            let roster = self.store.roster_for_level(level.id).await?;
            flat_levels.push((level, roster));
        }

        let referral_levels = self.store.get_levels(LevelScope::Referral).await?;
        let chain = ChainResolver::new(self.store).resolve(seller_id).await?;

        self.engine
            .calculate(&property, &flat_levels, &referral_levels, &chain)
    }

    /// Persist a previewed calculation event as one atomic batch.
    ///
    /// Every record shares the same `calculated_at` instant. Refuses a
    /// second commit for the same property unless `force` is set; a
    /// forced recompute appends, never rewrites. Returns the number of
    /// records written.
    pub async fn commit(&self, preview: &CommissionPreview, force: bool) -> Result<usize> {
        if preview.shares.is_empty() {
            info!(
                "No commission shares for property {}; nothing to commit",
                preview.property_id
            );
            return Ok(0);
        }

        let calculated_at = Utc::now();
        let batch: Vec<CommissionDoc> = preview
            .shares
            .iter()
            .map(|share| {
                CommissionDoc::new(
                    preview.property_id,
                    share.person_id,
                    share.basis.clone(),
                    share.percentage,
                    share.amount,
                    calculated_at,
                )
            })
            .collect();
        let count = batch.len();

        self.store
            .commit_commissions(preview.property_id, batch, force)
            .await?;

        info!(
            "Committed {} commission record(s) for property {} (total {})",
            count,
            preview.property_id,
            preview.total()
        );
        Ok(count)
    }

    /// Preview and commit in one call
    pub async fn calculate_and_commit(
        &self,
        property_id: Uuid,
        force: bool,
    ) -> Result<(CommissionPreview, usize)> {
        let preview = self.preview(property_id).await?;
        let count = self.commit(&preview, force).await?;
        Ok((preview, count))
    }

    /// Lifetime commission total for a person, exact
    pub async fn total_for(&self, person_id: Uuid) -> Result<Decimal> {
        self.store.sum_commissions_for_person(person_id).await
    }

    /// A person's full commission history, chronological
    pub async fn history_for(&self, person_id: Uuid) -> Result<Vec<CommissionDoc>> {
        self.store.commissions_for_person(person_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{CommissionBasis, LevelDoc, PropertyDoc, PropertyType};
    use crate::store::MemoryStore;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn person(username: &str, referred_by: Option<Uuid>, level: u32) -> PersonDoc {
        PersonDoc::new(
            username.to_string(),
            username.to_string(),
            "Test".to_string(),
            format!("{}@example.com", username),
            None,
            referred_by,
            level,
        )
    }

    fn property(price: &str, sold_by: Option<Uuid>) -> PropertyDoc {
        PropertyDoc::new(
            "Test House".to_string(),
            dec(price),
            PropertyType::Residential,
            "1 Main St".to_string(),
            sold_by,
        )
    }

    async fn seed_flat_level(
        store: &MemoryStore,
        order: u32,
        pct: &str,
        roster: &[&PersonDoc],
    ) {
        let level = LevelDoc::new(LevelScope::Flat, order, dec(pct));
        let level_id = level.id;
        store.upsert_level(level).await.unwrap();
        for p in roster {
            store.assign_to_level(level_id, p.id).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_preview_then_commit_records_all_shares() {
        let store = MemoryStore::new();
        let root = person("root", None, 1);
        let seller = person("seller", Some(root.id), 2);
        let agent = person("agent", None, 1);
        let prop = property("500000", Some(seller.id));
        let prop_id = prop.id;

        store.insert_person(root.clone()).await.unwrap();
        store.insert_person(seller.clone()).await.unwrap();
        store.insert_person(agent.clone()).await.unwrap();
        store.insert_property(prop).await.unwrap();

        seed_flat_level(&store, 1, "5.0", &[&agent]).await;
        store
            .upsert_level(LevelDoc::new(LevelScope::Referral, 1, dec("3.0")))
            .await
            .unwrap();

        let ledger = CommissionLedger::new(&store, EngineConfig::default());
        let preview = ledger.preview(prop_id).await.unwrap();
        assert_eq!(preview.shares.len(), 2);
        assert_eq!(preview.total(), dec("40000"));

        let count = ledger.commit(&preview, false).await.unwrap();
        assert_eq!(count, 2);

        assert_eq!(ledger.total_for(agent.id).await.unwrap(), dec("25000"));
        assert_eq!(ledger.total_for(root.id).await.unwrap(), dec("15000"));
    }

    #[tokio::test]
    async fn test_preview_writes_nothing() {
        let store = MemoryStore::new();
        let seller = person("seller", None, 1);
        let agent = person("agent", None, 1);
        let prop = property("100000", Some(seller.id));
        let prop_id = prop.id;

        store.insert_person(seller).await.unwrap();
        store.insert_person(agent.clone()).await.unwrap();
        store.insert_property(prop).await.unwrap();
        seed_flat_level(&store, 1, "5.0", &[&agent]).await;

        let ledger = CommissionLedger::new(&store, EngineConfig::default());
        ledger.preview(prop_id).await.unwrap();
        ledger.preview(prop_id).await.unwrap();

        assert!(!store.has_commissions_for(prop_id).await.unwrap());
        assert_eq!(ledger.total_for(agent.id).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_second_commit_is_rejected_without_force() {
        let store = MemoryStore::new();
        let seller = person("seller", None, 1);
        let agent = person("agent", None, 1);
        let prop = property("100000", Some(seller.id));
        let prop_id = prop.id;

        store.insert_person(seller).await.unwrap();
        store.insert_person(agent.clone()).await.unwrap();
        store.insert_property(prop).await.unwrap();
        seed_flat_level(&store, 1, "5.0", &[&agent]).await;

        let ledger = CommissionLedger::new(&store, EngineConfig::default());
        ledger.calculate_and_commit(prop_id, false).await.unwrap();

        let err = ledger
            .calculate_and_commit(prop_id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyCommitted(id) if id == prop_id));

        // The failed attempt must not have appended anything
        assert_eq!(ledger.total_for(agent.id).await.unwrap(), dec("5000"));
    }

    #[tokio::test]
    async fn test_forced_recompute_appends() {
        let store = MemoryStore::new();
        let seller = person("seller", None, 1);
        let agent = person("agent", None, 1);
        let prop = property("100000", Some(seller.id));
        let prop_id = prop.id;

        store.insert_person(seller).await.unwrap();
        store.insert_person(agent.clone()).await.unwrap();
        store.insert_property(prop).await.unwrap();
        seed_flat_level(&store, 1, "5.0", &[&agent]).await;

        let ledger = CommissionLedger::new(&store, EngineConfig::default());
        ledger.calculate_and_commit(prop_id, false).await.unwrap();
        ledger.calculate_and_commit(prop_id, true).await.unwrap();

        let history = ledger.history_for(agent.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(ledger.total_for(agent.id).await.unwrap(), dec("10000"));
    }

    #[tokio::test]
    async fn test_zero_price_commits_zero_amount_records() {
        let store = MemoryStore::new();
        let seller = person("seller", None, 1);
        let agent = person("agent", None, 1);
        let prop = property("0", Some(seller.id));
        let prop_id = prop.id;

        store.insert_person(seller).await.unwrap();
        store.insert_person(agent.clone()).await.unwrap();
        store.insert_property(prop).await.unwrap();
        seed_flat_level(&store, 1, "5.0", &[&agent]).await;

        let ledger = CommissionLedger::new(&store, EngineConfig::default());
        let (preview, count) = ledger.calculate_and_commit(prop_id, false).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(preview.total(), Decimal::ZERO);

        let history = ledger.history_for(agent.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].commission_amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_empty_event_commits_nothing() {
        let store = MemoryStore::new();
        let seller = person("seller", None, 1);
        let prop = property("100000", Some(seller.id));
        let prop_id = prop.id;

        store.insert_person(seller).await.unwrap();
        store.insert_property(prop).await.unwrap();

        let ledger = CommissionLedger::new(&store, EngineConfig::default());
        let (_, count) = ledger.calculate_and_commit(prop_id, false).await.unwrap();
        assert_eq!(count, 0);
        assert!(!store.has_commissions_for(prop_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_history_carries_basis() {
        let store = MemoryStore::new();
        let root = person("root", None, 1);
        let seller = person("seller", Some(root.id), 2);
        let prop = property("200000", Some(seller.id));
        let prop_id = prop.id;

        store.insert_person(root.clone()).await.unwrap();
        store.insert_person(seller).await.unwrap();
        store.insert_property(prop).await.unwrap();
        store
            .upsert_level(LevelDoc::new(LevelScope::Referral, 1, dec("3.0")))
            .await
            .unwrap();

        let ledger = CommissionLedger::new(&store, EngineConfig::default());
        ledger.calculate_and_commit(prop_id, false).await.unwrap();

        let history = ledger.history_for(root.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].basis, CommissionBasis::Referral { depth: 1 });
        assert_eq!(history[0].commission_amount, dec("6000"));
    }
}
