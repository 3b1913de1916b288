//! Level table management
//!
//! Reads and edits the per-scope commission tables, and seeds the
//! default tiers into an empty scope. Percentage edits are validated
//! here so an out-of-range value never reaches storage.

use rust_decimal::Decimal;
use tracing::info;

use crate::db::schemas::{LevelDoc, LevelScope};
use crate::store::CommissionStore;
use crate::types::{LedgerError, Result};

/// Default tiers applied to an empty scope: orders 1..=5, with the
/// percentage given in tenths (50 = 5.0%)
pub const DEFAULT_LEVEL_PERCENTAGES: [(u32, i64); 5] =
    [(1, 50), (2, 30), (3, 20), (4, 15), (5, 10)];

fn validate_percentage(percentage: Decimal) -> Result<()> {
    if percentage < Decimal::ZERO || percentage > Decimal::from(100) {
        return Err(LedgerError::InvalidPercentage(percentage));
    }
    Ok(())
}

/// Commission table for one scope
pub struct LevelTable<'a, S: CommissionStore + ?Sized> {
    store: &'a S,
    scope: LevelScope,
}

impl<'a, S: CommissionStore + ?Sized> LevelTable<'a, S> {
    pub fn new(store: &'a S, scope: LevelScope) -> Self {
        Self { store, scope }
    }

    /// All levels in this scope, ascending by order
    pub async fn levels(&self) -> Result<Vec<LevelDoc>> {
        self.store.get_levels(self.scope).await
    }

    /// Percentage configured for an order, if any
    pub async fn percentage_for(&self, level_order: u32) -> Result<Option<Decimal>> {
        let levels = self.levels().await?;
        Ok(levels
            .into_iter()
            .find(|l| l.level_order == level_order)
            .map(|l| l.commission_percentage))
    }

    /// Set the percentage for an order, creating the level if absent.
    ///
    /// Rejects values outside 0..=100 before touching storage, so the
    /// previous value survives a bad edit. Setting the same value
    /// twice is a no-op in effect.
    pub async fn set_percentage(&self, level_order: u32, percentage: Decimal) -> Result<LevelDoc> {
        validate_percentage(percentage)?;

        let existing = self
            .levels()
            .await?
            .into_iter()
            .find(|l| l.level_order == level_order);

        let level = match existing {
            Some(mut level) => {
                level.commission_percentage = percentage;
                level.seeded = false;
                level
            }
            None => LevelDoc::new(self.scope, level_order, percentage),
        };

        self.store.upsert_level(level.clone()).await?;
        info!(
            "Set {} level {} to {}%",
            self.scope, level_order, percentage
        );
        Ok(level)
    }

    /// Seed the default tiers if the scope has no levels yet.
    ///
    /// Returns the number of levels written: zero when the scope was
    /// already populated, making repeated seeding safe.
    pub async fn seed_defaults(&self) -> Result<usize> {
        if !self.levels().await?.is_empty() {
            return Ok(0);
        }

        for (order, tenths) in DEFAULT_LEVEL_PERCENTAGES {
            let mut level = LevelDoc::new(self.scope, order, Decimal::new(tenths, 1));
            level.seeded = true;
            self.store.upsert_level(level).await?;
        }

        info!(
            "Seeded {} default {} levels",
            DEFAULT_LEVEL_PERCENTAGES.len(),
            self.scope
        );
        Ok(DEFAULT_LEVEL_PERCENTAGES.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_seed_defaults_into_empty_scope() {
        let store = MemoryStore::new();
        let table = LevelTable::new(&store, LevelScope::Flat);

        assert_eq!(table.seed_defaults().await.unwrap(), 5);

        let levels = table.levels().await.unwrap();
        assert_eq!(levels.len(), 5);
        assert!(levels.iter().all(|l| l.seeded));
        assert_eq!(levels[0].level_order, 1);
        assert_eq!(levels[0].commission_percentage, dec("5.0"));
        assert_eq!(levels[4].commission_percentage, dec("1.0"));
    }

    #[tokio::test]
    async fn test_seed_skips_populated_scope() {
        let store = MemoryStore::new();
        let table = LevelTable::new(&store, LevelScope::Referral);
        table.set_percentage(1, dec("7.5")).await.unwrap();

        assert_eq!(table.seed_defaults().await.unwrap(), 0);

        let levels = table.levels().await.unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].commission_percentage, dec("7.5"));
    }

    #[tokio::test]
    async fn test_invalid_percentage_leaves_value_unchanged() {
        let store = MemoryStore::new();
        let table = LevelTable::new(&store, LevelScope::Flat);
        table.set_percentage(1, dec("5.0")).await.unwrap();

        let err = table.set_percentage(1, dec("150")).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPercentage(_)));

        let err = table.set_percentage(1, dec("-1")).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPercentage(_)));

        assert_eq!(table.percentage_for(1).await.unwrap(), Some(dec("5.0")));
    }

    #[tokio::test]
    async fn test_edit_clears_seeded_flag() {
        let store = MemoryStore::new();
        let table = LevelTable::new(&store, LevelScope::Flat);
        table.seed_defaults().await.unwrap();

        table.set_percentage(2, dec("4.0")).await.unwrap();

        let levels = table.levels().await.unwrap();
        let edited = levels.iter().find(|l| l.level_order == 2).unwrap();
        assert!(!edited.seeded);
        assert_eq!(edited.commission_percentage, dec("4.0"));
    }

    #[tokio::test]
    async fn test_scopes_are_independent() {
        let store = MemoryStore::new();
        let flat = LevelTable::new(&store, LevelScope::Flat);
        let referral = LevelTable::new(&store, LevelScope::Referral);

        flat.set_percentage(1, dec("5.0")).await.unwrap();
        referral.set_percentage(1, dec("3.0")).await.unwrap();

        assert_eq!(flat.percentage_for(1).await.unwrap(), Some(dec("5.0")));
        assert_eq!(referral.percentage_for(1).await.unwrap(), Some(dec("3.0")));
    }
}
