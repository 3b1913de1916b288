//! Referral chain resolution
//!
//! Walks `referred_by` links from a seller outward to the root,
//! producing one [`ChainLink`] per ancestor with its 1-based depth.
//! The walk is bounded by the total person count and fails loudly on
//! a cycle instead of spinning.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::store::CommissionStore;
use crate::types::{LedgerError, Result};

/// One ancestor referrer of a seller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChainLink {
    pub person_id: Uuid,
    /// 1-based distance from the seller
    pub depth: u32,
}

/// Resolves referral chains against the person store
pub struct ChainResolver<'a, S: CommissionStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: CommissionStore + ?Sized> ChainResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolve the referral chain for a seller.
    ///
    /// The seller is never included; a seller with no referrer yields
    /// an empty chain. Pure reads, one person lookup per hop.
    pub async fn resolve(&self, seller_id: Uuid) -> Result<Vec<ChainLink>> {
        let seller = self
            .store
            .get_person(seller_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Person", seller_id))?;

        // Bound guarantees termination even if the acyclicity
        // invariant was violated upstream.
        let max_hops = self.store.count_people().await?;

        let mut chain = Vec::new();
        let mut seen: HashSet<Uuid> = HashSet::new();
        seen.insert(seller_id);

        let mut current = seller.referred_by;
        let mut depth: u32 = 0;

        while let Some(referrer_id) = current {
            if !seen.insert(referrer_id) {
                return Err(LedgerError::CycleDetected(referrer_id));
            }
            if chain.len() as u64 >= max_hops {
                return Err(LedgerError::CycleDetected(referrer_id));
            }

            let referrer = self
                .store
                .get_person(referrer_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("Person", referrer_id))?;

            depth += 1;
            chain.push(ChainLink {
                person_id: referrer_id,
                depth,
            });
            current = referrer.referred_by;
        }

        debug!(
            "Resolved referral chain for {}: {} ancestor(s)",
            seller_id,
            chain.len()
        );
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::PersonDoc;
    use crate::store::MemoryStore;

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

    #[tokio::test]
    async fn test_root_seller_has_empty_chain() {
        let store = MemoryStore::new();
        let root = person("root", None, 1);
        let root_id = root.id;
        store.insert_person(root).await.unwrap();

        let chain = ChainResolver::new(&store).resolve(root_id).await.unwrap();
        assert!(chain.is_empty());
    }

    #[tokio::test]
    async fn test_depth_three_chain_order() {
        let store = MemoryStore::new();
        let d = person("d_root", None, 1);
        let c = person("c", Some(d.id), 2);
        let b = person("b", Some(c.id), 3);
        let a = person("a_seller", Some(b.id), 4);
        let (a_id, b_id, c_id, d_id) = (a.id, b.id, c.id, d.id);
        for p in [d, c, b, a] {
            store.insert_person(p).await.unwrap();
        }

        let chain = ChainResolver::new(&store).resolve(a_id).await.unwrap();
        assert_eq!(
            chain,
            vec![
                ChainLink { person_id: b_id, depth: 1 },
                ChainLink { person_id: c_id, depth: 2 },
                ChainLink { person_id: d_id, depth: 3 },
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let store = MemoryStore::new();
        let root = person("root", None, 1);
        let seller = person("seller", Some(root.id), 2);
        let seller_id = seller.id;
        store.insert_person(root).await.unwrap();
        store.insert_person(seller).await.unwrap();

        let resolver = ChainResolver::new(&store);
        let first = resolver.resolve(seller_id).await.unwrap();
        let second = resolver.resolve(seller_id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_cycle_detected() {
        let store = MemoryStore::new();
        let mut x = person("x", None, 1);
        let mut y = person("y", None, 1);
        let (x_id, y_id) = (x.id, y.id);
        x.referred_by = Some(y_id);
        y.referred_by = Some(x_id);
        store.insert_person(x).await.unwrap();
        store.insert_person(y).await.unwrap();

        let err = ChainResolver::new(&store).resolve(x_id).await.unwrap_err();
        assert!(matches!(err, LedgerError::CycleDetected(id) if id == x_id));
    }

    #[tokio::test]
    async fn test_unknown_seller_is_not_found() {
        let store = MemoryStore::new();
        let err = ChainResolver::new(&store)
            .resolve(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }
}
