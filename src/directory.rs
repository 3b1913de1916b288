//! Person and property administration
//!
//! Write-side guardrails for the directory: unique usernames, derived
//! referral levels, acyclic referrer edits, and price validation. The
//! read side goes straight through the store.

use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::chain::ChainResolver;
use crate::db::schemas::{PersonDoc, PropertyDoc, PropertyType};
use crate::store::CommissionStore;
use crate::types::{LedgerError, Result};

/// Admin operations on people
pub struct PersonDirectory<'a, S: CommissionStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: CommissionStore + ?Sized> PersonDirectory<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create a person.
    ///
    /// `referral_level` is derived, never supplied: 1 for a root, one
    /// more than the referrer otherwise. The referrer must already
    /// exist, so a new person can never close a cycle.
    pub async fn create_person(
        &self,
        username: String,
        first_name: String,
        last_name: String,
        email: String,
        phone: Option<String>,
        referred_by: Option<Uuid>,
    ) -> Result<PersonDoc> {
        if self
            .store
            .get_person_by_username(&username)
            .await?
            .is_some()
        {
            return Err(LedgerError::DuplicateUsername(username));
        }

        let referral_level = match referred_by {
            None => 1,
            Some(referrer_id) => {
                let referrer = self
                    .store
                    .get_person(referrer_id)
                    .await?
                    .ok_or_else(|| LedgerError::not_found("Person", referrer_id))?;
                referrer.referral_level + 1
            }
        };

        let person = PersonDoc::new(
            username,
            first_name,
            last_name,
            email,
            phone,
            referred_by,
            referral_level,
        );
        self.store.insert_person(person.clone()).await?;
        info!("Created person {}", person.display_name());
        Ok(person)
    }

    /// Re-point a person's referrer.
    ///
    /// Rejects any edit that would close a cycle by walking the new
    /// referrer's own chain first. Levels are re-derived for the person
    /// and every descendant.
    pub async fn set_referrer(
        &self,
        person_id: Uuid,
        referred_by: Option<Uuid>,
    ) -> Result<PersonDoc> {
        let mut person = self
            .store
            .get_person(person_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Person", person_id))?;

        let referral_level = match referred_by {
            None => 1,
            Some(referrer_id) => {
                if referrer_id == person_id {
                    return Err(LedgerError::CycleDetected(person_id));
                }
                let referrer = self
                    .store
                    .get_person(referrer_id)
                    .await?
                    .ok_or_else(|| LedgerError::not_found("Person", referrer_id))?;

                // If the person sits anywhere above the new referrer,
                // the edit would close a cycle.
                let chain = ChainResolver::new(self.store).resolve(referrer_id).await?;
                if chain.iter().any(|link| link.person_id == person_id) {
                    return Err(LedgerError::CycleDetected(person_id));
                }
                referrer.referral_level + 1
            }
        };

        person.referred_by = referred_by;
        person.referral_level = referral_level;
        self.store.update_person(person.clone()).await?;
        self.rederive_descendant_levels(&person).await?;

        info!("Updated referrer for {}", person.display_name());
        Ok(person)
    }

    /// Push corrected levels down the subtree rooted at `person`
    async fn rederive_descendant_levels(&self, person: &PersonDoc) -> Result<()> {
        let everyone = self.store.list_people().await?;
        let mut frontier = vec![(person.id, person.referral_level)];

        while let Some((parent_id, parent_level)) = frontier.pop() {
            for child in everyone.iter().filter(|p| p.referred_by == Some(parent_id)) {
                let expected = parent_level + 1;
                if child.referral_level != expected {
                    let mut updated = child.clone();
                    updated.referral_level = expected;
                    self.store.update_person(updated).await?;
                }
                frontier.push((child.id, expected));
            }
        }
        Ok(())
    }
}

/// Admin operations on properties
pub struct PropertyCatalog<'a, S: CommissionStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: CommissionStore + ?Sized> PropertyCatalog<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create a property with a positive price. The seller, when
    /// given, must exist. (The engine still tolerates a zero price in
    /// existing data; only creation insists on a real one.)
    pub async fn create_property(
        &self,
        name: String,
        price: Decimal,
        property_type: PropertyType,
        address: String,
        sold_by: Option<Uuid>,
    ) -> Result<PropertyDoc> {
        if price <= Decimal::ZERO {
            return Err(LedgerError::MissingPropertyOrPrice);
        }

        if let Some(seller_id) = sold_by {
            if self.store.get_person(seller_id).await?.is_none() {
                return Err(LedgerError::not_found("Person", seller_id));
            }
        }

        let property = PropertyDoc::new(name, price, property_type, address, sold_by);
        self.store.insert_property(property.clone()).await?;
        info!("Created property '{}' at {}", property.name, property.price);
        Ok(property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    async fn create(
        dir: &PersonDirectory<'_, MemoryStore>,
        username: &str,
        referred_by: Option<Uuid>,
    ) -> PersonDoc {
        dir.create_person(
            username.to_string(),
            username.to_string(),
            "Test".to_string(),
            format!("{}@example.com", username),
            None,
            referred_by,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_referral_level_is_derived() {
        let store = MemoryStore::new();
        let dir = PersonDirectory::new(&store);

        let root = create(&dir, "root", None).await;
        let child = create(&dir, "child", Some(root.id)).await;
        let grandchild = create(&dir, "grandchild", Some(child.id)).await;

        assert_eq!(root.referral_level, 1);
        assert_eq!(child.referral_level, 2);
        assert_eq!(grandchild.referral_level, 3);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryStore::new();
        let dir = PersonDirectory::new(&store);
        create(&dir, "taken", None).await;

        let err = dir
            .create_person(
                "taken".to_string(),
                "Other".to_string(),
                "Person".to_string(),
                "other@example.com".to_string(),
                None,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateUsername(u) if u == "taken"));
    }

    #[tokio::test]
    async fn test_unknown_referrer_rejected() {
        let store = MemoryStore::new();
        let dir = PersonDirectory::new(&store);

        let err = dir
            .create_person(
                "solo".to_string(),
                "Solo".to_string(),
                "Test".to_string(),
                "solo@example.com".to_string(),
                None,
                Some(Uuid::new_v4()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_referrer_edit_closing_cycle_rejected() {
        let store = MemoryStore::new();
        let dir = PersonDirectory::new(&store);

        let a = create(&dir, "a", None).await;
        let b = create(&dir, "b", Some(a.id)).await;
        let c = create(&dir, "c", Some(b.id)).await;

        // a -> c would make a, b, c a ring
        let err = dir.set_referrer(a.id, Some(c.id)).await.unwrap_err();
        assert!(matches!(err, LedgerError::CycleDetected(id) if id == a.id));

        let err = dir.set_referrer(a.id, Some(a.id)).await.unwrap_err();
        assert!(matches!(err, LedgerError::CycleDetected(id) if id == a.id));
    }

    #[tokio::test]
    async fn test_referrer_edit_rederives_subtree_levels() {
        let store = MemoryStore::new();
        let dir = PersonDirectory::new(&store);

        let root = create(&dir, "root", None).await;
        let mid = create(&dir, "mid", Some(root.id)).await;
        let leaf = create(&dir, "leaf", Some(mid.id)).await;
        assert_eq!(leaf.referral_level, 3);

        // Detach mid; it becomes a root and leaf moves up with it
        dir.set_referrer(mid.id, None).await.unwrap();

        let mid = store.get_person(mid.id).await.unwrap().unwrap();
        let leaf = store.get_person(leaf.id).await.unwrap().unwrap();
        assert_eq!(mid.referral_level, 1);
        assert_eq!(leaf.referral_level, 2);
    }

    #[tokio::test]
    async fn test_non_positive_price_rejected() {
        let store = MemoryStore::new();
        let catalog = PropertyCatalog::new(&store);

        for price in ["-100", "0"] {
            let err = catalog
                .create_property(
                    "Bad".to_string(),
                    dec(price),
                    PropertyType::Land,
                    "2 Main St".to_string(),
                    None,
                )
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::MissingPropertyOrPrice));
        }

        let ok = catalog
            .create_property(
                "House".to_string(),
                dec("100000"),
                PropertyType::Residential,
                "3 Main St".to_string(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(ok.price, dec("100000"));
    }

    #[tokio::test]
    async fn test_property_seller_must_exist() {
        let store = MemoryStore::new();
        let catalog = PropertyCatalog::new(&store);

        let err = catalog
            .create_property(
                "House".to_string(),
                dec("100000"),
                PropertyType::Residential,
                "4 Main St".to_string(),
                Some(Uuid::new_v4()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }
}
