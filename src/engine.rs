//! Commission calculation engine
//!
//! Pure computation: given a property, the level tables with their
//! rosters, and the seller's referral chain, produce the full batch of
//! shares for one calculation event. No storage access happens here,
//! which is what makes a preview and a commit guaranteed to agree.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::chain::ChainLink;
use crate::db::schemas::{CommissionBasis, LevelDoc, PersonDoc, PropertyDoc};
use crate::types::{LedgerError, Result};

/// Default alignment between chain depth and referral table order:
/// depth d pays from the level with order d.
pub const REFERRAL_DEPTH_OFFSET: i32 = 0;

/// Which halves of the split are active
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitPolicy {
    pub flat: bool,
    pub referral: bool,
}

impl Default for SplitPolicy {
    fn default() -> Self {
        Self {
            flat: true,
            referral: true,
        }
    }
}

/// Engine parameters, fixed for the lifetime of a process
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    pub policy: SplitPolicy,
    /// Added to chain depth before keying the referral table
    pub referral_depth_offset: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: SplitPolicy::default(),
            referral_depth_offset: REFERRAL_DEPTH_OFFSET,
        }
    }
}

/// One computed share within a calculation event
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommissionShare {
    pub person_id: Uuid,
    pub basis: CommissionBasis,
    pub percentage: Decimal,
    pub amount: Decimal,
}

/// The full outcome of one calculation event, before persistence
#[derive(Clone, Debug, Serialize)]
pub struct CommissionPreview {
    pub property_id: Uuid,
    pub seller_id: Uuid,
    pub price: Decimal,
    /// Flat shares first (by level order, then username), then
    /// referral shares by ascending depth
    pub shares: Vec<CommissionShare>,
}

impl CommissionPreview {
    /// Sum of every share in the event
    pub fn total(&self) -> Decimal {
        self.shares.iter().map(|s| s.amount).sum()
    }
}

/// Stateless calculator for commission events
#[derive(Clone, Copy, Debug, Default)]
pub struct CommissionEngine {
    config: EngineConfig,
}

impl CommissionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Compute all shares for one sale.
    ///
    /// `flat_levels` pairs each flat level with its roster; the level
    /// pool is split evenly across the roster. `referral_levels` is
    /// keyed by order against chain depth. Zero percentages and empty
    /// rosters produce no shares; a zero price produces zero-amount
    /// shares (the sale still happened).
    pub fn calculate(
        &self,
        property: &PropertyDoc,
        flat_levels: &[(LevelDoc, Vec<PersonDoc>)],
        referral_levels: &[LevelDoc],
        chain: &[ChainLink],
    ) -> Result<CommissionPreview> {
        if property.price < Decimal::ZERO {
            return Err(LedgerError::MissingPropertyOrPrice);
        }
        let seller_id = property
            .sold_by
            .ok_or(LedgerError::MissingSeller(property.id))?;

        let hundred = Decimal::from(100);
        let mut shares = Vec::new();

        if self.config.policy.flat {
            let mut levels: Vec<&(LevelDoc, Vec<PersonDoc>)> = flat_levels.iter().collect();
            levels.sort_by_key(|(level, _)| level.level_order);

            for (level, roster) in levels {
                if level.commission_percentage.is_zero() || roster.is_empty() {
                    continue;
                }
                let pool = property.price * level.commission_percentage / hundred;
                let per_person = pool / Decimal::from(roster.len() as u64);

                let mut roster: Vec<&PersonDoc> = roster.iter().collect();
                roster.sort_by(|a, b| a.username.cmp(&b.username));
                for person in roster {
                    shares.push(CommissionShare {
                        person_id: person.id,
                        basis: CommissionBasis::Level {
                            level_id: level.id,
                            level_order: level.level_order,
                        },
                        percentage: level.commission_percentage,
                        amount: per_person,
                    });
                }
            }
        }

        if self.config.policy.referral {
            for link in chain {
                let order = link.depth as i32 + self.config.referral_depth_offset;
                if order < 1 {
                    continue;
                }
                let Some(level) = referral_levels
                    .iter()
                    .find(|l| l.level_order == order as u32)
                else {
                    continue;
                };
                if level.commission_percentage.is_zero() {
                    continue;
                }
                shares.push(CommissionShare {
                    person_id: link.person_id,
                    basis: CommissionBasis::Referral { depth: link.depth },
                    percentage: level.commission_percentage,
                    amount: property.price * level.commission_percentage / hundred,
                });
            }
        }

        Ok(CommissionPreview {
            property_id: property.id,
            seller_id,
            price: property.price,
            shares,
        })
    }
}
