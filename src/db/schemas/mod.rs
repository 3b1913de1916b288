//! Database schemas for splitledger
//!
//! Document structures for people, properties, levels, rosters, and
//! the commission ledger.

mod commission;
mod level;
mod metadata;
mod person;
mod property;

pub use commission::{
    CommissionBasis, CommissionDoc, CommissionEventDoc, COMMISSION_COLLECTION,
    COMMISSION_EVENT_COLLECTION,
};
pub use level::{
    LevelAssignmentDoc, LevelDoc, LevelScope, LEVEL_ASSIGNMENT_COLLECTION, LEVEL_COLLECTION,
};
pub use metadata::Metadata;
pub use person::{PersonDoc, PERSON_COLLECTION};
pub use property::{PropertyDoc, PropertyType, PROPERTY_COLLECTION};
