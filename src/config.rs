//! Configuration for splitledger
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// splitledger - commission manager for multi-level real-estate splits
#[derive(Parser, Debug, Clone)]
#[command(name = "splitledger")]
#[command(about = "Compute and persist multi-level real-estate commissions")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "splitledger")]
    pub mongodb_db: String,

    /// Run against an in-memory store instead of MongoDB
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Offset added to referral chain depth when looking up the
    /// referral level table (historical snapshots disagreed between
    /// depth and depth-1; 0 means depth keys the table directly)
    #[arg(long, env = "REFERRAL_DEPTH_OFFSET", default_value = "0", allow_hyphen_values = true)]
    pub referral_depth_offset: i32,

    /// Disable flat-level splits (referral-chain payouts only)
    #[arg(long, env = "NO_FLAT_SPLIT", default_value = "false")]
    pub no_flat_split: bool,

    /// Disable referral-chain splits (flat-level payouts only)
    #[arg(long, env = "NO_REFERRAL_SPLIT", default_value = "false")]
    pub no_referral_split: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Seed default commission levels for both scopes if none exist
    SeedLevels,
    /// List commission levels for a scope
    Levels {
        /// Level scope: flat or referral
        #[arg(long, default_value = "flat")]
        scope: String,
    },
    /// Set the percentage for one level (creates the level if missing)
    SetLevel {
        #[arg(long, default_value = "flat")]
        scope: String,
        level: u32,
        percentage: String,
    },
    /// Register a person
    AddPerson {
        username: String,
        first_name: String,
        last_name: String,
        email: String,
        #[arg(long)]
        phone: Option<String>,
        /// Username of the referrer, if any
        #[arg(long)]
        referred_by: Option<String>,
    },
    /// List people with their referral levels
    People,
    /// Show the referral chain for a person (by username)
    Chain { username: String },
    /// Register a property
    AddProperty {
        name: String,
        /// Price, e.g. 500000 or 499999.99
        price: String,
        /// residential, commercial, industrial, land or luxury
        property_type: String,
        #[arg(long, default_value = "")]
        address: String,
        /// Username of the seller, if known
        #[arg(long)]
        sold_by: Option<String>,
    },
    /// List properties
    Properties,
    /// Assign a person to a flat commission level
    Assign { username: String, level: u32 },
    /// Compute a commission preview for a property (no persistence)
    Preview {
        property_id: Uuid,
        /// Emit the event as JSON instead of the table
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// Compute and persist commissions for a property
    Commit {
        property_id: Uuid,
        /// Commit even if the property already has commissions
        #[arg(long, default_value = "false")]
        force: bool,
    },
    /// Total commissions earned by a person (by username)
    Total { username: String },
    /// Chronological commission history for a person (by username)
    History { username: String },
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.no_flat_split && self.no_referral_split {
            return Err("Both split modes are disabled; nothing to compute".to_string());
        }
        if self.referral_depth_offset < -1 || self.referral_depth_offset > 1 {
            return Err("REFERRAL_DEPTH_OFFSET must be -1, 0 or 1".to_string());
        }
        Ok(())
    }
}
