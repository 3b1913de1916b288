//! Splitledger CLI
//!
//! Administers the directory and level tables, and runs commission
//! previews and commits against MongoDB (or the in-memory store in
//! dev mode).

use anyhow::{anyhow, Context};
use clap::Parser;
use rust_decimal::Decimal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use splitledger::chain::ChainResolver;
use splitledger::config::{Args, Command};
use splitledger::db::schemas::{CommissionBasis, LevelScope, PersonDoc, PropertyType};
use splitledger::db::MongoClient;
use splitledger::directory::{PersonDirectory, PropertyCatalog};
use splitledger::engine::{CommissionPreview, EngineConfig, SplitPolicy};
use splitledger::ledger::CommissionLedger;
use splitledger::levels::LevelTable;
use splitledger::money;
use splitledger::store::{CommissionStore, MemoryStore, MongoStore};
use splitledger::types::LedgerError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("splitledger={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let store: Box<dyn CommissionStore> = if args.dev_mode {
        info!("Dev mode: using in-memory store");
        Box::new(MemoryStore::new())
    } else {
        let client = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
        Box::new(MongoStore::new(client).await?)
    };

    let engine_config = EngineConfig {
        policy: SplitPolicy {
            flat: !args.no_flat_split,
            referral: !args.no_referral_split,
        },
        referral_depth_offset: args.referral_depth_offset,
    };

    if let Err(err) = run_command(args.command, store.as_ref(), engine_config).await {
        if let Some(ledger_err) = err.downcast_ref::<LedgerError>() {
            error!("{}", ledger_err);
            // Caller-correctable input errors exit 2, the rest exit 1
            std::process::exit(if ledger_err.is_validation() { 2 } else { 1 });
        }
        return Err(err);
    }
    Ok(())
}

async fn run_command(
    command: Command,
    store: &dyn CommissionStore,
    engine_config: EngineConfig,
) -> anyhow::Result<()> {
    match command {
        Command::SeedLevels => {
            for scope in [LevelScope::Flat, LevelScope::Referral] {
                let seeded = LevelTable::new(store, scope).seed_defaults().await?;
                if seeded > 0 {
                    println!("Seeded {} default {} level(s)", seeded, scope);
                } else {
                    println!("{} levels already configured; left untouched", scope);
                }
            }
        }

        Command::Levels { scope } => {
            let scope: LevelScope = scope.parse().map_err(|e: String| anyhow!(e))?;
            let levels = LevelTable::new(store, scope).levels().await?;
            if levels.is_empty() {
                println!("No {} levels configured (run seed-levels)", scope);
            }
            for level in levels {
                let origin = if level.seeded { " (seeded)" } else { "" };
                println!(
                    "{}. {} - {}%{}",
                    level.level_order, level.name, level.commission_percentage, origin
                );
            }
        }

        Command::SetLevel {
            scope,
            level,
            percentage,
        } => {
            let scope: LevelScope = scope.parse().map_err(|e: String| anyhow!(e))?;
            let percentage: Decimal = percentage
                .parse()
                .with_context(|| format!("Invalid percentage: {}", percentage))?;
            let updated = LevelTable::new(store, scope)
                .set_percentage(level, percentage)
                .await?;
            println!(
                "{} level {} set to {}%",
                scope, updated.level_order, updated.commission_percentage
            );
        }

        Command::AddPerson {
            username,
            first_name,
            last_name,
            email,
            phone,
            referred_by,
        } => {
            let referrer_id = match referred_by {
                Some(ref referrer) => Some(require_person(store, referrer).await?.id),
                None => None,
            };
            let person = PersonDirectory::new(store)
                .create_person(username, first_name, last_name, email, phone, referrer_id)
                .await?;
            println!(
                "Created {} (id {}, referral level {})",
                person.display_name(),
                person.id,
                person.referral_level
            );
        }

        Command::People => {
            for person in store.list_people().await? {
                let referrer = match person.referred_by {
                    Some(id) => match store.get_person(id).await? {
                        Some(r) => format!(", referred by @{}", r.username),
                        None => String::new(),
                    },
                    None => String::new(),
                };
                println!(
                    "{} - level {}{}",
                    person.display_name(),
                    person.referral_level,
                    referrer
                );
            }
        }

        Command::Chain { username } => {
            let person = require_person(store, &username).await?;
            let chain = ChainResolver::new(store).resolve(person.id).await?;
            if chain.is_empty() {
                println!("@{} has no referrer", person.username);
            }
            for link in chain {
                let name = person_label(store, link.person_id).await?;
                println!("depth {}: {}", link.depth, name);
            }
        }

        Command::AddProperty {
            name,
            price,
            property_type,
            address,
            sold_by,
        } => {
            let price: Decimal = price
                .parse()
                .with_context(|| format!("Invalid price: {}", price))?;
            let property_type: PropertyType =
                property_type.parse().map_err(|e: String| anyhow!(e))?;
            let seller_id = match sold_by {
                Some(ref seller) => Some(require_person(store, seller).await?.id),
                None => None,
            };
            let property = PropertyCatalog::new(store)
                .create_property(name, price, property_type, address, seller_id)
                .await?;
            println!(
                "Created '{}' at {} (id {})",
                property.name,
                money::display(property.price),
                property.id
            );
        }

        Command::Properties => {
            for property in store.list_properties().await? {
                let seller = match property.sold_by {
                    Some(id) => format!(", sold by {}", person_label(store, id).await?),
                    None => String::new(),
                };
                println!(
                    "{} [{}] - {} ({}){}",
                    property.name,
                    property.property_type,
                    money::display(property.price),
                    property.id,
                    seller
                );
            }
        }

        Command::Assign { username, level } => {
            let person = require_person(store, &username).await?;
            let levels = LevelTable::new(store, LevelScope::Flat).levels().await?;
            let level_doc = levels
                .into_iter()
                .find(|l| l.level_order == level)
                .ok_or_else(|| {
                    anyhow!("No flat level {} configured (run seed-levels or set-level)", level)
                })?;
            store.assign_to_level(level_doc.id, person.id).await?;
            println!("Assigned @{} to {}", person.username, level_doc.name);
        }

        Command::Preview { property_id, json } => {
            let ledger = CommissionLedger::new(store, engine_config);
            let preview = ledger.preview(property_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&preview)?);
            } else {
                print_preview(store, &preview).await?;
            }
        }

        Command::Commit { property_id, force } => {
            let ledger = CommissionLedger::new(store, engine_config);
            let (preview, count) = ledger.calculate_and_commit(property_id, force).await?;
            print_preview(store, &preview).await?;
            println!("Committed {} record(s)", count);
        }

        Command::Total { username } => {
            let person = require_person(store, &username).await?;
            let ledger = CommissionLedger::new(store, engine_config);
            let total = ledger.total_for(person.id).await?;
            println!("{}: {}", person.display_name(), money::display(total));
        }

        Command::History { username } => {
            let person = require_person(store, &username).await?;
            let ledger = CommissionLedger::new(store, engine_config);
            let records = ledger.history_for(person.id).await?;
            if records.is_empty() {
                println!("No commissions recorded for @{}", person.username);
            }
            for record in records {
                println!(
                    "{} - {} ({}%, {}) property {}",
                    record.calculated_at.format("%Y-%m-%d %H:%M UTC"),
                    money::display(record.commission_amount),
                    record.commission_percentage,
                    basis_label(&record.basis),
                    record.property_id
                );
            }
        }
    }

    Ok(())
}

async fn require_person(store: &dyn CommissionStore, username: &str) -> anyhow::Result<PersonDoc> {
    store
        .get_person_by_username(username)
        .await?
        .ok_or_else(|| anyhow!("No person with username '{}'", username))
}

async fn person_label(store: &dyn CommissionStore, id: uuid::Uuid) -> anyhow::Result<String> {
    Ok(match store.get_person(id).await? {
        Some(person) => person.display_name(),
        None => id.to_string(),
    })
}

fn basis_label(basis: &CommissionBasis) -> String {
    match basis {
        CommissionBasis::Level { level_order, .. } => format!("flat level {}", level_order),
        CommissionBasis::Referral { depth } => format!("referral depth {}", depth),
    }
}

async fn print_preview(
    store: &dyn CommissionStore,
    preview: &CommissionPreview,
) -> anyhow::Result<()> {
    println!(
        "Commission event for property {} (price {}):",
        preview.property_id,
        money::display(preview.price)
    );
    for share in &preview.shares {
        let name = person_label(store, share.person_id).await?;
        println!(
            "  {} - {} ({}%, {})",
            name,
            money::display(share.amount),
            share.percentage,
            basis_label(&share.basis)
        );
    }
    println!("Total: {}", money::display(preview.total()));
    Ok(())
}
