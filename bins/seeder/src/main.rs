//! Database seeder for Paystore development and testing.
//!
//! Seeds a demo organization with a funded account, a withdrawal PIN, and one
//! record of each kind so the history and verify endpoints have data.
//! Re-running skips whatever already exists.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use paystore_core::ledger::{
    FeePolicy, LedgerAccount, LedgerCaches, LedgerError, LedgerService, LedgerSettings,
    LedgerStores, PaymentStatus, WithdrawalStatus,
};
use paystore_db::{SeaStore, connect};
use paystore_shared::AppConfig;

const DEMO_ORG_SLUG: &str = "demo";
const DEMO_OWNER: &str = "demo-owner";
const DEMO_PIN: &str = "1234";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    println!("Connecting to database...");
    let db = connect(&config.database).await?;
    let service = LedgerService::new(
        LedgerStores::from_backend(Arc::new(SeaStore::new(db))),
        LedgerCaches::in_memory(&config.cache),
        LedgerSettings::from_config(&config.ledger, &config.cache),
    );

    println!("Seeding demo organization...");
    seed_organization(&service).await?;

    println!("Seeding demo account...");
    let Some(account) = seed_account(&service).await? else {
        println!("  Demo account already exists, skipping records...");
        println!("Seeding complete!");
        return Ok(());
    };

    println!("Seeding records...");
    seed_records(&service, &account).await?;

    println!("Seeding complete!");
    Ok(())
}

/// Creates the demo organization with a fixed fee of 100.
async fn seed_organization(service: &LedgerService) -> anyhow::Result<()> {
    match service
        .create_organization("Demo Merchant", DEMO_ORG_SLUG, FeePolicy::Fixed(100))
        .await
    {
        Ok(org) => println!("  Created organization {} ({})", org.slug, org.id),
        Err(LedgerError::DuplicateSlug(_) | LedgerError::DuplicateName(_)) => {
            println!("  Demo organization already exists, skipping...");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Opens the demo account; `None` if it already exists.
async fn seed_account(service: &LedgerService) -> anyhow::Result<Option<LedgerAccount>> {
    match service
        .create_account(DEMO_ORG_SLUG, DEMO_OWNER, "IDR")
        .await
    {
        Ok(account) => {
            println!("  Created account {}", account.id);
            service.set_pin(account.id, DEMO_PIN).await?;
            Ok(Some(account))
        }
        Err(LedgerError::DuplicateAccount(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Funds the account with a paid payment and settles one withdrawal.
async fn seed_records(service: &LedgerService, account: &LedgerAccount) -> anyhow::Result<()> {
    let payment = service
        .create_payment(account.id, 100_000, "seed-invoice-1")
        .await?;
    service
        .finalize_payment(account.id, payment.id, PaymentStatus::Paid)
        .await?;
    println!("  Paid payment {} (net {})", payment.id, payment.amount);

    let withdrawal = service
        .create_withdrawal(account.id, 25_000, "seed-payout-1", DEMO_PIN)
        .await?;
    service
        .finalize_withdrawal(account.id, withdrawal.id, WithdrawalStatus::Success)
        .await?;
    println!(
        "  Settled withdrawal {} (net {})",
        withdrawal.id, withdrawal.amount
    );

    let account = service.account(account.id).await?;
    println!("  Balance is now {}", account.balance);
    Ok(())
}
