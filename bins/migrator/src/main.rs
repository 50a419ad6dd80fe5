//! Database migration runner for Paystore.
//!
//! Reads `DATABASE_URL`. Usage:
//!   migrator up      - Create the ledger schema
//!   migrator down    - Drop the ledger schema
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations

use sea_orm_migration::prelude::*;
use paystore_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The migrator CLI sets up its own tracing
    cli::run_cli(Migrator).await;
}
