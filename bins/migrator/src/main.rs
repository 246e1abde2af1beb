//! Database migration runner for Radbill.
//!
//! Reads `DATABASE_URL` and applies the invoicing schema.
//!
//! Usage:
//!   migrator up      - Create the client, group, invoice and transaction tables
//!   migrator down    - Drop them again
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations

use radbill_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Run the migrator CLI (it sets up its own tracing)
    cli::run_cli(Migrator).await;
}
