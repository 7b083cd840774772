use sqlx::sqlite::{self, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::LedgerError;

const SCHEMA: &str = include_str!("../../../sql/schema.sql");

/// Opens (creating if needed) the trade ledger under `data_folder/sqlitedata`.
pub async fn open_ledger(data_folder: &str) -> Result<SqlitePool, LedgerError> {
    let db_path = format!("{}/sqlitedata", data_folder);
    std::fs::create_dir_all(&db_path)?;
    let db_filename = format!("{}/ledger.db", db_path);

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_filename))?
        .create_if_missing(true)
        .journal_mode(sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlite::SqliteSynchronous::Full)
        .busy_timeout(Duration::from_secs(30))
        .statement_cache_capacity(100);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;
    apply_schema(&pool).await?;

    info!("Trade ledger opened at {}", db_filename);
    Ok(pool)
}

/// Private in-memory ledger. A single connection that is never recycled
/// keeps every query on the same database.
pub async fn open_in_memory() -> Result<SqlitePool, LedgerError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    apply_schema(&pool).await?;
    Ok(pool)
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), LedgerError> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
