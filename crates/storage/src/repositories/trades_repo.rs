use chrono::NaiveDate;
use common::models::LedgerEntry;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, error, warn};

use crate::LedgerError;

const SELECT_COLUMNS: &str = "SELECT date, signal, units, price, take_profit, stop_loss, pnl FROM trades";

#[derive(sqlx::FromRow)]
struct TradeRow {
    date: NaiveDate,
    signal: String,
    units: i64,
    price: f64,
    take_profit: f64,
    stop_loss: f64,
    pnl: Option<f64>,
}

impl TryFrom<TradeRow> for LedgerEntry {
    type Error = LedgerError;

    fn try_from(row: TradeRow) -> Result<Self, Self::Error> {
        let signal = row.signal.parse().map_err(|reason| LedgerError::Corrupt {
            date: row.date.to_string(),
            reason,
        })?;
        Ok(LedgerEntry {
            date: row.date,
            signal,
            units: row.units,
            entry_price: row.price,
            take_profit_price: row.take_profit,
            stop_loss_price: row.stop_loss,
            pnl: row.pnl,
        })
    }
}

fn into_entries(rows: Vec<TradeRow>) -> Result<Vec<LedgerEntry>, LedgerError> {
    rows.into_iter().map(LedgerEntry::try_from).collect()
}

pub struct TradesRepository;

impl TradesRepository {
    /// Whole ledger, oldest first.
    pub async fn load_all(pool: &SqlitePool) -> Result<Vec<LedgerEntry>, LedgerError> {
        let rows = sqlx::query_as::<_, TradeRow>(&format!("{} ORDER BY date", SELECT_COLUMNS))
            .fetch_all(pool)
            .await?;
        into_entries(rows)
    }

    pub async fn unresolved(pool: &SqlitePool) -> Result<Vec<LedgerEntry>, LedgerError> {
        let rows = sqlx::query_as::<_, TradeRow>(&format!(
            "{} WHERE pnl IS NULL ORDER BY date",
            SELECT_COLUMNS
        ))
        .fetch_all(pool)
        .await?;
        into_entries(rows)
    }

    /// The `limit` most recent entries, oldest first.
    pub async fn tail(pool: &SqlitePool, limit: usize) -> Result<Vec<LedgerEntry>, LedgerError> {
        let rows = sqlx::query_as::<_, TradeRow>(&format!(
            "{} ORDER BY date DESC LIMIT ?",
            SELECT_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;
        let mut entries = into_entries(rows)?;
        entries.reverse();
        Ok(entries)
    }

    /// Writes settled PnL values. Rows that already carry a PnL are left
    /// untouched; returns how many rows were actually updated.
    pub async fn record_pnl(
        pool: &SqlitePool,
        settled: &[(NaiveDate, f64)],
    ) -> Result<u64, LedgerError> {
        if settled.is_empty() {
            return Ok(0);
        }

        let mut tx = pool.begin().await?;
        let mut updated = 0;
        for (date, pnl) in settled {
            let result = sqlx::query("UPDATE trades SET pnl = ? WHERE date = ? AND pnl IS NULL")
                .bind(pnl)
                .bind(date)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                warn!("Trade {} was already settled; PnL {} ignored", date, pnl);
            }
            updated += result.rows_affected();
        }
        tx.commit().await?;
        Ok(updated)
    }
}

/// Exclusive write lock on the ledger for one admission decision.
///
/// Holds a `BEGIN IMMEDIATE` transaction so the check for an existing trade,
/// the broker call and the insert behave as one unit even when several
/// processes share the database file. Finish with [`DayLock::append`] or
/// [`DayLock::release`]; dropping it unfinished discards the connection,
/// which rolls the transaction back.
pub struct DayLock {
    conn: Option<PoolConnection<Sqlite>>,
}

impl DayLock {
    pub async fn acquire(pool: &SqlitePool) -> Result<Self, LedgerError> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        debug!("Ledger write lock acquired");
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut SqliteConnection, LedgerError> {
        self.conn
            .as_deref_mut()
            .ok_or(LedgerError::Db(sqlx::Error::PoolClosed))
    }

    pub async fn entries_on(&mut self, date: NaiveDate) -> Result<Vec<LedgerEntry>, LedgerError> {
        let conn = self.conn()?;
        let rows = sqlx::query_as::<_, TradeRow>(&format!("{} WHERE date = ?", SELECT_COLUMNS))
            .bind(date)
            .fetch_all(conn)
            .await?;
        into_entries(rows)
    }

    /// Inserts the entry and commits.
    pub async fn append(mut self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let conn = self.conn()?;
        let inserted = sqlx::query(
            r#"
                INSERT INTO trades (date, signal, units, price, take_profit, stop_loss, pnl)
                VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.date)
        .bind(entry.signal.as_str())
        .bind(entry.units)
        .bind(entry.entry_price)
        .bind(entry.take_profit_price)
        .bind(entry.stop_loss_price)
        .bind(entry.pnl)
        .execute(&mut *conn)
        .await;

        match inserted {
            Ok(_) => self.finish("COMMIT").await,
            Err(e) => {
                error!("Ledger insert for {} failed: {}", entry.date, e);
                self.finish("ROLLBACK").await?;
                Err(e.into())
            }
        }
    }

    /// Ends the transaction without writing anything.
    pub async fn release(self) -> Result<(), LedgerError> {
        self.finish("ROLLBACK").await
    }

    async fn finish(mut self, statement: &str) -> Result<(), LedgerError> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };
        match sqlx::query(statement).execute(&mut *conn).await {
            Ok(_) => Ok(()),
            Err(e) => {
                // Never hand a connection with an open transaction back to the pool.
                drop(conn.detach());
                Err(e.into())
            }
        }
    }
}

impl Drop for DayLock {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            warn!("Ledger write lock dropped unfinished; rolling back");
            drop(conn.detach());
        }
    }
}
