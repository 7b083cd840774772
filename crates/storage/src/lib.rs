pub mod db;
pub mod repositories;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("Ledger directory could not be created: {0}")]
    Io(#[from] std::io::Error),
    #[error("Ledger row {date} is corrupt: {reason}")]
    Corrupt { date: String, reason: String },
}
