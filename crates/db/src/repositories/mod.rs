//! Store-of-record implementations backed by `PostgreSQL`.
//!
//! [`SeaStore`] implements every store contract of the ledger core. Balance
//! mutations run inside a [`SeaLedgerTx`], which reads account rows with
//! `SELECT ... FOR UPDATE`.

mod account;
mod ledger;
mod mapping;
mod organization;
mod pin;
mod record;

pub use ledger::SeaLedgerTx;

use paystore_core::ledger::StoreError;
use sea_orm::{DatabaseConnection, DbErr, SqlErr};

/// `SeaORM` store of record.
#[derive(Debug, Clone)]
pub struct SeaStore {
    db: DatabaseConnection,
}

impl SeaStore {
    /// Creates a new store.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Maps a database error, keeping uniqueness violations distinguishable.
pub(crate) fn store_error(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::Duplicate(detail),
        _ => StoreError::Backend(err.to_string()),
    }
}
