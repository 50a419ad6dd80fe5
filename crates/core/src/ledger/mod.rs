//! Multi-tenant balance ledger.
//!
//! This module implements:
//! - Organizations and their fee policies
//! - Balance accounts with credit and debit rules
//! - Payment and withdrawal records with a per-account hash chain
//! - Store-of-record contracts and the transactional ledger service

pub mod account;
pub mod audit;
pub mod chain;
pub mod error;
pub mod fee;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod organization;
pub mod record;
pub mod service;
pub mod store;

#[cfg(test)]
mod service_props;

pub use account::LedgerAccount;
pub use audit::AuditEntry;
pub use chain::ChainError;
pub use error::{ErrorKind, LedgerError};
pub use fee::{FeeBreakdown, FeePolicy};
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryLedger;
pub use organization::Organization;
pub use record::{
    LedgerRecord, Payment, PaymentStatus, RecordKind, RecordStatus, Withdrawal, WithdrawalStatus,
};
pub use service::{ChainReport, LedgerCaches, LedgerService, LedgerSettings, LedgerStores};
pub use store::{
    AccountStore, HistoryScope, LedgerStore, LedgerTx, OrganizationStore, PinStore, RecordStore,
    StoreError,
};
