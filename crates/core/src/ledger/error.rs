//! Ledger error types.
//!
//! Every failure a ledger command can produce, grouped by the category the
//! transport layer uses to pick a status code: not-found, validation,
//! authorization, conflict, integrity, and infrastructure.

use paystore_shared::types::{AccountId, RecordId};
use thiserror::Error;

use super::chain::ChainError;
use super::store::StoreError;
use crate::auth::PinError;

/// Broad category of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced entity does not exist.
    NotFound,
    /// The command violates a business rule; nothing was written.
    Validation,
    /// The caller failed the PIN gate.
    Authorization,
    /// A uniqueness constraint was hit.
    Conflict,
    /// Stored data failed an integrity check.
    Integrity,
    /// The store of record failed or timed out; retrying may succeed.
    Infrastructure,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Not Found Errors ==========
    /// Organization not found (by id or slug).
    #[error("Organization not found: {0}")]
    OrganizationNotFound(String),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Payment not found.
    #[error("Payment not found: {0}")]
    PaymentNotFound(RecordId),

    /// Withdrawal not found.
    #[error("Withdrawal not found: {0}")]
    WithdrawalNotFound(RecordId),

    // ========== Validation Errors ==========
    /// Amount is zero, negative, or overflows an accumulator.
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// A fixed fee would consume the whole amount.
    #[error("Fee {fee} exceeds amount {amount}")]
    FeeExceedsAmount {
        /// Gross amount requested.
        amount: i64,
        /// Fixed fee configured for the organization.
        fee: i64,
    },

    /// Debit larger than the available balance.
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance at the time of the check.
        available: i64,
        /// Amount that was to be debited.
        requested: i64,
    },

    /// The record does not belong to the account named in the command.
    #[error("Record {record} does not belong to account {account}")]
    UnmatchedAccount {
        /// The record that was addressed.
        record: RecordId,
        /// The account named by the caller.
        account: AccountId,
    },

    /// Status change not allowed by the lifecycle.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: &'static str,
        /// Requested status.
        to: &'static str,
    },

    /// Account is deactivated and cannot start new records.
    #[error("Account {0} is inactive")]
    AccountInactive(AccountId),

    /// Organization attributes are malformed.
    #[error("Invalid organization: {0}")]
    InvalidOrganization(String),

    /// Currency code is not three uppercase letters.
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    /// PIN is not 4 to 8 digits.
    #[error("PIN must be 4 to 8 digits")]
    InvalidPin,

    // ========== Authorization Errors ==========
    /// Withdrawal attempted on an account without a PIN.
    #[error("No PIN set for account {0}")]
    PinNotSet(AccountId),

    /// Supplied PIN does not match.
    #[error("PIN does not match")]
    PinMismatch,

    // ========== Conflict Errors ==========
    /// Organization slug already taken.
    #[error("Organization slug already exists: {0}")]
    DuplicateSlug(String),

    /// Organization name already taken.
    #[error("Organization name already exists: {0}")]
    DuplicateName(String),

    /// Account already exists for this owner in the organization.
    #[error("Account already exists for owner {0}")]
    DuplicateAccount(String),

    // ========== Integrity Errors ==========
    /// Hash chain verification failed.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(#[from] ChainError),

    /// Stored PIN hash cannot be parsed.
    #[error("Stored PIN hash has an invalid format")]
    InvalidHashFormat,

    // ========== Infrastructure Errors ==========
    /// Store of record failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Storage transaction exceeded its deadline and was rolled back.
    #[error("Transaction timed out after {0} ms")]
    Timeout(u64),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::OrganizationNotFound(_)
            | Self::AccountNotFound(_)
            | Self::PaymentNotFound(_)
            | Self::WithdrawalNotFound(_) => ErrorKind::NotFound,

            Self::InvalidAmount(_)
            | Self::FeeExceedsAmount { .. }
            | Self::InsufficientFunds { .. }
            | Self::UnmatchedAccount { .. }
            | Self::InvalidTransition { .. }
            | Self::AccountInactive(_)
            | Self::InvalidOrganization(_)
            | Self::InvalidCurrency(_)
            | Self::InvalidPin => ErrorKind::Validation,

            Self::PinNotSet(_) | Self::PinMismatch => ErrorKind::Authorization,

            Self::DuplicateSlug(_) | Self::DuplicateName(_) | Self::DuplicateAccount(_) => {
                ErrorKind::Conflict
            }

            Self::IntegrityViolation(_) | Self::InvalidHashFormat => ErrorKind::Integrity,

            Self::Storage(_) | Self::Timeout(_) | Self::Internal(_) => ErrorKind::Infrastructure,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::OrganizationNotFound(_) => "ORGANIZATION_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::WithdrawalNotFound(_) => "WITHDRAWAL_NOT_FOUND",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::FeeExceedsAmount { .. } => "FEE_EXCEEDS_AMOUNT",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::UnmatchedAccount { .. } => "UNMATCHED_ACCOUNT",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::InvalidOrganization(_) => "INVALID_ORGANIZATION",
            Self::InvalidCurrency(_) => "INVALID_CURRENCY",
            Self::InvalidPin => "INVALID_PIN",
            Self::PinNotSet(_) => "PIN_NOT_SET",
            Self::PinMismatch => "PIN_MISMATCH",
            Self::DuplicateSlug(_) => "DUPLICATE_SLUG",
            Self::DuplicateName(_) => "DUPLICATE_NAME",
            Self::DuplicateAccount(_) => "DUPLICATE_ACCOUNT",
            Self::IntegrityViolation(_) => "INTEGRITY_VIOLATION",
            Self::InvalidHashFormat => "INVALID_HASH_FORMAT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Timeout(_) => "TRANSACTION_TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Validation => 400,
            ErrorKind::Authorization => 403,
            ErrorKind::Conflict => 409,
            ErrorKind::Integrity => 500,
            ErrorKind::Infrastructure => match self {
                Self::Internal(_) => 500,
                _ => 503,
            },
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Timeout(_))
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<PinError> for LedgerError {
    fn from(err: PinError) -> Self {
        match err {
            PinError::InvalidPin => Self::InvalidPin,
            PinError::InvalidHash => Self::InvalidHashFormat,
            PinError::HashError(msg) | PinError::VerifyError(msg) => Self::Internal(msg),
        }
    }
}
