//! Withdrawal authorization.
//!
//! This module provides:
//! - PIN hashing with Argon2id and fixed cost parameters
//! - Constant-time PIN verification

mod pin;

pub use pin::{PinError, hash_pin, validate_pin, verify_pin};

use chrono::{DateTime, Utc};
use paystore_shared::types::{AccountId, PinId};
use serde::{Deserialize, Serialize};

/// Stored PIN of an account. Only the PHC hash is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPin {
    /// PIN ID.
    pub id: PinId,
    /// Account the PIN gates.
    pub account_id: AccountId,
    /// Argon2id PHC string.
    pub hash: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last time the PIN was changed.
    pub updated_at: DateTime<Utc>,
}
