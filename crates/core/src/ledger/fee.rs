//! Organization fee policies.
//!
//! A fee policy turns a gross amount into the net amount that moves the
//! balance plus the fee recorded alongside it. The two policies are not
//! symmetric: a fixed fee is deducted from the gross amount, a percentage fee
//! is charged on top of it and leaves the net amount equal to the gross.

use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Fee configuration of an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "constant", rename_all = "lowercase")]
pub enum FeePolicy {
    /// A flat fee in minor units, deducted from the gross amount.
    Fixed(i64),
    /// A whole-number percentage of the gross amount, charged on top.
    Percent(i64),
}

/// Result of applying a fee policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBreakdown {
    /// Amount that credits or debits the balance.
    pub net: i64,
    /// Fee recorded with the record.
    pub fee: i64,
}

impl FeePolicy {
    /// Returns the policy type as stored.
    #[must_use]
    pub const fn type_str(&self) -> &'static str {
        match self {
            Self::Fixed(_) => "fixed",
            Self::Percent(_) => "percent",
        }
    }

    /// Returns the configured constant.
    #[must_use]
    pub const fn constant(&self) -> i64 {
        match self {
            Self::Fixed(c) | Self::Percent(c) => *c,
        }
    }

    /// Rebuilds a policy from its stored type and constant.
    pub fn from_parts(fee_type: &str, constant: i64) -> Result<Self, LedgerError> {
        let policy = match fee_type {
            "fixed" => Self::Fixed(constant),
            "percent" => Self::Percent(constant),
            other => {
                return Err(LedgerError::InvalidOrganization(format!(
                    "unknown fee type '{other}'"
                )));
            }
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Checks the constant is usable: non-negative, and at most 100 for a percentage.
    pub fn validate(&self) -> Result<(), LedgerError> {
        match *self {
            Self::Fixed(c) | Self::Percent(c) if c < 0 => Err(LedgerError::InvalidOrganization(
                format!("fee constant must not be negative, got {c}"),
            )),
            Self::Percent(c) if c > 100 => Err(LedgerError::InvalidOrganization(format!(
                "percent fee must be at most 100, got {c}"
            ))),
            _ => Ok(()),
        }
    }

    /// Applies the policy to a gross amount.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `gross` is not positive
    /// - `FeeExceedsAmount` if a fixed fee is not strictly below `gross`
    ///
    /// # Example
    ///
    /// ```
    /// use paystore_core::ledger::FeePolicy;
    ///
    /// let fixed = FeePolicy::Fixed(100).apply(1000).unwrap();
    /// assert_eq!((fixed.net, fixed.fee), (900, 100));
    ///
    /// let percent = FeePolicy::Percent(10).apply(1000).unwrap();
    /// assert_eq!((percent.net, percent.fee), (1000, 100));
    /// ```
    pub fn apply(&self, gross: i64) -> Result<FeeBreakdown, LedgerError> {
        if gross <= 0 {
            return Err(LedgerError::InvalidAmount(gross));
        }

        match *self {
            Self::Fixed(fee) => {
                if gross <= fee {
                    return Err(LedgerError::FeeExceedsAmount { amount: gross, fee });
                }
                Ok(FeeBreakdown {
                    net: gross - fee,
                    fee,
                })
            }
            Self::Percent(percent) => {
                // i128 keeps gross * percent from overflowing; the quotient fits back in i64
                let fee = i64::try_from(i128::from(gross) * i128::from(percent) / 100)
                    .map_err(|_| LedgerError::InvalidAmount(gross))?;
                Ok(FeeBreakdown { net: gross, fee })
            }
        }
    }
}
