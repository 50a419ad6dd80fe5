//! `SeaORM` active enums mirroring the `PostgreSQL` enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `fee_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "fee_type")]
pub enum FeeType {
    /// Flat fee deducted from the gross amount.
    #[sea_orm(string_value = "fixed")]
    Fixed,
    /// Percentage of the gross amount.
    #[sea_orm(string_value = "percent")]
    Percent,
}

/// `payment_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_status")]
pub enum PaymentStatus {
    /// Awaiting settlement.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Credited.
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Abandoned.
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// `withdrawal_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "withdrawal_status")]
pub enum WithdrawalStatus {
    /// Awaiting settlement.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Debited.
    #[sea_orm(string_value = "success")]
    Success,
    /// Abandoned.
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// `transaction_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_type")]
pub enum TransactionType {
    /// Audit entry of a payment.
    #[sea_orm(string_value = "payment")]
    Payment,
    /// Audit entry of a withdrawal.
    #[sea_orm(string_value = "withdraw")]
    Withdraw,
}
