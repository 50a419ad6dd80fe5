//! Conversions between entity models and ledger domain types.

use chrono::{DateTime, FixedOffset, Utc};
use paystore_core::auth::AccountPin;
use paystore_core::ledger::{
    AuditEntry, FeePolicy, LedgerAccount, Organization, PaymentStatus, RecordKind, WithdrawalStatus,
};
use paystore_shared::types::{AccountId, OrganizationId, PinId};
use sea_orm::ActiveValue::Set;

use crate::entities::sea_orm_active_enums::{
    FeeType, PaymentStatus as PaymentStatusDb, TransactionType,
    WithdrawalStatus as WithdrawalStatusDb,
};
use crate::entities::{accounts, organizations, pins, transactions};

pub(crate) fn utc(value: DateTime<FixedOffset>) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

pub(crate) fn fixed(value: DateTime<Utc>) -> DateTime<FixedOffset> {
    value.fixed_offset()
}

impl From<PaymentStatus> for PaymentStatusDb {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Pending => Self::Pending,
            PaymentStatus::Paid => Self::Paid,
            PaymentStatus::Failed => Self::Failed,
        }
    }
}

impl From<PaymentStatusDb> for PaymentStatus {
    fn from(status: PaymentStatusDb) -> Self {
        match status {
            PaymentStatusDb::Pending => Self::Pending,
            PaymentStatusDb::Paid => Self::Paid,
            PaymentStatusDb::Failed => Self::Failed,
        }
    }
}

impl From<WithdrawalStatus> for WithdrawalStatusDb {
    fn from(status: WithdrawalStatus) -> Self {
        match status {
            WithdrawalStatus::Pending => Self::Pending,
            WithdrawalStatus::Success => Self::Success,
            WithdrawalStatus::Failed => Self::Failed,
        }
    }
}

impl From<WithdrawalStatusDb> for WithdrawalStatus {
    fn from(status: WithdrawalStatusDb) -> Self {
        match status {
            WithdrawalStatusDb::Pending => Self::Pending,
            WithdrawalStatusDb::Success => Self::Success,
            WithdrawalStatusDb::Failed => Self::Failed,
        }
    }
}

impl From<organizations::Model> for Organization {
    fn from(model: organizations::Model) -> Self {
        let fee_policy = match model.fee_type {
            FeeType::Fixed => FeePolicy::Fixed(model.fee_constant),
            FeeType::Percent => FeePolicy::Percent(model.fee_constant),
        };
        Self {
            id: OrganizationId::from_uuid(model.id),
            name: model.name,
            slug: model.slug,
            fee_policy,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

pub(crate) fn organization_model(organization: &Organization) -> organizations::ActiveModel {
    let fee_type = match organization.fee_policy {
        FeePolicy::Fixed(_) => FeeType::Fixed,
        FeePolicy::Percent(_) => FeeType::Percent,
    };
    organizations::ActiveModel {
        id: Set(organization.id.into_inner()),
        name: Set(organization.name.clone()),
        slug: Set(organization.slug.clone()),
        fee_type: Set(fee_type),
        fee_constant: Set(organization.fee_policy.constant()),
        created_at: Set(fixed(organization.created_at)),
        updated_at: Set(fixed(organization.updated_at)),
    }
}

impl From<accounts::Model> for LedgerAccount {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: AccountId::from_uuid(model.id),
            organization_id: OrganizationId::from_uuid(model.organization_id),
            external_id: model.external_id,
            currency: model.currency,
            balance: model.balance,
            income_accumulation: model.income_accumulation,
            withdraw_accumulation: model.withdraw_accumulation,
            last_receive: model.last_receive.map(utc),
            last_withdraw: model.last_withdraw.map(utc),
            active: model.is_active,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

pub(crate) fn account_model(account: &LedgerAccount) -> accounts::ActiveModel {
    accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        organization_id: Set(account.organization_id.into_inner()),
        external_id: Set(account.external_id.clone()),
        currency: Set(account.currency.clone()),
        balance: Set(account.balance),
        income_accumulation: Set(account.income_accumulation),
        withdraw_accumulation: Set(account.withdraw_accumulation),
        last_receive: Set(account.last_receive.map(fixed)),
        last_withdraw: Set(account.last_withdraw.map(fixed)),
        is_active: Set(account.active),
        created_at: Set(fixed(account.created_at)),
        updated_at: Set(fixed(account.updated_at)),
    }
}

impl From<pins::Model> for AccountPin {
    fn from(model: pins::Model) -> Self {
        Self {
            id: PinId::from_uuid(model.id),
            account_id: AccountId::from_uuid(model.account_id),
            hash: model.hash,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

pub(crate) fn pin_model(pin: &AccountPin) -> pins::ActiveModel {
    pins::ActiveModel {
        id: Set(pin.id.into_inner()),
        account_id: Set(pin.account_id.into_inner()),
        hash: Set(pin.hash.clone()),
        created_at: Set(fixed(pin.created_at)),
        updated_at: Set(fixed(pin.updated_at)),
    }
}

pub(crate) fn audit_model(entry: &AuditEntry) -> transactions::ActiveModel {
    let kind = match entry.kind {
        RecordKind::Payment => TransactionType::Payment,
        RecordKind::Withdraw => TransactionType::Withdraw,
    };
    transactions::ActiveModel {
        id: Set(entry.id.into_inner()),
        kind: Set(kind),
        record_id: Set(entry.record_id.into_inner()),
        account_id: Set(entry.account_id.into_inner()),
        created_at: Set(fixed(entry.created_at)),
    }
}
