//! Initial database migration.
//!
//! Creates the enums, ledger tables, indexes, and the append-only trigger on
//! the audit trail.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TENANTS AND ACCOUNTS
        // ============================================================
        db.execute_unprepared(ORGANIZATIONS_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(PINS_SQL).await?;

        // ============================================================
        // PART 3: RECORDS AND AUDIT TRAIL
        // ============================================================
        db.execute_unprepared(PAYMENTS_SQL).await?;
        db.execute_unprepared(WITHDRAWALS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(APPEND_ONLY_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE fee_type AS ENUM ('fixed', 'percent');
CREATE TYPE payment_status AS ENUM ('pending', 'paid', 'failed');
CREATE TYPE withdrawal_status AS ENUM ('pending', 'success', 'failed');
CREATE TYPE transaction_type AS ENUM ('payment', 'withdraw');
";

const ORGANIZATIONS_SQL: &str = r"
CREATE TABLE organizations (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    slug VARCHAR(64) NOT NULL,
    fee_type fee_type NOT NULL DEFAULT 'fixed',
    fee_constant BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT organizations_slug_key UNIQUE (slug),
    CONSTRAINT organizations_name_key UNIQUE (name),
    CONSTRAINT chk_slug_format CHECK (slug ~ '^[a-z0-9-]{3,64}$'),
    CONSTRAINT chk_fee_constant CHECK (fee_constant >= 0),
    CONSTRAINT chk_percent_fee CHECK (fee_type <> 'percent' OR fee_constant <= 100)
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL REFERENCES organizations(id),
    external_id VARCHAR(255) NOT NULL,
    currency CHAR(3) NOT NULL,
    balance BIGINT NOT NULL DEFAULT 0,
    income_accumulation BIGINT NOT NULL DEFAULT 0,
    withdraw_accumulation BIGINT NOT NULL DEFAULT 0,
    last_receive TIMESTAMPTZ,
    last_withdraw TIMESTAMPTZ,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT accounts_organization_external_key UNIQUE (organization_id, external_id),
    CONSTRAINT chk_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT chk_accumulations_non_negative CHECK (
        income_accumulation >= 0 AND withdraw_accumulation >= 0
    )
);

CREATE INDEX idx_accounts_organization ON accounts(organization_id);
";

const PINS_SQL: &str = r"
CREATE TABLE pins (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts(id),
    hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT pins_account_key UNIQUE (account_id)
);
";

const PAYMENTS_SQL: &str = r"
CREATE TABLE payments (
    id UUID PRIMARY KEY,
    rand_id VARCHAR(16) NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    organization_id UUID NOT NULL REFERENCES organizations(id),
    amount BIGINT NOT NULL,
    fees BIGINT NOT NULL,
    balance_before BIGINT NOT NULL,
    balance_after BIGINT NOT NULL,
    vendor_record_id VARCHAR(255) NOT NULL,
    status payment_status NOT NULL DEFAULT 'pending',
    previous_hash VARCHAR(64) NOT NULL DEFAULT '',
    hash VARCHAR(64) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT payments_rand_id_key UNIQUE (rand_id),
    CONSTRAINT chk_payment_amount CHECK (amount > 0 AND fees >= 0)
);

-- History timelines and chain walks
CREATE INDEX idx_payments_account_created ON payments(account_id, created_at DESC, id DESC);
CREATE INDEX idx_payments_organization_created ON payments(organization_id, created_at DESC, id DESC);
";

const WITHDRAWALS_SQL: &str = r"
CREATE TABLE withdrawals (
    id UUID PRIMARY KEY,
    rand_id VARCHAR(16) NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    organization_id UUID NOT NULL REFERENCES organizations(id),
    amount BIGINT NOT NULL,
    fees BIGINT NOT NULL,
    balance_before BIGINT NOT NULL,
    balance_after BIGINT NOT NULL,
    vendor_record_id VARCHAR(255) NOT NULL,
    status withdrawal_status NOT NULL DEFAULT 'pending',
    previous_hash VARCHAR(64) NOT NULL DEFAULT '',
    hash VARCHAR(64) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT withdrawals_rand_id_key UNIQUE (rand_id),
    CONSTRAINT chk_withdrawal_amount CHECK (amount > 0 AND fees >= 0)
);

CREATE INDEX idx_withdrawals_account_created ON withdrawals(account_id, created_at DESC, id DESC);
CREATE INDEX idx_withdrawals_organization_created ON withdrawals(organization_id, created_at DESC, id DESC);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    type transaction_type NOT NULL,
    record_id UUID NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT transactions_record_key UNIQUE (type, record_id)
);

CREATE INDEX idx_transactions_account ON transactions(account_id, created_at DESC);
";

const APPEND_ONLY_SQL: &str = r"
CREATE OR REPLACE FUNCTION reject_transaction_mutation()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'transactions are append-only';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_transactions_append_only
    BEFORE UPDATE OR DELETE ON transactions
    FOR EACH ROW EXECUTE FUNCTION reject_transaction_mutation();
";

const DROP_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_transactions_append_only ON transactions;
DROP FUNCTION IF EXISTS reject_transaction_mutation();
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS withdrawals CASCADE;
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS pins CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS organizations CASCADE;
DROP TYPE IF EXISTS transaction_type;
DROP TYPE IF EXISTS withdrawal_status;
DROP TYPE IF EXISTS payment_status;
DROP TYPE IF EXISTS fee_type;
";
