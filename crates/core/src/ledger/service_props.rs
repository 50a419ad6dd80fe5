//! Property-based tests for LedgerService.
//!
//! Random sequences of payments and withdrawals are replayed against the
//! in-memory store and checked against a plain arithmetic model:
//! - Property 1: the balance equals settled credits minus settled debits
//! - Property 2: accumulators only count settled records
//! - Property 3: rejected commands persist nothing
//! - Property 4: both hash chains verify after any sequence

use std::sync::Arc;

use paystore_shared::config::CacheConfig;
use proptest::prelude::*;

use super::error::LedgerError;
use super::fee::FeePolicy;
use super::memory::MemoryLedger;
use super::record::{PaymentStatus, WithdrawalStatus};
use super::service::{LedgerCaches, LedgerService, LedgerSettings, LedgerStores};

const PIN: &str = "1234";

#[derive(Debug, Clone, Copy)]
enum Op {
    Pay { gross: i64, settle: bool },
    Withdraw { gross: i64, settle: bool },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..500, any::<bool>()).prop_map(|(gross, settle)| Op::Pay { gross, settle }),
        (1i64..500, any::<bool>()).prop_map(|(gross, settle)| Op::Withdraw { gross, settle }),
    ]
}

/// What the store should hold after replaying a sequence.
#[derive(Debug, Default)]
struct Model {
    balance: i64,
    income: i64,
    withdrawn: i64,
    payments: usize,
    withdrawals: usize,
}

impl Model {
    fn apply(&mut self, op: Op, fee: i64) -> bool {
        match op {
            Op::Pay { gross, settle } => {
                if gross <= fee {
                    return false;
                }
                self.payments += 1;
                if settle {
                    self.balance += gross - fee;
                    self.income += gross - fee;
                }
                true
            }
            Op::Withdraw { gross, settle } => {
                if gross <= fee || gross - fee > self.balance {
                    return false;
                }
                self.withdrawals += 1;
                if settle {
                    self.balance -= gross - fee;
                    self.withdrawn += gross - fee;
                }
                true
            }
        }
    }
}

async fn replay(fee: i64, ops: &[Op]) -> Result<(), TestCaseError> {
    let store = MemoryLedger::new();
    let service = LedgerService::new(
        LedgerStores::from_backend(Arc::new(store.clone())),
        LedgerCaches::in_memory(&CacheConfig::default()),
        LedgerSettings::default(),
    );
    service
        .create_organization("prop", "prop", FeePolicy::Fixed(fee))
        .await
        .unwrap();
    let account = service.create_account("prop", "owner", "IDR").await.unwrap();
    service.set_pin(account.id, PIN).await.unwrap();

    let mut model = Model::default();
    for &op in ops {
        let accepted = model.apply(op, fee);
        match op {
            Op::Pay { gross, settle } => {
                match service.create_payment(account.id, gross, "v").await {
                    Ok(payment) => {
                        prop_assert!(accepted);
                        let status = if settle {
                            PaymentStatus::Paid
                        } else {
                            PaymentStatus::Failed
                        };
                        service
                            .finalize_payment(account.id, payment.id, status)
                            .await
                            .unwrap();
                    }
                    Err(err) => {
                        prop_assert!(!accepted);
                        let fee_error = matches!(err, LedgerError::FeeExceedsAmount { .. });
                        prop_assert!(fee_error, "unexpected error: {err}");
                    }
                }
            }
            Op::Withdraw { gross, settle } => {
                match service.create_withdrawal(account.id, gross, "v", PIN).await {
                    Ok(withdrawal) => {
                        prop_assert!(accepted);
                        let status = if settle {
                            WithdrawalStatus::Success
                        } else {
                            WithdrawalStatus::Failed
                        };
                        service
                            .finalize_withdrawal(account.id, withdrawal.id, status)
                            .await
                            .unwrap();
                    }
                    Err(err) => {
                        prop_assert!(!accepted);
                        let rejected = matches!(
                            err,
                            LedgerError::FeeExceedsAmount { .. }
                                | LedgerError::InsufficientFunds { .. }
                        );
                        prop_assert!(rejected, "unexpected error: {err}");
                    }
                }
            }
        }
    }

    let stored = service.account(account.id).await.unwrap();
    prop_assert!(stored.balance >= 0);
    prop_assert_eq!(stored.balance, model.balance);
    prop_assert_eq!(stored.income_accumulation, model.income);
    prop_assert_eq!(stored.withdraw_accumulation, model.withdrawn);
    prop_assert_eq!(store.payment_count(), model.payments);
    prop_assert_eq!(store.withdrawal_count(), model.withdrawals);

    let payments = service.verify_payment_chain(account.id).await.unwrap();
    let withdrawals = service.verify_withdrawal_chain(account.id).await.unwrap();
    prop_assert_eq!(payments.records, model.payments);
    prop_assert_eq!(withdrawals.records, model.withdrawals);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// *For any* sequence of commands, the stored account matches the model
    /// and every persisted record sits on a verifiable chain.
    #[test]
    fn prop_ledger_matches_model(
        fee in 0i64..50,
        ops in prop::collection::vec(op_strategy(), 1..8),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(replay(fee, &ops))?;
    }
}
