//! `SeaORM` entity definitions.

pub mod accounts;
pub mod organizations;
pub mod payments;
pub mod pins;
pub mod sea_orm_active_enums;
pub mod transactions;
pub mod withdrawals;
