//! Core ledger engine for Paystore.
//!
//! This crate holds the business rules and the transactional orchestration
//! with ZERO web or database dependencies. Storage and caching are reached
//! through the traits in [`ledger::store`] and [`read_model`].
//!
//! # Modules
//!
//! - `ledger` - Organizations, accounts, records, hash chain, ledger service
//! - `auth` - Withdrawal PIN hashing and verification
//! - `read_model` - Snapshot and history cache

pub mod auth;
pub mod ledger;
pub mod read_model;
