//! Application layer containing the core business logic orchestration.
//!
//! `BankEngine` is the primary entry point. Its operations are split by
//! concern across the sibling modules; every one of them serializes on the
//! affected accounts through [`locks::AccountLocks`] and persists its effects
//! with a single atomic commit.

pub mod admin;
pub mod engine;
pub mod ledger;
pub mod loans;
pub mod locks;
pub mod transfers;
