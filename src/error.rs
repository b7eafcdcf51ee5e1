use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::loan::{LoanId, LoanStatus};

/// Every failure an engine operation can surface to its caller.
///
/// Validation failures leave all state untouched. `StoreUnavailable` is
/// fatal for the operation and is never retried by the engine.
#[derive(Error, Debug)]
pub enum BankError {
    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Decimal, required: Decimal },
    #[error("invalid account number: {0:?}")]
    InvalidAccountNumber(String),
    #[error("account number already in use: {0}")]
    DuplicateAccountNumber(String),
    #[error("account already has an open loan")]
    AlreadyHasLoan,
    #[error("account has an open loan and cannot be closed")]
    AccountHasOpenLoan,
    #[error("loan {0} not found")]
    LoanNotFound(LoanId),
    #[error("loan {loan} is {status}, expected {expected}")]
    InvalidState {
        loan: LoanId,
        status: LoanStatus,
        expected: LoanStatus,
    },
    #[error("loan {0} is not accepted and cannot be paid")]
    NotPayable(LoanId),
    #[error("payment of {amount} exceeds the remaining {remaining}")]
    OverPayment { amount: Decimal, remaining: Decimal },
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("{0} not found")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for BankError {
    fn from(err: rocksdb::Error) -> Self {
        BankError::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for BankError {
    fn from(err: serde_json::Error) -> Self {
        BankError::StoreUnavailable(format!("corrupt record: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, BankError>;
