use super::account::{AccountId, Amount};
use super::loan::LoanId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a ledger entry records. Each kind carries only the fields it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TransactionKind {
    Deposit,
    KioskDeposit,
    TransferOut { counterparty: String },
    TransferIn { counterparty: String },
    LoanDisbursement { loan: LoanId },
    MonthlyInstallment { loan: LoanId },
    LoanRepayment { loan: LoanId },
    /// Reserved; nothing posts interest yet.
    Interest,
}

impl TransactionKind {
    /// Human-readable description for an entry of this kind.
    pub fn describe(&self, amount: Amount) -> String {
        match self {
            TransactionKind::Deposit => format!("Deposited {amount}."),
            TransactionKind::KioskDeposit => format!("Deposited {amount} at a kiosk."),
            TransactionKind::TransferOut { counterparty } => {
                format!("Transferred {amount} to {counterparty}.")
            }
            TransactionKind::TransferIn { counterparty } => {
                format!("Received {amount} from {counterparty}.")
            }
            TransactionKind::LoanDisbursement { loan } => {
                format!("Received {amount} from accepted loan {loan}.")
            }
            TransactionKind::MonthlyInstallment { loan } => {
                format!("Paid monthly installment of {amount} on loan {loan}.")
            }
            TransactionKind::LoanRepayment { loan } => {
                format!("Repaid {amount} of loan {loan}.")
            }
            TransactionKind::Interest => format!("Interest of {amount}."),
        }
    }

    pub fn counterparty(&self) -> Option<&str> {
        match self {
            TransactionKind::TransferOut { counterparty }
            | TransactionKind::TransferIn { counterparty } => Some(counterparty),
            _ => None,
        }
    }
}

/// Immutable audit record of one balance-affecting event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account: AccountId,
    #[serde(flatten)]
    pub kind: TransactionKind,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

impl Transaction {
    pub fn new(
        id: TransactionId,
        account: AccountId,
        kind: TransactionKind,
        amount: Amount,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let description = kind.describe(amount);
        Self {
            id,
            account,
            kind,
            amount,
            timestamp,
            description,
        }
    }

    /// History order: newest first, later ids first on equal timestamps.
    pub fn newest_first(a: &Transaction, b: &Transaction) -> std::cmp::Ordering {
        b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id))
    }
}
