use crate::domain::account::{AccountId, Amount};
use crate::domain::ports::{BankStoreRef, ChangeSet, Sequence};
use crate::domain::transaction::{Transaction, TransactionId, TransactionKind};
use crate::error::{BankError, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

/// One slice of an account's history, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub offset: usize,
    pub size: usize,
    pub total: usize,
}

/// Append-only record of balance-affecting events.
///
/// Entries are created with [`Ledger::entry`] and committed by the caller in
/// the same [`ChangeSet`] as the balance they explain. [`Ledger::append`]
/// commits a single entry on its own.
#[derive(Clone)]
pub struct Ledger {
    store: BankStoreRef,
}

impl Ledger {
    pub fn new(store: BankStoreRef) -> Self {
        Self { store }
    }

    /// Assigns id and timestamp to a new entry without persisting it.
    pub async fn entry(
        &self,
        account: AccountId,
        kind: TransactionKind,
        amount: Amount,
    ) -> Result<Transaction> {
        let id = TransactionId(self.store.next_id(Sequence::Transaction).await?);
        Ok(Transaction::new(id, account, kind, amount, Utc::now()))
    }

    pub async fn append(
        &self,
        account: AccountId,
        kind: TransactionKind,
        amount: Amount,
    ) -> Result<Transaction> {
        let tx = self.entry(account, kind, amount).await?;
        self.store
            .commit(ChangeSet {
                transactions: vec![tx.clone()],
                ..Default::default()
            })
            .await?;
        debug!(account = %account, tx = %tx.id, "ledger entry appended");
        Ok(tx)
    }

    /// The `n` most recent entries, newest first.
    pub async fn last(&self, account: AccountId, n: usize) -> Result<Vec<Transaction>> {
        self.store.transactions(account, 0, n).await
    }

    /// An offset past the end yields an empty page.
    pub async fn page(
        &self,
        account: AccountId,
        offset: usize,
        size: usize,
    ) -> Result<Page<Transaction>> {
        if size == 0 {
            return Err(BankError::Validation(
                "page size must be positive".to_string(),
            ));
        }
        let items = self.store.transactions(account, offset, size).await?;
        let total = self.store.count_transactions(account).await?;
        Ok(Page {
            items,
            offset,
            size,
            total,
        })
    }
}
