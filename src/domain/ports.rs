use super::account::{Account, AccountId, AccountNumber};
use super::loan::{Loan, LoanId};
use super::transaction::Transaction;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>>;
    async fn find_account_by_number(&self, number: &AccountNumber) -> Result<Option<Account>>;
    async fn all_accounts(&self) -> Result<Vec<Account>>;
}

#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn get_loan(&self, id: LoanId) -> Result<Option<Loan>>;
    /// The most recently created loan of the account.
    async fn latest_loan(&self, account: AccountId) -> Result<Option<Loan>>;
    async fn pending_loans(&self) -> Result<Vec<Loan>>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Newest first, skipping `offset` and returning at most `limit` records.
    async fn transactions(
        &self,
        account: AccountId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Transaction>>;
    async fn count_transactions(&self, account: AccountId) -> Result<usize>;
}

/// Id sequences handed out by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    Account,
    Loan,
    Transaction,
}

/// Writes that must become visible together or not at all.
#[derive(Debug, Default, Clone)]
pub struct ChangeSet {
    pub accounts: Vec<Account>,
    pub loans: Vec<Loan>,
    pub transactions: Vec<Transaction>,
    /// Removed together with their loans and transactions.
    pub removed_accounts: Vec<AccountId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
            && self.loans.is_empty()
            && self.transactions.is_empty()
            && self.removed_accounts.is_empty()
    }
}

#[async_trait]
pub trait BankStore: AccountStore + LoanStore + TransactionStore {
    async fn next_id(&self, sequence: Sequence) -> Result<u64>;
    /// Applies the whole change set atomically.
    async fn commit(&self, changes: ChangeSet) -> Result<()>;
}

pub type BankStoreRef = Arc<dyn BankStore>;

/// Maps a caller credential to the account it acts on.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, credential: &str) -> Result<AccountId>;
}
