use crate::domain::account::{Account, AccountId, AccountNumber};
use crate::domain::loan::{Loan, LoanId, LoanStatus};
use crate::domain::ports::{
    AccountStore, BankStore, ChangeSet, LoanStore, Sequence, TransactionStore,
};
use crate::domain::transaction::Transaction;
use crate::error::{BankError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    accounts: BTreeMap<AccountId, Account>,
    numbers: HashMap<AccountNumber, AccountId>,
    loans: BTreeMap<LoanId, Loan>,
    /// Per account, kept sorted newest first.
    transactions: HashMap<AccountId, Vec<Transaction>>,
    sequences: [u64; 3],
}

impl State {
    fn apply(&mut self, changes: ChangeSet) -> Result<()> {
        // Validate before touching anything so a rejected commit leaves no trace.
        for account in &changes.accounts {
            if let Some(owner) = self.numbers.get(&account.number)
                && *owner != account.id
            {
                return Err(BankError::DuplicateAccountNumber(account.number.to_string()));
            }
        }

        for account in changes.accounts {
            if let Some(previous) = self.accounts.get(&account.id)
                && previous.number != account.number
            {
                self.numbers.remove(&previous.number);
            }
            self.numbers.insert(account.number.clone(), account.id);
            self.accounts.insert(account.id, account);
        }
        for loan in changes.loans {
            self.loans.insert(loan.id, loan);
        }
        for tx in changes.transactions {
            let history = self.transactions.entry(tx.account).or_default();
            let pos = history
                .binary_search_by(|probe| Transaction::newest_first(probe, &tx))
                .unwrap_or_else(|pos| pos);
            history.insert(pos, tx);
        }
        for id in changes.removed_accounts {
            if let Some(account) = self.accounts.remove(&id) {
                self.numbers.remove(&account.number);
            }
            self.loans.retain(|_, loan| loan.account != id);
            self.transactions.remove(&id);
        }
        Ok(())
    }
}

/// A thread-safe in-memory store for accounts, loans and the ledger.
///
/// All three collections sit behind one `tokio::sync::RwLock`, so a commit
/// is atomic with respect to every reader.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&id).cloned())
    }

    async fn find_account_by_number(&self, number: &AccountNumber) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .numbers
            .get(number)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.values().cloned().collect())
    }
}

#[async_trait]
impl LoanStore for InMemoryStore {
    async fn get_loan(&self, id: LoanId) -> Result<Option<Loan>> {
        let state = self.state.read().await;
        Ok(state.loans.get(&id).cloned())
    }

    async fn latest_loan(&self, account: AccountId) -> Result<Option<Loan>> {
        let state = self.state.read().await;
        Ok(state
            .loans
            .values()
            .rev()
            .find(|loan| loan.account == account)
            .cloned())
    }

    async fn pending_loans(&self) -> Result<Vec<Loan>> {
        let state = self.state.read().await;
        Ok(state
            .loans
            .values()
            .filter(|loan| loan.status == LoanStatus::Pending)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn transactions(
        &self,
        account: AccountId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .get(&account)
            .map(|history| history.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn count_transactions(&self, account: AccountId) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state.transactions.get(&account).map_or(0, Vec::len))
    }
}

#[async_trait]
impl BankStore for InMemoryStore {
    async fn next_id(&self, sequence: Sequence) -> Result<u64> {
        let mut state = self.state.write().await;
        let slot = &mut state.sequences[sequence as usize];
        *slot += 1;
        Ok(*slot)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut state = self.state.write().await;
        state.apply(changes)
    }
}
