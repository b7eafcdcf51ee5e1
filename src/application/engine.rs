use super::ledger::{Ledger, Page};
use super::locks::AccountLocks;
use crate::config::BankConfig;
use crate::domain::account::{Account, AccountId, AccountNumber, Balance, Holder};
use crate::domain::ports::{BankStoreRef, ChangeSet, Sequence};
use crate::domain::transaction::Transaction;
use crate::error::{BankError, Result};
use tracing::{info, instrument};

/// Attempts at drawing an unused random account number.
const NUMBER_ATTEMPTS: usize = 16;

/// The entry point for every balance-affecting operation.
///
/// `BankEngine` owns the store, the ledger and the per-account lock
/// registry. Each operation loads the records it needs under the account
/// lock, mutates them in memory and persists everything, ledger entries
/// included, with a single [`ChangeSet`] commit.
pub struct BankEngine {
    pub(crate) store: BankStoreRef,
    pub(crate) ledger: Ledger,
    pub(crate) locks: AccountLocks,
    pub(crate) config: BankConfig,
}

impl BankEngine {
    /// Creates a new `BankEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `store` - Persistence for accounts, loans and the ledger.
    /// * `config` - Loan rate, opening balance and history defaults.
    pub fn new(store: BankStoreRef, config: BankConfig) -> Self {
        Self {
            ledger: Ledger::new(store.clone()),
            store,
            locks: AccountLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub(crate) async fn load_account(&self, id: AccountId) -> Result<Account> {
        self.store
            .get_account(id)
            .await?
            .ok_or_else(|| BankError::NotFound(format!("account {id}")))
    }

    /// Opens an account credited with the configured opening balance.
    ///
    /// A random unused number is drawn when `number` is `None`.
    #[instrument(skip(self))]
    pub async fn open_account(
        &self,
        holder: Holder,
        number: Option<AccountNumber>,
    ) -> Result<Account> {
        let number = match number {
            Some(number) => {
                if self.store.find_account_by_number(&number).await?.is_some() {
                    return Err(BankError::DuplicateAccountNumber(number.to_string()));
                }
                number
            }
            None => self.unused_number().await?,
        };
        let balance = Balance::new(self.config.opening_balance)?;
        let id = AccountId(self.store.next_id(Sequence::Account).await?);
        let account = Account::new(id, holder, number, balance);

        self.store
            .commit(ChangeSet {
                accounts: vec![account.clone()],
                ..Default::default()
            })
            .await?;
        info!(account = %account.id, number = %account.number, "account opened");
        Ok(account)
    }

    async fn unused_number(&self) -> Result<AccountNumber> {
        for _ in 0..NUMBER_ATTEMPTS {
            let candidate = AccountNumber::generate(&mut rand::thread_rng());
            if self.store.find_account_by_number(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(BankError::StoreUnavailable(
            "could not draw an unused account number".to_string(),
        ))
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account> {
        self.load_account(id).await
    }

    pub async fn find_account_by_number(&self, number: &str) -> Result<Account> {
        let number = AccountNumber::parse(number)?;
        self.store
            .find_account_by_number(&number)
            .await?
            .ok_or_else(|| BankError::NotFound(format!("account number {number}")))
    }

    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.store.all_accounts().await
    }

    /// Closes an account together with its loans and history.
    ///
    /// Returns the balance left on the account at closure.
    #[instrument(skip(self))]
    pub async fn close_account(&self, id: AccountId) -> Result<Balance> {
        let _guard = self.locks.lock(id).await;
        let account = self.load_account(id).await?;
        if account.has_open_loan {
            return Err(BankError::AccountHasOpenLoan);
        }

        self.store
            .commit(ChangeSet {
                removed_accounts: vec![id],
                ..Default::default()
            })
            .await?;
        info!(account = %id, balance = %account.balance, "account closed");
        Ok(account.balance)
    }

    /// The configured number of most recent transactions.
    pub async fn recent_transactions(&self, account: AccountId) -> Result<Vec<Transaction>> {
        self.ledger
            .last(account, self.config.recent_transactions)
            .await
    }

    pub async fn last_transactions(&self, account: AccountId, n: usize) -> Result<Vec<Transaction>> {
        self.ledger.last(account, n).await
    }

    pub async fn transactions_page(
        &self,
        account: AccountId,
        offset: usize,
        size: usize,
    ) -> Result<Page<Transaction>> {
        self.ledger.page(account, offset, size).await
    }
}
