#![allow(dead_code)]

use async_trait::async_trait;
use bankcore::application::engine::BankEngine;
use bankcore::config::BankConfig;
use bankcore::domain::account::{Account, AccountId, AccountNumber, Holder};
use bankcore::domain::loan::{Loan, LoanId};
use bankcore::domain::ports::{
    AccountStore, BankStore, BankStoreRef, ChangeSet, LoanStore, Sequence, TransactionStore,
};
use bankcore::domain::transaction::Transaction;
use bankcore::error::{BankError, Result};
use bankcore::infrastructure::in_memory::InMemoryStore;
use std::io::{Error, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const HEADER: &str = "op,account,counterparty,amount,term,detail";

pub fn engine() -> BankEngine {
    BankEngine::new(Arc::new(InMemoryStore::new()), BankConfig::default())
}

pub async fn open(engine: &BankEngine, first: &str, last: &str) -> Account {
    engine
        .open_account(Holder::new(first, last), None)
        .await
        .expect("open account")
}

/// A 26-digit number built from a small index.
pub fn number(n: u64) -> String {
    format!("{n:026}")
}

/// Delegates to an in-memory store but can be told to fail every write
/// or to answer number lookups with stale results.
#[derive(Default, Clone)]
pub struct FlakyStore {
    inner: InMemoryStore,
    down: Arc<AtomicBool>,
    stale_lookups: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// The next `n` number lookups report no account, as if it were not yet opened.
    pub fn hide_next_lookups(&self, n: usize) {
        self.stale_lookups.store(n, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            Err(BankError::StoreUnavailable("store is down".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AccountStore for FlakyStore {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        self.inner.get_account(id).await
    }

    async fn find_account_by_number(&self, number: &AccountNumber) -> Result<Option<Account>> {
        let stale = self
            .stale_lookups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(None);
        }
        self.inner.find_account_by_number(number).await
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        self.inner.all_accounts().await
    }
}

#[async_trait]
impl LoanStore for FlakyStore {
    async fn get_loan(&self, id: LoanId) -> Result<Option<Loan>> {
        self.inner.get_loan(id).await
    }

    async fn latest_loan(&self, account: AccountId) -> Result<Option<Loan>> {
        self.inner.latest_loan(account).await
    }

    async fn pending_loans(&self) -> Result<Vec<Loan>> {
        self.inner.pending_loans().await
    }
}

#[async_trait]
impl TransactionStore for FlakyStore {
    async fn transactions(
        &self,
        account: AccountId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Transaction>> {
        self.inner.transactions(account, offset, limit).await
    }

    async fn count_transactions(&self, account: AccountId) -> Result<usize> {
        self.inner.count_transactions(account).await
    }
}

#[async_trait]
impl BankStore for FlakyStore {
    async fn next_id(&self, sequence: Sequence) -> Result<u64> {
        self.inner.next_id(sequence).await
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        self.check()?;
        self.inner.commit(changes).await
    }
}

pub fn flaky_engine() -> (BankEngine, FlakyStore) {
    let store = FlakyStore::new();
    let shared: BankStoreRef = Arc::new(store.clone());
    (BankEngine::new(shared, BankConfig::default()), store)
}

/// Writes a command CSV with the standard header.
pub fn write_commands(file: &mut impl Write, rows: &[&str]) -> std::result::Result<(), Error> {
    writeln!(file, "{HEADER}")?;
    for row in rows {
        writeln!(file, "{row}")?;
    }
    file.flush()
}

/// `rows` deposits of 1.00 into one account opened on the first line.
pub fn generate_deposits(path: &Path, rows: usize) -> std::result::Result<(), Error> {
    let mut file = std::fs::File::create(path)?;
    let account = number(1);
    writeln!(file, "{HEADER}")?;
    writeln!(file, "open,{account},,,,Jan Kowalski")?;
    for _ in 0..rows {
        writeln!(file, "deposit,{account},,1.00,,")?;
    }
    file.flush()
}
