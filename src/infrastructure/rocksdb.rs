use crate::domain::account::{Account, AccountId, AccountNumber};
use crate::domain::loan::{Loan, LoanId, LoanStatus};
use crate::domain::ports::{
    AccountStore, BankStore, ChangeSet, LoanStore, Sequence, TransactionStore,
};
use crate::domain::transaction::Transaction;
use crate::error::{BankError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for account records, keyed by account id.
pub const CF_ACCOUNTS: &str = "accounts";
/// Unique secondary index: account number to account id.
pub const CF_ACCOUNT_NUMBERS: &str = "account_numbers";
/// Column Family for loan records, keyed by loan id.
pub const CF_LOANS: &str = "loans";
/// Index of loans per account, keyed by (account id, loan id).
pub const CF_ACCOUNT_LOANS: &str = "account_loans";
/// Ledger entries, keyed by (account id, timestamp, transaction id).
pub const CF_TRANSACTIONS: &str = "transactions";
/// Id sequences.
pub const CF_META: &str = "meta";

const COLUMN_FAMILIES: [&str; 6] = [
    CF_ACCOUNTS,
    CF_ACCOUNT_NUMBERS,
    CF_LOANS,
    CF_ACCOUNT_LOANS,
    CF_TRANSACTIONS,
    CF_META,
];

fn sequence_key(sequence: Sequence) -> &'static [u8] {
    match sequence {
        Sequence::Account => b"seq:account",
        Sequence::Loan => b"seq:loan",
        Sequence::Transaction => b"seq:transaction",
    }
}

fn pair_key(a: u64, b: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&a.to_be_bytes());
    key[8..].copy_from_slice(&b.to_be_bytes());
    key
}

/// Sorts by account, then timestamp, then id, so a reverse scan of one
/// account prefix yields the history newest first.
fn transaction_key(tx: &Transaction) -> [u8; 24] {
    let mut key = [0u8; 24];
    key[..8].copy_from_slice(&tx.account.0.to_be_bytes());
    // Flip the sign bit so negative timestamps still order before positive ones.
    let micros = (tx.timestamp.timestamp_micros() as u64) ^ (1 << 63);
    key[8..16].copy_from_slice(&micros.to_be_bytes());
    key[16..].copy_from_slice(&tx.id.0.to_be_bytes());
    key
}

/// A persistent store implementation using RocksDB.
///
/// Every entity lives in its own Column Family and each [`ChangeSet`] is
/// written as a single `WriteBatch`, so a crash never leaves half of an
/// operation on disk.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
/// Commits are serialized so the account-number uniqueness check and the
/// batch that writes the index cannot interleave with another commit.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    /// Last issued id per [`Sequence`]; held while the new value is persisted.
    sequences: Arc<Mutex<[u64; 3]>>,
    writes: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path and restores
    /// the id sequences.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        let meta = db
            .cf_handle(CF_META)
            .ok_or_else(|| BankError::StoreUnavailable(format!("column family {CF_META} not found")))?;
        let mut sequences = [0u64; 3];
        for sequence in [Sequence::Account, Sequence::Loan, Sequence::Transaction] {
            sequences[sequence as usize] = db
                .get_cf(meta, sequence_key(sequence))?
                .map(|bytes| decode_u64(&bytes))
                .transpose()?
                .unwrap_or(0);
        }

        Ok(Self {
            db: Arc::new(db),
            sequences: Arc::new(Mutex::new(sequences)),
            writes: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| BankError::StoreUnavailable(format!("column family {name} not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Keys of `cf` starting with the 8-byte `prefix`, last key first.
    fn prefix_keys_rev(&self, cf: &str, prefix: u64) -> Result<Vec<Box<[u8]>>> {
        let upper = (prefix + 1).to_be_bytes();
        let iter = self
            .db
            .iterator_cf(self.cf(cf)?, IteratorMode::From(&upper, Direction::Reverse));
        let prefix = prefix.to_be_bytes();
        let mut keys = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if key.starts_with(&prefix) {
                keys.push(key);
            } else if key.as_ref() < prefix.as_slice() {
                break;
            }
        }
        Ok(keys)
    }

    fn stage_removal(&self, batch: &mut WriteBatch, id: AccountId) -> Result<()> {
        if let Some(account) = self.get_json::<Account>(CF_ACCOUNTS, &id.0.to_be_bytes())? {
            batch.delete_cf(self.cf(CF_ACCOUNT_NUMBERS)?, account.number.as_str());
        }
        batch.delete_cf(self.cf(CF_ACCOUNTS)?, id.0.to_be_bytes());
        for key in self.prefix_keys_rev(CF_ACCOUNT_LOANS, id.0)? {
            batch.delete_cf(self.cf(CF_LOANS)?, &key[8..]);
            batch.delete_cf(self.cf(CF_ACCOUNT_LOANS)?, &key);
        }
        for key in self.prefix_keys_rev(CF_TRANSACTIONS, id.0)? {
            batch.delete_cf(self.cf(CF_TRANSACTIONS)?, &key);
        }
        Ok(())
    }
}

fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| BankError::StoreUnavailable("corrupt sequence value".to_string()))?;
    Ok(u64::from_be_bytes(array))
}

#[async_trait]
impl AccountStore for RocksDbStore {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        self.get_json(CF_ACCOUNTS, &id.0.to_be_bytes())
    }

    async fn find_account_by_number(&self, number: &AccountNumber) -> Result<Option<Account>> {
        match self.db.get_cf(self.cf(CF_ACCOUNT_NUMBERS)?, number.as_str())? {
            Some(id) => self.get_json(CF_ACCOUNTS, &id),
            None => Ok(None),
        }
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(self.cf(CF_ACCOUNTS)?, IteratorMode::Start) {
            let (_key, value) = item?;
            accounts.push(serde_json::from_slice(&value)?);
        }
        Ok(accounts)
    }
}

#[async_trait]
impl LoanStore for RocksDbStore {
    async fn get_loan(&self, id: LoanId) -> Result<Option<Loan>> {
        self.get_json(CF_LOANS, &id.0.to_be_bytes())
    }

    async fn latest_loan(&self, account: AccountId) -> Result<Option<Loan>> {
        match self.prefix_keys_rev(CF_ACCOUNT_LOANS, account.0)?.first() {
            Some(key) => self.get_json(CF_LOANS, &key[8..]),
            None => Ok(None),
        }
    }

    async fn pending_loans(&self) -> Result<Vec<Loan>> {
        let mut loans = Vec::new();
        for item in self.db.iterator_cf(self.cf(CF_LOANS)?, IteratorMode::Start) {
            let (_key, value) = item?;
            let loan: Loan = serde_json::from_slice(&value)?;
            if loan.status == LoanStatus::Pending {
                loans.push(loan);
            }
        }
        Ok(loans)
    }
}

#[async_trait]
impl TransactionStore for RocksDbStore {
    async fn transactions(
        &self,
        account: AccountId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Transaction>> {
        let upper = (account.0 + 1).to_be_bytes();
        let prefix = account.0.to_be_bytes();
        let iter = self.db.iterator_cf(
            self.cf(CF_TRANSACTIONS)?,
            IteratorMode::From(&upper, Direction::Reverse),
        );

        let mut page = Vec::new();
        let mut skipped = 0;
        for item in iter {
            if page.len() == limit {
                break;
            }
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                if key.as_ref() < prefix.as_slice() {
                    break;
                }
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            page.push(serde_json::from_slice(&value)?);
        }
        Ok(page)
    }

    async fn count_transactions(&self, account: AccountId) -> Result<usize> {
        Ok(self.prefix_keys_rev(CF_TRANSACTIONS, account.0)?.len())
    }
}

#[async_trait]
impl BankStore for RocksDbStore {
    async fn next_id(&self, sequence: Sequence) -> Result<u64> {
        let mut sequences = self.sequences.lock().await;
        let id = sequences[sequence as usize] + 1;
        self.db
            .put_cf(self.cf(CF_META)?, sequence_key(sequence), id.to_be_bytes())?;
        sequences[sequence as usize] = id;
        Ok(id)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let _writes = self.writes.lock().await;
        let mut batch = WriteBatch::default();

        for account in &changes.accounts {
            if let Some(owner) = self.db.get_cf(self.cf(CF_ACCOUNT_NUMBERS)?, account.number.as_str())?
                && decode_u64(&owner)? != account.id.0
            {
                return Err(BankError::DuplicateAccountNumber(account.number.to_string()));
            }
            batch.put_cf(
                self.cf(CF_ACCOUNTS)?,
                account.id.0.to_be_bytes(),
                serde_json::to_vec(account)?,
            );
            batch.put_cf(
                self.cf(CF_ACCOUNT_NUMBERS)?,
                account.number.as_str(),
                account.id.0.to_be_bytes(),
            );
        }
        for loan in &changes.loans {
            batch.put_cf(self.cf(CF_LOANS)?, loan.id.0.to_be_bytes(), serde_json::to_vec(loan)?);
            batch.put_cf(
                self.cf(CF_ACCOUNT_LOANS)?,
                pair_key(loan.account.0, loan.id.0),
                b"",
            );
        }
        for tx in &changes.transactions {
            batch.put_cf(self.cf(CF_TRANSACTIONS)?, transaction_key(tx), serde_json::to_vec(tx)?);
        }
        for id in &changes.removed_accounts {
            self.stage_removal(&mut batch, *id)?;
        }

        self.db.write(batch)?;
        Ok(())
    }
}
