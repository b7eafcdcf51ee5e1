use crate::domain::account::{AccountId, AccountNumber};
use crate::domain::ports::{BankStoreRef, IdentityResolver};
use crate::error::{BankError, Result};
use async_trait::async_trait;
use tracing::debug;

/// Treats the account number itself as the caller's credential.
///
/// Used by the batch driver, where every command names the account it acts on.
pub struct AccountNumberIdentity {
    store: BankStoreRef,
}

impl AccountNumberIdentity {
    pub fn new(store: BankStoreRef) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IdentityResolver for AccountNumberIdentity {
    async fn resolve(&self, credential: &str) -> Result<AccountId> {
        let number = AccountNumber::parse(credential.trim()).map_err(|_| BankError::Unauthenticated)?;
        match self.store.find_account_by_number(&number).await? {
            Some(account) => Ok(account.id),
            None => {
                debug!(number = %number, "credential does not match any account");
                Err(BankError::Unauthenticated)
            }
        }
    }
}
