use super::engine::BankEngine;
use crate::domain::account::{AccountId, AccountNumber, Amount, Balance};
use crate::domain::ports::ChangeSet;
use crate::domain::transaction::{Transaction, TransactionKind};
use crate::error::{BankError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

const RESOLVE_ATTEMPTS: usize = 8;

/// Where external funds entered the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositChannel {
    Direct,
    Kiosk,
}

impl DepositChannel {
    fn kind(self) -> TransactionKind {
        match self {
            DepositChannel::Direct => TransactionKind::Deposit,
            DepositChannel::Kiosk => TransactionKind::KioskDeposit,
        }
    }
}

/// Outcome of a transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    /// Source balance after the debit.
    pub balance: Balance,
    pub outgoing: Transaction,
    /// `None` when the destination number is not held at this bank.
    pub incoming: Option<Transaction>,
}

impl BankEngine {
    async fn resolve_number(&self, number: &AccountNumber) -> Result<Option<AccountId>> {
        Ok(self
            .store
            .find_account_by_number(number)
            .await?
            .map(|account| account.id))
    }

    /// Credits external funds and returns the new balance.
    #[instrument(skip(self))]
    pub async fn deposit(
        &self,
        account_id: AccountId,
        amount: Decimal,
        channel: DepositChannel,
    ) -> Result<Balance> {
        let amount = Amount::new(amount)?;
        let _guard = self.locks.lock(account_id).await;
        let mut account = self.load_account(account_id).await?;

        let balance = account.credit(amount)?;
        let tx = self.ledger.entry(account_id, channel.kind(), amount).await?;
        self.store
            .commit(ChangeSet {
                accounts: vec![account],
                transactions: vec![tx],
                ..Default::default()
            })
            .await?;
        info!(account = %account_id, amount = %amount, ?channel, "deposit recorded");
        Ok(balance)
    }

    /// Moves funds to another account by number.
    ///
    /// The source is always debited. The destination is credited only if the
    /// number belongs to an account of this bank; otherwise the money leaves
    /// the system and only the outgoing entry is written.
    #[instrument(skip(self))]
    pub async fn transfer(
        &self,
        source_id: AccountId,
        destination: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt> {
        let amount = Amount::new(amount)?;
        let snapshot = self.load_account(source_id).await?;
        if !snapshot.balance.covers(amount.value()) {
            return Err(BankError::InsufficientFunds {
                balance: snapshot.balance.value(),
                required: amount.value(),
            });
        }
        let number = AccountNumber::parse(destination)?;

        // The number may be opened or closed between the lookup and the lock,
        // so it is resolved again once the accounts are held.
        let mut attempts = 0;
        let (_guard, mut destination) = loop {
            let destination_id = self.resolve_number(&number).await?;
            if destination_id == Some(source_id) {
                return Err(BankError::Validation(
                    "cannot transfer to the source account".to_string(),
                ));
            }
            let locked: Vec<AccountId> =
                std::iter::once(source_id).chain(destination_id).collect();
            let guard = self.locks.lock_all(&locked).await;

            let current = self.store.find_account_by_number(&number).await?;
            if current.as_ref().map(|account| account.id) == destination_id {
                break (guard, current);
            }
            attempts += 1;
            if attempts == RESOLVE_ATTEMPTS {
                return Err(BankError::StoreUnavailable(format!(
                    "account number {number} kept changing owner during transfer"
                )));
            }
            debug!(
                source = %source_id,
                destination = %number,
                "destination changed before lock, retrying"
            );
        };

        let mut source = self.load_account(source_id).await?;
        let balance = source.debit(amount)?;

        let mut changes = ChangeSet::default();
        let incoming = match destination.as_mut() {
            Some(dest) => {
                dest.credit(amount)?;
                let tx = self
                    .ledger
                    .entry(
                        dest.id,
                        TransactionKind::TransferIn {
                            counterparty: source.label(),
                        },
                        amount,
                    )
                    .await?;
                changes.transactions.push(tx.clone());
                Some(tx)
            }
            None => None,
        };
        let counterparty = match &destination {
            Some(dest) => dest.label(),
            None => format!("account number: {number}"),
        };
        let outgoing = self
            .ledger
            .entry(source_id, TransactionKind::TransferOut { counterparty }, amount)
            .await?;
        changes.transactions.push(outgoing.clone());
        changes.accounts.push(source);
        changes.accounts.extend(destination);

        self.store.commit(changes).await?;
        match &incoming {
            Some(tx) => info!(
                source = %source_id,
                destination = %tx.account,
                amount = %amount,
                "internal transfer recorded"
            ),
            None => warn!(
                source = %source_id,
                destination = %number,
                amount = %amount,
                "transfer to an account outside the bank; funds left the system"
            ),
        }
        Ok(TransferReceipt {
            balance,
            outgoing,
            incoming,
        })
    }
}
