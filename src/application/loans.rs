use super::engine::BankEngine;
use crate::domain::account::{AccountId, Amount};
use crate::domain::loan::{Loan, LoanId};
use crate::domain::ports::{ChangeSet, Sequence};
use crate::domain::transaction::TransactionKind;
use crate::error::{BankError, Result};
use rust_decimal::Decimal;
use tracing::{info, instrument};

/// How much a settlement pays.
#[derive(Debug, Clone, Copy)]
enum Settlement {
    Installment,
    Repayment(Amount),
}

impl BankEngine {
    /// The account's most recent loan, whatever its status.
    pub async fn get_loan(&self, account: AccountId) -> Result<Loan> {
        self.store
            .latest_loan(account)
            .await?
            .ok_or_else(|| BankError::NotFound(format!("loan of account {account}")))
    }

    /// Files a PENDING loan application. No funds move until it is accepted.
    #[instrument(skip(self))]
    pub async fn apply_loan(
        &self,
        account: AccountId,
        loan_type: &str,
        amount: Decimal,
        term_months: u32,
    ) -> Result<Loan> {
        let _guard = self.locks.lock(account).await;
        let mut holder = self.load_account(account).await?;
        if holder.has_open_loan {
            return Err(BankError::AlreadyHasLoan);
        }

        let principal = Amount::new(amount)?;
        let id = LoanId(self.store.next_id(Sequence::Loan).await?);
        let loan = Loan::apply(
            id,
            account,
            loan_type,
            principal,
            term_months,
            self.config.annual_rate,
        )?;
        holder.has_open_loan = true;

        self.store
            .commit(ChangeSet {
                accounts: vec![holder],
                loans: vec![loan.clone()],
                ..Default::default()
            })
            .await?;
        info!(
            account = %account,
            loan = %loan.id,
            monthly_rate = %loan.monthly_rate,
            total = %loan.payment_remaining,
            "loan application filed"
        );
        Ok(loan)
    }

    /// Pays the fixed monthly installment of the account's accepted loan.
    #[instrument(skip(self))]
    pub async fn pay_installment(&self, account: AccountId) -> Result<Loan> {
        self.settle(account, Settlement::Installment).await
    }

    /// Pays an arbitrary amount off the account's accepted loan.
    #[instrument(skip(self))]
    pub async fn repay(&self, account: AccountId, amount: Decimal) -> Result<Loan> {
        let amount = Amount::new(amount)?;
        self.settle(account, Settlement::Repayment(amount)).await
    }

    async fn settle(&self, account_id: AccountId, settlement: Settlement) -> Result<Loan> {
        let _guard = self.locks.lock(account_id).await;
        let mut account = self.load_account(account_id).await?;
        let mut loan = self.get_loan(account_id).await?;
        loan.ensure_payable()?;

        let (amount, kind) = match settlement {
            Settlement::Installment => (
                loan.installment()?,
                TransactionKind::MonthlyInstallment { loan: loan.id },
            ),
            Settlement::Repayment(amount) => {
                (amount, TransactionKind::LoanRepayment { loan: loan.id })
            }
        };
        if !account.balance.covers(amount.value()) {
            return Err(BankError::InsufficientFunds {
                balance: account.balance.value(),
                required: amount.value(),
            });
        }

        let paid_off = loan.record_payment(amount)?;
        account.debit(amount)?;
        if paid_off {
            account.has_open_loan = false;
        }
        let tx = self.ledger.entry(account_id, kind, amount).await?;

        self.store
            .commit(ChangeSet {
                accounts: vec![account],
                loans: vec![loan.clone()],
                transactions: vec![tx],
                ..Default::default()
            })
            .await?;
        info!(
            account = %account_id,
            loan = %loan.id,
            amount = %amount,
            remaining = %loan.payment_remaining,
            paid_off,
            "loan payment recorded"
        );
        Ok(loan)
    }
}
