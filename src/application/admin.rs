use super::engine::BankEngine;
use crate::domain::account::Account;
use crate::domain::loan::{Loan, LoanDecision, LoanId};
use crate::domain::ports::ChangeSet;
use crate::domain::transaction::TransactionKind;
use crate::error::{BankError, Result};
use tracing::{info, instrument};

/// A loan awaiting review together with the applicant's account.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLoan {
    pub loan: Loan,
    pub account: Account,
}

impl BankEngine {
    pub async fn pending_loans(&self) -> Result<Vec<PendingLoan>> {
        let mut pending = Vec::new();
        for loan in self.store.pending_loans().await? {
            let account = self.load_account(loan.account).await?;
            pending.push(PendingLoan { loan, account });
        }
        Ok(pending)
    }

    /// Accepts or rejects a PENDING loan.
    ///
    /// Acceptance disburses the principal to the account. Rejection frees
    /// the account for a new application. Any other status is left as is.
    #[instrument(skip(self))]
    pub async fn review_loan(&self, loan_id: LoanId, decision: LoanDecision) -> Result<Loan> {
        let account_id = self
            .store
            .get_loan(loan_id)
            .await?
            .ok_or(BankError::LoanNotFound(loan_id))?
            .account;

        let _guard = self.locks.lock(account_id).await;
        let mut loan = self
            .store
            .get_loan(loan_id)
            .await?
            .ok_or(BankError::LoanNotFound(loan_id))?;
        let mut account = self.load_account(account_id).await?;
        loan.decide(decision)?;

        let mut changes = ChangeSet::default();
        match decision {
            LoanDecision::Accept => {
                account.credit(loan.principal)?;
                account.has_open_loan = true;
                let tx = self
                    .ledger
                    .entry(
                        account_id,
                        TransactionKind::LoanDisbursement { loan: loan.id },
                        loan.principal,
                    )
                    .await?;
                changes.transactions.push(tx);
            }
            LoanDecision::Reject => account.has_open_loan = false,
        }
        changes.accounts.push(account);
        changes.loans.push(loan.clone());

        self.store.commit(changes).await?;
        info!(loan = %loan.id, account = %account_id, status = %loan.status, "loan reviewed");
        Ok(loan)
    }
}
