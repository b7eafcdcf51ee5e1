use crate::application::engine::BankEngine;
use crate::application::transfers::DepositChannel;
use crate::domain::account::{AccountNumber, Holder};
use crate::domain::loan::LoanDecision;
use crate::domain::ports::IdentityResolver;
use crate::error::{BankError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Open,
    Deposit,
    KioskDeposit,
    Transfer,
    Apply,
    Review,
    Pay,
    Repay,
    Close,
}

/// One CSV row: `op,account,counterparty,amount,term,detail`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub op: Operation,
    pub account: String,
    pub counterparty: Option<String>,
    pub amount: Option<Decimal>,
    pub term: Option<u32>,
    pub detail: Option<String>,
}

/// A validated banking command. `account` is the caller's credential.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open { number: AccountNumber, holder: Holder },
    Deposit { account: String, amount: Decimal, channel: DepositChannel },
    Transfer { account: String, destination: String, amount: Decimal },
    Apply { account: String, loan_type: String, amount: Decimal, term: u32 },
    Review { account: String, decision: LoanDecision },
    Pay { account: String },
    Repay { account: String, amount: Decimal },
    Close { account: String },
}

fn required<T>(value: Option<T>, field: &str, op: Operation) -> Result<T> {
    value.ok_or_else(|| BankError::Validation(format!("{op:?} requires {field}")))
}

impl TryFrom<CommandRecord> for Command {
    type Error = BankError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        let op = record.op;
        let account = record.account;
        Ok(match op {
            Operation::Open => Command::Open {
                number: AccountNumber::parse(&account)?,
                holder: Holder::from_full_name(&required(record.detail, "detail", op)?),
            },
            Operation::Deposit | Operation::KioskDeposit => Command::Deposit {
                account,
                amount: required(record.amount, "amount", op)?,
                channel: if op == Operation::Deposit {
                    DepositChannel::Direct
                } else {
                    DepositChannel::Kiosk
                },
            },
            Operation::Transfer => Command::Transfer {
                account,
                destination: required(record.counterparty, "counterparty", op)?,
                amount: required(record.amount, "amount", op)?,
            },
            Operation::Apply => Command::Apply {
                account,
                loan_type: record.detail.unwrap_or_else(|| "cash".to_string()),
                amount: required(record.amount, "amount", op)?,
                term: required(record.term, "term", op)?,
            },
            Operation::Review => Command::Review {
                account,
                decision: required(record.detail, "detail", op)?.parse()?,
            },
            Operation::Pay => Command::Pay { account },
            Operation::Repay => Command::Repay {
                account,
                amount: required(record.amount, "amount", op)?,
            },
            Operation::Close => Command::Close { account },
        })
    }
}

impl Command {
    /// Runs the command against the engine, resolving the caller first.
    pub async fn execute(self, engine: &BankEngine, identity: &dyn IdentityResolver) -> Result<()> {
        match self {
            Command::Open { number, holder } => {
                engine.open_account(holder, Some(number)).await?;
            }
            Command::Deposit {
                account,
                amount,
                channel,
            } => {
                let id = identity.resolve(&account).await?;
                engine.deposit(id, amount, channel).await?;
            }
            Command::Transfer {
                account,
                destination,
                amount,
            } => {
                let id = identity.resolve(&account).await?;
                engine.transfer(id, &destination, amount).await?;
            }
            Command::Apply {
                account,
                loan_type,
                amount,
                term,
            } => {
                let id = identity.resolve(&account).await?;
                engine.apply_loan(id, &loan_type, amount, term).await?;
            }
            Command::Review { account, decision } => {
                let id = identity.resolve(&account).await?;
                let loan = engine.get_loan(id).await?;
                engine.review_loan(loan.id, decision).await?;
            }
            Command::Pay { account } => {
                let id = identity.resolve(&account).await?;
                engine.pay_installment(id).await?;
            }
            Command::Repay { account, amount } => {
                let id = identity.resolve(&account).await?;
                engine.repay(id, amount).await?;
            }
            Command::Close { account } => {
                let id = identity.resolve(&account).await?;
                engine.close_account(id).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const NUMBER: &str = "12345678901234567890123456";

    fn record(op: Operation) -> CommandRecord {
        CommandRecord {
            op,
            account: NUMBER.to_string(),
            counterparty: None,
            amount: None,
            term: None,
            detail: None,
        }
    }

    #[test]
    fn test_open_needs_holder_name() {
        assert!(matches!(
            Command::try_from(record(Operation::Open)),
            Err(BankError::Validation(_))
        ));
        let mut open = record(Operation::Open);
        open.detail = Some("Jan Kowalski".to_string());
        assert_eq!(
            Command::try_from(open).unwrap(),
            Command::Open {
                number: AccountNumber::parse(NUMBER).unwrap(),
                holder: Holder::new("Jan", "Kowalski"),
            }
        );
    }

    #[test]
    fn test_kiosk_deposit_channel() {
        let mut rec = record(Operation::KioskDeposit);
        rec.amount = Some(dec!(5));
        assert!(matches!(
            Command::try_from(rec).unwrap(),
            Command::Deposit {
                channel: DepositChannel::Kiosk,
                ..
            }
        ));
    }

    #[test]
    fn test_review_parses_decision() {
        let mut rec = record(Operation::Review);
        rec.detail = Some("maybe".to_string());
        assert!(Command::try_from(rec.clone()).is_err());
        rec.detail = Some("accept".to_string());
        assert!(matches!(
            Command::try_from(rec).unwrap(),
            Command::Review {
                decision: LoanDecision::Accept,
                ..
            }
        ));
    }

    #[test]
    fn test_apply_requires_term() {
        let mut rec = record(Operation::Apply);
        rec.amount = Some(dec!(1000));
        assert!(matches!(
            Command::try_from(rec),
            Err(BankError::Validation(_))
        ));
    }
}
