use super::account::{AccountId, Amount};
use crate::error::{BankError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Remaining payment below this is treated as paid off.
pub const PAYOFF_EPSILON: Decimal = dec!(0.01);

/// Scale of the intermediate monthly interest rate.
const MONTHLY_INTEREST_SCALE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoanId(pub u64);

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a loan. Transitions only move forward:
/// PENDING -> ACCEPTED | REJECTED, ACCEPTED -> PAYED_OFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Pending,
    Accepted,
    Rejected,
    PayedOff,
}

impl LoanStatus {
    /// PENDING and ACCEPTED loans block new applications.
    pub fn is_open(self) -> bool {
        matches!(self, LoanStatus::Pending | LoanStatus::Accepted)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoanStatus::Pending => "PENDING",
            LoanStatus::Accepted => "ACCEPTED",
            LoanStatus::Rejected => "REJECTED",
            LoanStatus::PayedOff => "PAYED_OFF",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanDecision {
    Accept,
    Reject,
}

impl FromStr for LoanDecision {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACCEPT" => Ok(LoanDecision::Accept),
            "REJECT" => Ok(LoanDecision::Reject),
            other => Err(BankError::Validation(format!(
                "unknown loan decision {other:?}"
            ))),
        }
    }
}

/// Fixed installment and total to repay for one loan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    pub monthly_rate: Decimal,
    pub total: Decimal,
}

impl Schedule {
    /// Standard annuity formula, installment rounded half-up to cents.
    ///
    /// The total is the flat sum of all installments, not the
    /// interest-adjusted principal.
    pub fn amortize(principal: Amount, annual_rate: Decimal, term_months: u32) -> Result<Self> {
        if term_months == 0 {
            return Err(BankError::Validation(
                "loan term must be at least one month".to_string(),
            ));
        }
        if annual_rate < Decimal::ZERO {
            return Err(BankError::Validation(format!(
                "annual rate cannot be negative, got {annual_rate}"
            )));
        }

        let principal = principal.value();
        let term = Decimal::from(term_months);
        let monthly_interest = (annual_rate / dec!(12))
            .round_dp_with_strategy(MONTHLY_INTEREST_SCALE, RoundingStrategy::MidpointAwayFromZero);

        let raw = if monthly_interest.is_zero() {
            principal / term
        } else {
            let growth = pow(Decimal::ONE + monthly_interest, term_months)?;
            let numerator = principal
                .checked_mul(monthly_interest)
                .and_then(|n| n.checked_mul(growth))
                .ok_or_else(overflow)?;
            numerator
                .checked_div(growth - Decimal::ONE)
                .ok_or_else(overflow)?
        };

        let monthly_rate = raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let total = monthly_rate.checked_mul(term).ok_or_else(overflow)?;
        Ok(Self {
            monthly_rate,
            total,
        })
    }
}

fn pow(base: Decimal, exp: u32) -> Result<Decimal> {
    let mut acc = Decimal::ONE;
    for _ in 0..exp {
        acc = acc.checked_mul(base).ok_or_else(overflow)?;
    }
    Ok(acc)
}

fn overflow() -> BankError {
    BankError::Validation("loan parameters overflow the schedule computation".to_string())
}

/// One amortizing liability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub account: AccountId,
    pub loan_type: String,
    pub status: LoanStatus,
    pub principal: Amount,
    pub term_months: u32,
    /// Fixed monthly installment, set once at application.
    pub monthly_rate: Decimal,
    pub payment_remaining: Decimal,
}

impl Loan {
    /// A new PENDING loan with its schedule computed.
    pub fn apply(
        id: LoanId,
        account: AccountId,
        loan_type: impl Into<String>,
        principal: Amount,
        term_months: u32,
        annual_rate: Decimal,
    ) -> Result<Self> {
        let schedule = Schedule::amortize(principal, annual_rate, term_months)?;
        // A zero installment could never pay the loan off.
        if schedule.monthly_rate.is_zero() {
            return Err(BankError::Validation(format!(
                "principal {principal} over {term_months} months rounds to a zero installment"
            )));
        }
        Ok(Self {
            id,
            account,
            loan_type: loan_type.into(),
            status: LoanStatus::Pending,
            principal,
            term_months,
            monthly_rate: schedule.monthly_rate,
            payment_remaining: schedule.total,
        })
    }

    /// Applies an admin decision to a PENDING loan.
    pub fn decide(&mut self, decision: LoanDecision) -> Result<()> {
        self.expect_status(LoanStatus::Pending)?;
        self.status = match decision {
            LoanDecision::Accept => LoanStatus::Accepted,
            LoanDecision::Reject => LoanStatus::Rejected,
        };
        Ok(())
    }

    pub fn ensure_payable(&self) -> Result<()> {
        if self.status == LoanStatus::Accepted {
            Ok(())
        } else {
            Err(BankError::NotPayable(self.id))
        }
    }

    /// Reduces the remaining payment. Returns `true` if this payment paid the loan off.
    pub fn record_payment(&mut self, amount: Amount) -> Result<bool> {
        self.ensure_payable()?;
        if amount.value() > self.payment_remaining {
            return Err(BankError::OverPayment {
                amount: amount.value(),
                remaining: self.payment_remaining,
            });
        }
        self.payment_remaining -= amount.value();
        if self.payment_remaining < PAYOFF_EPSILON {
            self.status = LoanStatus::PayedOff;
            return Ok(true);
        }
        Ok(false)
    }

    /// The fixed installment as a payable amount.
    pub fn installment(&self) -> Result<Amount> {
        Amount::new(self.monthly_rate)
    }

    fn expect_status(&self, expected: LoanStatus) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(BankError::InvalidState {
                loan: self.id,
                status: self.status,
                expected,
            })
        }
    }
}
