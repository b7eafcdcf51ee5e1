use crate::error::{BankError, Result};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of digits in every account number.
pub const ACCOUNT_NUMBER_LEN: usize = 26;

/// Money is held to whole cents.
pub const MONEY_SCALE: u32 = 2;

/// Stable surrogate identifier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 26-digit account number, unique across the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.len() == ACCOUNT_NUMBER_LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(BankError::InvalidAccountNumber(raw.to_string()))
        }
    }

    /// Draws a fresh random number. Uniqueness is checked by the caller.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let digits = (0..ACCOUNT_NUMBER_LEN)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();
        Self(digits)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = BankError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<AccountNumber> for String {
    fn from(number: AccountNumber) -> Self {
        number.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A non-negative monetary balance.
///
/// Wraps `rust_decimal::Decimal` so that an account can never be observed
/// below zero: the only way down is [`Balance::checked_sub`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Balance(Decimal);

/// A strictly positive monetary amount moved by one operation.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(BankError::Validation(format!(
                "amount must be positive, got {value}"
            )));
        }
        if value.normalize().scale() > MONEY_SCALE {
            return Err(BankError::Validation(format!(
                "amount {value} has more than {MONEY_SCALE} decimal places"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = BankError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self> {
        if value < Decimal::ZERO {
            return Err(BankError::Validation(format!(
                "balance cannot be negative, got {value}"
            )));
        }
        if value.normalize().scale() > MONEY_SCALE {
            return Err(BankError::Validation(format!(
                "balance {value} has more than {MONEY_SCALE} decimal places"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn covers(&self, amount: Decimal) -> bool {
        self.0 >= amount
    }

    /// Returns `None` if the sum does not fit a `Decimal`.
    pub fn checked_add(self, amount: Amount) -> Option<Self> {
        self.0.checked_add(amount.0).map(Self)
    }

    /// Returns `None` instead of going negative.
    pub fn checked_sub(self, amount: Amount) -> Option<Self> {
        if self.covers(amount.0) {
            Some(Self(self.0 - amount.0))
        } else {
            None
        }
    }
}


impl TryFrom<Decimal> for Balance {
    type Error = BankError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Balance> for Decimal {
    fn from(balance: Balance) -> Self {
        balance.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub first_name: String,
    pub last_name: String,
}

impl Holder {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Splits "First Last" on the first whitespace; a single word becomes the first name.
    pub fn from_full_name(full: &str) -> Self {
        let full = full.trim();
        match full.split_once(char::is_whitespace) {
            Some((first, last)) => Self::new(first, last.trim()),
            None => Self::new(full, ""),
        }
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.last_name.is_empty() {
            f.write_str(&self.first_name)
        } else {
            write!(f, "{} {}", self.first_name, self.last_name)
        }
    }
}

/// One customer's funds.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub id: AccountId,
    pub holder: Holder,
    pub number: AccountNumber,
    pub balance: Balance,
    /// Mirrors whether the latest loan is PENDING or ACCEPTED. Always written
    /// in the same commit as the loan status change.
    pub has_open_loan: bool,
}

impl Account {
    pub fn new(id: AccountId, holder: Holder, number: AccountNumber, balance: Balance) -> Self {
        Self {
            id,
            holder,
            number,
            balance,
            has_open_loan: false,
        }
    }

    /// Adds funds and returns the new balance.
    pub fn credit(&mut self, amount: Amount) -> Result<Balance> {
        let balance = self.balance.checked_add(amount).ok_or_else(|| {
            BankError::Validation(format!(
                "crediting {amount} would overflow the balance of account {}",
                self.id
            ))
        })?;
        self.balance = balance;
        Ok(balance)
    }

    /// Removes funds if sufficient and returns the new balance.
    pub fn debit(&mut self, amount: Amount) -> Result<Balance> {
        match self.balance.checked_sub(amount) {
            Some(balance) => {
                self.balance = balance;
                Ok(balance)
            }
            None => Err(BankError::InsufficientFunds {
                balance: self.balance.value(),
                required: amount.value(),
            }),
        }
    }

    /// "First Last, account number: N", used on the other side of a transfer.
    pub fn label(&self) -> String {
        format!("{}, account number: {}", self.holder, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal_macros::dec;

    const NUMBER: &str = "12345678901234567890123456";

    fn account(balance: Decimal) -> Account {
        Account::new(
            AccountId(1),
            Holder::new("Anna", "Nowak"),
            AccountNumber::parse(NUMBER).unwrap(),
            Balance::new(balance).unwrap(),
        )
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(0.01)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(BankError::Validation(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(BankError::Validation(_))
        ));
    }

    #[test]
    fn test_balance_rejects_negative() {
        assert!(Balance::new(dec!(0)).is_ok());
        assert!(Balance::new(dec!(-0.01)).is_err());
    }

    #[test]
    fn test_account_number_parse() {
        assert!(AccountNumber::parse(NUMBER).is_ok());
        assert!(matches!(
            AccountNumber::parse("1234"),
            Err(BankError::InvalidAccountNumber(_))
        ));
        assert!(AccountNumber::parse("1234567890123456789012345a").is_err());
        assert!(AccountNumber::parse("123456789012345678901234567").is_err());
    }

    #[test]
    fn test_generated_number_is_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let number = AccountNumber::generate(&mut rng);
            assert!(AccountNumber::parse(number.as_str()).is_ok());
        }
    }

    #[test]
    fn test_account_number_deserialize_validates() {
        let ok: std::result::Result<AccountNumber, _> =
            serde_json::from_str(&format!("\"{NUMBER}\""));
        assert!(ok.is_ok());
        let bad: std::result::Result<AccountNumber, _> = serde_json::from_str("\"42\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_credit_returns_new_balance() {
        let mut acc = account(dec!(10));
        let balance = acc.credit(Amount::new(dec!(5.50)).unwrap()).unwrap();
        assert_eq!(balance.value(), dec!(15.50));
        assert_eq!(acc.balance, balance);
    }

    #[test]
    fn test_credit_overflow_is_rejected() {
        let mut acc = account(Decimal::MAX - dec!(300));
        let result = acc.credit(Amount::new(dec!(301)).unwrap());
        assert!(matches!(result, Err(BankError::Validation(_))));
        assert_eq!(acc.balance.value(), Decimal::MAX - dec!(300));
    }

    #[test]
    fn test_amount_limited_to_cents() {
        assert!(Amount::new(dec!(0.005)).is_err());
        assert!(Amount::new(dec!(1.2300)).is_ok());
        assert_eq!(Amount::new(dec!(0.01)).unwrap().to_string(), "0.01");
    }

    #[test]
    fn test_debit_insufficient_leaves_balance() {
        let mut acc = account(dec!(10));
        let result = acc.debit(Amount::new(dec!(10.01)).unwrap());
        assert!(matches!(result, Err(BankError::InsufficientFunds { .. })));
        assert_eq!(acc.balance.value(), dec!(10));
    }

    #[test]
    fn test_debit_whole_balance_reaches_zero() {
        let mut acc = account(dec!(10));
        let balance = acc.debit(Amount::new(dec!(10)).unwrap()).unwrap();
        assert_eq!(balance, Balance::ZERO);
    }

    #[test]
    fn test_debit_then_credit_restores_balance() {
        let mut acc = account(dec!(123.45));
        let amount = Amount::new(dec!(23.45)).unwrap();
        acc.debit(amount).unwrap();
        acc.credit(amount).unwrap();
        assert_eq!(acc.balance.value(), dec!(123.45));
    }

    #[test]
    fn test_label_and_holder_parsing() {
        let acc = account(dec!(0));
        assert_eq!(acc.label(), format!("Anna Nowak, account number: {NUMBER}"));
        assert_eq!(Holder::from_full_name(" Jan  Maria Kowalski "), Holder::new("Jan", "Maria Kowalski"));
        assert_eq!(Holder::from_full_name("Cher").to_string(), "Cher");
    }
}
