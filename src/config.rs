use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Tunables of the engine. `Default` matches the production bank.
#[derive(Debug, Clone, PartialEq)]
pub struct BankConfig {
    /// Fixed annual interest rate applied to every new loan.
    pub annual_rate: Decimal,
    /// Balance granted to a freshly opened account.
    pub opening_balance: Decimal,
    /// How many records `recent_transactions` returns.
    pub recent_transactions: usize,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            annual_rate: dec!(0.05),
            opening_balance: dec!(300),
            recent_transactions: 5,
        }
    }
}
