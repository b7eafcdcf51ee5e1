use crate::domain::account::Account;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct AccountRow<'a> {
    account: &'a str,
    holder: String,
    balance: String,
    open_loan: bool,
}

/// Writes the final state of accounts as CSV.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// One row per account, balances with two decimal places.
    pub fn write_accounts(&mut self, accounts: impl IntoIterator<Item = Account>) -> Result<()> {
        for account in accounts {
            self.writer.serialize(AccountRow {
                account: account.number.as_str(),
                holder: account.holder.to_string(),
                balance: account.balance.to_string(),
                open_loan: account.has_open_loan,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
