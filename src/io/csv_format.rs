//! CSV format handling for journal rows and ledger output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to journal commands
//! - Account and ledger output serialization
//!
//! All functions are pure (no file I/O) for easy testing.
//!
//! # Journal columns
//!
//! ```text
//! type,client,account,counterparty,amount
//! register,4520111122223333,alice,4165550101,
//! open,4520111122223333,alice-sav,savings,
//! deposit,4520111122223333,alice-sav,,1000
//! transfer,4520111122223333,alice-sav,alice,100
//! send,4520111122223333,alice,4165550102,25
//! loan,4520111122223333,car,,500
//! approve,9000000000000001,car,,
//! repay,,car,,500
//! close,4520111122223333,alice-sav,,
//! ```

use crate::core::processor::{AccountRow, LedgerRow};
use crate::core::validation;
use crate::types::{ClientId, Command, LedgerError, Role};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Every column but `type` is optional: which ones a row needs depends on its
/// type.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub row_type: String,
    pub client: Option<String>,
    pub account: Option<String>,
    pub counterparty: Option<String>,
    pub amount: Option<String>,
}

/// A column that must be present and non-blank
fn required(column: &str, value: &Option<String>, row_type: &str) -> Result<String, LedgerError> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(LedgerError::invalid_request(format!(
            "{} row requires a {} column",
            row_type, column
        ))),
    }
}

fn parse_amount(value: &Option<String>) -> Result<Decimal, LedgerError> {
    let amount = match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => {
            Some(Decimal::from_str(text).map_err(|_| LedgerError::ParseError {
                line: None,
                message: format!("Invalid amount '{}'", text),
            })?)
        }
        _ => None,
    };
    validation::required_amount("amount", amount)
}

/// Render an amount with exactly two decimals, rounding half away from zero
fn money(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// Convert a CsvRecord to a journal Command
///
/// # Arguments
///
/// * `csv_record` - The deserialized CSV record
///
/// # Returns
///
/// Result containing either:
/// - Ok(Command) - Successfully converted row
/// - Err(LedgerError) - Unknown type, missing column or unusable amount
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<Command, LedgerError> {
    let row_type = csv_record.row_type.trim().to_lowercase();
    let client = || required("client", &csv_record.client, &row_type).map(ClientId::new);
    let account = || required("account", &csv_record.account, &row_type);
    let counterparty = || required("counterparty", &csv_record.counterparty, &row_type);
    let amount = || parse_amount(&csv_record.amount);

    let command = match row_type.as_str() {
        "register" | "admin" => Command::Register {
            card: client()?,
            phone: counterparty()?,
            account_key: account()?,
            role: if row_type == "admin" {
                Role::Admin
            } else {
                Role::Client
            },
        },
        "open" => Command::Open {
            card: client()?,
            account_key: account()?,
            account_type: validation::valid_account_type(&counterparty()?)?,
        },
        "deposit" => Command::Deposit {
            card: client()?,
            account_key: account()?,
            amount: amount()?,
        },
        "transfer" => Command::Transfer {
            card: client()?,
            from_key: account()?,
            to_key: counterparty()?,
            amount: amount()?,
        },
        "send" => Command::Send {
            card: client()?,
            account_key: account()?,
            phone: counterparty()?,
            amount: amount()?,
        },
        "loan" => Command::RequestLoan {
            card: client()?,
            loan_key: account()?,
            amount: amount()?,
        },
        "approve" => Command::ApproveLoan {
            admin: client()?,
            loan_key: account()?,
        },
        "deny" => Command::DenyLoan {
            admin: client()?,
            loan_key: account()?,
        },
        "repay" => Command::RepayLoan {
            loan_key: account()?,
            amount: amount()?,
        },
        "close" => Command::Close {
            card: client()?,
            account_key: account()?,
        },
        _ => {
            return Err(LedgerError::ParseError {
                line: None,
                message: format!("Invalid row type: '{}'", csv_record.row_type),
            })
        }
    };
    Ok(command)
}

/// Write account states to CSV format
///
/// Columns: account, client, type, status, balance. Rows are written in the
/// order given (the processor sorts them by key); balances carry two decimals.
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_accounts_csv(accounts: &[AccountRow], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["account", "client", "type", "status", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for row in accounts {
        writer
            .write_record(&[
                row.key.clone(),
                row.account.client_id.to_string(),
                row.account.account_type.to_string(),
                row.account.status.to_string(),
                money(row.account.balance),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write ledger entries to CSV format
///
/// Columns: account, entry, type, amount, balance, description
pub fn write_ledger_csv(entries: &[LedgerRow], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["account", "entry", "type", "amount", "balance", "description"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for row in entries {
        let transaction = &row.transaction;
        writer
            .write_record(&[
                row.key.clone(),
                row.entry.to_string(),
                transaction.transaction_type.to_string(),
                money(transaction.transaction_amount),
                money(transaction.post_transaction_balance),
                transaction.description.clone(),
            ])
            .map_err(|e| format!("Failed to write ledger record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
