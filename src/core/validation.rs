//! Request validation
//!
//! Pure checks run before any record is touched. Each returns the first
//! violation it finds as a [`LedgerError`]; none of them mutate anything.

use crate::core::traits::ClientDirectory;
use crate::types::{
    Account, AccountId, AccountStatus, AccountType, Capability, ClientId, LedgerError, Role,
};
use rust_decimal::Decimal;

const CARD_NUMBER_DIGITS: usize = 16;
const PHONE_NUMBER_DIGITS: usize = 10;

/// Reject zero and negative amounts
pub fn positive_amount(field: &str, amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_amount(field, Some(amount)));
    }
    Ok(())
}

/// Reject a missing amount, then apply [`positive_amount`]
pub fn required_amount(field: &str, amount: Option<Decimal>) -> Result<Decimal, LedgerError> {
    let amount = amount.ok_or_else(|| LedgerError::invalid_amount(field, None))?;
    positive_amount(field, amount)?;
    Ok(amount)
}

/// The account must belong to the acting client
///
/// `role` names the account in the error message ("Source", "Destination", ...).
pub fn account_ownership(
    account: &Account,
    client_id: &ClientId,
    role: &str,
) -> Result<(), LedgerError> {
    if !account.is_owned_by(client_id) {
        return Err(LedgerError::forbidden(format!(
            "{} account {} does not belong to client {}",
            role, account.account_id, client_id
        )));
    }
    Ok(())
}

/// The balance must cover the full debit
pub fn sufficient_balance(
    account_id: &AccountId,
    balance: Decimal,
    required: Decimal,
) -> Result<(), LedgerError> {
    if balance < required {
        return Err(LedgerError::insufficient_funds(account_id, balance, required));
    }
    Ok(())
}

/// Parse "chequing" or "savings", ignoring case
pub fn valid_account_type(value: &str) -> Result<AccountType, LedgerError> {
    value.parse()
}

/// Transfers may only target roles that can receive them
pub fn non_admin_recipient(role: Role, phone_number: &str) -> Result<(), LedgerError> {
    if !role.can(Capability::ReceiveTransfers) {
        return Err(LedgerError::forbidden_recipient(phone_number));
    }
    Ok(())
}

/// Money may only move through active accounts
pub fn active_account(account: &Account) -> Result<(), LedgerError> {
    if account.status != AccountStatus::Active {
        return Err(LedgerError::account_inactive(&account.account_id));
    }
    Ok(())
}

pub fn not_empty(field: &str, value: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::invalid_request(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn digits(field: &str, value: &str, expected: usize) -> Result<(), LedgerError> {
    not_empty(field, value)?;
    if value.len() != expected || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LedgerError::invalid_request(format!(
            "{} must be exactly {} digits",
            field, expected
        )));
    }
    Ok(())
}

pub fn card_number_format(card_number: &str) -> Result<(), LedgerError> {
    digits("card number", card_number, CARD_NUMBER_DIGITS)
}

pub fn phone_number_format(phone_number: &str) -> Result<(), LedgerError> {
    digits("phone number", phone_number, PHONE_NUMBER_DIGITS)
}

/// No existing client may already use the phone number
pub fn unique_phone_number(
    phone_number: &str,
    clients: &dyn ClientDirectory,
) -> Result<(), LedgerError> {
    if clients.find_client_by_phone(phone_number)?.is_some() {
        return Err(LedgerError::invalid_request(format!(
            "phone number {} is already registered",
            phone_number
        )));
    }
    Ok(())
}
