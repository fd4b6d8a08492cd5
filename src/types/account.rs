//! Account-related types for the retail ledger
//!
//! This module defines the Account record together with its type and status
//! enums. Balances are only ever changed by the ledger commit path; everything
//! else (name, status) is plain metadata.

use super::ids::{AccountId, ClientId};
use crate::types::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of account a client holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Everyday account; loans are disbursed into and repaid from it
    Chequing,
    /// Savings account; outgoing internal transfers pay a fee
    Savings,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Chequing => write!(f, "Chequing"),
            AccountType::Savings => write!(f, "Savings"),
        }
    }
}

impl FromStr for AccountType {
    type Err = LedgerError;

    /// Parse an account type, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chequing" => Ok(AccountType::Chequing),
            "savings" => Ok(AccountType::Savings),
            _ => Err(LedgerError::invalid_account_type(s)),
        }
    }
}

/// Whether an account may take part in money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "ACTIVE"),
            AccountStatus::Inactive => write!(f, "INACTIVE"),
        }
    }
}

/// Client account state
///
/// Represents a single account owned by exactly one client.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Unique account identifier
    pub account_id: AccountId,

    /// Owning client
    pub client_id: ClientId,

    /// Display name chosen by the client
    pub account_name: String,

    /// Chequing or Savings
    pub account_type: AccountType,

    /// Current balance
    ///
    /// Never negative. Each change is mirrored by exactly one ledger entry whose
    /// post-transaction balance equals the new value.
    pub balance: Decimal,

    /// Active accounts can send and receive money
    pub status: AccountStatus,

    /// Creation time; the earliest account of a client is its original account
    pub created_at: DateTime<Utc>,

    /// Last metadata or balance change
    pub updated_at: DateTime<Utc>,

    /// Optimistic concurrency counter, bumped by every committed balance change
    pub version: u64,
}

impl Account {
    /// Create a new active account with a zero balance
    ///
    /// # Arguments
    ///
    /// * `account_id` - Identifier for the new account
    /// * `client_id` - Owning client
    /// * `account_name` - Display name
    /// * `account_type` - Chequing or Savings
    /// * `now` - Creation timestamp
    ///
    /// # Returns
    ///
    /// A new Account with balance 0, status Active and version 0
    pub fn new(
        account_id: AccountId,
        client_id: ClientId,
        account_name: impl Into<String>,
        account_type: AccountType,
        now: DateTime<Utc>,
    ) -> Self {
        Account {
            account_id,
            client_id,
            account_name: account_name.into(),
            account_type,
            balance: Decimal::ZERO,
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Whether the account is owned by `client_id`
    pub fn is_owned_by(&self, client_id: &ClientId) -> bool {
        &self.client_id == client_id
    }

    /// Sort key placing a client's original account first
    pub fn creation_order(&self) -> (DateTime<Utc>, &AccountId) {
        (self.created_at, &self.account_id)
    }
}
