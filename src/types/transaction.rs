//! Ledger entry types for the retail ledger
//!
//! A [`Transaction`] is one immutable line in an account's audit trail. Entries
//! are drafted by the engine as [`NewTransaction`] values and only become
//! [`Transaction`]s once the store commits them together with the balance change
//! they describe and stamps them with a commit sequence number.

use super::ids::{AccountId, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Money left the account
    Debit,
    /// Money entered the account
    Credit,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Debit => write!(f, "DEBIT"),
            TransactionType::Credit => write!(f, "CREDIT"),
        }
    }
}

/// Ledger entry drafted by the engine, not yet committed
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    pub transaction_type: TransactionType,
    /// Always positive; for a debit it includes any fee
    pub transaction_amount: Decimal,
    /// Balance of `account_id` immediately after this entry
    pub post_transaction_balance: Decimal,
    pub timestamp: DateTime<Utc>,
    pub transfer_to_account_id: Option<AccountId>,
    pub recipient_phone_number: Option<String>,
    pub description: String,
}

impl NewTransaction {
    /// Stamp the draft with its commit sequence number
    pub fn commit(self, sequence: u64) -> Transaction {
        Transaction {
            transaction_id: self.transaction_id,
            account_id: self.account_id,
            transaction_type: self.transaction_type,
            transaction_amount: self.transaction_amount,
            post_transaction_balance: self.post_transaction_balance,
            timestamp: self.timestamp,
            transfer_to_account_id: self.transfer_to_account_id,
            recipient_phone_number: self.recipient_phone_number,
            description: self.description,
            sequence,
        }
    }
}

/// Committed ledger entry
///
/// Immutable once written. A transfer produces exactly two entries sharing one
/// timestamp; deposits, loan disbursements and loan repayments produce one.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Unique entry identifier
    pub transaction_id: TransactionId,

    /// Account whose balance this entry changed
    pub account_id: AccountId,

    /// Debit or Credit
    pub transaction_type: TransactionType,

    /// Amount moved, always positive
    pub transaction_amount: Decimal,

    /// Balance of the account right after this entry
    pub post_transaction_balance: Decimal,

    /// Business time of the operation
    pub timestamp: DateTime<Utc>,

    /// Destination account for outgoing transfers
    pub transfer_to_account_id: Option<AccountId>,

    /// Recipient phone number for transfers addressed by phone
    pub recipient_phone_number: Option<String>,

    /// Human readable description
    pub description: String,

    /// Store-assigned commit sequence, strictly increasing across the ledger
    ///
    /// Breaks ties between entries sharing a timestamp: the debit leg of a
    /// transfer is always sequenced before its credit leg.
    pub sequence: u64,
}

impl Transaction {
    /// Ordering key used by every ledger query
    pub fn ledger_order(&self) -> (DateTime<Utc>, u64) {
        (self.timestamp, self.sequence)
    }
}
