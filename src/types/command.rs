//! Journal commands
//!
//! A journal is a CSV replay of ledger operations. Accounts and loans are named
//! by journal-local keys (for example `alice-chq`) because their real
//! identifiers are generated at replay time.

use super::account::AccountType;
use super::ids::ClientId;
use super::party::Role;
use rust_decimal::Decimal;

/// One parsed journal row
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Register a client (or admin) and open their default Chequing account
    Register {
        card: ClientId,
        phone: String,
        account_key: String,
        role: Role,
    },
    /// Open an additional account
    Open {
        card: ClientId,
        account_key: String,
        account_type: AccountType,
    },
    Deposit {
        card: ClientId,
        account_key: String,
        amount: Decimal,
    },
    /// Move money between two accounts of the same client
    Transfer {
        card: ClientId,
        from_key: String,
        to_key: String,
        amount: Decimal,
    },
    /// Send money to another client by phone number
    Send {
        card: ClientId,
        account_key: String,
        phone: String,
        amount: Decimal,
    },
    RequestLoan {
        card: ClientId,
        loan_key: String,
        amount: Decimal,
    },
    ApproveLoan {
        admin: ClientId,
        loan_key: String,
    },
    DenyLoan {
        admin: ClientId,
        loan_key: String,
    },
    RepayLoan {
        loan_key: String,
        amount: Decimal,
    },
    /// Delete an account
    Close {
        card: ClientId,
        account_key: String,
    },
}

impl Command {
    /// Lowercase journal name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Command::Register {
                role: Role::Admin, ..
            } => "admin",
            Command::Register { .. } => "register",
            Command::Open { .. } => "open",
            Command::Deposit { .. } => "deposit",
            Command::Transfer { .. } => "transfer",
            Command::Send { .. } => "send",
            Command::RequestLoan { .. } => "loan",
            Command::ApproveLoan { .. } => "approve",
            Command::DenyLoan { .. } => "deny",
            Command::RepayLoan { .. } => "repay",
            Command::Close { .. } => "close",
        }
    }
}
