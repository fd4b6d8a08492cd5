//! Clients, users and roles
//!
//! A client is the person owning accounts; a user is the login identity acting
//! on their behalf. Both are keyed by the card number. What a user may do is
//! decided by the capability table on [`Role`].

use super::ids::ClientId;
use crate::types::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Something a role may be allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    HoldAccounts,
    ReceiveTransfers,
    RequestLoans,
    DecideLoans,
}

/// Closed set of user roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Client,
    Admin,
}

impl Role {
    /// Capabilities granted to this role
    pub const fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Client => &[
                Capability::HoldAccounts,
                Capability::ReceiveTransfers,
                Capability::RequestLoans,
            ],
            // Admins keep accounts but are never the target of a client transfer
            Role::Admin => &[Capability::HoldAccounts, Capability::DecideLoans],
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => write!(f, "CLIENT"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

impl FromStr for Role {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CLIENT" => Ok(Role::Client),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(LedgerError::invalid_request(format!("unknown role '{}'", s))),
        }
    }
}

/// Account holder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub client_id: ClientId,
    /// 10-digit phone number, unique across clients
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

/// Login identity and its role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Card number the user signs in with
    pub identifier: ClientId,
    pub role: Role,
}
