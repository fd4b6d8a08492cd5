//! In-memory client and user directory
//!
//! Stands in for the identity service the ledger depends on. Clients are
//! indexed by id and by phone number; users by card number.

use crate::core::traits::{ClientDirectory, UserDirectory};
use crate::types::{Client, ClientId, LedgerError, User};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct MemoryDirectory {
    clients: DashMap<ClientId, Client>,
    phones: DashMap<String, ClientId>,
    users: DashMap<ClientId, User>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a client, claiming its phone number
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if the client id or the phone number is already taken
    pub fn insert_client(&self, client: Client) -> Result<(), LedgerError> {
        if self.clients.contains_key(&client.client_id) {
            return Err(LedgerError::invalid_request(format!(
                "client {} is already registered",
                client.client_id
            )));
        }
        // The phone entry is the uniqueness guard; claim it first
        match self.phones.entry(client.phone_number.clone()) {
            Entry::Occupied(_) => {
                return Err(LedgerError::invalid_request(format!(
                    "phone number {} is already registered",
                    client.phone_number
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(client.client_id.clone());
            }
        }
        self.clients.insert(client.client_id.clone(), client);
        Ok(())
    }

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.identifier.clone(), user);
    }
}

impl ClientDirectory for MemoryDirectory {
    fn find_client_by_phone(&self, phone_number: &str) -> Result<Option<Client>, LedgerError> {
        let Some(client_id) = self.phones.get(phone_number).map(|entry| entry.value().clone())
        else {
            return Ok(None);
        };
        self.find_client(&client_id)
    }

    fn find_client(&self, client_id: &ClientId) -> Result<Option<Client>, LedgerError> {
        Ok(self.clients.get(client_id).map(|entry| entry.value().clone()))
    }
}

impl UserDirectory for MemoryDirectory {
    fn find_user(&self, identifier: &ClientId) -> Result<Option<User>, LedgerError> {
        Ok(self.users.get(identifier).map(|entry| entry.value().clone()))
    }
}
