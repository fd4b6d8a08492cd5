//! Client registration
//!
//! Registering creates the client record, the user identity with its role, and
//! the default Chequing account, which becomes the client's original account.

use crate::core::accounts::AccountService;
use crate::core::directory::MemoryDirectory;
use crate::core::validation;
use crate::types::{Account, Client, ClientId, LedgerError, Role, User};
use std::sync::Arc;
use tracing::info;

/// Details supplied when a client signs up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClient {
    pub card_number: String,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

impl NewClient {
    /// A client known only by card and phone, as journals describe them
    pub fn anonymous(card_number: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            card_number: card_number.into(),
            phone_number: phone_number.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: None,
        }
    }
}

#[derive(Clone)]
pub struct Registrar {
    directory: Arc<MemoryDirectory>,
    accounts: AccountService,
}

impl Registrar {
    pub fn new(directory: Arc<MemoryDirectory>, accounts: AccountService) -> Self {
        Self {
            directory,
            accounts,
        }
    }

    /// Register a client and open their default account
    ///
    /// # Returns
    ///
    /// The stored client and its freshly opened Chequing account
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a malformed card or phone number, or a phone number
    /// (or card) that is already registered
    pub fn register(
        &self,
        new_client: NewClient,
        role: Role,
    ) -> Result<(Client, Account), LedgerError> {
        validation::card_number_format(&new_client.card_number)?;
        validation::phone_number_format(&new_client.phone_number)?;
        validation::unique_phone_number(&new_client.phone_number, self.directory.as_ref())?;

        let client_id = ClientId::new(new_client.card_number);
        let client = Client {
            client_id: client_id.clone(),
            phone_number: new_client.phone_number,
            first_name: new_client.first_name,
            last_name: new_client.last_name,
            email: new_client.email,
        };
        self.directory.insert_client(client.clone())?;
        self.directory.insert_user(User {
            identifier: client_id.clone(),
            role,
        });

        let account = self.accounts.open_default_account(&client_id)?;
        info!(client = %client_id, %role, "client registered");
        Ok((client, account))
    }
}
