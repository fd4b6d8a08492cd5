//! Core business logic module
//!
//! - `validation` - Pure request checks
//! - `engine` - Money movement and ledger queries
//! - `loans` - Loan lifecycle
//! - `accounts` - Account administration
//! - `registration` - Client sign-up
//! - `ledger` - Wiring of store, directory and services
//! - `traits` - Seams to storage, identity and notification collaborators
//! - `memory_store` / `directory` / `notify` - In-memory implementations of those seams
//! - `fees`, `retry`, `clock`, `ids` - Policies and injected sources
//! - `processor` / `batch_processor` - Journal replay

pub mod accounts;
pub mod batch_processor;
pub mod clock;
pub mod directory;
pub mod engine;
pub mod fees;
pub mod ids;
pub mod ledger;
pub mod loans;
pub mod memory_store;
pub mod notify;
pub mod processor;
pub mod registration;
pub mod retry;
pub mod traits;
pub mod validation;

pub use accounts::AccountService;
pub use engine::{DepositReceipt, EngineConfig, TransactionEngine, TransferReceipt};
pub use ledger::{Ledger, LedgerBuilder};
pub use loans::LoanService;
pub use memory_store::MemoryStore;
pub use processor::CommandProcessor;
pub use registration::{NewClient, Registrar};
