//! Ledger assembly
//!
//! [`Ledger`] wires the in-memory store, the directory and the services on top
//! of one shared [`TransactionEngine`]. Every piece is reachable through a
//! public field so callers can go straight to the service they need.
//!
//! ```text
//! LedgerBuilder ──build──▶ Ledger
//!                            ├── store      (accounts, ledger, loans)
//!                            ├── directory  (clients, users)
//!                            ├── engine     (money movement, queries)
//!                            ├── accounts   (AccountService)
//!                            ├── loans      (LoanService)
//!                            └── registrar  (Registrar)
//! ```

use crate::core::accounts::AccountService;
use crate::core::clock::{Clock, SystemClock};
use crate::core::directory::MemoryDirectory;
use crate::core::engine::{EngineConfig, EngineParts, TransactionEngine};
use crate::core::fees::{AccountTypeFeePolicy, FeePolicy};
use crate::core::ids::{IdGenerator, UuidIds};
use crate::core::loans::LoanService;
use crate::core::memory_store::MemoryStore;
use crate::core::notify::TracingNotifier;
use crate::core::registration::Registrar;
use crate::core::traits::NotificationSink;
use std::sync::Arc;

/// A fully wired, in-memory bank
#[derive(Clone)]
pub struct Ledger {
    pub store: Arc<MemoryStore>,
    pub directory: Arc<MemoryDirectory>,
    pub engine: Arc<TransactionEngine>,
    pub accounts: AccountService,
    pub loans: LoanService,
    pub registrar: Registrar,
}

impl Ledger {
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::default()
    }
}

/// Swaps out collaborators before the ledger is built
#[derive(Default)]
pub struct LedgerBuilder {
    ids: Option<Arc<dyn IdGenerator>>,
    clock: Option<Arc<dyn Clock>>,
    notifier: Option<Arc<dyn NotificationSink>>,
    fees: Option<Arc<dyn FeePolicy>>,
    config: EngineConfig,
}

impl LedgerBuilder {
    pub fn ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn fees(mut self, fees: Arc<dyn FeePolicy>) -> Self {
        self.fees = Some(fees);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Ledger {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::new());

        let engine = Arc::new(TransactionEngine::new(EngineParts {
            accounts: store.clone(),
            ledger: store.clone(),
            clients: directory.clone(),
            users: directory.clone(),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier)),
            fees: self
                .fees
                .unwrap_or_else(|| Arc::new(AccountTypeFeePolicy::default())),
            ids: self.ids.unwrap_or_else(|| Arc::new(UuidIds)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            config: self.config,
        }));

        let accounts = AccountService::new(engine.clone());
        let loans =
            LoanService::new(engine.clone(), store.clone(), store.clone(), directory.clone());
        let registrar = Registrar::new(directory.clone(), accounts.clone());

        Ledger {
            store,
            directory,
            engine,
            accounts,
            loans,
            registrar,
        }
    }
}
