//! Transaction processing engine
//!
//! This module provides the TransactionEngine, the only component allowed to
//! change account balances. Every money movement follows the same cycle:
//!
//! ```text
//! validate request ─▶ load accounts ─▶ check rules ─▶ compute balances + fee
//!        ▲                                                     │
//!        └──────── retry on Conflict ◀── commit(ChangeSet) ◀───┘
//!                                              │
//!                                              ▼
//!                                   notify (best effort)
//! ```
//!
//! The engine enforces business rules such as:
//! - Positive amounts and account ownership
//! - Sufficient balance for the full debit, fee included
//! - No transfers to administrators
//! - Exactly one ledger entry per balance change, committed atomically with it
//!
//! The engine holds no mutable state of its own and is shared behind an `Arc`
//! by every worker.

use crate::core::clock::Clock;
use crate::core::fees::FeePolicy;
use crate::core::ids::IdGenerator;
use crate::core::notify::Notification;
use crate::core::retry::RetryPolicy;
use crate::core::traits::{
    AccountRepository, ChangeSet, ClientDirectory, LedgerRepository, NotificationSink,
    UserDirectory,
};
use crate::core::validation;
use crate::types::{
    Account, AccountId, ClientId, LedgerError, Loan, NewTransaction, Page, PageRequest,
    Transaction, TransactionId, TransactionType, DEFAULT_MAX_PAGE_SIZE,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

/// Tunables of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How conflicting commits are retried
    pub retry: RetryPolicy,
    /// Largest page a ledger query may request
    pub max_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

/// Collaborators the engine is built from
pub struct EngineParts {
    pub accounts: Arc<dyn AccountRepository>,
    pub ledger: Arc<dyn LedgerRepository>,
    pub clients: Arc<dyn ClientDirectory>,
    pub users: Arc<dyn UserDirectory>,
    pub notifier: Arc<dyn NotificationSink>,
    pub fees: Arc<dyn FeePolicy>,
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
    pub config: EngineConfig,
}

/// Outcome of a deposit
#[derive(Debug, Clone, PartialEq)]
pub struct DepositReceipt {
    /// The account as committed
    pub account: Account,
    pub entry: Transaction,
}

/// Outcome of a transfer between two accounts
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    /// Amount credited to the destination
    pub amount: Decimal,
    /// Fee retained by the bank
    pub fee: Decimal,
    /// Amount debited from the source (amount + fee)
    pub total_debited: Decimal,
    pub debit: Transaction,
    pub credit: Transaction,
}

/// An account together with one page of its ledger
#[derive(Debug, Clone, PartialEq)]
pub struct AccountStatement {
    pub account: Account,
    pub transactions: Page<Transaction>,
}

/// Transaction processing engine
///
/// Orchestrates validation, fee computation and atomic commits. All operations
/// take `&self` and are safe to call from many threads at once.
pub struct TransactionEngine {
    accounts: Arc<dyn AccountRepository>,
    ledger: Arc<dyn LedgerRepository>,
    clients: Arc<dyn ClientDirectory>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn NotificationSink>,
    fees: Arc<dyn FeePolicy>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl TransactionEngine {
    /// Create a new TransactionEngine from its collaborators
    pub fn new(parts: EngineParts) -> Self {
        TransactionEngine {
            accounts: parts.accounts,
            ledger: parts.ledger,
            clients: parts.clients,
            users: parts.users,
            notifier: parts.notifier,
            fees: parts.fees,
            ids: parts.ids,
            clock: parts.clock,
            config: parts.config,
        }
    }

    /// Credit money to one of the client's accounts
    ///
    /// # Arguments
    ///
    /// * `client_id` - Verified identity of the caller
    /// * `account_id` - Account to credit
    /// * `amount` - Amount to deposit
    ///
    /// # Returns
    ///
    /// The updated account and the Credit entry recording the deposit
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is not positive (`InvalidAmount`)
    /// - The account does not exist (`NotFound`)
    /// - The account belongs to someone else (`Forbidden`)
    /// - The account is inactive
    /// - The new balance would overflow
    pub fn deposit(
        &self,
        client_id: &ClientId,
        account_id: &AccountId,
        amount: Decimal,
    ) -> Result<DepositReceipt, LedgerError> {
        validation::positive_amount("amount", amount)?;

        let receipt = self.config.retry.run("deposit", || {
            let mut account = self.load_account(account_id)?;
            validation::account_ownership(&account, client_id, "Target")?;
            validation::active_account(&account)?;

            let entry = self.post(&account, TransactionType::Credit, amount, "Deposit", None)?;
            // Mirror what the commit did to the stored record
            account.balance = entry.post_transaction_balance;
            account.updated_at = entry.timestamp;
            account.version += 1;
            Ok(DepositReceipt { account, entry })
        })?;

        info!(
            client = %client_id,
            account = %account_id,
            %amount,
            balance = %receipt.account.balance,
            "deposit committed"
        );
        Ok(receipt)
    }

    /// Move money between two accounts of the same client
    ///
    /// The fee (see [`FeePolicy`]) depends on the source account type. The
    /// source is debited amount + fee; the destination is credited amount.
    ///
    /// # Arguments
    ///
    /// * `client_id` - Verified identity of the caller, owner of both accounts
    /// * `from` - Source account
    /// * `to` - Destination account
    /// * `amount` - Amount the destination receives
    ///
    /// # Returns
    ///
    /// A receipt with both committed entries, which share one timestamp
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is not positive (`InvalidAmount`)
    /// - `from` and `to` are the same account (`InvalidRequest`)
    /// - Either account is missing (`NotFound`) or not owned by the client (`Forbidden`)
    /// - Either account is inactive
    /// - The source balance does not cover amount + fee (`InsufficientFunds`)
    pub fn internal_transfer(
        &self,
        client_id: &ClientId,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
    ) -> Result<TransferReceipt, LedgerError> {
        validation::positive_amount("amount", amount)?;
        if from == to {
            return Err(LedgerError::invalid_request(
                "source and destination accounts must differ",
            ));
        }

        let receipt = self.config.retry.run("internal transfer", || {
            let source = self.load_account(from)?;
            let destination = self.load_account(to)?;
            validation::account_ownership(&source, client_id, "Source")?;
            validation::account_ownership(&destination, client_id, "Destination")?;
            validation::active_account(&source)?;
            validation::active_account(&destination)?;

            let fee = self.fees.fee(source.account_type, amount);
            let total = amount
                .checked_add(fee)
                .ok_or_else(|| LedgerError::arithmetic_overflow("internal transfer", from))?;
            let source_balance = debited(&source, total, "internal transfer")?;
            let destination_balance = credited(&destination, amount, "internal transfer")?;

            let at = self.clock.now();
            let mut description = format!("Internal transfer to account {}", to);
            if !fee.is_zero() {
                description.push_str(&format!(" (Fee: {})", fee));
            }
            let mut debit = self.draft_entry(
                &source,
                TransactionType::Debit,
                total,
                source_balance,
                at,
                description,
            );
            debit.transfer_to_account_id = Some(to.clone());
            let credit = self.draft_entry(
                &destination,
                TransactionType::Credit,
                amount,
                destination_balance,
                at,
                format!("Internal transfer from account {}", from),
            );

            let committed = self.ledger.commit(
                ChangeSet::new(at)
                    .post(&source, debit)
                    .post(&destination, credit),
            )?;
            receipt(amount, fee, total, committed)
        })?;

        info!(
            client = %client_id,
            from = %from,
            to = %to,
            %amount,
            fee = %receipt.fee,
            "internal transfer committed"
        );
        Ok(receipt)
    }

    /// Send money to another client identified by phone number
    ///
    /// The money lands in the recipient's original account (the earliest one
    /// opened). No fee is charged. Once committed, the recipient is notified;
    /// a notification failure is logged and does not undo the transfer.
    ///
    /// # Arguments
    ///
    /// * `sender` - Verified identity of the caller
    /// * `account_id` - Sender's account to debit
    /// * `recipient_phone` - Phone number of the recipient client
    /// * `amount` - Amount to send
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is not positive (`InvalidAmount`)
    /// - The sender account is missing (`NotFound`), foreign (`Forbidden`) or inactive
    /// - The balance does not cover the amount (`InsufficientFunds`)
    /// - No client has the phone number, or the client has no user or no account (`NotFound`)
    /// - The recipient is an administrator (`Forbidden`)
    /// - The recipient account is the sender account itself (`InvalidRequest`)
    pub fn transfer_money(
        &self,
        sender: &ClientId,
        account_id: &AccountId,
        recipient_phone: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt, LedgerError> {
        validation::positive_amount("amount", amount)?;
        validation::not_empty("recipient phone number", recipient_phone)?;

        let (receipt, recipient) = self.config.retry.run("transfer", || {
            let source = self.load_account(account_id)?;
            validation::account_ownership(&source, sender, "Source")?;
            validation::active_account(&source)?;
            validation::sufficient_balance(&source.account_id, source.balance, amount)?;

            let recipient = self
                .clients
                .find_client_by_phone(recipient_phone)?
                .ok_or_else(|| LedgerError::not_found("recipient", recipient_phone))?;
            let user = self
                .users
                .find_user(&recipient.client_id)?
                .ok_or_else(|| LedgerError::not_found("user", &recipient.client_id))?;
            validation::non_admin_recipient(user.role, recipient_phone)?;

            let destination = self
                .accounts
                .find_accounts_by_client(&recipient.client_id)?
                .into_iter()
                .next()
                .ok_or_else(|| LedgerError::not_found("account of client", &recipient.client_id))?;
            if destination.account_id == source.account_id {
                return Err(LedgerError::invalid_request(
                    "source and destination accounts must differ",
                ));
            }
            validation::active_account(&destination)?;

            let source_balance = debited(&source, amount, "transfer")?;
            let destination_balance = credited(&destination, amount, "transfer")?;

            let at = self.clock.now();
            let mut debit = self.draft_entry(
                &source,
                TransactionType::Debit,
                amount,
                source_balance,
                at,
                format!("Transfer to {}", recipient_phone),
            );
            debit.transfer_to_account_id = Some(destination.account_id.clone());
            debit.recipient_phone_number = Some(recipient_phone.to_string());
            let credit = self.draft_entry(
                &destination,
                TransactionType::Credit,
                amount,
                destination_balance,
                at,
                format!("Transfer received from client {}", sender),
            );

            let committed = self.ledger.commit(
                ChangeSet::new(at)
                    .post(&source, debit)
                    .post(&destination, credit),
            )?;
            Ok((receipt(amount, Decimal::ZERO, amount, committed)?, recipient.client_id))
        })?;

        info!(
            sender = %sender,
            recipient = %recipient,
            %amount,
            "transfer committed"
        );

        let notification = Notification {
            recipient,
            subject: "Money Received".to_string(),
            body: format!(
                "You have received a transfer of ${} from client ID: {}",
                amount, sender
            ),
        };
        if let Err(error) = self.notifier.notify(notification) {
            warn!(%error, "transfer notification was not delivered");
        }

        Ok(receipt)
    }

    /// One page of an account's ledger, oldest entry first
    ///
    /// Entries are ordered by timestamp, ties broken by commit sequence.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the page size is zero or above the configured maximum
    /// - `NotFound` if the account does not exist
    pub fn transactions_by_account(
        &self,
        account_id: &AccountId,
        page: PageRequest,
    ) -> Result<Page<Transaction>, LedgerError> {
        page.validate(self.config.max_page_size)?;
        self.load_account(account_id)?;
        self.ledger.find_entries_by_account(account_id, page)
    }

    /// Lazily walk an account's ledger page by page
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if the page size is zero or above the configured maximum
    pub fn transaction_pages(
        &self,
        account_id: &AccountId,
        page_size: usize,
    ) -> Result<TransactionPages<'_>, LedgerError> {
        PageRequest::new(0, page_size).validate(self.config.max_page_size)?;
        Ok(TransactionPages {
            engine: self,
            account_id: account_id.clone(),
            page_size,
            next_page: Some(0),
        })
    }

    /// Look up a single ledger entry
    pub fn transaction(&self, transaction_id: &TransactionId) -> Result<Transaction, LedgerError> {
        self.ledger
            .find_entry(transaction_id)?
            .ok_or_else(|| LedgerError::not_found("transaction", transaction_id))
    }

    /// An owned account with one page of its ledger
    ///
    /// # Errors
    ///
    /// - `NotFound` if the account does not exist
    /// - `Forbidden` if it belongs to another client
    /// - `InvalidRequest` for a bad page size
    pub fn account_statement(
        &self,
        client_id: &ClientId,
        account_id: &AccountId,
        page: PageRequest,
    ) -> Result<AccountStatement, LedgerError> {
        let account = self.load_account(account_id)?;
        validation::account_ownership(&account, client_id, "Requested")?;
        let transactions = self.transactions_by_account(account_id, page)?;
        Ok(AccountStatement {
            account,
            transactions,
        })
    }

    pub(crate) fn retry_policy(&self) -> &RetryPolicy {
        &self.config.retry
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn accounts(&self) -> &dyn AccountRepository {
        self.accounts.as_ref()
    }

    pub(crate) fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    pub(crate) fn load_account(&self, account_id: &AccountId) -> Result<Account, LedgerError> {
        self.accounts
            .find_account(account_id)?
            .ok_or_else(|| LedgerError::not_found("account", account_id))
    }

    /// Change one account's balance, record it, and optionally update a loan, atomically
    ///
    /// # Arguments
    ///
    /// * `account` - Account as loaded for this attempt
    /// * `direction` - Credit adds `amount`, Debit subtracts it
    /// * `amount` - Positive amount
    /// * `description` - Ledger description
    /// * `loan` - Loan state to store alongside, with the version it was read at
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` for a debit the balance cannot cover, overflow, or
    /// any commit error (`Conflict` included, for the caller's retry loop)
    pub(crate) fn post(
        &self,
        account: &Account,
        direction: TransactionType,
        amount: Decimal,
        description: &str,
        loan: Option<(Loan, u64)>,
    ) -> Result<Transaction, LedgerError> {
        let balance = match direction {
            TransactionType::Credit => credited(account, amount, description)?,
            TransactionType::Debit => debited(account, amount, description)?,
        };
        let at = self.clock.now();
        let entry =
            self.draft_entry(account, direction, amount, balance, at, description.to_string());

        let mut changes = ChangeSet::new(at).post(account, entry);
        if let Some((loan, expected_version)) = loan {
            changes = changes.with_loan(loan, expected_version);
        }
        self.ledger
            .commit(changes)?
            .into_iter()
            .next()
            .ok_or_else(|| LedgerError::storage("commit returned no ledger entry"))
    }

    fn draft_entry(
        &self,
        account: &Account,
        transaction_type: TransactionType,
        amount: Decimal,
        post_transaction_balance: Decimal,
        at: DateTime<Utc>,
        description: String,
    ) -> NewTransaction {
        NewTransaction {
            transaction_id: self.ids.transaction_id(),
            account_id: account.account_id.clone(),
            transaction_type,
            transaction_amount: amount,
            post_transaction_balance,
            timestamp: at,
            transfer_to_account_id: None,
            recipient_phone_number: None,
            description,
        }
    }
}

fn credited(account: &Account, amount: Decimal, operation: &str) -> Result<Decimal, LedgerError> {
    account
        .balance
        .checked_add(amount)
        .ok_or_else(|| LedgerError::arithmetic_overflow(operation, &account.account_id))
}

fn debited(account: &Account, amount: Decimal, operation: &str) -> Result<Decimal, LedgerError> {
    validation::sufficient_balance(&account.account_id, account.balance, amount)?;
    account
        .balance
        .checked_sub(amount)
        .ok_or_else(|| LedgerError::arithmetic_overflow(operation, &account.account_id))
}

fn receipt(
    amount: Decimal,
    fee: Decimal,
    total_debited: Decimal,
    committed: Vec<Transaction>,
) -> Result<TransferReceipt, LedgerError> {
    let mut legs = committed.into_iter();
    match (legs.next(), legs.next()) {
        (Some(debit), Some(credit)) => Ok(TransferReceipt {
            amount,
            fee,
            total_debited,
            debit,
            credit,
        }),
        _ => Err(LedgerError::storage("transfer commit did not return both legs")),
    }
}

/// Lazy, restartable walk over an account's ledger pages
///
/// Always yields at least one page (possibly empty) and stops after the last
/// one. An error ends the walk; [`TransactionPages::restart`] begins again
/// from the first page.
pub struct TransactionPages<'a> {
    engine: &'a TransactionEngine,
    account_id: AccountId,
    page_size: usize,
    next_page: Option<usize>,
}

impl TransactionPages<'_> {
    /// Start over from the first page
    pub fn restart(&mut self) {
        self.next_page = Some(0);
    }
}

impl Iterator for TransactionPages<'_> {
    type Item = Result<Page<Transaction>, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let page_number = self.next_page?;
        let page = PageRequest::new(page_number, self.page_size);
        let result = self.engine.transactions_by_account(&self.account_id, page);
        self.next_page = match &result {
            Ok(page) if page.has_next() => Some(page_number + 1),
            _ => None,
        };
        Some(result)
    }
}
