//! Loan subsystem
//!
//! Loans are requested by clients, decided by administrators, disbursed into
//! and repaid from the borrower's Chequing account. Disbursements and
//! repayments go through the engine's posting primitive, so the balance change,
//! its ledger entry and the loan update commit as one unit.
//!
//! # Lifecycle
//!
//! ```text
//! request ─▶ PENDING ─approve─▶ AWAITING_PAYMENT ─pay down to 0─▶ PAID
//!               │
//!               └─deny─▶ DENIED
//! ```

use crate::core::engine::TransactionEngine;
use crate::core::traits::{ChangeSet, LedgerRepository, LoanRepository, UserDirectory};
use crate::core::validation;
use crate::types::{
    Account, AccountType, Capability, ClientId, LedgerError, Loan, LoanId, LoanStatus,
    TransactionType,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

/// Loan operations
#[derive(Clone)]
pub struct LoanService {
    engine: Arc<TransactionEngine>,
    loans: Arc<dyn LoanRepository>,
    ledger: Arc<dyn LedgerRepository>,
    users: Arc<dyn UserDirectory>,
}

impl LoanService {
    pub fn new(
        engine: Arc<TransactionEngine>,
        loans: Arc<dyn LoanRepository>,
        ledger: Arc<dyn LedgerRepository>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            engine,
            loans,
            ledger,
            users,
        }
    }

    /// Ask for a loan
    ///
    /// # Arguments
    ///
    /// * `card_number` - Card number of the borrowing user
    /// * `amount` - Requested principal
    ///
    /// # Returns
    ///
    /// The new loan in status PENDING
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the card number is not 16 digits
    /// - `InvalidAmount` if the amount is not positive
    pub fn request_loan(&self, card_number: &str, amount: Decimal) -> Result<Loan, LedgerError> {
        validation::card_number_format(card_number)?;
        validation::positive_amount("loan amount", amount)?;

        let loan = Loan::new(
            self.engine.ids().loan_id(),
            ClientId::new(card_number),
            amount,
            self.engine.now(),
        );
        let loan = self.loans.insert_loan(loan)?;
        info!(loan = %loan.loan_id, borrower = %loan.borrower, %amount, "loan requested");
        Ok(loan)
    }

    /// Approve a pending loan and disburse it into the borrower's Chequing account
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for an empty loan id or malformed admin card
    /// - `Forbidden` if the card does not belong to an administrator
    /// - `NotFound` for an unknown loan or a borrower without a Chequing account
    /// - `InvalidLoanState` unless the loan is PENDING
    pub fn approve_loan(&self, loan_id: &LoanId, admin_card: &str) -> Result<Loan, LedgerError> {
        let admin = self.authorize_decision(loan_id, admin_card)?;

        let loan = self.engine.retry_policy().run("approve loan", || {
            let loan = self.load_undecided(loan_id, "approve")?;
            let account = self.chequing_account(&loan.borrower)?;

            let mut approved = loan.clone();
            approved.status = LoanStatus::AwaitingPayment;
            approved.decided_at = Some(self.engine.now());
            approved.decision_by_admin = Some(admin.clone());

            self.engine.post(
                &account,
                TransactionType::Credit,
                loan.amount_requested,
                "Loan approved and disbursed",
                Some((approved.clone(), loan.version)),
            )?;
            approved.version = loan.version + 1;
            Ok(approved)
        })?;

        info!(loan = %loan_id, admin = %admin, amount = %loan.amount_requested, "loan approved");
        Ok(loan)
    }

    /// Deny a pending loan
    ///
    /// # Errors
    ///
    /// Same as [`LoanService::approve_loan`], minus the account lookup
    pub fn deny_loan(&self, loan_id: &LoanId, admin_card: &str) -> Result<Loan, LedgerError> {
        let admin = self.authorize_decision(loan_id, admin_card)?;

        let loan = self.engine.retry_policy().run("deny loan", || {
            let loan = self.load_undecided(loan_id, "deny")?;

            let mut denied = loan.clone();
            denied.status = LoanStatus::Denied;
            denied.decided_at = Some(self.engine.now());
            denied.decision_by_admin = Some(admin.clone());

            let changes = ChangeSet::new(self.engine.now()).with_loan(denied.clone(), loan.version);
            self.ledger.commit(changes)?;
            denied.version = loan.version + 1;
            Ok(denied)
        })?;

        info!(loan = %loan_id, admin = %admin, "loan denied");
        Ok(loan)
    }

    /// Repay part or all of an approved loan from the borrower's Chequing account
    ///
    /// The outstanding amount never drops below zero; once it reaches zero the
    /// loan is PAID.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the payment is not positive
    /// - `NotFound` for an unknown loan or a borrower without a Chequing account
    /// - `InvalidLoanState` unless the loan is AWAITING_PAYMENT
    /// - `InsufficientFunds` if the Chequing balance does not cover the payment
    pub fn pay_down_loan(&self, loan_id: &LoanId, payment: Decimal) -> Result<Loan, LedgerError> {
        validation::positive_amount("payment", payment)?;

        self.engine.retry_policy().run("pay down loan", || {
            let loan = self.load(loan_id)?;
            if !loan.status.accepts_payments() {
                return Err(LedgerError::invalid_loan_state(loan_id, loan.status, "pay down"));
            }
            let account = self.chequing_account(&loan.borrower)?;
            validation::sufficient_balance(&account.account_id, account.balance, payment)?;

            let mut paid = loan.clone();
            paid.amount_outstanding = (loan.amount_outstanding - payment).max(Decimal::ZERO);
            if paid.amount_outstanding.is_zero() {
                paid.status = LoanStatus::Paid;
            }

            self.engine.post(
                &account,
                TransactionType::Debit,
                payment,
                "Loan repayment",
                Some((paid, loan.version)),
            )
        })?;

        let loan = self.load(loan_id)?;
        info!(
            loan = %loan_id,
            %payment,
            outstanding = %loan.amount_outstanding,
            status = %loan.status,
            "loan payment committed"
        );
        Ok(loan)
    }

    /// Look up a loan
    pub fn loan(&self, loan_id: &LoanId) -> Result<Loan, LedgerError> {
        self.load(loan_id)
    }

    /// Loans of one user, oldest first
    pub fn loans_for_user(&self, card_number: &str) -> Result<Vec<Loan>, LedgerError> {
        validation::card_number_format(card_number)?;
        self.loans.find_loans_by_borrower(&ClientId::new(card_number))
    }

    /// Loans waiting for a decision, oldest first
    pub fn pending_loans(&self) -> Result<Vec<Loan>, LedgerError> {
        self.loans.find_loans_by_status(LoanStatus::Pending)
    }

    fn authorize_decision(
        &self,
        loan_id: &LoanId,
        admin_card: &str,
    ) -> Result<ClientId, LedgerError> {
        validation::not_empty("loan id", loan_id.as_str())?;
        validation::card_number_format(admin_card)?;

        let admin = ClientId::new(admin_card);
        let allowed = self
            .users
            .find_user(&admin)?
            .is_some_and(|user| user.role.can(Capability::DecideLoans));
        if !allowed {
            return Err(LedgerError::forbidden(format!(
                "user {} may not decide loans",
                admin
            )));
        }
        Ok(admin)
    }

    fn load(&self, loan_id: &LoanId) -> Result<Loan, LedgerError> {
        self.loans
            .find_loan(loan_id)?
            .ok_or_else(|| LedgerError::not_found("loan", loan_id))
    }

    fn load_undecided(&self, loan_id: &LoanId, operation: &str) -> Result<Loan, LedgerError> {
        let loan = self.load(loan_id)?;
        if !loan.status.is_undecided() {
            return Err(LedgerError::invalid_loan_state(loan_id, loan.status, operation));
        }
        Ok(loan)
    }

    /// The borrower's first Chequing account by creation order
    fn chequing_account(&self, borrower: &ClientId) -> Result<Account, LedgerError> {
        self.engine
            .accounts()
            .find_accounts_by_client(borrower)?
            .into_iter()
            .find(|account| account.account_type == AccountType::Chequing)
            .ok_or_else(|| LedgerError::not_found("Chequing account of user", borrower))
    }
}
