//! Ledger-wide properties exercised through the public API
//!
//! Every test builds its own in-memory bank with a pinned clock and sequential
//! identifiers, registers a couple of clients and checks balances against the
//! ledger entries the operations leave behind.

use chrono::{TimeZone, Utc};
use retail_ledger::core::clock::ManualClock;
use retail_ledger::core::engine::EngineConfig;
use retail_ledger::core::ids::SequentialIds;
use retail_ledger::core::notify::InboxNotifier;
use retail_ledger::core::retry::RetryPolicy;
use retail_ledger::core::{Ledger, NewClient};
use retail_ledger::types::{
    Account, AccountId, AccountType, ClientId, ErrorKind, LoanStatus, PageRequest, Role,
    Transaction, TransactionType,
};
use proptest::prelude::*;
use rstest::{fixture, rstest};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const ALICE: &str = "4520111122223333";
const BOB: &str = "4520444455556666";
const BOB_PHONE: &str = "4165550102";
const ADMIN: &str = "9000000000000001";
const ADMIN_PHONE: &str = "4165550199";

struct Bank {
    ledger: Ledger,
    inbox: Arc<InboxNotifier>,
    alice: ClientId,
    alice_chequing: AccountId,
    alice_savings: AccountId,
    bob: ClientId,
    bob_chequing: AccountId,
}

impl Bank {
    fn balance(&self, account_id: &AccountId) -> Decimal {
        self.account(account_id).balance
    }

    fn account(&self, account_id: &AccountId) -> Account {
        self.ledger
            .accounts
            .accounts_for_client(&self.alice)
            .unwrap()
            .into_iter()
            .chain(self.ledger.accounts.accounts_for_client(&self.bob).unwrap())
            .find(|account| &account.account_id == account_id)
            .unwrap()
    }

    fn entries(&self, account_id: &AccountId) -> Vec<Transaction> {
        self.ledger
            .engine
            .transactions_by_account(account_id, PageRequest::new(0, 100))
            .unwrap()
            .items
    }

    fn total_entries(&self) -> usize {
        [&self.alice_chequing, &self.alice_savings, &self.bob_chequing]
            .iter()
            .map(|account| self.entries(account).len())
            .sum()
    }
}

fn open_bank(config: EngineConfig) -> Bank {
    let inbox = Arc::new(InboxNotifier::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    ));
    let ledger = Ledger::builder()
        .ids(Arc::new(SequentialIds::new()))
        .clock(clock)
        .notifier(inbox.clone())
        .config(config)
        .build();

    let (alice, alice_chequing) = ledger
        .registrar
        .register(NewClient::anonymous(ALICE, "4165550101"), Role::Client)
        .unwrap();
    let (bob, bob_chequing) = ledger
        .registrar
        .register(NewClient::anonymous(BOB, BOB_PHONE), Role::Client)
        .unwrap();
    ledger
        .registrar
        .register(NewClient::anonymous(ADMIN, ADMIN_PHONE), Role::Admin)
        .unwrap();
    let alice_savings = ledger
        .accounts
        .create_account(&alice.client_id, "Rainy day", "Savings")
        .unwrap();

    Bank {
        ledger,
        inbox,
        alice: alice.client_id,
        alice_chequing: alice_chequing.account_id,
        alice_savings: alice_savings.account_id,
        bob: bob.client_id,
        bob_chequing: bob_chequing.account_id,
    }
}

#[fixture]
fn bank() -> Bank {
    open_bank(EngineConfig::default())
}

#[rstest]
fn test_deposit_adds_one_credit_entry(bank: Bank) {
    bank.ledger
        .engine
        .deposit(&bank.alice, &bank.alice_chequing, dec!(100))
        .unwrap();
    let receipt = bank
        .ledger
        .engine
        .deposit(&bank.alice, &bank.alice_chequing, dec!(50))
        .unwrap();

    assert_eq!(receipt.account.balance, dec!(150));
    assert_eq!(bank.balance(&bank.alice_chequing), dec!(150));
    assert_eq!(receipt.entry.transaction_type, TransactionType::Credit);
    assert_eq!(receipt.entry.transaction_amount, dec!(50));
    assert_eq!(receipt.entry.post_transaction_balance, dec!(150));
    assert_eq!(bank.entries(&bank.alice_chequing).len(), 2);
}

#[rstest]
fn test_savings_transfer_pays_fee(bank: Bank) {
    bank.ledger
        .engine
        .deposit(&bank.alice, &bank.alice_savings, dec!(1000))
        .unwrap();

    let receipt = bank
        .ledger
        .engine
        .internal_transfer(&bank.alice, &bank.alice_savings, &bank.alice_chequing, dec!(100))
        .unwrap();

    assert_eq!(receipt.fee, dec!(1.50));
    assert_eq!(receipt.total_debited, dec!(101.50));
    assert_eq!(bank.balance(&bank.alice_savings), dec!(898.50));
    assert_eq!(bank.balance(&bank.alice_chequing), dec!(100));
    assert_eq!(receipt.debit.timestamp, receipt.credit.timestamp);
    assert_eq!(receipt.debit.post_transaction_balance, dec!(898.50));
    assert_eq!(receipt.credit.post_transaction_balance, dec!(100));
}

#[rstest]
#[case::exact(dec!(100), dec!(101.50))]
#[case::rounded_up(dec!(33.33), dec!(33.83))]
#[case::rounded_down(dec!(0.20), dec!(0.20))]
fn test_fee_law(bank: Bank, #[case] amount: Decimal, #[case] debited: Decimal) {
    bank.ledger
        .engine
        .deposit(&bank.alice, &bank.alice_savings, dec!(500))
        .unwrap();

    bank.ledger
        .engine
        .internal_transfer(&bank.alice, &bank.alice_savings, &bank.alice_chequing, amount)
        .unwrap();

    assert_eq!(bank.balance(&bank.alice_savings), dec!(500) - debited);
    assert_eq!(bank.balance(&bank.alice_chequing), amount);
}

#[rstest]
fn test_rejected_transfer_leaves_no_trace(bank: Bank) {
    bank.ledger
        .engine
        .deposit(&bank.alice, &bank.alice_chequing, dec!(50))
        .unwrap();
    let entries_before = bank.total_entries();

    let error = bank
        .ledger
        .engine
        .transfer_money(&bank.alice, &bank.alice_chequing, BOB_PHONE, dec!(100))
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(bank.balance(&bank.alice_chequing), dec!(50));
    assert_eq!(bank.balance(&bank.bob_chequing), dec!(0));
    assert_eq!(bank.total_entries(), entries_before);
    assert!(bank.inbox.inbox(&bank.bob).is_empty());
}

#[rstest]
fn test_fee_counts_towards_the_balance_check(bank: Bank) {
    bank.ledger
        .engine
        .deposit(&bank.alice, &bank.alice_savings, dec!(100))
        .unwrap();

    let error = bank
        .ledger
        .engine
        .internal_transfer(&bank.alice, &bank.alice_savings, &bank.alice_chequing, dec!(100))
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(bank.balance(&bank.alice_savings), dec!(100));
    assert_eq!(bank.entries(&bank.alice_savings).len(), 1);
}

#[rstest]
fn test_loan_lifecycle(bank: Bank) {
    let loans = &bank.ledger.loans;
    let loan = loans.request_loan(ALICE, dec!(500)).unwrap();
    assert_eq!(loan.status, LoanStatus::Pending);

    let approved = loans.approve_loan(&loan.loan_id, ADMIN).unwrap();
    assert_eq!(approved.status, LoanStatus::AwaitingPayment);
    assert_eq!(approved.decision_by_admin, Some(ClientId::new(ADMIN)));
    assert_eq!(bank.balance(&bank.alice_chequing), dec!(500));

    let entries = bank.entries(&bank.alice_chequing);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].transaction_type, TransactionType::Credit);
    assert_eq!(entries[0].transaction_amount, dec!(500));

    let paid = loans.pay_down_loan(&loan.loan_id, dec!(500)).unwrap();
    assert_eq!(paid.status, LoanStatus::Paid);
    assert_eq!(paid.amount_outstanding, dec!(0));
    assert_eq!(bank.balance(&bank.alice_chequing), dec!(0));
    assert_eq!(bank.entries(&bank.alice_chequing).len(), 2);
}

#[rstest]
fn test_only_admins_decide_loans(bank: Bank) {
    let loan = bank.ledger.loans.request_loan(ALICE, dec!(500)).unwrap();

    let error = bank.ledger.loans.approve_loan(&loan.loan_id, BOB).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Forbidden);
    assert_eq!(bank.ledger.loans.loan(&loan.loan_id).unwrap().status, LoanStatus::Pending);
    assert_eq!(bank.balance(&bank.alice_chequing), dec!(0));
}

#[rstest]
fn test_transfer_to_admin_is_forbidden(bank: Bank) {
    bank.ledger
        .engine
        .deposit(&bank.alice, &bank.alice_chequing, dec!(100))
        .unwrap();

    let error = bank
        .ledger
        .engine
        .transfer_money(&bank.alice, &bank.alice_chequing, ADMIN_PHONE, dec!(10))
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Forbidden);
    assert_eq!(bank.balance(&bank.alice_chequing), dec!(100));
}

#[rstest]
fn test_phone_transfer_notifies_recipient(bank: Bank) {
    bank.ledger
        .engine
        .deposit(&bank.alice, &bank.alice_savings, dec!(100))
        .unwrap();

    let receipt = bank
        .ledger
        .engine
        .transfer_money(&bank.alice, &bank.alice_savings, BOB_PHONE, dec!(40))
        .unwrap();

    // No fee on transfers between clients, even out of Savings
    assert_eq!(receipt.fee, dec!(0));
    assert_eq!(bank.balance(&bank.alice_savings), dec!(60));
    assert_eq!(bank.balance(&bank.bob_chequing), dec!(40));
    assert_eq!(receipt.debit.recipient_phone_number.as_deref(), Some(BOB_PHONE));

    let inbox = bank.inbox.inbox(&bank.bob);
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].subject, "Money Received");
}

#[rstest]
fn test_foreign_account_is_forbidden(bank: Bank) {
    bank.ledger
        .engine
        .deposit(&bank.bob, &bank.bob_chequing, dec!(100))
        .unwrap();
    let entries_before = bank.total_entries();

    let deposit = bank
        .ledger
        .engine
        .deposit(&bank.alice, &bank.bob_chequing, dec!(5))
        .unwrap_err();
    let transfer = bank
        .ledger
        .engine
        .internal_transfer(&bank.alice, &bank.bob_chequing, &bank.alice_chequing, dec!(5))
        .unwrap_err();
    let statement = bank
        .ledger
        .engine
        .account_statement(&bank.alice, &bank.bob_chequing, PageRequest::new(0, 10))
        .unwrap_err();

    assert_eq!(deposit.kind(), ErrorKind::Forbidden);
    assert_eq!(transfer.kind(), ErrorKind::Forbidden);
    assert_eq!(statement.kind(), ErrorKind::Forbidden);
    assert_eq!(bank.balance(&bank.bob_chequing), dec!(100));
    assert_eq!(bank.total_entries(), entries_before);
}

#[rstest]
fn test_reads_are_repeatable(bank: Bank) {
    for amount in [dec!(10), dec!(20), dec!(30)] {
        bank.ledger
            .engine
            .deposit(&bank.alice, &bank.alice_chequing, amount)
            .unwrap();
    }

    let first = bank
        .ledger
        .engine
        .transactions_by_account(&bank.alice_chequing, PageRequest::new(0, 2))
        .unwrap();
    let second = bank
        .ledger
        .engine
        .transactions_by_account(&bank.alice_chequing, PageRequest::new(0, 2))
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.total_elements, 3);
    assert!(first.has_next());
}

#[rstest]
fn test_balances_match_last_entry(bank: Bank) {
    let engine = &bank.ledger.engine;
    engine.deposit(&bank.alice, &bank.alice_savings, dec!(250)).unwrap();
    engine
        .internal_transfer(&bank.alice, &bank.alice_savings, &bank.alice_chequing, dec!(80))
        .unwrap();
    engine
        .transfer_money(&bank.alice, &bank.alice_chequing, BOB_PHONE, dec!(30))
        .unwrap();
    engine
        .internal_transfer(&bank.alice, &bank.alice_chequing, &bank.alice_savings, dec!(10))
        .unwrap();

    for account_id in [&bank.alice_chequing, &bank.alice_savings, &bank.bob_chequing] {
        let entries = bank.entries(account_id);
        let last = entries.last().unwrap();
        assert_eq!(last.post_transaction_balance, bank.balance(account_id));

        // Replaying the entries gives the same balance
        let replayed = entries.iter().fold(Decimal::ZERO, |balance, entry| {
            match entry.transaction_type {
                TransactionType::Credit => balance + entry.transaction_amount,
                TransactionType::Debit => balance - entry.transaction_amount,
            }
        });
        assert_eq!(replayed, bank.balance(account_id));
    }
}

fn all_entries(bank: &Bank, account_id: &AccountId) -> Vec<Transaction> {
    let mut entries = Vec::new();
    for page in bank.ledger.engine.transaction_pages(account_id, 100).unwrap() {
        entries.extend(page.unwrap().items);
    }
    entries
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    })]

    /// Any amount moved out of Savings costs 1.5% on top, rounded half away
    /// from zero to the cent; out of Chequing it costs nothing.
    #[test]
    fn prop_fee_law_holds_for_any_amount(cents in 1i64..10_000_000, from_savings in any::<bool>()) {
        let bank = open_bank(EngineConfig::default());
        let engine = &bank.ledger.engine;
        let amount = Decimal::new(cents, 2);
        let funded = dec!(200000);
        let (from, to) = if from_savings {
            (&bank.alice_savings, &bank.alice_chequing)
        } else {
            (&bank.alice_chequing, &bank.alice_savings)
        };
        engine.deposit(&bank.alice, from, funded).unwrap();

        let receipt = engine.internal_transfer(&bank.alice, from, to, amount).unwrap();

        let expected_fee = if from_savings {
            (amount * dec!(0.015)).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        } else {
            Decimal::ZERO
        };
        prop_assert_eq!(receipt.fee, expected_fee);
        prop_assert_eq!(receipt.total_debited, amount + expected_fee);
        prop_assert_eq!(bank.balance(from), funded - amount - expected_fee);
        prop_assert_eq!(bank.balance(to), amount);
    }

    /// Whatever sequence of transfers runs, money only leaves the bank as fees,
    /// no balance goes negative and every balance equals the post balance of
    /// its account's last entry.
    #[test]
    fn prop_transfer_sequences_conserve_money(
        operations in prop::collection::vec((0u8..4, 1i64..60_000), 1..40)
    ) {
        let bank = open_bank(EngineConfig::default());
        let engine = &bank.ledger.engine;
        engine.deposit(&bank.alice, &bank.alice_chequing, dec!(1000)).unwrap();
        engine.deposit(&bank.alice, &bank.alice_savings, dec!(1000)).unwrap();
        engine.deposit(&bank.bob, &bank.bob_chequing, dec!(1000)).unwrap();

        let mut fees = Decimal::ZERO;
        for (kind, cents) in operations {
            let amount = Decimal::new(cents, 2);
            let result = match kind {
                0 => engine.internal_transfer(
                    &bank.alice,
                    &bank.alice_savings,
                    &bank.alice_chequing,
                    amount,
                ),
                1 => engine.internal_transfer(
                    &bank.alice,
                    &bank.alice_chequing,
                    &bank.alice_savings,
                    amount,
                ),
                2 => engine.transfer_money(&bank.alice, &bank.alice_chequing, BOB_PHONE, amount),
                _ => engine.transfer_money(&bank.bob, &bank.bob_chequing, "4165550101", amount),
            };
            match result {
                Ok(receipt) => fees += receipt.fee,
                Err(error) => prop_assert_eq!(error.kind(), ErrorKind::InsufficientFunds),
            }
        }

        let accounts = [&bank.alice_chequing, &bank.alice_savings, &bank.bob_chequing];
        let total: Decimal = accounts.iter().map(|account| bank.balance(account)).sum();
        prop_assert_eq!(total + fees, dec!(3000));

        for account_id in accounts {
            let balance = bank.balance(account_id);
            prop_assert!(balance >= Decimal::ZERO);
            let entries = all_entries(&bank, account_id);
            let last = entries.last().map(|entry| entry.post_transaction_balance);
            prop_assert_eq!(last, Some(balance));
        }
    }
}

#[test]
fn test_concurrent_transfers_conserve_money() {
    let bank = open_bank(EngineConfig {
        retry: RetryPolicy::new(10_000, Duration::from_micros(10), Duration::from_millis(1)),
        ..EngineConfig::default()
    });
    let engine = &bank.ledger.engine;
    engine.deposit(&bank.alice, &bank.alice_chequing, dec!(1000)).unwrap();
    engine.deposit(&bank.alice, &bank.alice_savings, dec!(1000)).unwrap();
    engine.deposit(&bank.bob, &bank.bob_chequing, dec!(1000)).unwrap();

    let fees: Vec<Decimal> = thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let bank = &bank;
                scope.spawn(move || {
                    let mut fees = Decimal::ZERO;
                    for round in 0..50 {
                        let engine = &bank.ledger.engine;
                        let result = match (worker + round) % 4 {
                            0 => engine.internal_transfer(
                                &bank.alice,
                                &bank.alice_savings,
                                &bank.alice_chequing,
                                dec!(3),
                            ),
                            1 => engine.internal_transfer(
                                &bank.alice,
                                &bank.alice_chequing,
                                &bank.alice_savings,
                                dec!(2),
                            ),
                            2 => engine.transfer_money(
                                &bank.alice,
                                &bank.alice_chequing,
                                BOB_PHONE,
                                dec!(1),
                            ),
                            _ => engine.transfer_money(
                                &bank.bob,
                                &bank.bob_chequing,
                                "4165550101",
                                dec!(1),
                            ),
                        };
                        match result {
                            Ok(receipt) => fees += receipt.fee,
                            Err(error) => assert_eq!(error.kind(), ErrorKind::InsufficientFunds),
                        }
                    }
                    fees
                })
            })
            .collect();
        workers.into_iter().map(|worker| worker.join().unwrap()).collect()
    });

    let total_fees: Decimal = fees.into_iter().sum();
    let total = bank.balance(&bank.alice_chequing)
        + bank.balance(&bank.alice_savings)
        + bank.balance(&bank.bob_chequing);
    assert_eq!(total + total_fees, dec!(3000));

    for account_id in [&bank.alice_chequing, &bank.alice_savings, &bank.bob_chequing] {
        let balance = bank.balance(account_id);
        assert!(balance >= Decimal::ZERO);
        let entries = all_entries(&bank, account_id);
        assert_eq!(entries.last().unwrap().post_transaction_balance, balance);
    }
}

#[rstest]
fn test_new_accounts_start_empty(bank: Bank) {
    let account = bank
        .ledger
        .accounts
        .create_account(&bank.bob, "Holiday", "savings")
        .unwrap();

    assert_eq!(account.account_type, AccountType::Savings);
    assert_eq!(account.balance, dec!(0));
    assert!(bank.entries(&account.account_id).is_empty());
}
