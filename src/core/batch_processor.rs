//! Batch processing with dependency-based partitioning for the async strategy
//!
//! # Design
//!
//! A journal row may touch several clients at once (a phone transfer credits
//! someone else, a loan decision involves an administrator). Rows are therefore
//! grouped by the keys they touch rather than by a single client:
//!
//! ```text
//! row keys:   client:<card>  account:<key>  phone:<number>  loan:<key>
//!                 │               │               │              │
//!                 └───────────────┴─── union ─────┴──────────────┘
//!                                       │
//!                     groups = connected components (rows keep file order)
//!                                       │
//!               workers = groups spread over max_concurrent blocking tasks
//! ```
//!
//! The union-find survives across batches, so an account key opened in one
//! batch stays tied to its owner in every later batch. Two rows end up in
//! different groups only if nothing connects them, which makes parallel
//! execution produce the same balances as a sequential replay.
//!
//! # Thread Safety
//!
//! Ledger operations block (commit locks, retry backoff), so groups run on the
//! tokio blocking pool. The shared [`CommandProcessor`] is `Arc`-wrapped.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::processor::CommandProcessor;
use crate::types::{ClientId, Command, LedgerError};
use tracing::{error, warn};

/// Result of applying a single journal row
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The command that was applied
    pub command: Command,

    /// The result of applying it
    pub result: Result<(), LedgerError>,
}

/// Disjoint sets over row keys
#[derive(Debug, Default)]
struct KeyGraph {
    parent: HashMap<String, String>,
}

impl KeyGraph {
    fn find(&mut self, key: &str) -> String {
        let mut root = key.to_string();
        while let Some(parent) = self.parent.get(&root) {
            root = parent.clone();
        }
        // Path compression
        let mut node = key.to_string();
        while node != root {
            let next = self
                .parent
                .insert(node.clone(), root.clone())
                .unwrap_or_else(|| root.clone());
            node = next;
        }
        root
    }

    fn union(&mut self, a: &str, b: &str) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parent.insert(root_b, root_a);
        }
    }
}

/// Keys a command reads or writes
fn touched_keys(command: &Command) -> Vec<String> {
    let client = |card: &ClientId| format!("client:{}", card);
    let account = |key: &str| format!("account:{}", key);
    let loan = |key: &str| format!("loan:{}", key);
    let phone = |number: &str| format!("phone:{}", number);

    match command {
        Command::Register {
            card,
            phone: number,
            account_key,
            ..
        } => vec![client(card), account(account_key), phone(number)],
        Command::Open {
            card, account_key, ..
        }
        | Command::Deposit {
            card, account_key, ..
        }
        | Command::Close { card, account_key } => vec![client(card), account(account_key)],
        Command::Transfer {
            card,
            from_key,
            to_key,
            ..
        } => vec![client(card), account(from_key), account(to_key)],
        Command::Send {
            card,
            account_key,
            phone: number,
            ..
        } => vec![client(card), account(account_key), phone(number)],
        Command::RequestLoan { card, loan_key, .. } => vec![client(card), loan(loan_key)],
        Command::ApproveLoan { admin, loan_key } | Command::DenyLoan { admin, loan_key } => {
            vec![client(admin), loan(loan_key)]
        }
        Command::RepayLoan { loan_key, .. } => vec![loan(loan_key)],
    }
}

/// Batch processor with dependency-based partitioning
pub struct BatchProcessor {
    processor: Arc<CommandProcessor>,
    graph: KeyGraph,
    max_concurrent: usize,
}

impl BatchProcessor {
    /// Create a new BatchProcessor
    ///
    /// # Arguments
    ///
    /// * `processor` - Shared command processor
    /// * `max_concurrent` - Number of blocking workers per batch (at least 1)
    pub fn new(processor: Arc<CommandProcessor>, max_concurrent: usize) -> Self {
        Self {
            processor,
            graph: KeyGraph::default(),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Split a batch into groups of rows that must run in order
    ///
    /// # Guarantees
    ///
    /// - Each row appears in exactly one group
    /// - Rows inside a group keep their original order
    /// - Groups are listed in order of their first row
    pub fn partition(&mut self, batch: Vec<Command>) -> Vec<Vec<Command>> {
        let keys: Vec<Vec<String>> = batch.iter().map(touched_keys).collect();
        for row_keys in &keys {
            if let Some((first, rest)) = row_keys.split_first() {
                for key in rest {
                    self.graph.union(first, key);
                }
            }
        }

        let mut group_of_root: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<Vec<Command>> = Vec::new();
        for (command, row_keys) in batch.into_iter().zip(keys) {
            let root = row_keys
                .first()
                .map(|key| self.graph.find(key))
                .unwrap_or_default();
            let index = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[index].push(command);
        }
        groups
    }

    /// Apply every row of one batch, independent groups in parallel
    ///
    /// # Returns
    ///
    /// One `ProcessingResult` per row. Results of different groups may be
    /// interleaved; results of one group keep file order.
    pub async fn process_batch(&mut self, batch: Vec<Command>) -> Vec<ProcessingResult> {
        let groups = self.partition(batch);

        // Spread groups over the workers, biggest first
        let mut ordered = groups;
        ordered.sort_by_key(|group| std::cmp::Reverse(group.len()));
        let mut workers: Vec<Vec<Vec<Command>>> =
            vec![Vec::new(); self.max_concurrent.min(ordered.len())];
        let mut loads = vec![0usize; workers.len()];
        for group in ordered {
            let Some(lightest) = (0..workers.len()).min_by_key(|&worker| loads[worker]) else {
                break;
            };
            loads[lightest] += group.len();
            workers[lightest].push(group);
        }

        let mut tasks = Vec::with_capacity(workers.len());
        for groups in workers {
            let processor = Arc::clone(&self.processor);
            tasks.push(tokio::task::spawn_blocking(move || {
                groups
                    .into_iter()
                    .flatten()
                    .map(|command| {
                        let result = processor.apply(&command);
                        if let Err(e) = &result {
                            warn!(command = command.name(), error = %e, "journal row rejected");
                        }
                        ProcessingResult { command, result }
                    })
                    .collect::<Vec<_>>()
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(worker_results) => results.extend(worker_results),
                Err(e) => error!(error = %e, "batch worker panicked"),
            }
        }
        results
    }
}
