//! Benchmark suite for comparing replay strategies
//!
//! Compares the synchronous and asynchronous strategies on generated journals
//! using the divan benchmarking framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```
//!
//! # Journals
//!
//! Each journal registers `rows / 10` clients with a Chequing and a Savings
//! account, then cycles through deposits, internal transfers out of Savings and
//! transfers by phone to the next client. Clients are linked in small rings so
//! the async strategy finds independent groups to run in parallel.

use retail_ledger::cli::StrategyType;
use retail_ledger::strategy::{create_strategy, ReplayConfig};
use std::io::Write;
use tempfile::NamedTempFile;

const RING: usize = 8;

fn main() {
    divan::main();
}

fn journal(rows: usize) -> NamedTempFile {
    let clients = (rows / 10).max(RING);
    let card = |i: usize| format!("4520{:012}", i);
    let phone = |i: usize| format!("416{:07}", i);

    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(file, "type,client,account,counterparty,amount").expect("Failed to write header");
    for i in 0..clients {
        writeln!(file, "register,{},c{},{},", card(i), i, phone(i)).expect("Failed to write row");
        writeln!(file, "open,{},s{},savings,", card(i), i).expect("Failed to write row");
    }
    for row in 0..rows {
        let i = row % clients;
        let neighbour = i - i % RING + (i + 1) % RING;
        let neighbour = neighbour.min(clients - 1);
        let line = match row / clients % 4 {
            0 => format!("deposit,{},c{},,100", card(i), i),
            1 => format!("deposit,{},s{},,250.75", card(i), i),
            2 => format!("transfer,{},s{},c{},40", card(i), i, i),
            _ => format!("send,{},c{},{},12.5", card(i), i, phone(neighbour)),
        };
        writeln!(file, "{}", line).expect("Failed to write row");
    }
    file.flush().expect("Failed to flush journal");
    file
}

fn replay(bencher: divan::Bencher, strategy: StrategyType, rows: usize) {
    let file = journal(rows);
    bencher.bench_local(|| {
        let mut output = Vec::new();
        create_strategy(strategy, ReplayConfig::default())
            .process(file.path(), &mut output)
            .expect("Processing failed");
        output
    });
}

/// Replay row by row
#[divan::bench(args = [100, 1_000, 10_000])]
fn sync_strategy(bencher: divan::Bencher, rows: usize) {
    replay(bencher, StrategyType::Sync, rows);
}

/// Replay in batches of independent groups
#[divan::bench(args = [100, 1_000, 10_000])]
fn async_strategy(bencher: divan::Bencher, rows: usize) {
    replay(bencher, StrategyType::Async, rows);
}
