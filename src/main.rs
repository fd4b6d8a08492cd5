//! Retail ledger CLI
//!
//! Replays a banking journal (registrations, deposits, transfers, loans) from a
//! CSV file and prints the final account states to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- journal.csv > accounts.csv
//! cargo run -- --strategy sync journal.csv > accounts.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 journal.csv > accounts.csv
//! cargo run -- --ledger-out ledger.csv --savings-fee-rate 0.02 journal.csv > accounts.csv
//! RUST_LOG=retail_ledger=debug cargo run -- --log-json journal.csv > accounts.csv
//! ```
//!
//! # Processing Strategies
//!
//! - **sync**: rows applied one after another
//! - **async**: batches split into independent groups applied in parallel (default)
//!
//! # Exit Codes
//!
//! - 0: Success (rejected journal rows are logged, not fatal)
//! - 1: Error (missing arguments, file not found, output failure, etc.)

use retail_ledger::cli;
use retail_ledger::logging;
use retail_ledger::strategy;
use std::process;

fn main() {
    let args = cli::parse_args();
    logging::init(&args.log_level, args.log_json);

    let strategy = strategy::create_strategy(args.strategy, args.to_replay_config());

    // Output goes to stdout
    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
