use crate::core::engine::EngineConfig;
use crate::core::fees::DEFAULT_SAVINGS_FEE_RATE;
use crate::core::retry::RetryPolicy;
use crate::strategy::{BatchConfig, ReplayConfig};
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing::warn;

/// Replay a retail banking journal and print the final account balances
#[derive(Parser, Debug)]
#[command(name = "retail-ledger")]
#[command(
    about = "Replay a retail banking journal and print the final account balances",
    long_about = None
)]
pub struct CliArgs {
    /// Input CSV file path containing journal rows
    #[arg(value_name = "INPUT", help = "Path to the input journal CSV file")]
    pub input_file: PathBuf,

    /// Processing strategy to use for replaying the journal
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for parallel batches"
    )]
    pub strategy: StrategyType,

    /// Number of journal rows per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of journal rows per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent workers (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of groups applied concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Optional file receiving every ledger entry
    #[arg(long = "ledger-out", value_name = "FILE")]
    pub ledger_out: Option<PathBuf>,

    /// Fee rate for internal transfers out of Savings accounts
    #[arg(
        long = "savings-fee-rate",
        value_name = "RATE",
        help = "Fee rate on internal transfers out of Savings (default: 0.015)"
    )]
    pub savings_fee_rate: Option<Decimal>,

    /// Attempts per operation when concurrent commits conflict
    #[arg(long = "max-attempts", value_name = "COUNT")]
    pub max_attempts: Option<u32>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long = "log-json")]
    pub log_json: bool,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Zero values fall back to the defaults with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Create an EngineConfig from CLI arguments
    pub fn to_engine_config(&self) -> EngineConfig {
        let default = EngineConfig::default();
        match self.max_attempts {
            Some(max_attempts) => EngineConfig {
                retry: RetryPolicy::new(
                    max_attempts,
                    default.retry.base_delay,
                    default.retry.max_delay,
                ),
                ..default
            },
            None => default,
        }
    }

    /// Savings fee rate; negative rates fall back to the default with a warning
    pub fn savings_fee_rate(&self) -> Decimal {
        match self.savings_fee_rate {
            Some(rate) if rate.is_sign_negative() => {
                warn!(
                    %rate,
                    default = %DEFAULT_SAVINGS_FEE_RATE,
                    "invalid savings fee rate, using default"
                );
                DEFAULT_SAVINGS_FEE_RATE
            }
            Some(rate) => rate,
            None => DEFAULT_SAVINGS_FEE_RATE,
        }
    }

    /// Everything the strategies need, gathered from the arguments
    pub fn to_replay_config(&self) -> ReplayConfig {
        ReplayConfig {
            batch: self.to_batch_config(),
            engine: self.to_engine_config(),
            savings_fee_rate: self.savings_fee_rate(),
            ledger_out: self.ledger_out.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case::default_strategy(&["program", "input.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "input.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "input.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    #[rstest]
    #[case::all_defaults(&["program", "input.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(
        &["program", "--batch-size", "2000", "input.csv"],
        2000,
        num_cpus::get()
    )]
    #[case::custom_max_concurrent(&["program", "--max-concurrent", "8", "input.csv"], 1000, 8)]
    #[case::zero_batch_size(&["program", "--batch-size", "0", "input.csv"], 1000, num_cpus::get())]
    #[case::zero_max_concurrent(
        &["program", "--max-concurrent", "0", "input.csv"],
        1000,
        num_cpus::get()
    )]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }

    #[rstest]
    #[case::default(&["program", "input.csv"], 8)]
    #[case::custom(&["program", "--max-attempts", "3", "input.csv"], 3)]
    #[case::zero(&["program", "--max-attempts", "0", "input.csv"], 8)]
    fn test_engine_config_conversion(#[case] args: &[&str], #[case] expected_attempts: u32) {
        let config = CliArgs::try_parse_from(args).unwrap().to_engine_config();
        assert_eq!(config.retry.max_attempts, expected_attempts);
    }

    #[rstest]
    #[case::default(&["program", "input.csv"], dec!(0.015))]
    #[case::custom(&["program", "--savings-fee-rate", "0.02", "input.csv"], dec!(0.02))]
    #[case::free(&["program", "--savings-fee-rate", "0", "input.csv"], dec!(0))]
    #[case::negative(&["program", "--savings-fee-rate=-0.5", "input.csv"], dec!(0.015))]
    fn test_savings_fee_rate(#[case] args: &[&str], #[case] expected: Decimal) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.savings_fee_rate(), expected);
    }

    #[test]
    fn test_replay_config_collects_everything() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--ledger-out",
            "ledger.csv",
            "--log-level",
            "debug",
            "--log-json",
            "input.csv",
        ])
        .unwrap();

        let config = parsed.to_replay_config();
        assert_eq!(config.ledger_out, Some(PathBuf::from("ledger.csv")));
        assert_eq!(parsed.log_level, "debug");
        assert!(parsed.log_json);
    }

    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "input.csv"])]
    #[case::invalid_fee_rate(&["program", "--savings-fee-rate", "abc", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
