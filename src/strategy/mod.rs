//! Processing strategy module for journal replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! encompassing both CSV parsing and ledger processing. Different
//! implementations (synchronous, asynchronous batch) are selected at runtime
//! and produce the same final account states.

use crate::cli::StrategyType;
use crate::core::engine::EngineConfig;
use crate::core::fees::{AccountTypeFeePolicy, DEFAULT_SAVINGS_FEE_RATE};
use crate::core::ids::SequentialIds;
use crate::core::ledger::Ledger;
use crate::core::processor::CommandProcessor;
use crate::io::csv_format::{write_accounts_csv, write_ledger_csv};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete replay pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Replay a journal and write the final account states to output
    ///
    /// # Arguments
    ///
    /// * `input_path` - Path to the journal CSV file
    /// * `output` - Writer receiving the accounts CSV
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the replay completed (rejected rows are logged, not fatal)
    /// * `Err(String)` if a fatal error occurred
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened
    /// - The tokio runtime cannot be created
    /// - Output (or the ledger export) cannot be written
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String>;
}

/// Settings shared by every strategy
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Batching, used by the async strategy only
    pub batch: BatchConfig,
    pub engine: EngineConfig,
    /// Fee charged on internal transfers out of Savings accounts
    pub savings_fee_rate: Decimal,
    /// Where to export every ledger entry, if anywhere
    pub ledger_out: Option<PathBuf>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            engine: EngineConfig::default(),
            savings_fee_rate: DEFAULT_SAVINGS_FEE_RATE,
            ledger_out: None,
        }
    }
}

impl ReplayConfig {
    /// A fresh ledger and processor configured for replay
    ///
    /// Identifiers are sequential so replays of the same journal are
    /// reproducible.
    pub(crate) fn processor(&self) -> CommandProcessor {
        let ledger = Ledger::builder()
            .ids(Arc::new(SequentialIds::new()))
            .fees(Arc::new(AccountTypeFeePolicy::new(
                Decimal::ZERO,
                self.savings_fee_rate,
            )))
            .config(self.engine)
            .build();
        CommandProcessor::new(ledger)
    }

    /// Write the accounts CSV, then the ledger export if one was requested
    pub(crate) fn finish(
        &self,
        processor: &CommandProcessor,
        output: &mut dyn Write,
    ) -> Result<(), String> {
        let accounts = processor
            .accounts_snapshot()
            .map_err(|e| format!("Failed to collect accounts: {}", e))?;
        write_accounts_csv(&accounts, output)?;

        if let Some(path) = &self.ledger_out {
            let entries = processor
                .ledger_snapshot()
                .map_err(|e| format!("Failed to collect ledger entries: {}", e))?;
            let file = File::create(path)
                .map_err(|e| format!("Failed to create file '{}': {}", path.display(), e))?;
            let mut writer = BufWriter::new(file);
            write_ledger_csv(&entries, &mut writer)?;
            writer
                .flush()
                .map_err(|e| format!("Failed to flush '{}': {}", path.display(), e))?;
        }
        Ok(())
    }
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Replay settings; batching only applies to the async strategy
///
/// # Returns
///
/// A boxed trait object implementing the ProcessingStrategy trait
pub fn create_strategy(
    strategy_type: StrategyType,
    config: ReplayConfig,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(config)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(config)),
    }
}
