//! Synchronous processing strategy
//!
//! Single-threaded replay: every journal row is applied in file order.
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Business rules to the `CommandProcessor` and the ledger behind it
//! - CSV output to `csv_format` (through [`ReplayConfig::finish`])
//!
//! Rows are streamed one at a time; memory grows with the ledger, not with
//! the journal file.

use crate::io::sync_reader::SyncReader;
use crate::strategy::{ProcessingStrategy, ReplayConfig};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use retail_ledger::strategy::{ProcessingStrategy, ReplayConfig, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(ReplayConfig::default());
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("journal.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncProcessingStrategy {
    config: ReplayConfig,
}

impl SyncProcessingStrategy {
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Replay the journal row by row
    ///
    /// Fatal errors (file not found, output failures) are returned immediately.
    /// Malformed and rejected rows are logged and processing continues.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let processor = self.config.processor();
        let reader = SyncReader::new(input_path)?;

        let mut applied = 0usize;
        let mut rejected = 0usize;
        for result in reader {
            match result {
                Ok(command) => match processor.apply(&command) {
                    Ok(()) => applied += 1,
                    Err(e) => {
                        rejected += 1;
                        warn!(command = command.name(), error = %e, "journal row rejected");
                    }
                },
                Err(e) => {
                    rejected += 1;
                    warn!(error = %e, "skipping journal row");
                }
            }
        }
        info!(applied, rejected, "journal replayed");

        self.config.finish(&processor, output)
    }
}
