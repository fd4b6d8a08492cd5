//! Asynchronous batch processing strategy
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── ReplayConfig
//!     │       └── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (dependency partitioning + blocking workers)
//!     └── CommandProcessor (shared, thread-safe)
//!             └── Ledger (MemoryStore, engine, services)
//! ```
//!
//! # Parallelism
//!
//! - Batches are processed one after another
//! - Within a batch, rows are grouped by the keys they touch; unrelated groups
//!   run in parallel on the tokio blocking pool
//! - Rows of one group keep file order, so the final account states equal
//!   those of the sync strategy

use crate::core::batch_processor::BatchProcessor;
use crate::io::async_reader::AsyncReader;
use crate::strategy::{ProcessingStrategy, ReplayConfig};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of journal rows per batch
    pub batch_size: usize,
    /// Number of groups applied concurrently (and runtime worker threads)
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig, replacing zero values by the defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "invalid max concurrent batches, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone, Default)]
pub struct AsyncProcessingStrategy {
    config: ReplayConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay the journal batch by batch
    ///
    /// 1. Creates a tokio multi-threaded runtime
    /// 2. Reads rows in batches from the journal using AsyncReader
    /// 3. Applies each batch through the BatchProcessor, waiting for it to
    ///    complete before reading the next
    /// 4. Writes the final account states (and the optional ledger export)
    ///
    /// Fatal errors (file not found, runtime or output errors) are returned.
    /// Rejected rows are logged and processing continues.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let batch = &self.config.batch;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(batch.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        let processor = Arc::new(self.config.processor());

        runtime.block_on(async {
            let mut batches =
                BatchProcessor::new(Arc::clone(&processor), batch.max_concurrent_batches);

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // csv-async reads futures::io, tokio files need the compat layer
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut applied = 0usize;
            let mut rejected = 0usize;
            loop {
                let rows = reader.read_batch(batch.batch_size).await;
                if rows.is_empty() {
                    break;
                }

                for result in batches.process_batch(rows).await {
                    if result.result.is_ok() {
                        applied += 1;
                    } else {
                        rejected += 1;
                    }
                }
            }
            info!(applied, rejected, "journal replayed");
            Ok::<(), String>(())
        })?;

        self.config.finish(&processor, output)
    }
}
