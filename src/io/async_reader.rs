//! Asynchronous journal reader with batch interface
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - tokio (through the futures compat layer) for file access
//! - Batch reading so the async strategy can partition and apply rows in chunks
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of Commands
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::Command;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous journal reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 0,
        }
    }

    /// Read a batch of journal commands
    ///
    /// Reads until `batch_size` commands were collected or the input ends.
    /// Malformed rows are logged and skipped; they do not count towards the
    /// batch size.
    ///
    /// # Returns
    ///
    /// The converted commands in file order. An empty vector means the end of
    /// the input was reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<Command> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            let Some(item) = records.next().await else {
                break;
            };
            self.line_num += 1;
            let line = self.line_num + 1;
            match item {
                Ok(csv_record) => match convert_csv_record(csv_record) {
                    Ok(command) => batch.push(command),
                    Err(e) => warn!(line, error = %e, "skipping journal row"),
                },
                Err(e) => warn!(line, error = %e, "CSV parse error"),
            }
        }

        batch
    }
}
