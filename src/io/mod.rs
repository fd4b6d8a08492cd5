//! I/O module
//!
//! Handles journal parsing and CSV output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (row conversion, output serialization)
//! - `sync_reader` - Synchronous journal reader with iterator interface
//! - `async_reader` - Asynchronous journal reader with batch reading interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{convert_csv_record, write_accounts_csv, write_ledger_csv, CsvRecord};
pub use sync_reader::SyncReader;
