//! Persistence of reconciled samples.
//!
//! Each connect cycle gets its own `;`-delimited log file named after the
//! connection time (`netbox-data-DD-MM-YYYY-HH-MM.csv`). [`LogWriter`]
//! creates it with a header row and appends one row per written sample;
//! [`read_records`] parses a file back into [`SampleRow`]s.
//!
//! [`SampleRow`]: netbox_core::SampleRow

pub mod config;
pub mod error;
pub mod log;

pub use config::LogConfig;
pub use error::{StorageError, StorageResult};
pub use log::{LogWriter, read_records};
