//! Per-measurement state.
//!
//! A [`MeasurementContext`] lives from a successful connect to the next
//! disconnect. It holds what the browser client used to keep in its
//! cookie session: the encoder tare offsets and the active log file.

use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;
use uuid::Uuid;

use netbox_core::{SampleRow, TareOffsets, log_filename};
use netbox_storage::{LogConfig, LogWriter, StorageResult};

/// State of one measurement session.
#[derive(Debug)]
pub struct MeasurementContext {
    id: Uuid,
    started_at: DateTime<Local>,
    tare: TareOffsets,
    log_filename: String,
    log: LogWriter,
}

impl MeasurementContext {
    /// Start a measurement at `started_at`, creating its log file.
    ///
    /// Tare offsets start at zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be created.
    pub fn start(config: &LogConfig, started_at: DateTime<Local>) -> StorageResult<Self> {
        let log_filename = log_filename(&started_at);
        let log = LogWriter::create(config, &log_filename)?;
        Ok(Self {
            id: Uuid::new_v4(),
            started_at,
            tare: TareOffsets::default(),
            log_filename,
            log,
        })
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    #[must_use]
    pub fn tare(&self) -> &TareOffsets {
        &self.tare
    }

    pub fn set_tare(&mut self, tare: TareOffsets) {
        self.tare = tare;
    }

    /// File name of the active log, without directory.
    #[must_use]
    pub fn log_filename(&self) -> &str {
        &self.log_filename
    }

    #[must_use]
    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    /// Rows written during this measurement.
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.log.records()
    }

    pub(crate) fn append(&mut self, row: &SampleRow) -> StorageResult<()> {
        self.log.append(row)
    }

    /// Serializable snapshot for status reporting.
    #[must_use]
    pub fn summary(&self) -> ContextSummary {
        ContextSummary {
            id: self.id,
            started_at: self.started_at.to_rfc3339(),
            filename: self.log_filename.clone(),
            records_written: self.log.records(),
            tare: self.tare,
        }
    }
}

/// Snapshot of a [`MeasurementContext`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSummary {
    pub id: Uuid,
    pub started_at: String,
    pub filename: String,
    pub records_written: u64,
    pub tare: TareOffsets,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_start_creates_named_log_with_zero_tare() {
        let dir = TempDir::new().unwrap();
        let at = Local.with_ymd_and_hms(2026, 3, 7, 9, 30, 0).unwrap();
        let ctx = MeasurementContext::start(&LogConfig::new(dir.path()), at).unwrap();

        assert_eq!(ctx.log_filename(), "netbox-data-07-03-2026-09-30.csv");
        assert!(ctx.log_path().exists());
        assert_eq!(*ctx.tare(), TareOffsets::default());
        assert_eq!(ctx.records_written(), 0);
    }

    #[test]
    fn test_each_context_has_its_own_id() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig::new(dir.path());
        let a = MeasurementContext::start(&config, Local::now()).unwrap();
        let b = MeasurementContext::start(&config, Local::now()).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
