//! Append-only measurement log.
//!
//! One file per connect cycle. The header row is written when the file is
//! created; every sample written afterwards is one `;`-delimited row in the
//! column order of [`LOG_HEADER`].

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, info};

use netbox_core::SampleRow;
use netbox_core::constants::{LOG_DELIMITER, LOG_HEADER};

use crate::config::LogConfig;
use crate::error::{StorageError, StorageResult};

/// Writer for one log file.
///
/// # Example
///
/// ```no_run
/// use netbox_core::SampleRow;
/// use netbox_storage::{LogConfig, LogWriter};
///
/// # fn example() -> netbox_storage::StorageResult<()> {
/// let config = LogConfig::new("./data");
/// let mut log = LogWriter::create(&config, "netbox-data-19-10-2026-14-05.csv")?;
/// log.append(&SampleRow {
///     date: "19-10-2026-14:05:12".to_string(),
///     ax: 0.5,
///     ay: 0.0,
///     az: 0.0,
///     fx: 0.0,
///     fy: 0.0,
///     fz: 0.0,
///     tx: 0.0,
///     ty: 0.0,
///     tz: 0.0,
/// })?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LogWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    records: u64,
}

impl LogWriter {
    /// Open `filename` inside the configured directory.
    ///
    /// A missing file is created with the header row; an existing file is
    /// appended to as is, so reconnecting within the same minute keeps a
    /// single header.
    ///
    /// # Errors
    ///
    /// Returns an error if `filename` is not a plain file name, or if the
    /// directory or file cannot be created.
    pub fn create(config: &LogConfig, filename: &str) -> StorageResult<Self> {
        if filename.is_empty() || Path::new(filename).file_name() != Some(filename.as_ref()) {
            return Err(StorageError::Configuration(format!(
                "log filename must be a plain file name: {filename:?}"
            )));
        }

        if !config.data_dir.exists() {
            if !config.create_dir {
                return Err(StorageError::Configuration(format!(
                    "data directory does not exist: {}",
                    config.data_dir.display()
                )));
            }
            fs::create_dir_all(&config.data_dir)?;
        }

        let path = config.path_of(filename);
        let is_new = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = WriterBuilder::new()
            .delimiter(LOG_DELIMITER)
            .has_headers(false)
            .from_writer(file);

        if is_new {
            writer.write_record(LOG_HEADER)?;
            writer.flush()?;
            info!(path = %path.display(), "Log file created");
        } else {
            info!(path = %path.display(), "Appending to existing log file");
        }

        Ok(Self {
            path,
            writer,
            records: 0,
        })
    }

    /// Append one row and flush it to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be written.
    pub fn append(&mut self, row: &SampleRow) -> StorageResult<()> {
        self.writer.serialize(row)?;
        self.writer.flush()?;
        self.records += 1;
        debug!(records = self.records, "Log record appended");
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended through this writer.
    #[must_use]
    pub fn records(&self) -> u64 {
        self.records
    }
}

/// Read every row of a log file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, its header differs from
/// [`LOG_HEADER`], or a row cannot be parsed.
pub fn read_records(path: impl AsRef<Path>) -> StorageResult<Vec<SampleRow>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(LOG_DELIMITER)
        .from_path(path.as_ref())?;

    let header = reader.headers()?;
    if !header.iter().eq(LOG_HEADER) {
        return Err(StorageError::InvalidHeader(header.iter().collect::<Vec<_>>().join(";")));
    }

    let mut rows = Vec::new();
    for result in reader.deserialize::<SampleRow>() {
        let row = result.map_err(|e| match e.position() {
            Some(pos) => StorageError::InvalidRecord {
                line: pos.line(),
                message: e.to_string(),
            },
            None => StorageError::Csv(e),
        })?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn row(date: &str, ax: f64) -> SampleRow {
        SampleRow {
            date: date.to_string(),
            ax,
            ay: -0.25,
            az: 0.0,
            fx: 1.5,
            fy: 2.5,
            fz: 3.5,
            tx: 0.001,
            ty: -0.002,
            tz: 0.003,
        }
    }

    #[test]
    fn test_new_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig::new(dir.path());
        let log = LogWriter::create(&config, "a.csv").unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            content,
            "Date;Heidenhain Ax;Heidenhain Ay;Heidenhain Az;Load Cell Fx;Load Cell Fy;\
             Load Cell Fz;Load Cell Tx;Load Cell Ty;Load Cell Tz\n"
        );
    }

    #[test]
    fn test_rows_are_semicolon_delimited() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig::new(dir.path());
        let mut log = LogWriter::create(&config, "a.csv").unwrap();
        log.append(&row("19-10-2026-14:05:12", 1.0)).unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        let last = content.lines().last().unwrap();
        assert_eq!(last.split(';').count(), 10);
        assert!(last.starts_with("19-10-2026-14:05:12;1.0;-0.25;"));
        assert_eq!(log.records(), 1);
    }

    #[test]
    fn test_reopen_appends_without_second_header() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig::new(dir.path());
        {
            let mut log = LogWriter::create(&config, "a.csv").unwrap();
            log.append(&row("19-10-2026-14:05:12", 1.0)).unwrap();
        }
        let mut log = LogWriter::create(&config, "a.csv").unwrap();
        log.append(&row("19-10-2026-14:05:13", 2.0)).unwrap();

        let rows = read_records(log.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].ax, 2.0);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig::new(dir.path().join("nested").join("data"));
        let log = LogWriter::create(&config, "a.csv").unwrap();
        assert!(log.path().exists());
    }

    #[test]
    fn test_missing_directory_without_create() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig::new(dir.path().join("absent")).create_dir(false);
        assert!(matches!(
            LogWriter::create(&config, "a.csv"),
            Err(StorageError::Configuration(_))
        ));
    }

    #[rstest]
    #[case("")]
    #[case("../escape.csv")]
    #[case("sub/dir.csv")]
    fn test_rejects_non_plain_filenames(#[case] filename: &str) {
        let dir = TempDir::new().unwrap();
        let config = LogConfig::new(dir.path());
        assert!(matches!(
            LogWriter::create(&config, filename),
            Err(StorageError::Configuration(_))
        ));
    }

    #[test]
    fn test_read_rejects_foreign_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("other.csv");
        fs::write(&path, "a;b;c\n1;2;3\n").unwrap();
        assert!(matches!(
            read_records(&path),
            Err(StorageError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_read_reports_bad_row_line() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig::new(dir.path());
        let log = LogWriter::create(&config, "a.csv").unwrap();
        let mut content = fs::read_to_string(log.path()).unwrap();
        content.push_str("19-10-2026-14:05:12;oops;0;0;0;0;0;0;0;0\n");
        fs::write(log.path(), content).unwrap();

        assert!(matches!(
            read_records(log.path()),
            Err(StorageError::InvalidRecord { line: 2, .. })
        ));
    }
}
