//! A written log record reads back as the row that was written.

use chrono::{Local, TimeZone};
use netbox_core::{SampleRow, format_record_time, log_filename, parse_record_time};
use netbox_storage::{LogConfig, LogWriter, read_records};
use proptest::prelude::*;
use tempfile::TempDir;

fn channel() -> impl Strategy<Value = f64> {
    prop_oneof![
        -1.0e6..1.0e6f64,
        Just(0.0),
        Just(-0.0),
        Just(f64::MIN_POSITIVE),
    ]
}

fn any_row() -> impl Strategy<Value = SampleRow> {
    (0i64..2_000_000_000, prop::array::uniform9(channel())).prop_map(|(secs, v)| {
        let at = Local.timestamp_opt(secs, 0).unwrap();
        SampleRow {
            date: format_record_time(&at),
            ax: v[0],
            ay: v[1],
            az: v[2],
            fx: v[3],
            fy: v[4],
            fz: v[5],
            tx: v[6],
            ty: v[7],
            tz: v[8],
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_rows_read_back_unchanged(rows in prop::collection::vec(any_row(), 1..20)) {
        let dir = TempDir::new().unwrap();
        let config = LogConfig::new(dir.path());
        let mut log = LogWriter::create(&config, "roundtrip.csv").unwrap();
        for row in &rows {
            log.append(row).unwrap();
        }

        let read = read_records(log.path()).unwrap();
        prop_assert_eq!(read.len(), rows.len());
        for (written, parsed) in rows.iter().zip(&read) {
            prop_assert_eq!(written, parsed);
            prop_assert!(parse_record_time(&parsed.date).is_ok());
        }
    }
}

#[test]
fn test_connect_cycle_filename() {
    let dir = TempDir::new().unwrap();
    let at = Local.with_ymd_and_hms(2026, 10, 19, 14, 5, 0).unwrap();
    let filename = log_filename(&at);
    assert_eq!(filename, "netbox-data-19-10-2026-14-05.csv");

    let log = LogWriter::create(&LogConfig::new(dir.path()), &filename).unwrap();
    assert_eq!(log.path(), dir.path().join(&filename));
    assert!(read_records(log.path()).unwrap().is_empty());
}
