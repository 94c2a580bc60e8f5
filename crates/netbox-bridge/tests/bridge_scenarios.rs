//! End-to-end scenarios over mock devices.

use chrono::{DateTime, Local, TimeZone};
use netbox_bridge::{Bridge, BridgeConfig, BridgeError};
use netbox_core::{LoadCellBlock, TareOffsets};
use netbox_hardware::mock::{
    EncoderCall, LoadCellCall, MockEncoder, MockEncoderHandle, MockLoadCell, MockLoadCellHandle,
};
use netbox_hardware::{ConfigWriteResult, SessionState, VendorCode};
use netbox_storage::{LogConfig, read_records};
use proptest::prelude::*;
use tempfile::TempDir;

struct Rig {
    bridge: Bridge<MockEncoder, MockLoadCell>,
    encoder: MockEncoderHandle,
    load_cell: MockLoadCellHandle,
    dir: TempDir,
}

fn fixed_clock() -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 10, 19, 14, 5, 12).unwrap()
}

fn rig() -> Rig {
    let dir = TempDir::new().unwrap();
    let (encoder_driver, encoder) = MockEncoder::new();
    let (load_cell_driver, load_cell) = MockLoadCell::new();
    let config = BridgeConfig::default().with_log(LogConfig::new(dir.path()));
    let bridge = Bridge::new(encoder_driver, load_cell_driver, config).with_clock(fixed_clock);
    Rig {
        bridge,
        encoder,
        load_cell,
        dir,
    }
}

fn block(seq: f64) -> LoadCellBlock {
    LoadCellBlock {
        timestamp: seq,
        fx: 100.0 * seq,
        fy: 200.0 * seq,
        fz: 300.0 * seq,
        tx: 1.0,
        ty: 2.0,
        tz: 3.0,
    }
}

#[test]
fn test_connect_names_log_after_connection_time() {
    let mut rig = rig();
    let info = rig.bridge.connect().unwrap();

    assert_eq!(info.filename, "netbox-data-19-10-2026-14-05.csv");
    assert!(rig.dir.path().join(&info.filename).exists());
    let status = rig.bridge.status();
    assert!(status.connected);
    assert_eq!(status.encoder, SessionState::Ready);
    assert_eq!(status.load_cell, SessionState::Ready);
    assert_eq!(status.measurement.unwrap().filename, info.filename);
}

#[test]
fn test_tare_subtracts_scaled_first_reading() {
    let mut rig = rig();
    rig.bridge.connect().unwrap();

    rig.encoder.push_positions([2_000_000, 4_000_000, 6_000_000, 0]);
    let tare = rig.bridge.tare_encoder().unwrap();
    assert_eq!(
        tare,
        TareOffsets {
            x: 1.0,
            y: 2.0,
            z: 3.0
        }
    );

    rig.encoder.push_positions([2_000_000, 4_000_000, 6_000_000, 0]);
    let response = rig.bridge.sample(false).unwrap().response();
    assert_eq!((response.ax, response.ay, response.az), (0.0, 0.0, 0.0));
}

#[test]
fn test_written_row_reads_back() {
    let mut rig = rig();
    let info = rig.bridge.connect().unwrap();

    rig.encoder.push_positions([1_000_000, -3_000_000, 5, 0]);
    rig.load_cell.push_block(block(1.0));
    let reading = rig.bridge.sample(true).unwrap();

    let rows = read_records(rig.dir.path().join(info.filename)).unwrap();
    assert_eq!(rows, vec![reading.row.clone()]);
    assert_eq!(reading.row.date, "19-10-2026-14:05:12");
    assert_eq!(rig.bridge.context().unwrap().records_written(), 1);
}

#[test]
fn test_sample_without_write_leaves_log_untouched() {
    let mut rig = rig();
    let info = rig.bridge.connect().unwrap();
    rig.bridge.sample(false).unwrap();
    assert!(read_records(rig.dir.path().join(info.filename)).unwrap().is_empty());
}

#[test]
fn test_drain_keeps_last_block_and_reuses_it() {
    let mut rig = rig();
    rig.bridge.connect().unwrap();
    rig.load_cell.clear_calls();

    for seq in 1..=3 {
        rig.load_cell.push_block(block(f64::from(seq)));
    }
    let first = rig.bridge.sample(false).unwrap();
    assert_eq!(first.block, block(3.0));

    let calls = rig.load_cell.calls();
    let reads = calls
        .iter()
        .filter(|c| **c == LoadCellCall::ReadNextBlock)
        .count();
    assert_eq!(reads, 3);
    let counts: Vec<i32> = calls
        .iter()
        .filter_map(|c| match c {
            LoadCellCall::AvailableLines(n) => Some(*n),
            _ => None,
        })
        .collect();
    assert_eq!(counts, vec![3, 2, 1, 0]);

    let second = rig.bridge.sample(false).unwrap();
    assert_eq!(second.block, block(3.0));
    assert_eq!(second.response().fz, 0.6);
}

#[test]
fn test_second_connect_fails_fast() {
    let mut rig = rig();
    let first = rig.bridge.connect().unwrap();
    rig.encoder.clear_calls();
    rig.load_cell.clear_calls();

    let err = rig.bridge.connect().unwrap_err();
    assert!(matches!(err, BridgeError::AlreadyConnected));
    assert_eq!(err.kind(), "already_connected");
    assert!(rig.encoder.calls().is_empty());
    assert!(rig.load_cell.calls().is_empty());

    assert_eq!(
        rig.bridge.context().unwrap().log_filename(),
        first.filename
    );
    assert!(rig.bridge.sample(false).is_ok());
}

#[test]
fn test_encoder_open_failure_reports_step() {
    let mut rig = rig();
    rig.encoder
        .fail_on(EncoderCall::GetTimerTriggerTicks, VendorCode(-42));

    let err = rig.bridge.connect().unwrap_err();
    assert_eq!(err.kind(), "device_protocol");
    assert_eq!(err.step_index(), Some(14));
    assert!(!rig.bridge.is_connected());
    assert!(!rig.load_cell.is_connected());
    assert!(!rig.encoder.is_open());
}

#[test]
fn test_load_cell_open_failure_closes_encoder() {
    let mut rig = rig();
    rig.load_cell.refuse_connections();

    let err = rig.bridge.connect().unwrap_err();
    assert_eq!(err.step_index(), Some(1));
    assert!(!rig.encoder.is_open());
    assert_eq!(rig.bridge.status().encoder, SessionState::Disconnected);
    assert!(
        std::fs::read_dir(rig.dir.path()).unwrap().next().is_none(),
        "no log file without devices"
    );
}

#[test]
fn test_operations_need_connection() {
    let mut rig = rig();
    assert!(matches!(rig.bridge.sample(false), Err(BridgeError::NotConnected)));
    assert!(matches!(rig.bridge.tare_encoder(), Err(BridgeError::NotConnected)));
    assert!(matches!(rig.bridge.tare_load_cell(), Err(BridgeError::NotConnected)));
    assert!(matches!(rig.bridge.disconnect(), Err(BridgeError::NotConnected)));
}

#[test]
fn test_load_cell_tare_results() {
    let mut rig = rig();
    rig.bridge.connect().unwrap();
    assert_eq!(rig.bridge.tare_load_cell().unwrap(), ConfigWriteResult::Ok);

    rig.load_cell.fail_on(
        LoadCellCall::SdoWrite(netbox_hardware::ConfigTarget::zero_offset()),
        VendorCode::UNSUCCESSFUL,
    );
    assert_eq!(
        rig.bridge.tare_load_cell().unwrap(),
        ConfigWriteResult::Unsuccessful
    );
}

#[test]
fn test_reconnect_starts_fresh_measurement() {
    let mut rig = rig();
    let first = rig.bridge.connect().unwrap();
    rig.encoder.push_positions([2_000_000, 0, 0, 0]);
    rig.bridge.tare_encoder().unwrap();
    rig.load_cell.push_block(block(1.0));
    rig.bridge.sample(false).unwrap();

    rig.bridge.disconnect().unwrap();
    assert!(!rig.encoder.is_open());
    assert!(!rig.load_cell.is_connected());

    let second = rig.bridge.connect().unwrap();
    assert_ne!(first.session_id, second.session_id);
    assert_eq!(*rig.bridge.context().unwrap().tare(), TareOffsets::default());
    let reading = rig.bridge.sample(false).unwrap();
    assert_eq!(reading.block, LoadCellBlock::default());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Two tares without motion store bit-identical offsets.
    #[test]
    fn prop_tare_is_idempotent(positions in prop::array::uniform4(any::<i64>())) {
        let mut rig = rig();
        rig.bridge.connect().unwrap();

        rig.encoder.push_positions(positions);
        let first = rig.bridge.tare_encoder().unwrap();
        rig.encoder.push_positions(positions);
        let second = rig.bridge.tare_encoder().unwrap();

        prop_assert_eq!(first.x.to_bits(), second.x.to_bits());
        prop_assert_eq!(first.y.to_bits(), second.y.to_bits());
        prop_assert_eq!(first.z.to_bits(), second.z.to_bits());
    }
}

#[test]
fn test_reset_drops_measurement_and_allows_reconnect() {
    let mut rig = rig();
    rig.bridge.connect().unwrap();

    rig.bridge.reset();
    let status = rig.bridge.status();
    assert!(!status.connected);
    assert_eq!(status.encoder, SessionState::Disconnected);
    assert_eq!(status.load_cell, SessionState::Disconnected);
    assert!(!rig.encoder.is_open());
    assert!(!rig.load_cell.is_connected());

    rig.bridge.connect().unwrap();
    assert!(rig.bridge.is_connected());
}
