//! Core constants for the NetBox acquisition bridge.
//!
//! This module centralizes the physical scale factors, default device
//! addresses, and log-file conventions shared by every crate in the
//! workspace. Vendor-specific call arguments (axis settings, packet items,
//! trigger sources) live next to the capability traits in `netbox-hardware`.
//!
//! # Units
//!
//! | Source | Raw value | Divisor |
//! |--------|-----------|---------|
//! | Encoder axis | signed 64-bit ticks | [`ENCODER_TICKS_PER_UNIT`] |
//! | Load-cell channel | `f64` amplifier value | [`LOAD_CELL_SCALE`] |
//!
//! # Usage
//!
//! ```
//! use netbox_core::constants::*;
//!
//! let raw_ticks: i64 = 4_000_000;
//! assert_eq!(raw_ticks as f64 / ENCODER_TICKS_PER_UNIT, 2.0);
//! assert_eq!(LOG_HEADER.len(), 10);
//! ```

// ============================================================================
// Scaling
// ============================================================================

/// Encoder ticks per reported position unit.
///
/// Raw positions are divided by this constant before the tare offset of
/// the axis is subtracted.
pub const ENCODER_TICKS_PER_UNIT: f64 = 2_000_000.0;

/// Divisor applied to every load-cell channel before it is reported.
pub const LOAD_CELL_SCALE: f64 = 1000.0;

// ============================================================================
// Device Topology
// ============================================================================

/// Number of axes an encoder unit exposes.
pub const AXIS_COUNT: usize = 4;

/// Number of packet regions: one global region plus one per axis.
pub const PACKET_REGION_COUNT: usize = AXIS_COUNT + 1;

/// Number of force/torque channels of the load cell.
pub const LOAD_CELL_CHANNELS: usize = 6;

// ============================================================================
// Default Addresses and Timing
// ============================================================================

/// Default IP address of the encoder unit.
pub const DEFAULT_ENCODER_HOST: &str = "192.168.1.2";

/// Default IP address of the force/torque amplifier.
pub const DEFAULT_LOAD_CELL_HOST: &str = "192.168.1.22";

/// Default UDP port of a legacy NetFT load-cell box.
pub const DEFAULT_NETFT_PORT: u16 = 49152;

/// Default HTTP port of the bridge.
pub const DEFAULT_HTTP_PORT: u16 = 4000;

/// Connection timeout handed to the encoder driver (milliseconds).
pub const DEFAULT_CONNECT_TIMEOUT_MS: i32 = 2000;

/// Timer trigger period in microseconds, scaled by the queried tick rate.
pub const TRIGGER_PERIOD_BASE: u32 = 500_000;

/// Timestamp period in microseconds, scaled by the queried tick rate.
pub const TIMESTAMP_PERIOD_BASE: u32 = 1000;

// ============================================================================
// Log Files
// ============================================================================

/// Prefix of every log file name.
pub const LOG_FILE_PREFIX: &str = "netbox-data-";

/// Extension of every log file name.
pub const LOG_FILE_EXTENSION: &str = "csv";

/// `chrono` format of the connection timestamp embedded in log file names.
pub const LOG_FILENAME_TIME_FORMAT: &str = "%d-%m-%Y-%H-%M";

/// `chrono` format of the `Date` column of a log record.
pub const LOG_RECORD_TIME_FORMAT: &str = "%d-%m-%Y-%H:%M:%S";

/// Field delimiter of log files.
pub const LOG_DELIMITER: u8 = b';';

/// Header row of every log file, in column order.
pub const LOG_HEADER: [&str; 10] = [
    "Date",
    "Heidenhain Ax",
    "Heidenhain Ay",
    "Heidenhain Az",
    "Load Cell Fx",
    "Load Cell Fy",
    "Load Cell Fz",
    "Load Cell Tx",
    "Load Cell Ty",
    "Load Cell Tz",
];

/// Default directory log files are written to.
pub const DEFAULT_DATA_DIR: &str = "./data";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_regions_cover_all_axes() {
        assert_eq!(PACKET_REGION_COUNT, 5);
    }

    #[test]
    fn test_log_header_order() {
        assert_eq!(LOG_HEADER[0], "Date");
        assert_eq!(LOG_HEADER[3], "Heidenhain Az");
        assert_eq!(LOG_HEADER[9], "Load Cell Tz");
    }
}
