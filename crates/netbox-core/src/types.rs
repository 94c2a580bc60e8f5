use crate::{
    Result,
    constants::{
        AXIS_COUNT, ENCODER_TICKS_PER_UNIT, LOAD_CELL_SCALE, LOG_FILE_EXTENSION, LOG_FILE_PREFIX,
        LOG_FILENAME_TIME_FORMAT, LOG_RECORD_TIME_FORMAT,
    },
    error::Error,
};
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Encoder axis position (0-3).
///
/// Axis indices are restricted at the type level, so an out-of-range axis
/// cannot reach a driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum AxisIndex {
    X = 0,
    Y = 1,
    Z = 2,
    W = 3,
}

impl AxisIndex {
    /// All axes in device order.
    pub const ALL: [AxisIndex; AXIS_COUNT] = [Self::X, Self::Y, Self::Z, Self::W];

    /// Create an axis index with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidAxisIndex` for values above 3.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::X),
            1 => Ok(Self::Y),
            2 => Ok(Self::Z),
            3 => Ok(Self::W),
            other => Err(Error::InvalidAxisIndex(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn as_usize(self) -> usize {
        self as usize
    }

    /// Packet region that carries this axis. Region 0 is the global region.
    #[must_use]
    pub fn packet_region(self) -> u8 {
        self as u8 + 1
    }
}

impl TryFrom<u8> for AxisIndex {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_u8(value)
    }
}

impl From<AxisIndex> for u8 {
    fn from(axis: AxisIndex) -> Self {
        axis.as_u8()
    }
}

impl fmt::Display for AxisIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl std::str::FromStr for AxisIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidAxisIndex(s.to_string()))?;
        Self::from_u8(value)
    }
}

/// Ordered, duplicate-free, non-empty set of axes to initialize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<AxisIndex>", into = "Vec<AxisIndex>")]
pub struct AxisSelection(Vec<AxisIndex>);

impl AxisSelection {
    /// Create a selection from any list of axes.
    ///
    /// The axes are sorted and deduplicated.
    ///
    /// # Errors
    /// Returns `Error::EmptyAxisSelection` if no axis is given.
    pub fn new(axes: impl IntoIterator<Item = AxisIndex>) -> Result<Self> {
        let mut axes: Vec<AxisIndex> = axes.into_iter().collect();
        axes.sort();
        axes.dedup();
        if axes.is_empty() {
            return Err(Error::EmptyAxisSelection);
        }
        Ok(Self(axes))
    }

    /// Selection of all four axes.
    #[must_use]
    pub fn all() -> Self {
        Self(AxisIndex::ALL.to_vec())
    }

    pub fn iter(&self) -> impl Iterator<Item = AxisIndex> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn contains(&self, axis: AxisIndex) -> bool {
        self.0.contains(&axis)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for AxisSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl TryFrom<Vec<AxisIndex>> for AxisSelection {
    type Error = Error;

    fn try_from(axes: Vec<AxisIndex>) -> Result<Self> {
        Self::new(axes)
    }
}

impl From<AxisSelection> for Vec<AxisIndex> {
    fn from(selection: AxisSelection) -> Self {
        selection.0
    }
}

impl std::str::FromStr for AxisSelection {
    type Err = Error;

    /// Parse a comma separated list such as `"0,1,2,3"`.
    fn from_str(s: &str) -> Result<Self> {
        let axes = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<AxisIndex>>>()?;
        Self::new(axes)
    }
}

impl fmt::Display for AxisSelection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// One FIFO entry extracted from the encoder's streaming packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSample {
    /// Global trigger counter.
    pub trigger_counter: u16,

    /// Timestamp of the axis 1 region.
    pub timestamp: u32,

    /// Status word of the axis 1 region.
    pub status: u16,

    /// Raw positions in ticks, indexed by axis.
    pub positions: [i64; AXIS_COUNT],
}

impl EncoderSample {
    #[must_use]
    pub fn position(&self, axis: AxisIndex) -> i64 {
        self.positions[axis.as_usize()]
    }

    /// Position of `axis` converted to reported units (not tared).
    #[must_use]
    pub fn scaled_position(&self, axis: AxisIndex) -> f64 {
        ticks_to_units(self.position(axis))
    }
}

/// One buffered force/torque line drained from the load cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadCellBlock {
    pub timestamp: f64,
    pub fx: f64,
    pub fy: f64,
    pub fz: f64,
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
}

/// Zero-offsets of the three logged encoder axes, in reported units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TareOffsets {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl TareOffsets {
    /// Capture the scaled positions of `sample` as the new zero reference.
    #[must_use]
    pub fn capture(sample: &EncoderSample) -> Self {
        Self {
            x: sample.scaled_position(AxisIndex::X),
            y: sample.scaled_position(AxisIndex::Y),
            z: sample.scaled_position(AxisIndex::Z),
        }
    }

    /// Scaled and tared position of `axis`. Axis W carries no offset.
    #[must_use]
    pub fn apply(&self, sample: &EncoderSample, axis: AxisIndex) -> f64 {
        let offset = match axis {
            AxisIndex::X => self.x,
            AxisIndex::Y => self.y,
            AxisIndex::Z => self.z,
            AxisIndex::W => 0.0,
        };
        sample.scaled_position(axis) - offset
    }
}

/// A reconciled row: three tared encoder axes and six scaled load-cell
/// channels. Field names map one-to-one to the log file header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    #[serde(rename = "Date")]
    pub date: String,

    #[serde(rename = "Heidenhain Ax")]
    pub ax: f64,

    #[serde(rename = "Heidenhain Ay")]
    pub ay: f64,

    #[serde(rename = "Heidenhain Az")]
    pub az: f64,

    #[serde(rename = "Load Cell Fx")]
    pub fx: f64,

    #[serde(rename = "Load Cell Fy")]
    pub fy: f64,

    #[serde(rename = "Load Cell Fz")]
    pub fz: f64,

    #[serde(rename = "Load Cell Tx")]
    pub tx: f64,

    #[serde(rename = "Load Cell Ty")]
    pub ty: f64,

    #[serde(rename = "Load Cell Tz")]
    pub tz: f64,
}

/// Convert raw encoder ticks to reported units.
#[must_use]
pub fn ticks_to_units(ticks: i64) -> f64 {
    ticks as f64 / ENCODER_TICKS_PER_UNIT
}

/// Scale a raw load-cell channel value.
#[must_use]
pub fn scale_load(value: f64) -> f64 {
    value / LOAD_CELL_SCALE
}

/// Log file name for a measurement session opened at `at`,
/// e.g. `netbox-data-19-10-2026-14-05.csv`.
#[must_use]
pub fn log_filename(at: &DateTime<Local>) -> String {
    format!(
        "{LOG_FILE_PREFIX}{}.{LOG_FILE_EXTENSION}",
        at.format(LOG_FILENAME_TIME_FORMAT)
    )
}

/// Format the `Date` column of a log record.
#[must_use]
pub fn format_record_time(at: &DateTime<Local>) -> String {
    at.format(LOG_RECORD_TIME_FORMAT).to_string()
}

/// Parse the `Date` column of a log record.
///
/// # Errors
/// Returns `Error::InvalidTimestamp` if the value does not match
/// `DD-MM-YYYY-HH:MM:SS`.
pub fn parse_record_time(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, LOG_RECORD_TIME_FORMAT)
        .map_err(|e| Error::InvalidTimestamp(format!("{value}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case("0", AxisIndex::X)]
    #[case("1", AxisIndex::Y)]
    #[case(" 2 ", AxisIndex::Z)]
    #[case("3", AxisIndex::W)]
    fn test_axis_index_valid(#[case] input: &str, #[case] expected: AxisIndex) {
        let axis: AxisIndex = input.parse().unwrap();
        assert_eq!(axis, expected);
    }

    #[rstest]
    #[case("4")]
    #[case("-1")]
    #[case("x")]
    fn test_axis_index_invalid(#[case] input: &str) {
        let result: Result<AxisIndex> = input.parse();
        assert!(matches!(result, Err(Error::InvalidAxisIndex(_))));
    }

    #[test]
    fn test_axis_packet_region() {
        assert_eq!(AxisIndex::X.packet_region(), 1);
        assert_eq!(AxisIndex::W.packet_region(), 4);
    }

    #[rstest]
    #[case("0,1,2,3", 4)]
    #[case("3,1", 2)]
    #[case("1,1,1", 1)]
    fn test_axis_selection_parse(#[case] input: &str, #[case] len: usize) {
        let selection: AxisSelection = input.parse().unwrap();
        assert_eq!(selection.len(), len);
    }

    #[test]
    fn test_axis_selection_is_sorted() {
        let selection = AxisSelection::new([AxisIndex::W, AxisIndex::X]).unwrap();
        let axes: Vec<AxisIndex> = selection.iter().collect();
        assert_eq!(axes, vec![AxisIndex::X, AxisIndex::W]);
    }

    #[test]
    fn test_axis_selection_empty() {
        assert!(matches!(
            AxisSelection::new([]),
            Err(Error::EmptyAxisSelection)
        ));
        assert!("".parse::<AxisSelection>().is_err());
    }

    #[test]
    fn test_tare_capture_scales_ticks() {
        let sample = EncoderSample {
            positions: [2_000_000, 4_000_000, 6_000_000, 0],
            ..Default::default()
        };
        let tare = TareOffsets::capture(&sample);
        assert_eq!(tare, TareOffsets { x: 1.0, y: 2.0, z: 3.0 });
        assert_eq!(tare.apply(&sample, AxisIndex::X), 0.0);
        assert_eq!(tare.apply(&sample, AxisIndex::Z), 0.0);
    }

    #[test]
    fn test_tare_default_is_identity() {
        let sample = EncoderSample {
            positions: [-1_000_000, 0, 0, 8_000_000],
            ..Default::default()
        };
        let tare = TareOffsets::default();
        assert_eq!(tare.apply(&sample, AxisIndex::X), -0.5);
        assert_eq!(tare.apply(&sample, AxisIndex::W), 4.0);
    }

    #[test]
    fn test_log_filename() {
        let at = Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 42).unwrap();
        assert_eq!(log_filename(&at), "netbox-data-07-03-2026-09-05.csv");
    }

    #[test]
    fn test_record_time_roundtrip() {
        let at = Local.with_ymd_and_hms(2026, 10, 19, 23, 59, 1).unwrap();
        let text = format_record_time(&at);
        assert_eq!(text, "19-10-2026-23:59:01");
        assert_eq!(parse_record_time(&text).unwrap(), at.naive_local());
    }

    #[test]
    fn test_record_time_invalid() {
        assert!(parse_record_time("2026-10-19 23:59:01").is_err());
    }
}
