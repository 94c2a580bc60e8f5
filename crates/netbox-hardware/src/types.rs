//! Value types exchanged with the vendor drivers.
//!
//! These mirror the argument shapes of the encoder and load-cell driver
//! libraries closely enough that the native bindings can pass them through
//! without copying, while staying meaningful to the mock drivers.

use std::fmt;
use std::num::NonZeroUsize;
use std::ops::BitOr;
use std::os::raw::{c_int, c_ulong};

use netbox_core::constants::PACKET_REGION_COUNT;
use serde::Serialize;

/// Size of the buffer one FIFO entry is read into.
pub const FIFO_BUFFER_SIZE: usize = 200;

/// Opaque encoder connection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EibHandle(pub i32);

/// Opaque per-axis handle reported by axis enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisHandle(pub i32);

/// Opaque load-cell connection handle. Never null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadCellHandle(pub NonZeroUsize);

/// Result of opening the encoder connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedEncoder {
    /// Connection handle.
    pub handle: EibHandle,
    /// Firmware identification string reported by the unit.
    pub firmware: String,
}

/// Per-axis initialization words, in driver argument order.
///
/// The default selects the encoder interface and enables compensation;
/// every other word is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AxisSettings {
    pub interface_type: u32,
    pub encoder_type: u32,
    pub reference_marks: u32,
    pub line_counts: u32,
    pub increment: u32,
    pub homing: u32,
    pub limit: u32,
    pub compensation: u32,
    pub bandwidth: u32,
    pub clock_rate: u32,
    pub recovery_time: u32,
    pub calculation_time: u32,
}

impl AxisSettings {
    /// Settings words in the order the driver expects them.
    #[must_use]
    pub fn words(&self) -> [u32; 12] {
        [
            self.interface_type,
            self.encoder_type,
            self.reference_marks,
            self.line_counts,
            self.increment,
            self.homing,
            self.limit,
            self.compensation,
            self.bandwidth,
            self.clock_rate,
            self.recovery_time,
            self.calculation_time,
        ]
    }
}

impl Default for AxisSettings {
    fn default() -> Self {
        Self {
            interface_type: 1,
            encoder_type: 0,
            reference_marks: 0,
            line_counts: 0,
            increment: 0,
            homing: 0,
            limit: 0,
            compensation: 1,
            bandwidth: 0,
            clock_rate: 0,
            recovery_time: 0,
            calculation_time: 0,
        }
    }
}

/// Bit set of items carried by one packet region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DataItems(pub u32);

impl DataItems {
    pub const TRIGGER_COUNTER: Self = Self(0x1);
    pub const STATUS_WORD: Self = Self(0x2);
    pub const POSITION: Self = Self(0x4);
    pub const TIMESTAMP: Self = Self(0x8);

    /// Items of every axis region: status, position and timestamp.
    pub const AXIS_DEFAULT: Self =
        Self(Self::STATUS_WORD.0 | Self::POSITION.0 | Self::TIMESTAMP.0);

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for DataItems {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A single field type that can be extracted from a FIFO entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum FieldType {
    TriggerCounter = 0x1,
    StatusWord = 0x2,
    Position = 0x4,
    Timestamp = 0x8,
}

impl FieldType {
    /// Width in bytes of the field inside a FIFO entry.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::TriggerCounter | Self::StatusWord => 2,
            Self::Timestamp => 4,
            Self::Position => 8,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TriggerCounter => "trigger counter",
            Self::StatusWord => "status word",
            Self::Position => "position",
            Self::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// Value of an extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    U16(u16),
    U32(u32),
    I64(i64),
}

impl FieldValue {
    /// The value as `u16`, if it is one.
    #[must_use]
    pub fn as_u16(self) -> Option<u16> {
        match self {
            Self::U16(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u32(self) -> Option<u32> {
        match self {
            Self::U32(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(v),
            _ => None,
        }
    }
}

/// One entry of the packet layout, laid out as the driver expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct PacketSection {
    pub region: c_int,
    pub items: c_ulong,
}

/// The streaming packet layout: one section per region, built in order and
/// committed once before streaming starts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PacketLayout {
    sections: [PacketSection; PACKET_REGION_COUNT],
    configured: usize,
    committed: bool,
}

impl PacketLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sections added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.configured
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configured == 0
    }

    /// Whether the layout has been sent to the device.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Section at `index`, if it was added.
    #[must_use]
    pub fn section(&self, index: usize) -> Option<&PacketSection> {
        self.sections[..self.configured].get(index)
    }

    /// Record a section. Used by drivers that build the layout themselves.
    ///
    /// Returns `false` if the layout is already committed or full.
    pub fn push(&mut self, region: u8, items: DataItems) -> bool {
        if self.committed || self.configured == PACKET_REGION_COUNT {
            return false;
        }
        self.sections[self.configured] = PacketSection {
            region: c_int::from(region),
            items: c_ulong::from(items.bits()),
        };
        self.configured += 1;
        true
    }

    /// Mark the layout as committed; no further sections may be added.
    pub fn commit(&mut self) {
        self.committed = true;
    }

    /// Raw section array for the native driver.
    pub fn sections_mut(&mut self) -> &mut [PacketSection; PACKET_REGION_COUNT] {
        &mut self.sections
    }
}

/// Buffer a single FIFO entry is read into.
#[derive(Clone, PartialEq, Eq)]
pub struct FifoBuffer {
    bytes: [u8; FIFO_BUFFER_SIZE],
}

impl FifoBuffer {
    pub fn new() -> Self {
        Self {
            bytes: [0; FIFO_BUFFER_SIZE],
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// The `width` bytes at address `addr`, if they lie inside the buffer.
    ///
    /// Field lookups return raw pointers into the buffer; an address
    /// outside it yields `None`.
    #[must_use]
    pub fn field_at(&self, addr: usize, width: usize) -> Option<&[u8]> {
        let offset = addr.checked_sub(self.bytes.as_ptr() as usize)?;
        let end = offset.checked_add(width)?;
        self.bytes.get(offset..end)
    }
}

impl Default for FifoBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FifoBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FifoBuffer")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Operating mode of the encoder unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum OperatingMode {
    Polling = 0,
    SoftRealtime = 1,
    Streaming = 2,
    RecordingSingle = 3,
    RecordingRoll = 4,
}

/// Trigger source selector for axis and master triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerSource(pub i32);

impl TriggerSource {
    /// The unit's internal interval timer.
    pub const TIMER: Self = Self(12);
}

/// Global trigger mask passed to enable/disable calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerMask(pub i32);

impl TriggerMask {
    /// Enable the timer trigger output.
    pub const TIMER: Self = Self(2048);
    /// Every trigger source.
    pub const ALL: Self = Self(-1);
}

/// A load-cell object-dictionary write: index, subindex and string value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ConfigTarget {
    pub index: u16,
    pub subindex: u8,
    pub value: String,
}

impl ConfigTarget {
    pub fn new(index: u16, subindex: u8, value: impl Into<String>) -> Self {
        Self {
            index,
            subindex,
            value: value.into(),
        }
    }

    /// Measurement setup written right after connecting.
    pub fn measurement_setup() -> Self {
        Self::new(0x4428, 8, "10")
    }

    /// Zero-offset (tare) trigger.
    pub fn zero_offset() -> Self {
        Self::new(0x4410, 4, "")
    }
}

impl fmt::Display for ConfigTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}/{} = {:?}", self.index, self.subindex, self.value)
    }
}

/// Outcome of a load-cell configuration write.
///
/// Only the vendor's generic failure code is reported as unsuccessful;
/// every other code counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigWriteResult {
    Ok,
    Unsuccessful,
}

impl ConfigWriteResult {
    #[must_use]
    pub fn from_code(code: crate::error::VendorCode) -> Self {
        if code == crate::error::VendorCode::UNSUCCESSFUL {
            Self::Unsuccessful
        } else {
            Self::Ok
        }
    }

    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VendorCode;
    use rstest::rstest;

    #[test]
    fn test_field_at_bounds() {
        let mut buffer = FifoBuffer::new();
        buffer.as_bytes_mut()[4..6].copy_from_slice(&[0xAB, 0xCD]);
        let start = buffer.as_bytes().as_ptr() as usize;
        let len = buffer.as_bytes().len();

        assert_eq!(buffer.field_at(start + 4, 2), Some(&[0xAB, 0xCD][..]));
        assert_eq!(buffer.field_at(start + len - 2, 2).map(<[u8]>::len), Some(2));
        assert_eq!(buffer.field_at(start + len - 1, 2), None);
        assert_eq!(buffer.field_at(start.wrapping_sub(1), 2), None);
        assert_eq!(buffer.field_at(usize::MAX, 4), None);
        assert_eq!(buffer.field_at(start, usize::MAX), None);
    }

    #[test]
    fn test_default_axis_settings_words() {
        assert_eq!(
            AxisSettings::default().words(),
            [1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_axis_items() {
        assert_eq!(DataItems::AXIS_DEFAULT.bits(), 0x2 | 0x4 | 0x8);
        assert!(DataItems::AXIS_DEFAULT.contains(DataItems::POSITION));
        assert!(!DataItems::AXIS_DEFAULT.contains(DataItems::TRIGGER_COUNTER));
    }

    #[test]
    fn test_packet_layout_push_and_commit() {
        let mut layout = PacketLayout::new();
        assert!(layout.push(0, DataItems::TRIGGER_COUNTER));
        for region in 1..=4 {
            assert!(layout.push(region, DataItems::AXIS_DEFAULT));
        }
        assert_eq!(layout.len(), PACKET_REGION_COUNT);
        assert!(!layout.push(0, DataItems::TRIGGER_COUNTER));

        let section = layout.section(2).unwrap();
        assert_eq!(section.region, 2);
        assert_eq!(section.items, 0xE);
    }

    #[test]
    fn test_committed_layout_is_immutable() {
        let mut layout = PacketLayout::new();
        layout.push(0, DataItems::TRIGGER_COUNTER);
        layout.commit();
        assert!(!layout.push(1, DataItems::AXIS_DEFAULT));
        assert_eq!(layout.len(), 1);
    }

    #[rstest]
    #[case(-1, ConfigWriteResult::Unsuccessful)]
    #[case(0, ConfigWriteResult::Ok)]
    #[case(3, ConfigWriteResult::Ok)]
    #[case(-2, ConfigWriteResult::Ok)]
    fn test_config_write_result(#[case] code: i32, #[case] expected: ConfigWriteResult) {
        assert_eq!(ConfigWriteResult::from_code(VendorCode(code)), expected);
    }

    #[test]
    fn test_config_targets() {
        let setup = ConfigTarget::measurement_setup();
        assert_eq!((setup.index, setup.subindex, setup.value.as_str()), (0x4428, 8, "10"));
        let tare = ConfigTarget::zero_offset();
        assert_eq!((tare.index, tare.subindex, tare.value.as_str()), (0x4410, 4, ""));
        assert_eq!(tare.to_string(), "0x4410/4 = \"\"");
    }
}
