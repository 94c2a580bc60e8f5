//! Capability interfaces of the two vendor drivers.
//!
//! Each trait lists the driver calls the bridge needs, one method per call,
//! with vendor status codes surfaced as [`VendorCode`] rather than
//! interpreted. Sessions ([`crate::encoder::EncoderSession`],
//! [`crate::load_cell::LoadCellSession`]) sequence the calls and own the
//! error policy; drivers only translate.
//!
//! The traits are synchronous because the vendor libraries block. Callers in
//! async code run sessions on a blocking thread.
//!
//! Implementations:
//!
//! - [`crate::mock`]: scripted in-memory devices for tests and development
//! - `crate::native` (feature `vendor-sdk`): the vendor shared libraries
//! - `netbox_network::NetFtDriver`: legacy UDP load-cell box

use netbox_core::LoadCellBlock;

use crate::error::{VendorCode, VendorResult};
use crate::types::{
    AxisHandle, AxisSettings, ConfigTarget, DataItems, EibHandle, FieldType, FieldValue,
    FifoBuffer, LoadCellHandle, OpenedEncoder, OperatingMode, PacketLayout, TriggerMask,
    TriggerSource,
};

/// Calls of the multi-axis encoder driver.
pub trait EncoderDriver: Send {
    /// Resolve `hostname` to the IPv4 address the driver connects to.
    fn get_host_ip(&mut self, hostname: &str) -> VendorResult<u32>;

    /// Open a connection, waiting at most `timeout_ms`.
    fn open(&mut self, ip: u32, timeout_ms: i32) -> VendorResult<OpenedEncoder>;

    /// Enumerate the axis handles of an open unit.
    fn get_axis(&mut self, eib: EibHandle) -> VendorResult<Vec<AxisHandle>>;

    fn init_axis(&mut self, axis: AxisHandle, settings: &AxisSettings) -> VendorResult<()>;

    /// Timestamp counter ticks per microsecond.
    fn get_timestamp_ticks(&mut self, eib: EibHandle) -> VendorResult<u32>;

    fn set_timestamp_period(&mut self, eib: EibHandle, period: u32) -> VendorResult<()>;

    fn set_timestamp(&mut self, axis: AxisHandle, enable: bool) -> VendorResult<()>;

    /// Append the section for `region` to `packet`.
    fn add_data_packet_section(
        &mut self,
        packet: &mut PacketLayout,
        region: u8,
        items: DataItems,
    ) -> VendorResult<()>;

    /// Send the packet layout to the unit.
    fn config_data_packet(&mut self, eib: EibHandle, packet: &PacketLayout) -> VendorResult<()>;

    /// Timer trigger ticks per microsecond.
    fn get_timer_trigger_ticks(&mut self, eib: EibHandle) -> VendorResult<u32>;

    fn set_timer_trigger_period(&mut self, eib: EibHandle, period: u32) -> VendorResult<()>;

    fn axis_trigger_source(&mut self, axis: AxisHandle, source: TriggerSource)
    -> VendorResult<()>;

    fn master_trigger_source(&mut self, eib: EibHandle, source: TriggerSource)
    -> VendorResult<()>;

    fn select_mode(&mut self, eib: EibHandle, mode: OperatingMode) -> VendorResult<()>;

    fn global_trigger_enable(
        &mut self,
        eib: EibHandle,
        enable: bool,
        mask: TriggerMask,
    ) -> VendorResult<()>;

    /// Read up to `count` FIFO entries into `buffer`, returning how many
    /// were read. An empty FIFO is reported as [`VendorCode::FIFO_EMPTY`].
    fn read_fifo_data(
        &mut self,
        eib: EibHandle,
        buffer: &mut FifoBuffer,
        count: u32,
    ) -> VendorResult<u32>;

    fn clear_fifo(&mut self, eib: EibHandle) -> VendorResult<()>;

    /// Extract one field of `region` from the entry held in `buffer`.
    fn get_data_field(
        &mut self,
        eib: EibHandle,
        buffer: &FifoBuffer,
        region: u8,
        field: FieldType,
    ) -> VendorResult<FieldValue>;

    fn close(&mut self, eib: EibHandle) -> VendorResult<()>;
}

/// Calls of the force/torque load-cell driver.
pub trait LoadCellDriver: Send {
    /// Connect to the amplifier at `host`. `None` means the driver returned
    /// no handle.
    fn connect(&mut self, host: &str) -> Option<LoadCellHandle>;

    /// Write an object-dictionary entry, returning the raw status.
    fn sdo_write(&mut self, handle: LoadCellHandle, target: &ConfigTarget) -> VendorCode;

    fn start_measurement(&mut self, handle: LoadCellHandle) -> VendorResult<()>;

    /// Number of buffered lines ready to be read.
    fn available_lines(&mut self, handle: LoadCellHandle) -> i32;

    /// Pop the oldest buffered line.
    fn read_next_block(&mut self, handle: LoadCellHandle) -> VendorResult<LoadCellBlock>;

    fn stop_measurement(&mut self, handle: LoadCellHandle) -> VendorResult<()>;

    fn disconnect(&mut self, handle: LoadCellHandle) -> VendorResult<()>;

    fn is_connected(&mut self, handle: LoadCellHandle) -> bool;
}
