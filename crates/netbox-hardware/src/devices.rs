//! Enum wrappers for driver dispatch.
//!
//! The server picks a driver at start-up from configuration. These enums
//! give that choice one concrete type per device, so the sessions stay
//! generic over a single driver parameter while the available variants
//! follow the enabled features.
//!
//! # Examples
//!
//! ```
//! use netbox_hardware::devices::AnyEncoderDriver;
//! use netbox_hardware::encoder::{EncoderConfig, EncoderSession};
//! use netbox_hardware::mock::MockEncoder;
//!
//! let (driver, _handle) = MockEncoder::new();
//! let session = EncoderSession::new(AnyEncoderDriver::Mock(driver), EncoderConfig::default());
//! ```

use std::fmt;

use netbox_core::LoadCellBlock;

use crate::error::{VendorCode, VendorResult};
use crate::mock::{MockEncoder, MockLoadCell};
#[cfg(feature = "vendor-sdk")]
use crate::native::{NativeEncoder, NativeLoadCell};
use crate::traits::{EncoderDriver, LoadCellDriver};
use crate::types::{
    AxisHandle, AxisSettings, ConfigTarget, DataItems, EibHandle, FieldType, FieldValue,
    FifoBuffer, LoadCellHandle, OpenedEncoder, OperatingMode, PacketLayout, TriggerMask,
    TriggerSource,
};

/// Enum wrapper for encoder driver dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyEncoderDriver {
    /// Simulated unit for development and testing.
    Mock(MockEncoder),
    /// Vendor library.
    #[cfg(feature = "vendor-sdk")]
    Native(NativeEncoder),
}

macro_rules! dispatch {
    ($self:ident, $driver:ident => $call:expr) => {
        match $self {
            Self::Mock($driver) => $call,
            #[cfg(feature = "vendor-sdk")]
            Self::Native($driver) => $call,
        }
    };
}

impl EncoderDriver for AnyEncoderDriver {
    fn get_host_ip(&mut self, hostname: &str) -> VendorResult<u32> {
        dispatch!(self, d => d.get_host_ip(hostname))
    }

    fn open(&mut self, ip: u32, timeout_ms: i32) -> VendorResult<OpenedEncoder> {
        dispatch!(self, d => d.open(ip, timeout_ms))
    }

    fn get_axis(&mut self, eib: EibHandle) -> VendorResult<Vec<AxisHandle>> {
        dispatch!(self, d => d.get_axis(eib))
    }

    fn init_axis(&mut self, axis: AxisHandle, settings: &AxisSettings) -> VendorResult<()> {
        dispatch!(self, d => d.init_axis(axis, settings))
    }

    fn get_timestamp_ticks(&mut self, eib: EibHandle) -> VendorResult<u32> {
        dispatch!(self, d => d.get_timestamp_ticks(eib))
    }

    fn set_timestamp_period(&mut self, eib: EibHandle, period: u32) -> VendorResult<()> {
        dispatch!(self, d => d.set_timestamp_period(eib, period))
    }

    fn set_timestamp(&mut self, axis: AxisHandle, enable: bool) -> VendorResult<()> {
        dispatch!(self, d => d.set_timestamp(axis, enable))
    }

    fn add_data_packet_section(
        &mut self,
        packet: &mut PacketLayout,
        region: u8,
        items: DataItems,
    ) -> VendorResult<()> {
        dispatch!(self, d => d.add_data_packet_section(packet, region, items))
    }

    fn config_data_packet(&mut self, eib: EibHandle, packet: &PacketLayout) -> VendorResult<()> {
        dispatch!(self, d => d.config_data_packet(eib, packet))
    }

    fn get_timer_trigger_ticks(&mut self, eib: EibHandle) -> VendorResult<u32> {
        dispatch!(self, d => d.get_timer_trigger_ticks(eib))
    }

    fn set_timer_trigger_period(&mut self, eib: EibHandle, period: u32) -> VendorResult<()> {
        dispatch!(self, d => d.set_timer_trigger_period(eib, period))
    }

    fn axis_trigger_source(
        &mut self,
        axis: AxisHandle,
        source: TriggerSource,
    ) -> VendorResult<()> {
        dispatch!(self, d => d.axis_trigger_source(axis, source))
    }

    fn master_trigger_source(
        &mut self,
        eib: EibHandle,
        source: TriggerSource,
    ) -> VendorResult<()> {
        dispatch!(self, d => d.master_trigger_source(eib, source))
    }

    fn select_mode(&mut self, eib: EibHandle, mode: OperatingMode) -> VendorResult<()> {
        dispatch!(self, d => d.select_mode(eib, mode))
    }

    fn global_trigger_enable(
        &mut self,
        eib: EibHandle,
        enable: bool,
        mask: TriggerMask,
    ) -> VendorResult<()> {
        dispatch!(self, d => d.global_trigger_enable(eib, enable, mask))
    }

    fn read_fifo_data(
        &mut self,
        eib: EibHandle,
        buffer: &mut FifoBuffer,
        count: u32,
    ) -> VendorResult<u32> {
        dispatch!(self, d => d.read_fifo_data(eib, buffer, count))
    }

    fn clear_fifo(&mut self, eib: EibHandle) -> VendorResult<()> {
        dispatch!(self, d => d.clear_fifo(eib))
    }

    fn get_data_field(
        &mut self,
        eib: EibHandle,
        buffer: &FifoBuffer,
        region: u8,
        field: FieldType,
    ) -> VendorResult<FieldValue> {
        dispatch!(self, d => d.get_data_field(eib, buffer, region, field))
    }

    fn close(&mut self, eib: EibHandle) -> VendorResult<()> {
        dispatch!(self, d => d.close(eib))
    }
}

/// Enum wrapper for load-cell driver dispatch.
#[non_exhaustive]
pub enum AnyLoadCellDriver {
    /// Simulated amplifier for development and testing.
    Mock(MockLoadCell),
    /// Vendor library.
    #[cfg(feature = "vendor-sdk")]
    Native(NativeLoadCell),
    /// A driver implemented outside this crate, such as the legacy UDP
    /// transport.
    External(Box<dyn LoadCellDriver>),
}

impl fmt::Debug for AnyLoadCellDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mock(d) => f.debug_tuple("Mock").field(d).finish(),
            #[cfg(feature = "vendor-sdk")]
            Self::Native(d) => f.debug_tuple("Native").field(d).finish(),
            Self::External(_) => f.write_str("External(..)"),
        }
    }
}

macro_rules! dispatch_load_cell {
    ($self:ident, $driver:ident => $call:expr) => {
        match $self {
            Self::Mock($driver) => $call,
            #[cfg(feature = "vendor-sdk")]
            Self::Native($driver) => $call,
            Self::External($driver) => $call,
        }
    };
}

impl LoadCellDriver for AnyLoadCellDriver {
    fn connect(&mut self, host: &str) -> Option<LoadCellHandle> {
        dispatch_load_cell!(self, d => d.connect(host))
    }

    fn sdo_write(&mut self, handle: LoadCellHandle, target: &ConfigTarget) -> VendorCode {
        dispatch_load_cell!(self, d => d.sdo_write(handle, target))
    }

    fn start_measurement(&mut self, handle: LoadCellHandle) -> VendorResult<()> {
        dispatch_load_cell!(self, d => d.start_measurement(handle))
    }

    fn available_lines(&mut self, handle: LoadCellHandle) -> i32 {
        dispatch_load_cell!(self, d => d.available_lines(handle))
    }

    fn read_next_block(&mut self, handle: LoadCellHandle) -> VendorResult<LoadCellBlock> {
        dispatch_load_cell!(self, d => d.read_next_block(handle))
    }

    fn stop_measurement(&mut self, handle: LoadCellHandle) -> VendorResult<()> {
        dispatch_load_cell!(self, d => d.stop_measurement(handle))
    }

    fn disconnect(&mut self, handle: LoadCellHandle) -> VendorResult<()> {
        dispatch_load_cell!(self, d => d.disconnect(handle))
    }

    fn is_connected(&mut self, handle: LoadCellHandle) -> bool {
        dispatch_load_cell!(self, d => d.is_connected(handle))
    }
}
