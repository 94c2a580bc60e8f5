//! Encoder driver over the vendor `eib7` library.

use std::ffi::{CString, c_char, c_int, c_long, c_ulong, c_void};

use netbox_core::constants::{AXIS_COUNT, PACKET_REGION_COUNT};

use crate::error::{VendorCode, VendorResult};
use crate::traits::EncoderDriver;
use crate::types::{
    AxisHandle, AxisSettings, DataItems, EibHandle, FieldType, FieldValue, FifoBuffer,
    OpenedEncoder, OperatingMode, PacketLayout, PacketSection, TriggerMask, TriggerSource,
};

/// Capacity of the firmware identification buffer.
const IDENT_LEN: usize = 20;

/// Default wait bound of one FIFO read (milliseconds).
pub const DEFAULT_FIFO_TIMEOUT_MS: i32 = 200;

#[link(name = "eib7")]
unsafe extern "C" {
    fn EIB7GetHostIP(hostname: *const c_char, ip: *mut c_ulong) -> c_int;
    fn EIB7Open(
        ip: c_ulong,
        eib: *mut c_int,
        timeout: c_long,
        ident: *mut c_char,
        len: c_ulong,
    ) -> c_int;
    fn EIB7GetAxis(eib: c_int, axis: *mut c_int, size: c_ulong, num: *mut c_ulong) -> c_int;
    fn EIB7InitAxis(
        axis: c_int,
        interface_type: c_ulong,
        encoder_type: c_ulong,
        reference_marks: c_ulong,
        line_counts: c_ulong,
        increment: c_ulong,
        homing: c_ulong,
        limit: c_ulong,
        compensation: c_ulong,
        bandwidth: c_ulong,
        clock_rate: c_ulong,
        recovery_time: c_ulong,
        calculation_time: c_ulong,
    ) -> c_int;
    fn EIB7GetTimestampTicks(eib: c_int, ticks: *mut c_ulong) -> c_int;
    fn EIB7SetTimestampPeriod(eib: c_int, period: c_ulong) -> c_int;
    fn EIB7SetTimestamp(axis: c_int, mode: c_int) -> c_int;
    fn EIB7AddDataPacketSection(
        packet: *mut PacketSection,
        index: c_int,
        region: c_int,
        items: c_ulong,
    ) -> c_int;
    fn EIB7ConfigDataPacket(eib: c_int, packet: *const PacketSection, size: c_ulong) -> c_int;
    fn EIB7GetTimerTriggerTicks(eib: c_int, ticks: *mut c_ulong) -> c_int;
    fn EIB7SetTimerTriggerPeriod(eib: c_int, period: c_ulong) -> c_int;
    fn EIB7AxisTriggerSource(axis: c_int, source: c_int) -> c_int;
    fn EIB7MasterTriggerSource(eib: c_int, source: c_int) -> c_int;
    fn EIB7SelectMode(eib: c_int, mode: c_int) -> c_int;
    fn EIB7GlobalTriggerEnable(eib: c_int, mode: c_int, source: c_long) -> c_int;
    fn EIB7ReadFIFOData(
        eib: c_int,
        data: *mut c_void,
        count: c_ulong,
        entries: *mut c_ulong,
        timeout: c_long,
    ) -> c_int;
    fn EIB7ClearFIFO(eib: c_int) -> c_int;
    fn EIB7GetDataFieldPtr(
        eib: c_int,
        data: *const c_void,
        region: c_int,
        field_type: c_int,
        field: *mut *mut c_void,
        size: *mut c_ulong,
    ) -> c_int;
    fn EIB7Close(eib: c_int) -> c_int;
}

/// Encoder driver backed by the vendor library.
#[derive(Debug)]
pub struct NativeEncoder {
    fifo_timeout_ms: i32,
}

impl NativeEncoder {
    pub fn new() -> Self {
        Self {
            fifo_timeout_ms: DEFAULT_FIFO_TIMEOUT_MS,
        }
    }

    /// Set how long one FIFO read may wait for an entry.
    pub fn with_fifo_timeout_ms(mut self, timeout_ms: i32) -> Self {
        self.fifo_timeout_ms = timeout_ms;
        self
    }
}

impl Default for NativeEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn ulong(value: u32) -> c_ulong {
    c_ulong::from(value)
}

/// Narrow a driver output to `u32`; wider values are reported as invalid.
fn narrow(value: c_ulong) -> VendorResult<u32> {
    u32::try_from(value).map_err(|_| VendorCode::UNSUCCESSFUL)
}

impl EncoderDriver for NativeEncoder {
    fn get_host_ip(&mut self, hostname: &str) -> VendorResult<u32> {
        let hostname = CString::new(hostname).map_err(|_| VendorCode::UNSUCCESSFUL)?;
        let mut ip: c_ulong = 0;
        // SAFETY: `hostname` is NUL-terminated and outlives the call; `ip` is a valid out pointer.
        VendorCode::check(unsafe { EIB7GetHostIP(hostname.as_ptr(), &mut ip) })?;
        narrow(ip)
    }

    fn open(&mut self, ip: u32, timeout_ms: i32) -> VendorResult<OpenedEncoder> {
        let mut eib: c_int = 0;
        let mut ident = [0 as c_char; IDENT_LEN];
        // SAFETY: `ident` holds IDENT_LEN bytes, which is the length passed.
        VendorCode::check(unsafe {
            EIB7Open(
                ulong(ip),
                &mut eib,
                c_long::from(timeout_ms),
                ident.as_mut_ptr(),
                IDENT_LEN as c_ulong,
            )
        })?;
        let bytes: Vec<u8> = ident
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        Ok(OpenedEncoder {
            handle: EibHandle(eib),
            firmware: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    fn get_axis(&mut self, eib: EibHandle) -> VendorResult<Vec<AxisHandle>> {
        let mut axes = [0 as c_int; AXIS_COUNT];
        let mut num: c_ulong = 0;
        // SAFETY: `axes` holds AXIS_COUNT entries, which is the size passed.
        VendorCode::check(unsafe {
            EIB7GetAxis(eib.0, axes.as_mut_ptr(), AXIS_COUNT as c_ulong, &mut num)
        })?;
        let count = usize::try_from(num).unwrap_or(0).min(AXIS_COUNT);
        Ok(axes[..count].iter().map(|&a| AxisHandle(a)).collect())
    }

    fn init_axis(&mut self, axis: AxisHandle, settings: &AxisSettings) -> VendorResult<()> {
        let w = settings.words().map(ulong);
        // SAFETY: plain value arguments.
        VendorCode::check(unsafe {
            EIB7InitAxis(
                axis.0, w[0], w[1], w[2], w[3], w[4], w[5], w[6], w[7], w[8], w[9], w[10], w[11],
            )
        })
    }

    fn get_timestamp_ticks(&mut self, eib: EibHandle) -> VendorResult<u32> {
        let mut ticks: c_ulong = 0;
        // SAFETY: `ticks` is a valid out pointer.
        VendorCode::check(unsafe { EIB7GetTimestampTicks(eib.0, &mut ticks) })?;
        narrow(ticks)
    }

    fn set_timestamp_period(&mut self, eib: EibHandle, period: u32) -> VendorResult<()> {
        // SAFETY: plain value arguments.
        VendorCode::check(unsafe { EIB7SetTimestampPeriod(eib.0, ulong(period)) })
    }

    fn set_timestamp(&mut self, axis: AxisHandle, enable: bool) -> VendorResult<()> {
        // SAFETY: plain value arguments.
        VendorCode::check(unsafe { EIB7SetTimestamp(axis.0, c_int::from(enable)) })
    }

    fn add_data_packet_section(
        &mut self,
        packet: &mut PacketLayout,
        region: u8,
        items: DataItems,
    ) -> VendorResult<()> {
        let index = packet.len();
        if packet.is_committed() || index >= PACKET_REGION_COUNT {
            return Err(VendorCode::UNSUCCESSFUL);
        }
        // SAFETY: the section array has PACKET_REGION_COUNT entries and `index` is in range.
        VendorCode::check(unsafe {
            EIB7AddDataPacketSection(
                packet.sections_mut().as_mut_ptr(),
                index as c_int,
                c_int::from(region),
                ulong(items.bits()),
            )
        })?;
        packet.push(region, items);
        Ok(())
    }

    fn config_data_packet(&mut self, eib: EibHandle, packet: &PacketLayout) -> VendorResult<()> {
        let sections: Vec<PacketSection> = (0..packet.len())
            .filter_map(|i| packet.section(i).copied())
            .collect();
        // SAFETY: `sections` is a contiguous array of the length passed.
        VendorCode::check(unsafe {
            EIB7ConfigDataPacket(eib.0, sections.as_ptr(), sections.len() as c_ulong)
        })
    }

    fn get_timer_trigger_ticks(&mut self, eib: EibHandle) -> VendorResult<u32> {
        let mut ticks: c_ulong = 0;
        // SAFETY: `ticks` is a valid out pointer.
        VendorCode::check(unsafe { EIB7GetTimerTriggerTicks(eib.0, &mut ticks) })?;
        narrow(ticks)
    }

    fn set_timer_trigger_period(&mut self, eib: EibHandle, period: u32) -> VendorResult<()> {
        // SAFETY: plain value arguments.
        VendorCode::check(unsafe { EIB7SetTimerTriggerPeriod(eib.0, ulong(period)) })
    }

    fn axis_trigger_source(
        &mut self,
        axis: AxisHandle,
        source: TriggerSource,
    ) -> VendorResult<()> {
        // SAFETY: plain value arguments.
        VendorCode::check(unsafe { EIB7AxisTriggerSource(axis.0, source.0) })
    }

    fn master_trigger_source(
        &mut self,
        eib: EibHandle,
        source: TriggerSource,
    ) -> VendorResult<()> {
        // SAFETY: plain value arguments.
        VendorCode::check(unsafe { EIB7MasterTriggerSource(eib.0, source.0) })
    }

    fn select_mode(&mut self, eib: EibHandle, mode: OperatingMode) -> VendorResult<()> {
        // SAFETY: plain value arguments.
        VendorCode::check(unsafe { EIB7SelectMode(eib.0, mode as c_int) })
    }

    fn global_trigger_enable(
        &mut self,
        eib: EibHandle,
        enable: bool,
        mask: TriggerMask,
    ) -> VendorResult<()> {
        // SAFETY: plain value arguments.
        VendorCode::check(unsafe {
            EIB7GlobalTriggerEnable(eib.0, c_int::from(enable), c_long::from(mask.0))
        })
    }

    fn read_fifo_data(
        &mut self,
        eib: EibHandle,
        buffer: &mut FifoBuffer,
        count: u32,
    ) -> VendorResult<u32> {
        let mut entries: c_ulong = 0;
        let data = buffer.as_bytes_mut();
        // SAFETY: `data` holds one converted FIFO entry and stays borrowed for the call.
        VendorCode::check(unsafe {
            EIB7ReadFIFOData(
                eib.0,
                data.as_mut_ptr().cast::<c_void>(),
                ulong(count),
                &mut entries,
                c_long::from(self.fifo_timeout_ms),
            )
        })?;
        narrow(entries)
    }

    fn clear_fifo(&mut self, eib: EibHandle) -> VendorResult<()> {
        // SAFETY: plain value arguments.
        VendorCode::check(unsafe { EIB7ClearFIFO(eib.0) })
    }

    fn get_data_field(
        &mut self,
        eib: EibHandle,
        buffer: &FifoBuffer,
        region: u8,
        field: FieldType,
    ) -> VendorResult<FieldValue> {
        let data = buffer.as_bytes();
        let mut ptr: *mut c_void = std::ptr::null_mut();
        let mut size: c_ulong = 0;
        // SAFETY: `data` is the buffer the entry was read into; `ptr`/`size` are valid out pointers.
        VendorCode::check(unsafe {
            EIB7GetDataFieldPtr(
                eib.0,
                data.as_ptr().cast::<c_void>(),
                c_int::from(region),
                field as c_int,
                &mut ptr,
                &mut size,
            )
        })?;

        let size = usize::try_from(size).unwrap_or(0);
        let width = field.width();
        if ptr.is_null() || size < width {
            return Err(VendorCode::UNSUCCESSFUL);
        }

        // The field pointer points into `data`; copy it out by offset.
        let bytes = buffer
            .field_at(ptr as usize, width)
            .ok_or(VendorCode::UNSUCCESSFUL)?;
        let value = match field {
            FieldType::TriggerCounter | FieldType::StatusWord => {
                FieldValue::U16(u16::from_ne_bytes([bytes[0], bytes[1]]))
            }
            FieldType::Timestamp => {
                FieldValue::U32(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            FieldType::Position => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                FieldValue::I64(i64::from_ne_bytes(raw))
            }
        };
        Ok(value)
    }

    fn close(&mut self, eib: EibHandle) -> VendorResult<()> {
        // SAFETY: plain value arguments.
        VendorCode::check(unsafe { EIB7Close(eib.0) })
    }
}
