//! Load-cell driver over the vendor `ClipXApi` library.

use std::ffi::{CString, c_char, c_double, c_int, c_void};
use std::num::NonZeroUsize;

use netbox_core::LoadCellBlock;

use crate::error::{VendorCode, VendorResult};
use crate::traits::LoadCellDriver;
use crate::types::{ConfigTarget, LoadCellHandle};

#[link(name = "ClipXApi")]
unsafe extern "C" {
    fn ClipX_Connect(ip: *const c_char) -> *mut c_void;
    fn ClipX_SDOWrite(
        handle: *mut c_void,
        index: c_int,
        subindex: c_int,
        value: *const c_char,
    ) -> c_int;
    fn ClipX_startMeasurement(handle: *mut c_void) -> c_int;
    fn ClipX_AvailableLines(handle: *mut c_void) -> c_int;
    fn ClipX_ReadNextBlock(
        handle: *mut c_void,
        count: c_int,
        time: *mut c_double,
        fx: *mut c_double,
        fy: *mut c_double,
        fz: *mut c_double,
        tx: *mut c_double,
        ty: *mut c_double,
        tz: *mut c_double,
    ) -> c_int;
    fn ClipX_stopMeasurement(handle: *mut c_void) -> c_int;
    fn ClipX_Disconnect(handle: *mut c_void) -> c_int;
    fn ClipX_isConnected(handle: *mut c_void) -> bool;
}

/// Load-cell driver backed by the vendor library.
///
/// The connection handle is the library's opaque pointer, stored as an
/// address so the driver stays `Send`. It is only ever handed back to the
/// library.
#[derive(Debug, Default)]
pub struct NativeLoadCell;

impl NativeLoadCell {
    pub fn new() -> Self {
        Self
    }
}

fn raw(handle: LoadCellHandle) -> *mut c_void {
    handle.0.get() as *mut c_void
}

impl LoadCellDriver for NativeLoadCell {
    fn connect(&mut self, host: &str) -> Option<LoadCellHandle> {
        let host = CString::new(host).ok()?;
        // SAFETY: `host` is NUL-terminated and outlives the call.
        let ptr = unsafe { ClipX_Connect(host.as_ptr()) };
        NonZeroUsize::new(ptr as usize).map(LoadCellHandle)
    }

    fn sdo_write(&mut self, handle: LoadCellHandle, target: &ConfigTarget) -> VendorCode {
        let Ok(value) = CString::new(target.value.as_str()) else {
            return VendorCode::UNSUCCESSFUL;
        };
        // SAFETY: `handle` came from `ClipX_Connect`; `value` outlives the call.
        VendorCode(unsafe {
            ClipX_SDOWrite(
                raw(handle),
                c_int::from(target.index),
                c_int::from(target.subindex),
                value.as_ptr(),
            )
        })
    }

    fn start_measurement(&mut self, handle: LoadCellHandle) -> VendorResult<()> {
        // SAFETY: `handle` came from `ClipX_Connect`.
        VendorCode::check(unsafe { ClipX_startMeasurement(raw(handle)) })
    }

    fn available_lines(&mut self, handle: LoadCellHandle) -> i32 {
        // SAFETY: `handle` came from `ClipX_Connect`.
        unsafe { ClipX_AvailableLines(raw(handle)) }
    }

    fn read_next_block(&mut self, handle: LoadCellHandle) -> VendorResult<LoadCellBlock> {
        let mut block = LoadCellBlock::default();
        // SAFETY: every out pointer refers to a distinct f64 field of `block`.
        let status = unsafe {
            ClipX_ReadNextBlock(
                raw(handle),
                1,
                &mut block.timestamp,
                &mut block.fx,
                &mut block.fy,
                &mut block.fz,
                &mut block.tx,
                &mut block.ty,
                &mut block.tz,
            )
        };
        // The library returns the number of lines read.
        if status < 0 {
            Err(VendorCode(status))
        } else {
            Ok(block)
        }
    }

    fn stop_measurement(&mut self, handle: LoadCellHandle) -> VendorResult<()> {
        // SAFETY: `handle` came from `ClipX_Connect`.
        VendorCode::check(unsafe { ClipX_stopMeasurement(raw(handle)) })
    }

    fn disconnect(&mut self, handle: LoadCellHandle) -> VendorResult<()> {
        // SAFETY: `handle` came from `ClipX_Connect` and is not used afterwards.
        VendorCode::check(unsafe { ClipX_Disconnect(raw(handle)) })
    }

    fn is_connected(&mut self, handle: LoadCellHandle) -> bool {
        // SAFETY: `handle` came from `ClipX_Connect`.
        unsafe { ClipX_isConnected(raw(handle)) }
    }
}
