//! Mock load-cell driver for testing and development.
//!
//! Blocks pushed through the handle form the amplifier's line buffer; the
//! available-line count is the buffer length, so draining observes the
//! count falling one line per read.

use std::collections::VecDeque;
use std::mem::{Discriminant, discriminant};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use netbox_core::LoadCellBlock;

use crate::error::{VendorCode, VendorResult};
use crate::traits::LoadCellDriver;
use crate::types::{ConfigTarget, LoadCellHandle};

/// A recorded driver call. `AvailableLines` carries the count returned.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadCellCall {
    Connect(String),
    SdoWrite(ConfigTarget),
    StartMeasurement,
    AvailableLines(i32),
    ReadNextBlock,
    StopMeasurement,
    Disconnect,
    IsConnected,
}

#[derive(Debug, Default)]
struct MockLoadCellState {
    calls: Vec<LoadCellCall>,
    failures: Vec<(Discriminant<LoadCellCall>, VendorCode)>,
    blocks: VecDeque<LoadCellBlock>,
    refuse_connections: bool,
    connected: bool,
    measuring: bool,
}

impl MockLoadCellState {
    fn record(&mut self, call: LoadCellCall) -> VendorResult<()> {
        let kind = discriminant(&call);
        self.calls.push(call);
        match self.failures.iter().find(|(k, _)| *k == kind) {
            Some((_, code)) => Err(*code),
            None => Ok(()),
        }
    }
}

fn lock(state: &Mutex<MockLoadCellState>) -> MutexGuard<'_, MockLoadCellState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock load-cell driver.
///
/// # Examples
///
/// ```
/// use netbox_core::LoadCellBlock;
/// use netbox_hardware::mock::MockLoadCell;
/// use netbox_hardware::traits::LoadCellDriver;
///
/// let (mut driver, handle) = MockLoadCell::new();
/// let cell = driver.connect("192.168.1.22").unwrap();
/// driver.start_measurement(cell).unwrap();
/// handle.push_block(LoadCellBlock { fz: 1500.0, ..Default::default() });
///
/// assert_eq!(driver.available_lines(cell), 1);
/// assert_eq!(driver.read_next_block(cell).unwrap().fz, 1500.0);
/// assert_eq!(driver.available_lines(cell), 0);
/// ```
#[derive(Debug)]
pub struct MockLoadCell {
    state: Arc<Mutex<MockLoadCellState>>,
}

impl MockLoadCell {
    /// Create a mock load cell and its control handle.
    pub fn new() -> (Self, MockLoadCellHandle) {
        let state = Arc::new(Mutex::new(MockLoadCellState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockLoadCellHandle { state },
        )
    }

    fn state(&self) -> MutexGuard<'_, MockLoadCellState> {
        lock(&self.state)
    }
}

impl Default for MockLoadCell {
    fn default() -> Self {
        Self::new().0
    }
}

impl LoadCellDriver for MockLoadCell {
    fn connect(&mut self, host: &str) -> Option<LoadCellHandle> {
        let mut state = self.state();
        let accepted = state.record(LoadCellCall::Connect(host.to_string())).is_ok();
        if !accepted || state.refuse_connections {
            return None;
        }
        state.connected = true;
        NonZeroUsize::new(1).map(LoadCellHandle)
    }

    fn sdo_write(&mut self, _handle: LoadCellHandle, target: &ConfigTarget) -> VendorCode {
        match self.state().record(LoadCellCall::SdoWrite(target.clone())) {
            Ok(()) => VendorCode::OK,
            Err(code) => code,
        }
    }

    fn start_measurement(&mut self, _handle: LoadCellHandle) -> VendorResult<()> {
        let mut state = self.state();
        state.record(LoadCellCall::StartMeasurement)?;
        state.measuring = true;
        Ok(())
    }

    fn available_lines(&mut self, _handle: LoadCellHandle) -> i32 {
        let mut state = self.state();
        let available = if state.measuring {
            i32::try_from(state.blocks.len()).unwrap_or(i32::MAX)
        } else {
            0
        };
        // Failure injection does not apply; the count is always answered.
        let _ = state.record(LoadCellCall::AvailableLines(available));
        available
    }

    fn read_next_block(&mut self, _handle: LoadCellHandle) -> VendorResult<LoadCellBlock> {
        let mut state = self.state();
        state.record(LoadCellCall::ReadNextBlock)?;
        state.blocks.pop_front().ok_or(VendorCode::UNSUCCESSFUL)
    }

    fn stop_measurement(&mut self, _handle: LoadCellHandle) -> VendorResult<()> {
        let mut state = self.state();
        state.measuring = false;
        state.record(LoadCellCall::StopMeasurement)
    }

    fn disconnect(&mut self, _handle: LoadCellHandle) -> VendorResult<()> {
        let mut state = self.state();
        state.connected = false;
        state.measuring = false;
        state.record(LoadCellCall::Disconnect)
    }

    fn is_connected(&mut self, _handle: LoadCellHandle) -> bool {
        let mut state = self.state();
        let _ = state.record(LoadCellCall::IsConnected);
        state.connected
    }
}

/// Control handle for a [`MockLoadCell`].
#[derive(Debug, Clone)]
pub struct MockLoadCellHandle {
    state: Arc<Mutex<MockLoadCellState>>,
}

impl MockLoadCellHandle {
    fn state(&self) -> MutexGuard<'_, MockLoadCellState> {
        lock(&self.state)
    }

    /// Append a block to the line buffer.
    pub fn push_block(&self, block: LoadCellBlock) {
        self.state().blocks.push_back(block);
    }

    /// Lines buffered and not yet read.
    pub fn pending_blocks(&self) -> usize {
        self.state().blocks.len()
    }

    /// Make `connect` return no handle.
    pub fn refuse_connections(&self) {
        self.state().refuse_connections = true;
    }

    /// Make every call of the same kind as `call` fail with `code`.
    ///
    /// For `SdoWrite` the code is returned as the write status.
    pub fn fail_on(&self, call: LoadCellCall, code: VendorCode) {
        let kind = discriminant(&call);
        let mut state = self.state();
        state.failures.retain(|(k, _)| *k != kind);
        state.failures.push((kind, code));
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// All calls recorded so far, in order.
    pub fn calls(&self) -> Vec<LoadCellCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    pub fn is_measuring(&self) -> bool {
        self.state().measuring
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_lines_before_measurement_starts() {
        let (mut driver, handle) = MockLoadCell::new();
        let cell = driver.connect("host").unwrap();
        handle.push_block(LoadCellBlock::default());
        assert_eq!(driver.available_lines(cell), 0);

        driver.start_measurement(cell).unwrap();
        assert_eq!(driver.available_lines(cell), 1);
    }

    #[test]
    fn test_sdo_write_returns_injected_code() {
        let (mut driver, handle) = MockLoadCell::new();
        let cell = driver.connect("host").unwrap();
        assert_eq!(driver.sdo_write(cell, &ConfigTarget::zero_offset()), VendorCode::OK);

        handle.fail_on(
            LoadCellCall::SdoWrite(ConfigTarget::zero_offset()),
            VendorCode::UNSUCCESSFUL,
        );
        assert_eq!(
            driver.sdo_write(cell, &ConfigTarget::zero_offset()),
            VendorCode::UNSUCCESSFUL
        );
    }
}
