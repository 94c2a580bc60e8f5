//! Load-cell session: lifecycle of one force/torque amplifier connection.
//!
//! Opening connects, writes the measurement setup and starts continuous
//! measurement. While `Ready`, [`LoadCellSession::drain_available`] empties
//! the amplifier's line buffer without blocking and keeps only the newest
//! block.

use netbox_core::LoadCellBlock;
use netbox_core::constants::DEFAULT_LOAD_CELL_HOST;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::error::{DeviceKind, HardwareError, Result, VendorCode, VendorResult};
use crate::session::{SessionState, SessionStateMachine};
use crate::traits::LoadCellDriver;
use crate::types::{ConfigTarget, ConfigWriteResult, LoadCellHandle};

/// Load-cell session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadCellConfig {
    /// Host name or IP address of the amplifier.
    pub hostname: String,

    /// Configuration written between connect and start of measurement.
    pub measurement_setup: ConfigTarget,

    /// Configuration write that zeroes the channels.
    pub zero_offset: ConfigTarget,

    /// Upper bound of block reads per drain.
    pub max_drain_lines: usize,
}

impl Default for LoadCellConfig {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_LOAD_CELL_HOST.to_string(),
            measurement_setup: ConfigTarget::measurement_setup(),
            zero_offset: ConfigTarget::zero_offset(),
            max_drain_lines: 10_000,
        }
    }
}

impl LoadCellConfig {
    /// Set the host name or IP address.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set the upper bound of block reads per drain.
    pub fn with_max_drain_lines(mut self, lines: usize) -> Self {
        self.max_drain_lines = lines;
        self
    }
}

/// One step of the open sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadCellStep {
    Connect,
    WriteSetup,
    StartMeasurement,
}

impl LoadCellStep {
    /// 1-based position in the open sequence.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Connect => 1,
            Self::WriteSetup => 2,
            Self::StartMeasurement => 3,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::WriteSetup => "write measurement setup",
            Self::StartMeasurement => "start measurement",
        }
    }

    fn error(self, code: VendorCode) -> HardwareError {
        HardwareError::protocol(DeviceKind::LoadCell, self.name(), self.index(), code)
    }
}

/// Lifecycle owner of one load-cell connection.
#[derive(Debug)]
pub struct LoadCellSession<D: LoadCellDriver> {
    driver: D,
    config: LoadCellConfig,
    machine: SessionStateMachine,
    handle: Option<LoadCellHandle>,
    measuring: bool,
    last_block: LoadCellBlock,
}

impl<D: LoadCellDriver> LoadCellSession<D> {
    /// Create a disconnected session over `driver`.
    pub fn new(driver: D, config: LoadCellConfig) -> Self {
        Self {
            driver,
            config,
            machine: SessionStateMachine::new(),
            handle: None,
            measuring: false,
            last_block: LoadCellBlock::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.machine.current_state()
    }

    #[must_use]
    pub fn config(&self) -> &LoadCellConfig {
        &self.config
    }

    /// Most recently drained block; zeros before the first drain.
    #[must_use]
    pub fn last_block(&self) -> &LoadCellBlock {
        &self.last_block
    }

    /// Whether the driver still reports the connection as alive.
    pub fn is_connected(&mut self) -> bool {
        match self.handle {
            Some(handle) => self.driver.is_connected(handle),
            None => false,
        }
    }

    /// Connect, write the measurement setup and start measuring.
    ///
    /// # Errors
    ///
    /// - [`HardwareError::AlreadyOpen`] if the session is not disconnected
    /// - [`HardwareError::DeviceProtocol`] if connect returns no handle, the
    ///   setup write is rejected or start of measurement fails
    pub fn open(&mut self) -> Result<()> {
        if self.state() != SessionState::Disconnected {
            return Err(HardwareError::AlreadyOpen {
                device: DeviceKind::LoadCell,
            });
        }
        self.machine.transition_to(SessionState::Opening)?;
        info!(host = %self.config.hostname, "Opening load-cell session");
        self.last_block = LoadCellBlock::default();

        match self.start() {
            Ok(()) => {
                self.machine.transition_to(SessionState::Ready)?;
                info!("Load cell measuring");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Load-cell open failed, tearing down");
                self.teardown();
                self.machine.transition_to(SessionState::Disconnected)?;
                Err(e)
            }
        }
    }

    fn start(&mut self) -> Result<()> {
        let handle = self
            .driver
            .connect(&self.config.hostname)
            .ok_or_else(|| LoadCellStep::Connect.error(VendorCode::UNSUCCESSFUL))?;
        self.handle = Some(handle);
        info!("Load cell connected");

        let code = self.driver.sdo_write(handle, &self.config.measurement_setup);
        if ConfigWriteResult::from_code(code) == ConfigWriteResult::Unsuccessful {
            return Err(LoadCellStep::WriteSetup.error(code));
        }
        info!(target = %self.config.measurement_setup, %code, "Measurement setup written");

        self.driver
            .start_measurement(handle)
            .map_err(|code| LoadCellStep::StartMeasurement.error(code))?;
        self.measuring = true;
        Ok(())
    }

    /// Read every currently buffered line and return the last one.
    ///
    /// The available-line count is queried before each read; reading stops
    /// when it drops to zero, when a read fails, or after
    /// [`LoadCellConfig::max_drain_lines`] reads. With nothing buffered the
    /// previously drained block is returned.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::NotReady`] outside the `Ready` state.
    pub fn drain_available(&mut self) -> Result<LoadCellBlock> {
        let handle = self.ready_handle()?;

        let mut reads = 0usize;
        while reads < self.config.max_drain_lines {
            let available = self.driver.available_lines(handle);
            if available <= 0 {
                break;
            }
            match self.driver.read_next_block(handle) {
                Ok(block) => {
                    self.last_block = block;
                    reads += 1;
                }
                Err(code) => {
                    warn!(%code, available, "Load-cell block read failed");
                    break;
                }
            }
        }

        if reads == self.config.max_drain_lines {
            debug!(reads, "Drain bound reached");
        }
        trace!(reads, block = ?self.last_block, "Load cell drained");
        Ok(self.last_block)
    }

    /// Issue a raw configuration write.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::NotReady`] outside the `Ready` state.
    pub fn tare(&mut self, target: &ConfigTarget) -> Result<ConfigWriteResult> {
        let handle = self.ready_handle()?;
        let code = self.driver.sdo_write(handle, target);
        let result = ConfigWriteResult::from_code(code);
        info!(%target, %code, ?result, "Load-cell configuration write");
        Ok(result)
    }

    /// Zero the channels using the configured zero-offset write.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::NotReady`] outside the `Ready` state.
    pub fn tare_zero_offset(&mut self) -> Result<ConfigWriteResult> {
        let target = self.config.zero_offset.clone();
        self.tare(&target)
    }

    fn ready_handle(&self) -> Result<LoadCellHandle> {
        match (self.state(), self.handle) {
            (SessionState::Ready, Some(handle)) => Ok(handle),
            (state, _) => Err(HardwareError::NotReady {
                device: DeviceKind::LoadCell,
                state,
            }),
        }
    }

    /// Stop measuring and disconnect. Best effort, like the encoder.
    pub fn close(&mut self) {
        if self.state() != SessionState::Ready {
            debug!(state = %self.state(), "Load-cell close ignored");
            return;
        }
        if let Err(e) = self.machine.transition_to(SessionState::Closing) {
            warn!(error = %e, "Load-cell close transition rejected");
            return;
        }
        self.teardown();
        if let Err(e) = self.machine.transition_to(SessionState::Disconnected) {
            warn!(error = %e, "Load-cell close transition rejected");
        }
        info!("Load-cell session closed");
    }

    /// Force the session back to `Disconnected` from any state, tearing
    /// down whatever is open. For recovery after an operation was
    /// interrupted midway, such as a panic during `open`.
    pub fn reset(&mut self) {
        let state = self.state();
        if state == SessionState::Disconnected {
            return;
        }
        warn!(%state, "Resetting load-cell session");
        if state == SessionState::Ready {
            if let Err(e) = self.machine.transition_to(SessionState::Closing) {
                warn!(error = %e, "Load-cell reset transition rejected");
            }
        }
        self.teardown();
        if let Err(e) = self.machine.transition_to(SessionState::Disconnected) {
            warn!(error = %e, "Load-cell reset transition rejected");
        }
    }

    fn teardown(&mut self) {
        if let Some(handle) = self.handle.take() {
            if std::mem::take(&mut self.measuring) {
                log_teardown("stop measurement", self.driver.stop_measurement(handle));
            }
            log_teardown("disconnect", self.driver.disconnect(handle));
        }
    }
}

impl<D: LoadCellDriver> Drop for LoadCellSession<D> {
    fn drop(&mut self) {
        if self.state() == SessionState::Ready {
            self.close();
        }
    }
}

fn log_teardown(call: &str, result: VendorResult<()>) {
    if let Err(code) = result {
        warn!(call, %code, "Load-cell teardown call failed");
    }
}
