//! Connect/disconnect orchestration.
//!
//! A [`Bridge`] owns both device sessions for the lifetime of the process
//! and at most one [`MeasurementContext`]. Connect opens the encoder, then
//! the load cell, then the log file; any failure closes what was already
//! opened. A second connect while a measurement is active fails with
//! [`BridgeError::AlreadyConnected`] and leaves the active one untouched.

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{error, info, warn};

use netbox_core::TareOffsets;
use netbox_hardware::{
    ConfigWriteResult, EncoderDriver, EncoderSession, LoadCellDriver, LoadCellSession,
    SessionState,
};

use crate::config::BridgeConfig;
use crate::context::{ContextSummary, MeasurementContext};
use crate::error::{BridgeError, Result};
use crate::reconciler::{Reading, SampleReconciler};

/// Source of wall-clock time for file names and record dates.
pub type Clock = fn() -> DateTime<Local>;

/// Answer of a successful connect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectInfo {
    pub filename: String,
    pub session_id: uuid::Uuid,
}

/// State of the bridge for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeStatus {
    pub connected: bool,
    pub encoder: SessionState,
    pub load_cell: SessionState,
    pub encoder_firmware: Option<String>,
    pub measurement: Option<ContextSummary>,
}

/// Both device sessions plus the active measurement.
#[derive(Debug)]
pub struct Bridge<E: EncoderDriver, L: LoadCellDriver> {
    config: BridgeConfig,
    reconciler: SampleReconciler<E, L>,
    context: Option<MeasurementContext>,
    clock: Clock,
}

impl<E: EncoderDriver, L: LoadCellDriver> Bridge<E, L> {
    /// Create a disconnected bridge over the given drivers.
    pub fn new(encoder: E, load_cell: L, config: BridgeConfig) -> Self {
        let reconciler = SampleReconciler::new(
            EncoderSession::new(encoder, config.encoder.clone()),
            LoadCellSession::new(load_cell, config.load_cell.clone()),
        );
        Self {
            config,
            reconciler,
            context: None,
            clock: Local::now,
        }
    }

    /// Replace the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.context.is_some()
    }

    #[must_use]
    pub fn context(&self) -> Option<&MeasurementContext> {
        self.context.as_ref()
    }

    #[must_use]
    pub fn reconciler(&self) -> &SampleReconciler<E, L> {
        &self.reconciler
    }

    /// Open both devices and start a new measurement with its own log file
    /// and zeroed tare offsets.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::AlreadyConnected`] while a measurement is active
    /// - [`BridgeError::Hardware`] if either device fails to open
    /// - [`BridgeError::Storage`] if the log file cannot be created
    pub fn connect(&mut self) -> Result<ConnectInfo> {
        if self.context.is_some() {
            warn!("Connect requested while a measurement is active");
            return Err(BridgeError::AlreadyConnected);
        }

        self.reconciler.encoder_mut().open(&self.config.axes)?;

        if let Err(e) = self.reconciler.load_cell_mut().open() {
            error!(error = %e, "Load cell failed to open, closing encoder");
            self.reconciler.encoder_mut().close();
            return Err(e.into());
        }

        let context = match MeasurementContext::start(&self.config.log, (self.clock)()) {
            Ok(context) => context,
            Err(e) => {
                error!(error = %e, "Log file could not be created, closing devices");
                self.close_devices();
                return Err(e.into());
            }
        };

        let info = ConnectInfo {
            filename: context.log_filename().to_string(),
            session_id: context.id(),
        };
        info!(filename = %info.filename, session = %info.session_id, "Measurement started");
        self.context = Some(context);
        Ok(info)
    }

    /// Run one reconciliation cycle.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotConnected`] without an active measurement,
    /// or the error of the failing session or log write.
    pub fn sample(&mut self, write: bool) -> Result<Reading> {
        let now = (self.clock)();
        let context = self.context.as_mut().ok_or(BridgeError::NotConnected)?;
        self.reconciler.sample(context, write, now)
    }

    /// Capture the current encoder positions as the zero reference.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotConnected`] without an active measurement.
    pub fn tare_encoder(&mut self) -> Result<TareOffsets> {
        let context = self.context.as_mut().ok_or(BridgeError::NotConnected)?;
        self.reconciler.tare_encoder(context)
    }

    /// Zero the load-cell channels on the device.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotConnected`] without an active measurement.
    pub fn tare_load_cell(&mut self) -> Result<ConfigWriteResult> {
        if self.context.is_none() {
            return Err(BridgeError::NotConnected);
        }
        self.reconciler.tare_load_cell()
    }

    /// Close both devices and end the measurement.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotConnected`] without an active measurement.
    pub fn disconnect(&mut self) -> Result<()> {
        let context = self.context.take().ok_or(BridgeError::NotConnected)?;
        self.close_devices();
        info!(
            filename = %context.log_filename(),
            records = context.records_written(),
            "Measurement ended"
        );
        Ok(())
    }

    /// Drop any measurement and force both sessions back to
    /// `Disconnected`, whatever state an interrupted operation left them in.
    pub fn reset(&mut self) {
        if let Some(context) = self.context.take() {
            warn!(filename = %context.log_filename(), "Measurement dropped by reset");
        }
        self.reconciler.load_cell_mut().reset();
        self.reconciler.encoder_mut().reset();
    }

    #[must_use]
    pub fn status(&self) -> BridgeStatus {
        BridgeStatus {
            connected: self.context.is_some(),
            encoder: self.reconciler.encoder().state(),
            load_cell: self.reconciler.load_cell().state(),
            encoder_firmware: self.reconciler.encoder().firmware().map(str::to_string),
            measurement: self.context.as_ref().map(MeasurementContext::summary),
        }
    }

    fn close_devices(&mut self) {
        self.reconciler.load_cell_mut().close();
        self.reconciler.encoder_mut().close();
    }
}
