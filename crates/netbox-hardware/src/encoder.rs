//! Encoder session: lifecycle of one multi-axis encoder connection.
//!
//! [`EncoderSession::open`] runs the fixed streaming configuration sequence
//! and stops at the first vendor call that returns a non-zero code. Each step
//! is identified by an [`EncoderStep`], whose 1-based index is reported in
//! [`HardwareError::DeviceProtocol`]:
//!
//! | # | Step |
//! |---|------|
//! | 1 | resolve host |
//! | 2 | open connection |
//! | 3 | enumerate axes |
//! | 4 | initialize axes |
//! | 5–7 | timestamp ticks, period, enable |
//! | 8 | global packet section |
//! | 9–12 | axis packet sections 1–4 |
//! | 13 | commit packet |
//! | 14–15 | trigger ticks, period |
//! | 16–17 | axis and master trigger source |
//! | 18 | select streaming mode |
//! | 19 | enable global trigger |
//!
//! Once `Ready`, [`EncoderSession::read_cycle`] never fails for per-cycle
//! conditions: an empty FIFO clears the FIFO and the previous field values
//! are returned.
//!
//! # Examples
//!
//! ```
//! use netbox_core::AxisSelection;
//! use netbox_hardware::encoder::{EncoderConfig, EncoderSession};
//! use netbox_hardware::mock::MockEncoder;
//!
//! let (driver, handle) = MockEncoder::new();
//! let mut session = EncoderSession::new(driver, EncoderConfig::default());
//!
//! session.open(&AxisSelection::all()).unwrap();
//! handle.push_positions([2_000_000, 4_000_000, 6_000_000, 0]);
//!
//! let sample = session.read_cycle().unwrap();
//! assert_eq!(sample.positions[1], 4_000_000);
//! session.close();
//! ```

use std::fmt;

use netbox_core::constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_ENCODER_HOST, TIMESTAMP_PERIOD_BASE, TRIGGER_PERIOD_BASE,
};
use netbox_core::{AxisIndex, AxisSelection, EncoderSample};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::error::{DeviceKind, HardwareError, Result, VendorCode, VendorResult};
use crate::session::{SessionState, SessionStateMachine};
use crate::traits::EncoderDriver;
use crate::types::{
    AxisHandle, AxisSettings, DataItems, EibHandle, FieldType, FieldValue, FifoBuffer,
    OperatingMode, PacketLayout, TriggerMask, TriggerSource,
};

/// Global packet region holding the trigger counter.
const GLOBAL_REGION: u8 = 0;

/// Axis region the timestamp and status word are read from.
const REFERENCE_REGION: u8 = 1;

/// Encoder session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Host name or IP address of the unit.
    pub hostname: String,

    /// Connection timeout handed to the driver (milliseconds).
    pub connect_timeout_ms: i32,

    /// Timer trigger period, multiplied by the queried trigger tick rate.
    pub trigger_period_base: u32,

    /// Timestamp period, multiplied by the queried timestamp tick rate.
    pub timestamp_period_base: u32,

    /// Initialization words applied to every selected axis.
    pub axis_settings: AxisSettings,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_ENCODER_HOST.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            trigger_period_base: TRIGGER_PERIOD_BASE,
            timestamp_period_base: TIMESTAMP_PERIOD_BASE,
            axis_settings: AxisSettings::default(),
        }
    }
}

impl EncoderConfig {
    /// Set the host name or IP address.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout_ms(mut self, timeout_ms: i32) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    /// Set the trigger period base.
    pub fn with_trigger_period_base(mut self, base: u32) -> Self {
        self.trigger_period_base = base;
        self
    }

    /// Set the timestamp period base.
    pub fn with_timestamp_period_base(mut self, base: u32) -> Self {
        self.timestamp_period_base = base;
        self
    }

    /// Set the axis initialization words.
    pub fn with_axis_settings(mut self, settings: AxisSettings) -> Self {
        self.axis_settings = settings;
        self
    }
}

/// One step of the open sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderStep {
    ResolveHost,
    OpenConnection,
    EnumerateAxes,
    InitAxes,
    TimestampTicks,
    TimestampPeriod,
    EnableTimestamps,
    GlobalPacketSection,
    /// Packet section of axis region 1–4.
    AxisPacketSection(u8),
    CommitPacket,
    TriggerTicks,
    TriggerPeriod,
    AxisTriggerSource,
    MasterTriggerSource,
    SelectStreamingMode,
    EnableGlobalTrigger,
}

impl EncoderStep {
    /// 1-based position in the open sequence.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::ResolveHost => 1,
            Self::OpenConnection => 2,
            Self::EnumerateAxes => 3,
            Self::InitAxes => 4,
            Self::TimestampTicks => 5,
            Self::TimestampPeriod => 6,
            Self::EnableTimestamps => 7,
            Self::GlobalPacketSection => 8,
            Self::AxisPacketSection(region) => 8 + usize::from(region),
            Self::CommitPacket => 13,
            Self::TriggerTicks => 14,
            Self::TriggerPeriod => 15,
            Self::AxisTriggerSource => 16,
            Self::MasterTriggerSource => 17,
            Self::SelectStreamingMode => 18,
            Self::EnableGlobalTrigger => 19,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ResolveHost => "resolve host",
            Self::OpenConnection => "open connection",
            Self::EnumerateAxes => "enumerate axes",
            Self::InitAxes => "initialize axes",
            Self::TimestampTicks => "timestamp ticks",
            Self::TimestampPeriod => "timestamp period",
            Self::EnableTimestamps => "enable timestamps",
            Self::GlobalPacketSection => "global packet section",
            Self::AxisPacketSection(_) => "axis packet section",
            Self::CommitPacket => "commit packet",
            Self::TriggerTicks => "trigger ticks",
            Self::TriggerPeriod => "trigger period",
            Self::AxisTriggerSource => "axis trigger source",
            Self::MasterTriggerSource => "master trigger source",
            Self::SelectStreamingMode => "select streaming mode",
            Self::EnableGlobalTrigger => "enable global trigger",
        }
    }
}

impl fmt::Display for EncoderStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AxisPacketSection(region) => write!(f, "axis packet section {region}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Axis handles of an open session, indexed by axis.
///
/// An entry is `Some` once the axis was initialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisSet {
    handles: [Option<AxisHandle>; 4],
}

impl AxisSet {
    /// Handle of `axis`, if it was initialized.
    #[must_use]
    pub fn get(&self, axis: AxisIndex) -> Option<AxisHandle> {
        self.handles[axis.as_usize()]
    }

    /// Initialized axes with their handles, in axis order.
    pub fn initialized(&self) -> impl Iterator<Item = (AxisIndex, AxisHandle)> + '_ {
        AxisIndex::ALL
            .into_iter()
            .filter_map(|axis| self.get(axis).map(|handle| (axis, handle)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.iter().flatten().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lifecycle owner of one encoder connection.
#[derive(Debug)]
pub struct EncoderSession<D: EncoderDriver> {
    driver: D,
    config: EncoderConfig,
    machine: SessionStateMachine,
    eib: Option<EibHandle>,
    firmware: Option<String>,
    axes: AxisSet,
    packet: PacketLayout,
    fifo: FifoBuffer,
    last_sample: EncoderSample,
}

impl<D: EncoderDriver> EncoderSession<D> {
    /// Create a disconnected session over `driver`.
    pub fn new(driver: D, config: EncoderConfig) -> Self {
        Self {
            driver,
            config,
            machine: SessionStateMachine::new(),
            eib: None,
            firmware: None,
            axes: AxisSet::default(),
            packet: PacketLayout::new(),
            fifo: FifoBuffer::new(),
            last_sample: EncoderSample::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.machine.current_state()
    }

    #[must_use]
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Firmware string reported when the connection was opened.
    #[must_use]
    pub fn firmware(&self) -> Option<&str> {
        self.firmware.as_deref()
    }

    #[must_use]
    pub fn axes(&self) -> &AxisSet {
        &self.axes
    }

    #[must_use]
    pub fn packet(&self) -> &PacketLayout {
        &self.packet
    }

    /// Sample returned by the most recent read cycle.
    #[must_use]
    pub fn last_sample(&self) -> &EncoderSample {
        &self.last_sample
    }

    /// Open the connection and put the unit into streaming mode.
    ///
    /// # Errors
    ///
    /// - [`HardwareError::AlreadyOpen`] if the session is not disconnected
    /// - [`HardwareError::DeviceProtocol`] for the first failing step; the
    ///   session is torn down and back in `Disconnected`. A selected axis the
    ///   unit does not report fails the axis-init step, and a period that
    ///   overflows fails its period step, both with
    ///   [`VendorCode::UNSUCCESSFUL`]
    pub fn open(&mut self, axes: &AxisSelection) -> Result<()> {
        if self.state() != SessionState::Disconnected {
            return Err(HardwareError::AlreadyOpen {
                device: DeviceKind::Encoder,
            });
        }
        self.machine.transition_to(SessionState::Opening)?;
        info!(host = %self.config.hostname, axes = %axes, "Opening encoder session");
        self.last_sample = EncoderSample::default();

        match self.configure_streaming(axes) {
            Ok(()) => {
                self.machine.transition_to(SessionState::Ready)?;
                info!(axes = self.axes.len(), "Encoder streaming");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Encoder open failed, tearing down");
                self.teardown();
                self.machine.transition_to(SessionState::Disconnected)?;
                Err(e)
            }
        }
    }

    fn configure_streaming(&mut self, axes: &AxisSelection) -> Result<()> {
        let ip = check(
            EncoderStep::ResolveHost,
            self.driver.get_host_ip(&self.config.hostname),
        )?;

        let opened = check(
            EncoderStep::OpenConnection,
            self.driver.open(ip, self.config.connect_timeout_ms),
        )?;
        let eib = opened.handle;
        self.eib = Some(eib);
        info!(firmware = %opened.firmware, "Encoder connection open");
        self.firmware = Some(opened.firmware);

        let enumerated = check(EncoderStep::EnumerateAxes, self.driver.get_axis(eib))?;
        info!(count = enumerated.len(), "Encoder axes enumerated");

        for axis in axes.iter() {
            let Some(handle) = enumerated.get(axis.as_usize()).copied() else {
                warn!(%axis, count = enumerated.len(), "Selected axis not reported by the unit");
                return check(EncoderStep::InitAxes, Err(VendorCode::UNSUCCESSFUL));
            };
            check(
                EncoderStep::InitAxes,
                self.driver.init_axis(handle, &self.config.axis_settings),
            )?;
            self.axes.handles[axis.as_usize()] = Some(handle);
        }
        info!(axes = %axes, "Encoder axes initialized");

        let ticks = check(
            EncoderStep::TimestampTicks,
            self.driver.get_timestamp_ticks(eib),
        )?;
        let period = scaled_period(
            EncoderStep::TimestampPeriod,
            ticks,
            self.config.timestamp_period_base,
        )?;
        check(
            EncoderStep::TimestampPeriod,
            self.driver.set_timestamp_period(eib, period),
        )?;
        info!(ticks, period, "Timestamp period set");

        for (_, handle) in self.axes.initialized() {
            check(
                EncoderStep::EnableTimestamps,
                self.driver.set_timestamp(handle, true),
            )?;
        }
        info!("Timestamps enabled");

        check(
            EncoderStep::GlobalPacketSection,
            self.driver.add_data_packet_section(
                &mut self.packet,
                GLOBAL_REGION,
                DataItems::TRIGGER_COUNTER,
            ),
        )?;
        for axis in AxisIndex::ALL {
            let region = axis.packet_region();
            check(
                EncoderStep::AxisPacketSection(region),
                self.driver
                    .add_data_packet_section(&mut self.packet, region, DataItems::AXIS_DEFAULT),
            )?;
        }
        check(
            EncoderStep::CommitPacket,
            self.driver.config_data_packet(eib, &self.packet),
        )?;
        self.packet.commit();
        info!(sections = self.packet.len(), "Data packet configured");

        let trigger_ticks = check(
            EncoderStep::TriggerTicks,
            self.driver.get_timer_trigger_ticks(eib),
        )?;
        let trigger_period = scaled_period(
            EncoderStep::TriggerPeriod,
            trigger_ticks,
            self.config.trigger_period_base,
        )?;
        check(
            EncoderStep::TriggerPeriod,
            self.driver.set_timer_trigger_period(eib, trigger_period),
        )?;
        info!(ticks = trigger_ticks, period = trigger_period, "Trigger period set");

        for (_, handle) in self.axes.initialized() {
            check(
                EncoderStep::AxisTriggerSource,
                self.driver.axis_trigger_source(handle, TriggerSource::TIMER),
            )?;
        }
        check(
            EncoderStep::MasterTriggerSource,
            self.driver.master_trigger_source(eib, TriggerSource::TIMER),
        )?;
        info!("Trigger sources set");

        check(
            EncoderStep::SelectStreamingMode,
            self.driver.select_mode(eib, OperatingMode::Streaming),
        )?;
        info!("Streaming mode selected");

        check(
            EncoderStep::EnableGlobalTrigger,
            self.driver
                .global_trigger_enable(eib, true, TriggerMask::TIMER),
        )?;
        info!("Global trigger enabled");

        Ok(())
    }

    /// Read one FIFO entry and extract the sample fields.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::NotReady`] outside the `Ready` state. Vendor
    /// codes of the read and extraction calls are logged, never returned.
    pub fn read_cycle(&mut self) -> Result<EncoderSample> {
        let eib = self.ready_handle()?;

        match self.driver.read_fifo_data(eib, &mut self.fifo, 1) {
            Ok(entries) => trace!(entries, "FIFO read"),
            Err(code) if code.is_fifo_empty() => {
                debug!("FIFO not ready, clearing");
                if let Err(code) = self.driver.clear_fifo(eib) {
                    warn!(%code, "FIFO clear failed");
                }
            }
            Err(code) => warn!(%code, "FIFO read returned an error code"),
        }

        let previous = self.last_sample;
        let mut sample = EncoderSample {
            trigger_counter: self
                .extract(eib, GLOBAL_REGION, FieldType::TriggerCounter)
                .and_then(FieldValue::as_u16)
                .unwrap_or(previous.trigger_counter),
            timestamp: self
                .extract(eib, REFERENCE_REGION, FieldType::Timestamp)
                .and_then(FieldValue::as_u32)
                .unwrap_or(previous.timestamp),
            ..previous
        };
        for axis in AxisIndex::ALL {
            if let Some(position) = self
                .extract(eib, axis.packet_region(), FieldType::Position)
                .and_then(FieldValue::as_i64)
            {
                sample.positions[axis.as_usize()] = position;
            }
        }
        if let Some(status) = self
            .extract(eib, REFERENCE_REGION, FieldType::StatusWord)
            .and_then(FieldValue::as_u16)
        {
            sample.status = status;
        }

        trace!(?sample, "Encoder cycle");
        self.last_sample = sample;
        Ok(sample)
    }

    fn extract(&mut self, eib: EibHandle, region: u8, field: FieldType) -> Option<FieldValue> {
        match self.driver.get_data_field(eib, &self.fifo, region, field) {
            Ok(value) => Some(value),
            Err(code) => {
                warn!(region, %field, %code, "Field extraction failed");
                None
            }
        }
    }

    fn ready_handle(&self) -> Result<EibHandle> {
        match (self.state(), self.eib) {
            (SessionState::Ready, Some(eib)) => Ok(eib),
            (state, _) => Err(HardwareError::NotReady {
                device: DeviceKind::Encoder,
                state,
            }),
        }
    }

    /// Stop streaming and close the connection.
    ///
    /// Best effort: failing teardown calls are logged and the session ends
    /// up `Disconnected` regardless. Closing a closed session does nothing.
    pub fn close(&mut self) {
        if self.state() != SessionState::Ready {
            debug!(state = %self.state(), "Encoder close ignored");
            return;
        }
        if let Err(e) = self.machine.transition_to(SessionState::Closing) {
            warn!(error = %e, "Encoder close transition rejected");
            return;
        }
        self.teardown();
        if let Err(e) = self.machine.transition_to(SessionState::Disconnected) {
            warn!(error = %e, "Encoder close transition rejected");
        }
        info!("Encoder session closed");
    }

    /// Force the session back to `Disconnected` from any state, tearing
    /// down whatever is open. For recovery after an operation was
    /// interrupted midway, such as a panic during `open`.
    pub fn reset(&mut self) {
        let state = self.state();
        if state == SessionState::Disconnected {
            return;
        }
        warn!(%state, "Resetting encoder session");
        if state == SessionState::Ready {
            if let Err(e) = self.machine.transition_to(SessionState::Closing) {
                warn!(error = %e, "Encoder reset transition rejected");
            }
        }
        self.teardown();
        if let Err(e) = self.machine.transition_to(SessionState::Disconnected) {
            warn!(error = %e, "Encoder reset transition rejected");
        }
    }

    /// Disable triggers, drop back to polling and close. Never fails.
    fn teardown(&mut self) {
        if let Some(eib) = self.eib.take() {
            log_teardown(
                "disable global trigger",
                self.driver.global_trigger_enable(eib, false, TriggerMask::ALL),
            );
            log_teardown(
                "select polling mode",
                self.driver.select_mode(eib, OperatingMode::Polling),
            );
            log_teardown("close", self.driver.close(eib));
        }
        self.firmware = None;
        self.axes = AxisSet::default();
        self.packet = PacketLayout::new();
    }
}

impl<D: EncoderDriver> Drop for EncoderSession<D> {
    fn drop(&mut self) {
        if self.state() == SessionState::Ready {
            self.close();
        }
    }
}

fn check<T>(step: EncoderStep, result: VendorResult<T>) -> Result<T> {
    result.map_err(|code| {
        HardwareError::protocol(DeviceKind::Encoder, step.name(), step.index(), code)
    })
}

/// A period that does not fit the register fails its step like a vendor
/// rejection would.
fn scaled_period(step: EncoderStep, ticks: u32, base: u32) -> Result<u32> {
    let period = ticks.checked_mul(base).ok_or(VendorCode::UNSUCCESSFUL);
    if period.is_err() {
        warn!(%step, base, ticks, "Period overflows the register");
    }
    check(step, period)
}

fn log_teardown(call: &str, result: VendorResult<()>) {
    if let Err(code) = result {
        warn!(call, %code, "Encoder teardown call failed");
    }
}
