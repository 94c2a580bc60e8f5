//! Mock encoder driver for testing and development.
//!
//! The mock keeps a queue of scripted FIFO frames. Each successful FIFO read
//! makes the next frame current; field extraction always answers from the
//! current frame, so an empty FIFO yields stale data exactly like the real
//! unit. Every call is recorded, and any call kind can be made to fail with
//! a chosen vendor code.

use std::collections::VecDeque;
use std::mem::{Discriminant, discriminant};
use std::sync::{Arc, Mutex, MutexGuard};

use netbox_core::EncoderSample;
use netbox_core::constants::AXIS_COUNT;

use crate::error::{VendorCode, VendorResult};
use crate::traits::EncoderDriver;
use crate::types::{
    AxisHandle, AxisSettings, DataItems, EibHandle, FieldType, FieldValue, FifoBuffer,
    OpenedEncoder, OperatingMode, PacketLayout, TriggerMask, TriggerSource,
};

/// Base of the axis handles handed out by the mock.
const AXIS_HANDLE_BASE: i32 = 100;

/// Code returned when streaming is selected before the packet is committed.
pub const MOCK_PACKET_NOT_CONFIGURED: VendorCode = VendorCode(-20);

/// A recorded driver call.
///
/// Axis arguments are recorded as axis indexes (0–3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderCall {
    GetHostIp(String),
    Open { timeout_ms: i32 },
    GetAxis,
    InitAxis(u8),
    GetTimestampTicks,
    SetTimestampPeriod(u32),
    SetTimestamp { axis: u8, enable: bool },
    AddDataPacketSection { region: u8, items: u32 },
    ConfigDataPacket { sections: usize },
    GetTimerTriggerTicks,
    SetTimerTriggerPeriod(u32),
    AxisTriggerSource { axis: u8, source: i32 },
    MasterTriggerSource(i32),
    SelectMode(OperatingMode),
    GlobalTriggerEnable { enable: bool, mask: i32 },
    ReadFifoData,
    ClearFifo,
    GetDataField { region: u8, field: FieldType },
    Close,
}

#[derive(Debug)]
struct MockEncoderState {
    calls: Vec<EncoderCall>,
    failures: Vec<(Discriminant<EncoderCall>, VendorCode)>,
    frames: VecDeque<EncoderSample>,
    current: EncoderSample,
    firmware: String,
    axis_count: usize,
    timestamp_ticks: u32,
    trigger_ticks: u32,
    open: bool,
    packet_committed: bool,
    mode: OperatingMode,
    trigger_enabled: bool,
}

impl Default for MockEncoderState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            failures: Vec::new(),
            frames: VecDeque::new(),
            current: EncoderSample::default(),
            firmware: "MOCK-EIB 1.0".to_string(),
            axis_count: AXIS_COUNT,
            timestamp_ticks: 1,
            trigger_ticks: 1,
            open: false,
            packet_committed: false,
            mode: OperatingMode::Polling,
            trigger_enabled: false,
        }
    }
}

impl MockEncoderState {
    /// Record `call` and return the injected failure for its kind, if any.
    fn record(&mut self, call: EncoderCall) -> VendorResult<()> {
        let kind = discriminant(&call);
        self.calls.push(call);
        match self.failures.iter().find(|(k, _)| *k == kind) {
            Some((_, code)) => Err(*code),
            None => Ok(()),
        }
    }
}

fn lock(state: &Mutex<MockEncoderState>) -> MutexGuard<'_, MockEncoderState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn axis_index(axis: AxisHandle) -> u8 {
    u8::try_from(axis.0 - AXIS_HANDLE_BASE).unwrap_or(u8::MAX)
}

/// Mock encoder driver.
///
/// # Examples
///
/// ```
/// use netbox_hardware::mock::{EncoderCall, MockEncoder};
/// use netbox_hardware::traits::EncoderDriver;
///
/// let (mut driver, handle) = MockEncoder::new();
/// let ip = driver.get_host_ip("192.168.1.2").unwrap();
/// assert_eq!(ip, 0xC0A8_0102);
/// assert_eq!(handle.calls(), vec![EncoderCall::GetHostIp("192.168.1.2".into())]);
/// ```
#[derive(Debug)]
pub struct MockEncoder {
    state: Arc<Mutex<MockEncoderState>>,
}

impl MockEncoder {
    /// Create a mock encoder and its control handle.
    pub fn new() -> (Self, MockEncoderHandle) {
        let state = Arc::new(Mutex::new(MockEncoderState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockEncoderHandle { state },
        )
    }

    fn state(&self) -> MutexGuard<'_, MockEncoderState> {
        lock(&self.state)
    }
}

impl Default for MockEncoder {
    fn default() -> Self {
        Self::new().0
    }
}

impl EncoderDriver for MockEncoder {
    fn get_host_ip(&mut self, hostname: &str) -> VendorResult<u32> {
        self.state()
            .record(EncoderCall::GetHostIp(hostname.to_string()))?;
        // Non-numeric names resolve to loopback.
        Ok(hostname
            .parse::<std::net::Ipv4Addr>()
            .map(u32::from)
            .unwrap_or(0x7F00_0001))
    }

    fn open(&mut self, _ip: u32, timeout_ms: i32) -> VendorResult<OpenedEncoder> {
        let mut state = self.state();
        state.record(EncoderCall::Open { timeout_ms })?;
        state.open = true;
        Ok(OpenedEncoder {
            handle: EibHandle(1),
            firmware: state.firmware.clone(),
        })
    }

    fn get_axis(&mut self, _eib: EibHandle) -> VendorResult<Vec<AxisHandle>> {
        let mut state = self.state();
        state.record(EncoderCall::GetAxis)?;
        Ok((0..state.axis_count)
            .map(|i| AxisHandle(AXIS_HANDLE_BASE + i as i32))
            .collect())
    }

    fn init_axis(&mut self, axis: AxisHandle, _settings: &AxisSettings) -> VendorResult<()> {
        self.state().record(EncoderCall::InitAxis(axis_index(axis)))
    }

    fn get_timestamp_ticks(&mut self, _eib: EibHandle) -> VendorResult<u32> {
        let mut state = self.state();
        state.record(EncoderCall::GetTimestampTicks)?;
        Ok(state.timestamp_ticks)
    }

    fn set_timestamp_period(&mut self, _eib: EibHandle, period: u32) -> VendorResult<()> {
        self.state().record(EncoderCall::SetTimestampPeriod(period))
    }

    fn set_timestamp(&mut self, axis: AxisHandle, enable: bool) -> VendorResult<()> {
        self.state().record(EncoderCall::SetTimestamp {
            axis: axis_index(axis),
            enable,
        })
    }

    fn add_data_packet_section(
        &mut self,
        packet: &mut PacketLayout,
        region: u8,
        items: DataItems,
    ) -> VendorResult<()> {
        self.state().record(EncoderCall::AddDataPacketSection {
            region,
            items: items.bits(),
        })?;
        if packet.push(region, items) {
            Ok(())
        } else {
            Err(MOCK_PACKET_NOT_CONFIGURED)
        }
    }

    fn config_data_packet(&mut self, _eib: EibHandle, packet: &PacketLayout) -> VendorResult<()> {
        let mut state = self.state();
        state.record(EncoderCall::ConfigDataPacket {
            sections: packet.len(),
        })?;
        state.packet_committed = true;
        Ok(())
    }

    fn get_timer_trigger_ticks(&mut self, _eib: EibHandle) -> VendorResult<u32> {
        let mut state = self.state();
        state.record(EncoderCall::GetTimerTriggerTicks)?;
        Ok(state.trigger_ticks)
    }

    fn set_timer_trigger_period(&mut self, _eib: EibHandle, period: u32) -> VendorResult<()> {
        self.state().record(EncoderCall::SetTimerTriggerPeriod(period))
    }

    fn axis_trigger_source(
        &mut self,
        axis: AxisHandle,
        source: TriggerSource,
    ) -> VendorResult<()> {
        self.state().record(EncoderCall::AxisTriggerSource {
            axis: axis_index(axis),
            source: source.0,
        })
    }

    fn master_trigger_source(
        &mut self,
        _eib: EibHandle,
        source: TriggerSource,
    ) -> VendorResult<()> {
        self.state().record(EncoderCall::MasterTriggerSource(source.0))
    }

    fn select_mode(&mut self, _eib: EibHandle, mode: OperatingMode) -> VendorResult<()> {
        let mut state = self.state();
        state.record(EncoderCall::SelectMode(mode))?;
        if mode == OperatingMode::Streaming && !state.packet_committed {
            return Err(MOCK_PACKET_NOT_CONFIGURED);
        }
        state.mode = mode;
        Ok(())
    }

    fn global_trigger_enable(
        &mut self,
        _eib: EibHandle,
        enable: bool,
        mask: TriggerMask,
    ) -> VendorResult<()> {
        let mut state = self.state();
        state.record(EncoderCall::GlobalTriggerEnable {
            enable,
            mask: mask.0,
        })?;
        state.trigger_enabled = enable;
        Ok(())
    }

    fn read_fifo_data(
        &mut self,
        _eib: EibHandle,
        _buffer: &mut FifoBuffer,
        _count: u32,
    ) -> VendorResult<u32> {
        let mut state = self.state();
        state.record(EncoderCall::ReadFifoData)?;
        match state.frames.pop_front() {
            Some(frame) => {
                state.current = frame;
                Ok(1)
            }
            None => Err(VendorCode::FIFO_EMPTY),
        }
    }

    fn clear_fifo(&mut self, _eib: EibHandle) -> VendorResult<()> {
        let mut state = self.state();
        state.record(EncoderCall::ClearFifo)?;
        state.frames.clear();
        Ok(())
    }

    fn get_data_field(
        &mut self,
        _eib: EibHandle,
        _buffer: &FifoBuffer,
        region: u8,
        field: FieldType,
    ) -> VendorResult<FieldValue> {
        let mut state = self.state();
        state.record(EncoderCall::GetDataField { region, field })?;
        let frame = state.current;
        match (region, field) {
            (0, FieldType::TriggerCounter) => Ok(FieldValue::U16(frame.trigger_counter)),
            (1..=4, FieldType::Timestamp) => Ok(FieldValue::U32(frame.timestamp)),
            (1..=4, FieldType::StatusWord) => Ok(FieldValue::U16(frame.status)),
            (1..=4, FieldType::Position) => {
                Ok(FieldValue::I64(frame.positions[usize::from(region - 1)]))
            }
            _ => Err(VendorCode::UNSUCCESSFUL),
        }
    }

    fn close(&mut self, _eib: EibHandle) -> VendorResult<()> {
        let mut state = self.state();
        // The connection is released even if the call reports an error.
        state.open = false;
        state.packet_committed = false;
        state.trigger_enabled = false;
        state.record(EncoderCall::Close)
    }
}

/// Control handle for a [`MockEncoder`].
#[derive(Debug, Clone)]
pub struct MockEncoderHandle {
    state: Arc<Mutex<MockEncoderState>>,
}

impl MockEncoderHandle {
    fn state(&self) -> MutexGuard<'_, MockEncoderState> {
        lock(&self.state)
    }

    /// Queue a FIFO frame.
    pub fn push_frame(&self, frame: EncoderSample) {
        self.state().frames.push_back(frame);
    }

    /// Queue a FIFO frame carrying only positions.
    pub fn push_positions(&self, positions: [i64; AXIS_COUNT]) {
        self.push_frame(EncoderSample {
            positions,
            ..EncoderSample::default()
        });
    }

    /// Number of queued frames not yet read.
    pub fn pending_frames(&self) -> usize {
        self.state().frames.len()
    }

    /// Make every call of the same kind as `call` fail with `code`.
    ///
    /// Only the variant of `call` matters, not its arguments.
    pub fn fail_on(&self, call: EncoderCall, code: VendorCode) {
        let kind = discriminant(&call);
        let mut state = self.state();
        state.failures.retain(|(k, _)| *k != kind);
        state.failures.push((kind, code));
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// All calls recorded so far, in order.
    pub fn calls(&self) -> Vec<EncoderCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Number of axes reported by axis enumeration.
    pub fn set_axis_count(&self, count: usize) {
        self.state().axis_count = count;
    }

    /// Timestamp and timer trigger tick rates.
    pub fn set_tick_rates(&self, timestamp_ticks: u32, trigger_ticks: u32) {
        let mut state = self.state();
        state.timestamp_ticks = timestamp_ticks;
        state.trigger_ticks = trigger_ticks;
    }

    pub fn is_open(&self) -> bool {
        self.state().open
    }

    pub fn mode(&self) -> OperatingMode {
        self.state().mode
    }

    pub fn trigger_enabled(&self) -> bool {
        self.state().trigger_enabled
    }
}
