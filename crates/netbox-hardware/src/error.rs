//! Error types for hardware operations.
//!
//! Vendor drivers report failures as signed integer status codes. The
//! capability traits surface those codes unchanged as [`VendorCode`]; the
//! session layer turns them into [`HardwareError::DeviceProtocol`] values that
//! carry the device, the failing step and its position in the open sequence.

use std::fmt;

use crate::session::SessionState;

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Result of a single vendor call: the payload, or the raw status code.
pub type VendorResult<T> = std::result::Result<T, VendorCode>;

/// Raw status code returned by a vendor driver call.
///
/// Zero means success. Every other value is passed through untouched so it
/// can be reported to operators exactly as the vendor documents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VendorCode(pub i32);

impl VendorCode {
    /// Successful call.
    pub const OK: Self = Self(0);

    /// Generic failure, also used by the load-cell driver for a rejected
    /// configuration write.
    pub const UNSUCCESSFUL: Self = Self(-1);

    /// The encoder FIFO holds no complete entry yet.
    pub const FIFO_EMPTY: Self = Self(0xA000_0013_u32 as i32);

    /// Convert a raw status into a [`VendorResult`].
    ///
    /// # Examples
    ///
    /// ```
    /// use netbox_hardware::error::VendorCode;
    ///
    /// assert!(VendorCode::check(0).is_ok());
    /// assert_eq!(VendorCode::check(-1), Err(VendorCode::UNSUCCESSFUL));
    /// ```
    pub fn check(raw: i32) -> VendorResult<()> {
        if raw == 0 { Ok(()) } else { Err(Self(raw)) }
    }

    /// Raw integer value.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Returns `true` for the code signalling an empty encoder FIFO.
    #[must_use]
    pub const fn is_fifo_empty(self) -> bool {
        self.0 == Self::FIFO_EMPTY.0
    }
}

impl fmt::Display for VendorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.0, self.0 as u32)
    }
}

/// Which physical device an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Multi-axis position encoder unit.
    Encoder,
    /// Force/torque load-cell amplifier.
    LoadCell,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoder => f.write_str("encoder"),
            Self::LoadCell => f.write_str("load cell"),
        }
    }
}

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// A vendor call failed while opening or driving a device.
    #[error("{device} step {step_index} ({step}) failed with code {code}")]
    DeviceProtocol {
        device: DeviceKind,
        step: &'static str,
        step_index: usize,
        code: VendorCode,
    },

    /// `open` was called on a session that is not disconnected.
    #[error("{device} session is already open")]
    AlreadyOpen { device: DeviceKind },

    /// An operation needing a streaming session ran in another state.
    #[error("{device} session is not ready (state: {state})")]
    NotReady {
        device: DeviceKind,
        state: SessionState,
    },

    /// Rejected session state transition.
    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },

    /// Device configuration error.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Data returned by the driver could not be interpreted.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new device protocol error.
    pub fn protocol(
        device: DeviceKind,
        step: &'static str,
        step_index: usize,
        code: VendorCode,
    ) -> Self {
        Self::DeviceProtocol {
            device,
            step,
            step_index,
            code,
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Device the error refers to, when known.
    #[must_use]
    pub fn device(&self) -> Option<DeviceKind> {
        match self {
            Self::DeviceProtocol { device, .. }
            | Self::AlreadyOpen { device }
            | Self::NotReady { device, .. } => Some(*device),
            _ => None,
        }
    }

    /// Position of the failing step in the open sequence, for protocol errors.
    #[must_use]
    pub fn step_index(&self) -> Option<usize> {
        match self {
            Self::DeviceProtocol { step_index, .. } => Some(*step_index),
            _ => None,
        }
    }

    /// Vendor code of a protocol error.
    #[must_use]
    pub fn vendor_code(&self) -> Option<VendorCode> {
        match self {
            Self::DeviceProtocol { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Stable snake_case name of the variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DeviceProtocol { .. } => "device_protocol",
            Self::AlreadyOpen { .. } => "already_open",
            Self::NotReady { .. } => "not_ready",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::ConfigurationError { .. } => "configuration",
            Self::InvalidData { .. } => "invalid_data",
            Self::Io(_) => "io",
        }
    }
}
