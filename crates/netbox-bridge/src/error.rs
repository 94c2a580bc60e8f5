use thiserror::Error;

use netbox_hardware::{DeviceKind, HardwareError};
use netbox_storage::StorageError;

/// Errors raised while orchestrating a measurement session.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// An operation needing devices ran with no active measurement.
    #[error("No active measurement session")]
    NotConnected,

    /// Connect was requested while a measurement is active.
    #[error("A measurement session is already active")]
    AlreadyConnected,

    /// A device session failed.
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// The log file could not be created or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid input.
    #[error(transparent)]
    Core(#[from] netbox_core::Error),
}

impl BridgeError {
    /// Stable snake_case name of the error, reported to HTTP clients.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::AlreadyConnected => "already_connected",
            Self::Hardware(e) => e.kind(),
            Self::Storage(_) => "storage",
            Self::Core(_) => "invalid_input",
        }
    }

    /// Failing step of a device open sequence.
    #[must_use]
    pub fn step_index(&self) -> Option<usize> {
        match self {
            Self::Hardware(e) => e.step_index(),
            _ => None,
        }
    }

    /// Device the error refers to.
    #[must_use]
    pub fn device(&self) -> Option<DeviceKind> {
        match self {
            Self::Hardware(e) => e.device(),
            _ => None,
        }
    }
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use netbox_hardware::VendorCode;
    use rstest::rstest;

    #[rstest]
    #[case(BridgeError::NotConnected, "not_connected", None)]
    #[case(BridgeError::AlreadyConnected, "already_connected", None)]
    #[case(
        BridgeError::Hardware(HardwareError::protocol(DeviceKind::Encoder, "open", 2, VendorCode(-3))),
        "device_protocol",
        Some(2)
    )]
    #[case(
        BridgeError::Storage(StorageError::Configuration("x".into())),
        "storage",
        None
    )]
    #[case(BridgeError::Core(netbox_core::Error::EmptyAxisSelection), "invalid_input", None)]
    fn test_kind_and_step(
        #[case] err: BridgeError,
        #[case] kind: &str,
        #[case] step: Option<usize>,
    ) {
        assert_eq!(err.kind(), kind);
        assert_eq!(err.step_index(), step);
    }
}
