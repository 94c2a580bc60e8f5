//! Driver construction from configuration.

use netbox_bridge::Bridge;
use netbox_hardware::mock::{MockEncoder, MockLoadCell};
#[cfg(feature = "vendor-sdk")]
use netbox_hardware::native::{NativeEncoder, NativeLoadCell};
use netbox_hardware::{AnyEncoderDriver, AnyLoadCellDriver};
use netbox_network::NetFtDriver;
use tracing::info;

use crate::config::{ConfigError, DriverKind, LoadCellDriverKind, ServerConfig};

/// Bridge type served over HTTP.
pub type ServerBridge = Bridge<AnyEncoderDriver, AnyLoadCellDriver>;

/// Build the configured encoder driver.
///
/// # Errors
///
/// Returns [`ConfigError::DriverUnavailable`] for `native` in a build
/// without the `vendor-sdk` feature.
pub fn encoder_driver(kind: DriverKind) -> Result<AnyEncoderDriver, ConfigError> {
    match kind {
        DriverKind::Mock => {
            let (driver, _handle) = MockEncoder::new();
            Ok(AnyEncoderDriver::Mock(driver))
        }
        DriverKind::Native => native_encoder(),
    }
}

/// Build the configured load-cell driver.
///
/// # Errors
///
/// Returns [`ConfigError::DriverUnavailable`] for `native` in a build
/// without the `vendor-sdk` feature.
pub fn load_cell_driver(
    kind: LoadCellDriverKind,
    config: &ServerConfig,
) -> Result<AnyLoadCellDriver, ConfigError> {
    match kind {
        LoadCellDriverKind::Mock => {
            let (driver, _handle) = MockLoadCell::new();
            Ok(AnyLoadCellDriver::Mock(driver))
        }
        LoadCellDriverKind::Netft => Ok(AnyLoadCellDriver::External(Box::new(
            NetFtDriver::new(config.netft.clone()),
        ))),
        LoadCellDriverKind::Native => native_load_cell(),
    }
}

/// Build a disconnected bridge over the configured drivers.
///
/// # Errors
///
/// Returns an error if a configured driver is not available.
pub fn build_bridge(config: &ServerConfig) -> Result<ServerBridge, ConfigError> {
    let encoder = encoder_driver(config.encoder_driver)?;
    let load_cell = load_cell_driver(config.load_cell_driver, config)?;
    info!(
        encoder = ?config.encoder_driver,
        load_cell = ?config.load_cell_driver,
        "Drivers selected"
    );
    Ok(Bridge::new(encoder, load_cell, config.bridge_config()))
}

#[cfg(feature = "vendor-sdk")]
fn native_encoder() -> Result<AnyEncoderDriver, ConfigError> {
    Ok(AnyEncoderDriver::Native(NativeEncoder::new()))
}

#[cfg(not(feature = "vendor-sdk"))]
fn native_encoder() -> Result<AnyEncoderDriver, ConfigError> {
    Err(ConfigError::DriverUnavailable {
        device: "encoder",
        driver: "native",
    })
}

#[cfg(feature = "vendor-sdk")]
fn native_load_cell() -> Result<AnyLoadCellDriver, ConfigError> {
    Ok(AnyLoadCellDriver::Native(NativeLoadCell::new()))
}

#[cfg(not(feature = "vendor-sdk"))]
fn native_load_cell() -> Result<AnyLoadCellDriver, ConfigError> {
    Err(ConfigError::DriverUnavailable {
        device: "load cell",
        driver: "native",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_drivers() {
        let config = ServerConfig {
            encoder_driver: DriverKind::Mock,
            load_cell_driver: LoadCellDriverKind::Mock,
            ..ServerConfig::default()
        };
        let bridge = build_bridge(&config).unwrap();
        assert!(!bridge.is_connected());
    }

    #[test]
    fn test_netft_load_cell() {
        let config = ServerConfig::default();
        let driver = load_cell_driver(LoadCellDriverKind::Netft, &config).unwrap();
        assert_eq!(format!("{driver:?}"), "External(..)");
    }

    #[cfg(not(feature = "vendor-sdk"))]
    #[test]
    fn test_native_unavailable_without_feature() {
        assert!(matches!(
            encoder_driver(DriverKind::Native),
            Err(ConfigError::DriverUnavailable { device: "encoder", .. })
        ));
        assert!(matches!(
            load_cell_driver(LoadCellDriverKind::Native, &ServerConfig::default()),
            Err(ConfigError::DriverUnavailable { .. })
        ));
    }
}
