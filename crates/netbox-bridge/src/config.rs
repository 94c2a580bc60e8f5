use netbox_core::AxisSelection;
use netbox_hardware::{EncoderConfig, LoadCellConfig};
use netbox_storage::LogConfig;
use serde::{Deserialize, Serialize};

/// Configuration of a bridge: both devices, the axes to stream and the
/// log directory.
///
/// # Example
///
/// ```
/// use netbox_bridge::BridgeConfig;
/// use netbox_core::{AxisIndex, AxisSelection};
///
/// let config = BridgeConfig::default()
///     .with_axes(AxisSelection::new([AxisIndex::X, AxisIndex::Y]).unwrap());
/// assert_eq!(config.axes.len(), 2);
/// assert_eq!(config.encoder.hostname, "192.168.1.2");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub encoder: EncoderConfig,
    pub load_cell: LoadCellConfig,
    pub log: LogConfig,
    /// Encoder axes opened on connect.
    pub axes: AxisSelection,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            encoder: EncoderConfig::default(),
            load_cell: LoadCellConfig::default(),
            log: LogConfig::default(),
            axes: AxisSelection::all(),
        }
    }
}

impl BridgeConfig {
    pub fn with_encoder(mut self, encoder: EncoderConfig) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_load_cell(mut self, load_cell: LoadCellConfig) -> Self {
        self.load_cell = load_cell;
        self
    }

    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    pub fn with_axes(mut self, axes: AxisSelection) -> Self {
        self.axes = axes;
        self
    }
}
