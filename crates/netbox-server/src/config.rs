//! Server configuration.
//!
//! Values are layered with `figment`, later layers overriding earlier ones:
//!
//! 1. built-in defaults ([`ServerConfig::default`])
//! 2. a TOML file: `--config <path>`, or `netbox.toml` in the working
//!    directory when present
//! 3. environment variables prefixed `NETBOX_`, nested keys split on `__`
//!    (`NETBOX_ENCODER__HOSTNAME=10.0.0.5`)
//! 4. command-line flags
//!
//! # Example file
//!
//! ```toml
//! bind = "0.0.0.0:4000"
//! data_dir = "/var/lib/netbox"
//! request_timeout_ms = 10000
//! encoder_driver = "native"
//! load_cell_driver = "netft"
//! axes = [0, 1, 2]
//!
//! [encoder]
//! hostname = "192.168.1.2"
//!
//! [netft]
//! port = 49152
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use netbox_bridge::BridgeConfig;
use netbox_core::AxisSelection;
use netbox_core::constants::{DEFAULT_DATA_DIR, DEFAULT_HTTP_PORT};
use netbox_hardware::{EncoderConfig, LoadCellConfig};
use netbox_network::NetFtConfig;
use netbox_storage::LogConfig;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "netbox.toml";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "NETBOX_";

/// Errors raised while loading configuration or building drivers.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    MissingFile(PathBuf),

    #[error(transparent)]
    Figment(#[from] Box<figment::Error>),

    #[error("Invalid bind address {0:?}")]
    InvalidBind(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    #[error("The {driver} {device} driver is not available in this build")]
    DriverUnavailable {
        device: &'static str,
        driver: &'static str,
    },
}

/// Encoder driver selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Vendor library (feature `vendor-sdk`).
    Native,
    /// In-process simulated device.
    Mock,
}

impl Default for DriverKind {
    fn default() -> Self {
        if cfg!(feature = "vendor-sdk") {
            Self::Native
        } else {
            Self::Mock
        }
    }
}

/// Load-cell driver selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LoadCellDriverKind {
    /// Vendor library (feature `vendor-sdk`).
    Native,
    /// In-process simulated device.
    Mock,
    /// Legacy NetFT box over UDP.
    Netft,
}

impl Default for LoadCellDriverKind {
    fn default() -> Self {
        DriverKind::default().into()
    }
}

impl From<DriverKind> for LoadCellDriverKind {
    fn from(kind: DriverKind) -> Self {
        match kind {
            DriverKind::Native => Self::Native,
            DriverKind::Mock => Self::Mock,
        }
    }
}

/// Command line of the server binary.
#[derive(Debug, Default, Parser)]
#[command(name = "netbox-server")]
#[command(about = "HTTP bridge for the encoder and load-cell acquisition devices", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:4000
    #[arg(long)]
    pub bind: Option<String>,

    /// Directory log files are written to
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Driver for both devices
    #[arg(long, value_enum)]
    pub driver: Option<DriverKind>,

    /// Driver for the load cell, overriding --driver
    #[arg(long, value_enum)]
    pub load_cell_driver: Option<LoadCellDriverKind>,
}

#[derive(Debug, Default, Serialize)]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    bind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoder_driver: Option<DriverKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    load_cell_driver: Option<LoadCellDriverKind>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            bind: self.bind.clone(),
            data_dir: self.data_dir.clone(),
            encoder_driver: self.driver,
            load_cell_driver: self.load_cell_driver.or(self.driver.map(Into::into)),
        }
    }
}

/// Complete server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server listens on.
    pub bind: String,

    /// Directory log files are written to.
    pub data_dir: PathBuf,

    /// Upper bound of one device operation; the request fails after it.
    pub request_timeout_ms: u64,

    pub encoder_driver: DriverKind,
    pub load_cell_driver: LoadCellDriverKind,

    /// Encoder axes opened on connect.
    pub axes: AxisSelection,

    pub encoder: EncoderConfig,
    pub load_cell: LoadCellConfig,
    pub netft: NetFtConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: format!("127.0.0.1:{DEFAULT_HTTP_PORT}"),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            request_timeout_ms: 10_000,
            encoder_driver: DriverKind::default(),
            load_cell_driver: LoadCellDriverKind::default(),
            axes: AxisSelection::all(),
            encoder: EncoderConfig::default(),
            load_cell: LoadCellConfig::default(),
            netft: NetFtConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load the layered configuration for `cli`.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file is missing, a layer
    /// cannot be parsed, or a value is out of range.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        figment = match &cli.config {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::MissingFile(path.clone()));
                }
                figment.merge(Toml::file(path))
            }
            None => figment.merge(Toml::file(DEFAULT_CONFIG_FILE)),
        };

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(cli.overrides()))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialization alone does not constrain.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.encoder.connect_timeout_ms <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "encoder.connect_timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBind`] if `bind` is not `ip:port`.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.bind.clone()))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Bridge configuration derived from this server configuration.
    #[must_use]
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig::default()
            .with_encoder(self.encoder.clone())
            .with_load_cell(self.load_cell.clone())
            .with_log(LogConfig::new(&self.data_dir))
            .with_axes(self.axes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use netbox_core::AxisIndex;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr().unwrap().port(), 4000);
        assert_eq!(config.data_dir(), Path::new("./data"));
        assert_eq!(config.encoder.hostname, "192.168.1.2");
        assert_eq!(config.load_cell.hostname, "192.168.1.22");
        assert_eq!(config.netft.port, 49152);
        assert_eq!(config.axes.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_layers_override_in_order() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                    bind = "0.0.0.0:5000"
                    data_dir = "/tmp/from-file"
                    axes = [0, 2]

                    [encoder]
                    hostname = "10.0.0.1"
                "#,
            )?;
            jail.set_env("NETBOX_ENCODER__HOSTNAME", "10.0.0.2");
            jail.set_env("NETBOX_REQUEST_TIMEOUT_MS", "2500");

            let cli = Cli {
                data_dir: Some(PathBuf::from("/tmp/from-cli")),
                ..Cli::default()
            };
            let config = ServerConfig::load(&cli).map_err(|e| e.to_string())?;

            assert_eq!(config.bind, "0.0.0.0:5000");
            assert_eq!(config.encoder.hostname, "10.0.0.2");
            assert_eq!(config.request_timeout(), Duration::from_millis(2500));
            assert_eq!(config.data_dir, PathBuf::from("/tmp/from-cli"));
            assert!(config.axes.contains(AxisIndex::Z));
            assert!(!config.axes.contains(AxisIndex::Y));
            Ok(())
        });
    }

    #[test]
    fn test_driver_flag_sets_both_devices() {
        Jail::expect_with(|_jail| {
            let cli = Cli {
                driver: Some(DriverKind::Mock),
                ..Cli::default()
            };
            let config = ServerConfig::load(&cli).map_err(|e| e.to_string())?;
            assert_eq!(config.encoder_driver, DriverKind::Mock);
            assert_eq!(config.load_cell_driver, LoadCellDriverKind::Mock);

            let cli = Cli {
                driver: Some(DriverKind::Mock),
                load_cell_driver: Some(LoadCellDriverKind::Netft),
                ..Cli::default()
            };
            let config = ServerConfig::load(&cli).map_err(|e| e.to_string())?;
            assert_eq!(config.load_cell_driver, LoadCellDriverKind::Netft);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let cli = Cli {
            config: Some(PathBuf::from("/definitely/not/here.toml")),
            ..Cli::default()
        };
        assert!(matches!(
            ServerConfig::load(&cli),
            Err(ConfigError::MissingFile(_))
        ));
    }

    #[test]
    fn test_invalid_values() {
        let config = ServerConfig {
            bind: "localhost".to_string(),
            ..ServerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBind(_))));

        let config = ServerConfig {
            request_timeout_ms: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                ..
            })
        ));
    }

    #[test]
    fn test_empty_axes_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(DEFAULT_CONFIG_FILE, "axes = []")?;
            assert!(ServerConfig::load(&Cli::default()).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from([
            "netbox-server",
            "--bind",
            "0.0.0.0:4000",
            "--driver",
            "mock",
            "--load-cell-driver",
            "netft",
        ]);
        assert_eq!(cli.bind.as_deref(), Some("0.0.0.0:4000"));
        assert_eq!(cli.driver, Some(DriverKind::Mock));
        assert_eq!(cli.load_cell_driver, Some(LoadCellDriverKind::Netft));
    }
}
