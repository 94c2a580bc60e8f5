//! Measurement orchestration for the NetBox acquisition bridge.
//!
//! This crate ties the device sessions of `netbox-hardware` to the log of
//! `netbox-storage`:
//!
//! - [`SampleReconciler`]: one row per request from two independently
//!   clocked devices, with tare and scaling
//! - [`MeasurementContext`]: tare offsets and log file of one measurement
//! - [`Bridge`]: connect/disconnect and the operations exposed over HTTP
//!
//! # Examples
//!
//! ```
//! use netbox_bridge::{Bridge, BridgeConfig};
//! use netbox_hardware::mock::{MockEncoder, MockLoadCell};
//! use netbox_storage::LogConfig;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let (encoder, encoder_handle) = MockEncoder::new();
//! let (load_cell, _load_cell_handle) = MockLoadCell::new();
//! let config = BridgeConfig::default().with_log(LogConfig::new(dir.path()));
//! let mut bridge = Bridge::new(encoder, load_cell, config);
//!
//! bridge.connect().unwrap();
//! encoder_handle.push_positions([3_000_000, 0, 0, 0]);
//! let reading = bridge.sample(true).unwrap();
//! assert_eq!(reading.response().ax, 1.5);
//! bridge.disconnect().unwrap();
//! ```

pub mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod reconciler;

pub use bridge::{Bridge, BridgeStatus, Clock, ConnectInfo};
pub use config::BridgeConfig;
pub use context::{ContextSummary, MeasurementContext};
pub use error::{BridgeError, Result};
pub use reconciler::{Reading, SampleReconciler, SampleResponse, reconcile};
