//! Device layer of the NetBox acquisition bridge.
//!
//! This crate owns everything between the bridge and the two vendor driver
//! libraries: the capability traits describing the driver calls, the
//! sessions that sequence them, and the drivers implementing the traits.
//!
//! # Layers
//!
//! - [`traits`]: [`EncoderDriver`] and [`LoadCellDriver`], one method per
//!   vendor entry point, returning raw [`VendorCode`]s on failure
//! - [`encoder`] / [`load_cell`]: [`EncoderSession`] and [`LoadCellSession`]
//!   run the open sequences, own handles and packet layout, and turn vendor
//!   codes into [`HardwareError`]s
//! - [`session`]: the lifecycle state machine shared by both sessions
//! - [`mock`]: scripted drivers with call recording and failure injection
//! - `native` (feature `vendor-sdk`): bindings to the vendor libraries
//! - [`devices`]: enum dispatch over the available drivers
//!
//! # Example
//!
//! ```
//! use netbox_core::{AxisSelection, LoadCellBlock};
//! use netbox_hardware::encoder::{EncoderConfig, EncoderSession};
//! use netbox_hardware::load_cell::{LoadCellConfig, LoadCellSession};
//! use netbox_hardware::mock::{MockEncoder, MockLoadCell};
//!
//! let (encoder, encoder_handle) = MockEncoder::new();
//! let (load_cell, load_cell_handle) = MockLoadCell::new();
//!
//! let mut encoder = EncoderSession::new(encoder, EncoderConfig::default());
//! let mut load_cell = LoadCellSession::new(load_cell, LoadCellConfig::default());
//! encoder.open(&AxisSelection::all()).unwrap();
//! load_cell.open().unwrap();
//!
//! encoder_handle.push_positions([2_000_000, 0, 0, 0]);
//! load_cell_handle.push_block(LoadCellBlock { fx: 250.0, ..Default::default() });
//!
//! assert_eq!(encoder.read_cycle().unwrap().positions[0], 2_000_000);
//! assert_eq!(load_cell.drain_available().unwrap().fx, 250.0);
//! ```
//!
//! # Thread Safety
//!
//! Drivers and sessions are `Send` but not shared: a session must be
//! serialized externally (one mutex per session, or one owning thread).

pub mod devices;
pub mod encoder;
pub mod error;
pub mod load_cell;
pub mod mock;
#[cfg(feature = "vendor-sdk")]
pub mod native;
pub mod session;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::{AnyEncoderDriver, AnyLoadCellDriver};
pub use encoder::{EncoderConfig, EncoderSession, EncoderStep};
pub use error::{DeviceKind, HardwareError, Result, VendorCode, VendorResult};
pub use load_cell::{LoadCellConfig, LoadCellSession, LoadCellStep};
pub use session::{SessionState, SessionStateMachine};
pub use traits::{EncoderDriver, LoadCellDriver};
pub use types::{ConfigTarget, ConfigWriteResult};
