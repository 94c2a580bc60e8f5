//! Drivers backed by the vendor shared libraries.
//!
//! Only compiled with the `vendor-sdk` feature. All `unsafe` code of the
//! workspace lives in this module.

mod clipx;
mod eib7;

pub use clipx::NativeLoadCell;
pub use eib7::{DEFAULT_FIFO_TIMEOUT_MS, NativeEncoder};
