//! Mock device implementations for testing and development.
//!
//! This module provides simulated drivers that can be scripted and
//! inspected through a control handle without requiring physical hardware.

pub mod encoder;
pub mod load_cell;

// Re-export commonly used types
pub use encoder::{EncoderCall, MockEncoder, MockEncoderHandle};
pub use load_cell::{LoadCellCall, MockLoadCell, MockLoadCellHandle};
