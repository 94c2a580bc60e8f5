//! Wire format of the legacy NetFT load-cell box.
//!
//! The box speaks the raw data transfer (RDT) interface over UDP: the
//! client sends 8-byte requests and the box answers with a stream of
//! 36-byte force/torque records.
//!
//! - [`commands`]: the request command codes
//! - [`message`]: request and record layouts
//! - [`codec`]: a `tokio_util` codec over both

pub mod codec;
pub mod commands;
pub mod message;

pub use codec::NetFtCodec;
pub use commands::RdtCommand;
pub use message::{RDT_MAGIC, RECORD_LEN, REQUEST_LEN, RdtRecord, RdtRequest};
