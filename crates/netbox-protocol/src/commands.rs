//! Command codes of the NetFT raw data transfer (RDT) interface.
//!
//! Every request sent to the sensor box carries one of these codes in the
//! second header word:
//!
//! ```text
//! 0x1234 | command | sample_count
//! ^^^^^^   ^^^^^^^
//! magic    command code
//! ```
//!
//! # Examples
//!
//! ```
//! use netbox_protocol::RdtCommand;
//!
//! let cmd = RdtCommand::try_from(0x0002).unwrap();
//! assert_eq!(cmd, RdtCommand::StartRealtime);
//! assert_eq!(cmd.code(), 0x0002);
//! assert!(RdtCommand::try_from(0x0099).is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use netbox_core::Error;

/// RDT command code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum RdtCommand {
    /// Stop streaming.
    Stop = 0x0000,
    /// Start real-time streaming; a sample count of 0 streams until stopped.
    StartRealtime = 0x0002,
    /// Take the current reading as the software bias (zero offset).
    SetBias = 0x0042,
}

impl RdtCommand {
    /// Wire value of the command.
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Short human-readable name.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Stop => "stop streaming",
            Self::StartRealtime => "start real-time streaming",
            Self::SetBias => "set software bias",
        }
    }
}

impl TryFrom<u16> for RdtCommand {
    type Error = Error;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            0x0000 => Ok(Self::Stop),
            0x0002 => Ok(Self::StartRealtime),
            0x0042 => Ok(Self::SetBias),
            other => Err(Error::InvalidCommandCode(other)),
        }
    }
}

impl fmt::Display for RdtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X} ({})", self.code(), self.description())
    }
}
