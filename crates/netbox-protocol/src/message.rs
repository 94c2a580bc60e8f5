//! RDT request and record layouts.
//!
//! Both directions are fixed-size and big-endian:
//!
//! ```text
//! request (8 bytes):   magic u16 | command u16 | sample_count u32
//! record  (36 bytes):  rdt_sequence u32 | ft_sequence u32 | status u32
//!                      | fx i32 | fy i32 | fz i32 | tx i32 | ty i32 | tz i32
//! ```

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use netbox_core::{Error, LoadCellBlock, Result};

use crate::commands::RdtCommand;

/// Header magic of every request.
pub const RDT_MAGIC: u16 = 0x1234;

/// Encoded size of an [`RdtRequest`].
pub const REQUEST_LEN: usize = 8;

/// Encoded size of an [`RdtRecord`].
pub const RECORD_LEN: usize = 36;

/// Request sent to the sensor box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdtRequest {
    pub command: RdtCommand,
    /// Number of records to stream; 0 streams until a stop request.
    pub sample_count: u32,
}

impl RdtRequest {
    #[must_use]
    pub const fn new(command: RdtCommand, sample_count: u32) -> Self {
        Self {
            command,
            sample_count,
        }
    }

    /// Continuous real-time streaming.
    #[must_use]
    pub const fn start_streaming() -> Self {
        Self::new(RdtCommand::StartRealtime, 0)
    }

    #[must_use]
    pub const fn stop() -> Self {
        Self::new(RdtCommand::Stop, 0)
    }

    #[must_use]
    pub const fn set_bias() -> Self {
        Self::new(RdtCommand::SetBias, 0)
    }

    /// Append the wire form to `dst`.
    pub fn write_to(&self, dst: &mut impl BufMut) {
        dst.put_u16(RDT_MAGIC);
        dst.put_u16(self.command.code());
        dst.put_u32(self.sample_count);
    }

    /// Wire form as a fixed array, ready for a datagram.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; REQUEST_LEN] {
        let mut out = [0u8; REQUEST_LEN];
        let mut cursor = &mut out[..];
        self.write_to(&mut cursor);
        out
    }

    /// Parse a request from exactly [`REQUEST_LEN`] bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the length is wrong, the magic does not match,
    /// or the command code is unknown.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != REQUEST_LEN {
            return Err(Error::InvalidMessageFormat(format!(
                "RDT request must be {REQUEST_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut buf = bytes;
        let magic = buf.get_u16();
        if magic != RDT_MAGIC {
            return Err(Error::InvalidMagic {
                expected: RDT_MAGIC,
                actual: magic,
            });
        }
        let command = RdtCommand::try_from(buf.get_u16())?;
        let sample_count = buf.get_u32();
        Ok(Self::new(command, sample_count))
    }
}

/// One force/torque record streamed by the sensor box.
///
/// Channel values are raw counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdtRecord {
    pub rdt_sequence: u32,
    pub ft_sequence: u32,
    pub status: u32,
    pub fx: i32,
    pub fy: i32,
    pub fz: i32,
    pub tx: i32,
    pub ty: i32,
    pub tz: i32,
}

impl RdtRecord {
    pub(crate) fn read_from(buf: &mut impl Buf) -> Self {
        Self {
            rdt_sequence: buf.get_u32(),
            ft_sequence: buf.get_u32(),
            status: buf.get_u32(),
            fx: buf.get_i32(),
            fy: buf.get_i32(),
            fz: buf.get_i32(),
            tx: buf.get_i32(),
            ty: buf.get_i32(),
            tz: buf.get_i32(),
        }
    }

    /// Append the wire form to `dst`.
    pub fn write_to(&self, dst: &mut impl BufMut) {
        dst.put_u32(self.rdt_sequence);
        dst.put_u32(self.ft_sequence);
        dst.put_u32(self.status);
        for value in [self.fx, self.fy, self.fz, self.tx, self.ty, self.tz] {
            dst.put_i32(value);
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        let mut cursor = &mut out[..];
        self.write_to(&mut cursor);
        out
    }

    /// Parse a record from a datagram.
    ///
    /// Trailing bytes beyond [`RECORD_LEN`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than [`RECORD_LEN`] bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < RECORD_LEN {
            return Err(Error::InvalidMessageFormat(format!(
                "RDT record needs {RECORD_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut buf = bytes;
        Ok(Self::read_from(&mut buf))
    }

    /// Convert to a load-cell block: the RDT sequence becomes the
    /// timestamp and the channels keep their raw counts.
    #[must_use]
    pub fn to_block(&self) -> LoadCellBlock {
        LoadCellBlock {
            timestamp: f64::from(self.rdt_sequence),
            fx: f64::from(self.fx),
            fy: f64::from(self.fy),
            fz: f64::from(self.fz),
            tx: f64::from(self.tx),
            ty: f64::from(self.ty),
            tz: f64::from(self.tz),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_start_request_wire_form() {
        assert_eq!(
            RdtRequest::start_streaming().to_bytes(),
            [0x12, 0x34, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[rstest]
    #[case(RdtRequest::stop(), [0x12, 0x34, 0x00, 0x00, 0, 0, 0, 0])]
    #[case(RdtRequest::set_bias(), [0x12, 0x34, 0x00, 0x42, 0, 0, 0, 0])]
    #[case(RdtRequest::new(RdtCommand::StartRealtime, 10), [0x12, 0x34, 0x00, 0x02, 0, 0, 0, 10])]
    fn test_request_wire_forms(#[case] request: RdtRequest, #[case] expected: [u8; 8]) {
        assert_eq!(request.to_bytes(), expected);
        assert_eq!(RdtRequest::from_bytes(&expected).unwrap(), request);
    }

    #[test]
    fn test_request_bad_magic() {
        let err = RdtRequest::from_bytes(&[0xAB, 0xCD, 0, 2, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidMagic {
                expected: 0x1234,
                actual: 0xABCD
            }
        ));
    }

    #[test]
    fn test_request_wrong_length() {
        assert!(RdtRequest::from_bytes(&[0x12, 0x34, 0, 2]).is_err());
    }

    #[test]
    fn test_record_layout() {
        let record = RdtRecord {
            rdt_sequence: 7,
            ft_sequence: 8,
            status: 0,
            fx: -1,
            fy: 2,
            fz: 3_000_000,
            tx: 4,
            ty: 5,
            tz: 6,
        };
        let bytes = record.to_bytes();
        assert_eq!(&bytes[0..4], &[0, 0, 0, 7]);
        assert_eq!(&bytes[12..16], &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(RdtRecord::from_bytes(&bytes).unwrap(), record);
    }

    #[test]
    fn test_record_too_short() {
        let err = RdtRecord::from_bytes(&[0u8; 35]).unwrap_err();
        assert!(matches!(err, Error::InvalidMessageFormat(_)));
    }

    #[test]
    fn test_record_to_block() {
        let record = RdtRecord {
            rdt_sequence: 42,
            fx: 1000,
            fz: -2500,
            ..Default::default()
        };
        let block = record.to_block();
        assert_eq!(block.timestamp, 42.0);
        assert_eq!(block.fx, 1000.0);
        assert_eq!(block.fz, -2500.0);
        assert_eq!(block.tz, 0.0);
    }
}
