//! Tokio codec for the RDT wire format.
//!
//! [`NetFtCodec`] encodes [`RdtRequest`]s and decodes [`RdtRecord`]s. It is
//! meant for `tokio_util::udp::UdpFramed`, where each datagram arrives as
//! its own buffer, but works equally over a byte stream since both layouts
//! have fixed sizes.
//!
//! # Usage with UdpFramed
//!
//! ```rust,no_run
//! use futures::{SinkExt, StreamExt};
//! use tokio::net::UdpSocket;
//! use tokio_util::udp::UdpFramed;
//! use netbox_protocol::{NetFtCodec, RdtRequest};
//!
//! # async fn example() -> netbox_core::Result<()> {
//! let socket = UdpSocket::bind("0.0.0.0:0").await?;
//! let sensor = "192.168.1.22:49152".parse().unwrap();
//! let mut framed = UdpFramed::new(socket, NetFtCodec::new());
//!
//! framed.send((RdtRequest::start_streaming(), sensor)).await?;
//! if let Some(Ok((record, _from))) = framed.next().await {
//!     println!("fx = {}", record.fx);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! The decoder waits (`Ok(None)`) until a full record is buffered and
//! always takes records from the front of the buffer. At the end of a
//! datagram (`decode_eof`), leftover bytes too short for a record are
//! dropped and counted instead of failing the stream.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use netbox_core::{Error, Result};

use crate::message::{RECORD_LEN, REQUEST_LEN, RdtRecord, RdtRequest};

/// Codec for the NetFT raw data transfer interface.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use tokio_util::codec::{Decoder, Encoder};
/// use netbox_protocol::{NetFtCodec, RdtRecord, RdtRequest};
///
/// let mut codec = NetFtCodec::new();
/// let mut buf = BytesMut::new();
/// codec.encode(RdtRequest::start_streaming(), &mut buf).unwrap();
/// assert_eq!(&buf[..], &[0x12, 0x34, 0x00, 0x02, 0, 0, 0, 0]);
///
/// let record = RdtRecord { rdt_sequence: 1, fz: 500, ..Default::default() };
/// let mut incoming = BytesMut::from(&record.to_bytes()[..]);
/// assert_eq!(codec.decode(&mut incoming).unwrap(), Some(record));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NetFtCodec {
    decoded: u64,
    dropped_bytes: u64,
}

impl NetFtCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records decoded so far.
    #[must_use]
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Trailing bytes discarded by `decode_eof`.
    #[must_use]
    pub fn dropped_bytes(&self) -> u64 {
        self.dropped_bytes
    }
}

impl Decoder for NetFtCodec {
    type Item = RdtRecord;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < RECORD_LEN {
            src.reserve(RECORD_LEN - src.len());
            return Ok(None);
        }
        let mut frame = src.split_to(RECORD_LEN);
        self.decoded += 1;
        Ok(Some(RdtRecord::read_from(&mut frame)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match self.decode(src)? {
            Some(record) => Ok(Some(record)),
            None => {
                self.dropped_bytes += src.len() as u64;
                src.clear();
                Ok(None)
            }
        }
    }
}

impl Encoder<RdtRequest> for NetFtCodec {
    type Error = Error;

    fn encode(&mut self, item: RdtRequest, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(REQUEST_LEN);
        item.write_to(dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::RdtCommand;

    fn record(seq: u32) -> RdtRecord {
        RdtRecord {
            rdt_sequence: seq,
            ft_sequence: seq * 2,
            fx: seq as i32,
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_complete_record() {
        let mut codec = NetFtCodec::new();
        let mut buf = BytesMut::from(&record(3).to_bytes()[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(record(3)));
        assert!(buf.is_empty());
        assert_eq!(codec.decoded(), 1);
    }

    #[test]
    fn test_decode_partial_record() {
        let mut codec = NetFtCodec::new();
        let bytes = record(1).to_bytes();
        let mut buf = BytesMut::from(&bytes[..20]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(buf.len(), 20);

        buf.extend_from_slice(&bytes[20..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(record(1)));
    }

    #[test]
    fn test_decode_multiple_records_in_buffer() {
        let mut codec = NetFtCodec::new();
        let mut buf = BytesMut::new();
        for seq in 1..=3 {
            buf.extend_from_slice(&record(seq).to_bytes());
        }
        for seq in 1..=3 {
            assert_eq!(codec.decode(&mut buf).unwrap(), Some(record(seq)));
        }
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_decode_eof_drops_runt() {
        let mut codec = NetFtCodec::new();
        let mut buf = BytesMut::from(&[0u8; 10][..]);
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
        assert_eq!(codec.dropped_bytes(), 10);
    }

    #[test]
    fn test_encode_appends() {
        let mut codec = NetFtCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(RdtRequest::set_bias(), &mut buf).unwrap();
        codec
            .encode(RdtRequest::new(RdtCommand::Stop, 0), &mut buf)
            .unwrap();
        assert_eq!(buf.len(), 2 * REQUEST_LEN);
        assert_eq!(&buf[2..4], &[0x00, 0x42]);
        assert_eq!(&buf[10..12], &[0x00, 0x00]);
    }
}
