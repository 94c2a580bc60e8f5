//! NetFT RDT driver for the load-cell capability.
//!
//! The RDT interface streams records over UDP after a start request. The
//! capability expects a buffered line source, so the driver keeps a local
//! queue: [`LoadCellDriver::available_lines`] drains every datagram that
//! has already arrived into the queue without blocking and reports its
//! length, and [`LoadCellDriver::read_next_block`] pops from its front.
//!
//! # Mapping
//!
//! | Capability call | RDT |
//! |---|---|
//! | `connect` | bind a local socket and connect it to `host:port` |
//! | `start_measurement` | start real-time streaming, sample count 0 |
//! | `sdo_write` (zero offset) | set software bias |
//! | `sdo_write` (anything else) | accepted, nothing sent |
//! | `stop_measurement` | stop streaming |
//! | `disconnect` | drop the socket |

use std::collections::VecDeque;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::num::NonZeroUsize;

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::codec::Decoder;
use tracing::{debug, info, trace, warn};

use netbox_core::LoadCellBlock;
use netbox_core::constants::DEFAULT_NETFT_PORT;
use netbox_hardware::types::{ConfigTarget, LoadCellHandle};
use netbox_hardware::{LoadCellDriver, VendorCode, VendorResult};
use netbox_protocol::{NetFtCodec, RdtRequest};

/// Largest datagram the driver reads at once.
const MAX_DATAGRAM: usize = 1500;

/// Configuration for the NetFT driver.
///
/// # Example
///
/// ```
/// use netbox_network::NetFtConfig;
///
/// let config = NetFtConfig::default().with_port(50000);
/// assert_eq!(config.port, 50000);
/// assert_eq!(config.bind_addr, "0.0.0.0:0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetFtConfig {
    /// Port of the sensor box, used when the host carries none.
    pub port: u16,

    /// Local address the socket binds to.
    pub bind_addr: String,

    /// Records kept at most; the oldest are dropped beyond this.
    pub max_queued_records: usize,
}

impl Default for NetFtConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_NETFT_PORT,
            bind_addr: "0.0.0.0:0".to_string(),
            max_queued_records: 10_000,
        }
    }
}

impl NetFtConfig {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    pub fn with_max_queued_records(mut self, records: usize) -> Self {
        self.max_queued_records = records;
        self
    }
}

/// Errors of the NetFT transport.
///
/// The capability only carries vendor codes, so these are logged and
/// reported as [`VendorCode::UNSUCCESSFUL`] at the trait boundary.
#[derive(Debug, Error)]
pub enum NetFtError {
    /// The host string is not a usable socket address.
    #[error("Invalid sensor address: {0}")]
    InvalidAddress(String),

    /// The handle does not belong to the open connection.
    #[error("Not connected")]
    NotConnected,

    /// No record is queued.
    #[error("No record available")]
    Empty,

    /// Wire format error from the codec.
    #[error("Protocol error: {0}")]
    Protocol(#[from] netbox_core::Error),

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, NetFtError>;

#[derive(Debug)]
struct Connection {
    id: LoadCellHandle,
    socket: UdpSocket,
    streaming: bool,
    queue: VecDeque<LoadCellBlock>,
    dropped: u64,
}

/// Load-cell driver speaking the NetFT RDT interface.
#[derive(Debug)]
pub struct NetFtDriver {
    config: NetFtConfig,
    codec: NetFtCodec,
    connection: Option<Connection>,
    connections: usize,
}

impl NetFtDriver {
    pub fn new(config: NetFtConfig) -> Self {
        Self {
            config,
            codec: NetFtCodec::new(),
            connection: None,
            connections: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &NetFtConfig {
        &self.config
    }

    /// Local address of the open socket.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.connection
            .as_ref()
            .and_then(|c| c.socket.local_addr().ok())
    }

    /// Records dropped because the queue was full.
    #[must_use]
    pub fn dropped_records(&self) -> u64 {
        self.connection.as_ref().map_or(0, |c| c.dropped)
    }

    fn resolve(&self, host: &str) -> Result<SocketAddr> {
        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }
        let with_port = format!("{host}:{}", self.config.port);
        with_port
            .parse::<SocketAddr>()
            .map_err(|_| NetFtError::InvalidAddress(host.to_string()))
    }

    fn open_socket(&mut self, host: &str) -> Result<LoadCellHandle> {
        let peer = self.resolve(host)?;
        let socket = UdpSocket::bind(&self.config.bind_addr)?;
        socket.connect(peer)?;
        socket.set_nonblocking(true)?;

        self.connections += 1;
        let id = LoadCellHandle(NonZeroUsize::MIN.saturating_add(self.connections - 1));
        info!(%peer, local = ?socket.local_addr().ok(), "NetFT socket connected");
        self.connection = Some(Connection {
            id,
            socket,
            streaming: false,
            queue: VecDeque::new(),
            dropped: 0,
        });
        Ok(id)
    }

    fn connection_mut(&mut self, handle: LoadCellHandle) -> Result<&mut Connection> {
        self.connection
            .as_mut()
            .filter(|c| c.id == handle)
            .ok_or(NetFtError::NotConnected)
    }

    fn send(&mut self, handle: LoadCellHandle, request: RdtRequest) -> Result<()> {
        let connection = self.connection_mut(handle)?;
        connection.socket.send(&request.to_bytes())?;
        debug!(command = %request.command, "NetFT request sent");
        Ok(())
    }

    /// Move every datagram already received into the queue.
    fn pump(&mut self, handle: LoadCellHandle) -> Result<usize> {
        let max = self.config.max_queued_records.max(1);
        let Self {
            codec, connection, ..
        } = self;
        let connection = connection
            .as_mut()
            .filter(|c| c.id == handle)
            .ok_or(NetFtError::NotConnected)?;

        let mut datagram = [0u8; MAX_DATAGRAM];
        loop {
            let len = match connection.socket.recv(&mut datagram) {
                Ok(len) => len,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            };
            let mut buf = BytesMut::from(&datagram[..len]);
            while let Some(record) = codec.decode_eof(&mut buf)? {
                trace!(seq = record.rdt_sequence, "NetFT record");
                if connection.queue.len() >= max {
                    connection.queue.pop_front();
                    connection.dropped += 1;
                }
                connection.queue.push_back(record.to_block());
            }
        }
        Ok(connection.queue.len())
    }
}

impl Default for NetFtDriver {
    fn default() -> Self {
        Self::new(NetFtConfig::default())
    }
}

fn report<T>(call: &'static str, result: Result<T>) -> VendorResult<T> {
    result.map_err(|e| {
        warn!(call, error = %e, "NetFT call failed");
        VendorCode::UNSUCCESSFUL
    })
}

impl LoadCellDriver for NetFtDriver {
    fn connect(&mut self, host: &str) -> Option<LoadCellHandle> {
        if self.connection.is_some() {
            warn!("NetFT driver already connected; replacing connection");
            self.connection = None;
        }
        report("connect", self.open_socket(host)).ok()
    }

    fn sdo_write(&mut self, handle: LoadCellHandle, target: &ConfigTarget) -> VendorCode {
        if *target == ConfigTarget::zero_offset() {
            return match report("sdo_write", self.send(handle, RdtRequest::set_bias())) {
                Ok(()) => VendorCode::OK,
                Err(code) => code,
            };
        }
        if self.connection_mut(handle).is_err() {
            return VendorCode::UNSUCCESSFUL;
        }
        debug!(%target, "configuration write has no RDT counterpart; ignored");
        VendorCode::OK
    }

    fn start_measurement(&mut self, handle: LoadCellHandle) -> VendorResult<()> {
        report(
            "start_measurement",
            self.send(handle, RdtRequest::start_streaming()),
        )?;
        if let Ok(connection) = self.connection_mut(handle) {
            connection.streaming = true;
        }
        Ok(())
    }

    fn available_lines(&mut self, handle: LoadCellHandle) -> i32 {
        match report("available_lines", self.pump(handle)) {
            Ok(len) => i32::try_from(len).unwrap_or(i32::MAX),
            Err(_) => 0,
        }
    }

    fn read_next_block(&mut self, handle: LoadCellHandle) -> VendorResult<LoadCellBlock> {
        let next = self
            .connection_mut(handle)
            .and_then(|c| c.queue.pop_front().ok_or(NetFtError::Empty));
        report("read_next_block", next)
    }

    fn stop_measurement(&mut self, handle: LoadCellHandle) -> VendorResult<()> {
        report("stop_measurement", self.send(handle, RdtRequest::stop()))?;
        if let Ok(connection) = self.connection_mut(handle) {
            connection.streaming = false;
            connection.queue.clear();
        }
        Ok(())
    }

    fn disconnect(&mut self, handle: LoadCellHandle) -> VendorResult<()> {
        report("disconnect", self.connection_mut(handle).map(|_| ()))?;
        if let Some(connection) = self.connection.take() {
            info!(
                streaming = connection.streaming,
                dropped = connection.dropped,
                "NetFT socket closed"
            );
        }
        Ok(())
    }

    fn is_connected(&mut self, handle: LoadCellHandle) -> bool {
        self.connection.as_ref().is_some_and(|c| c.id == handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("127.0.0.1", "127.0.0.1:49152")]
    #[case("127.0.0.1:6000", "127.0.0.1:6000")]
    #[case("[::1]:7000", "[::1]:7000")]
    fn test_resolve(#[case] host: &str, #[case] expected: &str) {
        let driver = NetFtDriver::default();
        assert_eq!(
            driver.resolve(host).unwrap(),
            expected.parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_resolve_rejects_garbage() {
        let driver = NetFtDriver::default();
        assert!(matches!(
            driver.resolve("not an address"),
            Err(NetFtError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_connect_bad_host_returns_no_handle() {
        let mut driver = NetFtDriver::default();
        assert!(driver.connect("nowhere").is_none());
        assert!(driver.local_addr().is_none());
    }

    #[test]
    fn test_calls_with_foreign_handle_fail() {
        let mut driver = NetFtDriver::default();
        let handle = driver.connect("127.0.0.1:9").unwrap();
        let foreign = LoadCellHandle(handle.0.saturating_add(5));

        assert!(!driver.is_connected(foreign));
        assert_eq!(driver.available_lines(foreign), 0);
        assert_eq!(
            driver.read_next_block(foreign),
            Err(VendorCode::UNSUCCESSFUL)
        );
        assert_eq!(
            driver.sdo_write(foreign, &ConfigTarget::measurement_setup()),
            VendorCode::UNSUCCESSFUL
        );
        assert!(driver.is_connected(handle));
    }

    #[test]
    fn test_reconnect_issues_new_handle() {
        let mut driver = NetFtDriver::default();
        let first = driver.connect("127.0.0.1:9").unwrap();
        driver.disconnect(first).unwrap();
        let second = driver.connect("127.0.0.1:9").unwrap();
        assert_ne!(first, second);
        assert!(!driver.is_connected(first));
    }
}
