//! Legacy UDP transport for the NetFT load-cell box.
//!
//! [`NetFtDriver`] implements the load-cell capability over the RDT
//! interface, so the bridge can run a load-cell session against the older
//! sensor box without the vendor amplifier library.
//!
//! # Example
//!
//! ```no_run
//! use netbox_hardware::{LoadCellConfig, LoadCellSession};
//! use netbox_network::{NetFtConfig, NetFtDriver};
//!
//! # fn example() -> netbox_hardware::Result<()> {
//! let driver = NetFtDriver::new(NetFtConfig::default());
//! let mut session = LoadCellSession::new(
//!     driver,
//!     LoadCellConfig::default().with_hostname("192.168.1.1"),
//! );
//! session.open()?;
//! let block = session.drain_available()?;
//! println!("fz = {}", block.fz);
//! # Ok(())
//! # }
//! ```

mod netft;

pub use netft::{NetFtConfig, NetFtDriver, NetFtError};
