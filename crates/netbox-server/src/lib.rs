//! HTTP surface of the NetBox acquisition bridge.
//!
//! - [`config`]: layered server configuration and command line
//! - [`drivers`]: driver selection and bridge construction
//! - [`state`]: the shared bridge behind one mutex, with a watchdog
//! - [`routes`]: request handling
//! - [`server`]: the hyper listener and CORS layer
//!
//! # Example
//!
//! ```no_run
//! use netbox_server::config::{Cli, ServerConfig};
//! use netbox_server::{drivers, server, state::AppState};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::load(&Cli::default())?;
//! let bridge = drivers::build_bridge(&config)?;
//! let state = AppState::new(bridge, config.request_timeout());
//! let (addr, serving) = server::bind(config.bind_addr()?, state, async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })?;
//! println!("listening on {addr}");
//! serving.await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod drivers;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{Cli, ConfigError, ServerConfig};
pub use drivers::ServerBridge;
pub use state::{AppState, CallError};
