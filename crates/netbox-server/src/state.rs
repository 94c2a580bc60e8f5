//! Shared request state.
//!
//! Device calls block, so every bridge operation runs on the blocking pool
//! while holding the single bridge mutex, and the request awaits it under
//! a watchdog timeout. A call that times out keeps the mutex until the
//! driver returns; later requests queue behind it. A call that panics
//! poisons the mutex, and the next call resets both sessions and drops the
//! measurement before running.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, warn};

use netbox_bridge::{BridgeError, BridgeStatus};
use netbox_hardware::DeviceKind;

use crate::drivers::ServerBridge;

/// Failure of one bridge operation as seen by a request.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("{operation} did not finish within {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("{operation} panicked: {source}")]
    Panicked {
        operation: &'static str,
        source: JoinError,
    },

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl CallError {
    /// Stable snake_case name reported in failure bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Panicked { .. } => "internal",
            Self::Bridge(e) => e.kind(),
        }
    }

    #[must_use]
    pub fn step_index(&self) -> Option<usize> {
        match self {
            Self::Bridge(e) => e.step_index(),
            _ => None,
        }
    }

    #[must_use]
    pub fn device(&self) -> Option<DeviceKind> {
        match self {
            Self::Bridge(e) => e.device(),
            _ => None,
        }
    }
}

/// State cloned into every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    bridge: Arc<Mutex<ServerBridge>>,
    timeout: Duration,
}

impl AppState {
    pub fn new(bridge: ServerBridge, timeout: Duration) -> Self {
        Self {
            bridge: Arc::new(Mutex::new(bridge)),
            timeout,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `f` against the bridge on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Timeout`] if `f` does not finish in time, and
    /// the bridge error of `f` otherwise.
    pub async fn run<F, T>(&self, operation: &'static str, f: F) -> Result<T, CallError>
    where
        F: FnOnce(&mut ServerBridge) -> netbox_bridge::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let bridge = Arc::clone(&self.bridge);
        let task = tokio::task::spawn_blocking(move || {
            let mut guard = match bridge.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    warn!(operation, "Bridge poisoned by an earlier panic; resetting devices");
                    let mut guard = poisoned.into_inner();
                    guard.reset();
                    bridge.clear_poison();
                    guard
                }
            };
            f(&mut guard)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result.map_err(CallError::Bridge),
            Ok(Err(source)) => {
                error!(operation, error = %source, "Bridge operation panicked");
                Err(CallError::Panicked { operation, source })
            }
            Err(_) => {
                warn!(operation, timeout = ?self.timeout, "Bridge operation timed out");
                Err(CallError::Timeout {
                    operation,
                    after: self.timeout,
                })
            }
        }
    }

    /// Current bridge status.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Timeout`] if a device call holds the bridge.
    pub async fn status(&self) -> Result<BridgeStatus, CallError> {
        self.run("status", |bridge| Ok(bridge.status())).await
    }

    /// Close an active measurement, if any. Used on shutdown.
    ///
    /// # Errors
    ///
    /// Returns the error of the disconnect.
    pub async fn shutdown(&self) -> Result<bool, CallError> {
        self.run("shutdown", |bridge| {
            if !bridge.is_connected() {
                return Ok(false);
            }
            bridge.disconnect().map(|()| true)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netbox_bridge::BridgeConfig;
    use netbox_hardware::mock::{MockEncoder, MockLoadCell};
    use netbox_hardware::{AnyEncoderDriver, AnyLoadCellDriver, SessionState};
    use netbox_storage::LogConfig;
    use tempfile::TempDir;

    fn state(dir: &TempDir, timeout: Duration) -> AppState {
        let (encoder, _) = MockEncoder::new();
        let (load_cell, _) = MockLoadCell::new();
        let config = BridgeConfig::default().with_log(LogConfig::new(dir.path()));
        let bridge = ServerBridge::new(
            AnyEncoderDriver::Mock(encoder),
            AnyLoadCellDriver::Mock(load_cell),
            config,
        );
        AppState::new(bridge, timeout)
    }

    #[tokio::test]
    async fn test_run_maps_bridge_errors() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, Duration::from_secs(5));

        let err = state.run("sample", |b| b.sample(false)).await.unwrap_err();
        assert_eq!(err.kind(), "not_connected");
        assert_eq!(err.step_index(), None);
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, Duration::from_millis(20));

        let err = state
            .run("slow", |_| {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Timeout { operation: "slow", .. }));
        assert_eq!(err.kind(), "timeout");
    }

    #[tokio::test]
    async fn test_panic_resets_bridge_for_next_call() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, Duration::from_secs(5));

        let err = state
            .run("connect", |b| {
                b.connect()?;
                panic!("driver blew up");
            })
            .await
            .map(|()| ())
            .unwrap_err();
        assert_eq!(err.kind(), "internal");

        let status = state.status().await.unwrap();
        assert!(!status.connected);
        assert_eq!(status.encoder, SessionState::Disconnected);
        assert_eq!(status.load_cell, SessionState::Disconnected);
        state.run("connect", |b| b.connect()).await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_only_disconnects_active_measurement() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, Duration::from_secs(5));

        assert!(!state.shutdown().await.unwrap());
        state.run("connect", |b| b.connect()).await.unwrap();
        assert!(state.status().await.unwrap().connected);
        assert!(state.shutdown().await.unwrap());
        assert!(!state.status().await.unwrap().connected);
    }
}
