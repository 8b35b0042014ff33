use std::time::Duration;

use crate::{
    config::CallConfig,
    core::constants::{DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_READER_POLL_MS},
};

/// Timing knobs of the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Bound on `Connecting`; past it the attempt fails with `HandshakeTimeout`.
    pub handshake_timeout: Duration,
    /// How often worker threads wake up to check their run flag.
    pub reader_poll: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS),
            reader_poll: Duration::from_millis(DEFAULT_READER_POLL_MS),
        }
    }
}

impl From<&CallConfig> for ConnectionConfig {
    fn from(cfg: &CallConfig) -> Self {
        Self {
            handshake_timeout: cfg.handshake_timeout,
            reader_poll: cfg.reader_poll,
        }
    }
}
