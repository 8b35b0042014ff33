//! Per-participant connections: establishment, retry, fan-out and teardown.
pub mod config;
pub mod connection;
pub mod connection_error;
pub mod connection_manager;
pub mod connection_state;
mod reader_worker;
pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionId};
pub use connection_error::ConnectionError;
pub use connection_manager::{BroadcastReport, ConnectionManager};
pub use connection_state::{ConnectionRole, ConnectionState};
