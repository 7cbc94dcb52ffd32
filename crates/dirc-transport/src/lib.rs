//! dIRC transport layer
//!
//! Runs the IRC protocol over a byte stream:
//! - Connection: inbound reader task, FIFO writer task, message listeners
//! - ServerSession: classifies messages into events and answers PING
//! - ServerConfig: host, port and character sets

pub mod config;
pub mod connection;
pub mod error;
pub mod session;

pub use config::ServerConfig;
pub use connection::{Connection, ConnectionHandle, MessageListener};
pub use error::{TransportError, TransportResult};
pub use session::{EventListener, ServerSession};
