//! Transport error types

use dirc_protocol::ProtocolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Connection is not open yet")]
    NotConnected,

    #[error("Connection is closed")]
    Closed,

    #[error("Connection is already open")]
    AlreadyConnected,

    #[error("Unknown charset: {0}")]
    UnknownCharset(String),
}

pub type TransportResult<T> = Result<T, TransportError>;
