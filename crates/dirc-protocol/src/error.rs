//! Protocol error types

use thiserror::Error;

/// Errors raised by the protocol layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid parameter {index}: {reason}")]
    InvalidParameter { index: usize, reason: &'static str },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Why a line was rejected by the parser.
///
/// The streaming [`Parser`](crate::Parser) never returns these: it logs them
/// and skips to the next line. Only single-line parsing via `str::parse`
/// reports them to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected {0:?} at start of line")]
    UnexpectedStart(char),

    #[error("invalid prefix {0:?}")]
    InvalidPrefix(String),

    #[error("prefix is not followed by a command")]
    MissingCommand,

    #[error("invalid command {0:?}")]
    InvalidCommand(String),

    #[error("line exceeds {max} characters")]
    LineTooLong { max: usize },

    #[error("empty line")]
    Empty,
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
