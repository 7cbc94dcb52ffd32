//! IRC client protocol (RFC 2812)
//!
//! Converts the server's byte stream into structured messages and back.
//!
//! ## Message Format
//! ```text
//! [':' prefix SPACE] command [SPACE middle]* [SPACE ':' trailing] CRLF
//!
//! prefix   = servername / nickname [ '!' user ] '@' host
//! command  = 1*letter / 3digit
//! ```
//!
//! The trailing parameter may carry mIRC formatting codes; they are removed
//! during parsing and kept as style spans on the [`Message`].

pub mod command;
pub mod error;
pub mod event;
pub mod message;
pub mod parser;

pub use error::{ParseError, ProtocolError, ProtocolResult};
pub use event::{classify, Event, EventKind, Recipient};
pub use message::{Message, Prefix};
pub use parser::Parser;
