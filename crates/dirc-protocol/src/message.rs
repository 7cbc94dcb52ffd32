//! IRC message model and wire serialization

use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, BytesMut};
use dirc_core::TextStyle;
use encoding_rs::{Encoding, EncoderResult};
use serde::Serialize;
use tracing::debug;

use crate::error::{ProtocolError, ProtocolResult};
use crate::parser;

/// At most 14 middle parameters plus one trailing (RFC 2812 2.3)
pub const MAX_PARAMS: usize = 15;

/// Written in place of characters the outbound charset cannot represent
const UNMAPPABLE: u8 = b'?';

/// Origin of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Prefix {
    /// `irc.example.net`
    Server(String),
    /// `nick[[!user]@host]`
    User {
        nickname: String,
        user: Option<String>,
        host: Option<String>,
    },
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Server(name) => f.write_str(name),
            Prefix::User {
                nickname,
                user,
                host,
            } => {
                f.write_str(nickname)?;
                if let Some(user) = user {
                    write!(f, "!{}", user)?;
                }
                if let Some(host) = host {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}

/// A single IRC message.
///
/// Messages read from the server carry their prefix and the style spans of
/// their trailing parameter, whose text has the formatting codes removed.
/// Messages built for sending have neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    prefix: Option<Prefix>,
    command: String,
    params: Vec<String>,
    styles: Vec<TextStyle>,
}

impl Message {
    /// Build an outbound message
    pub fn new<I, S>(command: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
            styles: Vec::new(),
        }
    }

    pub(crate) fn parsed(
        prefix: Option<Prefix>,
        command: String,
        params: Vec<String>,
        styles: Vec<TextStyle>,
    ) -> Self {
        Self {
            prefix,
            command,
            params,
            styles,
        }
    }

    pub fn prefix(&self) -> Option<&Prefix> {
        self.prefix.as_ref()
    }

    pub fn servername(&self) -> Option<&str> {
        match &self.prefix {
            Some(Prefix::Server(name)) => Some(name),
            _ => None,
        }
    }

    pub fn nickname(&self) -> Option<&str> {
        match &self.prefix {
            Some(Prefix::User { nickname, .. }) => Some(nickname),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&str> {
        match &self.prefix {
            Some(Prefix::User { user, .. }) => user.as_deref(),
            _ => None,
        }
    }

    pub fn host(&self) -> Option<&str> {
        match &self.prefix {
            Some(Prefix::User { host, .. }) => host.as_deref(),
            _ => None,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Parameter `n`, or `""` if there are fewer parameters
    pub fn param(&self, n: usize) -> &str {
        self.params.get(n).map_or("", String::as_str)
    }

    /// The last parameter, or `""` if there are none
    pub fn last_param(&self) -> &str {
        self.params.last().map_or("", String::as_str)
    }

    /// Parameters from `n` onwards, joined with single spaces
    pub fn joined_params(&self, n: usize) -> String {
        self.params.get(n..).unwrap_or_default().join(" ")
    }

    /// Style spans over the trailing parameter
    pub fn styles(&self) -> &[TextStyle] {
        &self.styles
    }

    /// Check that the message can be represented on the wire.
    ///
    /// Every parameter but the last must be a non-empty token without spaces
    /// that does not start with `:`. No part may contain CR, LF or NUL, and
    /// there are at most [`MAX_PARAMS`] parameters.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.command.is_empty() || self.command.contains([' ', '\r', '\n', '\0']) {
            return Err(ProtocolError::InvalidCommand(self.command.clone()));
        }
        if self.params.len() > MAX_PARAMS {
            return Err(ProtocolError::InvalidParameter {
                index: MAX_PARAMS,
                reason: "too many parameters",
            });
        }

        let last = self.params.len().saturating_sub(1);
        for (index, param) in self.params.iter().enumerate() {
            if param.contains(['\r', '\n', '\0']) {
                return Err(ProtocolError::InvalidParameter {
                    index,
                    reason: "contains a line break or NUL",
                });
            }
            if index == last {
                continue;
            }
            let reason = if param.is_empty() {
                "middle parameters must have a value"
            } else if param.contains(' ') {
                "middle parameters cannot contain spaces"
            } else if param.starts_with(':') {
                "middle parameters cannot start with ':'"
            } else {
                continue;
            };
            return Err(ProtocolError::InvalidParameter { index, reason });
        }
        Ok(())
    }

    /// Render the wire form, including the terminating CRLF.
    ///
    /// The last parameter is sent as a trailing parameter (`:` prefixed) when
    /// it is empty, contains a space or starts with `:`.
    pub fn serialize(&self) -> ProtocolResult<String> {
        self.validate()?;

        let len = self.command.len() + self.params.iter().map(|p| p.len() + 2).sum::<usize>() + 2;
        let mut line = String::with_capacity(len);
        line.push_str(&self.command);

        let last = self.params.len().saturating_sub(1);
        for (index, param) in self.params.iter().enumerate() {
            line.push(' ');
            if index == last && needs_trailing_marker(param) {
                line.push(':');
            }
            line.push_str(param);
        }
        line.push_str("\r\n");

        Ok(line)
    }

    /// Encode the message to bytes in the given character set
    pub fn encode(&self, encoding: &'static Encoding) -> ProtocolResult<BytesMut> {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf, encoding)?;
        Ok(buf)
    }

    /// Encode the message into an existing buffer. Nothing is written if the
    /// message is invalid. Characters the charset cannot represent are sent
    /// as `?`.
    pub fn encode_into(&self, buf: &mut BytesMut, encoding: &'static Encoding) -> ProtocolResult<()> {
        let line = self.serialize()?;
        let replaced = encode_line(&line, encoding, buf);
        if replaced > 0 {
            debug!(command = %self.command, charset = %encoding.name(), replaced, "Replaced unmappable characters");
        }
        Ok(())
    }
}

/// Encode `line` into `buf`, returning how many characters were replaced
fn encode_line(line: &str, encoding: &'static Encoding, buf: &mut BytesMut) -> usize {
    let mut encoder = encoding.new_encoder();
    let capacity = encoder
        .max_buffer_length_from_utf8_without_replacement(line.len())
        .unwrap_or(line.len() * 4);
    let mut out = vec![0u8; capacity + 1];
    let mut written = 0;
    let mut remaining = line;
    let mut replaced = 0;

    loop {
        let (result, read, wrote) =
            encoder.encode_from_utf8_without_replacement(remaining, &mut out[written..], true);
        remaining = &remaining[read..];
        written += wrote;
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::Unmappable(_) => {
                if written == out.len() {
                    out.resize(out.len() * 2, 0);
                }
                out[written] = UNMAPPABLE;
                written += 1;
                replaced += 1;
            }
            EncoderResult::OutputFull => out.resize(out.len() * 2, 0),
        }
    }

    buf.put_slice(&out[..written]);
    replaced
}

fn needs_trailing_marker(param: &str) -> bool {
    param.is_empty() || param.contains(' ') || param.starts_with(':')
}

impl FromStr for Message {
    type Err = ProtocolError;

    /// Parse one line. The line terminator is optional.
    fn from_str(line: &str) -> ProtocolResult<Self> {
        parser::parse_line(line)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;
        let last = self.params.len().saturating_sub(1);
        for (index, param) in self.params.iter().enumerate() {
            if index == last && needs_trailing_marker(param) {
                write!(f, " :{}", param)?;
            } else {
                write!(f, " {}", param)?;
            }
        }
        Ok(())
    }
}
