//! Server connection settings

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::error::{TransportError, TransportResult};

pub const DEFAULT_PORT: u16 = 6667;
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Where to connect and which character sets to speak
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Charset of the server's byte stream
    #[serde(default = "default_charset")]
    pub charset: String,
    /// Charset for outgoing messages, if different from `charset`
    #[serde(default)]
    pub outbound_charset: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            charset: default_charset(),
            outbound_charset: None,
        }
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    pub fn with_outbound_charset(mut self, charset: impl Into<String>) -> Self {
        self.outbound_charset = Some(charset.into());
        self
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn inbound_encoding(&self) -> TransportResult<&'static Encoding> {
        resolve_charset(&self.charset)
    }

    /// Encoding used for writing. Charsets that cannot be written (UTF-16)
    /// fall back to UTF-8.
    pub fn outbound_encoding(&self) -> TransportResult<&'static Encoding> {
        let label = self.outbound_charset.as_deref().unwrap_or(&self.charset);
        Ok(resolve_charset(label)?.output_encoding())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}

/// Look up a charset by its WHATWG label (`utf-8`, `latin1`, `windows-1252`, ...)
pub fn resolve_charset(label: &str) -> TransportResult<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| TransportError::UnknownCharset(label.to_string()))
}
