//! Network configuration file and command-line overrides

use std::path::Path;

use anyhow::{bail, Context, Result};
use dirc_transport::ServerConfig;
use serde::Deserialize;

use crate::Args;

/// Contents of a network file:
///
/// ```toml
/// nickname = "joe"
/// realname = "Joe Bloggs"
/// channels = ["#rust"]
///
/// [[servers]]
/// host = "irc.libera.chat"
/// port = 6667
/// charset = "utf-8"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    pub nickname: Option<String>,
    pub username: Option<String>,
    pub realname: Option<String>,
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
    #[serde(default)]
    pub channels: Vec<String>,
}

impl NetworkConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }
}

/// Everything needed to run a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerConfig,
    pub nickname: String,
    pub username: String,
    pub realname: String,
    pub channels: Vec<String>,
}

impl Settings {
    /// Merge the file with the command line; arguments win
    pub fn resolve(file: NetworkConfig, args: &Args) -> Result<Self> {
        let mut server = match (args.host.as_deref(), file.servers.into_iter().next()) {
            (Some(host), Some(first)) => ServerConfig {
                host: host.to_string(),
                ..first
            },
            (Some(host), None) => ServerConfig::new(host, dirc_transport::config::DEFAULT_PORT),
            (None, Some(first)) => first,
            (None, None) => bail!("No server given: use --host or add a [[servers]] entry"),
        };
        if let Some(port) = args.port {
            server.port = port;
        }
        if let Some(charset) = &args.charset {
            server.charset = charset.clone();
        }

        let Some(nickname) = args.nick.clone().or(file.nickname) else {
            bail!("No nickname given: use --nick or set nickname in the config file");
        };
        let username = args.user.clone().or(file.username).unwrap_or_else(|| nickname.clone());
        let realname = args.realname.clone().or(file.realname).unwrap_or_else(|| nickname.clone());

        let mut channels = file.channels;
        for channel in &args.join {
            if !channels.contains(channel) {
                channels.push(channel.clone());
            }
        }

        Ok(Self {
            server,
            nickname,
            username,
            realname,
            channels,
        })
    }
}
