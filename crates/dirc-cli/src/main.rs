//! dIRC terminal client (dirc)
//!
//! Connects to one IRC server, registers, joins channels once the MOTD is
//! over and prints every event the server sends.
//!
//! # Usage
//!
//! ```bash
//! # Quick connect
//! dirc --host irc.libera.chat --nick joe
//!
//! # Join channels after the MOTD
//! dirc --host irc.libera.chat --nick joe --join '#rust' --join '#tokio'
//!
//! # Latin-1 network, events as JSON lines
//! dirc --host irc.example.net --nick joe --charset latin1 --json
//!
//! # With a network file
//! dirc --config ~/.config/dirc/libera.toml
//! ```

mod config;
mod render;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use dirc_protocol::{Event, EventKind};
use dirc_transport::{Connection, ServerSession};

use crate::config::{NetworkConfig, Settings};

/// How long to wait for the server to hang up after QUIT
const QUIT_GRACE: Duration = Duration::from_secs(5);

/// dIRC - IRC client protocol engine
#[derive(Parser, Debug)]
#[command(name = "dirc")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Network configuration file (TOML)
    #[arg(short, long, env = "DIRC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server hostname (overrides the first server in the config file)
    #[arg(long, env = "DIRC_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "DIRC_PORT")]
    pub port: Option<u16>,

    /// Nickname
    #[arg(long, env = "DIRC_NICK")]
    pub nick: Option<String>,

    /// Username (defaults to the nickname)
    #[arg(long, env = "DIRC_USER")]
    pub user: Option<String>,

    /// Real name (defaults to the nickname)
    #[arg(long, env = "DIRC_REALNAME")]
    pub realname: Option<String>,

    /// Character set of the server (utf-8, latin1, windows-1252, ...)
    #[arg(long, env = "DIRC_CHARSET")]
    pub charset: Option<String>,

    /// Channel to join after the MOTD (repeatable)
    #[arg(long = "join", value_name = "CHANNEL")]
    pub join: Vec<String>,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DIRC_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays the transcript
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let file = match &args.config {
        Some(path) => NetworkConfig::load(path)?,
        None => NetworkConfig::default(),
    };
    let settings = Settings::resolve(file, &args)?;

    let connection = Connection::new(settings.server.clone()).context("Invalid server configuration")?;
    let session = ServerSession::new(connection);
    let mut events = session.subscribe();

    info!(
        server = %settings.server.address(),
        nick = %settings.nickname,
        charset = %settings.server.charset,
        "Connecting"
    );
    session
        .connect()
        .await
        .with_context(|| format!("Failed to connect to {}", settings.server.address()))?;

    session.nickname(&settings.nickname)?;
    session.username(&settings.username, &settings.realname)?;

    let closed = session.closed();
    tokio::pin!(closed);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut joined = false;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                print_event(&event, args.json)?;

                if event.kind == EventKind::MotdEnd && !joined {
                    for channel in &settings.channels {
                        info!(channel = %channel, "Joining");
                        session.join(channel)?;
                    }
                    joined = true;
                }
            }

            _ = &mut closed => {
                // Print whatever arrived before the connection went away
                while let Ok(event) = events.try_recv() {
                    print_event(&event, args.json)?;
                }
                println!("{}", "Disconnected.".red());
                return Ok(());
            }

            result = &mut interrupt => {
                result?;
                println!("^C");
                break;
            }
        }
    }

    info!("Quitting");
    if let Err(e) = session.quit(Some("Leaving")) {
        warn!(error = %e, "Could not send QUIT");
    }
    if tokio::time::timeout(QUIT_GRACE, session.closed()).await.is_err() {
        warn!("Server did not close the connection, closing it ourselves");
    }
    session.close();

    Ok(())
}

fn print_event(event: &Event, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else {
        println!("{}", render::render_event(event));
    }
    Ok(())
}
