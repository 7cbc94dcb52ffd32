//! Connection to an IRC server
//!
//! Each open connection runs two tasks: a reader that parses the inbound
//! stream and hands every message to the registered listeners, and a writer
//! that drains the outbound queue in order. Both stop when the connection is
//! closed, by [`Connection::close`] or by the transport failing.

use std::sync::Arc;

use dirc_protocol::{Message, Parser};
use encoding_rs::Encoding;
use parking_lot::{Mutex, RwLock};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{TransportError, TransportResult};

/// Callback for each message read from the server. Runs on the reader task,
/// so it must not block.
pub type MessageListener = Arc<dyn Fn(&Message) + Send + Sync>;

const READ_BUFFER_SIZE: usize = 4096;

enum OutboxState {
    Idle,
    /// Claimed by `connect` while the TCP connection is being set up
    Connecting,
    Open(mpsc::UnboundedSender<Message>),
    Closed,
}

/// Cheap handle for sending on, and closing, a [`Connection`].
///
/// Listeners hold one of these to reply to the server without keeping the
/// connection itself alive.
#[derive(Clone)]
pub struct ConnectionHandle {
    state: Arc<Mutex<OutboxState>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl ConnectionHandle {
    fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            state: Arc::new(Mutex::new(OutboxState::Idle)),
            shutdown: Arc::new(shutdown),
        }
    }

    /// Queue a message for the writer task. Never waits on the network.
    ///
    /// Invalid messages are rejected here, before anything is queued.
    pub fn send(&self, message: Message) -> TransportResult<()> {
        message.validate()?;
        match &*self.state.lock() {
            OutboxState::Open(queue) => queue.send(message).map_err(|_| TransportError::Closed),
            OutboxState::Idle | OutboxState::Connecting => Err(TransportError::NotConnected),
            OutboxState::Closed => Err(TransportError::Closed),
        }
    }

    /// Close the connection. Messages still queued are dropped. Safe to call
    /// more than once.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), OutboxState::Closed);
        if matches!(previous, OutboxState::Open(_)) {
            info!("Closing connection");
        }
        self.shutdown.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.state.lock(), OutboxState::Closed)
    }

    /// Wait until the connection has been closed from either end
    pub async fn closed(&self) {
        wait_closed(self.shutdown.subscribe()).await;
    }

    /// Move from idle to connecting
    fn claim(&self) -> TransportResult<()> {
        let mut state = self.state.lock();
        match &*state {
            OutboxState::Idle => {
                *state = OutboxState::Connecting;
                Ok(())
            }
            OutboxState::Connecting | OutboxState::Open(_) => Err(TransportError::AlreadyConnected),
            OutboxState::Closed => Err(TransportError::Closed),
        }
    }

    /// Give up a claim after a failed connect. A close in the meantime wins.
    fn release(&self) {
        let mut state = self.state.lock();
        if matches!(*state, OutboxState::Connecting) {
            *state = OutboxState::Idle;
        }
    }

    /// Move from connecting to open, returning the receiving end of the queue
    fn open(&self) -> TransportResult<mpsc::UnboundedReceiver<Message>> {
        let mut state = self.state.lock();
        match &*state {
            OutboxState::Connecting => {
                let (tx, rx) = mpsc::unbounded_channel();
                *state = OutboxState::Open(tx);
                Ok(rx)
            }
            OutboxState::Idle | OutboxState::Open(_) => Err(TransportError::AlreadyConnected),
            OutboxState::Closed => Err(TransportError::Closed),
        }
    }
}

/// Resolves once the shutdown flag is set. The watch guard is dropped before
/// returning so callers can hold this future across other awaits.
async fn wait_closed(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}

/// A single-use connection to an IRC server.
///
/// Register listeners with [`Connection::on_message`] before connecting.
/// Once closed, a connection cannot be opened again.
pub struct Connection {
    config: ServerConfig,
    inbound: &'static Encoding,
    outbound: &'static Encoding,
    listeners: Arc<RwLock<Vec<MessageListener>>>,
    handle: ConnectionHandle,
}

impl Connection {
    /// Fails if either configured charset is unknown
    pub fn new(config: ServerConfig) -> TransportResult<Self> {
        let inbound = config.inbound_encoding()?;
        let outbound = config.outbound_encoding()?;
        Ok(Self {
            config,
            inbound,
            outbound,
            listeners: Arc::new(RwLock::new(Vec::new())),
            handle: ConnectionHandle::new(),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Register a listener. Listeners are called in registration order.
    pub fn on_message<F>(&self, listener: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Open a TCP connection to the configured server and start the reader
    /// and writer tasks
    pub async fn connect(&self) -> TransportResult<()> {
        self.handle.claim()?;

        let addr = self.config.address();
        let stream = match dial(&addr).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(server = %addr, error = %e, "Failed to connect");
                self.handle.release();
                return Err(e.into());
            }
        };
        info!(server = %addr, charset = %self.inbound.name(), "Connected");

        self.start(stream)
    }

    /// Run the connection over an already open stream. Must be called from
    /// within a tokio runtime.
    pub fn attach<S>(&self, stream: S) -> TransportResult<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        self.handle.claim()?;
        self.start(stream)
    }

    fn start<S>(&self, stream: S) -> TransportResult<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let queue = self.handle.open()?;
        let (reader, writer) = tokio::io::split(stream);
        let server = self.config.address();

        tokio::spawn(read_loop(
            reader,
            Parser::with_encoding(self.inbound),
            self.listeners.clone(),
            self.handle.clone(),
            server.clone(),
        ));
        tokio::spawn(write_loop(
            writer,
            queue,
            self.outbound,
            self.handle.clone(),
            server,
        ));

        Ok(())
    }

    /// Queue a message for sending
    pub fn send(&self, message: Message) -> TransportResult<()> {
        self.handle.send(message)
    }

    pub fn close(&self) {
        self.handle.close();
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    pub async fn closed(&self) {
        self.handle.closed().await;
    }
}

async fn dial(addr: &str) -> std::io::Result<TcpStream> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

async fn read_loop<R>(
    mut reader: R,
    mut parser: Parser,
    listeners: Arc<RwLock<Vec<MessageListener>>>,
    handle: ConnectionHandle,
    server: String,
) where
    R: AsyncRead + Unpin,
{
    let shutdown = wait_closed(handle.shutdown.subscribe());
    tokio::pin!(shutdown);
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        tokio::select! {
            _ = &mut shutdown => break,

            result = reader.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        if parser.has_partial_line() {
                            debug!(server = %server, "Discarding unterminated final line");
                        }
                        info!(server = %server, "Server closed the connection");
                        break;
                    }
                    Ok(n) => {
                        parser.feed(&buf[..n]);
                        let snapshot = listeners.read().clone();
                        while let Some(message) = parser.next_message() {
                            for listener in &snapshot {
                                listener(&message);
                            }
                        }
                    }
                    Err(e) => {
                        warn!(server = %server, error = %e, "Read error");
                        break;
                    }
                }
            }
        }
    }

    debug!(server = %server, "Inbound stream ended");
    handle.close();
}

async fn write_loop<W>(
    mut writer: W,
    mut queue: mpsc::UnboundedReceiver<Message>,
    encoding: &'static Encoding,
    handle: ConnectionHandle,
    server: String,
) where
    W: AsyncWrite + Unpin,
{
    let shutdown = wait_closed(handle.shutdown.subscribe());
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break,

            next = queue.recv() => {
                let Some(message) = next else { break };
                let data = match message.encode(encoding) {
                    Ok(data) => data,
                    Err(e) => {
                        warn!(server = %server, error = %e, "Dropping unencodable message");
                        continue;
                    }
                };
                if let Err(e) = write_line(&mut writer, &data).await {
                    error!(server = %server, error = %e, "Write error");
                    break;
                }
                debug!(server = %server, line = %message, "Sent");
            }
        }
    }

    let _ = writer.shutdown().await;
    handle.close();
}

async fn write_line<W>(writer: &mut W, data: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(data).await?;
    writer.flush().await
}
