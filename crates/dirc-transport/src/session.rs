//! Server session - turns messages into events and keeps the connection alive

use std::sync::Arc;

use dirc_protocol::{classify, Event, EventKind, Message};
use parking_lot::RwLock;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::connection::{Connection, ConnectionHandle};
use crate::error::TransportResult;

/// Callback for each classified event. Runs on the reader task.
pub type EventListener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Event source for one server connection.
///
/// Every inbound message is classified. PING is answered with a PONG on the
/// same connection and is not passed on; every other event goes to the
/// registered listeners in registration order.
pub struct ServerSession {
    connection: Connection,
    listeners: Arc<RwLock<Vec<EventListener>>>,
}

impl ServerSession {
    pub fn new(connection: Connection) -> Self {
        let listeners: Arc<RwLock<Vec<EventListener>>> = Arc::new(RwLock::new(Vec::new()));

        let handle = connection.handle();
        let targets = listeners.clone();
        connection.on_message(move |message| {
            dispatch(&handle, &targets, classify(message));
        });

        Self {
            connection,
            listeners,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn add_event_listener<F>(&self, listener: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Receive events on a channel instead of a callback
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.add_event_listener(move |event| {
            // The receiver may have been dropped; that only stops this subscription
            let _ = tx.send(event.clone());
        });
        rx
    }

    pub async fn connect(&self) -> TransportResult<()> {
        self.connection.connect().await
    }

    pub fn attach<S>(&self, stream: S) -> TransportResult<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        self.connection.attach(stream)
    }

    pub fn send(&self, message: Message) -> TransportResult<()> {
        self.connection.send(message)
    }

    pub fn close(&self) {
        self.connection.close();
    }

    pub async fn closed(&self) {
        self.connection.closed().await;
    }

    pub fn nickname(&self, nickname: &str) -> TransportResult<()> {
        self.send(Message::nick(nickname))
    }

    pub fn username(&self, username: &str, realname: &str) -> TransportResult<()> {
        self.send(Message::user_command(username, realname))
    }

    pub fn quit(&self, reason: Option<&str>) -> TransportResult<()> {
        self.send(Message::quit(reason))
    }

    pub fn join(&self, channel: &str) -> TransportResult<()> {
        self.send(Message::join(channel))
    }

    pub fn pong(&self, servername: &str) -> TransportResult<()> {
        self.send(Message::pong(servername))
    }
}

fn dispatch(handle: &ConnectionHandle, listeners: &RwLock<Vec<EventListener>>, event: Event) {
    if let EventKind::Ping { servername } = &event.kind {
        debug!(server = %servername, "Answering PING");
        if let Err(e) = handle.send(Message::pong(servername)) {
            warn!(error = %e, "Failed to queue PONG");
        }
        return;
    }

    trace!(kind = ?event.kind, recipient = %event.recipient, "Event");
    let snapshot = listeners.read().clone();
    for listener in &snapshot {
        listener(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use dirc_protocol::Recipient;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn session() -> (ServerSession, DuplexStream) {
        let session = ServerSession::new(Connection::new(ServerConfig::default()).unwrap());
        let (client, server) = tokio::io::duplex(1024);
        session.attach(client).unwrap();
        (session, server)
    }

    async fn read_line<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> String {
        let mut line = String::new();
        timeout(WAIT, reader.read_line(&mut line)).await.unwrap().unwrap();
        line
    }

    #[tokio::test]
    async fn test_ping_is_answered_and_not_delivered() {
        let session = ServerSession::new(Connection::new(ServerConfig::default()).unwrap());
        let mut events = session.subscribe();
        let (client, server) = tokio::io::duplex(1024);
        session.attach(client).unwrap();

        let (read_half, mut write_half) = tokio::io::split(server);
        write_half
            .write_all(b"PING :irc.example.net\r\n:irc.example.net NOTICE joe :hello\r\n")
            .await
            .unwrap();

        let mut reader = BufReader::new(read_half);
        assert_eq!(read_line(&mut reader).await, "PONG irc.example.net\r\n");

        let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
        assert_eq!(event.kind, EventKind::Notice);
        assert_eq!(event.recipient, Recipient::Target("joe".into()));
        assert_eq!(event.message, "hello");
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_events_follow_message_order() {
        let session = ServerSession::new(Connection::new(ServerConfig::default()).unwrap());
        let mut events = session.subscribe();
        let (client, mut server) = tokio::io::duplex(1024);
        session.attach(client).unwrap();

        server
            .write_all(
                b":irc.example.net 375 joe :- irc.example.net Message of the day -\r\n\
                  :irc.example.net 372 joe :- \x02Be nice\x02\r\n\
                  :irc.example.net 376 joe :End of /MOTD command.\r\n\
                  :bob!b@host QUIT :Ping timeout\r\n",
            )
            .await
            .unwrap();

        let mut kinds = Vec::new();
        for _ in 0..4 {
            kinds.push(timeout(WAIT, events.recv()).await.unwrap().unwrap());
        }
        assert_eq!(kinds[0].kind, EventKind::MotdStart);
        assert_eq!(kinds[1].kind, EventKind::Motd);
        assert_eq!(kinds[1].message, "- Be nice");
        assert_eq!(kinds[1].styles.len(), 1);
        assert_eq!(kinds[2].kind, EventKind::MotdEnd);
        assert_eq!(
            kinds[3].kind,
            EventKind::Quit {
                nickname: Some("bob".into())
            }
        );
    }

    #[tokio::test]
    async fn test_listeners_and_subscribers_both_receive() {
        let (session, mut server) = session();
        let count = Arc::new(RwLock::new(0usize));
        let seen = count.clone();
        session.add_event_listener(move |_| *seen.write() += 1);
        let mut events = session.subscribe();

        server.write_all(b"001 joe :Welcome\r\n").await.unwrap();

        let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
        assert_eq!(event.message, "Welcome");
        assert_eq!(*count.read(), 1);
    }

    #[tokio::test]
    async fn test_command_wrappers() {
        let (session, server) = session();

        session.nickname("joe").unwrap();
        session.username("joe", "Joe Bloggs").unwrap();
        session.join("#rust").unwrap();
        session.pong("irc.example.net").unwrap();
        session.quit(Some("bye")).unwrap();

        let mut reader = BufReader::new(server);
        for expected in [
            "NICK joe\r\n",
            "USER joe 0 * :Joe Bloggs\r\n",
            "JOIN #rust\r\n",
            "PONG irc.example.net\r\n",
            "QUIT bye\r\n",
        ] {
            assert_eq!(read_line(&mut reader).await, expected);
        }

        session.close();
        timeout(WAIT, session.closed()).await.unwrap();
        assert!(session.join("#other").is_err());
    }
}
