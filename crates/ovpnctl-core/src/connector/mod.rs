//! Management connector: moves raw lines in and commands out.
//!
//! One connector talks to one endpoint in one of two modes:
//!
//! ```text
//!  Client mode (dial)                    Server mode (listen, daemon dials in)
//!  ┌──────────┐   one stream   ┌──────┐  ┌──────────┐ accept ┌─────────┐
//!  │ ovpnctl  │───────────────▶│daemon│  │ ovpnctl  │◀───────│ daemon  │ xN
//!  └──────────┘ cmd → 1 reply  └──────┘  └──────────┘ queue  └─────────┘
//! ```
//!
//! In client mode `send_command` writes a line and waits for exactly one
//! reply line. In server mode commands go onto a bounded queue drained by
//! whichever session's writer picks them up first; the caller only learns
//! that the command was deferred.

mod session;
mod transport;

pub use transport::Endpoint;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use ovpnctl_config::ManagementConfig;

use crate::shutdown::wait_for_shutdown;

use session::{CommandQueue, LineReader, ReplySlot, write_line};
use transport::{BoxWriter, Listener};

/// Default capacity of the server-mode outbound command queue.
pub const DEFAULT_COMMAND_QUEUE: usize = 10;

/// Which side opens the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Dial the daemon's management interface.
    Client,
    /// Listen and let the daemon dial in (`--management-client`).
    Server,
}

impl Mode {
    pub fn from_config(config: &ManagementConfig) -> Self {
        if config.is_server() {
            Self::Server
        } else {
            Self::Client
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

/// Result of [`Connector::send_command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Client mode: the single reply line.
    Reply(String),
    /// Server mode: accepted onto the outbound queue.
    Queued,
    /// Server mode: discarded because no session is connected or the queue
    /// is full.
    Dropped,
}

impl CommandOutcome {
    /// Whether delivery was deferred rather than confirmed with a reply.
    pub fn is_deferred(&self) -> bool {
        !matches!(self, Self::Reply(_))
    }

    pub fn reply(&self) -> Option<&str> {
        match self {
            Self::Reply(line) => Some(line),
            _ => None,
        }
    }
}

/// Errors from the management connector.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: Endpoint,
        #[source]
        source: io::Error,
    },

    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: Endpoint,
        #[source]
        source: io::Error,
    },

    #[error("connector is not connected")]
    NotConnected,

    #[error("management connection closed")]
    Closed,

    #[error("management I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("operation requires {0} mode")]
    WrongMode(&'static str),
}

/// Lines read directly by `send_command` before `listen` starts.
struct DirectReader {
    incoming: LineReader,
    /// Every line read so far, replayed to the raw line channel on `listen`.
    backlog: Vec<String>,
}

/// The dialed connection in client mode.
struct ClientLink {
    /// Held for the whole exchange so at most one command is in flight.
    writer: Mutex<BoxWriter>,
    /// `None` once the reader loop owns the read half.
    direct: Mutex<Option<DirectReader>>,
    reply: ReplySlot,
}

/// Dual-mode, dual-transport management connector.
pub struct Connector {
    endpoint: Endpoint,
    mode: Mode,
    link: Option<ClientLink>,
    listener: Mutex<Option<Listener>>,
    local_addr: Option<String>,
    listening: bool,
    queue_tx: mpsc::Sender<String>,
    queue_rx: CommandQueue,
    sessions: Arc<AtomicUsize>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Connector {
    /// Create a connector with the default command queue capacity.
    pub fn new(endpoint: Endpoint, mode: Mode) -> Self {
        Self::with_command_queue(endpoint, mode, DEFAULT_COMMAND_QUEUE)
    }

    pub fn with_command_queue(endpoint: Endpoint, mode: Mode, capacity: usize) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            endpoint,
            mode,
            link: None,
            listener: Mutex::new(None),
            local_addr: None,
            listening: false,
            queue_tx,
            queue_rx: Arc::new(Mutex::new(queue_rx)),
            sessions: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(config: &ManagementConfig) -> Self {
        Self::with_command_queue(
            Endpoint::from_config(config),
            Mode::from_config(config),
            config.command_queue,
        )
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Bound address (TCP) or socket path once a server-mode connector is
    /// connected.
    pub fn local_addr(&self) -> Option<&str> {
        self.local_addr.as_deref()
    }

    /// Number of live server-mode sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Receiver that observes `true` once [`close`](Self::close) is called.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Dial the endpoint (client mode) or bind a listener (server mode).
    pub async fn connect(&mut self) -> Result<(), ConnectorError> {
        if self.is_closed() {
            return Err(ConnectorError::Closed);
        }
        match self.mode {
            Mode::Client => {
                if self.link.is_some() {
                    return Ok(());
                }
                let (reader, writer) = transport::dial(&self.endpoint).await.map_err(|source| {
                    ConnectorError::Connect {
                        endpoint: self.endpoint.clone(),
                        source,
                    }
                })?;
                self.link = Some(ClientLink {
                    writer: Mutex::new(writer),
                    direct: Mutex::new(Some(DirectReader {
                        incoming: BufReader::new(reader).lines(),
                        backlog: Vec::new(),
                    })),
                    reply: ReplySlot::default(),
                });
                info!(endpoint = %self.endpoint, "connected to management interface");
            }
            Mode::Server => {
                if self.local_addr.is_some() {
                    return Ok(());
                }
                let listener = Listener::bind(&self.endpoint).await.map_err(|source| {
                    ConnectorError::Bind {
                        endpoint: self.endpoint.clone(),
                        source,
                    }
                })?;
                self.local_addr = Some(listener.local_addr()?);
                *self.listener.get_mut() = Some(listener);
                info!(
                    endpoint = %self.endpoint,
                    local_addr = self.local_addr.as_deref().unwrap_or(""),
                    "management listener bound"
                );
            }
        }
        Ok(())
    }

    /// Start the background reader (client mode) or accept loop (server
    /// mode), delivering every raw line to `lines`.
    pub async fn listen(&mut self, lines: mpsc::Sender<String>) -> Result<(), ConnectorError> {
        if self.is_closed() {
            return Err(ConnectorError::Closed);
        }
        if self.listening {
            warn!(endpoint = %self.endpoint, "connector is already listening");
            return Ok(());
        }

        let shutdown = self.shutdown_tx.subscribe();
        let handle = match self.mode {
            Mode::Server => {
                let listener = self
                    .listener
                    .get_mut()
                    .take()
                    .ok_or(ConnectorError::NotConnected)?;
                tokio::spawn(session::accept_loop(
                    listener,
                    lines,
                    Arc::clone(&self.queue_rx),
                    Arc::clone(&self.sessions),
                    shutdown,
                ))
            }
            Mode::Client => {
                let link = self.link.as_mut().ok_or(ConnectorError::NotConnected)?;
                let direct = link
                    .direct
                    .get_mut()
                    .take()
                    .ok_or(ConnectorError::NotConnected)?;
                let reply = Arc::clone(&link.reply);
                tokio::spawn(async move {
                    for line in direct.backlog {
                        if lines.send(line).await.is_err() {
                            return;
                        }
                    }
                    session::client_read_loop(direct.incoming, lines, reply, shutdown).await;
                })
            }
        };

        self.listening = true;
        self.tasks.get_mut().push(handle);
        debug!(endpoint = %self.endpoint, mode = self.mode.as_str(), "connector listening");
        Ok(())
    }

    /// Send one command line.
    ///
    /// Client mode writes the trimmed command and waits for one reply line;
    /// realtime lines are not replies. Server mode never blocks: the command
    /// is queued for the next session writer, or dropped when no session is
    /// connected or the queue is full.
    pub async fn send_command(&self, command: &str) -> Result<CommandOutcome, ConnectorError> {
        if self.is_closed() {
            return Err(ConnectorError::Closed);
        }
        let command = command.trim();
        match self.mode {
            Mode::Server => Ok(self.enqueue(command)),
            Mode::Client => self.exchange(command).await,
        }
    }

    fn enqueue(&self, command: &str) -> CommandOutcome {
        if self.session_count() == 0 {
            debug!(%command, "no management session, dropping command");
            return CommandOutcome::Dropped;
        }
        match self.queue_tx.try_send(command.to_string()) {
            Ok(()) => CommandOutcome::Queued,
            Err(TrySendError::Full(_)) => {
                warn!(%command, "command queue full, dropping command");
                CommandOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => CommandOutcome::Dropped,
        }
    }

    async fn exchange(&self, command: &str) -> Result<CommandOutcome, ConnectorError> {
        let link = self.link.as_ref().ok_or(ConnectorError::NotConnected)?;
        let framed = format!("{command}\n");
        let mut writer = link.writer.lock().await;

        let mut direct = link.direct.lock().await;
        if let Some(direct) = direct.as_mut() {
            write_line(&mut writer, &framed).await?;
            debug!(%command, "sent command");
            let reply = tokio::select! {
                reply = read_reply(direct) => reply?,
                _ = wait_for_shutdown(self.shutdown_tx.subscribe()) => {
                    return Err(ConnectorError::Closed);
                }
            };
            return Ok(CommandOutcome::Reply(reply));
        }
        drop(direct);

        let (tx, rx) = oneshot::channel();
        {
            let mut state = link.reply.lock().await;
            if state.ended {
                return Err(ConnectorError::Closed);
            }
            state.waiter = Some(tx);
        }
        if let Err(e) = write_line(&mut writer, &framed).await {
            link.reply.lock().await.waiter.take();
            return Err(e.into());
        }
        debug!(%command, "sent command");
        tokio::select! {
            reply = rx => reply
                .map(CommandOutcome::Reply)
                .map_err(|_| ConnectorError::Closed),
            _ = wait_for_shutdown(self.shutdown_tx.subscribe()) => Err(ConnectorError::Closed),
        }
    }

    /// Signal shutdown, close the connection or listener, and wait for the
    /// background tasks. Calling it again is a no-op.
    pub async fn close(&self) -> Result<(), ConnectorError> {
        if self.shutdown_tx.send_replace(true) {
            return Ok(());
        }
        info!(endpoint = %self.endpoint, "closing management connector");

        let mut result = Ok(());
        if let Some(link) = &self.link {
            let mut writer = link.writer.lock().await;
            if let Err(e) = writer.shutdown().await {
                if e.kind() != io::ErrorKind::NotConnected {
                    result = Err(ConnectorError::Io(e));
                }
            }
        }
        self.listener.lock().await.take();

        let handles: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "connector task failed");
            }
        }

        if let (Mode::Server, Endpoint::Unix(path)) = (self.mode, &self.endpoint) {
            remove_socket(path);
        }
        result
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}

/// Read until the first non-realtime line, keeping everything in the
/// backlog for later delivery.
async fn read_reply(direct: &mut DirectReader) -> Result<String, ConnectorError> {
    loop {
        let line = direct
            .incoming
            .next_line()
            .await?
            .ok_or(ConnectorError::Closed)?;
        direct.backlog.push(line.clone());
        if !line.starts_with(crate::parser::REALTIME_MARKER) {
            return Ok(line);
        }
    }
}

fn remove_socket(path: &Path) {
    if let Err(e) = transport::remove_stale_socket(path) {
        warn!(path = %path.display(), error = %e, "failed to remove management socket");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    use ovpnctl_test_utils::fake_daemon::{DialingDaemon, ScriptedDaemon};

    const WAIT: Duration = Duration::from_secs(5);

    async fn recv(rx: &mut mpsc::Receiver<String>) -> String {
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for line")
            .expect("line channel closed")
    }

    async fn wait_for_sessions(connector: &Connector, n: usize) {
        tokio::time::timeout(WAIT, async {
            while connector.session_count() != n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("session count never reached");
    }

    async fn bound_server() -> (Connector, mpsc::Receiver<String>) {
        let mut connector = Connector::new(Endpoint::Tcp("127.0.0.1:0".into()), Mode::Server);
        connector.connect().await.unwrap();
        let (tx, rx) = mpsc::channel(16);
        connector.listen(tx).await.unwrap();
        (connector, rx)
    }

    #[test]
    fn test_outcome_helpers() {
        assert!(!CommandOutcome::Reply("x".into()).is_deferred());
        assert!(CommandOutcome::Queued.is_deferred());
        assert!(CommandOutcome::Dropped.is_deferred());
        assert_eq!(CommandOutcome::Reply("ok".into()).reply(), Some("ok"));
        assert_eq!(CommandOutcome::Queued.reply(), None);
    }

    #[test]
    fn test_mode_from_config() {
        let mut config = ManagementConfig::default();
        assert_eq!(Mode::from_config(&config), Mode::Client);
        config.mode = "server".into();
        assert_eq!(Mode::from_config(&config), Mode::Server);
    }

    #[test_log::test(tokio::test)]
    async fn test_server_send_without_session_is_dropped_promptly() {
        let (connector, _rx) = bound_server().await;
        let outcome = tokio::time::timeout(Duration::from_secs(1), connector.send_command("status 1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, CommandOutcome::Dropped);
        connector.close().await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_server_session_relays_lines_and_commands() {
        let (connector, mut rx) = bound_server().await;
        let addr = connector.local_addr().unwrap().to_string();

        let mut daemon = DialingDaemon::connect_tcp(&addr).await.unwrap();
        wait_for_sessions(&connector, 1).await;

        daemon.send_line(">BYTECOUNT:3,5").await.unwrap();
        assert_eq!(recv(&mut rx).await, ">BYTECOUNT:3,5");

        let outcome = connector.send_command("  hold release \n").await.unwrap();
        assert_eq!(outcome, CommandOutcome::Queued);
        assert_eq!(daemon.next_line().await.unwrap(), Some("hold release".to_string()));

        connector.close().await.unwrap();
        assert_eq!(connector.session_count(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_server_session_count_drops_on_disconnect() {
        let (connector, _rx) = bound_server().await;
        let addr = connector.local_addr().unwrap().to_string();

        let daemon = DialingDaemon::connect_tcp(&addr).await.unwrap();
        wait_for_sessions(&connector, 1).await;
        drop(daemon);
        wait_for_sessions(&connector, 0).await;
        assert_eq!(connector.send_command("pid").await.unwrap(), CommandOutcome::Dropped);
        connector.close().await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_server_multiple_sessions_share_queue() {
        let (connector, mut rx) = bound_server().await;
        let addr = connector.local_addr().unwrap().to_string();

        let mut first = DialingDaemon::connect_tcp(&addr).await.unwrap();
        let mut second = DialingDaemon::connect_tcp(&addr).await.unwrap();
        wait_for_sessions(&connector, 2).await;

        first.send_line(">BYTECOUNT:1,1").await.unwrap();
        second.send_line(">BYTECOUNT:2,2").await.unwrap();
        let mut lines = vec![recv(&mut rx).await, recv(&mut rx).await];
        lines.sort();
        assert_eq!(lines, vec![">BYTECOUNT:1,1", ">BYTECOUNT:2,2"]);

        assert_eq!(connector.send_command("pid").await.unwrap(), CommandOutcome::Queued);
        let quiet = Duration::from_millis(300);
        let to_first = tokio::time::timeout(quiet, first.next_line())
            .await
            .ok()
            .and_then(Result::ok)
            .flatten();
        let to_second = tokio::time::timeout(quiet, second.next_line())
            .await
            .ok()
            .and_then(Result::ok)
            .flatten();
        let delivered: Vec<String> = to_first.into_iter().chain(to_second).collect();
        assert_eq!(delivered, vec!["pid".to_string()]);

        drop(first);
        wait_for_sessions(&connector, 1).await;
        second.send_line(">BYTECOUNT:3,3").await.unwrap();
        assert_eq!(recv(&mut rx).await, ">BYTECOUNT:3,3");
        assert_eq!(
            connector.send_command("state on").await.unwrap(),
            CommandOutcome::Queued
        );
        assert_eq!(second.next_line().await.unwrap().as_deref(), Some("state on"));

        connector.close().await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_server_keeps_accepting_after_peer_hangs_up() {
        let (connector, mut rx) = bound_server().await;
        let addr = connector.local_addr().unwrap().to_string();

        for _ in 0..3 {
            drop(tokio::net::TcpStream::connect(addr.as_str()).await.unwrap());
        }
        wait_for_sessions(&connector, 0).await;

        let mut daemon = DialingDaemon::connect_tcp(&addr).await.unwrap();
        daemon.send_line(">HOLD:Waiting for hold release:0").await.unwrap();
        assert_eq!(recv(&mut rx).await, ">HOLD:Waiting for hold release:0");
        connector.close().await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_server_unix_socket_removed_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mgmt.sock");
        let mut connector = Connector::new(Endpoint::Unix(path.clone()), Mode::Server);
        connector.connect().await.unwrap();
        assert_eq!(connector.local_addr(), Some(path.display().to_string().as_str()));
        let (tx, mut rx) = mpsc::channel(4);
        connector.listen(tx).await.unwrap();

        let mut daemon = DialingDaemon::connect_unix(&path).await.unwrap();
        daemon.send_line(">HOLD:Waiting for hold release:0").await.unwrap();
        assert_eq!(recv(&mut rx).await, ">HOLD:Waiting for hold release:0");

        connector.close().await.unwrap();
        assert!(!path.exists());
    }

    #[test_log::test(tokio::test)]
    async fn test_client_direct_reply_skips_realtime_lines() {
        let daemon = ScriptedDaemon::builder()
            .greeting(">INFO:OpenVPN Management Interface Version 3")
            .reply("pid", &["SUCCESS: pid=4242"])
            .spawn_tcp()
            .await
            .unwrap();

        let mut connector = Connector::new(Endpoint::Tcp(daemon.addr().to_string()), Mode::Client);
        connector.connect().await.unwrap();
        let outcome = connector.send_command("pid").await.unwrap();
        assert_eq!(outcome, CommandOutcome::Reply("SUCCESS: pid=4242".to_string()));

        let (tx, mut rx) = mpsc::channel(8);
        connector.listen(tx).await.unwrap();
        assert_eq!(recv(&mut rx).await, ">INFO:OpenVPN Management Interface Version 3");
        assert_eq!(recv(&mut rx).await, "SUCCESS: pid=4242");

        connector.close().await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_client_reply_while_listening() {
        let daemon = ScriptedDaemon::builder()
            .reply("state on", &[">STATE:1,CONNECTED,SUCCESS", "SUCCESS: real-time state notification set to ON"])
            .spawn_tcp()
            .await
            .unwrap();

        let mut connector = Connector::new(Endpoint::Tcp(daemon.addr().to_string()), Mode::Client);
        connector.connect().await.unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        connector.listen(tx).await.unwrap();

        let outcome = connector.send_command("state on").await.unwrap();
        assert_eq!(
            outcome.reply(),
            Some("SUCCESS: real-time state notification set to ON")
        );
        assert_eq!(recv(&mut rx).await, ">STATE:1,CONNECTED,SUCCESS");
        assert_eq!(
            recv(&mut rx).await,
            "SUCCESS: real-time state notification set to ON"
        );

        connector.close().await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_client_peer_close_fails_pending_command() {
        let daemon = ScriptedDaemon::builder()
            .reply("signal SIGTERM", &[])
            .close_after_reply()
            .spawn_tcp()
            .await
            .unwrap();

        let mut connector = Connector::new(Endpoint::Tcp(daemon.addr().to_string()), Mode::Client);
        connector.connect().await.unwrap();
        let result = connector.send_command("signal SIGTERM").await;
        assert!(matches!(result, Err(ConnectorError::Closed)));
    }

    #[test_log::test(tokio::test)]
    async fn test_client_send_after_peer_close_while_listening() {
        let daemon = ScriptedDaemon::builder()
            .reply("pid", &["SUCCESS: pid=1"])
            .close_after_reply()
            .spawn_tcp()
            .await
            .unwrap();

        let mut connector = Connector::new(Endpoint::Tcp(daemon.addr().to_string()), Mode::Client);
        connector.connect().await.unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        connector.listen(tx).await.unwrap();

        let first = connector.send_command("pid").await.unwrap();
        assert_eq!(first.reply(), Some("SUCCESS: pid=1"));
        tokio::time::timeout(WAIT, async { while rx.recv().await.is_some() {} })
            .await
            .expect("reader never saw the hang-up");

        let second = tokio::time::timeout(WAIT, connector.send_command("pid"))
            .await
            .expect("send after hang-up blocked");
        assert!(matches!(second, Err(ConnectorError::Closed)));
    }

    #[tokio::test]
    async fn test_connect_failure_names_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Endpoint::Unix(dir.path().join("absent.sock"));
        let mut connector = Connector::new(endpoint, Mode::Client);
        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, ConnectorError::Connect { .. }));
        assert!(err.to_string().contains("absent.sock"));
    }

    #[tokio::test]
    async fn test_listen_before_connect() {
        let mut connector = Connector::new(Endpoint::Tcp("127.0.0.1:0".into()), Mode::Client);
        let (tx, _rx) = mpsc::channel(1);
        assert!(matches!(
            connector.listen(tx).await,
            Err(ConnectorError::NotConnected)
        ));
        assert!(matches!(
            connector.send_command("pid").await,
            Err(ConnectorError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (connector, _rx) = bound_server().await;
        connector.close().await.unwrap();
        connector.close().await.unwrap();
        assert!(connector.is_closed());
        assert!(matches!(
            connector.send_command("pid").await,
            Err(ConnectorError::Closed)
        ));
    }
}
