//! Stand-ins for the VPN daemon's side of the management interface.
//!
//! - [`ScriptedDaemon`] listens like a daemon started with `--management`
//!   and answers commands from a fixed script (for client-mode tests).
//! - [`DialingDaemon`] dials in like a daemon started with
//!   `--management-client` (for server-mode tests).

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};
use tokio::task::JoinHandle;
use tracing::debug;

type Reader = Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// How long helpers wait for a line before failing the test.
pub const LINE_TIMEOUT: Duration = Duration::from_secs(5);

/// Reply sent for commands the script does not know.
pub const UNKNOWN_COMMAND: &str = "ERROR: unknown command, enter 'help' for more options";

/// A daemon connection dialed into ovpnctl's listener.
pub struct DialingDaemon {
    reader: Reader,
    writer: Writer,
}

impl DialingDaemon {
    pub async fn connect_tcp(addr: &str) -> io::Result<Self> {
        let (reader, writer) = TcpStream::connect(addr).await?.into_split();
        Ok(Self::from_halves(Box::new(reader), Box::new(writer)))
    }

    pub async fn connect_unix(path: &Path) -> io::Result<Self> {
        let (reader, writer) = UnixStream::connect(path).await?.into_split();
        Ok(Self::from_halves(Box::new(reader), Box::new(writer)))
    }

    fn from_halves(reader: Box<dyn AsyncRead + Send + Unpin>, writer: Writer) -> Self {
        Self {
            reader: BufReader::new(reader).lines(),
            writer,
        }
    }

    pub async fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(format!("{line}\n").as_bytes()).await?;
        self.writer.flush().await
    }

    pub async fn send_lines(&mut self, lines: &[&str]) -> io::Result<()> {
        for line in lines {
            self.send_line(line).await?;
        }
        Ok(())
    }

    /// Next command written by ovpnctl, or `None` once it hangs up.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        tokio::time::timeout(LINE_TIMEOUT, self.reader.next_line())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "no line from ovpnctl"))?
    }
}

/// Script for a [`ScriptedDaemon`].
#[derive(Default)]
pub struct ScriptedDaemonBuilder {
    greeting: Vec<String>,
    replies: HashMap<String, Vec<String>>,
    close_after_reply: bool,
}

impl ScriptedDaemonBuilder {
    /// Line written as soon as a connection is accepted.
    pub fn greeting(mut self, line: &str) -> Self {
        self.greeting.push(line.to_string());
        self
    }

    /// Lines written in answer to `command`.
    pub fn reply(mut self, command: &str, lines: &[&str]) -> Self {
        self.replies.insert(
            command.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    /// Hang up after answering the first command.
    pub fn close_after_reply(mut self) -> Self {
        self.close_after_reply = true;
        self
    }

    pub async fn spawn_tcp(self) -> io::Result<ScriptedDaemon> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?.to_string();
        Ok(self.spawn(addr, Acceptor::Tcp(listener)))
    }

    pub async fn spawn_unix(self, path: &Path) -> io::Result<ScriptedDaemon> {
        let listener = UnixListener::bind(path)?;
        Ok(self.spawn(path.display().to_string(), Acceptor::Unix(listener)))
    }

    fn spawn(self, addr: String, acceptor: Acceptor) -> ScriptedDaemon {
        let received = Arc::new(Mutex::new(Vec::new()));
        let script = Arc::new(self);
        let log = Arc::clone(&received);
        let handle = tokio::spawn(async move {
            while let Ok((reader, writer)) = acceptor.accept().await {
                debug!("fake daemon accepted connection");
                let script = Arc::clone(&script);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let _ = script.serve(reader, writer, log).await;
                });
            }
        });
        ScriptedDaemon {
            addr,
            received,
            handle,
        }
    }

    async fn serve(
        &self,
        reader: Box<dyn AsyncRead + Send + Unpin>,
        mut writer: Writer,
        log: Arc<Mutex<Vec<String>>>,
    ) -> io::Result<()> {
        for line in &self.greeting {
            writer.write_all(format!("{line}\n").as_bytes()).await?;
        }
        writer.flush().await?;

        let mut lines = BufReader::new(reader).lines();
        while let Some(command) = lines.next_line().await? {
            let command = command.trim().to_string();
            debug!(%command, "fake daemon received command");
            log.lock().expect("received log poisoned").push(command.clone());
            match self.replies.get(&command) {
                Some(reply) => {
                    for line in reply {
                        writer.write_all(format!("{line}\n").as_bytes()).await?;
                    }
                }
                None => {
                    writer
                        .write_all(format!("{UNKNOWN_COMMAND}\n").as_bytes())
                        .await?;
                }
            }
            writer.flush().await?;
            if self.close_after_reply {
                writer.shutdown().await?;
                return Ok(());
            }
        }
        Ok(())
    }
}

enum Acceptor {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl Acceptor {
    async fn accept(&self) -> io::Result<(Box<dyn AsyncRead + Send + Unpin>, Writer)> {
        match self {
            Self::Tcp(listener) => {
                let (reader, writer) = listener.accept().await?.0.into_split();
                Ok((Box::new(reader), Box::new(writer)))
            }
            Self::Unix(listener) => {
                let (reader, writer) = listener.accept().await?.0.into_split();
                Ok((Box::new(reader), Box::new(writer)))
            }
        }
    }
}

/// A listening fake daemon; stops accepting when dropped.
pub struct ScriptedDaemon {
    addr: String,
    received: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl ScriptedDaemon {
    pub fn builder() -> ScriptedDaemonBuilder {
        ScriptedDaemonBuilder::default()
    }

    /// `host:port` or socket path to dial.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Commands received so far, trimmed.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().expect("received log poisoned").clone()
    }
}

impl Drop for ScriptedDaemon {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
