//! Background loops: the server accept loop, per-connection sessions, and
//! the client-mode reader.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::transport::{BoxReader, BoxWriter, Listener};
use crate::parser::REALTIME_MARKER;
use crate::shutdown::wait_for_shutdown;

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Shared receiving end of the outbound command queue.
pub(crate) type CommandQueue = Arc<Mutex<mpsc::Receiver<String>>>;

/// Where the client reader delivers the reply to the in-flight command.
pub(crate) type ReplySlot = Arc<Mutex<ReplyState>>;

#[derive(Default)]
pub(crate) struct ReplyState {
    pub(crate) waiter: Option<oneshot::Sender<String>>,
    /// Set for good once the reader loop has exited.
    pub(crate) ended: bool,
}

pub(crate) type LineReader = Lines<BufReader<BoxReader>>;

/// Decrements the live session count when the session ends, however it ends.
struct SessionGuard(Arc<AtomicUsize>);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Accept connections until shutdown, running one session per connection.
pub(crate) async fn accept_loop(
    listener: Listener,
    lines: mpsc::Sender<String>,
    queue: CommandQueue,
    sessions: Arc<AtomicUsize>,
    shutdown: watch::Receiver<bool>,
) {
    let mut running = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((reader, writer, peer)) => {
                    info!(%peer, "management session connected");
                    sessions.fetch_add(1, Ordering::SeqCst);
                    let guard = SessionGuard(Arc::clone(&sessions));
                    running.spawn(run_session(
                        reader,
                        writer,
                        peer,
                        lines.clone(),
                        Arc::clone(&queue),
                        shutdown.clone(),
                        guard,
                    ));
                }
                Err(e) => {
                    if *shutdown.borrow() {
                        break;
                    }
                    warn!(error = %e, "management accept failed");
                    // Back off so a persistent error does not spin.
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            },
            _ = wait_for_shutdown(shutdown.clone()) => {
                debug!("accept loop stopping");
                break;
            }
            Some(_) = running.join_next(), if !running.is_empty() => {}
        }
    }

    drop(listener);
    while running.join_next().await.is_some() {}
    info!("management listener closed");
}

async fn run_session(
    reader: BoxReader,
    writer: BoxWriter,
    peer: String,
    lines: mpsc::Sender<String>,
    queue: CommandQueue,
    shutdown: watch::Receiver<bool>,
    _guard: SessionGuard,
) {
    tokio::select! {
        _ = read_loop(reader, &lines) => debug!(%peer, "session reader finished"),
        _ = write_loop(writer, &queue) => debug!(%peer, "session writer finished"),
        _ = wait_for_shutdown(shutdown) => debug!(%peer, "session shutting down"),
    }
    info!(%peer, "management session closed");
}

async fn read_loop(reader: BoxReader, lines: &mpsc::Sender<String>) {
    let mut incoming = BufReader::new(reader).lines();
    loop {
        match incoming.next_line().await {
            Ok(Some(line)) => {
                if lines.send(line).await.is_err() {
                    debug!("raw line consumer gone");
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "management read failed");
                return;
            }
        }
    }
}

async fn write_loop(mut writer: BoxWriter, queue: &CommandQueue) {
    loop {
        let command = {
            let mut rx = queue.lock().await;
            rx.recv().await
        };
        let Some(command) = command else {
            return;
        };
        debug!(%command, "writing queued command");
        let framed = format!("{command}\n");
        if let Err(e) = write_line(&mut writer, &framed).await {
            warn!(error = %e, %command, "management write failed");
            return;
        }
    }
}

pub(crate) async fn write_line(writer: &mut BoxWriter, framed: &str) -> std::io::Result<()> {
    writer.write_all(framed.as_bytes()).await?;
    writer.flush().await
}

/// Client-mode reader: forwards every line and copies the first
/// non-realtime line to the waiting command, if any.
pub(crate) async fn client_read_loop(
    mut incoming: LineReader,
    lines: mpsc::Sender<String>,
    reply: ReplySlot,
    shutdown: watch::Receiver<bool>,
) {
    loop {
        let next = tokio::select! {
            next = incoming.next_line() => next,
            _ = wait_for_shutdown(shutdown.clone()) => break,
        };
        let line = match next {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("management connection closed by peer");
                break;
            }
            Err(e) => {
                warn!(error = %e, "management read failed");
                break;
            }
        };

        if !line.starts_with(REALTIME_MARKER) {
            if let Some(waiter) = reply.lock().await.waiter.take() {
                let _ = waiter.send(line.clone());
            }
        }
        let forwarded = tokio::select! {
            sent = lines.send(line) => sent.is_ok(),
            _ = wait_for_shutdown(shutdown.clone()) => false,
        };
        if !forwarded {
            break;
        }
    }

    // Wake a command still waiting for a reply and refuse later ones.
    let mut state = reply.lock().await;
    state.ended = true;
    state.waiter.take();
}
