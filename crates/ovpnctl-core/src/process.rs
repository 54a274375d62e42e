//! Supervisor for the VPN daemon process.
//!
//! Lifecycle: `Stopped → Starting → Running → Stopping → Stopped`.
//!
//! Each run arms three tasks before the child exists: a stdout monitor, a
//! stderr monitor, and an exit watcher. They receive the pipes and the
//! child through one-shot handoffs once the spawn succeeds; if it fails the
//! handoffs are dropped and the tasks exit on their own. [`Process::stop`]
//! signals shutdown and joins all three, so no output is forwarded after it
//! returns.

use std::process::Stdio;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use ovpnctl_config::{AppConfig, DaemonArgs, ProcessConfig};

use crate::shutdown::wait_for_shutdown;

/// Errors from the process supervisor.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("daemon is already running")]
    AlreadyRunning,

    #[error("invalid daemon arguments: {0}")]
    Arguments(String),

    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
}

/// Supplies the daemon's argv (without the executable) on every start.
pub trait ArgumentSource: Send + Sync {
    fn arguments(&self) -> Result<Vec<String>, ProcessError>;
}

impl ArgumentSource for DaemonArgs {
    fn arguments(&self) -> Result<Vec<String>, ProcessError> {
        Ok(self.as_slice().to_vec())
    }
}

impl ArgumentSource for Vec<String> {
    fn arguments(&self) -> Result<Vec<String>, ProcessError> {
        Ok(self.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Executable name or path.
    pub binary: String,
    /// Capacity of each stdout/stderr line channel.
    pub output_buffer: usize,
}

impl ProcessOptions {
    pub fn from_config(config: &ProcessConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            output_buffer: config.output_buffer,
        }
    }
}

pub struct Process {
    options: ProcessOptions,
    args: Box<dyn ArgumentSource>,
    state: Arc<watch::Sender<ProcessState>>,
    shutdown_tx: watch::Sender<bool>,
    stdout_tx: mpsc::Sender<String>,
    stdout_rx: Option<mpsc::Receiver<String>>,
    stderr_tx: mpsc::Sender<String>,
    stderr_rx: Option<mpsc::Receiver<String>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Process {
    pub fn new(options: ProcessOptions, args: impl ArgumentSource + 'static) -> Self {
        let capacity = options.output_buffer.max(1);
        let (stdout_tx, stdout_rx) = mpsc::channel(capacity);
        let (stderr_tx, stderr_rx) = mpsc::channel(capacity);
        let (state, _) = watch::channel(ProcessState::Stopped);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            options,
            args: Box::new(args),
            state: Arc::new(state),
            shutdown_tx,
            stdout_tx,
            stdout_rx: Some(stdout_rx),
            stderr_tx,
            stderr_rx: Some(stderr_rx),
            tasks: Vec::new(),
        }
    }

    /// Supervisor for `config.process` with management flags matching
    /// `config.management`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            ProcessOptions::from_config(&config.process),
            config.process.build_args(&config.management),
        )
    }

    pub fn state(&self) -> ProcessState {
        *self.state.borrow()
    }

    /// Receiver for state changes; wait on it for [`ProcessState::Stopped`].
    pub fn stopped(&self) -> watch::Receiver<ProcessState> {
        self.state.subscribe()
    }

    /// The stdout line stream. Only the first call returns it.
    pub fn take_stdout(&mut self) -> Option<mpsc::Receiver<String>> {
        self.stdout_rx.take()
    }

    /// The stderr line stream. Only the first call returns it.
    pub fn take_stderr(&mut self) -> Option<mpsc::Receiver<String>> {
        self.stderr_rx.take()
    }

    /// Start the daemon unless it is already running.
    pub async fn start(&mut self) -> Result<(), ProcessError> {
        if self.state() != ProcessState::Stopped {
            return Err(ProcessError::AlreadyRunning);
        }
        self.restart().await
    }

    /// Spawn a fresh daemon with arguments re-read from the source.
    pub async fn restart(&mut self) -> Result<(), ProcessError> {
        let args = self.args.arguments()?;
        info!(binary = %self.options.binary, ?args, "starting daemon");

        self.reap_finished();
        self.state.send_replace(ProcessState::Starting);
        self.shutdown_tx.send_replace(false);

        let (stdout_release, stdout_pipe) = oneshot::channel::<ChildStdout>();
        let (stderr_release, stderr_pipe) = oneshot::channel::<ChildStderr>();
        let (child_release, child_slot) = oneshot::channel::<Child>();

        self.tasks.push(tokio::spawn(monitor_output(
            "stdout",
            stdout_pipe,
            self.stdout_tx.clone(),
            self.shutdown_tx.subscribe(),
        )));
        self.tasks.push(tokio::spawn(monitor_output(
            "stderr",
            stderr_pipe,
            self.stderr_tx.clone(),
            self.shutdown_tx.subscribe(),
        )));
        self.tasks.push(tokio::spawn(watch_exit(
            child_slot,
            Arc::clone(&self.state),
            self.shutdown_tx.subscribe(),
        )));

        let spawned = Command::new(&self.options.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                warn!(binary = %self.options.binary, error = %source, "daemon failed to start");
                self.state.send_replace(ProcessState::Stopped);
                return Err(ProcessError::Spawn {
                    binary: self.options.binary.clone(),
                    source,
                });
            }
        };

        info!(pid = ?child.id(), "daemon running");
        self.state.send_replace(ProcessState::Running);
        if let Some(stdout) = child.stdout.take() {
            let _ = stdout_release.send(stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            let _ = stderr_release.send(stderr);
        }
        let _ = child_release.send(child);
        Ok(())
    }

    /// Kill the daemon if it is running and wait for every monitor and the
    /// exit watcher to finish.
    pub async fn stop(&mut self) {
        self.state.send_if_modified(|state| match state {
            ProcessState::Starting | ProcessState::Running => {
                *state = ProcessState::Stopping;
                true
            }
            _ => false,
        });
        self.shutdown_tx.send_replace(true);

        for handle in self.tasks.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "supervisor task failed");
            }
        }
        self.state.send_replace(ProcessState::Stopped);
        debug!("supervisor stopped");
    }

    fn reap_finished(&mut self) {
        self.tasks.retain(|handle| !handle.is_finished());
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}

/// Forward lines from one pipe without ever blocking on the consumer.
async fn monitor_output<R>(
    stream: &'static str,
    pipe: oneshot::Receiver<R>,
    output: mpsc::Sender<String>,
    shutdown: watch::Receiver<bool>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let pipe = tokio::select! {
        pipe = pipe => match pipe {
            Ok(pipe) => pipe,
            Err(_) => return,
        },
        _ = wait_for_shutdown(shutdown.clone()) => return,
    };

    let mut lines = BufReader::new(pipe).lines();
    loop {
        let next = tokio::select! {
            next = lines.next_line() => next,
            _ = wait_for_shutdown(shutdown.clone()) => break,
        };
        match next {
            Ok(Some(line)) => match output.try_send(line) {
                Ok(()) => {}
                Err(TrySendError::Full(line)) | Err(TrySendError::Closed(line)) => {
                    debug!(stream, %line, "no consumer ready, dropping daemon output");
                }
            },
            Ok(None) => break,
            Err(e) => {
                warn!(stream, error = %e, "failed to read daemon output");
                break;
            }
        }
    }
    debug!(stream, "output monitor finished");
}

/// Wait for the child to exit, killing it first on shutdown.
async fn watch_exit(
    child: oneshot::Receiver<Child>,
    state: Arc<watch::Sender<ProcessState>>,
    shutdown: watch::Receiver<bool>,
) {
    let mut child = tokio::select! {
        child = child => match child {
            Ok(child) => child,
            Err(_) => return,
        },
        _ = wait_for_shutdown(shutdown.clone()) => return,
    };

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => info!(%status, "daemon exited"),
            Ok(status) => warn!(%status, "daemon exited abnormally"),
            Err(e) => warn!(error = %e, "failed to wait for daemon"),
        },
        _ = wait_for_shutdown(shutdown) => {
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "failed to kill daemon");
            }
            match child.wait().await {
                Ok(status) => info!(%status, "daemon killed"),
                Err(e) => warn!(error = %e, "failed to reap daemon"),
            }
        }
    }
    state.send_replace(ProcessState::Stopped);
}
