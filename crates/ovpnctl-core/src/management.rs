//! Management orchestrator: one connector, one parser, one event stream.
//!
//! ```text
//!  connector ──raw lines──▶ dispatch task ──EventRecord──▶ caller
//!      ▲                     │ Parser
//!      │                     ▼
//!   commands            ClientRegistry
//! ```
//!
//! In server mode the dispatch task parses every line and hands completed
//! records to the caller one at a time; a slow consumer slows the readers
//! down rather than losing events. In client mode the caller receives the
//! raw lines and parses them itself.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use ovpnctl_config::ManagementConfig;

use crate::connector::{CommandOutcome, Connector, ConnectorError, Mode};
use crate::event::EventRecord;
use crate::parser::Parser;
use crate::registry::ClientRegistry;
use crate::shutdown::wait_for_shutdown;
use crate::status::{Client, StatusError, parse_status};

/// Channel capacities used by [`Management`].
#[derive(Debug, Clone)]
pub struct ManagementOptions {
    /// Decoded events buffered before the dispatch task blocks.
    pub event_buffer: usize,
    /// Raw lines buffered between the connector and its consumer.
    pub line_buffer: usize,
}

impl Default for ManagementOptions {
    fn default() -> Self {
        Self {
            event_buffer: 1,
            line_buffer: 64,
        }
    }
}

/// Errors from the management orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ManagementError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("management interface already started")]
    AlreadyStarted,
}

pub struct Management {
    connector: Connector,
    registry: ClientRegistry,
    options: ManagementOptions,
    dispatch: Option<JoinHandle<()>>,
    started: bool,
}

impl Management {
    pub fn new(connector: Connector) -> Self {
        Self::with_options(connector, ManagementOptions::default())
    }

    pub fn with_options(connector: Connector, options: ManagementOptions) -> Self {
        Self {
            connector,
            registry: ClientRegistry::new(),
            options,
            dispatch: None,
            started: false,
        }
    }

    pub fn from_config(config: &ManagementConfig) -> Self {
        Self::new(Connector::from_config(config))
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Handle to the environments collected from `CLIENT` events.
    pub fn registry(&self) -> ClientRegistry {
        self.registry.clone()
    }

    /// Dial the daemon and return its raw line stream.
    pub async fn start_client(&mut self) -> Result<mpsc::Receiver<String>, ManagementError> {
        self.begin(Mode::Client)?;
        self.connector.connect().await?;
        let (lines_tx, lines_rx) = mpsc::channel(self.options.line_buffer.max(1));
        self.connector.listen(lines_tx).await?;
        self.started = true;
        info!(endpoint = %self.connector.endpoint(), "management client started");
        Ok(lines_rx)
    }

    /// Listen for the daemon and return the decoded event stream.
    pub async fn start_server(&mut self) -> Result<mpsc::Receiver<EventRecord>, ManagementError> {
        self.begin(Mode::Server)?;
        self.connector.connect().await?;

        let (lines_tx, lines_rx) = mpsc::channel(self.options.line_buffer.max(1));
        let (events_tx, events_rx) = mpsc::channel(self.options.event_buffer.max(1));
        self.connector.listen(lines_tx).await?;
        self.started = true;
        self.dispatch = Some(tokio::spawn(dispatch(
            lines_rx,
            events_tx,
            self.registry.clone(),
            self.connector.shutdown_signal(),
        )));
        info!(
            endpoint = %self.connector.endpoint(),
            local_addr = self.connector.local_addr().unwrap_or(""),
            "management server started"
        );
        Ok(events_rx)
    }

    fn begin(&self, mode: Mode) -> Result<(), ManagementError> {
        if self.started {
            return Err(ManagementError::AlreadyStarted);
        }
        if self.connector.mode() != mode {
            return Err(ConnectorError::WrongMode(mode.as_str()).into());
        }
        Ok(())
    }

    /// Send `status 1`. Client mode returns the first reply line; the full
    /// report arrives on the line stream. Server mode returns the queue
    /// outcome and the report arrives as a `CLIENT_LIST` event.
    pub async fn status(&self) -> Result<CommandOutcome, ManagementError> {
        Ok(self.connector.send_command(crate::commands::STATUS).await?)
    }

    /// [`status`](Self::status) bounded by `timeout`.
    pub async fn status_timeout(
        &self,
        timeout: Duration,
    ) -> Result<CommandOutcome, ManagementError> {
        tokio::time::timeout(timeout, self.status())
            .await
            .map_err(|_| ManagementError::Timeout(timeout))?
    }

    /// Fire-and-forget command; every outcome is logged.
    pub async fn exec(&self, command: &str) {
        match self.connector.send_command(command).await {
            Ok(CommandOutcome::Reply(reply)) => info!(%command, %reply, "command answered"),
            Ok(CommandOutcome::Queued) => debug!(%command, "command queued"),
            Ok(CommandOutcome::Dropped) => warn!(%command, "command dropped"),
            Err(e) => warn!(%command, error = %e, "command failed"),
        }
    }

    /// Decode the clients in a `CLIENT_LIST` record, attaching the
    /// certificate environment collected for each common name.
    pub fn get_clients(&self, record: &EventRecord) -> Result<Vec<Client>, ManagementError> {
        let mut clients = parse_status(&record.raw_payload)?;
        for client in &mut clients {
            if let Some(env) = self.registry.env(&client.common_name) {
                client.env = env;
            }
        }
        Ok(clients)
    }

    /// Close the connector and wait for the dispatch task.
    pub async fn shutdown(&mut self) -> Result<(), ManagementError> {
        info!("management shutting down");
        self.connector.close().await?;
        if let Some(handle) = self.dispatch.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "dispatch task failed");
            }
        }
        Ok(())
    }
}

async fn dispatch(
    mut lines: mpsc::Receiver<String>,
    events: mpsc::Sender<EventRecord>,
    registry: ClientRegistry,
    shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut parser = Parser::new();
    while let Some(line) = lines.recv().await {
        trace!(%line, "management line");
        let Some(record) = parser.parse_line(&line) else {
            continue;
        };
        if record.malformed {
            debug!(event = %record.event_name(), "malformed event");
        }
        registry.observe(&record);

        let delivered = tokio::select! {
            sent = events.send(record) => sent.is_ok(),
            _ = wait_for_shutdown(shutdown.clone()) => false,
        };
        if !delivered {
            debug!("event consumer gone, stopping dispatch");
            break;
        }
    }
    debug!("dispatch finished");
}
