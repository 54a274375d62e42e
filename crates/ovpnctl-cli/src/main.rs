#![deny(unsafe_code)]

//! ovpnctl CLI: command-line control plane for an OpenVPN daemon.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use ovpnctl_config::{AppConfig, ManagementConfig};
use ovpnctl_core::{
    Client, Connector, EventKind, EventRecord, Management, Parser as LineParser, Process,
    ProcessState, StandardActions, VpnActions,
};

/// How long one-shot commands wait for the daemon.
const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// ovpnctl: drive an OpenVPN daemon through its management interface.
#[derive(Parser)]
#[command(name = "ovpnctl", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "ovpnctl.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected clients.
    Status {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Send one management command and print the reply.
    Exec {
        /// Command words, e.g. `kill alice` or `signal SIGHUP`.
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Accept the daemon's connection and print every event.
    Watch {
        /// Start and supervise the daemon binary.
        #[arg(long)]
        spawn: bool,

        /// Answer HOLD with `echo on`, `state on` and `hold release`.
        #[arg(long)]
        auto_hold: bool,

        /// Answer client authentication requests.
        #[arg(long, value_enum)]
        auth: Option<AuthPolicy>,

        /// Request BYTECOUNT notifications every SECS seconds.
        #[arg(long, value_name = "SECS")]
        bytecount: Option<u64>,

        /// Print events as JSON lines.
        #[arg(long)]
        json: bool,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AuthPolicy {
    Accept,
    Deny,
}

struct WatchOptions {
    spawn: bool,
    auto_hold: bool,
    auth: Option<AuthPolicy>,
    bytecount: Option<u64>,
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_config(&cli.config).await;
    let level = loaded
        .as_ref()
        .map(|(config, _)| config.logging.level.as_str())
        .unwrap_or("info");
    let filter = match cli.verbose {
        0 => level,
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let (config, found) = loaded?;
    if !found {
        info!(path = %cli.config.display(), "config file not found, using defaults");
    }

    match cli.command {
        Commands::Status { json } => cmd_status(&config, json).await?,
        Commands::Exec { command } => cmd_exec(&config, &command).await?,
        Commands::Watch {
            spawn,
            auto_hold,
            auth,
            bytecount,
            json,
        } => {
            let options = WatchOptions {
                spawn,
                auto_hold,
                auth,
                bytecount,
                json,
            };
            cmd_watch(config, options).await?
        }
        Commands::Config { show } => cmd_config(&cli.config, &config, show)?,
    }

    Ok(())
}

async fn cmd_status(config: &AppConfig, json: bool) -> Result<()> {
    let management = with_mode(&config.management, "client");
    let mut mgmt = Management::from_config(&management);
    let mut lines = mgmt.start_client().await?;

    let outcome = mgmt.status_timeout(REPLY_TIMEOUT).await?;
    if let Some(reply) = outcome.reply() {
        if reply.starts_with("ERROR") {
            bail!("daemon rejected status: {reply}");
        }
    }

    let report = tokio::time::timeout(REPLY_TIMEOUT, next_client_list(&mut lines))
        .await
        .context("timed out waiting for the client list")?
        .context("management connection closed before the client list")?;
    let clients = mgmt.get_clients(&report)?;
    mgmt.shutdown().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&clients)?);
    } else {
        print!("{}", render_clients(&clients));
    }
    Ok(())
}

/// Feed raw lines to a parser until the `CLIENT_LIST` block completes.
async fn next_client_list(lines: &mut mpsc::Receiver<String>) -> Option<EventRecord> {
    let mut parser = LineParser::new();
    while let Some(line) = lines.recv().await {
        if let Some(record) = parser.parse_line(&line) {
            if record.kind == EventKind::ClientList {
                return Some(record);
            }
            debug!(event = %record.event_name(), "skipping event");
        }
    }
    None
}

fn render_clients(clients: &[Client]) -> String {
    let mut out = format!(
        "{:<24} {:<22} {:<16} {:>12} {:>12}  {}\n",
        "COMMON NAME", "REAL ADDRESS", "VIRTUAL ADDRESS", "BYTES IN", "BYTES OUT", "LAST REF"
    );
    for client in clients {
        out.push_str(&format!(
            "{:<24} {:<22} {:<16} {:>12} {:>12}  {}\n",
            client.common_name,
            client.public_ip,
            client.private_ip,
            client.bytes_received,
            client.bytes_sent,
            client.last_ref
        ));
    }
    out
}

async fn cmd_exec(config: &AppConfig, words: &[String]) -> Result<()> {
    let command = words.join(" ");
    if command.trim().is_empty() {
        bail!("empty command");
    }

    let management = with_mode(&config.management, "client");
    let mut connector = Connector::from_config(&management);
    connector.connect().await?;
    let outcome = tokio::time::timeout(REPLY_TIMEOUT, connector.send_command(&command))
        .await
        .context("timed out waiting for a reply")??;
    connector.close().await?;

    if let Some(reply) = outcome.reply() {
        println!("{reply}");
    }
    Ok(())
}

async fn cmd_watch(mut config: AppConfig, options: WatchOptions) -> Result<()> {
    config.management = with_mode(&config.management, "server");
    let mut mgmt = Management::from_config(&config.management);
    let mut events = mgmt.start_server().await?;
    info!(
        local_addr = mgmt.connector().local_addr().unwrap_or(""),
        "waiting for the daemon to connect"
    );

    let mut process = None;
    if options.spawn {
        let mut supervised = Process::from_config(&config);
        forward_output(&mut supervised);
        supervised.start().await?;
        process = Some(supervised);
    }
    let mut daemon_state = process.as_ref().map(Process::stopped);

    let actions = StandardActions::default();
    let mut usage_requested = false;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted, shutting down");
                break;
            }
            _ = daemon_exited(&mut daemon_state) => {
                warn!("supervised daemon exited");
                break;
            }
            event = events.recv() => {
                let Some(record) = event else {
                    break;
                };
                print_event(&record, options.json)?;

                if let Some(secs) = options.bytecount {
                    if !usage_requested {
                        mgmt.exec(&actions.usage(Duration::from_secs(secs))).await;
                        usage_requested = true;
                    }
                }
                for reply in automatic_reply(&actions, &record, &options) {
                    mgmt.exec(&reply).await;
                }
            }
        }
    }

    if let Some(process) = process.as_mut() {
        process.stop().await;
    }
    mgmt.shutdown().await?;
    Ok(())
}

/// Commands sent in answer to `record`, in order.
fn automatic_reply(
    actions: &impl VpnActions,
    record: &EventRecord,
    options: &WatchOptions,
) -> Vec<String> {
    match record.kind {
        EventKind::Hold if options.auto_hold => actions.hold_commands(record),
        EventKind::Client => options
            .auth
            .and_then(|policy| actions.respond(record, policy == AuthPolicy::Accept))
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

fn print_event(record: &EventRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(record)?);
    } else {
        println!("{record}");
    }
    Ok(())
}

/// Log the supervised daemon's stdout and stderr.
fn forward_output(process: &mut Process) {
    for (stream, rx) in [
        ("stdout", process.take_stdout()),
        ("stderr", process.take_stderr()),
    ] {
        let Some(mut rx) = rx else {
            continue;
        };
        tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                info!(stream, %line, "daemon output");
            }
        });
    }
}

/// Resolve when the supervised daemon is stopped; never without one.
async fn daemon_exited(state: &mut Option<watch::Receiver<ProcessState>>) {
    match state {
        Some(rx) => {
            let _ = rx.wait_for(|s| *s == ProcessState::Stopped).await;
        }
        None => std::future::pending().await,
    }
}

fn with_mode(config: &ManagementConfig, mode: &str) -> ManagementConfig {
    let mut config = config.clone();
    if config.mode != mode {
        info!(configured = %config.mode, using = mode, "overriding management mode");
        config.mode = mode.to_string();
    }
    config
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    config.validate()?;
    if show {
        let toml_str =
            toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

/// The parsed config and whether it came from a file.
async fn load_config(path: &Path) -> Result<(AppConfig, bool)> {
    if path.exists() {
        let config = AppConfig::load(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((AppConfig::default(), false))
    }
}
