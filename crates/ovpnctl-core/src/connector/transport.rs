//! Stream transports: Unix domain sockets and TCP.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};
use tracing::{debug, warn};

use ovpnctl_config::ManagementConfig;

pub(crate) type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
pub(crate) type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Where the management interface lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Unix(PathBuf),
    Tcp(String),
}

impl Endpoint {
    /// A socket path, when configured, takes precedence over the TCP address.
    pub fn from_config(config: &ManagementConfig) -> Self {
        match config.socket_path() {
            Some(path) => Self::Unix(PathBuf::from(path)),
            None => Self::Tcp(config.address.clone()),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp:{addr}"),
        }
    }
}

/// Open one stream connection and split it into owned halves.
pub(crate) async fn dial(endpoint: &Endpoint) -> io::Result<(BoxReader, BoxWriter)> {
    match endpoint {
        Endpoint::Unix(path) => {
            let (reader, writer) = UnixStream::connect(path).await?.into_split();
            Ok((Box::new(reader), Box::new(writer)))
        }
        Endpoint::Tcp(addr) => {
            let stream = TcpStream::connect(addr.as_str()).await?;
            stream.set_nodelay(true)?;
            let (reader, writer) = stream.into_split();
            Ok((Box::new(reader), Box::new(writer)))
        }
    }
}

/// A bound listener of either transport.
pub(crate) enum Listener {
    Unix(UnixListener),
    Tcp(TcpListener),
}

impl Listener {
    /// Bind `endpoint`, removing a stale Unix socket file first.
    pub(crate) async fn bind(endpoint: &Endpoint) -> io::Result<Self> {
        match endpoint {
            Endpoint::Unix(path) => {
                remove_stale_socket(path)?;
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
                Ok(Self::Unix(UnixListener::bind(path)?))
            }
            Endpoint::Tcp(addr) => Ok(Self::Tcp(TcpListener::bind(addr.as_str()).await?)),
        }
    }

    /// Bound TCP address or socket path.
    pub(crate) fn local_addr(&self) -> io::Result<String> {
        match self {
            Self::Unix(listener) => Ok(listener
                .local_addr()?
                .as_pathname()
                .map(|p| p.display().to_string())
                .unwrap_or_default()),
            Self::Tcp(listener) => Ok(listener.local_addr()?.to_string()),
        }
    }

    /// Accept one connection, returning its halves and a peer label.
    pub(crate) async fn accept(&self) -> io::Result<(BoxReader, BoxWriter, String)> {
        match self {
            Self::Unix(listener) => {
                let (stream, _) = listener.accept().await?;
                let (reader, writer) = stream.into_split();
                Ok((Box::new(reader), Box::new(writer), "unix".to_string()))
            }
            Self::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                if let Err(e) = stream.set_nodelay(true) {
                    warn!(%peer, error = %e, "failed to set TCP_NODELAY");
                }
                let (reader, writer) = stream.into_split();
                Ok((Box::new(reader), Box::new(writer), peer.to_string()))
            }
        }
    }
}

pub(crate) fn remove_stale_socket(path: &Path) -> io::Result<()> {
    if path.exists() {
        debug!(path = %path.display(), "removing stale management socket");
        std::fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_endpoint_from_config() {
        let config = ManagementConfig::default();
        assert_eq!(
            Endpoint::from_config(&config),
            Endpoint::Tcp("127.0.0.1:7505".to_string())
        );

        let config = ManagementConfig {
            socket: Some("/run/mgmt.sock".to_string()),
            ..ManagementConfig::default()
        };
        assert_eq!(
            Endpoint::from_config(&config),
            Endpoint::Unix(PathBuf::from("/run/mgmt.sock"))
        );
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::Tcp("h:1".into()).to_string(), "tcp:h:1");
        assert_eq!(
            Endpoint::Unix(PathBuf::from("/tmp/a.sock")).to_string(),
            "unix:/tmp/a.sock"
        );
    }

    #[tokio::test]
    async fn test_bind_replaces_stale_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mgmt.sock");
        std::fs::write(&path, b"stale").unwrap();

        let listener = Listener::bind(&Endpoint::Unix(path.clone())).await.unwrap();
        assert_eq!(listener.local_addr().unwrap(), path.display().to_string());
    }

    #[tokio::test]
    async fn test_bind_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mgmt.sock");
        Listener::bind(&Endpoint::Unix(path.clone())).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_bind_reports_unusable_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let result = Listener::bind(&Endpoint::Unix(blocker.join("mgmt.sock"))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_tcp_dial_and_accept() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = Listener::bind(&Endpoint::Tcp("127.0.0.1:0".into()))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let dialer = tokio::spawn(async move {
            let (_reader, mut writer) = dial(&Endpoint::Tcp(addr)).await.unwrap();
            writer.write_all(b"hi").await.unwrap();
        });

        let (mut reader, _writer, peer) = listener.accept().await.unwrap();
        assert!(peer.starts_with("127.0.0.1:"));
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hi");
        dialer.await.unwrap();
    }

    #[tokio::test]
    async fn test_dial_missing_socket_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = dial(&Endpoint::Unix(dir.path().join("absent.sock"))).await;
        assert!(result.is_err());
    }
}
