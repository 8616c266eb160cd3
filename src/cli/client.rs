//! IPC client for communicating with the Tabata timer daemon.
//!
//! This module provides:
//! - Unix Domain Socket client for the line protocol
//! - Daemon auto-start when nothing is listening
//! - Timeout handling

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::TabataConfig;
use crate::types::Command;

use super::launcher::DaemonLauncher;

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Reply timeout in seconds; the daemon may be busy playing an announcement
const REPLY_TIMEOUT_SECS: u64 = 30;

/// Maximum reply size in bytes
const MAX_REPLY_SIZE: u64 = 4096;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
#[derive(Debug, Clone)]
pub struct IpcClient {
    /// Socket path
    socket_path: PathBuf,
    /// Reply timeout
    timeout: Duration,
    /// Used to start the daemon if it is not running
    launcher: Option<DaemonLauncher>,
}

impl IpcClient {
    /// Creates a client for the configured socket that starts the daemon on
    /// demand.
    ///
    /// # Errors
    ///
    /// Returns an error if the running executable cannot be located.
    pub fn new(config: &TabataConfig) -> Result<Self> {
        Ok(Self::with_socket_path(config.socket_path.clone())
            .with_launcher(DaemonLauncher::current(config)?))
    }

    /// Creates a client for a custom socket path, without auto-start.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(REPLY_TIMEOUT_SECS),
            launcher: None,
        }
    }

    /// Enables daemon auto-start through `launcher`.
    #[must_use]
    pub fn with_launcher(mut self, launcher: DaemonLauncher) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Sets the reply timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Sends one command and returns the reply line without its terminator.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached or does not reply.
    pub async fn send(&self, command: &Command) -> Result<String> {
        let mut stream = self.connect_or_launch().await?;
        let line = format!("{}\n", command.to_line());
        debug!(command = %command.to_line(), "sending command");

        stream
            .write_all(line.as_bytes())
            .await
            .context("Failed to send command")?;
        // end of request
        stream
            .shutdown()
            .await
            .context("Failed to send command")?;

        let mut buffer = Vec::new();
        timeout(
            self.timeout,
            (&mut stream).take(MAX_REPLY_SIZE).read_to_end(&mut buffer),
        )
        .await
        .context("Timed out waiting for the daemon")?
        .context("Failed to read reply")?;

        let text = String::from_utf8_lossy(&buffer);
        let reply = text.lines().next().unwrap_or("").trim_end();
        if reply.is_empty() {
            anyhow::bail!("No reply from the daemon");
        }
        Ok(reply.to_string())
    }

    async fn connect_or_launch(&self) -> Result<UnixStream> {
        let error = match self.connect().await {
            Ok(stream) => return Ok(stream),
            Err(e) => e,
        };

        let launcher = match &self.launcher {
            Some(launcher) if is_not_listening(&error) => launcher,
            _ => {
                return Err(error).with_context(|| {
                    format!("Cannot connect to daemon at {}", self.socket_path.display())
                })
            }
        };

        debug!(error = %error, "daemon not running, starting it");
        if !launcher.launch(&self.socket_path).await? {
            warn!("daemon socket did not appear in time");
        }

        self.connect().await.with_context(|| {
            format!(
                "Cannot connect to daemon at {} after starting it",
                self.socket_path.display()
            )
        })
    }

    async fn connect(&self) -> std::io::Result<UnixStream> {
        timeout(
            Duration::from_secs(CONNECTION_TIMEOUT_SECS),
            UnixStream::connect(&self.socket_path),
        )
        .await
        .map_err(|_| std::io::Error::new(ErrorKind::TimedOut, "connection timed out"))?
    }
}

/// True if `error` means nobody is listening on the socket.
fn is_not_listening(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::NotFound | ErrorKind::ConnectionRefused
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UnixListener;

    // ------------------------------------------------------------------------
    // Helper functions
    // ------------------------------------------------------------------------

    fn create_temp_socket_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        (dir, path)
    }

    /// Accepts one connection, returns the received bytes and replies `reply`.
    fn spawn_mock_server(
        listener: UnixListener,
        reply: &'static str,
    ) -> tokio::task::JoinHandle<String> {
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = String::new();
            stream.read_to_string(&mut request).await.unwrap();
            stream.write_all(reply.as_bytes()).await.unwrap();
            request
        })
    }

    // ------------------------------------------------------------------------
    // IpcClient Tests
    // ------------------------------------------------------------------------

    mod client_tests {
        use super::*;
        use crate::types::IntervalPlan;

        #[test]
        fn test_with_socket_path() {
            let path = PathBuf::from("/tmp/test.sock");
            let client = IpcClient::with_socket_path(path.clone());
            assert_eq!(client.socket_path(), path.as_path());
        }

        #[test]
        fn test_not_listening_kinds() {
            assert!(is_not_listening(&ErrorKind::NotFound.into()));
            assert!(is_not_listening(&ErrorKind::ConnectionRefused.into()));
            assert!(!is_not_listening(&ErrorKind::PermissionDenied.into()));
        }

        #[tokio::test]
        async fn test_connection_failure() {
            let (_dir, socket_path) = create_temp_socket_path();
            let client = IpcClient::with_socket_path(socket_path);

            let err = client.send(&Command::Status).await.unwrap_err();
            assert!(err.to_string().contains("Cannot connect to daemon"));
        }

        #[tokio::test]
        async fn test_send_status() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let server = spawn_mock_server(listener, "IDLE\n");

            let client = IpcClient::with_socket_path(socket_path);
            let reply = client.send(&Command::Status).await.unwrap();

            assert_eq!(reply, "IDLE");
            assert_eq!(server.await.unwrap(), "status\n");
        }

        #[tokio::test]
        async fn test_send_start() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let server = spawn_mock_server(listener, "OK Started\n");

            let client = IpcClient::with_socket_path(socket_path);
            let command = Command::Start(IntervalPlan::new(20, 10, 8).unwrap());
            let reply = client.send(&command).await.unwrap();

            assert_eq!(reply, "OK Started");
            assert_eq!(server.await.unwrap(), "start 20 10 8\n");
        }

        #[tokio::test]
        async fn test_error_reply_is_returned() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let _server = spawn_mock_server(listener, "ERR Not running\n");

            let client = IpcClient::with_socket_path(socket_path);
            let reply = client.send(&Command::Stop).await.unwrap();

            assert_eq!(reply, "ERR Not running");
        }

        #[tokio::test]
        async fn test_empty_reply() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let _server = spawn_mock_server(listener, "");

            let client = IpcClient::with_socket_path(socket_path);
            let err = client.send(&Command::Status).await.unwrap_err();

            assert!(err.to_string().contains("No reply"));
        }

        #[tokio::test]
        async fn test_launch_failure_is_reported() {
            let (dir, socket_path) = create_temp_socket_path();
            let launcher = DaemonLauncher::new("/bin/true", dir.path().join("daemon.log"))
                .with_startup_timeout(Duration::from_millis(50));
            let client = IpcClient::with_socket_path(socket_path).with_launcher(launcher);

            let err = client.send(&Command::Status).await.unwrap_err();

            assert!(err.to_string().contains("after starting it"));
        }
    }
}
