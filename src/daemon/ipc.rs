//! IPC server for the Tabata timer.
//!
//! This module provides the Unix Domain Socket side of the line protocol:
//! - Listener bound to the daemon socket (removed again on drop)
//! - Reading one bounded command line per connection
//! - Writing one reply line

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::types::{Reply, MAX_COMMAND_LEN};

// ============================================================================
// Constants
// ============================================================================

/// Default socket path
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/tabata_timer.sock";

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Socket binding error
    #[error("Failed to bind socket {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Read error
    #[error("Failed to read command: {0}")]
    Read(#[source] std::io::Error),

    /// Write error
    #[error("Failed to write reply: {0}")]
    Write(#[source] std::io::Error),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Peer closed the connection without sending anything
    #[error("Connection closed by peer")]
    ConnectionClosed,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
#[derive(Debug)]
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// A stale socket file at the path is removed first.
    ///
    /// # Errors
    ///
    /// Returns `IpcError::Bind` if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self, IpcError> {
        let bind_error = |source| IpcError::Bind {
            path: socket_path.to_path_buf(),
            source,
        };

        match std::fs::remove_file(socket_path) {
            Ok(()) => debug!(path = %socket_path.display(), "removed stale socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(bind_error(e)),
        }

        if let Some(parent) = socket_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(bind_error)?;
        }

        let listener = UnixListener::bind(socket_path).map_err(bind_error)?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> std::io::Result<UnixStream> {
        let (stream, _addr) = self.listener.accept().await?;
        Ok(stream)
    }

    /// Reads one command line from the stream.
    ///
    /// At most `MAX_COMMAND_LEN` bytes are read; the line ends at the first
    /// `\r` or `\n`, or at end of input.
    ///
    /// # Errors
    ///
    /// Returns `IpcError::Timeout` if nothing complete arrives within the read
    /// timeout, `IpcError::ConnectionClosed` if the peer sent nothing.
    pub async fn receive_command(stream: &mut UnixStream) -> Result<String, IpcError> {
        let mut reader = BufReader::new(stream.take(MAX_COMMAND_LEN as u64));
        let mut buffer = Vec::with_capacity(MAX_COMMAND_LEN);

        let n = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            reader.read_until(b'\n', &mut buffer),
        )
        .await
        .map_err(|_| IpcError::Timeout)?
        .map_err(IpcError::Read)?;

        if n == 0 {
            return Err(IpcError::ConnectionClosed);
        }

        let end = buffer
            .iter()
            .position(|&b| b == b'\r' || b == b'\n')
            .unwrap_or(buffer.len());
        Ok(String::from_utf8_lossy(&buffer[..end]).into_owned())
    }

    /// Sends one reply line.
    ///
    /// # Errors
    ///
    /// Returns `IpcError::Write` if writing fails.
    pub async fn send_reply(stream: &mut UnixStream, reply: &Reply) -> Result<(), IpcError> {
        let line = format!("{reply}\n");
        stream
            .write_all(line.as_bytes())
            .await
            .map_err(IpcError::Write)?;
        stream.flush().await.map_err(IpcError::Write)?;
        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        // Clean up socket file on drop
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// Tests
// ============================================================================
