//! Background daemon spawning.
//!
//! When the client finds no daemon it re-executes its own binary with the
//! hidden `daemon` subcommand, fully detached from the terminal: new session
//! without a controlling terminal, no stdin/stdout, stderr appended to the
//! daemon log file.

use std::fs::OpenOptions;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::config::TabataConfig;

/// How long to wait for a freshly spawned daemon to create its socket.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(1);

/// Interval between socket existence checks.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Spawns the daemon process.
#[derive(Debug, Clone)]
pub struct DaemonLauncher {
    program: PathBuf,
    log_file: PathBuf,
    startup_timeout: Duration,
    /// Start the daemon with `--mute`
    mute: bool,
}

impl DaemonLauncher {
    pub fn new(program: impl Into<PathBuf>, log_file: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            log_file: log_file.into(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            mute: false,
        }
    }

    /// A launcher re-executing the running binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the path of the running executable is unknown.
    pub fn current(config: &TabataConfig) -> Result<Self> {
        let program = std::env::current_exe().context("Cannot locate the tabata executable")?;
        Ok(Self::new(program, &config.log_file).with_mute(config.mute))
    }

    /// Sets how long `launch` waits for the socket to appear.
    #[must_use]
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Starts the daemon without an output device.
    #[must_use]
    pub fn with_mute(mut self, mute: bool) -> Self {
        self.mute = mute;
        self
    }

    /// Starts a detached daemon for `socket_path` and waits for its socket.
    ///
    /// Returns whether the socket appeared within the startup timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be opened or the process
    /// cannot be spawned.
    pub async fn launch(&self, socket_path: &Path) -> Result<bool> {
        // a leftover socket file would make the wait below succeed at once
        match std::fs::remove_file(socket_path) {
            Ok(()) => debug!(path = %socket_path.display(), "removed stale socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to remove stale socket: {}", socket_path.display())
                })
            }
        }

        self.spawn(socket_path)?;
        Ok(self.wait_for_socket(socket_path).await)
    }

    fn spawn(&self, socket_path: &Path) -> Result<()> {
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .with_context(|| format!("Failed to open daemon log: {}", self.log_file.display()))?;

        let mut command = Command::new(&self.program);
        command
            .arg("daemon")
            .arg("--socket")
            .arg(socket_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log));
        if self.mute {
            command.arg("--mute");
        }
        // SAFETY: setsid is async-signal-safe and touches no parent state.
        unsafe {
            command.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = command
            .spawn()
            .with_context(|| format!("Failed to start daemon: {}", self.program.display()))?;

        info!(pid = child.id(), log = %self.log_file.display(), "daemon spawned");
        Ok(())
    }

    async fn wait_for_socket(&self, socket_path: &Path) -> bool {
        let deadline = Instant::now() + self.startup_timeout;
        loop {
            if socket_path.exists() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}
