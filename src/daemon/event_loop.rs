//! The daemon's single-threaded reactor.
//!
//! One `select!` multiplexes the tick clock, the listening socket and the
//! termination signals. Everything else (command handling, session ticks and
//! audio playback) runs inline on this task.

use std::future::Future;

use anyhow::{Context, Result};
use rand::Rng;
use tokio::net::UnixStream;
use tracing::{debug, info, warn};

use crate::config::TabataConfig;
use crate::sound::{
    AudioChain, ChainEngine, DirectoryAssets, EmbeddedAssets, FallbackAssets, NullPcmDevice,
    PcmDevice, RodioPcmDevice,
};

use super::announcer::Announcer;
use super::clock::{TickClock, TICK_PERIOD};
use super::context::DaemonContext;
use super::ipc::IpcServer;

/// Runs the daemon until `quit` or a termination signal.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound or no output device is
/// available.
pub async fn run(config: &TabataConfig) -> Result<()> {
    let server = IpcServer::new(&config.socket_path).context("Failed to start IPC server")?;

    if config.mute {
        info!("audio output muted");
        run_with(config, server, NullPcmDevice::new()).await;
    } else {
        let device = RodioPcmDevice::open_default().context("Failed to open audio output")?;
        run_with(config, server, device).await;
    }
    Ok(())
}

/// Builds the daemon state around `device` and serves until shutdown.
async fn run_with<D: PcmDevice>(config: &TabataConfig, server: IpcServer, device: D) {
    let context = DaemonContext::new(
        ChainEngine::new(device, AudioChain::new(), Box::new(voice_assets(config)))
            .with_ready_timeout(config.device_timeout()),
        Announcer::new(config.ambient_one_in),
    );

    info!(
        socket = %config.socket_path.display(),
        voice_dir = %config.voice_dir.display(),
        "daemon started"
    );

    let clock = TickClock::start(TICK_PERIOD);
    serve(server, context, clock, shutdown_signal()).await;

    info!("daemon stopped");
}

/// Clips from the voice directory, falling back to the bundled set.
pub fn voice_assets(config: &TabataConfig) -> FallbackAssets<DirectoryAssets, EmbeddedAssets> {
    FallbackAssets::new(DirectoryAssets::new(&config.voice_dir), EmbeddedAssets)
}

/// Serves requests and ticks until `quit` or until `shutdown` resolves.
///
/// On return the context is dropped before the server, so the audio device
/// is closed before the socket file disappears.
pub async fn serve<D, R, F>(
    server: IpcServer,
    mut context: DaemonContext<D, R>,
    mut clock: TickClock,
    shutdown: F,
) where
    D: PcmDevice,
    R: Rng,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            expirations = clock.wait() => context.advance(expirations),
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    if handle_connection(stream, &mut context).await {
                        info!("quit requested");
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "failed to accept connection"),
            },
            () = &mut shutdown => {
                info!("termination signal received");
                break;
            }
        }
    }

    debug!(ticks = clock.consumed(), "event loop finished");
    drop(context);
    drop(server);
}

/// Handles one connection; returns true if the daemon should exit.
async fn handle_connection<D: PcmDevice, R: Rng>(
    mut stream: UnixStream,
    context: &mut DaemonContext<D, R>,
) -> bool {
    let line = match IpcServer::receive_command(&mut stream).await {
        Ok(line) => line,
        Err(e) => {
            debug!(error = %e, "dropping connection");
            return false;
        }
    };

    let dispatch = context.handle_line(&line);
    if let Err(e) = IpcServer::send_reply(&mut stream, &dispatch.reply).await {
        warn!(error = %e, "failed to send reply");
    }
    drop(stream);

    if !dispatch.announcement.is_empty() {
        context.announce(&dispatch.announcement);
    }
    dispatch.shutdown
}

/// Resolves on SIGINT, SIGTERM or SIGHUP.
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };
    let other = |kind: SignalKind, name: &'static str| async move {
        match signal(kind) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, signal = name, "cannot listen for signal");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = interrupt => {}
        () = other(SignalKind::terminate(), "SIGTERM") => {}
        () = other(SignalKind::hangup(), "SIGHUP") => {}
    }
}
