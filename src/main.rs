//! Tabata timer CLI
//!
//! Interval training timer with spoken announcements:
//! - `tabata start <work> <rest> <rounds>` starts a session
//! - `tabata status` / `stop` / `quit` control the background daemon
//! - `tabata check-audio [clip]` plays one clip locally
//! - the daemon is started on demand and talks through the default audio output

use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use tabata::cli::{Cli, Commands, Display, IpcClient};
use tabata::config::TabataConfig;
use tabata::daemon;
use tabata::sound::{AudioChain, ChainEngine, RodioPcmDevice};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // help and version go to stdout and are not failures
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(&cli);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            Display::show_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let is_daemon = matches!(cli.command, Commands::Daemon(_));
    let default_level = match (cli.verbose, is_daemon) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal());

    // the daemon log is read later, so keep timestamps there
    if is_daemon {
        builder.init();
    } else {
        builder.without_time().init();
    }
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let mut config = TabataConfig::load()?;

    match &cli.command {
        Commands::Daemon(args) => {
            if let Some(socket) = &args.socket {
                config.socket_path = socket.clone();
            }
            config.mute |= args.mute;
            return daemon::run(&config).await;
        }
        Commands::CheckAudio(args) => return check_audio(&config, &args.clip),
        _ => {}
    }

    if let Some(command) = cli.command.to_command() {
        let client = IpcClient::new(&config)?;
        let reply = client.send(&command).await?;
        Display::show_reply(&reply);
    }

    Ok(())
}

/// Plays one clip on the local output device.
fn check_audio(config: &TabataConfig, clip: &str) -> Result<()> {
    let device = RodioPcmDevice::open_default().context("Failed to open audio output")?;
    let mut engine = ChainEngine::new(
        device,
        AudioChain::new(),
        Box::new(daemon::voice_assets(config)),
    )
    .with_ready_timeout(config.device_timeout());

    engine
        .play_clip(clip)
        .with_context(|| format!("Failed to play clip: {clip}"))?;
    Display::show_reply(&format!("OK Played {clip}"));
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
