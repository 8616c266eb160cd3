//! CLI module for the Tabata timer.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `client`: IPC client for daemon communication
//! - `launcher`: Starting the daemon in the background
//! - `display`: Output formatting and display logic

pub mod client;
pub mod commands;
pub mod display;
pub mod launcher;

pub use client::IpcClient;
pub use commands::{CheckAudioArgs, Cli, Commands, DaemonArgs, StartArgs};
pub use display::Display;
pub use launcher::DaemonLauncher;
