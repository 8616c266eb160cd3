//! Tabata Timer Library
//!
//! This library provides the core functionality for the Tabata timer CLI.
//! It includes:
//! - Timer session state machine and drift-free tick clock
//! - IPC server/client for the daemon's line protocol
//! - Audio chain engine for gapless voice announcements, with bundled clips
//! - CLI command parsing, daemon auto-start and display utilities
//! - Configuration loading

pub mod cli;
pub mod config;
pub mod daemon;
pub mod sound;
pub mod types;

// Re-export commonly used types for convenience
pub use config::TabataConfig;
pub use types::{Command, IntervalPlan, Phase, ProtocolError, Reply, TimerStatus};

// Re-export sound types
pub use sound::{
    AssetStore, AudioChain, ChainEngine, DeviceError, DirectoryAssets, EmbeddedAssets,
    FallbackAssets, MemoryAssets, MockPcmDevice, NullPcmDevice, PcmDevice, RodioPcmDevice,
    SoundError,
};

// Re-export daemon types
pub use daemon::{DaemonContext, IpcServer, TimerSession};
