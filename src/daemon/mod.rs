//! Daemon module for the Tabata timer.
//!
//! This module contains the core daemon functionality:
//! - `timer`: session state machine with one-second ticks
//! - `announcer`: announcement → voice clip rendering
//! - `clock`: drift-free tick clock with catch-up
//! - `ipc`: Unix socket server for the line protocol
//! - `context`: command dispatch over the daemon's state
//! - `event_loop`: the reactor tying it all together

pub mod announcer;
pub mod clock;
pub mod context;
pub mod event_loop;
pub mod ipc;
pub mod timer;

pub use announcer::{phrase, Announcer};
pub use clock::TickClock;
pub use context::{DaemonContext, Dispatch};
pub use event_loop::{run, serve, shutdown_signal, voice_assets};
pub use ipc::{IpcError, IpcServer};
pub use timer::{Announcement, SessionError, TickOutcome, TimerSession};
