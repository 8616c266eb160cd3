//! Timer state machine for the Tabata timer.
//!
//! This module provides the session logic only:
//! - State transitions (Idle → Work → Rest → … → Idle)
//! - One-second countdown via `tick()`
//! - Announcements describing what should be spoken
//!
//! Timekeeping lives in `clock` and rendering in `announcer`; the session
//! never touches the clock or the audio device itself.

use thiserror::Error;
use tracing::info;

use crate::types::{IntervalPlan, Phase, TimerStatus};

/// A time-remaining reminder is due whenever this many seconds are left.
pub const REMINDER_INTERVAL_SECS: u32 = 300;

// ============================================================================
// Announcement
// ============================================================================

/// Something the daemon should say out loud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement {
    /// A work or rest interval begins
    PhaseStart {
        /// 1-based round number
        round: u32,
        /// Total rounds in the session
        total_rounds: u32,
        /// Whole minutes in the new interval
        minutes: u32,
        /// The interval that begins
        phase: Phase,
    },
    /// Periodic reminder of the time left in the current interval
    TimeRemaining {
        /// Whole minutes left
        minutes: u32,
        /// Current phase
        phase: Phase,
    },
    /// The last rest interval finished
    Complete,
}

/// Result of a single `tick()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No session was running
    Idle,
    /// The countdown moved without finishing the interval
    Counted {
        /// A reminder that is due at this second
        cue: Option<Announcement>,
    },
    /// An interval finished
    Boundary(Announcement),
}

// ============================================================================
// SessionError
// ============================================================================

/// Rejected session commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Timer already running")]
    AlreadyRunning,

    #[error("Not running")]
    NotRunning,
}

// ============================================================================
// TimerSession
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveSession {
    plan: IntervalPlan,
    /// 0-based
    current_round: u32,
    phase: Phase,
    seconds_remaining: u32,
}

/// The daemon's single timer session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerSession {
    active: Option<ActiveSession>,
}

impl TimerSession {
    /// Creates an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session with `plan` and returns the opening announcement.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyRunning` if a session is running; the
    /// running session is left untouched.
    pub fn start(&mut self, plan: IntervalPlan) -> Result<Announcement, SessionError> {
        if self.active.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        self.active = Some(ActiveSession {
            plan,
            current_round: 0,
            phase: Phase::Work,
            seconds_remaining: plan.work_seconds,
        });
        info!(
            work = plan.work_seconds,
            rest = plan.rest_seconds,
            rounds = plan.rounds,
            "session started"
        );

        Ok(Announcement::PhaseStart {
            round: 1,
            total_rounds: plan.rounds,
            minutes: plan.work_seconds / 60,
            phase: Phase::Work,
        })
    }

    /// Stops the running session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotRunning` if the session is idle.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        self.active.take().ok_or(SessionError::NotRunning)?;
        info!("session stopped");
        Ok(())
    }

    /// Returns the current status snapshot.
    pub fn status(&self) -> TimerStatus {
        match self.active {
            None => TimerStatus::Idle,
            Some(active) => TimerStatus::Running {
                round: active.current_round + 1,
                total_rounds: active.plan.rounds,
                phase: active.phase,
                seconds_left: active.seconds_remaining,
            },
        }
    }

    /// Returns true while a session is counting down.
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Plan of the running session.
    pub fn plan(&self) -> Option<IntervalPlan> {
        self.active.map(|active| active.plan)
    }

    /// Advances the countdown by one second.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(active) = self.active.as_mut() else {
            return TickOutcome::Idle;
        };

        active.seconds_remaining = active.seconds_remaining.saturating_sub(1);
        if active.seconds_remaining > 0 {
            let cue = (active.seconds_remaining % REMINDER_INTERVAL_SECS == 0).then(|| {
                Announcement::TimeRemaining {
                    minutes: active.seconds_remaining / 60,
                    phase: active.phase,
                }
            });
            return TickOutcome::Counted { cue };
        }

        let plan = active.plan;
        match active.phase {
            Phase::Work => {
                active.phase = Phase::Rest;
                active.seconds_remaining = plan.rest_seconds;
                TickOutcome::Boundary(Announcement::PhaseStart {
                    round: active.current_round + 1,
                    total_rounds: plan.rounds,
                    minutes: plan.rest_seconds / 60,
                    phase: Phase::Rest,
                })
            }
            Phase::Rest => {
                active.current_round += 1;
                if active.current_round >= plan.rounds {
                    self.active = None;
                    info!("session complete");
                    return TickOutcome::Boundary(Announcement::Complete);
                }

                active.phase = Phase::Work;
                active.seconds_remaining = plan.work_seconds;
                TickOutcome::Boundary(Announcement::PhaseStart {
                    round: active.current_round + 1,
                    total_rounds: plan.rounds,
                    minutes: plan.work_seconds / 60,
                    phase: Phase::Work,
                })
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
