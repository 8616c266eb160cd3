//! Core data types for the Tabata timer.
//!
//! This module defines the data structures used for:
//! - Interval plans with validation
//! - Timer phases and status snapshots
//! - The line-based IPC command and reply vocabulary

use std::fmt;

use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Maximum length of a single command line in bytes.
pub const MAX_COMMAND_LEN: usize = 256;

// ============================================================================
// Phase
// ============================================================================

/// Sub-state of a running round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Work interval
    Work,
    /// Rest interval
    Rest,
}

impl Phase {
    /// Returns the protocol representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Work => "WORK",
            Phase::Rest => "REST",
        }
    }

    /// Returns true for the work interval.
    pub fn is_work(&self) -> bool {
        matches!(self, Phase::Work)
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Work
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// IntervalPlan
// ============================================================================

/// Work/rest/round lengths for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPlan {
    /// Work interval length in seconds
    pub work_seconds: u32,
    /// Rest interval length in seconds
    pub rest_seconds: u32,
    /// Number of work/rest rounds
    pub rounds: u32,
}

impl Default for IntervalPlan {
    /// The classic protocol: 20s work, 10s rest, 8 rounds.
    fn default() -> Self {
        Self {
            work_seconds: 20,
            rest_seconds: 10,
            rounds: 8,
        }
    }
}

impl IntervalPlan {
    /// Creates a validated plan.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidStartParameters` if any value is zero.
    pub fn new(work_seconds: u32, rest_seconds: u32, rounds: u32) -> Result<Self, ProtocolError> {
        let plan = Self {
            work_seconds,
            rest_seconds,
            rounds,
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Checks that every length is positive.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.work_seconds == 0 || self.rest_seconds == 0 || self.rounds == 0 {
            return Err(ProtocolError::InvalidStartParameters);
        }
        Ok(())
    }

    /// Total session length in seconds.
    pub fn total_seconds(&self) -> u64 {
        (u64::from(self.work_seconds) + u64::from(self.rest_seconds)) * u64::from(self.rounds)
    }
}

// ============================================================================
// TimerStatus
// ============================================================================

/// Externally visible timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    /// No session is running
    Idle,
    /// A session is counting down
    Running {
        /// 1-based round number
        round: u32,
        /// Total rounds in the session
        total_rounds: u32,
        /// Current phase
        phase: Phase,
        /// Seconds left in the current phase
        seconds_left: u32,
    },
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerStatus::Idle => f.write_str("IDLE"),
            TimerStatus::Running {
                round,
                total_rounds,
                phase,
                seconds_left,
            } => write!(
                f,
                "RUNNING round {}/{} {} {} sec left",
                round, total_rounds, phase, seconds_left
            ),
        }
    }
}

// ============================================================================
// IPC Types
// ============================================================================

/// Errors produced while parsing a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// `start` without exactly three positive integers
    #[error("Invalid start parameters")]
    InvalidStartParameters,

    /// Anything that is not a recognised command
    #[error("Unknown command")]
    UnknownCommand,
}

/// A command sent from the client to the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start a new session
    Start(IntervalPlan),
    /// Stop the running session
    Stop,
    /// Query the current status
    Status,
    /// Terminate the daemon
    Quit,
}

impl Command {
    /// Parses a single command line (without its terminator).
    ///
    /// # Errors
    ///
    /// Returns a `ProtocolError` describing why the line was rejected.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().ok_or(ProtocolError::UnknownCommand)?;
        let rest: Vec<&str> = tokens.collect();

        match keyword {
            "start" => {
                let [work, rest_secs, rounds] = rest.as_slice() else {
                    return Err(ProtocolError::InvalidStartParameters);
                };
                let parse = |s: &str| {
                    s.parse::<u32>()
                        .map_err(|_| ProtocolError::InvalidStartParameters)
                };
                IntervalPlan::new(parse(*work)?, parse(*rest_secs)?, parse(*rounds)?)
                    .map(Command::Start)
            }
            "stop" if rest.is_empty() => Ok(Command::Stop),
            "status" if rest.is_empty() => Ok(Command::Status),
            "quit" if rest.is_empty() => Ok(Command::Quit),
            _ => Err(ProtocolError::UnknownCommand),
        }
    }

    /// Returns the wire representation (without terminator).
    pub fn to_line(&self) -> String {
        match self {
            Command::Start(plan) => format!(
                "start {} {} {}",
                plan.work_seconds, plan.rest_seconds, plan.rounds
            ),
            Command::Stop => "stop".to_string(),
            Command::Status => "status".to_string(),
            Command::Quit => "quit".to_string(),
        }
    }
}

/// A reply sent from the daemon to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Session started
    Started,
    /// Session stopped
    Stopped,
    /// Daemon is exiting
    Bye,
    /// Status snapshot
    Status(TimerStatus),
    /// Command rejected
    Error(String),
}

impl Reply {
    /// Creates an error reply from any displayable error.
    pub fn error(err: impl fmt::Display) -> Self {
        Reply::Error(err.to_string())
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Started => f.write_str("OK Started"),
            Reply::Stopped => f.write_str("OK Stopped"),
            Reply::Bye => f.write_str("OK Bye"),
            Reply::Status(status) => status.fmt(f),
            Reply::Error(message) => write!(f, "ERR {}", message),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Phase Tests
    // ------------------------------------------------------------------------

    mod phase_tests {
        use super::*;

        #[test]
        fn test_default_is_work() {
            assert_eq!(Phase::default(), Phase::Work);
        }

        #[test]
        fn test_as_str() {
            assert_eq!(Phase::Work.as_str(), "WORK");
            assert_eq!(Phase::Rest.as_str(), "REST");
        }

        #[test]
        fn test_is_work() {
            assert!(Phase::Work.is_work());
            assert!(!Phase::Rest.is_work());
        }
    }

    // ------------------------------------------------------------------------
    // IntervalPlan Tests
    // ------------------------------------------------------------------------

    mod interval_plan_tests {
        use super::*;

        #[test]
        fn test_default_is_classic_tabata() {
            let plan = IntervalPlan::default();
            assert_eq!(plan.work_seconds, 20);
            assert_eq!(plan.rest_seconds, 10);
            assert_eq!(plan.rounds, 8);
            assert_eq!(plan.total_seconds(), 240);
        }

        #[test]
        fn test_zero_values_rejected() {
            assert!(IntervalPlan::new(0, 10, 8).is_err());
            assert!(IntervalPlan::new(20, 0, 8).is_err());
            assert!(IntervalPlan::new(20, 10, 0).is_err());
            assert!(IntervalPlan::new(1, 1, 1).is_ok());
        }
    }

    // ------------------------------------------------------------------------
    // Command Tests
    // ------------------------------------------------------------------------

    mod command_tests {
        use super::*;

        #[test]
        fn test_parse_start() {
            let cmd = Command::parse("start 20 10 8").unwrap();
            assert_eq!(cmd, Command::Start(IntervalPlan::new(20, 10, 8).unwrap()));
        }

        #[test]
        fn test_parse_start_extra_whitespace() {
            let cmd = Command::parse("  start   300  60 3 ").unwrap();
            assert_eq!(cmd, Command::Start(IntervalPlan::new(300, 60, 3).unwrap()));
        }

        #[test]
        fn test_parse_start_invalid() {
            for line in [
                "start",
                "start 20 10",
                "start 20 10 8 1",
                "start a b c",
                "start -5 10 2",
                "start 0 10 2",
                "start 20 10 99999999999",
            ] {
                assert_eq!(
                    Command::parse(line),
                    Err(ProtocolError::InvalidStartParameters),
                    "line: {:?}",
                    line
                );
            }
        }

        #[test]
        fn test_parse_simple_commands() {
            assert_eq!(Command::parse("stop"), Ok(Command::Stop));
            assert_eq!(Command::parse("status"), Ok(Command::Status));
            assert_eq!(Command::parse("quit"), Ok(Command::Quit));
        }

        #[test]
        fn test_parse_unknown() {
            for line in ["", "   ", "pause", "STOP", "stop now", "startx 1 2 3"] {
                assert_eq!(
                    Command::parse(line),
                    Err(ProtocolError::UnknownCommand),
                    "line: {:?}",
                    line
                );
            }
        }

        #[test]
        fn test_to_line_parses_back() {
            let cmd = Command::Start(IntervalPlan::new(45, 15, 4).unwrap());
            assert_eq!(cmd.to_line(), "start 45 15 4");
            assert_eq!(Command::parse(&cmd.to_line()), Ok(cmd));
        }
    }

    // ------------------------------------------------------------------------
    // Reply Tests
    // ------------------------------------------------------------------------

    mod reply_tests {
        use super::*;

        #[test]
        fn test_reply_lines() {
            assert_eq!(Reply::Started.to_string(), "OK Started");
            assert_eq!(Reply::Stopped.to_string(), "OK Stopped");
            assert_eq!(Reply::Bye.to_string(), "OK Bye");
            assert_eq!(Reply::Status(TimerStatus::Idle).to_string(), "IDLE");
        }

        #[test]
        fn test_running_status_line() {
            let status = TimerStatus::Running {
                round: 1,
                total_rounds: 2,
                phase: Phase::Rest,
                seconds_left: 10,
            };
            assert_eq!(
                Reply::Status(status).to_string(),
                "RUNNING round 1/2 REST 10 sec left"
            );
        }

        #[test]
        fn test_error_reply() {
            let reply = Reply::error(ProtocolError::UnknownCommand);
            assert!(matches!(reply, Reply::Error(_)));
            assert_eq!(reply.to_string(), "ERR Unknown command");
        }
    }
}
