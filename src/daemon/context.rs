//! Daemon state and command dispatch.
//!
//! `DaemonContext` is owned by the event loop and groups everything a request
//! or a tick may touch: the timer session, the announcer and the chain engine.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, error, warn};

use crate::sound::{ChainEngine, PcmDevice, SoundError};
use crate::types::{Command, Reply};

use super::announcer::Announcer;
use super::timer::TimerSession;

/// What the event loop should do after handling one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// Line to send back to the client
    pub reply: Reply,
    /// Clips to play once the client has its reply
    pub announcement: Vec<String>,
    /// The daemon should exit after replying
    pub shutdown: bool,
}

impl Dispatch {
    fn reply(reply: Reply) -> Self {
        Self {
            reply,
            announcement: Vec::new(),
            shutdown: false,
        }
    }
}

/// Everything the event loop mutates.
pub struct DaemonContext<D: PcmDevice, R = StdRng> {
    // Dropped first: closes the device, then frees the chain.
    engine: ChainEngine<D>,
    session: TimerSession,
    announcer: Announcer<R>,
}

impl<D: PcmDevice, R: Rng> DaemonContext<D, R> {
    pub fn new(engine: ChainEngine<D>, announcer: Announcer<R>) -> Self {
        Self {
            engine,
            session: TimerSession::new(),
            announcer,
        }
    }

    /// Parses and handles one raw command line.
    pub fn handle_line(&mut self, line: &str) -> Dispatch {
        match Command::parse(line) {
            Ok(command) => self.handle(command),
            Err(e) => {
                debug!(line, error = %e, "rejected command");
                Dispatch::reply(Reply::error(e))
            }
        }
    }

    /// Applies a parsed command to the session.
    pub fn handle(&mut self, command: Command) -> Dispatch {
        debug!(command = %command.to_line(), "handling command");
        match command {
            Command::Start(plan) => match self.session.start(plan) {
                Ok(announcement) => Dispatch {
                    reply: Reply::Started,
                    announcement: self.announcer.started(&announcement),
                    shutdown: false,
                },
                Err(e) => Dispatch::reply(Reply::error(e)),
            },
            Command::Stop => match self.session.stop() {
                Ok(()) => Dispatch::reply(Reply::Stopped),
                Err(e) => Dispatch::reply(Reply::error(e)),
            },
            Command::Status => Dispatch::reply(Reply::Status(self.session.status())),
            Command::Quit => Dispatch {
                reply: Reply::Bye,
                announcement: Vec::new(),
                shutdown: true,
            },
        }
    }

    /// Runs `ticks` session ticks in order, playing each tick's clips.
    pub fn advance(&mut self, ticks: u64) {
        if ticks > 1 {
            debug!(ticks, "catching up");
        }
        for _ in 0..ticks {
            let outcome = self.session.tick();
            let clips = self.announcer.for_tick(&outcome);
            if !clips.is_empty() {
                self.announce(&clips);
            }
        }
    }

    /// Queues `clips`, plays them as one stream, then empties the chain.
    ///
    /// Missing or broken clips are skipped.
    pub fn announce(&mut self, clips: &[String]) {
        for name in clips {
            match self.engine.add_by_name(name) {
                Ok(()) => {}
                // ambient clips are optional
                Err(SoundError::NotFound(_)) => debug!(clip = %name, "no such clip, skipping"),
                Err(e) => warn!(clip = %name, error = %e, "skipping clip"),
            }
        }
        if let Err(e) = self.engine.play() {
            error!(error = %e, "playback failed");
        }
        self.engine.reset();
    }

    pub fn session(&self) -> &TimerSession {
        &self.session
    }

    pub fn engine(&self) -> &ChainEngine<D> {
        &self.engine
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::{AudioChain, MemoryAssets, MockPcmDevice};
    use crate::types::{Phase, TimerStatus};
    use hound::{SampleFormat, WavSpec, WavWriter};
    use rand::SeedableRng;
    use std::io::Cursor;

    fn clip(frames: usize) -> Vec<u8> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..frames {
                writer.write_sample(1i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn context_with(
        assets: MemoryAssets,
        ambient_one_in: u32,
    ) -> (DaemonContext<MockPcmDevice>, MockPcmDevice) {
        let mock = MockPcmDevice::new();
        let engine = ChainEngine::new(mock.clone(), AudioChain::new(), Box::new(assets));
        let announcer = Announcer::with_rng(StdRng::seed_from_u64(1), ambient_one_in);
        (DaemonContext::new(engine, announcer), mock)
    }

    fn context() -> (DaemonContext<MockPcmDevice>, MockPcmDevice) {
        context_with(MemoryAssets::new(), 0)
    }

    // ------------------------------------------------------------------------
    // Dispatch Tests
    // ------------------------------------------------------------------------

    mod dispatch_tests {
        use super::*;

        #[test]
        fn test_start_replies_and_defers_announcement() {
            let (mut ctx, mock) = context();
            let dispatch = ctx.handle_line("start 20 10 2");

            assert_eq!(dispatch.reply, Reply::Started);
            assert_eq!(
                dispatch.announcement,
                ["round", "num1", "of", "num2", "workfor", "num0", "minutes"]
            );
            assert!(!dispatch.shutdown);
            assert!(mock.untouched());
        }

        #[test]
        fn test_start_twice() {
            let (mut ctx, _) = context();
            ctx.handle_line("start 20 10 2");

            let dispatch = ctx.handle_line("start 30 10 2");

            assert_eq!(dispatch.reply.to_string(), "ERR Timer already running");
            assert!(dispatch.announcement.is_empty());
            assert_eq!(ctx.session().plan().map(|p| p.work_seconds), Some(20));
        }

        #[test]
        fn test_invalid_start_leaves_session_idle() {
            let (mut ctx, _) = context();
            for line in ["start 0 10 2", "start 20 10", "start x y z"] {
                let dispatch = ctx.handle_line(line);
                assert_eq!(dispatch.reply.to_string(), "ERR Invalid start parameters");
            }
            assert!(!ctx.session().is_running());
        }

        #[test]
        fn test_stop() {
            let (mut ctx, _) = context();
            assert_eq!(ctx.handle_line("stop").reply.to_string(), "ERR Not running");

            ctx.handle_line("start 20 10 2");
            assert_eq!(ctx.handle_line("stop").reply, Reply::Stopped);
            assert_eq!(ctx.handle_line("status").reply.to_string(), "IDLE");
        }

        #[test]
        fn test_unknown_command() {
            let (mut ctx, _) = context();
            let dispatch = ctx.handle_line("pause");
            assert_eq!(dispatch.reply.to_string(), "ERR Unknown command");
            assert!(!dispatch.shutdown);
        }

        #[test]
        fn test_quit() {
            let (mut ctx, _) = context();
            let dispatch = ctx.handle_line("quit");
            assert_eq!(dispatch.reply.to_string(), "OK Bye");
            assert!(dispatch.shutdown);
        }
    }

    // ------------------------------------------------------------------------
    // Tick Tests
    // ------------------------------------------------------------------------

    mod advance_tests {
        use super::*;

        #[test]
        fn test_catch_up_matches_spaced_ticks() {
            let (mut batched, _) = context();
            let (mut spaced, _) = context();
            batched.handle_line("start 20 10 2");
            spaced.handle_line("start 20 10 2");

            batched.advance(25);
            for _ in 0..25 {
                spaced.advance(1);
            }

            assert_eq!(batched.session().status(), spaced.session().status());
            assert_eq!(
                batched.session().status(),
                TimerStatus::Running {
                    round: 1,
                    total_rounds: 2,
                    phase: Phase::Rest,
                    seconds_left: 5,
                }
            );
        }

        #[test]
        fn test_boundary_plays_one_stream() {
            let mut assets = MemoryAssets::new();
            for name in ["round", "num1", "of", "num2", "restfor", "num0", "minutes"] {
                assets.insert(name, clip(10));
            }
            let (mut ctx, mock) = context_with(assets, 0);
            ctx.handle_line("start 2 10 2");

            ctx.advance(1);
            assert!(mock.untouched());

            ctx.advance(1);
            let log = mock.log();
            assert_eq!(log.written.len(), 70);
            assert_eq!(log.drains, 1);
            assert!(ctx.engine().chain().is_empty());
        }

        #[test]
        fn test_missing_clips_are_skipped() {
            let assets = MemoryAssets::new().with("done", clip(5));
            let (mut ctx, mock) = context_with(assets, 0);
            ctx.handle_line("start 1 1 1");

            ctx.advance(2);

            assert_eq!(mock.log().written.len(), 5);
            assert!(!ctx.session().is_running());
        }

        #[test]
        fn test_playback_failure_keeps_daemon_running() {
            let assets = MemoryAssets::new().with("done", clip(5));
            let (mut ctx, mock) = context_with(assets, 0);
            mock.set_never_ready(true);
            ctx.handle_line("start 1 1 1");

            ctx.advance(2);

            assert!(ctx.engine().chain().is_empty());
            assert_eq!(ctx.handle_line("status").reply.to_string(), "IDLE");
        }

        #[test]
        fn test_idle_ticks_are_silent() {
            let (mut ctx, mock) = context_with(MemoryAssets::new(), 1);
            ctx.advance(100);
            assert!(mock.untouched());
        }

        #[test]
        fn test_countdown_ticks_never_play_ambient() {
            let mut assets = MemoryAssets::new();
            for n in 1..=100 {
                assets.insert(format!("message{n:03}"), clip(3));
            }
            let (mut ctx, mock) = context_with(assets, 1);
            ctx.handle_line("start 600 60 1");

            ctx.advance(60);

            assert!(mock.untouched());
            assert!(ctx.session().is_running());
        }
    }
}
