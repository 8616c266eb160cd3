//! Rendering announcements as voice clip names.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::timer::{Announcement, TickOutcome};

/// Number of ambient clips, `message001` through `message100`.
pub const AMBIENT_POOL_SIZE: u32 = 100;

/// Default odds of an ambient clip: one in this many.
pub const DEFAULT_AMBIENT_ONE_IN: u32 = 20;

/// Clip names spelling out `announcement`, in playback order.
pub fn phrase(announcement: &Announcement) -> Vec<String> {
    match *announcement {
        Announcement::PhaseStart {
            round,
            total_rounds,
            minutes,
            phase,
        } => vec![
            "round".to_string(),
            number(round),
            "of".to_string(),
            number(total_rounds),
            if phase.is_work() { "workfor" } else { "restfor" }.to_string(),
            number(minutes),
            "minutes".to_string(),
        ],
        Announcement::TimeRemaining { minutes, phase } => vec![
            "youhave".to_string(),
            number(minutes),
            "minutesleft".to_string(),
            if phase.is_work() { "towork" } else { "torest" }.to_string(),
        ],
        Announcement::Complete => vec!["done".to_string()],
    }
}

fn number(n: u32) -> String {
    format!("num{n}")
}

/// Turns session events into clip batches, mixing in ambient clips at random.
#[derive(Debug)]
pub struct Announcer<R = StdRng> {
    rng: R,
    /// 0 disables ambient clips
    ambient_one_in: u32,
}

impl Announcer<StdRng> {
    /// Creates an announcer seeded from system entropy.
    pub fn new(ambient_one_in: u32) -> Self {
        Self::with_rng(StdRng::from_entropy(), ambient_one_in)
    }
}

impl<R: Rng> Announcer<R> {
    pub fn with_rng(rng: R, ambient_one_in: u32) -> Self {
        Self {
            rng,
            ambient_one_in,
        }
    }

    /// Clips for a session start.
    pub fn started(&mut self, announcement: &Announcement) -> Vec<String> {
        let mut clips = phrase(announcement);
        self.maybe_ambient(&mut clips);
        clips
    }

    /// Clips for one tick; empty when nothing should be played.
    ///
    /// An ambient clip is only ever appended to a reminder or a phase start.
    pub fn for_tick(&mut self, outcome: &TickOutcome) -> Vec<String> {
        let announcement = match outcome {
            TickOutcome::Idle | TickOutcome::Counted { cue: None } => return Vec::new(),
            TickOutcome::Boundary(Announcement::Complete) => {
                return phrase(&Announcement::Complete);
            }
            TickOutcome::Counted {
                cue: Some(announcement),
            }
            | TickOutcome::Boundary(announcement) => announcement,
        };
        let mut clips = phrase(announcement);
        self.maybe_ambient(&mut clips);
        clips
    }

    fn maybe_ambient(&mut self, clips: &mut Vec<String>) {
        if self.ambient_one_in == 0 || !self.rng.gen_ratio(1, self.ambient_one_in) {
            return;
        }
        let n = self.rng.gen_range(1..=AMBIENT_POOL_SIZE);
        clips.push(format!("message{n:03}"));
    }
}
