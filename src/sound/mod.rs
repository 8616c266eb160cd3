//! Sound playback system for the Tabata timer.
//!
//! Announcements are built from short pre-recorded voice clips which are
//! decoded, concatenated into a single chain and streamed to the output
//! device as one gapless stream.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │   ChainEngine    │────▶│    AssetStore    │  name → WAV bytes
//! │ add / play /     │     └──────────────────┘
//! │ reset            │     ┌──────────────────┐
//! │                  │────▶│   decode_wav     │  WAV → i16 PCM
//! │                  │     └──────────────────┘
//! │  ┌────────────┐  │     ┌──────────────────┐
//! │  │ AudioChain │──┼────▶│    PcmDevice     │  period-sized writes
//! │  └────────────┘  │     └──────────────────┘
//! └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use tabata::sound::{
//!     AudioChain, ChainEngine, DirectoryAssets, EmbeddedAssets, FallbackAssets, RodioPcmDevice,
//! };
//!
//! let device = RodioPcmDevice::open_default().expect("audio device");
//! let assets = FallbackAssets::new(DirectoryAssets::new("/usr/share/tabata/voice"), EmbeddedAssets);
//! let mut engine = ChainEngine::new(device, AudioChain::new(), Box::new(assets));
//!
//! engine.add_by_name("round").expect("clip");
//! engine.add_by_name("num1").expect("clip");
//! engine.play().expect("playback");
//! engine.reset();
//! ```

mod chain;
mod decoder;
mod device;
mod embedded;
mod error;
mod player;
mod source;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use chain::{AudioChain, MIN_CAPACITY_FRAMES};
pub use decoder::{decode_wav, AudioSegment, PcmFormat};
pub use device::{NullPcmDevice, RodioPcmDevice};
pub use embedded::{get_embedded_clip, EmbeddedAssets, EMBEDDED_CLIPS};
pub use error::{DeviceError, SoundError};
pub use player::{ChainEngine, DEFAULT_READY_TIMEOUT, MAX_STALLED_ATTEMPTS};
pub use source::{AssetStore, DirectoryAssets, FallbackAssets, MemoryAssets};

/// Periods per device buffer.
pub const BUFFER_PERIODS: usize = 4;

// ============================================================================
// HwParams
// ============================================================================

/// Negotiated device geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwParams {
    /// Frames per write period
    pub period_frames: usize,
    /// Frames the device buffers ahead
    pub buffer_frames: usize,
}

impl HwParams {
    /// Derives roughly 10 ms periods and a four-period buffer for `format`.
    pub fn for_format(format: PcmFormat) -> Self {
        let period_frames = (format.sample_rate as usize / 100).max(1);
        Self {
            period_frames,
            buffer_frames: period_frames * BUFFER_PERIODS,
        }
    }
}

// ============================================================================
// PcmDevice
// ============================================================================

/// A blocking PCM output sink.
///
/// Opening is done by the implementation's constructor and closing by `Drop`.
pub trait PcmDevice {
    /// Applies a new format; the device is left ready for writing.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Configure` if the format is rejected.
    fn configure(&mut self, format: PcmFormat) -> Result<HwParams, DeviceError>;

    /// Re-primes the device with its current configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is unconfigured or cannot be reset.
    fn prepare(&mut self) -> Result<(), DeviceError>;

    /// Blocks until a write would be accepted; `Ok(false)` on timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be polled.
    fn wait_ready(&mut self, timeout: Duration) -> Result<bool, DeviceError>;

    /// Writes interleaved samples and returns the number of frames accepted.
    ///
    /// # Errors
    ///
    /// `DeviceError::Underrun` when the device starved, other variants on
    /// hard failures.
    fn write(&mut self, samples: &[i16]) -> Result<usize, DeviceError>;

    /// Attempts to bring the device back after `error`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device stays unusable.
    fn recover(&mut self, error: &DeviceError) -> Result<(), DeviceError>;

    /// Blocks until every written frame has been played.
    ///
    /// # Errors
    ///
    /// Returns an error if draining fails.
    fn drain(&mut self) -> Result<(), DeviceError>;
}

// ============================================================================
// MockPcmDevice
// ============================================================================

/// Calls observed by a `MockPcmDevice`.
#[derive(Debug, Default, Clone)]
pub struct MockDeviceLog {
    /// Formats passed to `configure`
    pub configured: Vec<PcmFormat>,
    /// Number of `prepare` calls
    pub prepares: usize,
    /// Number of `write` calls, including failed ones
    pub write_calls: usize,
    /// Samples accepted by `write`
    pub written: Vec<i16>,
    /// Number of `recover` calls
    pub recovers: usize,
    /// Number of `drain` calls
    pub drains: usize,
}

#[derive(Debug, Default)]
struct MockDeviceState {
    log: MockDeviceLog,
    format: Option<PcmFormat>,
    write_errors: VecDeque<DeviceError>,
    max_frames_per_write: Option<usize>,
    never_ready: bool,
    fail_recover: bool,
}

/// Mock output device for testing.
///
/// Clones share state, so a test can keep one handle while the engine owns
/// another.
#[derive(Debug, Default, Clone)]
pub struct MockPcmDevice {
    state: Arc<Mutex<MockDeviceState>>,
}

impl MockPcmDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an error to be returned by a future `write`.
    pub fn push_write_error(&self, error: DeviceError) {
        self.state.lock().unwrap().write_errors.push_back(error);
    }

    /// Limits how many frames a single `write` accepts.
    pub fn set_max_frames_per_write(&self, frames: usize) {
        self.state.lock().unwrap().max_frames_per_write = Some(frames);
    }

    /// Makes `wait_ready` always time out.
    pub fn set_never_ready(&self, never_ready: bool) {
        self.state.lock().unwrap().never_ready = never_ready;
    }

    /// Makes `recover` fail.
    pub fn set_fail_recover(&self, fail: bool) {
        self.state.lock().unwrap().fail_recover = fail;
    }

    /// Returns a snapshot of the observed calls.
    #[must_use]
    pub fn log(&self) -> MockDeviceLog {
        self.state.lock().unwrap().log.clone()
    }

    /// Returns true if no device call has been made at all.
    #[must_use]
    pub fn untouched(&self) -> bool {
        let log = self.log();
        log.configured.is_empty()
            && log.prepares == 0
            && log.write_calls == 0
            && log.recovers == 0
            && log.drains == 0
    }
}

impl PcmDevice for MockPcmDevice {
    fn configure(&mut self, format: PcmFormat) -> Result<HwParams, DeviceError> {
        let mut state = self.state.lock().unwrap();
        state.log.configured.push(format);
        state.format = Some(format);
        Ok(HwParams::for_format(format))
    }

    fn prepare(&mut self) -> Result<(), DeviceError> {
        let mut state = self.state.lock().unwrap();
        if state.format.is_none() {
            return Err(DeviceError::NotConfigured);
        }
        state.log.prepares += 1;
        Ok(())
    }

    fn wait_ready(&mut self, _timeout: Duration) -> Result<bool, DeviceError> {
        Ok(!self.state.lock().unwrap().never_ready)
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize, DeviceError> {
        let mut state = self.state.lock().unwrap();
        state.log.write_calls += 1;
        let format = state.format.ok_or(DeviceError::NotConfigured)?;
        if let Some(error) = state.write_errors.pop_front() {
            return Err(error);
        }

        let channels = usize::from(format.channels.max(1));
        let mut frames = samples.len() / channels;
        if let Some(max) = state.max_frames_per_write {
            frames = frames.min(max);
        }
        state
            .log
            .written
            .extend_from_slice(&samples[..frames * channels]);
        Ok(frames)
    }

    fn recover(&mut self, error: &DeviceError) -> Result<(), DeviceError> {
        let mut state = self.state.lock().unwrap();
        state.log.recovers += 1;
        if state.fail_recover {
            return Err(DeviceError::Recover(error.to_string()));
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<(), DeviceError> {
        self.state.lock().unwrap().log.drains += 1;
        Ok(())
    }
}
