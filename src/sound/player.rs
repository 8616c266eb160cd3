//! Chain playback engine.
//!
//! `ChainEngine` ties the pieces together: it resolves and decodes clips into
//! the `AudioChain`, and streams the chain to a `PcmDevice` in period-sized
//! chunks with underrun recovery.

use std::time::Duration;

use tracing::{debug, warn};

use super::chain::AudioChain;
use super::decoder::{decode_wav, PcmFormat};
use super::error::{DeviceError, SoundError};
use super::source::AssetStore;
use super::{HwParams, PcmDevice};

/// How long to wait for the device to accept a chunk.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(1000);

/// Consecutive failed attempts on one chunk before giving up.
pub const MAX_STALLED_ATTEMPTS: u32 = 32;

/// Builds announcement chains and plays them on an output device.
pub struct ChainEngine<D: PcmDevice> {
    // Field order is drop order: the device is closed before the chain is freed.
    device: D,
    /// Format and geometry the device was last configured with
    configured: Option<(PcmFormat, HwParams)>,
    chain: AudioChain,
    assets: Box<dyn AssetStore>,
    ready_timeout: Duration,
}

impl<D: PcmDevice> ChainEngine<D> {
    /// Creates an engine over an opened device.
    pub fn new(device: D, chain: AudioChain, assets: Box<dyn AssetStore>) -> Self {
        Self {
            device,
            configured: None,
            chain,
            assets,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }

    /// Sets the bound on each device readiness wait.
    #[must_use]
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Decodes `bytes` and appends them to the chain.
    ///
    /// # Errors
    ///
    /// Returns a decode, format or allocation error; the chain is unchanged.
    pub fn add(&mut self, bytes: &[u8]) -> Result<(), SoundError> {
        let segment = decode_wav(bytes)?;
        self.chain.append(&segment)
    }

    /// Looks up a clip by name and appends it.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::NotFound` if no clip has this name, otherwise as
    /// `add`.
    pub fn add_by_name(&mut self, name: &str) -> Result<(), SoundError> {
        let segment = {
            let bytes = self
                .assets
                .lookup(name)
                .ok_or_else(|| SoundError::NotFound(name.to_string()))?;
            decode_wav(&bytes)?
        };
        self.chain.append(&segment)
    }

    /// Plays everything queued and blocks until the device has drained.
    ///
    /// Playing an empty chain does nothing. The chain is not reset.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::Device` on any unrecoverable device failure.
    pub fn play(&mut self) -> Result<(), SoundError> {
        let format = match self.chain.format() {
            Some(format) if !self.chain.is_empty() => format,
            _ => return Ok(()),
        };

        debug!(
            frames = self.chain.frames_queued(),
            %format,
            "playing chain"
        );

        let result = stream(
            &mut self.device,
            &mut self.configured,
            format,
            self.chain.samples(),
            self.ready_timeout,
        );
        self.finish(result)
    }

    /// Plays one encoded clip immediately, bypassing the chain.
    ///
    /// The queued chain is left untouched.
    ///
    /// # Errors
    ///
    /// Returns a decode error, or `SoundError::Device` on an unrecoverable
    /// device failure.
    pub fn play_once(&mut self, bytes: &[u8]) -> Result<(), SoundError> {
        let segment = decode_wav(bytes)?;
        if segment.frames() == 0 {
            return Ok(());
        }

        debug!(frames = segment.frames(), format = %segment.format, "playing clip");
        let result = stream(
            &mut self.device,
            &mut self.configured,
            segment.format,
            &segment.samples,
            self.ready_timeout,
        );
        self.finish(result)
    }

    /// Looks up a clip by name and plays it with `play_once`.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::NotFound` if no clip has this name, otherwise as
    /// `play_once`.
    pub fn play_clip(&mut self, name: &str) -> Result<(), SoundError> {
        let bytes = self
            .assets
            .lookup(name)
            .ok_or_else(|| SoundError::NotFound(name.to_string()))?
            .into_owned();
        self.play_once(&bytes)
    }

    fn finish(&mut self, result: Result<(), DeviceError>) -> Result<(), SoundError> {
        result.map_err(|e| {
            // force a full configure next time
            self.configured = None;
            SoundError::from(e)
        })
    }

    /// Empties the chain, keeping its storage.
    pub fn reset(&mut self) {
        self.chain.reset();
    }

    pub fn chain(&self) -> &AudioChain {
        &self.chain
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

/// Streams `samples` to the device in period-sized chunks, then drains.
///
/// The device is reconfigured when `format` differs from the last one,
/// otherwise only re-primed.
fn stream<D: PcmDevice>(
    device: &mut D,
    configured: &mut Option<(PcmFormat, HwParams)>,
    format: PcmFormat,
    samples: &[i16],
    timeout: Duration,
) -> Result<(), DeviceError> {
    let params = match *configured {
        Some((current, params)) if current == format => {
            device.prepare()?;
            params
        }
        _ => {
            let params = device.configure(format)?;
            *configured = Some((format, params));
            params
        }
    };

    let channels = usize::from(format.channels);
    let chunk_len = params.period_frames.max(1) * channels;
    for chunk in samples.chunks(chunk_len) {
        write_chunk(device, chunk, channels, timeout)?;
    }
    device.drain()
}

/// Writes one chunk, retrying until every frame has been accepted.
fn write_chunk<D: PcmDevice>(
    device: &mut D,
    chunk: &[i16],
    channels: usize,
    timeout: Duration,
) -> Result<(), DeviceError> {
    let mut offset = 0;
    let mut attempts = 0;

    while offset < chunk.len() {
        if !device.wait_ready(timeout)? {
            let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            return Err(DeviceError::Timeout(millis));
        }

        match device.write(&chunk[offset..]) {
            Ok(frames) if frames > 0 => {
                offset += frames * channels;
                attempts = 0;
                continue;
            }
            Ok(_) => {}
            Err(DeviceError::Underrun) => {
                warn!("output underrun, re-priming");
                device.prepare()?;
            }
            Err(e) => {
                warn!(error = %e, "write failed, attempting recovery");
                device.recover(&e)?;
            }
        }

        attempts += 1;
        if attempts >= MAX_STALLED_ATTEMPTS {
            return Err(DeviceError::Stalled(attempts));
        }
    }
    Ok(())
}

impl<D: PcmDevice + std::fmt::Debug> std::fmt::Debug for ChainEngine<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainEngine")
            .field("device", &self.device)
            .field("configured", &self.configured)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}
