//! Sound system error types.
//!
//! `SoundError` covers everything that can go wrong while building or playing
//! an announcement chain. `DeviceError` is the output-device half of it and is
//! also what `PcmDevice` implementations return.

use thiserror::Error;

use super::decoder::PcmFormat;

/// Errors reported by an output device.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    /// The device could not be opened.
    #[error("cannot open output device: {0}")]
    Open(String),

    /// Hardware parameters were rejected.
    #[error("cannot configure output device: {0}")]
    Configure(String),

    /// A write was attempted before `configure`.
    #[error("output device is not configured")]
    NotConfigured,

    /// The device buffer ran dry and must be re-primed.
    #[error("output buffer underrun")]
    Underrun,

    /// The device did not become writable in time.
    #[error("output device not ready after {0} ms")]
    Timeout(u64),

    /// A write failed for a reason other than underrun.
    #[error("write to output device failed: {0}")]
    Write(String),

    /// Recovery after a failed write did not succeed.
    #[error("output device recovery failed: {0}")]
    Recover(String),

    /// Waiting for queued audio to finish failed.
    #[error("drain failed: {0}")]
    Drain(String),

    /// Repeated recoveries without any frames being accepted.
    #[error("output device stalled after {0} attempts")]
    Stalled(u32),
}

impl DeviceError {
    /// Returns true for the transient underrun condition.
    #[must_use]
    pub fn is_underrun(&self) -> bool {
        matches!(self, Self::Underrun)
    }
}

/// Errors that can occur while queueing or playing audio.
#[derive(Debug, Error)]
pub enum SoundError {
    /// The source bytes could not be decoded.
    #[error("failed to decode audio: {0}")]
    Decode(String),

    /// The source decoded but is not 16-bit linear PCM.
    #[error("unsupported sample encoding: {0} (need 16-bit integer PCM)")]
    UnsupportedEncoding(String),

    /// The segment disagrees with the format already queued.
    #[error("segment format {found} does not match queued format {expected}")]
    FormatMismatch {
        /// Format adopted by the chain
        expected: PcmFormat,
        /// Format of the rejected segment
        found: PcmFormat,
    },

    /// No asset is registered under this name.
    #[error("voice clip not found: {0}")]
    NotFound(String),

    /// Growing the chain buffer failed.
    #[error("cannot grow chain buffer to {0} frames")]
    Allocation(usize),

    /// The output device failed.
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl SoundError {
    /// Returns true if this error is related to the output device.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::Device(_))
    }

    /// Returns true if this error is related to the audio source.
    #[must_use]
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::UnsupportedEncoding(_) | Self::NotFound(_)
        )
    }
}
