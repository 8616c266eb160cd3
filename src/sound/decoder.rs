//! WAV decoding into interleaved 16-bit PCM.

use std::fmt;
use std::io::Cursor;

use hound::{SampleFormat, WavReader};

use super::error::SoundError;

/// Sample rate and channel layout of a PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PcmFormat {
    /// Frames per second
    pub sample_rate: u32,
    /// Interleaved channels per frame
    pub channels: u16,
}

impl PcmFormat {
    /// Creates a new format description.
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }
}

impl fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz/{} ch", self.sample_rate, self.channels)
    }
}

/// One decoded clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSegment {
    /// Format of the samples
    pub format: PcmFormat,
    /// Interleaved samples, always a whole number of frames
    pub samples: Vec<i16>,
}

impl AudioSegment {
    /// Number of frames in the segment.
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.format.channels.max(1))
    }
}

/// Decodes an in-memory WAV file.
///
/// # Errors
///
/// Returns `SoundError::Decode` for malformed data and
/// `SoundError::UnsupportedEncoding` for anything other than 16-bit
/// integer PCM.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioSegment, SoundError> {
    let reader =
        WavReader::new(Cursor::new(bytes)).map_err(|e| SoundError::Decode(e.to_string()))?;
    let spec = reader.spec();

    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(SoundError::UnsupportedEncoding(format!(
            "{:?} {}-bit",
            spec.sample_format, spec.bits_per_sample
        )));
    }
    if spec.channels == 0 {
        return Err(SoundError::Decode("zero channels".to_string()));
    }

    let mut samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SoundError::Decode(e.to_string()))?;

    // drop a trailing partial frame
    let channels = usize::from(spec.channels);
    samples.truncate(samples.len() - samples.len() % channels);

    Ok(AudioSegment {
        format: PcmFormat::new(spec.sample_rate, spec.channels),
        samples,
    })
}
