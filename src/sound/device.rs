//! Output device backed by rodio.
//!
//! rodio owns the hardware stream and mixes sources pulled from a `Sink`. The
//! `PcmDevice` contract is mapped onto it as follows:
//!
//! - `configure` / `prepare` / `recover` replace the sink with a fresh one
//! - each `write` appends one period as a `SamplesBuffer`
//! - the device counts as ready while fewer than `BUFFER_PERIODS` periods are
//!   queued
//! - a sink that ran dry between two writes is reported as an underrun
//!
//! `NullPcmDevice` accepts everything and plays nothing, for a muted daemon.

use std::thread;
use std::time::{Duration, Instant};

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};
use tracing::debug;

use super::decoder::PcmFormat;
use super::error::DeviceError;
use super::{HwParams, PcmDevice, BUFFER_PERIODS};

/// Interval between readiness checks.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// The default system output device.
pub struct RodioPcmDevice {
    // Declared before the stream so it is dropped first.
    sink: Option<Sink>,
    handle: OutputStreamHandle,
    format: Option<PcmFormat>,
    /// Set once a write was accepted since the last re-prime
    started: bool,
    /// The audio output stream (must be kept alive for playback)
    _stream: OutputStream,
}

impl RodioPcmDevice {
    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Open` if no output device is available.
    pub fn open_default() -> Result<Self, DeviceError> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| DeviceError::Open(e.to_string()))?;

        debug!("audio output stream initialized");

        Ok(Self {
            sink: None,
            handle,
            format: None,
            started: false,
            _stream: stream,
        })
    }

    /// Replaces the sink, discarding anything still queued.
    fn reprime(&mut self) -> Result<(), DeviceError> {
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        let sink = Sink::try_new(&self.handle).map_err(|e| DeviceError::Configure(e.to_string()))?;
        self.sink = Some(sink);
        self.started = false;
        Ok(())
    }

    fn sink(&self) -> Result<&Sink, DeviceError> {
        self.sink.as_ref().ok_or(DeviceError::NotConfigured)
    }
}

impl PcmDevice for RodioPcmDevice {
    fn configure(&mut self, format: PcmFormat) -> Result<HwParams, DeviceError> {
        if format.sample_rate == 0 || format.channels == 0 {
            return Err(DeviceError::Configure(format!("unusable format {format}")));
        }
        self.reprime()?;
        self.format = Some(format);

        let params = HwParams::for_format(format);
        debug!(
            %format,
            period_frames = params.period_frames,
            buffer_frames = params.buffer_frames,
            "output device configured"
        );
        Ok(params)
    }

    fn prepare(&mut self) -> Result<(), DeviceError> {
        if self.format.is_none() {
            return Err(DeviceError::NotConfigured);
        }
        self.reprime()
    }

    fn wait_ready(&mut self, timeout: Duration) -> Result<bool, DeviceError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.sink()?.len() < BUFFER_PERIODS {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            thread::sleep(READY_POLL_INTERVAL.min(deadline - now));
        }
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize, DeviceError> {
        let format = self.format.ok_or(DeviceError::NotConfigured)?;
        let sink = self.sink()?;
        if self.started && sink.empty() {
            return Err(DeviceError::Underrun);
        }

        let channels = usize::from(format.channels);
        let frames = samples.len() / channels;
        if frames == 0 {
            return Ok(0);
        }
        sink.append(SamplesBuffer::new(
            format.channels,
            format.sample_rate,
            samples[..frames * channels].to_vec(),
        ));
        self.started = true;
        Ok(frames)
    }

    fn recover(&mut self, error: &DeviceError) -> Result<(), DeviceError> {
        if self.format.is_none() {
            return Err(DeviceError::Recover(error.to_string()));
        }
        debug!(%error, "re-priming output device");
        self.reprime()
            .map_err(|e| DeviceError::Recover(format!("{error}: {e}")))
    }

    fn drain(&mut self) -> Result<(), DeviceError> {
        self.sink()?.sleep_until_end();
        self.started = false;
        Ok(())
    }
}

impl std::fmt::Debug for RodioPcmDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioPcmDevice")
            .field("format", &self.format)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// NullPcmDevice
// ============================================================================

/// Output device that discards all audio.
#[derive(Debug, Default)]
pub struct NullPcmDevice {
    format: Option<PcmFormat>,
}

impl NullPcmDevice {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PcmDevice for NullPcmDevice {
    fn configure(&mut self, format: PcmFormat) -> Result<HwParams, DeviceError> {
        if format.sample_rate == 0 || format.channels == 0 {
            return Err(DeviceError::Configure(format!("unusable format {format}")));
        }
        self.format = Some(format);
        Ok(HwParams::for_format(format))
    }

    fn prepare(&mut self) -> Result<(), DeviceError> {
        self.format.map(|_| ()).ok_or(DeviceError::NotConfigured)
    }

    fn wait_ready(&mut self, _timeout: Duration) -> Result<bool, DeviceError> {
        Ok(true)
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize, DeviceError> {
        let format = self.format.ok_or(DeviceError::NotConfigured)?;
        Ok(samples.len() / usize::from(format.channels))
    }

    fn recover(&mut self, _error: &DeviceError) -> Result<(), DeviceError> {
        Ok(())
    }

    fn drain(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_device_accepts_everything() {
        let mut device = NullPcmDevice::new();
        assert_eq!(device.write(&[0; 4]), Err(DeviceError::NotConfigured));

        let params = device.configure(PcmFormat::new(8000, 2)).unwrap();
        assert_eq!(params.period_frames, 80);
        assert!(device.wait_ready(Duration::ZERO).unwrap());
        assert_eq!(device.write(&[0; 160]), Ok(80));
        assert_eq!(device.prepare(), Ok(()));
        assert_eq!(device.drain(), Ok(()));
    }

    #[test]
    fn test_null_device_plays_bundled_clip() {
        use crate::sound::{AudioChain, ChainEngine, EmbeddedAssets};

        let mut engine = ChainEngine::new(
            NullPcmDevice::new(),
            AudioChain::new(),
            Box::new(EmbeddedAssets),
        );
        engine.add_by_name("round").unwrap();
        engine.add_by_name("num8").unwrap();
        engine.play().unwrap();
        engine.play_clip("done").unwrap();
    }

    // The rodio tests are skipped where no audio hardware is present
    // (e.g. CI containers).

    #[test]
    fn test_write_before_configure() {
        let mut device = match RodioPcmDevice::open_default() {
            Ok(d) => d,
            Err(_) => return,
        };
        assert_eq!(device.write(&[0; 16]), Err(DeviceError::NotConfigured));
        assert_eq!(device.prepare(), Err(DeviceError::NotConfigured));
    }

    #[test]
    fn test_rejects_zero_channels() {
        let mut device = match RodioPcmDevice::open_default() {
            Ok(d) => d,
            Err(_) => return,
        };
        assert!(matches!(
            device.configure(PcmFormat::new(16000, 0)),
            Err(DeviceError::Configure(_))
        ));
    }

    #[test]
    fn test_short_silence_plays() {
        let mut device = match RodioPcmDevice::open_default() {
            Ok(d) => d,
            Err(_) => return,
        };
        let params = device.configure(PcmFormat::new(16000, 1)).unwrap();
        assert_eq!(params.period_frames, 160);

        assert!(device.wait_ready(Duration::from_millis(100)).unwrap());
        assert_eq!(device.write(&[0; 160]).unwrap(), 160);
        device.drain().unwrap();
    }
}
