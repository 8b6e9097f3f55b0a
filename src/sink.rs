//! Audio output sinks — where a finished note buffer goes.
//!
//! The DSP chain only produces buffers; a sink takes one buffer plus its
//! sample rate and returns when it is done with it. Playback devices block
//! until the device has played out the last sample.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::dsp::renderer::render_wav;
use crate::error::Result;

pub trait AudioSink {
    /// Consume one mono buffer, blocking until the sink has finished with it.
    fn play(&mut self, samples: &[f64], sample_rate: u32) -> Result<()>;
}

/// Keeps every buffer it is given. Useful headless and in tests.
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    pub played: Vec<(Vec<f64>, u32)>,
}

impl AudioSink for BufferSink {
    fn play(&mut self, samples: &[f64], sample_rate: u32) -> Result<()> {
        self.played.push((samples.to_vec(), sample_rate));
        Ok(())
    }
}

/// Writes each buffer to a mono 16-bit WAV file, overwriting earlier notes.
#[derive(Debug, Clone)]
pub struct WavFileSink {
    path: PathBuf,
}

impl WavFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        WavFileSink { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSink for WavFileSink {
    fn play(&mut self, samples: &[f64], sample_rate: u32) -> Result<()> {
        std::fs::write(&self.path, render_wav(samples, sample_rate))?;
        info!(path = %self.path.display(), samples = samples.len(), "wrote wav");
        Ok(())
    }
}

/// Device periods of silence handed over after the last sample before a
/// buffer counts as played out.
#[cfg_attr(not(feature = "playback"), allow(dead_code))]
const TRAILING_PERIODS: usize = 2;

/// Feeds a mono buffer into interleaved device periods.
#[cfg_attr(not(feature = "playback"), allow(dead_code))]
#[derive(Debug)]
struct PlaybackCursor {
    samples: Vec<f32>,
    pos: usize,
    silent_periods: usize,
}

#[cfg_attr(not(feature = "playback"), allow(dead_code))]
impl PlaybackCursor {
    fn new(samples: &[f64]) -> Self {
        PlaybackCursor {
            samples: samples.iter().map(|&s| s as f32).collect(),
            pos: 0,
            silent_periods: 0,
        }
    }

    /// Fill one period, copying each sample to every channel.
    ///
    /// Returns true once the whole buffer and `TRAILING_PERIODS` silent
    /// periods after it have been delivered.
    fn fill(&mut self, data: &mut [f32], channels: usize) -> bool {
        let drained = self.pos >= self.samples.len();
        for frame in data.chunks_mut(channels.max(1)) {
            frame.fill(self.samples.get(self.pos).copied().unwrap_or(0.0));
            if self.pos < self.samples.len() {
                self.pos += 1;
            }
        }
        if drained {
            self.silent_periods += 1;
        }
        self.silent_periods >= TRAILING_PERIODS
    }
}

#[cfg(feature = "playback")]
pub use device::DeviceSink;

#[cfg(feature = "playback")]
mod device {
    use std::sync::mpsc;
    use std::time::Duration;

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use tracing::{error, info};

    use super::{AudioSink, PlaybackCursor};
    use crate::error::{Result, SynthError};

    /// Extra time allowed past the nominal buffer length before giving up.
    const DRAIN_GRACE: Duration = Duration::from_secs(2);

    /// Plays buffers on the host's default output device.
    ///
    /// The mono buffer is copied to every device channel. The stream is
    /// opened as f32 at the buffer's sample rate; no resampling is done.
    #[derive(Debug, Default)]
    pub struct DeviceSink;

    impl DeviceSink {
        pub fn new() -> Self {
            DeviceSink
        }
    }

    fn playback_err(e: impl std::fmt::Display) -> SynthError {
        SynthError::Playback(e.to_string())
    }

    /// Pick an f32 output config that runs natively at `sample_rate`.
    fn resolve_config(device: &cpal::Device, sample_rate: u32) -> Result<cpal::StreamConfig> {
        let range = device
            .supported_output_configs()
            .map_err(playback_err)?
            .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
            .find(|c| c.min_sample_rate().0 <= sample_rate && sample_rate <= c.max_sample_rate().0)
            .ok_or_else(|| playback_err(format!("no f32 output config at {sample_rate} Hz")))?;

        Ok(cpal::StreamConfig {
            channels: range.channels(),
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        })
    }

    impl AudioSink for DeviceSink {
        fn play(&mut self, samples: &[f64], sample_rate: u32) -> Result<()> {
            if samples.is_empty() {
                return Ok(());
            }

            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| playback_err("no output device available"))?;
            let config = resolve_config(&device, sample_rate)?;
            let channels = config.channels as usize;
            info!(?config, "opening output stream");

            let total = samples.len();
            let mut cursor = PlaybackCursor::new(samples);
            let (done_tx, done_rx) = mpsc::sync_channel::<()>(1);

            let stream = device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        if cursor.fill(data, channels) {
                            let _ = done_tx.try_send(());
                        }
                    },
                    |err| error!(%err, "output stream error"),
                    None,
                )
                .map_err(playback_err)?;
            stream.play().map_err(playback_err)?;

            let nominal = Duration::from_secs_f64(total as f64 / sample_rate as f64);
            done_rx
                .recv_timeout(nominal + DRAIN_GRACE)
                .map_err(|_| playback_err("output stream stalled before the buffer drained"))?;
            info!(samples = total, "playback finished");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_sink_records_calls() {
        let mut sink = BufferSink::default();
        sink.play(&[0.1, 0.2], 8000).unwrap();
        sink.play(&[], 44100).unwrap();
        assert_eq!(sink.played, vec![(vec![0.1, 0.2], 8000), (vec![], 44100)]);
    }

    #[test]
    fn cursor_copies_samples_to_every_channel() {
        let mut cursor = PlaybackCursor::new(&[0.5, -0.25, 1.0]);
        let mut period = [9.0_f32; 8];
        cursor.fill(&mut period, 2);
        assert_eq!(period, [0.5, 0.5, -0.25, -0.25, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn cursor_finishes_after_trailing_silence() {
        let mut cursor = PlaybackCursor::new(&[0.1, 0.2, 0.3, 0.4]);
        let mut period = [0.0_f32; 4];
        // Two stereo frames per period
        assert!(!cursor.fill(&mut period, 2));
        assert!(!cursor.fill(&mut period, 2));
        // Last samples delivered; the device still has to play them out
        assert!(!cursor.fill(&mut period, 2));
        assert_eq!(period, [0.0; 4]);
        assert!(cursor.fill(&mut period, 2));
    }

    #[test]
    fn cursor_with_partial_last_period_still_waits() {
        let mut cursor = PlaybackCursor::new(&[0.1, 0.2, 0.3]);
        let mut period = [0.0_f32; 2];
        assert!(!cursor.fill(&mut period, 1));
        assert!(!cursor.fill(&mut period, 1));
        assert_eq!(period, [0.3, 0.0]);
        assert!(!cursor.fill(&mut period, 1));
        assert!(cursor.fill(&mut period, 1));
    }

    #[test]
    fn wav_sink_writes_file() {
        let path = std::env::temp_dir().join(format!("duosynth-sink-{}.wav", std::process::id()));
        let mut sink = WavFileSink::new(&path);
        sink.play(&[0.0, 0.5, -0.5], 22050).unwrap();

        let bytes = std::fs::read(sink.path()).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(bytes.len(), 44 + 6);
        std::fs::remove_file(&path).unwrap();
    }
}
