//! Mixer — the fixed signal chain of the synthesizer.
//!
//! ```text
//! osc1 ─┐
//!       (+) → envelope → [filter] → [delay] → [reverb] → buffer
//! osc2 ─┘
//! ```
//!
//! Components are owned by the mixer and exposed as public fields so a
//! control surface (UI, MIDI handler, preset loader) can change them between
//! calls. No locking is done here: mutation and generation must be ordered
//! by the caller.

use tracing::{debug, info, warn};

use super::delay::DelayEffect;
use super::envelope::Envelope;
use super::filter::LowPassFilter;
use super::oscillator::Oscillator;
use super::reverb::ReverbEffect;
use crate::error::Result;
use crate::midi::midi_to_frequency;
use crate::sink::AudioSink;

#[derive(Debug, Clone)]
pub struct Mixer {
    pub osc1: Oscillator,
    pub osc2: Oscillator,
    pub envelope: Envelope,
    pub filter: Option<LowPassFilter>,
    pub delay: Option<DelayEffect>,
    pub reverb: Option<ReverbEffect>,
    pub sample_rate: u32,
    /// Seed the noise and reverb sources were derived from, if known.
    /// Components seeded one by one leave this `None`.
    pub seed: Option<u64>,
}

impl Mixer {
    /// A mixer with no optional stages attached.
    pub fn new(osc1: Oscillator, osc2: Oscillator, envelope: Envelope, sample_rate: u32) -> Self {
        Mixer {
            osc1,
            osc2,
            envelope,
            filter: None,
            delay: None,
            reverb: None,
            sample_rate,
            seed: None,
        }
    }

    /// Per-component seeds derived from one patch seed: osc1, osc2, reverb.
    pub fn seed_streams(seed: u64) -> [u64; 3] {
        [seed, seed.wrapping_add(1), seed.wrapping_add(2)]
    }

    /// Reseed every random source from a single seed.
    pub fn reseed(&mut self, seed: u64) {
        let [osc1_seed, osc2_seed, reverb_seed] = Mixer::seed_streams(seed);
        self.osc1.reseed(osc1_seed);
        self.osc2.reseed(osc2_seed);
        if let Some(reverb) = self.reverb.as_mut() {
            reverb.reseed(reverb_seed);
        }
        self.seed = Some(seed);
    }

    pub fn with_filter(mut self, filter: LowPassFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_delay(mut self, delay: DelayEffect) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_reverb(mut self, reverb: ReverbEffect) -> Self {
        self.reverb = Some(reverb);
        self
    }

    /// Tune both oscillators to a MIDI note (detune offsets are kept).
    pub fn note_on(&mut self, note: u8) {
        let freq = midi_to_frequency(note);
        self.osc1.frequency = freq;
        self.osc2.frequency = freq;
    }

    /// Render `duration` seconds through the whole chain.
    pub fn generate(&mut self, duration: f64, note_off: Option<f64>) -> Vec<f64> {
        let wave1 = self.osc1.generate(duration);
        let wave2 = self.osc2.generate(duration);
        if wave1.len() != wave2.len() {
            warn!(
                osc1 = wave1.len(),
                osc2 = wave2.len(),
                "oscillator buffers differ in length, mixing the common part"
            );
        }

        let sum: Vec<f64> = wave1.iter().zip(&wave2).map(|(a, b)| a + b).collect();
        let mut out = self.envelope.apply(&sum, note_off);

        if let Some(filter) = &self.filter {
            out = filter.process(&out);
        }
        if let Some(delay) = &self.delay {
            out = delay.process(&out);
        }
        if let Some(reverb) = &self.reverb {
            out = reverb.process(&out);
        }

        debug!(
            samples = out.len(),
            filter = self.filter.is_some(),
            delay = self.delay.is_some(),
            reverb = self.reverb.is_some(),
            "note rendered"
        );
        out
    }

    /// Render a note and hand it to `sink`, returning once the sink is done.
    pub fn play<S: AudioSink + ?Sized>(
        &mut self,
        duration: f64,
        note_off: Option<f64>,
        sink: &mut S,
    ) -> Result<()> {
        let samples = self.generate(duration, note_off);
        info!(samples = samples.len(), sample_rate = self.sample_rate, "playing note");
        sink.play(&samples, self.sample_rate)
    }
}
