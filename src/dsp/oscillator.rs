//! Whole-buffer oscillators: sine, square, sawtooth, triangle and noise.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::error::SynthError;

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
    Noise,
}

impl Waveform {
    pub const ALL: [Waveform; 5] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
        Waveform::Noise,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
            Waveform::Noise => "noise",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Waveform {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Waveform::ALL
            .into_iter()
            .find(|w| w.name() == s)
            .ok_or_else(|| SynthError::invalid("waveform", s))
    }
}

/// A stateless-phase oscillator that renders a whole buffer per call.
///
/// Parameters are public so a control surface can change them between
/// `generate` calls. Each call starts at phase zero.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    /// Base frequency in Hz.
    pub frequency: f64,
    /// Offset in Hz added to `frequency` (may be negative).
    pub detune: f64,
    /// Linear output gain, not clamped.
    pub volume: f64,
    pub sample_rate: u32,
    rng: Pcg32,
}

impl Default for Oscillator {
    fn default() -> Self {
        Oscillator::new(Waveform::Sine, 440.0, 44100)
    }
}

impl Oscillator {
    /// Create an oscillator with no detune, unity volume and a random noise seed.
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: u32) -> Self {
        Oscillator::with_seed(waveform, frequency, sample_rate, rand::random())
    }

    /// Like [`Oscillator::new`] but with a fixed noise seed.
    pub fn with_seed(waveform: Waveform, frequency: f64, sample_rate: u32, seed: u64) -> Self {
        Oscillator {
            waveform,
            frequency,
            detune: 0.0,
            volume: 1.0,
            sample_rate,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Reseed the noise source.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = Pcg32::seed_from_u64(seed);
    }

    /// Frequency actually rendered, base plus detune.
    pub fn effective_frequency(&self) -> f64 {
        self.frequency + self.detune
    }

    /// Number of samples `generate(duration)` returns.
    pub fn sample_count(&self, duration: f64) -> usize {
        sample_count(self.sample_rate, duration)
    }

    /// Render `duration` seconds of the current waveform.
    ///
    /// The time axis is `floor(sample_rate * duration)` points evenly spaced
    /// over `[0, duration)`. Non-positive durations yield an empty buffer.
    /// Only noise mode advances internal state.
    pub fn generate(&mut self, duration: f64) -> Vec<f64> {
        let n = self.sample_count(duration);
        if n == 0 {
            return Vec::new();
        }

        let step = duration / n as f64;
        let freq = self.effective_frequency();
        let volume = self.volume;

        match self.waveform {
            Waveform::Noise => (0..n)
                .map(|_| volume * self.rng.random_range(-1.0..=1.0))
                .collect(),
            shape => (0..n)
                .map(|i| {
                    let t = i as f64 * step;
                    volume * periodic(shape, freq * t)
                })
                .collect(),
        }
    }
}

/// `floor(sample_rate * duration)`, zero for non-positive or non-finite input.
pub(crate) fn sample_count(sample_rate: u32, duration: f64) -> usize {
    let n = (sample_rate as f64 * duration).floor();
    if n.is_finite() && n > 0.0 { n as usize } else { 0 }
}

/// Evaluate a periodic shape at `cycles` elapsed periods.
fn periodic(shape: Waveform, cycles: f64) -> f64 {
    // Fractional position within the current period, [0, 1).
    let phase = cycles.rem_euclid(1.0);
    match shape {
        Waveform::Sine => (2.0 * PI * cycles).sin(),
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Sawtooth => 2.0 * phase - 1.0,
        Waveform::Triangle => {
            if phase < 0.5 {
                4.0 * phase - 1.0
            } else {
                3.0 - 4.0 * phase
            }
        }
        Waveform::Noise => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::analysis::dominant_frequency;

    fn osc(waveform: Waveform, frequency: f64) -> Oscillator {
        Oscillator::with_seed(waveform, frequency, 44100, 7)
    }

    #[test]
    fn one_second_has_sample_rate_samples() {
        for waveform in Waveform::ALL {
            let samples = osc(waveform, 440.0).generate(1.0);
            assert_eq!(samples.len(), 44100, "{waveform} length");
        }
    }

    #[test]
    fn dominant_frequency_matches_pitch() {
        for waveform in [Waveform::Sine, Waveform::Square, Waveform::Sawtooth, Waveform::Triangle] {
            let samples = osc(waveform, 440.0).generate(1.0);
            let peak = dominant_frequency(&samples, 44100);
            assert!((peak - 440.0).abs() < 1.0, "{waveform} peak at {peak} Hz");
        }
    }

    #[test]
    fn detune_shifts_dominant_frequency() {
        let mut o = osc(Waveform::Sine, 440.0);
        o.detune = -20.0;
        let peak = dominant_frequency(&o.generate(1.0), 44100);
        assert!((peak - 420.0).abs() < 1.0, "detuned peak at {peak} Hz");
    }

    #[test]
    fn length_is_floor_of_rate_times_duration() {
        let mut o = osc(Waveform::Sine, 220.0);
        assert_eq!(o.generate(0.5).len(), 22050);
        assert_eq!(o.generate(0.123).len(), (44100.0_f64 * 0.123).floor() as usize);
        assert!(o.generate(0.0).is_empty());
        assert!(o.generate(-1.0).is_empty());
    }

    #[test]
    fn sine_starts_at_zero() {
        let samples = osc(Waveform::Sine, 440.0).generate(0.01);
        assert!(samples[0].abs() < 1e-12, "sine should start at 0, got {}", samples[0]);
    }

    #[test]
    fn shapes_hit_expected_values() {
        // 1 Hz at 8 Hz sample rate: phase advances by 1/8 per sample.
        let render = |w| {
            let mut o = Oscillator::with_seed(w, 1.0, 8, 0);
            o.generate(1.0)
        };
        assert_eq!(render(Waveform::Square), vec![1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0]);
        assert_eq!(render(Waveform::Sawtooth), vec![-1.0, -0.75, -0.5, -0.25, 0.0, 0.25, 0.5, 0.75]);
        assert_eq!(render(Waveform::Triangle), vec![-1.0, -0.5, 0.0, 0.5, 1.0, 0.5, 0.0, -0.5]);
    }

    #[test]
    fn volume_scales_without_clamping() {
        let mut o = osc(Waveform::Square, 100.0);
        o.volume = 2.5;
        let samples = o.generate(0.05);
        assert!(samples.iter().all(|s| s.abs() == 2.5));
    }

    #[test]
    fn noise_stays_in_range() {
        let samples = osc(Waveform::Noise, 440.0).generate(0.5);
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(samples.iter().any(|&s| s != samples[0]), "noise should vary");
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let a = osc(Waveform::Noise, 440.0).generate(0.1);
        let b = osc(Waveform::Noise, 440.0).generate(0.1);
        assert_eq!(a, b);
    }

    #[test]
    fn periodic_generate_is_idempotent() {
        let mut o = osc(Waveform::Sawtooth, 330.0);
        assert_eq!(o.generate(0.2), o.generate(0.2));
    }

    #[test]
    fn parse_waveform_names() {
        assert_eq!("triangle".parse::<Waveform>().unwrap(), Waveform::Triangle);
        assert_eq!(Waveform::Noise.to_string(), "noise");
        let err = "organ".parse::<Waveform>().unwrap_err();
        assert!(matches!(err, SynthError::InvalidParameter { .. }), "got {err:?}");
    }

    #[test]
    fn waveform_serde_uses_lowercase_names() {
        for waveform in Waveform::ALL {
            let json = serde_json::to_string(&waveform).unwrap();
            assert_eq!(json, format!("\"{}\"", waveform.name()));
            assert_eq!(serde_json::from_str::<Waveform>(&json).unwrap(), waveform);
        }
        assert!(serde_json::from_str::<Waveform>("\"Sine\"").is_err());
    }
}
