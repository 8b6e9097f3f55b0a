//! ADSR Envelope generator.
//!
//! Unlike a gate-driven state machine this envelope renders the whole
//! amplitude curve for a note up front:
//!
//! ```text
//!   1.0 ┐   ╱╲
//!       │  ╱  ╲_________
//!     S │ ╱             ╲
//!   0.0 └╱───────────────╲──→ t
//!        A   D     S     R
//!                      ↑ note_off
//! ```
//!
//! Attack, decay and sustain are laid down in that order; the release ramp
//! fills whatever is left of the buffer, so the curve always has exactly
//! the requested number of samples.

use super::oscillator::sample_count;

/// ADSR Envelope with linear attack/decay/release ramps.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Attack time in seconds.
    pub attack: f64,
    /// Decay time in seconds.
    pub decay: f64,
    /// Sustain level [0, 1].
    pub sustain: f64,
    /// Release time in seconds.
    pub release: f64,
    pub sample_rate: u32,
}

impl Default for Envelope {
    fn default() -> Self {
        Envelope::new(44100)
    }
}

impl Envelope {
    /// Create an envelope with the default shape (10 ms attack, 100 ms decay,
    /// 0.7 sustain, 200 ms release).
    pub fn new(sample_rate: u32) -> Self {
        Envelope {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.2,
            sample_rate,
        }
    }

    /// Create an envelope from explicit stage settings.
    ///
    /// # Arguments
    /// - `attack`, `decay`, `release`: Stage lengths in seconds.
    /// - `sustain`: Level held between decay and note-off.
    /// - `sample_rate`: Audio sample rate in Hz.
    pub fn adsr(attack: f64, decay: f64, sustain: f64, release: f64, sample_rate: u32) -> Self {
        Envelope {
            attack,
            decay,
            sustain,
            release,
            sample_rate,
        }
    }

    /// Render the envelope for `duration` seconds.
    ///
    /// `note_off` is the release start in seconds; without it the note is
    /// held until `duration - release`.
    pub fn generate(&self, duration: f64, note_off: Option<f64>) -> Vec<f64> {
        self.curve(sample_count(self.sample_rate, duration), note_off)
    }

    /// Multiply `signal` by an envelope of the same length.
    pub fn apply(&self, signal: &[f64], note_off: Option<f64>) -> Vec<f64> {
        let curve = self.curve(signal.len(), note_off);
        signal.iter().zip(&curve).map(|(s, e)| s * e).collect()
    }

    fn samples(&self, seconds: f64) -> usize {
        sample_count(self.sample_rate, seconds)
    }

    fn curve(&self, total: usize, note_off: Option<f64>) -> Vec<f64> {
        let attack_n = self.samples(self.attack);
        let decay_n = self.samples(self.decay);
        let release_n = self.samples(self.release);

        let note_off_n = match note_off {
            Some(t) => self.samples(t),
            None => total.saturating_sub(release_n),
        };
        // Zero when attack + decay already reach past note-off; the decay
        // ramp then runs into the release region uncorrected.
        let sustain_n = note_off_n.saturating_sub(attack_n + decay_n);

        let mut env = Vec::with_capacity(total);

        // Attack: 0 → 1, endpoint excluded
        for i in 0..attack_n.min(total) {
            env.push(i as f64 / attack_n as f64);
        }

        // Decay: 1 → sustain, endpoint excluded
        let decay_take = decay_n.min(total - env.len());
        for i in 0..decay_take {
            env.push(1.0 + (self.sustain - 1.0) * i as f64 / decay_n as f64);
        }

        // Sustain
        let sustain_take = sustain_n.min(total - env.len());
        env.extend(std::iter::repeat_n(self.sustain, sustain_take));

        // Release: last written level → 0, endpoint included
        let remaining = total - env.len();
        if remaining > 0 {
            let start = env.last().copied().unwrap_or(self.sustain);
            if remaining == 1 {
                env.push(start);
            } else {
                let span = (remaining - 1) as f64;
                for i in 0..remaining {
                    env.push(start * (1.0 - i as f64 / span));
                }
            }
        }

        debug_assert_eq!(env.len(), total);
        env
    }
}
