//! Reverb effect — convolution with a synthetic decaying noise impulse.
//!
//! The impulse response is Gaussian noise shaped by `exp(-damping * t)` over
//! `room_size` seconds. It is generated once per parameter set and owned by
//! the effect; processing is a full linear convolution truncated back to
//! the input length, then a dry/wet blend.

use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use rand_pcg::Pcg32;
use tracing::debug;

use super::convolve::convolve_truncated;

/// Shortest impulse response, in seconds.
const MIN_ROOM_SIZE: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct ReverbEffect {
    room_size: f64,
    damping: f64,
    /// Dry/wet mix (0.0 = fully dry, 1.0 = fully wet).
    pub mix: f64,
    sample_rate: u32,
    seed: u64,
    impulse: Vec<f64>,
}

impl Default for ReverbEffect {
    fn default() -> Self {
        ReverbEffect::new(0.5, 0.5, 0.3, 44100)
    }
}

impl ReverbEffect {
    /// Create a new reverb with a randomly seeded impulse response.
    ///
    /// # Arguments
    /// - `room_size`: Impulse response length in seconds.
    /// - `damping`: Exponential decay rate of the impulse response.
    /// - `mix`: Dry/wet balance.
    /// - `sample_rate`: Audio sample rate in Hz.
    pub fn new(room_size: f64, damping: f64, mix: f64, sample_rate: u32) -> Self {
        ReverbEffect::with_seed(room_size, damping, mix, sample_rate, rand::random())
    }

    /// Build a reverb whose impulse response is reproducible from `seed`.
    pub fn with_seed(room_size: f64, damping: f64, mix: f64, sample_rate: u32, seed: u64) -> Self {
        let mut reverb = ReverbEffect {
            room_size,
            damping,
            mix,
            sample_rate,
            seed,
            impulse: Vec::new(),
        };
        reverb.regenerate_impulse();
        reverb
    }

    /// Room size in seconds (length of the impulse response).
    pub fn room_size(&self) -> f64 {
        self.room_size
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn impulse(&self) -> &[f64] {
        &self.impulse
    }

    pub fn set_room_size(&mut self, room_size: f64) {
        self.room_size = room_size;
        self.regenerate_impulse();
    }

    pub fn set_damping(&mut self, damping: f64) {
        self.damping = damping;
        self.regenerate_impulse();
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.regenerate_impulse();
    }

    /// Replace the random seed and rebuild the impulse response.
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.regenerate_impulse();
    }

    fn impulse_len(&self) -> usize {
        let n = (self.room_size.max(MIN_ROOM_SIZE) * self.sample_rate as f64).round();
        if n.is_finite() && n > 0.0 { n as usize } else { 0 }
    }

    fn regenerate_impulse(&mut self) {
        let len = self.impulse_len();
        let mut rng = Pcg32::seed_from_u64(self.seed);
        // t spans [0, room_size) regardless of the length floor
        let step = if len > 0 { self.room_size / len as f64 } else { 0.0 };

        self.impulse = (0..len)
            .map(|k| {
                let t = k as f64 * step;
                let noise: f64 = StandardNormal.sample(&mut rng);
                noise * (-self.damping * t).exp()
            })
            .collect();

        debug!(
            len,
            room_size = self.room_size,
            damping = self.damping,
            "reverb impulse regenerated"
        );
    }

    /// Convolve `signal` with the impulse response and blend with the dry input.
    pub fn process(&self, signal: &[f64]) -> Vec<f64> {
        let wet = convolve_truncated(signal, &self.impulse);
        let dry = 1.0 - self.mix;
        signal
            .iter()
            .zip(&wet)
            .map(|(d, w)| dry * d + self.mix * w)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(len: usize) -> Vec<f64> {
        let mut v = vec![0.0; len];
        v[0] = 1.0;
        v
    }

    #[test]
    fn impulse_is_diffused() {
        let reverb = ReverbEffect::with_seed(0.2, 0.5, 1.0, 44100, 1);
        let out = reverb.process(&impulse(44100));
        assert_eq!(out.len(), 44100);
        let tail_energy: f64 = out[1..].iter().map(|s| s * s).sum();
        assert!(tail_energy > 0.0, "reverb should spread the impulse");
        assert!(out[1..].iter().filter(|s| s.abs() > 1e-9).count() > 1000);
    }

    #[test]
    fn wet_impulse_reproduces_impulse_response() {
        let reverb = ReverbEffect::with_seed(0.05, 2.0, 1.0, 8000, 9);
        let out = reverb.process(&impulse(1000));
        let ir = reverb.impulse();
        assert_eq!(ir.len(), 400);
        for k in 0..ir.len() {
            assert!((out[k] - ir[k]).abs() < 1e-9, "sample {k}");
        }
        assert!(out[400..].iter().all(|s| s.abs() < 1e-9));
    }

    #[test]
    fn impulse_length_has_floor() {
        let reverb = ReverbEffect::with_seed(0.0, 0.5, 0.3, 44100, 3);
        assert_eq!(reverb.impulse().len(), 441);
        let reverb = ReverbEffect::with_seed(0.5, 0.5, 0.3, 44100, 3);
        assert_eq!(reverb.impulse().len(), 22050);
    }

    #[test]
    fn damping_shapes_the_tail() {
        let reverb = ReverbEffect::with_seed(1.0, 8.0, 1.0, 8000, 5);
        let ir = reverb.impulse();
        let energy = |s: &[f64]| s.iter().map(|v| v * v).sum::<f64>();
        let head = energy(&ir[..1000]);
        let tail = energy(&ir[7000..]);
        assert!(head > 100.0 * tail, "head {head} tail {tail}");
    }

    #[test]
    fn dry_mix_is_passthrough() {
        let reverb = ReverbEffect::with_seed(0.1, 0.5, 0.0, 8000, 2);
        let input: Vec<f64> = (0..500).map(|i| (i as f64 * 0.05).sin()).collect();
        let out = reverb.process(&input);
        for (o, i) in out.iter().zip(&input) {
            assert!((o - i).abs() < 1e-12);
        }
    }

    #[test]
    fn seeded_instances_agree() {
        let a = ReverbEffect::with_seed(0.1, 0.5, 0.3, 8000, 42);
        let b = ReverbEffect::with_seed(0.1, 0.5, 0.3, 8000, 42);
        assert_eq!(a.impulse(), b.impulse());
        let input = impulse(2000);
        assert_eq!(a.process(&input), b.process(&input));
    }

    #[test]
    fn parameter_change_rebuilds_impulse() {
        let mut reverb = ReverbEffect::with_seed(0.1, 0.5, 0.3, 8000, 42);
        assert_eq!(reverb.impulse().len(), 800);
        reverb.set_room_size(0.25);
        assert_eq!(reverb.impulse().len(), 2000);

        let before = reverb.impulse().to_vec();
        reverb.set_damping(3.0);
        assert_eq!(before[0], reverb.impulse()[0], "t = 0 is undamped");
        assert_ne!(before[1999], reverb.impulse()[1999]);

        reverb.set_sample_rate(4000);
        assert_eq!(reverb.impulse().len(), 1000);
    }
}
