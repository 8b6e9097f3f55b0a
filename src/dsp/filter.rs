//! Resonant biquad low-pass filter.

use std::f64::consts::PI;

/// Smallest resonance used when deriving coefficients.
const MIN_RESONANCE: f64 = 1e-5;

/// Normalized biquad coefficients (`a0` divided out).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoefficients {
    /// Low-pass response from the Audio EQ Cookbook (Robert Bristow-Johnson).
    pub fn lowpass(cutoff: f64, resonance: f64, sample_rate: u32) -> Self {
        let w0 = 2.0 * PI * cutoff / sample_rate as f64;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * resonance.max(MIN_RESONANCE));

        let b1 = 1.0 - cos_w0;
        let b0 = b1 / 2.0;
        let b2 = b0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        BiquadCoefficients {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// A 2nd order IIR low-pass with resonance control.
///
/// Coefficients are recomputed by every setter, so `process` always runs
/// with the current parameters. Filter history is not retained between
/// `process` calls.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    cutoff: f64,
    resonance: f64,
    sample_rate: u32,
    coefficients: BiquadCoefficients,
}

impl Default for LowPassFilter {
    fn default() -> Self {
        LowPassFilter::new(1000.0, 0.707, 44100)
    }
}

impl LowPassFilter {
    /// Create a new low-pass filter.
    ///
    /// # Arguments
    /// - `cutoff`: Cutoff frequency in Hz.
    /// - `resonance`: Q factor; 0.707 is a flat (Butterworth) response.
    /// - `sample_rate`: Audio sample rate in Hz.
    pub fn new(cutoff: f64, resonance: f64, sample_rate: u32) -> Self {
        LowPassFilter {
            cutoff,
            resonance,
            sample_rate,
            coefficients: BiquadCoefficients::lowpass(cutoff, resonance, sample_rate),
        }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn resonance(&self) -> f64 {
        self.resonance
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn coefficients(&self) -> BiquadCoefficients {
        self.coefficients
    }

    pub fn set_cutoff(&mut self, cutoff: f64) {
        self.cutoff = cutoff;
        self.update_coefficients();
    }

    pub fn set_resonance(&mut self, resonance: f64) {
        self.resonance = resonance;
        self.update_coefficients();
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        self.coefficients = BiquadCoefficients::lowpass(self.cutoff, self.resonance, self.sample_rate);
    }

    /// Filter a whole buffer starting from silent history.
    ///
    /// Implements `y[n] = b0 x[n] + b1 x[n-1] + b2 x[n-2] - a1 y[n-1] - a2 y[n-2]`
    /// in Direct Form II Transposed.
    pub fn process(&self, signal: &[f64]) -> Vec<f64> {
        let BiquadCoefficients { b0, b1, b2, a1, a2 } = self.coefficients;
        let mut z1 = 0.0;
        let mut z2 = 0.0;

        signal
            .iter()
            .map(|&input| {
                let output = b0 * input + z1;
                z1 = b1 * input - a1 * output + z2;
                z2 = b2 * input - a2 * output;
                output
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::analysis::{gain_db, peak};
    use crate::dsp::oscillator::{Oscillator, Waveform};

    fn sine(freq: f64, duration: f64) -> Vec<f64> {
        Oscillator::with_seed(Waveform::Sine, freq, 44100, 0).generate(duration)
    }

    #[test]
    fn coefficients_are_normalized() {
        let c = BiquadCoefficients::lowpass(1000.0, 0.707, 44100);
        // Unity gain at DC: (b0 + b1 + b2) / (1 + a1 + a2) == 1
        let dc = (c.b0 + c.b1 + c.b2) / (1.0 + c.a1 + c.a2);
        assert!((dc - 1.0).abs() < 1e-9, "DC gain {dc}");
        assert!((c.b0 - c.b2).abs() < 1e-15);
        assert!((c.b1 - 2.0 * c.b0).abs() < 1e-15);
    }

    #[test]
    fn zero_resonance_is_floored() {
        let c = BiquadCoefficients::lowpass(1000.0, 0.0, 44100);
        for v in [c.b0, c.b1, c.b2, c.a1, c.a2] {
            assert!(v.is_finite(), "coefficient not finite: {c:?}");
        }
    }

    #[test]
    fn passes_dc() {
        let f = LowPassFilter::new(5000.0, 0.707, 44100);
        let out = f.process(&vec![1.0; 2000]);
        let last = *out.last().unwrap();
        assert!((last - 1.0).abs() < 0.001, "lowpass should pass DC, got {last}");
    }

    #[test]
    fn low_tone_passes_nearly_unchanged() {
        let f = LowPassFilter::new(5000.0, 0.707, 44100);
        let input = sine(100.0, 0.5);
        let out = f.process(&input);
        let change = gain_db(&input[2000..], &out[2000..]);
        assert!(change.abs() < 0.5, "100 Hz through 5 kHz lowpass changed by {change} dB");
    }

    #[test]
    fn high_tone_is_attenuated() {
        let f = LowPassFilter::new(500.0, 0.707, 44100);
        let input = sine(8000.0, 0.5);
        let out = f.process(&input);
        let change = gain_db(&input[2000..], &out[2000..]);
        assert!(change < -6.0, "8 kHz through 500 Hz lowpass only changed by {change} dB");
        assert!(peak(&out[2000..]) < 0.05);
    }

    #[test]
    fn setters_recompute_coefficients() {
        let mut f = LowPassFilter::default();
        let before = f.coefficients();
        f.set_cutoff(2000.0);
        assert_ne!(f.coefficients(), before);
        assert_eq!(f.coefficients(), BiquadCoefficients::lowpass(2000.0, 0.707, 44100));

        f.set_resonance(4.0);
        assert_eq!(f.coefficients(), BiquadCoefficients::lowpass(2000.0, 4.0, 44100));

        f.set_sample_rate(48000);
        assert_eq!(f.coefficients(), BiquadCoefficients::lowpass(2000.0, 4.0, 48000));
    }

    #[test]
    fn resonance_boosts_cutoff_region() {
        let input = sine(1000.0, 0.2);
        let flat = LowPassFilter::new(1000.0, 0.5, 44100).process(&input);
        let peaky = LowPassFilter::new(1000.0, 5.0, 44100).process(&input);
        assert!(peak(&peaky[2000..]) > 2.0 * peak(&flat[2000..]));
    }

    #[test]
    fn impulse_response_follows_difference_equation() {
        let f = LowPassFilter::new(3000.0, 1.2, 44100);
        let c = f.coefficients();
        let mut impulse = vec![0.0; 5];
        impulse[0] = 1.0;
        let y = f.process(&impulse);

        assert!((y[0] - c.b0).abs() < 1e-12);
        assert!((y[1] - (c.b1 - c.a1 * y[0])).abs() < 1e-12);
        assert!((y[2] - (c.b2 - c.a1 * y[1] - c.a2 * y[0])).abs() < 1e-12);
        assert!((y[3] - (-c.a1 * y[2] - c.a2 * y[1])).abs() < 1e-12);
    }

    #[test]
    fn process_is_stateless_between_calls() {
        let f = LowPassFilter::default();
        let input = sine(440.0, 0.05);
        assert_eq!(f.process(&input), f.process(&input));
        assert_eq!(f.process(&input).len(), input.len());
    }
}
