//! Delay effect — mono feedback delay line with dry/wet mix.

/// A feedback delay applied to a whole buffer.
///
/// The circular buffer lives only for the duration of one `process` call,
/// so every call starts from silence.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayEffect {
    /// Delay time in milliseconds.
    pub time: f64,
    /// Amount of the delayed signal fed back into the line (not clamped).
    pub feedback: f64,
    /// Dry/wet mix (0.0 = fully dry, 1.0 = fully wet).
    pub mix: f64,
    pub sample_rate: u32,
}

impl Default for DelayEffect {
    fn default() -> Self {
        DelayEffect::new(250.0, 0.3, 0.5, 44100)
    }
}

impl DelayEffect {
    /// Create a new delay effect.
    ///
    /// # Arguments
    /// - `time`: Delay time in milliseconds.
    /// - `feedback`: Fraction of the delayed signal written back into the line.
    /// - `mix`: Dry/wet balance.
    /// - `sample_rate`: Audio sample rate in Hz.
    pub fn new(time: f64, feedback: f64, mix: f64, sample_rate: u32) -> Self {
        DelayEffect {
            time,
            feedback,
            mix,
            sample_rate,
        }
    }

    /// Delay length in samples, `round(time / 1000 * sample_rate)`.
    ///
    /// Zero for non-positive or non-finite times.
    pub fn delay_samples(&self) -> usize {
        let n = (self.time / 1000.0 * self.sample_rate as f64).round();
        if n.is_finite() && n > 0.0 { n as usize } else { 0 }
    }

    /// Run `signal` through the delay line.
    ///
    /// A zero-length delay returns the input untouched.
    pub fn process(&self, signal: &[f64]) -> Vec<f64> {
        let delay_samples = self.delay_samples();
        if delay_samples == 0 {
            return signal.to_vec();
        }

        let mut buffer = vec![0.0; delay_samples];
        let dry = 1.0 - self.mix;

        signal
            .iter()
            .enumerate()
            .map(|(i, &input)| {
                let slot = &mut buffer[i % delay_samples];
                let delayed = *slot;
                *slot = input + delayed * self.feedback;
                dry * input + self.mix * delayed
            })
            .collect()
    }
}
