//! Buffer analysis — spectral peak and level measurements.
//!
//! Used to verify rendered audio (pitch of an oscillator, attenuation of a
//! filter) and handy for any caller that wants a quick look at a buffer.

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

/// Frequency in Hz of the strongest bin of the buffer's real spectrum.
///
/// Bins are spaced `sample_rate / len` apart, so a one-second buffer has
/// 1 Hz resolution. Returns 0.0 for an empty buffer.
pub fn dominant_frequency(samples: &[f64], sample_rate: u32) -> f64 {
    let n = samples.len();
    if n == 0 {
        return 0.0;
    }

    let mut spectrum: Vec<Complex<f64>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    FftPlanner::<f64>::new().plan_fft_forward(n).process(&mut spectrum);

    // Only the non-negative half is meaningful for a real input.
    let (bin, _) = spectrum[..n / 2 + 1]
        .iter()
        .map(|c| c.norm_sqr())
        .enumerate()
        .fold((0, f64::MIN), |best, (i, mag)| if mag > best.1 { (i, mag) } else { best });

    bin as f64 * sample_rate as f64 / n as f64
}

/// Root-mean-square level.
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64).sqrt()
}

/// Largest absolute sample value.
pub fn peak(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()))
}

/// Level change in dB from `reference` to `processed`, measured by RMS.
pub fn gain_db(reference: &[f64], processed: &[f64]) -> f64 {
    20.0 * (rms(processed) / rms(reference)).log10()
}
