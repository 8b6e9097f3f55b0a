//! FFT-based linear convolution.

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

/// Full linear convolution of `signal` with `kernel`, truncated to
/// `signal.len()` samples.
pub fn convolve_truncated(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }
    if kernel.is_empty() {
        return vec![0.0; signal.len()];
    }

    // Large enough that circular wrap-around never reaches the kept samples.
    let size = (signal.len() + kernel.len() - 1).next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);

    let mut a = padded(signal, size);
    let mut b = padded(kernel, size);
    forward.process(&mut a);
    forward.process(&mut b);

    for (x, y) in a.iter_mut().zip(&b) {
        *x *= *y;
    }
    inverse.process(&mut a);

    // rustfft leaves the inverse unnormalized
    let scale = 1.0 / size as f64;
    a.iter().take(signal.len()).map(|c| c.re * scale).collect()
}

fn padded(samples: &[f64], size: usize) -> Vec<Complex<f64>> {
    let mut buf: Vec<Complex<f64>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    buf.resize(size, Complex::new(0.0, 0.0));
    buf
}
