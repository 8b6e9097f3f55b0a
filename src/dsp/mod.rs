//! DSP — whole-buffer synthesis and processing.
//!
//! Every component renders or processes one complete note buffer per call.
//! Nothing streams and nothing carries state between calls apart from the
//! component's own parameters.

pub mod analysis;
pub mod convolve;
pub mod delay;
pub mod envelope;
pub mod filter;
pub mod mixer;
pub mod oscillator;
pub mod renderer;
pub mod reverb;
