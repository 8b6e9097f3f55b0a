pub mod dsp;
pub mod error;
pub mod midi;
pub mod preset;
pub mod sink;

pub use crate::dsp::mixer::Mixer;
pub use crate::dsp::oscillator::{Oscillator, Waveform};
pub use crate::error::{Result, SynthError};
pub use crate::preset::{ParamMap, ParamValue, Patch, PresetBank};
pub use crate::sink::AudioSink;

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the duosynth-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Build a patch from a flat parameter map and render one note.
pub fn render_params(params: &ParamMap, duration: f64, note_off: Option<f64>) -> Result<(Vec<f64>, u32)> {
    let patch = Patch::from_params(params)?;
    let samples = patch.build().generate(duration, note_off);
    Ok((samples, patch.sample_rate))
}

fn params_from_js(params: JsValue) -> std::result::Result<ParamMap, JsValue> {
    serde_wasm_bindgen::from_value(params).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render one note from a preset object to mono f32 samples.
/// Returns the raw audio buffer for AudioWorklet playback.
#[wasm_bindgen]
pub fn render_patch_samples(
    params: JsValue,
    duration: f64,
    note_off: Option<f64>,
) -> std::result::Result<Vec<f32>, JsValue> {
    let params = params_from_js(params)?;
    let (samples, _) =
        render_params(&params, duration, note_off).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(samples.iter().map(|&s| s as f32).collect())
}

/// WASM-exposed: render one note from a preset object to a WAV byte array.
#[wasm_bindgen]
pub fn render_patch_wav(
    params: JsValue,
    duration: f64,
    note_off: Option<f64>,
) -> std::result::Result<Vec<u8>, JsValue> {
    let params = params_from_js(params)?;
    let (samples, sample_rate) =
        render_params(&params, duration, note_off).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(dsp::renderer::render_wav(&samples, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_params_uses_patch_rate() {
        let mut params = ParamMap::new();
        params.insert("sample_rate".into(), ParamValue::from(8000.0));
        params.insert("osc1.waveform".into(), ParamValue::from("square"));

        let (samples, rate) = render_params(&params, 0.5, Some(0.25)).unwrap();
        assert_eq!(rate, 8000);
        assert_eq!(samples.len(), 4000);
        assert!(samples.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn render_params_reports_bad_preset() {
        let mut params = ParamMap::new();
        params.insert("osc1.waveform".into(), ParamValue::from("kazoo"));
        assert!(matches!(
            render_params(&params, 0.1, None),
            Err(SynthError::InvalidParameter { .. })
        ));
    }
}
