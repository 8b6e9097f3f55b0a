//! Presets — flat parameter maps and the typed patch built from them.
//!
//! A preset is stored as a flat string-keyed map (`"osc1.frequency": 440`,
//! `"osc1.waveform": "sawtooth"`...). [`Patch`] is the validated, typed form of
//! such a map and knows how to build a [`Mixer`]. A [`PresetBank`] is a set
//! of named maps persisted as one JSON document.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dsp::delay::DelayEffect;
use crate::dsp::envelope::Envelope;
use crate::dsp::filter::LowPassFilter;
use crate::dsp::mixer::Mixer;
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::dsp::reverb::ReverbEffect;
use crate::error::{Result, SynthError};

// ── Parameter values ────────────────────────────────────────

/// A single preset value: numeric, or text (waveform names).
///
/// Non-negative JSON integers land in `Integer` so that 64-bit seeds keep
/// every bit; everything else numeric is a `Number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(u64),
    Number(f64),
    Text(String),
}

impl ParamValue {
    /// Numeric view; numeric strings are accepted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Integer(n) => Some(*n as f64),
            ParamValue::Number(n) => Some(*n),
            ParamValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Exact non-negative integer view.
    ///
    /// Floats only qualify while they are whole and no larger than 2^53,
    /// past which they cannot name every integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ParamValue::Integer(n) => Some(*n),
            ParamValue::Number(n) => {
                (*n >= 0.0 && n.fract() == 0.0 && *n <= MAX_EXACT_FLOAT).then_some(*n as u64)
            }
            ParamValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            ParamValue::Integer(_) | ParamValue::Number(_) => None,
        }
    }
}

/// 2^53, the largest float below which every integer is representable.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Integer(n) => write!(f, "{n}"),
            ParamValue::Number(n) => write!(f, "{n}"),
            ParamValue::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<u64> for ParamValue {
    fn from(n: u64) -> Self {
        ParamValue::Integer(n)
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Number(n)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<Waveform> for ParamValue {
    fn from(w: Waveform) -> Self {
        ParamValue::Text(w.name().to_string())
    }
}

/// Flat parameter name → value map, the persisted form of a preset.
pub type ParamMap = BTreeMap<String, ParamValue>;

const OSC_KEYS: [&str; 4] = ["waveform", "frequency", "detune", "volume"];
const ENVELOPE_KEYS: [&str; 4] = ["attack", "decay", "sustain", "release"];
const FILTER_KEYS: [&str; 2] = ["cutoff", "resonance"];
const DELAY_KEYS: [&str; 3] = ["time", "feedback", "mix"];
const REVERB_KEYS: [&str; 3] = ["room_size", "damping", "mix"];

fn is_known_key(key: &str) -> bool {
    if key == "sample_rate" || key == "seed" {
        return true;
    }
    let Some((section, name)) = key.split_once('.') else {
        return false;
    };
    let names: &[&str] = match section {
        "osc1" | "osc2" => &OSC_KEYS,
        "envelope" => &ENVELOPE_KEYS,
        "filter" => &FILTER_KEYS,
        "delay" => &DELAY_KEYS,
        "reverb" => &REVERB_KEYS,
        _ => return false,
    };
    names.contains(&name)
}

/// Typed lookups over a [`ParamMap`], reporting bad values by key.
struct ParamReader<'a> {
    params: &'a ParamMap,
}

impl ParamReader<'_> {
    fn number(&self, key: &str, default: f64) -> Result<f64> {
        match self.params.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_f64()
                .filter(|n| n.is_finite())
                .ok_or_else(|| SynthError::invalid(key, value)),
        }
    }

    fn waveform(&self, key: &str) -> Result<Waveform> {
        match self.params.get(key) {
            None => Ok(Waveform::default()),
            Some(value) => value
                .as_str()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| SynthError::invalid(key, value)),
        }
    }

    /// Non-negative integer no larger than `max`.
    fn whole(&self, key: &str, max: u64) -> Result<Option<u64>> {
        let Some(value) = self.params.get(key) else {
            return Ok(None);
        };
        value
            .as_u64()
            .filter(|n| *n <= max)
            .map(Some)
            .ok_or_else(|| SynthError::invalid(key, value))
    }

    /// Misspelled keys do not count towards attaching a section.
    fn has_section(&self, section: &str) -> bool {
        self.params.keys().any(|k| {
            is_known_key(k) && k.split_once('.').is_some_and(|(s, _)| s == section)
        })
    }
}

// ── Component settings ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct OscillatorConfig {
    pub waveform: Waveform,
    pub frequency: f64,
    pub detune: f64,
    pub volume: f64,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        OscillatorConfig {
            waveform: Waveform::Sine,
            frequency: 440.0,
            detune: 0.0,
            volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeConfig {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        EnvelopeConfig {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    pub cutoff: f64,
    pub resonance: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            cutoff: 1000.0,
            resonance: 0.707,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelayConfig {
    /// Milliseconds.
    pub time: f64,
    pub feedback: f64,
    pub mix: f64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        DelayConfig {
            time: 250.0,
            feedback: 0.3,
            mix: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReverbConfig {
    /// Seconds.
    pub room_size: f64,
    pub damping: f64,
    pub mix: f64,
}

impl Default for ReverbConfig {
    fn default() -> Self {
        ReverbConfig {
            room_size: 0.5,
            damping: 0.5,
            mix: 0.3,
        }
    }
}

// ── Patch ───────────────────────────────────────────────────

/// Complete, validated synthesizer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub sample_rate: u32,
    /// Seed for noise and reverb; `None` draws a fresh one per build.
    pub seed: Option<u64>,
    pub osc1: OscillatorConfig,
    pub osc2: OscillatorConfig,
    pub envelope: EnvelopeConfig,
    pub filter: Option<FilterConfig>,
    pub delay: Option<DelayConfig>,
    pub reverb: Option<ReverbConfig>,
}

impl Default for Patch {
    fn default() -> Self {
        Patch {
            sample_rate: 44100,
            seed: None,
            osc1: OscillatorConfig::default(),
            osc2: OscillatorConfig::default(),
            envelope: EnvelopeConfig::default(),
            filter: None,
            delay: None,
            reverb: None,
        }
    }
}

impl Patch {
    /// Validate a flat parameter map.
    ///
    /// Missing keys fall back to defaults. An optional stage is attached when
    /// any key of its section is present. Unknown keys are ignored.
    pub fn from_params(params: &ParamMap) -> Result<Patch> {
        for key in params.keys().filter(|k| !is_known_key(k)) {
            warn!(key = %key, "ignoring unknown preset parameter");
        }

        let r = ParamReader { params };

        let sample_rate = match r.whole("sample_rate", u32::MAX as u64)? {
            Some(0) => return Err(SynthError::invalid("sample_rate", 0)),
            Some(n) => n as u32,
            None => 44100,
        };
        let seed = r.whole("seed", u64::MAX)?;

        let osc = |section: &str| -> Result<OscillatorConfig> {
            let d = OscillatorConfig::default();
            Ok(OscillatorConfig {
                waveform: r.waveform(&format!("{section}.waveform"))?,
                frequency: r.number(&format!("{section}.frequency"), d.frequency)?,
                detune: r.number(&format!("{section}.detune"), d.detune)?,
                volume: r.number(&format!("{section}.volume"), d.volume)?,
            })
        };

        let env = EnvelopeConfig::default();
        let envelope = EnvelopeConfig {
            attack: r.number("envelope.attack", env.attack)?,
            decay: r.number("envelope.decay", env.decay)?,
            sustain: r.number("envelope.sustain", env.sustain)?,
            release: r.number("envelope.release", env.release)?,
        };

        let filter = if r.has_section("filter") {
            let d = FilterConfig::default();
            Some(FilterConfig {
                cutoff: r.number("filter.cutoff", d.cutoff)?,
                resonance: r.number("filter.resonance", d.resonance)?,
            })
        } else {
            None
        };

        let delay = if r.has_section("delay") {
            let d = DelayConfig::default();
            Some(DelayConfig {
                time: r.number("delay.time", d.time)?,
                feedback: r.number("delay.feedback", d.feedback)?,
                mix: r.number("delay.mix", d.mix)?,
            })
        } else {
            None
        };

        let reverb = if r.has_section("reverb") {
            let d = ReverbConfig::default();
            Some(ReverbConfig {
                room_size: r.number("reverb.room_size", d.room_size)?,
                damping: r.number("reverb.damping", d.damping)?,
                mix: r.number("reverb.mix", d.mix)?,
            })
        } else {
            None
        };

        Ok(Patch {
            sample_rate,
            seed,
            osc1: osc("osc1")?,
            osc2: osc("osc2")?,
            envelope,
            filter,
            delay,
            reverb,
        })
    }

    /// Flatten to a parameter map, writing every key of every attached section.
    pub fn to_params(&self) -> ParamMap {
        let mut params = ParamMap::new();
        let mut put = |key: &str, value: ParamValue| {
            params.insert(key.to_string(), value);
        };

        put("sample_rate", (self.sample_rate as u64).into());
        if let Some(seed) = self.seed {
            put("seed", seed.into());
        }
        for (section, osc) in [("osc1", &self.osc1), ("osc2", &self.osc2)] {
            put(&format!("{section}.waveform"), osc.waveform.into());
            put(&format!("{section}.frequency"), osc.frequency.into());
            put(&format!("{section}.detune"), osc.detune.into());
            put(&format!("{section}.volume"), osc.volume.into());
        }
        put("envelope.attack", self.envelope.attack.into());
        put("envelope.decay", self.envelope.decay.into());
        put("envelope.sustain", self.envelope.sustain.into());
        put("envelope.release", self.envelope.release.into());
        if let Some(f) = &self.filter {
            put("filter.cutoff", f.cutoff.into());
            put("filter.resonance", f.resonance.into());
        }
        if let Some(d) = &self.delay {
            put("delay.time", d.time.into());
            put("delay.feedback", d.feedback.into());
            put("delay.mix", d.mix.into());
        }
        if let Some(r) = &self.reverb {
            put("reverb.room_size", r.room_size.into());
            put("reverb.damping", r.damping.into());
            put("reverb.mix", r.mix.into());
        }
        params
    }

    /// Snapshot the current settings of a mixer.
    ///
    /// The seed is carried over from [`Mixer::seed`], so rebuilding a
    /// captured patch reproduces the mixer's noise and reverb.
    pub fn capture(mixer: &Mixer) -> Patch {
        let osc = |o: &Oscillator| OscillatorConfig {
            waveform: o.waveform,
            frequency: o.frequency,
            detune: o.detune,
            volume: o.volume,
        };
        Patch {
            sample_rate: mixer.sample_rate,
            seed: mixer.seed,
            osc1: osc(&mixer.osc1),
            osc2: osc(&mixer.osc2),
            envelope: EnvelopeConfig {
                attack: mixer.envelope.attack,
                decay: mixer.envelope.decay,
                sustain: mixer.envelope.sustain,
                release: mixer.envelope.release,
            },
            filter: mixer.filter.as_ref().map(|f| FilterConfig {
                cutoff: f.cutoff(),
                resonance: f.resonance(),
            }),
            delay: mixer.delay.as_ref().map(|d| DelayConfig {
                time: d.time,
                feedback: d.feedback,
                mix: d.mix,
            }),
            reverb: mixer.reverb.as_ref().map(|r| ReverbConfig {
                room_size: r.room_size(),
                damping: r.damping(),
                mix: r.mix,
            }),
        }
    }

    /// Construct the signal chain; every component runs at `sample_rate`.
    pub fn build(&self) -> Mixer {
        let sr = self.sample_rate;
        let seed = self.seed.unwrap_or_else(rand::random);
        let [osc1_seed, osc2_seed, reverb_seed] = Mixer::seed_streams(seed);

        let osc = |c: &OscillatorConfig, seed: u64| {
            let mut o = Oscillator::with_seed(c.waveform, c.frequency, sr, seed);
            o.detune = c.detune;
            o.volume = c.volume;
            o
        };
        let e = &self.envelope;

        let mut mixer = Mixer::new(
            osc(&self.osc1, osc1_seed),
            osc(&self.osc2, osc2_seed),
            Envelope::adsr(e.attack, e.decay, e.sustain, e.release, sr),
            sr,
        );
        mixer.filter = self
            .filter
            .as_ref()
            .map(|f| LowPassFilter::new(f.cutoff, f.resonance, sr));
        mixer.delay = self
            .delay
            .as_ref()
            .map(|d| DelayEffect::new(d.time, d.feedback, d.mix, sr));
        mixer.reverb = self
            .reverb
            .as_ref()
            .map(|r| ReverbEffect::with_seed(r.room_size, r.damping, r.mix, sr, reverb_seed));
        mixer.seed = Some(seed);
        mixer
    }
}

// ── Preset bank ─────────────────────────────────────────────

/// Named presets, persisted as a JSON object of flat parameter maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetBank {
    presets: BTreeMap<String, ParamMap>,
}

impl PresetBank {
    pub fn new() -> Self {
        PresetBank::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bank = PresetBank::from_json(&std::fs::read_to_string(path)?)?;
        info!(path = %path.display(), presets = bank.len(), "loaded preset bank");
        Ok(bank)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), presets = self.len(), "saved preset bank");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn params(&self, name: &str) -> Option<&ParamMap> {
        self.presets.get(name)
    }

    /// Validate and return the named preset.
    pub fn patch(&self, name: &str) -> Result<Patch> {
        let params = self
            .presets
            .get(name)
            .ok_or_else(|| SynthError::UnknownPreset(name.to_string()))?;
        Patch::from_params(params)
    }

    pub fn insert(&mut self, name: impl Into<String>, patch: &Patch) {
        self.presets.insert(name.into(), patch.to_params());
    }

    pub fn insert_params(&mut self, name: impl Into<String>, params: ParamMap) {
        self.presets.insert(name.into(), params);
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamMap> {
        self.presets.remove(name)
    }
}

// ── Tests ───────────────────────────────────────────────────
