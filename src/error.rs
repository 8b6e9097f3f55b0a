use thiserror::Error;

/// Errors surfaced by the synthesizer core.
///
/// DSP operations on already-constructed components are infallible; errors
/// come from turning untyped input (preset maps, waveform names) into
/// components, and from the output sinks.
#[derive(Debug, Error)]
pub enum SynthError {
    /// A parameter value could not be turned into a valid component setting.
    #[error("invalid parameter '{name}': {value}")]
    InvalidParameter { name: String, value: String },

    /// A named preset was not present in the bank.
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),

    /// Preset JSON could not be read or written.
    #[error("preset format error: {0}")]
    Preset(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The audio output device refused or aborted playback.
    #[error("playback error: {0}")]
    Playback(String),
}

impl SynthError {
    pub fn invalid(name: impl Into<String>, value: impl ToString) -> Self {
        SynthError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SynthError>;
