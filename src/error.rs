//! Error types for the SONAFONT engine.

/// Engine errors.
///
/// Note resolution misses (`NoSampleFound`) are logged and swallowed by
/// the event front-end rather than surfaced; the variant exists for the
/// resolver's internal result type. A full period queue is not an error
/// at all: the blocking enqueue is the mix thread's backpressure point.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    /// Malformed SoundFont file.
    #[error("soundfont parse error: {0}")]
    SoundFontParse(String),

    /// No preset with the requested bank/preset number is loaded.
    #[error("preset not found: bank {bank}, preset {preset}")]
    PresetNotFound { bank: u16, preset: u16 },

    /// No preset or instrument zone matches the key/velocity pair.
    #[error("no sample found for key {key}, velocity {velocity}")]
    NoSampleFound { key: u8, velocity: u8 },

    /// The audio sink failed. Fatal: the engine halts.
    #[error("audio sink error: {0}")]
    Sink(String),

    /// Operation attempted on a halted engine.
    #[error("engine is halted")]
    Halted,
}

pub type Result<T> = std::result::Result<T, SynthError>;
