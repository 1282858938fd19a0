//! SONAFONT - SoundFont 2 Software Synthesizer
//!
//! A real-time SoundFont 2.01 synthesizer: note events in, a
//! continuous 16-bit PCM stream out to the audio device.
//!
//! # Architecture
//!
//! The engine is built from a handful of interconnected modules:
//! - **soundfont**: reads .sf2 files and resolves note-on parameters
//!   from preset and instrument zones
//! - **envelope**: the six-stage DAHDSR volume envelope
//! - **modulator**: routes controller values through SF2 curves into
//!   generator offsets
//! - **voice**: renders one sounding note (interpolation, pitch,
//!   filtering, looping)
//! - **playback**: the buffer registry, the mix thread, and the sinks
//! - **instrument** / **synthesizer**: the embedder-facing surface
//!
//! # Example
//!
//! ```no_run
//! use sonafont::{Event, Synthesizer};
//!
//! let mut synth = Synthesizer::new();
//! synth.load_soundfont("GeneralUserGS.sf2").unwrap();
//! let mut piano = synth.new_instrument(0, 0).unwrap();
//! piano.send_event(Event::note_on(60, 100)).unwrap(); // C4
//! ```

pub mod config;
pub mod envelope;
pub mod error;
pub mod event;
pub mod instrument;
pub mod modulator;
pub mod playback;
pub mod soundfont;
pub mod synthesizer;
pub mod voice;

pub use config::{AudioConfig, SynthConfig};
pub use envelope::{Envelope, EnvelopeStage};
pub use error::SynthError;
pub use event::Event;
pub use instrument::Instrument;
pub use soundfont::SoundFont;
pub use synthesizer::Synthesizer;
pub use voice::Voice;
