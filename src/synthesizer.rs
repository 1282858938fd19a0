//! Synthesizer Module
//!
//! The public engine surface: construct, load SoundFonts, hand out
//! instruments, halt. Construction spawns the mix and sink threads;
//! everything after that happens on the embedder's thread through the
//! shared registry.

use std::path::Path;
use std::sync::Arc;

use crate::config::SynthConfig;
use crate::error::SynthError;
use crate::instrument::Instrument;
use crate::playback::sink::SinkFactory;
use crate::playback::{AudioInterface, CpalSink};
use crate::soundfont::SoundFont;

/// The SONAFONT engine.
///
/// # Example
///
/// ```no_run
/// use sonafont::{Event, Synthesizer};
///
/// let mut synth = Synthesizer::new();
/// synth.load_soundfont("GeneralUserGS.sf2").unwrap();
/// let mut piano = synth.new_instrument(0, 0).unwrap();
/// piano.send_event(Event::note_on(60, 100)).unwrap();
/// piano.send_event(Event::note_off(60)).unwrap();
/// synth.halt();
/// ```
pub struct Synthesizer {
    config: SynthConfig,
    interface: Arc<AudioInterface>,
    fonts: Vec<Arc<SoundFont>>,
}

impl Synthesizer {
    /// Engine with the default configuration, playing through the
    /// default OS output device.
    pub fn new() -> Self {
        Self::with_config(SynthConfig::default())
    }

    /// Engine with a custom configuration, playing through the default
    /// OS output device.
    pub fn with_config(config: SynthConfig) -> Self {
        Self::with_sink(config, CpalSink::factory(config.audio))
    }

    /// Engine writing into an arbitrary sink. Tests and benches use
    /// this with `MemorySink`.
    pub fn with_sink(config: SynthConfig, sink_factory: SinkFactory) -> Self {
        let interface = Arc::new(AudioInterface::new(config, sink_factory));
        Self {
            config,
            interface,
            fonts: Vec::new(),
        }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// The playback engine, for embedders that want to mix their own
    /// static buffers next to the synthesizer's voices.
    pub fn interface(&self) -> &Arc<AudioInterface> {
        &self.interface
    }

    /// Load a SoundFont from disk. A parse failure leaves previously
    /// loaded fonts and sounding voices untouched.
    pub fn load_soundfont<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SynthError> {
        let font = SoundFont::load(path.as_ref())?;
        log::info!(
            "loaded soundfont '{}': {} presets, {} instruments, {} samples",
            font.name,
            font.presets.len(),
            font.instruments.len(),
            font.samples.len()
        );
        self.fonts.push(Arc::new(font));
        Ok(())
    }

    /// Load a SoundFont from an in-memory image.
    pub fn load_soundfont_bytes(&mut self, bytes: &[u8]) -> Result<(), SynthError> {
        let font = SoundFont::from_bytes(bytes)?;
        self.fonts.push(Arc::new(font));
        Ok(())
    }

    /// Loaded fonts, oldest first.
    pub fn fonts(&self) -> &[Arc<SoundFont>] {
        &self.fonts
    }

    /// Create a playable instrument for (bank, preset). The most
    /// recently loaded font that carries the preset wins.
    pub fn new_instrument(&self, bank: u16, preset: u16) -> Result<Instrument, SynthError> {
        for font in self.fonts.iter().rev() {
            if let Some(index) = font
                .presets
                .iter()
                .position(|p| p.bank == bank && p.preset_num == preset)
            {
                return Ok(Instrument::new(
                    Arc::clone(font),
                    index,
                    Arc::clone(&self.interface),
                ));
            }
        }
        Err(SynthError::PresetNotFound { bank, preset })
    }

    /// Stop the engine: the mix thread exits after the period in
    /// flight and the sink thread winds down. Pending notes are
    /// dropped.
    pub fn halt(&self) {
        self.interface.halt();
    }

    /// Whether the engine has stopped, by `halt()` or a sink failure.
    pub fn is_halted(&self) -> bool {
        self.interface.is_halted()
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new()
    }
}
