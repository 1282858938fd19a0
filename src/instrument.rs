//! Instrument Module
//!
//! The event front-end: one `Instrument` is a playable handle onto a
//! preset. Note-ons resolve parameters, build a voice, and register it
//! with the playback engine; note-offs release every matching voice.
//! The mix engine keeps released voices alive until their envelopes
//! finish.

use std::sync::Arc;

use crate::error::SynthError;
use crate::event::Event;
use crate::playback::AudioInterface;
use crate::soundfont::preset::resolve_note;
use crate::soundfont::SoundFont;
use crate::voice::Voice;

/// A playable preset: the target of note events.
pub struct Instrument {
    font: Arc<SoundFont>,
    preset_index: usize,
    interface: Arc<AudioInterface>,

    /// Sounding notes this instrument started: (key, playback id)
    notes: Vec<(u8, u64)>,
}

impl Instrument {
    pub(crate) fn new(
        font: Arc<SoundFont>,
        preset_index: usize,
        interface: Arc<AudioInterface>,
    ) -> Self {
        Self {
            font,
            preset_index,
            interface,
            notes: Vec::new(),
        }
    }

    /// Name of the preset this instrument plays.
    pub fn preset_name(&self) -> &str {
        &self.font.presets[self.preset_index].name
    }

    /// Number of notes this instrument considers sounding (released
    /// notes are detached immediately; the mixer owns their tail).
    pub fn active_notes(&self) -> usize {
        self.notes.len()
    }

    /// Handle a note event.
    ///
    /// A note-on that resolves to no sample (key/velocity outside every
    /// zone) is logged at warning level and dropped; the engine carries
    /// on. A note-on with velocity 0 is treated as a note-off.
    pub fn send_event(&mut self, event: Event) -> Result<(), SynthError> {
        match event {
            Event::NoteOn { key, velocity } => {
                if velocity == 0 {
                    return self.send_event(Event::NoteOff { key });
                }
                self.note_on(key, velocity)
            }
            Event::NoteOff { key } => {
                self.note_off(key);
                Ok(())
            }
        }
    }

    fn note_on(&mut self, key: u8, velocity: u8) -> Result<(), SynthError> {
        let preset = &self.font.presets[self.preset_index];
        let params = match resolve_note(
            preset,
            &self.font.instruments,
            &self.font.samples,
            key,
            velocity,
        ) {
            Ok(params) => params,
            Err(e) => {
                log::warn!("preset '{}': {}", preset.name, e);
                return Ok(());
            }
        };

        if !params.sample.link.is_mono() {
            log::warn!(
                "sample '{}' is not mono ({:?}); stereo playback is not supported",
                params.sample.name,
                params.sample.link
            );
            return Ok(());
        }

        let voice = Voice::new(key, velocity, &params, &self.interface.config().audio);
        let looping = voice.starts_looping();
        let id = self.interface.add_custom(Box::new(voice), looping)?;
        self.notes.push((key, id));
        Ok(())
    }

    fn note_off(&mut self, key: u8) {
        // Reverse walk so the most recent voice on a key releases first
        // and removal does not disturb the remainder of the scan.
        for i in (0..self.notes.len()).rev() {
            if self.notes[i].0 != key {
                continue;
            }
            let (_, id) = self.notes.remove(i);
            self.interface.release(id);
        }
    }
}
