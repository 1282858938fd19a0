//! Note events accepted by the instrument front-end.

/// A note event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Start a note. `key` is the MIDI key number (0-127); `velocity`
    /// is the note-on velocity (1-127).
    NoteOn { key: u8, velocity: u8 },

    /// Release a note. Every sounding voice with a matching key enters
    /// its release stage.
    NoteOff { key: u8 },
}

impl Event {
    /// Convenience constructor for note-on.
    pub fn note_on(key: u8, velocity: u8) -> Self {
        Event::NoteOn { key, velocity }
    }

    /// Convenience constructor for note-off.
    pub fn note_off(key: u8) -> Self {
        Event::NoteOff { key }
    }
}
