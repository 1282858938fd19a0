//! Modulator Module
//!
//! Evaluates SF2 modulators: MIDI-style controller inputs are
//! normalized, shaped by one of four curves, combined with an amount
//! source, scaled, transformed, and summed into a scratch copy of the
//! voice's generator map. The resolver's map stays immutable so the
//! scratch can always be re-derived from the base.

use crate::soundfont::definitions::{
    GeneratorMap, ModController, ModCurve, ModDirection, ModPolarity, ModSource, ModTransform,
    Modulator,
};

/// Latest controller input values feeding the modulator engine.
///
/// All inputs are 7-bit (0..=127); the pitch wheel is centred at 64.
/// Note-on velocity and key number are fixed for a voice's lifetime;
/// the rest are sampled when the voice starts (post-note-on controller
/// changes are deferred in v1).
#[derive(Debug, Clone)]
pub struct ControllerState {
    pub note_on_velocity: u8,
    pub note_on_key: u8,
    pub poly_pressure: u8,
    pub channel_pressure: u8,
    pub pitch_wheel: u8,
    pub pitch_wheel_sensitivity: u8,

    /// MIDI continuous controller values
    pub cc: [u8; 128],
}

impl ControllerState {
    /// State for a fresh note: pressure controllers at rest, wheel
    /// centred, two-semitone wheel sensitivity.
    pub fn for_note(key: u8, velocity: u8) -> Self {
        Self {
            note_on_velocity: velocity,
            note_on_key: key,
            poly_pressure: 0,
            channel_pressure: 0,
            pitch_wheel: 64,
            pitch_wheel_sensitivity: 2,
            cc: [0; 128],
        }
    }

    /// Raw 7-bit value for a controller, or `None` for sources that
    /// have no input (noController maps to the constant 1, links are
    /// not modelled).
    pub fn value_of(&self, controller: ModController) -> Option<u8> {
        match controller {
            ModController::NoController | ModController::Link => None,
            ModController::NoteOnVelocity => Some(self.note_on_velocity),
            ModController::NoteOnKeyNumber => Some(self.note_on_key),
            ModController::PolyPressure => Some(self.poly_pressure),
            ModController::ChannelPressure => Some(self.channel_pressure),
            ModController::PitchWheel => Some(self.pitch_wheel),
            ModController::PitchWheelSensitivity => Some(self.pitch_wheel_sensitivity),
            ModController::Midi(n) => Some(self.cc[(n & 0x7F) as usize]),
        }
    }
}

/// Shape a normalized input x in [0, 1] (SF2 9.5.1 curve family).
fn curve(curve: ModCurve, x: f64) -> f64 {
    match curve {
        ModCurve::Linear => x,
        ModCurve::Convex => (9.0 * x + 1.0).log10(),
        ModCurve::Concave => 1.0 - (9.0 * (1.0 - x) + 1.0).log10(),
        ModCurve::Switch => {
            if x < 0.5 {
                0.0
            } else {
                1.0
            }
        }
    }
}

/// Map a raw 7-bit controller value through a source descriptor.
///
/// Unipolar sources land in [0, 1); bipolar sources split at 64 into
/// [-1, 1); a negative direction flips the mapping.
pub fn map_source(source: ModSource, value: u8) -> f64 {
    match source.polarity {
        ModPolarity::Unipolar => {
            let mut x = value as f64 / 128.0;
            if source.direction == ModDirection::Negative {
                x = 1.0 - x;
            }
            curve(source.curve, x)
        }
        ModPolarity::Bipolar => {
            let mapped = if value <= 64 {
                -curve(source.curve, (64 - value) as f64 / 64.0)
            } else {
                curve(source.curve, (value - 64) as f64 / 64.0)
            };
            if source.direction == ModDirection::Negative {
                -mapped
            } else {
                mapped
            }
        }
    }
}

/// Evaluate one modulator against the controller state, producing the
/// value to add to its destination generator.
pub fn evaluate(modulator: &Modulator, controllers: &ControllerState) -> f64 {
    let primary = match controllers.value_of(modulator.source.controller) {
        Some(v) => map_source(modulator.source, v),
        None => 1.0,
    };
    let secondary = match controllers.value_of(modulator.amount_source.controller) {
        Some(v) => map_source(modulator.amount_source, v),
        None => 1.0,
    };

    let pre = primary * secondary * modulator.amount as f64;
    match modulator.transform {
        ModTransform::Linear => pre,
        ModTransform::AbsoluteValue => pre.abs(),
    }
}

/// Sum every modulator's contribution into a scratch copy of the base
/// generator map. Derived scalars (cutoff, attenuation, pitch ratio)
/// are recomputed by the voice from the returned map.
pub fn apply_modulators(
    base: &GeneratorMap,
    mods: &[Modulator],
    controllers: &ControllerState,
) -> GeneratorMap {
    let mut scratch = base.clone();
    for modulator in mods {
        scratch.add_f64(modulator.dest, evaluate(modulator, controllers));
    }
    scratch
}
