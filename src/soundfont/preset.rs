//! Presets, instruments, zones, and note parameter resolution.
//!
//! A preset owns key/velocity-gated zones whose generators point at an
//! instrument; instrument zones point at samples. Resolving a note-on
//! composes the matching zones with the global layers and the SF2
//! defaults into one effective generator map plus a modulator list.

use std::sync::Arc;

use crate::error::SynthError;
use crate::soundfont::definitions::{
    Generator, GeneratorMap, ModSource, ModTransform, Modulator, SampleLink,
};

/// One sample's PCM and header metadata, immutable once loaded.
#[derive(Debug, Clone)]
pub struct SampleData {
    pub name: String,

    /// Mono 16-bit PCM, sliced out of the file's sample pool
    pub data: Arc<Vec<i16>>,

    /// Native sample rate in Hz
    pub sample_rate: u32,

    /// Original MIDI key this sample was recorded at
    pub pitch: u8,

    /// Tuning correction in cents
    pub pitch_correction: i8,

    /// Loop start, in frames relative to `data`
    pub loop_start: usize,

    /// Loop end, in frames relative to `data`
    pub loop_end: usize,

    pub link: SampleLink,
}

/// A generator/modulator bundle gated by key and velocity ranges.
#[derive(Debug, Clone)]
pub struct Zone {
    /// Generators in file order, terminal generator included
    pub gens: Vec<(Generator, i16)>,

    /// keyRange low/high (inclusive)
    pub key_range: (u8, u8),

    /// velRange low/high (inclusive)
    pub vel_range: (u8, u8),

    pub mods: Vec<Modulator>,
}

impl Zone {
    pub fn new() -> Self {
        Self {
            gens: Vec::new(),
            key_range: (0, 127),
            vel_range: (0, 127),
            mods: Vec::new(),
        }
    }

    /// Whether this zone is gated in for the given key and velocity.
    pub fn contains(&self, key: u8, velocity: u8) -> bool {
        key >= self.key_range.0
            && key <= self.key_range.1
            && velocity >= self.vel_range.0
            && velocity <= self.vel_range.1
    }

    /// Last stored value for a generator, if the zone sets it.
    pub fn get(&self, gen: Generator) -> Option<i16> {
        self.gens
            .iter()
            .rev()
            .find(|(g, _)| *g == gen)
            .map(|(_, v)| *v)
    }
}

impl Default for Zone {
    fn default() -> Self {
        Self::new()
    }
}

/// A user-selectable sound: bank/preset number plus zones referencing
/// instruments.
#[derive(Debug, Clone)]
pub struct Preset {
    pub name: String,
    pub bank: u16,
    pub preset_num: u16,
    pub global: Option<Zone>,
    pub zones: Vec<Zone>,
}

/// An instrument layer: zones referencing samples.
#[derive(Debug, Clone)]
pub struct InstrumentPatch {
    pub name: String,
    pub global: Option<Zone>,
    pub zones: Vec<Zone>,
}

impl Preset {
    /// First local zone containing (key, velocity).
    pub fn matching_zone(&self, key: u8, velocity: u8) -> Option<&Zone> {
        self.zones.iter().find(|z| z.contains(key, velocity))
    }
}

impl InstrumentPatch {
    pub fn matching_zone(&self, key: u8, velocity: u8) -> Option<&Zone> {
        self.zones.iter().find(|z| z.contains(key, velocity))
    }
}

/// Everything the voice needs for one note: the sample, the composed
/// generator map, and the effective modulator list.
#[derive(Debug, Clone)]
pub struct NoteParams {
    pub sample: Arc<SampleData>,
    pub gens: GeneratorMap,
    pub mods: Vec<Modulator>,
}

/// The SF2 default modulators this engine models (spec 8.4): note-on
/// velocity driving attenuation (concave, 960 cB full scale) and the
/// low-pass cutoff (linear, -2400 cents). Instrument and preset
/// modulators supersede these by identity.
pub fn default_modulators() -> Vec<Modulator> {
    vec![
        Modulator {
            source: ModSource::from_raw(0x0502),
            amount_source: ModSource::none(),
            dest: Generator::InitialAttenuation,
            amount: 960,
            transform: ModTransform::Linear,
        },
        Modulator {
            source: ModSource::from_raw(0x0102),
            amount_source: ModSource::none(),
            dest: Generator::InitialFilterFc,
            amount: -2400,
            transform: ModTransform::Linear,
        },
    ]
}

/// Compose the effective generator map for a (preset zone, instrument
/// zone) pair: SF2 defaults, overlaid by the instrument layer (local
/// zone over instrument global), then the preset layer added relatively
/// (local zone over preset global). Non-additive generators come only
/// from their defining zone.
pub fn compose_generators(
    preset_zone: &Zone,
    preset_global: Option<&Zone>,
    inst_zone: &Zone,
    inst_global: Option<&Zone>,
) -> GeneratorMap {
    let mut map = GeneratorMap::default();

    for id in 0..super::definitions::GENERATOR_SLOTS as u16 {
        let gen = match Generator::from_id(id) {
            Some(g) => g,
            None => continue,
        };
        if gen.is_range() {
            continue;
        }

        let inst_val = inst_zone
            .get(gen)
            .or_else(|| inst_global.and_then(|z| z.get(gen)));
        if let Some(v) = inst_val {
            map.set(gen, v);
        }

        if gen.is_non_additive() {
            continue;
        }
        let preset_val = preset_zone
            .get(gen)
            .or_else(|| preset_global.and_then(|z| z.get(gen)));
        if let Some(v) = preset_val {
            map.add(gen, v);
        }
    }

    // Ranges gate zone selection and are not additive; the effective
    // map carries the instrument zone's.
    map.key_range = inst_zone.key_range;
    map.vel_range = inst_zone.vel_range;

    map
}

/// Merge modulator lists per the SF2 supersession rules: defaults,
/// then instrument-level (global before local, so local wins), then
/// preset-level entries which replace a matching identity outright.
pub fn compose_modulators(
    preset_zone: &Zone,
    preset_global: Option<&Zone>,
    inst_zone: &Zone,
    inst_global: Option<&Zone>,
) -> Vec<Modulator> {
    let mut merged = default_modulators();

    let mut supersede = |m: &Modulator| {
        if let Some(existing) = merged.iter_mut().find(|e| e.identity() == m.identity()) {
            *existing = *m;
        } else {
            merged.push(*m);
        }
    };

    if let Some(global) = inst_global {
        for m in &global.mods {
            supersede(m);
        }
    }
    for m in &inst_zone.mods {
        supersede(m);
    }
    if let Some(global) = preset_global {
        for m in &global.mods {
            supersede(m);
        }
    }
    for m in &preset_zone.mods {
        supersede(m);
    }

    merged
}

/// Resolve a note-on against a preset: select zones, compose the
/// generator map and modulator list, and look up the sample.
pub fn resolve_note(
    preset: &Preset,
    instruments: &[InstrumentPatch],
    samples: &[Arc<SampleData>],
    key: u8,
    velocity: u8,
) -> Result<NoteParams, SynthError> {
    let miss = || SynthError::NoSampleFound { key, velocity };

    let preset_zone = preset
        .matching_zone(key, velocity)
        .or(preset.global.as_ref())
        .ok_or_else(miss)?;

    let inst_index = preset_zone
        .get(Generator::Instrument)
        .or_else(|| preset.global.as_ref().and_then(|z| z.get(Generator::Instrument)))
        .ok_or_else(miss)?;
    let instrument = instruments.get(inst_index as usize).ok_or_else(miss)?;

    let inst_zone = instrument
        .matching_zone(key, velocity)
        .or(instrument.global.as_ref())
        .ok_or_else(miss)?;

    let sample_index = inst_zone
        .get(Generator::SampleId)
        .or_else(|| {
            instrument
                .global
                .as_ref()
                .and_then(|z| z.get(Generator::SampleId))
        })
        .ok_or_else(miss)?;
    let sample = samples.get(sample_index as usize).cloned().ok_or_else(miss)?;

    let gens = compose_generators(
        preset_zone,
        preset.global.as_ref(),
        inst_zone,
        instrument.global.as_ref(),
    );
    let mods = compose_modulators(
        preset_zone,
        preset.global.as_ref(),
        inst_zone,
        instrument.global.as_ref(),
    );

    Ok(NoteParams { sample, gens, mods })
}
