//! SoundFont 2.01 Definitions
//!
//! The closed vocabulary of the SF2 format: generator identifiers
//! (spec 8.1.3), sample link types (spec 7.10), modulator source
//! descriptors (spec 8.2), and the generator defaults table. Everything
//! here is data; behavior lives in the resolver and the voice.

/// SF2 generator identifiers (SoundFont 2.01 spec, section 8.1.3).
///
/// Discriminants are the on-disk generator ids. Ids absent from the
/// enum (14, 18-20, 42, 49, 55, 59-60) are unused or reserved by the
/// spec and are skipped when reading files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Generator {
    StartAddrsOffset = 0,
    EndAddrsOffset = 1,
    StartloopAddrsOffset = 2,
    EndloopAddrsOffset = 3,
    StartAddrsCoarseOffset = 4,
    ModLfoToPitch = 5,
    VibLfoToPitch = 6,
    ModEnvToPitch = 7,
    InitialFilterFc = 8,
    InitialFilterQ = 9,
    ModLfoToFilterFc = 10,
    ModEnvToFilterFc = 11,
    EndAddrsCoarseOffset = 12,
    ModLfoToVolume = 13,
    ChorusEffectsSend = 15,
    ReverbEffectsSend = 16,
    Pan = 17,
    DelayModLfo = 21,
    FreqModLfo = 22,
    DelayVibLfo = 23,
    FreqVibLfo = 24,
    DelayModEnv = 25,
    AttackModEnv = 26,
    HoldModEnv = 27,
    DecayModEnv = 28,
    SustainModEnv = 29,
    ReleaseModEnv = 30,
    KeynumToModEnvHold = 31,
    KeynumToModEnvDecay = 32,
    DelayVolEnv = 33,
    AttackVolEnv = 34,
    HoldVolEnv = 35,
    DecayVolEnv = 36,
    SustainVolEnv = 37,
    ReleaseVolEnv = 38,
    KeynumToVolEnvHold = 39,
    KeynumToVolEnvDecay = 40,
    Instrument = 41,
    KeyRange = 43,
    VelRange = 44,
    StartloopAddrsCoarseOffset = 45,
    Keynum = 46,
    Velocity = 47,
    InitialAttenuation = 48,
    EndloopAddrsCoarseOffset = 50,
    CoarseTune = 51,
    FineTune = 52,
    SampleId = 53,
    SampleModes = 54,
    ScaleTuning = 56,
    ExclusiveClass = 57,
    OverridingRootKey = 58,
}

/// Highest generator id plus one; sizes the dense value table.
pub const GENERATOR_SLOTS: usize = 59;

impl Generator {
    /// Decode an on-disk generator id. Returns `None` for ids SF2
    /// leaves unused (readers must skip them, not fail).
    pub fn from_id(id: u16) -> Option<Self> {
        use Generator::*;
        Some(match id {
            0 => StartAddrsOffset,
            1 => EndAddrsOffset,
            2 => StartloopAddrsOffset,
            3 => EndloopAddrsOffset,
            4 => StartAddrsCoarseOffset,
            5 => ModLfoToPitch,
            6 => VibLfoToPitch,
            7 => ModEnvToPitch,
            8 => InitialFilterFc,
            9 => InitialFilterQ,
            10 => ModLfoToFilterFc,
            11 => ModEnvToFilterFc,
            12 => EndAddrsCoarseOffset,
            13 => ModLfoToVolume,
            15 => ChorusEffectsSend,
            16 => ReverbEffectsSend,
            17 => Pan,
            21 => DelayModLfo,
            22 => FreqModLfo,
            23 => DelayVibLfo,
            24 => FreqVibLfo,
            25 => DelayModEnv,
            26 => AttackModEnv,
            27 => HoldModEnv,
            28 => DecayModEnv,
            29 => SustainModEnv,
            30 => ReleaseModEnv,
            31 => KeynumToModEnvHold,
            32 => KeynumToModEnvDecay,
            33 => DelayVolEnv,
            34 => AttackVolEnv,
            35 => HoldVolEnv,
            36 => DecayVolEnv,
            37 => SustainVolEnv,
            38 => ReleaseVolEnv,
            39 => KeynumToVolEnvHold,
            40 => KeynumToVolEnvDecay,
            41 => Instrument,
            43 => KeyRange,
            44 => VelRange,
            45 => StartloopAddrsCoarseOffset,
            46 => Keynum,
            47 => Velocity,
            48 => InitialAttenuation,
            50 => EndloopAddrsCoarseOffset,
            51 => CoarseTune,
            52 => FineTune,
            53 => SampleId,
            54 => SampleModes,
            56 => ScaleTuning,
            57 => ExclusiveClass,
            58 => OverridingRootKey,
            _ => return None,
        })
    }

    /// Index into the dense generator value table.
    #[inline]
    pub fn slot(self) -> usize {
        self as usize
    }

    /// Generators that never add across preset and instrument zones:
    /// they come only from their defining zone (SF2 8.5).
    pub fn is_non_additive(self) -> bool {
        matches!(
            self,
            Generator::KeyRange
                | Generator::VelRange
                | Generator::SampleId
                | Generator::Instrument
        )
    }

    /// Range-valued generators carry a byte pair, not a signed word.
    pub fn is_range(self) -> bool {
        matches!(self, Generator::KeyRange | Generator::VelRange)
    }
}

/// Default generator values (SF2 8.1.3). Omitted generators default to
/// zero; the table lists only the non-zero defaults.
pub fn generator_default(gen: Generator) -> i16 {
    match gen {
        Generator::InitialFilterFc => 13500,
        Generator::DelayModLfo => -12000,
        Generator::DelayVibLfo => -12000,
        Generator::DelayModEnv => -12000,
        Generator::AttackModEnv => -12000,
        Generator::HoldModEnv => -12000,
        Generator::DecayModEnv => -12000,
        Generator::ReleaseModEnv => -12000,
        Generator::DelayVolEnv => -12000,
        Generator::AttackVolEnv => -12000,
        Generator::HoldVolEnv => -12000,
        Generator::DecayVolEnv => -12000,
        Generator::ReleaseVolEnv => -12000,
        Generator::Keynum => -1,
        Generator::Velocity => -1,
        Generator::ScaleTuning => 100,
        Generator::OverridingRootKey => -1,
        _ => 0,
    }
}

/// Dense map from generator to effective value.
///
/// The resolver produces one of these per note-on; the voice keeps the
/// resolved map immutable and works from a scratch copy that modulator
/// contributions are summed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorMap {
    values: [i16; GENERATOR_SLOTS],

    /// keyRange low/high (inclusive)
    pub key_range: (u8, u8),

    /// velRange low/high (inclusive)
    pub vel_range: (u8, u8),
}

impl Default for GeneratorMap {
    fn default() -> Self {
        let mut values = [0i16; GENERATOR_SLOTS];
        for id in 0..GENERATOR_SLOTS as u16 {
            if let Some(gen) = Generator::from_id(id) {
                values[gen.slot()] = generator_default(gen);
            }
        }
        Self {
            values,
            key_range: (0, 127),
            vel_range: (0, 127),
        }
    }
}

impl GeneratorMap {
    #[inline]
    pub fn get(&self, gen: Generator) -> i16 {
        self.values[gen.slot()]
    }

    #[inline]
    pub fn set(&mut self, gen: Generator, value: i16) {
        self.values[gen.slot()] = value;
    }

    /// Add `delta` to a generator, saturating at the i16 bounds.
    #[inline]
    pub fn add(&mut self, gen: Generator, delta: i16) {
        let slot = gen.slot();
        self.values[slot] = self.values[slot].saturating_add(delta);
    }

    /// Add a real-valued modulator contribution, saturating.
    #[inline]
    pub fn add_f64(&mut self, gen: Generator, delta: f64) {
        let slot = gen.slot();
        let sum = self.values[slot] as f64 + delta;
        self.values[slot] = sum.clamp(i16::MIN as f64, i16::MAX as f64) as i16;
    }

    /// Loop policy from the sampleModes generator. Modes 1 (continuous)
    /// and 3 (loop while key held) both loop in v1; the release tail of
    /// mode 3 is handled by the envelope rather than by unlooping.
    pub fn loops(&self) -> bool {
        matches!(self.get(Generator::SampleModes) & 0b11, 1 | 3)
    }
}

/// Sample link type (SF2 7.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleLink {
    Mono,
    Right,
    Left,
    Linked,
    RomMono,
    RomRight,
    RomLeft,
    RomLinked,
}

impl SampleLink {
    pub fn from_raw(raw: u16) -> Option<Self> {
        Some(match raw {
            1 => SampleLink::Mono,
            2 => SampleLink::Right,
            4 => SampleLink::Left,
            8 => SampleLink::Linked,
            0x8001 => SampleLink::RomMono,
            0x8002 => SampleLink::RomRight,
            0x8004 => SampleLink::RomLeft,
            0x8008 => SampleLink::RomLinked,
            _ => return None,
        })
    }

    pub fn is_mono(self) -> bool {
        matches!(self, SampleLink::Mono | SampleLink::RomMono)
    }
}

/// Modulator source controllers (general controller palette, SF2 8.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModController {
    NoController,
    NoteOnVelocity,
    NoteOnKeyNumber,
    PolyPressure,
    ChannelPressure,
    PitchWheel,
    PitchWheelSensitivity,
    Link,
    /// MIDI continuous controller (CC flag set), with controller number
    Midi(u8),
}

/// Mapping direction (SF2 8.2: D bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModDirection {
    Positive,
    Negative,
}

/// Mapping polarity (SF2 8.2: P bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModPolarity {
    Unipolar,
    Bipolar,
}

/// Controller-to-value curve (SF2 8.2: source type field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModCurve {
    Linear,
    Concave,
    Convex,
    Switch,
}

/// Output transform (SF2 8.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModTransform {
    Linear,
    AbsoluteValue,
}

impl ModTransform {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            2 => ModTransform::AbsoluteValue,
            _ => ModTransform::Linear,
        }
    }
}

/// A fully decoded modulator source descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModSource {
    pub controller: ModController,
    pub direction: ModDirection,
    pub polarity: ModPolarity,
    pub curve: ModCurve,
}

impl ModSource {
    /// Decode the packed sfModSrcOper word (SF2 8.2): bits 0-6 index,
    /// bit 7 CC flag, bit 8 direction, bit 9 polarity, bits 10-15 type.
    pub fn from_raw(raw: u16) -> Self {
        let index = (raw & 0x7F) as u8;
        let is_cc = raw & 0x80 != 0;

        let controller = if is_cc {
            ModController::Midi(index)
        } else {
            match index {
                2 => ModController::NoteOnVelocity,
                3 => ModController::NoteOnKeyNumber,
                10 => ModController::PolyPressure,
                13 => ModController::ChannelPressure,
                14 => ModController::PitchWheel,
                16 => ModController::PitchWheelSensitivity,
                127 => ModController::Link,
                _ => ModController::NoController,
            }
        };

        let direction = if raw & 0x100 != 0 {
            ModDirection::Negative
        } else {
            ModDirection::Positive
        };
        let polarity = if raw & 0x200 != 0 {
            ModPolarity::Bipolar
        } else {
            ModPolarity::Unipolar
        };
        let curve = match (raw >> 10) & 0x3F {
            1 => ModCurve::Concave,
            2 => ModCurve::Convex,
            3 => ModCurve::Switch,
            _ => ModCurve::Linear,
        };

        Self {
            controller,
            direction,
            polarity,
            curve,
        }
    }

    /// The "no controller" source: maps to the constant 1.
    pub fn none() -> Self {
        Self {
            controller: ModController::NoController,
            direction: ModDirection::Positive,
            polarity: ModPolarity::Unipolar,
            curve: ModCurve::Linear,
        }
    }
}

/// An SF2 modulator: source, amount source, destination, amount,
/// transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modulator {
    pub source: ModSource,
    pub amount_source: ModSource,
    pub dest: Generator,
    pub amount: i16,
    pub transform: ModTransform,
}

impl Modulator {
    /// Identity key for the de-duplication rules of SF2 9.5: two
    /// modulators are "the same" when everything but the amount matches.
    pub fn identity(&self) -> (ModSource, ModSource, Generator, ModTransform) {
        (self.source, self.amount_source, self.dest, self.transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_roundtrip() {
        for id in 0..GENERATOR_SLOTS as u16 {
            if let Some(gen) = Generator::from_id(id) {
                assert_eq!(gen.slot(), id as usize);
            }
        }
    }

    #[test]
    fn test_unused_ids_are_skipped() {
        for id in [14u16, 18, 19, 20, 42, 49, 55, 59, 60, 200] {
            assert!(Generator::from_id(id).is_none(), "id {} should be unused", id);
        }
    }

    #[test]
    fn test_default_map_has_sf2_defaults() {
        let map = GeneratorMap::default();
        assert_eq!(map.get(Generator::InitialFilterFc), 13500);
        assert_eq!(map.get(Generator::AttackVolEnv), -12000);
        assert_eq!(map.get(Generator::ScaleTuning), 100);
        assert_eq!(map.get(Generator::OverridingRootKey), -1);
        assert_eq!(map.get(Generator::InitialAttenuation), 0);
        assert_eq!(map.key_range, (0, 127));
        assert_eq!(map.vel_range, (0, 127));
    }

    #[test]
    fn test_mod_source_decode() {
        // noteOnVelocity, negative, unipolar, concave: the default
        // velocity-to-attenuation source word 0x0502.
        let src = ModSource::from_raw(0x0502);
        assert_eq!(src.controller, ModController::NoteOnVelocity);
        assert_eq!(src.direction, ModDirection::Negative);
        assert_eq!(src.polarity, ModPolarity::Unipolar);
        assert_eq!(src.curve, ModCurve::Concave);
    }

    #[test]
    fn test_mod_source_cc_flag() {
        let src = ModSource::from_raw(0x0081); // CC 1 (mod wheel)
        assert_eq!(src.controller, ModController::Midi(1));
    }

    #[test]
    fn test_loop_modes() {
        let mut map = GeneratorMap::default();
        assert!(!map.loops());
        map.set(Generator::SampleModes, 1);
        assert!(map.loops());
        map.set(Generator::SampleModes, 2);
        assert!(!map.loops());
        map.set(Generator::SampleModes, 3);
        assert!(map.loops());
    }
}
