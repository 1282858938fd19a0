//! SoundFont Module
//!
//! Reads SoundFont 2.01 files into the structures the engine consumes:
//! presets and instruments (each a list of generator/modulator zones)
//! and samples (16-bit mono PCM plus header metadata). Only the chunks
//! the synthesizer needs are decoded; everything else in the file is
//! skipped without complaint.
//!
//! The hydra-headed RIFF layout is:
//!
//! ```text
//! RIFF sfbk
//!   LIST INFO  (INAM, ...)
//!   LIST sdta  (smpl: the 16-bit sample pool)
//!   LIST pdta  (phdr pbag pmod pgen inst ibag imod igen shdr)
//! ```

pub mod definitions;
pub mod preset;
pub mod riff;
pub mod units;

use std::path::Path;
use std::sync::Arc;

use crate::error::SynthError;
use definitions::{Generator, ModSource, ModTransform, Modulator, SampleLink};
use preset::{InstrumentPatch, Preset, SampleData, Zone};
use riff::{tag_str, Reader};

/// Fixed on-disk record sizes (SF2 spec, section 7).
const PHDR_SIZE: usize = 38;
const BAG_SIZE: usize = 4;
const MOD_SIZE: usize = 10;
const GEN_SIZE: usize = 4;
const INST_SIZE: usize = 22;
const SHDR_SIZE: usize = 46;

/// A loaded SoundFont.
#[derive(Debug, Clone)]
pub struct SoundFont {
    /// Bank name from the INFO chunk (INAM), if present
    pub name: String,

    pub presets: Vec<Preset>,
    pub instruments: Vec<InstrumentPatch>,
    pub samples: Vec<Arc<SampleData>>,
}

impl SoundFont {
    /// Load a SoundFont from a file on disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SynthError> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| SynthError::SoundFontParse(format!("cannot read file: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parse a SoundFont from an in-memory byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SynthError> {
        let body = riff::open_form(bytes, b"sfbk")?;

        let mut name = String::new();
        let mut smpl: &[u8] = &[];
        let mut pdta: Option<&[u8]> = None;

        for chunk in riff::chunks(body) {
            let chunk = chunk?;
            if &chunk.tag != b"LIST" {
                continue;
            }
            let (list_type, list_body) = chunk.as_list()?;
            match &list_type {
                b"INFO" => {
                    for sub in riff::chunks(list_body) {
                        let sub = sub?;
                        if &sub.tag == b"INAM" {
                            let end = sub.data.iter().position(|&b| b == 0).unwrap_or(sub.data.len());
                            name = String::from_utf8_lossy(&sub.data[..end]).into_owned();
                        }
                    }
                }
                b"sdta" => {
                    for sub in riff::chunks(list_body) {
                        let sub = sub?;
                        if &sub.tag == b"smpl" {
                            smpl = sub.data;
                        }
                    }
                }
                b"pdta" => pdta = Some(list_body),
                _ => {}
            }
        }

        let pdta =
            pdta.ok_or_else(|| SynthError::SoundFontParse("missing pdta list".into()))?;
        let hydra = Hydra::read(pdta)?;

        let samples = build_samples(&hydra, smpl)?;
        let instruments = build_instruments(&hydra)?;
        let presets = build_presets(&hydra)?;

        Ok(Self {
            name,
            presets,
            instruments,
            samples,
        })
    }

    /// Find a preset by bank and preset number.
    pub fn find_preset(&self, bank: u16, preset_num: u16) -> Option<&Preset> {
        self.presets
            .iter()
            .find(|p| p.bank == bank && p.preset_num == preset_num)
    }

    /// (bank, preset, name) for every preset, sorted for display.
    pub fn preset_list(&self) -> Vec<(u16, u16, &str)> {
        let mut list: Vec<_> = self
            .presets
            .iter()
            .map(|p| (p.bank, p.preset_num, p.name.as_str()))
            .collect();
        list.sort();
        list
    }
}

// --- raw pdta records -------------------------------------------------

struct RawPresetHeader {
    name: String,
    preset_num: u16,
    bank: u16,
    bag_index: usize,
}

struct RawInstHeader {
    name: String,
    bag_index: usize,
}

struct RawBag {
    gen_index: usize,
    mod_index: usize,
}

struct RawGen {
    oper: u16,
    amount: u16,
}

struct RawMod {
    src: u16,
    dest: u16,
    amount: i16,
    amount_src: u16,
    transform: u16,
}

struct RawSampleHeader {
    name: String,
    start: usize,
    end: usize,
    loop_start: usize,
    loop_end: usize,
    sample_rate: u32,
    pitch: u8,
    pitch_correction: i8,
    link: u16,
}

/// The nine pdta sub-chunks, decoded into record vectors. SF2 calls
/// this structure "the hydra".
struct Hydra {
    phdr: Vec<RawPresetHeader>,
    pbag: Vec<RawBag>,
    pmod: Vec<RawMod>,
    pgen: Vec<RawGen>,
    inst: Vec<RawInstHeader>,
    ibag: Vec<RawBag>,
    imod: Vec<RawMod>,
    igen: Vec<RawGen>,
    shdr: Vec<RawSampleHeader>,
}

impl Hydra {
    fn read(pdta: &[u8]) -> Result<Self, SynthError> {
        let mut hydra = Self {
            phdr: Vec::new(),
            pbag: Vec::new(),
            pmod: Vec::new(),
            pgen: Vec::new(),
            inst: Vec::new(),
            ibag: Vec::new(),
            imod: Vec::new(),
            igen: Vec::new(),
            shdr: Vec::new(),
        };

        for chunk in riff::chunks(pdta) {
            let chunk = chunk?;
            let data = chunk.data;
            match &chunk.tag {
                b"phdr" => hydra.phdr = read_records(data, PHDR_SIZE, "phdr", read_phdr)?,
                b"pbag" => hydra.pbag = read_records(data, BAG_SIZE, "pbag", read_bag)?,
                b"pmod" => hydra.pmod = read_records(data, MOD_SIZE, "pmod", read_mod)?,
                b"pgen" => hydra.pgen = read_records(data, GEN_SIZE, "pgen", read_gen)?,
                b"inst" => hydra.inst = read_records(data, INST_SIZE, "inst", read_inst)?,
                b"ibag" => hydra.ibag = read_records(data, BAG_SIZE, "ibag", read_bag)?,
                b"imod" => hydra.imod = read_records(data, MOD_SIZE, "imod", read_mod)?,
                b"igen" => hydra.igen = read_records(data, GEN_SIZE, "igen", read_gen)?,
                b"shdr" => hydra.shdr = read_records(data, SHDR_SIZE, "shdr", read_shdr)?,
                other => {
                    log::debug!("skipping pdta chunk {}", tag_str(other));
                }
            }
        }

        for (field, present) in [
            ("phdr", !hydra.phdr.is_empty()),
            ("pbag", !hydra.pbag.is_empty()),
            ("inst", !hydra.inst.is_empty()),
            ("ibag", !hydra.ibag.is_empty()),
            ("shdr", !hydra.shdr.is_empty()),
        ] {
            if !present {
                return Err(SynthError::SoundFontParse(format!(
                    "missing or empty {} chunk",
                    field
                )));
            }
        }

        Ok(hydra)
    }
}

fn read_records<T>(
    data: &[u8],
    record_size: usize,
    what: &str,
    read_one: fn(&mut Reader) -> Result<T, SynthError>,
) -> Result<Vec<T>, SynthError> {
    if data.len() % record_size != 0 {
        return Err(SynthError::SoundFontParse(format!(
            "{} chunk size {} is not a multiple of {}",
            what,
            data.len(),
            record_size
        )));
    }
    let mut reader = Reader::new(data);
    let mut records = Vec::with_capacity(data.len() / record_size);
    while !reader.is_empty() {
        records.push(read_one(&mut reader)?);
    }
    Ok(records)
}

fn read_phdr(r: &mut Reader) -> Result<RawPresetHeader, SynthError> {
    let name = r.read_fixed_str(20)?;
    let preset_num = r.read_u16()?;
    let bank = r.read_u16()?;
    let bag_index = r.read_u16()? as usize;
    r.take(12)?; // library, genre, morphology
    Ok(RawPresetHeader {
        name,
        preset_num,
        bank,
        bag_index,
    })
}

fn read_inst(r: &mut Reader) -> Result<RawInstHeader, SynthError> {
    let name = r.read_fixed_str(20)?;
    let bag_index = r.read_u16()? as usize;
    Ok(RawInstHeader { name, bag_index })
}

fn read_bag(r: &mut Reader) -> Result<RawBag, SynthError> {
    Ok(RawBag {
        gen_index: r.read_u16()? as usize,
        mod_index: r.read_u16()? as usize,
    })
}

fn read_gen(r: &mut Reader) -> Result<RawGen, SynthError> {
    Ok(RawGen {
        oper: r.read_u16()?,
        amount: r.read_u16()?,
    })
}

fn read_mod(r: &mut Reader) -> Result<RawMod, SynthError> {
    Ok(RawMod {
        src: r.read_u16()?,
        dest: r.read_u16()?,
        amount: r.read_i16()?,
        amount_src: r.read_u16()?,
        transform: r.read_u16()?,
    })
}

fn read_shdr(r: &mut Reader) -> Result<RawSampleHeader, SynthError> {
    let name = r.read_fixed_str(20)?;
    let start = r.read_u32()? as usize;
    let end = r.read_u32()? as usize;
    let loop_start = r.read_u32()? as usize;
    let loop_end = r.read_u32()? as usize;
    let sample_rate = r.read_u32()?;
    let pitch = r.read_u8()?;
    let pitch_correction = r.read_i8()?;
    r.read_u16()?; // sample link index (stereo pairing, unused in v1)
    let link = r.read_u16()?;
    Ok(RawSampleHeader {
        name,
        start,
        end,
        loop_start,
        loop_end,
        sample_rate,
        pitch,
        pitch_correction,
        link,
    })
}

// --- structure building -----------------------------------------------

fn build_samples(hydra: &Hydra, smpl: &[u8]) -> Result<Vec<Arc<SampleData>>, SynthError> {
    let pool_len = smpl.len() / 2;
    let mut samples = Vec::new();

    // The final shdr record is the EOS terminal.
    for raw in hydra.shdr.iter().take(hydra.shdr.len().saturating_sub(1)) {
        let link = SampleLink::from_raw(raw.link).unwrap_or_else(|| {
            log::warn!(
                "sample '{}' has unknown link type {:#x}, treating as mono",
                raw.name,
                raw.link
            );
            SampleLink::Mono
        });

        let rom = matches!(
            link,
            SampleLink::RomMono | SampleLink::RomRight | SampleLink::RomLeft | SampleLink::RomLinked
        );

        let data = if rom {
            // ROM sample data lives on the hardware, not in smpl.
            Vec::new()
        } else {
            if raw.start > raw.end || raw.end > pool_len {
                return Err(SynthError::SoundFontParse(format!(
                    "sample '{}' has out-of-range offsets {}..{} (pool is {} points)",
                    raw.name, raw.start, raw.end, pool_len
                )));
            }
            let mut pcm = Vec::with_capacity(raw.end - raw.start);
            for i in raw.start..raw.end {
                let lo = smpl[i * 2];
                let hi = smpl[i * 2 + 1];
                pcm.push(i16::from_le_bytes([lo, hi]));
            }
            pcm
        };

        // Pitch 255 conventionally means unpitched; SF2 says to treat
        // it as 60.
        let pitch = if raw.pitch > 127 { 60 } else { raw.pitch };

        let len = data.len();
        samples.push(Arc::new(SampleData {
            name: raw.name.clone(),
            data: Arc::new(data),
            sample_rate: raw.sample_rate.max(1),
            pitch,
            pitch_correction: raw.pitch_correction,
            loop_start: raw.loop_start.saturating_sub(raw.start).min(len),
            loop_end: raw.loop_end.saturating_sub(raw.start).min(len),
            link,
        }));
    }

    Ok(samples)
}

/// Turn a run of bags into (global zone, local zones). A zone whose
/// generator list does not end with the terminal generator is a global
/// zone when it comes first; elsewhere it is ignored, per SF2 7.3/7.7.
fn build_zone_list(
    bags: &[RawBag],
    next_bag: Option<&RawBag>,
    gens: &[RawGen],
    mods: &[RawMod],
    terminal: Generator,
    owner: &str,
) -> Result<(Option<Zone>, Vec<Zone>), SynthError> {
    let mut global = None;
    let mut zones = Vec::new();

    for (i, bag) in bags.iter().enumerate() {
        let gen_end = bags
            .get(i + 1)
            .or(next_bag)
            .map(|b| b.gen_index)
            .unwrap_or(gens.len());
        let mod_end = bags
            .get(i + 1)
            .or(next_bag)
            .map(|b| b.mod_index)
            .unwrap_or(mods.len());

        if bag.gen_index > gen_end || gen_end > gens.len() || bag.mod_index > mod_end
            || mod_end > mods.len()
        {
            return Err(SynthError::SoundFontParse(format!(
                "{}: bag indices out of range",
                owner
            )));
        }

        let mut zone = Zone::new();
        for raw in &gens[bag.gen_index..gen_end] {
            let gen = match Generator::from_id(raw.oper) {
                Some(g) => g,
                None => continue,
            };
            match gen {
                Generator::KeyRange => {
                    zone.key_range = ((raw.amount & 0xFF) as u8, (raw.amount >> 8) as u8)
                }
                Generator::VelRange => {
                    zone.vel_range = ((raw.amount & 0xFF) as u8, (raw.amount >> 8) as u8)
                }
                _ => zone.gens.push((gen, raw.amount as i16)),
            }
        }

        for raw in &mods[bag.mod_index..mod_end] {
            if raw.dest & 0x8000 != 0 {
                // Linked modulator destination; links are not modelled.
                continue;
            }
            let dest = match Generator::from_id(raw.dest) {
                Some(g) => g,
                None => continue,
            };
            zone.mods.push(Modulator {
                source: ModSource::from_raw(raw.src),
                amount_source: ModSource::from_raw(raw.amount_src),
                dest,
                amount: raw.amount,
                transform: ModTransform::from_raw(raw.transform),
            });
        }

        let has_terminal = zone.gens.last().map(|(g, _)| *g) == Some(terminal);
        if has_terminal {
            zones.push(zone);
        } else if i == 0 && (!zone.gens.is_empty() || !zone.mods.is_empty()) {
            global = Some(zone);
        } else if !zone.gens.is_empty() || !zone.mods.is_empty() {
            log::warn!("{}: ignoring orphan zone without a terminal generator", owner);
        }
    }

    Ok((global, zones))
}

fn build_presets(hydra: &Hydra) -> Result<Vec<Preset>, SynthError> {
    let mut presets = Vec::new();

    // Last phdr record is the EOP terminal; it only marks the end of
    // the final preset's bag run.
    for window in hydra.phdr.windows(2) {
        let (raw, next) = (&window[0], &window[1]);
        if raw.bag_index > next.bag_index || next.bag_index > hydra.pbag.len() {
            return Err(SynthError::SoundFontParse(format!(
                "preset '{}': bag indices out of range",
                raw.name
            )));
        }
        let bags = &hydra.pbag[raw.bag_index..next.bag_index];
        let (global, zones) = build_zone_list(
            bags,
            hydra.pbag.get(next.bag_index),
            &hydra.pgen,
            &hydra.pmod,
            Generator::Instrument,
            &raw.name,
        )?;
        presets.push(Preset {
            name: raw.name.clone(),
            bank: raw.bank,
            preset_num: raw.preset_num,
            global,
            zones,
        });
    }

    Ok(presets)
}

fn build_instruments(hydra: &Hydra) -> Result<Vec<InstrumentPatch>, SynthError> {
    let mut instruments = Vec::new();

    for window in hydra.inst.windows(2) {
        let (raw, next) = (&window[0], &window[1]);
        if raw.bag_index > next.bag_index || next.bag_index > hydra.ibag.len() {
            return Err(SynthError::SoundFontParse(format!(
                "instrument '{}': bag indices out of range",
                raw.name
            )));
        }
        let bags = &hydra.ibag[raw.bag_index..next.bag_index];
        let (global, zones) = build_zone_list(
            bags,
            hydra.ibag.get(next.bag_index),
            &hydra.igen,
            &hydra.imod,
            Generator::SampleId,
            &raw.name,
        )?;
        instruments.push(InstrumentPatch {
            name: raw.name.clone(),
            global,
            zones,
        });
    }

    Ok(instruments)
}
