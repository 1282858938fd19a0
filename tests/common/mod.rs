// Test utilities and helper functions for SONAFONT tests

#![allow(dead_code)] // Each integration test binary uses its own subset

use sonafont::{AudioConfig, SynthConfig};

/// Calculates the Root Mean Square (RMS) of a signal.
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = signal.iter().map(|s| s * s).sum();
    (sum_sq / signal.len() as f32).sqrt()
}

/// Calculates the peak absolute value of an i16 signal.
pub fn peak(signal: &[i16]) -> i16 {
    signal.iter().map(|s| s.saturating_abs()).max().unwrap_or(0)
}

/// Generates a sine wave as 16-bit PCM.
pub fn sine_pcm(frequency: f32, sample_rate: u32, frames: usize, amplitude: f32) -> Vec<i16> {
    (0..frames)
        .map(|i| {
            let phase = i as f32 * frequency / sample_rate as f32;
            (phase * 2.0 * std::f32::consts::PI).sin() * amplitude * i16::MAX as f32
        })
        .map(|s| s as i16)
        .collect()
}

/// Generates white noise as 16-bit PCM.
pub fn noise_pcm<R: rand::Rng>(rng: &mut R, frames: usize, amplitude: f32) -> Vec<i16> {
    (0..frames)
        .map(|_| ((rng.gen::<f32>() * 2.0 - 1.0) * amplitude * i16::MAX as f32) as i16)
        .collect()
}

/// A small engine configuration that keeps integration tests fast: low
/// rate, small periods, modest queue.
pub fn small_config() -> SynthConfig {
    SynthConfig {
        audio: AudioConfig {
            sample_rate: 8000,
            channels: 2,
            period_size: 32,
        },
        max_latency: 0.05,
        master_volume: 1.0,
    }
}

// ----------------------------------------------------------------------
// In-memory SoundFont builder
//
// Builds a minimal but structurally complete .sf2 image: one sample
// pool, one instrument, one preset, with configurable zones. Stands in
// for the multi-megabyte GM banks the end-to-end scenarios would
// otherwise need on disk.
// ----------------------------------------------------------------------

/// One zone for the test font: optional ranges plus raw generators.
#[derive(Clone, Default)]
pub struct TestZone {
    pub key_range: Option<(u8, u8)>,
    pub vel_range: Option<(u8, u8)>,

    /// (generator id, value) pairs, written before the terminal
    pub gens: Vec<(u16, i16)>,
}

impl TestZone {
    pub fn full_range() -> Self {
        Self::default()
    }

    pub fn keys(low: u8, high: u8) -> Self {
        Self {
            key_range: Some((low, high)),
            ..Self::default()
        }
    }

    pub fn with_gen(mut self, oper: u16, value: i16) -> Self {
        self.gens.push((oper, value));
        self
    }
}

/// Builder for a single-sample, single-instrument, single-preset font.
pub struct TestFont {
    pub name: String,
    pub bank: u16,
    pub preset_num: u16,

    pub sample_pcm: Vec<i16>,
    pub sample_rate: u32,
    pub root_key: u8,

    /// Loop points relative to the sample start
    pub loop_points: Option<(u32, u32)>,

    pub preset_zones: Vec<TestZone>,
    pub inst_zones: Vec<TestZone>,
}

impl TestFont {
    pub fn new(sample_pcm: Vec<i16>, sample_rate: u32, root_key: u8) -> Self {
        Self {
            name: "Test Font".into(),
            bank: 0,
            preset_num: 0,
            sample_pcm,
            sample_rate,
            root_key,
            loop_points: None,
            preset_zones: vec![TestZone::full_range()],
            inst_zones: vec![TestZone::full_range()],
        }
    }

    /// Instant-envelope generators: no delay/attack/hold/decay, full
    /// sustain, ~1 ms release. Applied to an instrument zone.
    pub fn instant_envelope(zone: TestZone) -> TestZone {
        zone.with_gen(33, i16::MIN) // delayVolEnv
            .with_gen(34, i16::MIN) // attackVolEnv
            .with_gen(35, i16::MIN) // holdVolEnv
            .with_gen(36, i16::MIN) // decayVolEnv
            .with_gen(37, 0) // sustainVolEnv: full level
            .with_gen(38, -12000) // releaseVolEnv: ~1 ms
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pgen = Vec::new();
        let mut pbag = Vec::new();
        for zone in &self.preset_zones {
            pbag.push((pgen.len() as u16 / 4, 0u16));
            write_zone_gens(&mut pgen, zone, 41, 0); // terminal: instrument 0
        }
        pbag.push((pgen.len() as u16 / 4, 0)); // terminal bag
        write_gen(&mut pgen, 0, 0); // terminal record

        let mut igen = Vec::new();
        let mut ibag = Vec::new();
        for zone in &self.inst_zones {
            ibag.push((igen.len() as u16 / 4, 0u16));
            write_zone_gens(&mut igen, zone, 53, 0); // terminal: sampleID 0
        }
        ibag.push((igen.len() as u16 / 4, 0));
        write_gen(&mut igen, 0, 0);

        // phdr: preset + EOP
        let mut phdr = Vec::new();
        write_phdr(&mut phdr, "Test Preset", self.preset_num, self.bank, 0);
        write_phdr(&mut phdr, "EOP", 0, 0, (pbag.len() - 1) as u16);

        // inst: instrument + EOI
        let mut inst = Vec::new();
        write_inst(&mut inst, "Test Inst", 0);
        write_inst(&mut inst, "EOI", (ibag.len() - 1) as u16);

        // shdr: sample + EOS
        let len = self.sample_pcm.len() as u32;
        let (loop_start, loop_end) = self.loop_points.unwrap_or((0, 0));
        let mut shdr = Vec::new();
        write_shdr(
            &mut shdr,
            "Test Sample",
            0,
            len,
            loop_start.min(len),
            loop_end.min(len),
            self.sample_rate,
            self.root_key,
        );
        write_shdr(&mut shdr, "EOS", 0, 0, 0, 0, 0, 0);

        let mut smpl = Vec::with_capacity(self.sample_pcm.len() * 2);
        for &s in &self.sample_pcm {
            smpl.extend_from_slice(&s.to_le_bytes());
        }

        let pbag_bytes = bag_bytes(&pbag);
        let ibag_bytes = bag_bytes(&ibag);
        let terminal_mod = vec![0u8; 10];

        let info = chunk(b"INAM", &nul_padded(&self.name));
        let info_list = list(b"INFO", &info);
        let sdta_list = list(b"sdta", &chunk(b"smpl", &smpl));
        let mut pdta = Vec::new();
        pdta.extend(chunk(b"phdr", &phdr));
        pdta.extend(chunk(b"pbag", &pbag_bytes));
        pdta.extend(chunk(b"pmod", &terminal_mod));
        pdta.extend(chunk(b"pgen", &pgen));
        pdta.extend(chunk(b"inst", &inst));
        pdta.extend(chunk(b"ibag", &ibag_bytes));
        pdta.extend(chunk(b"imod", &terminal_mod));
        pdta.extend(chunk(b"igen", &igen));
        pdta.extend(chunk(b"shdr", &shdr));
        let pdta_list = list(b"pdta", &pdta);

        let mut body = Vec::new();
        body.extend(info_list);
        body.extend(sdta_list);
        body.extend(pdta_list);

        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&((body.len() + 4) as u32).to_le_bytes());
        out.extend_from_slice(b"sfbk");
        out.extend(body);
        out
    }
}

fn write_gen(out: &mut Vec<u8>, oper: u16, amount: u16) {
    out.extend_from_slice(&oper.to_le_bytes());
    out.extend_from_slice(&amount.to_le_bytes());
}

fn write_zone_gens(out: &mut Vec<u8>, zone: &TestZone, terminal_oper: u16, terminal_value: u16) {
    if let Some((lo, hi)) = zone.key_range {
        write_gen(out, 43, lo as u16 | ((hi as u16) << 8));
    }
    if let Some((lo, hi)) = zone.vel_range {
        write_gen(out, 44, lo as u16 | ((hi as u16) << 8));
    }
    for &(oper, value) in &zone.gens {
        write_gen(out, oper, value as u16);
    }
    write_gen(out, terminal_oper, terminal_value);
}

fn write_phdr(out: &mut Vec<u8>, name: &str, preset: u16, bank: u16, bag_index: u16) {
    out.extend_from_slice(&fixed_name(name));
    out.extend_from_slice(&preset.to_le_bytes());
    out.extend_from_slice(&bank.to_le_bytes());
    out.extend_from_slice(&bag_index.to_le_bytes());
    out.extend_from_slice(&[0u8; 12]); // library, genre, morphology
}

fn write_inst(out: &mut Vec<u8>, name: &str, bag_index: u16) {
    out.extend_from_slice(&fixed_name(name));
    out.extend_from_slice(&bag_index.to_le_bytes());
}

#[allow(clippy::too_many_arguments)]
fn write_shdr(
    out: &mut Vec<u8>,
    name: &str,
    start: u32,
    end: u32,
    loop_start: u32,
    loop_end: u32,
    rate: u32,
    pitch: u8,
) {
    out.extend_from_slice(&fixed_name(name));
    out.extend_from_slice(&start.to_le_bytes());
    out.extend_from_slice(&end.to_le_bytes());
    out.extend_from_slice(&loop_start.to_le_bytes());
    out.extend_from_slice(&loop_end.to_le_bytes());
    out.extend_from_slice(&rate.to_le_bytes());
    out.push(pitch);
    out.push(0); // pitch correction
    out.extend_from_slice(&0u16.to_le_bytes()); // sample link index
    out.extend_from_slice(&1u16.to_le_bytes()); // type: monoSample
}

fn bag_bytes(bags: &[(u16, u16)]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bags.len() * 4);
    for &(gen_index, mod_index) in bags {
        out.extend_from_slice(&gen_index.to_le_bytes());
        out.extend_from_slice(&mod_index.to_le_bytes());
    }
    out
}

fn fixed_name(name: &str) -> [u8; 20] {
    let mut out = [0u8; 20];
    for (i, b) in name.bytes().take(19).enumerate() {
        out[i] = b;
    }
    out
}

fn nul_padded(s: &str) -> Vec<u8> {
    let mut out = s.as_bytes().to_vec();
    out.push(0);
    if out.len() % 2 == 1 {
        out.push(0);
    }
    out
}

fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 8);
    out.extend_from_slice(tag);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
    out
}

fn list(list_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len() + 4);
    body.extend_from_slice(list_type);
    body.extend_from_slice(payload);
    chunk(b"LIST", &body)
}
