//! Voice Module
//!
//! One sounding note. A voice owns a window into its sample's PCM, a
//! pitch ratio, a volume envelope, one-pole low-pass state, and the
//! modulator-adjusted generator values it was born with. It produces
//! audio lazily: the mixer pulls up to one period at a time through
//! `collect_into`, and the voice advances its own read cursor and
//! envelope during the pull.
//!
//! # Rendering pipeline (per output frame)
//!
//! 1. Two-tap linear interpolation at the fractional read position;
//!    when looping, the second tap wraps from loop end to loop start.
//! 2. Scale by envelope value and attenuation.
//! 3. One-pole low-pass.
//! 4. Replicate the mono result to every output channel.
//! 5. Advance the position by the pitch ratio (wrapping across the
//!    loop) and the envelope by one sample.

use std::sync::Arc;

use crate::config::AudioConfig;
use crate::envelope::{Envelope, EnvelopeParams};
use crate::modulator::{apply_modulators, ControllerState};
use crate::playback::buffer::{AudioSource, CollectStatus};
use crate::soundfont::definitions::Generator;
use crate::soundfont::preset::NoteParams;
use crate::soundfont::units::{
    absolute_cents_to_hz, centibels_to_gain, cents_to_ratio, timecents_to_secs,
};

/// Scale factor for the coarse address-offset generators.
const COARSE_SIZE: i64 = 1 << 15;

/// A sounding note, from note-on until its envelope finishes.
pub struct Voice {
    key: u8,

    /// The sample's full PCM; the voice reads `window_start..` within it
    data: Arc<Vec<i16>>,
    window_start: usize,

    /// Frames in the playback window
    window_len: usize,

    /// Loop start/end in frames relative to the window, when the
    /// sampleModes generator asks for looping
    loop_region: Option<(usize, usize)>,

    /// Fractional read cursor in window frames
    position: f64,

    /// Frames of source advanced per output frame
    total_ratio: f64,

    /// Seconds per output frame
    dt: f32,

    channels: usize,
    envelope: Envelope,

    /// Linear gain from initialAttenuation (modulators included)
    attenuation: f32,

    /// One-pole low-pass coefficient and state
    alpha: f32,
    last: f32,

    /// Set once a non-looping window has been read through
    exhausted: bool,
}

impl Voice {
    /// Build a voice from resolved note parameters.
    ///
    /// Applies the modulator list to a scratch copy of the generator
    /// map, then derives the pitch ratio, sample window, loop region,
    /// envelope, filter coefficient, and attenuation from the result.
    pub fn new(key: u8, velocity: u8, params: &NoteParams, config: &AudioConfig) -> Self {
        let controllers = ControllerState::for_note(key, velocity);
        let gens = apply_modulators(&params.gens, &params.mods, &controllers);
        let sample = &params.sample;

        // Pitch: cents away from the key the sample plays back natively at.
        let root = gens.get(Generator::OverridingRootKey);
        let effective_root_key = if (0..=127).contains(&root) {
            root as u8
        } else {
            sample.pitch
        };
        let hard_pitch_diff = (key as f64 - effective_root_key as f64)
            * gens.get(Generator::ScaleTuning) as f64
            + sample.pitch_correction as f64
            + gens.get(Generator::CoarseTune) as f64 * 100.0
            + gens.get(Generator::FineTune) as f64;
        let total_ratio = (sample.sample_rate as f64 / config.sample_rate as f64)
            * cents_to_ratio(hard_pitch_diff);

        // Playback window within the sample data.
        let data_len = sample.data.len() as i64;
        let start_offset = gens.get(Generator::StartAddrsOffset) as i64
            + gens.get(Generator::StartAddrsCoarseOffset) as i64 * COARSE_SIZE;
        let end_offset = gens.get(Generator::EndAddrsOffset) as i64
            + gens.get(Generator::EndAddrsCoarseOffset) as i64 * COARSE_SIZE;
        let window_start = start_offset.clamp(0, data_len) as usize;
        let window_end = (data_len + end_offset).clamp(window_start as i64, data_len) as usize;
        let window_len = window_end - window_start;

        // Loop region: the startloop/endloop generators offset the
        // sample header's loop points, then both are rebased onto the
        // window.
        let loop_region = if gens.loops() {
            let loop_start = sample.loop_start as i64
                + gens.get(Generator::StartloopAddrsOffset) as i64
                + gens.get(Generator::StartloopAddrsCoarseOffset) as i64 * COARSE_SIZE
                - window_start as i64;
            let loop_end = sample.loop_end as i64
                + gens.get(Generator::EndloopAddrsOffset) as i64
                + gens.get(Generator::EndloopAddrsCoarseOffset) as i64 * COARSE_SIZE
                - window_start as i64;
            let loop_start = loop_start.clamp(0, window_len as i64) as usize;
            let loop_end = loop_end.clamp(0, window_len as i64) as usize;
            if loop_end > loop_start {
                Some((loop_start, loop_end))
            } else {
                log::warn!(
                    "sample '{}': degenerate loop {}..{}, playing unlooped",
                    sample.name,
                    loop_start,
                    loop_end
                );
                None
            }
        } else {
            None
        };

        let envelope = Envelope::new(EnvelopeParams {
            delay: timecents_to_secs(gens.get(Generator::DelayVolEnv)),
            attack: timecents_to_secs(gens.get(Generator::AttackVolEnv)),
            hold: timecents_to_secs(gens.get(Generator::HoldVolEnv)),
            decay: timecents_to_secs(gens.get(Generator::DecayVolEnv)),
            sustain_level: centibels_to_gain(gens.get(Generator::SustainVolEnv) as f32),
            release: timecents_to_secs(gens.get(Generator::ReleaseVolEnv)),
        });

        // One-pole low-pass from the filter cutoff generator.
        let cutoff_hz = absolute_cents_to_hz(gens.get(Generator::InitialFilterFc) as f32);
        let ts = 1.0 / config.sample_rate as f32;
        let tau = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz);
        let alpha = ts / (ts + tau);

        let attenuation = centibels_to_gain(gens.get(Generator::InitialAttenuation) as f32);

        Self {
            key,
            data: Arc::clone(&sample.data),
            window_start,
            window_len,
            loop_region,
            position: 0.0,
            total_ratio,
            dt: ts,
            channels: config.channels as usize,
            envelope,
            attenuation,
            alpha,
            last: 0.0,
            exhausted: window_len == 0,
        }
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn total_ratio(&self) -> f64 {
        self.total_ratio
    }

    pub fn loop_region(&self) -> Option<(usize, usize)> {
        self.loop_region
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Whether this voice wants its registry entry to wrap the loop.
    pub fn starts_looping(&self) -> bool {
        self.loop_region.is_some()
    }
}

impl AudioSource for Voice {
    fn collect_into(&mut self, out: &mut [f32], looping: bool) -> CollectStatus {
        if self.envelope.finished() || self.exhausted {
            return CollectStatus {
                written: 0,
                end_loop: true,
                finished: true,
            };
        }

        // The registry's loop flag only means something when the voice
        // actually has a loop region.
        let looping = looping && self.loop_region.is_some();

        // Hot-loop locals; position, filter state, and the envelope are
        // written back after the batch.
        let data = &self.data[self.window_start..self.window_start + self.window_len];
        let rate = self.total_ratio;
        let tap_offset = rate.ceil() as usize;
        let end_frame = self.window_len.saturating_sub(tap_offset) as f64;
        let (loop_start, loop_end) = self.loop_region.unwrap_or((0, 0));
        let channels = self.channels;
        let alpha = self.alpha;
        let one_minus_alpha = 1.0 - alpha;
        let attenuation = self.attenuation;
        let dt = self.dt;

        let mut position = self.position;
        let mut last = self.last;
        let env_params = *self.envelope.params();
        let mut env = self.envelope.snapshot();

        let mut count = 0;
        while count + channels <= out.len() {
            if !looping && position >= end_frame {
                self.exhausted = true;
                break;
            }

            let i = position as usize;
            let frac = (position - i as f64) as f32;
            let s1 = data[i] as f32;
            // Second tap wraps back into the loop when it would read
            // past the loop end.
            let mut i2 = i + 1;
            if looping && i2 >= loop_end {
                i2 = loop_start + (i2 - loop_end);
            }
            let s2 = data[i2.min(data.len() - 1)] as f32;

            let x = (s1 + (s2 - s1) * frac) * env.current_val * attenuation;
            let y = alpha * x + one_minus_alpha * last;
            last = y;

            for _ in 0..channels {
                out[count] += y;
                count += 1;
            }

            position += rate;
            while looping && position >= loop_end as f64 {
                position = loop_start as f64 + (position - loop_end as f64);
            }
            env.advance(&env_params, dt);
        }

        self.position = position;
        self.last = last;
        self.envelope.write_back(env);

        CollectStatus {
            written: count,
            end_loop: self.envelope.finished() || self.exhausted,
            finished: self.envelope.finished() || self.exhausted,
        }
    }

    fn release(&mut self) {
        self.envelope.release();
    }
}
