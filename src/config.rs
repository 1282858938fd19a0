//! Configuration Module
//!
//! Audio format and engine-level settings. Both structs are fixed for
//! the lifetime of the engine: the mix loop, queue sizing, and every
//! voice's pitch math are derived from them at construction time.

use serde::{Deserialize, Serialize};

/// Output audio format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel count (power of two, >= 1)
    pub channels: u16,

    /// Frames per period
    pub period_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            period_size: 128,
        }
    }
}

impl AudioConfig {
    /// Length of one period in seconds.
    pub fn period_length(&self) -> f64 {
        self.period_size as f64 / (self.channels as f64 * self.sample_rate as f64)
    }

    /// Interleaved samples (words) per period.
    pub fn period_words(&self) -> usize {
        self.period_size * self.channels as usize
    }

    /// Bytes per packed period (signed 16-bit LE).
    pub fn period_bytes(&self) -> usize {
        self.period_words() * 2
    }
}

/// Engine-level settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Output format
    pub audio: AudioConfig,

    /// Maximum output latency in seconds. Determines the period queue
    /// capacity: ceil(max_latency / period_length), minimum 1.
    pub max_latency: f64,

    /// Master volume (0.0 to 1.0), applied when packing periods
    pub master_volume: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            max_latency: 0.05,
            master_volume: 0.25,
        }
    }
}

impl SynthConfig {
    /// Period queue capacity implied by the latency bound.
    pub fn queue_capacity(&self) -> usize {
        let cap = (self.max_latency / self.audio.period_length()).ceil() as usize;
        cap.max(1)
    }
}
