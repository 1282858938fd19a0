//! Audio sinks.
//!
//! The mix engine produces byte-packed periods; a sink accepts them
//! with a single blocking `write`. The production sink bridges to a
//! cpal output stream through an SPSC ring buffer (the stream callback
//! pulls, `write` pushes and parks while the ring is full). Tests and
//! benches use `MemorySink`, which just records what it is given.

use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use ringbuf::{traits::*, HeapRb};

use crate::config::AudioConfig;
use crate::error::SynthError;

/// Destination for packed periods. `write` blocks until the period has
/// been accepted; that block is where queue backpressure ends up.
pub trait AudioSink {
    fn write(&mut self, period: &[u8]) -> Result<(), SynthError>;
}

/// Builds the sink on the sink thread itself. cpal streams are not
/// `Send`, so the stream must be opened by the thread that drives it.
pub type SinkFactory = Box<dyn FnOnce() -> Result<Box<dyn AudioSink>, SynthError> + Send>;

// --- cpal ---------------------------------------------------------------

/// Sink backed by the default OS output device.
pub struct CpalSink {
    _stream: cpal::Stream,
    producer: ringbuf::HeapProd<i16>,
}

impl CpalSink {
    /// Open the default output device at the configured format.
    pub fn open(config: &AudioConfig) -> Result<Self, SynthError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SynthError::Sink("no default output device".into()))?;

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // Enough ring headroom that a scheduling hiccup on either side
        // does not immediately starve the device.
        let ring_capacity = (config.period_words() * 8).max(4096);
        let (producer, mut consumer) = HeapRb::<i16>::new(ring_capacity).split();

        let stream = device
            .build_output_stream(
                &stream_config,
                move |out: &mut [i16], _| {
                    for sample in out.iter_mut() {
                        // Underruns play silence rather than stale data.
                        *sample = consumer.try_pop().unwrap_or(0);
                    }
                },
                |err| log::error!("output stream error: {}", err),
                None,
            )
            .map_err(|e| SynthError::Sink(format!("cannot build output stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| SynthError::Sink(format!("cannot start output stream: {}", e)))?;

        log::info!(
            "opened output device '{}' at {} Hz, {} channels",
            device.name().unwrap_or_else(|_| "unknown".into()),
            config.sample_rate,
            config.channels
        );

        Ok(Self {
            _stream: stream,
            producer,
        })
    }

    /// Factory for the engine's sink thread.
    pub fn factory(config: AudioConfig) -> SinkFactory {
        Box::new(move || Ok(Box::new(CpalSink::open(&config)?) as Box<dyn AudioSink>))
    }
}

impl AudioSink for CpalSink {
    fn write(&mut self, period: &[u8]) -> Result<(), SynthError> {
        for bytes in period.chunks_exact(2) {
            let mut value = i16::from_le_bytes([bytes[0], bytes[1]]);
            loop {
                match self.producer.try_push(value) {
                    Ok(()) => break,
                    Err(rejected) => {
                        value = rejected;
                        std::thread::sleep(Duration::from_micros(500));
                    }
                }
            }
        }
        Ok(())
    }
}

// --- in-memory ----------------------------------------------------------

/// Handle onto a `MemorySink`'s output, readable from any thread.
#[derive(Clone, Default)]
pub struct MemoryTap {
    written: Arc<Mutex<Vec<u8>>>,
}

impl MemoryTap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes the sink has accepted so far.
    pub fn bytes_written(&self) -> usize {
        self.written.lock().len()
    }

    /// Copy of everything written so far.
    pub fn snapshot(&self) -> Vec<u8> {
        self.written.lock().clone()
    }

    /// Decode the written stream as little-endian i16 samples.
    pub fn samples(&self) -> Vec<i16> {
        self.written
            .lock()
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }
}

/// Sink that appends periods to a shared byte vector.
///
/// By default it accepts periods instantly. `paced` adds a fixed
/// acceptance delay per period, which makes the sink behave like a
/// (sped-up) real device: the queue upstream fills, backpressure
/// engages, and the mixer's queue-full housekeeping actually runs.
pub struct MemorySink {
    tap: MemoryTap,
    pace: Duration,
}

impl MemorySink {
    pub fn new(tap: MemoryTap) -> Self {
        Self {
            tap,
            pace: Duration::ZERO,
        }
    }

    pub fn paced(tap: MemoryTap, pace: Duration) -> Self {
        Self { tap, pace }
    }

    pub fn factory(tap: MemoryTap) -> SinkFactory {
        Box::new(move || Ok(Box::new(MemorySink::new(tap)) as Box<dyn AudioSink>))
    }

    pub fn factory_paced(tap: MemoryTap, pace: Duration) -> SinkFactory {
        Box::new(move || Ok(Box::new(MemorySink::paced(tap, pace)) as Box<dyn AudioSink>))
    }
}

impl AudioSink for MemorySink {
    fn write(&mut self, period: &[u8]) -> Result<(), SynthError> {
        if !self.pace.is_zero() {
            std::thread::sleep(self.pace);
        }
        self.tap.written.lock().extend_from_slice(period);
        Ok(())
    }
}

/// Sink that fails on the first write; exercises the fatal-error path.
pub struct FailingSink;

impl FailingSink {
    pub fn factory() -> SinkFactory {
        Box::new(|| Ok(Box::new(FailingSink) as Box<dyn AudioSink>))
    }
}

impl AudioSink for FailingSink {
    fn write(&mut self, _period: &[u8]) -> Result<(), SynthError> {
        Err(SynthError::Sink("device gone".into()))
    }
}
