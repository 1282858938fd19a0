//! Mix Engine
//!
//! The audio interface: a registry of playback sources shared with the
//! control thread, a dedicated mix thread producing one packed period
//! per iteration, and a sink thread draining the bounded period queue
//! into the output device.
//!
//! # Period loop
//!
//! Each iteration the mix thread: garbage-collects at most one finished
//! buffer when the queue is full, zeroes the f32 accumulator, pulls one
//! period's worth of samples from every live source under a single
//! registry lock acquisition, applies master volume, clamps to the
//! 16-bit range, packs little-endian, and enqueues. The enqueue blocks
//! when the queue is full: that block is the engine's backpressure, and
//! the queue capacity is its latency knob.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::config::SynthConfig;
use crate::error::SynthError;
use crate::playback::buffer::{AudioSource, CustomSource, PlaybackEntry, Registry, StaticBuffer};
use crate::playback::sink::SinkFactory;

/// Hard clip bound: +/-(2^15 - 1).
const VAL_LIMIT: f32 = (1 << 15) as f32 - 1.0;

/// The playback engine: registry plus mix and sink threads.
pub struct AudioInterface {
    config: SynthConfig,
    registry: Arc<Mutex<Registry>>,
    halted: Arc<AtomicBool>,
    mix_handle: Mutex<Option<JoinHandle<()>>>,
    sink_handle: Mutex<Option<JoinHandle<()>>>,
}

impl AudioInterface {
    /// Start the engine: spawns the sink thread (which opens the sink
    /// via `sink_factory`) and the mix thread, then primes the pipeline
    /// with a second of silence so the device never underruns during
    /// warmup.
    pub fn new(config: SynthConfig, sink_factory: SinkFactory) -> Self {
        let registry = Arc::new(Mutex::new(Registry::new()));
        let halted = Arc::new(AtomicBool::new(false));

        let queue_capacity = config.queue_capacity();
        let (period_tx, period_rx) = bounded::<Vec<u8>>(queue_capacity);
        // Drained period buffers travel back for reuse; the mix loop
        // then allocates only while the pipeline is filling.
        let (recycle_tx, recycle_rx) = unbounded::<Vec<u8>>();

        log::info!(
            "audio interface: {:?}, queue capacity {} ({:.5}s latency)",
            config.audio,
            queue_capacity,
            queue_capacity as f64 * config.audio.period_length()
        );

        let sink_handle = {
            let halted = Arc::clone(&halted);
            std::thread::spawn(move || {
                run_sink(sink_factory, period_rx, recycle_tx, halted);
            })
        };

        let mix_handle = {
            let registry = Arc::clone(&registry);
            let halted = Arc::clone(&halted);
            let config = config;
            std::thread::spawn(move || {
                run_mixer(config, registry, halted, period_tx, recycle_rx);
            })
        };

        let interface = Self {
            config,
            registry,
            halted,
            mix_handle: Mutex::new(Some(mix_handle)),
            sink_handle: Mutex::new(Some(sink_handle)),
        };

        // Run some zeros through the system to prevent underruns on
        // initial playback.
        let blank = vec![0i16; config.audio.sample_rate as usize];
        let _ = interface.play(&blank, 1, None, false);

        interface
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    fn check_running(&self) -> Result<(), SynthError> {
        if self.halted.load(Ordering::SeqCst) {
            Err(SynthError::Halted)
        } else {
            Ok(())
        }
    }

    /// Register a static PCM buffer for playback.
    ///
    /// `channels` is the buffer's own channel count; it must divide the
    /// engine channel count, and each frame is replicated to fill the
    /// output channels. The optional loop region is in the buffer's
    /// frame indices. An `immortal` buffer survives finishing and can
    /// be extended or looped again later.
    pub fn play(
        &self,
        pcm: &[i16],
        channels: u16,
        loop_region: Option<(usize, usize)>,
        immortal: bool,
    ) -> Result<u64, SynthError> {
        self.check_running()?;

        let ratio = self.channel_ratio(channels);
        let mut data = Vec::with_capacity(pcm.len() * ratio);
        for &frame in pcm {
            for _ in 0..ratio {
                data.push(frame as f32);
            }
        }
        let loop_region = loop_region.map(|(s, e)| (s * ratio, e * ratio));

        let id = self
            .registry
            .lock()
            .insert(PlaybackEntry::Static(StaticBuffer::new(
                data,
                loop_region,
                immortal,
            )));
        Ok(id)
    }

    /// Register a pull-based source (a voice). The id is the source's
    /// playback handle for `release`/`end_loop`.
    pub fn add_custom(
        &self,
        source: Box<dyn AudioSource>,
        initially_looping: bool,
    ) -> Result<u64, SynthError> {
        self.check_running()?;
        let id = self
            .registry
            .lock()
            .insert(PlaybackEntry::Custom(CustomSource {
                source,
                looping: initially_looping,
                finished: false,
            }));
        Ok(id)
    }

    /// Append PCM to an existing static buffer.
    pub fn extend(&self, id: u64, pcm: &[i16], channels: u16) -> Result<(), SynthError> {
        self.check_running()?;
        let ratio = self.channel_ratio(channels);
        let mut more = Vec::with_capacity(pcm.len() * ratio);
        for &frame in pcm {
            for _ in 0..ratio {
                more.push(frame as f32);
            }
        }
        let mut registry = self.registry.lock();
        match registry.get_mut(id) {
            Some(PlaybackEntry::Static(buf)) => {
                buf.extend(&more);
                Ok(())
            }
            _ => {
                log::warn!("extend: no static buffer with id {}", id);
                Ok(())
            }
        }
    }

    /// Disable loop wrap-around on a source; it plays out its tail.
    pub fn end_loop(&self, id: u64) {
        self.registry.lock().end_loop(id);
    }

    /// Release the voice behind a custom source.
    pub fn release(&self, id: u64) {
        self.registry.lock().release(id);
    }

    /// Number of live registry entries (voices plus static buffers).
    pub fn live_sources(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Stop the engine. The mix thread exits after the period in
    /// flight; dropping its queue sender wakes the sink thread, which
    /// then exits too. Pending notes are dropped.
    pub fn halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
        if let Some(handle) = self.mix_handle.lock().take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.sink_handle.lock().take() {
            let _ = handle.join();
        }
    }

    fn channel_ratio(&self, channels: u16) -> usize {
        let channels = channels.max(1);
        (self.config.audio.channels / channels).max(1) as usize
    }
}

impl Drop for AudioInterface {
    fn drop(&mut self) {
        self.halt();
    }
}

/// The mix thread body.
fn run_mixer(
    config: SynthConfig,
    registry: Arc<Mutex<Registry>>,
    halted: Arc<AtomicBool>,
    period_tx: Sender<Vec<u8>>,
    recycle_rx: Receiver<Vec<u8>>,
) {
    let period_words = config.audio.period_words();
    let period_bytes = config.audio.period_bytes();
    let volume = config.master_volume;
    let mut accumulator = vec![0.0f32; period_words];

    loop {
        if halted.load(Ordering::SeqCst) {
            break;
        }

        // Take the time to delete a single buffer when the queue is
        // already full; at most one per period bounds the work.
        if period_tx.is_full() {
            registry.lock().gc_one();
        }

        accumulator.iter_mut().for_each(|s| *s = 0.0);
        {
            let mut registry = registry.lock();
            for (_, entry) in registry.iter_mut() {
                entry.collect_into(&mut accumulator);
            }
        }

        let mut packed = recycle_rx
            .try_recv()
            .unwrap_or_else(|_| vec![0u8; period_bytes]);
        packed.resize(period_bytes, 0);
        for (bytes, &sample) in packed.chunks_exact_mut(2).zip(accumulator.iter()) {
            let clamped = (sample * volume).clamp(-VAL_LIMIT, VAL_LIMIT).round() as i16;
            bytes.copy_from_slice(&clamped.to_le_bytes());
        }

        // Backpressure: blocks while the queue is at capacity.
        if period_tx.send(packed).is_err() {
            break;
        }
    }
}

/// The sink thread body: build the sink, then drain periods into it.
fn run_sink(
    sink_factory: SinkFactory,
    period_rx: Receiver<Vec<u8>>,
    recycle_tx: Sender<Vec<u8>>,
    halted: Arc<AtomicBool>,
) {
    let mut sink = match sink_factory() {
        Ok(sink) => sink,
        Err(e) => {
            log::error!("audio sink failed to open: {}", e);
            halted.store(true, Ordering::SeqCst);
            return;
        }
    };

    while let Ok(period) = period_rx.recv() {
        if let Err(e) = sink.write(&period) {
            log::error!("audio sink write failed, halting: {}", e);
            halted.store(true, Ordering::SeqCst);
            break;
        }
        let _ = recycle_tx.send(period);
    }
}
