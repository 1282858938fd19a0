//! Playback Module
//!
//! The real-time half of the engine: the buffer registry, the mix
//! thread, and the audio sinks. Everything upstream (voices, presets)
//! feeds into the `AudioInterface` here.

pub mod buffer;
pub mod mixer;
pub mod sink;

pub use buffer::{AudioSource, CollectStatus, Registry};
pub use mixer::AudioInterface;
pub use sink::{AudioSink, CpalSink, MemorySink, MemoryTap, SinkFactory};
