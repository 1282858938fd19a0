//! SoundFont reading tests: RIFF structure, record decoding, and the
//! error paths for malformed files.

mod common;

use common::{sine_pcm, small_config, TestFont, TestZone};
use sonafont::playback::{MemorySink, MemoryTap};
use sonafont::soundfont::definitions::{Generator, SampleLink};
use sonafont::{SoundFont, SynthError, Synthesizer};

#[test]
fn test_parse_minimal_font() {
    let pcm = sine_pcm(440.0, 44100, 2000, 0.5);
    let font = TestFont::new(pcm.clone(), 44100, 69);
    let parsed = SoundFont::from_bytes(&font.build()).unwrap();

    assert_eq!(parsed.name, "Test Font");
    assert_eq!(parsed.presets.len(), 1);
    assert_eq!(parsed.instruments.len(), 1);
    assert_eq!(parsed.samples.len(), 1);

    let sample = &parsed.samples[0];
    assert_eq!(sample.name, "Test Sample");
    assert_eq!(sample.sample_rate, 44100);
    assert_eq!(sample.pitch, 69);
    assert_eq!(sample.link, SampleLink::Mono);
    assert_eq!(&*sample.data, &pcm);
}

#[test]
fn test_find_preset_by_bank_and_number() {
    let mut font = TestFont::new(vec![0; 100], 44100, 60);
    font.bank = 8;
    font.preset_num = 42;
    let parsed = SoundFont::from_bytes(&font.build()).unwrap();

    assert!(parsed.find_preset(8, 42).is_some());
    assert!(parsed.find_preset(0, 0).is_none());
    assert_eq!(parsed.find_preset(8, 42).unwrap().name, "Test Preset");
}

#[test]
fn test_zone_ranges_are_decoded() {
    let mut font = TestFont::new(vec![0; 100], 44100, 60);
    font.inst_zones = vec![TestZone {
        key_range: Some((40, 80)),
        vel_range: Some((20, 100)),
        gens: vec![],
    }];
    let parsed = SoundFont::from_bytes(&font.build()).unwrap();

    let zone = &parsed.instruments[0].zones[0];
    assert_eq!(zone.key_range, (40, 80));
    assert_eq!(zone.vel_range, (20, 100));
}

#[test]
fn test_zone_generators_are_decoded() {
    let mut font = TestFont::new(vec![0; 100], 44100, 60);
    font.inst_zones = vec![TestZone::full_range()
        .with_gen(51, -2) // coarseTune
        .with_gen(52, 35)]; // fineTune
    let parsed = SoundFont::from_bytes(&font.build()).unwrap();

    let zone = &parsed.instruments[0].zones[0];
    assert_eq!(zone.get(Generator::CoarseTune), Some(-2));
    assert_eq!(zone.get(Generator::FineTune), Some(35));
    assert_eq!(zone.get(Generator::SampleId), Some(0));
}

#[test]
fn test_loop_points_are_rebased_to_sample() {
    let mut font = TestFont::new(vec![0; 500], 44100, 60);
    font.loop_points = Some((100, 400));
    let parsed = SoundFont::from_bytes(&font.build()).unwrap();

    let sample = &parsed.samples[0];
    assert_eq!(sample.loop_start, 100);
    assert_eq!(sample.loop_end, 400);
}

#[test]
fn test_not_riff_is_rejected() {
    let result = SoundFont::from_bytes(b"this is not a soundfont at all..");
    assert!(matches!(result, Err(SynthError::SoundFontParse(_))));
}

#[test]
fn test_wrong_form_type_is_rejected() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&8u32.to_le_bytes());
    bytes.extend_from_slice(b"WAVEdata");
    assert!(matches!(
        SoundFont::from_bytes(&bytes),
        Err(SynthError::SoundFontParse(_))
    ));
}

#[test]
fn test_truncated_font_is_rejected() {
    let font = TestFont::new(vec![0; 100], 44100, 60).build();
    let truncated = &font[..font.len() - 30];
    assert!(matches!(
        SoundFont::from_bytes(truncated),
        Err(SynthError::SoundFontParse(_))
    ));
}

#[test]
fn test_sample_offsets_past_pool_are_rejected() {
    // Hand-corrupt the shdr: the builder writes end = pcm length; a
    // pool of 10 points with end beyond it must fail.
    let font = TestFont::new(vec![1; 10], 44100, 60);
    let mut bytes = font.build();
    // Find the shdr payload and bump its end field well past the pool.
    let pos = bytes
        .windows(4)
        .position(|w| w == b"shdr".as_slice())
        .expect("shdr chunk present");
    let end_field = pos + 8 + 20 + 4; // header + name + start
    bytes[end_field..end_field + 4].copy_from_slice(&1_000_000u32.to_le_bytes());

    assert!(matches!(
        SoundFont::from_bytes(&bytes),
        Err(SynthError::SoundFontParse(_))
    ));
}

#[test]
fn test_failed_load_preserves_loaded_fonts() {
    let tap = MemoryTap::new();
    let mut synth = Synthesizer::with_sink(small_config(), MemorySink::factory(tap));

    let good = TestFont::new(vec![0; 100], 8000, 60).build();
    synth.load_soundfont_bytes(&good).unwrap();

    let result = synth.load_soundfont_bytes(b"garbage bytes, not a font");
    assert!(result.is_err());

    // The earlier font is still there and still playable.
    assert_eq!(synth.fonts().len(), 1);
    assert!(synth.new_instrument(0, 0).is_ok());
    synth.halt();
}

#[test]
fn test_load_missing_file_errors() {
    let tap = MemoryTap::new();
    let mut synth = Synthesizer::with_sink(small_config(), MemorySink::factory(tap));
    let result = synth.load_soundfont("/nonexistent/font.sf2");
    assert!(matches!(result, Err(SynthError::SoundFontParse(_))));
    synth.halt();
}
