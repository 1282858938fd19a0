//! Small demo harness: load a SoundFont and play a few bars.
//!
//! ```text
//! play <font.sf2> [bank] [preset]
//! ```

use std::time::Duration;

use sonafont::{Event, Synthesizer};

// (key, beats); None is a rest
const TUNE: &[(Option<u8>, f64)] = &[
    (Some(67), 1.0),
    (Some(60), 1.0),
    (None, 0.5),
    (Some(72), 1.0),
    (Some(69), 0.5),
    (Some(67), 1.0),
    (Some(60), 1.0),
    (None, 0.5),
    (Some(67), 1.0),
    (Some(65), 0.5),
    (Some(64), 0.5),
    (Some(64), 0.5),
    (Some(65), 0.5),
    (Some(67), 0.5),
    (Some(60), 1.0),
    (Some(62), 1.0),
    (Some(64), 4.0),
];

const BEAT: f64 = 60.0 / 200.0;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("usage: play <font.sf2> [bank] [preset]");
            std::process::exit(2);
        }
    };
    let bank: u16 = args.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    let preset: u16 = args.next().and_then(|s| s.parse().ok()).unwrap_or(0);

    let mut synth = Synthesizer::new();
    if let Err(e) = synth.load_soundfont(&path) {
        eprintln!("cannot load {}: {}", path, e);
        std::process::exit(1);
    }

    let mut inst = match synth.new_instrument(bank, preset) {
        Ok(inst) => inst,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("available presets:");
            for font in synth.fonts() {
                for (bank, preset, name) in font.preset_list() {
                    eprintln!("  {:3} {:3}  {}", bank, preset, name);
                }
            }
            std::process::exit(1);
        }
    };
    println!("playing '{}'", inst.preset_name());

    for &(key, beats) in TUNE {
        let length = Duration::from_secs_f64(beats * BEAT);
        match key {
            None => std::thread::sleep(length),
            Some(key) => {
                let _ = inst.send_event(Event::note_on(key, 100));
                let _ = inst.send_event(Event::note_on(key + 4, 100));
                std::thread::sleep(length);
                let _ = inst.send_event(Event::note_off(key));
                let _ = inst.send_event(Event::note_off(key + 4));
            }
        }
    }

    // Let the release tails ring out before tearing the engine down.
    std::thread::sleep(Duration::from_secs(1));
    synth.halt();
}
