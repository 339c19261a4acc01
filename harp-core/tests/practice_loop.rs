use std::sync::Arc;
use std::time::{Duration, Instant};

use assert_approx_eq::assert_approx_eq;
use harp_core::catalog::{load_default_catalog, select_lick};
use harp_core::sequencer::{Cue, Plan, Transport};
use harp_core::timeline::{Sound, compile_timeline};
use harp_core::{Bpm, Criteria, HarpKey, PlayMode, PlaybackEvent, PlaybackSession, Register, TrainerConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn selected_lick_plays_on_schedule() {
    let load = load_default_catalog();
    assert!(load.errors.is_empty());
    let criteria = Criteria::new(HarpKey::G, "Blues", Register::Low);
    let mut rng = StdRng::seed_from_u64(11);
    let lick = select_lick(&load.catalog, &criteria, None, &mut rng).unwrap();

    let bpm = Bpm::new(100.0).unwrap();
    let timeline = compile_timeline(lick, bpm);
    assert_approx_eq!(timeline.total_ms, lick.total_beats() * 600.0, 1e-9);

    let t0 = Instant::now();
    let mut transport = Transport::new();
    transport.start(Plan::once(timeline.clone()), t0);
    let cues = transport.poll(t0 + timeline.total() + Duration::from_millis(1));

    let sounds: Vec<(usize, Sound)> = cues
        .iter()
        .filter_map(|c| match c {
            Cue::Sound { index, sound, .. } => Some((*index, *sound)),
            _ => None,
        })
        .collect();
    assert_eq!(sounds.len(), lick.notes.len());
    for ((index, sound), note) in sounds.iter().zip(&lick.notes) {
        assert_eq!(*sound, note.tab.map_or(Sound::Rest, Sound::Note), "entry {index}");
    }
    assert_eq!(cues.last(), Some(&Cue::Event(PlaybackEvent::Completed)));
}

#[test]
fn session_drives_a_reselecting_loop() {
    let catalog = Arc::new(load_default_catalog().catalog);
    let config = TrainerConfig {
        key: HarpKey::C,
        scale: "Blues".to_string(),
        register: Register::Middle,
        bpm: 240.0,
        mode: PlayMode::CallAndResponse,
        reselect_each_cycle: true,
        ..TrainerConfig::default()
    };
    let mut session = PlaybackSession::new(&config).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    session.next_lick(&catalog, &mut rng).unwrap();
    let plan = session.plan(&catalog, StdRng::seed_from_u64(6)).unwrap();

    let t0 = Instant::now();
    let mut transport = Transport::new();
    transport.start(plan, t0);

    let mut started = Vec::new();
    let mut now = t0;
    for _ in 0..400 {
        now += Duration::from_millis(25);
        for cue in transport.poll(now) {
            if let Cue::Event(PlaybackEvent::Started { lick_id, iteration }) = cue {
                started.push((iteration, lick_id));
            }
        }
    }
    assert!(started.len() >= 2);
    for (i, (iteration, lick_id)) in started.iter().enumerate() {
        assert_eq!(*iteration, i + 1);
        let lick = catalog.find(lick_id.as_deref().unwrap()).unwrap();
        assert_eq!(lick.register, Register::Middle);
        assert_eq!(lick.scale, "Blues");
    }
}
