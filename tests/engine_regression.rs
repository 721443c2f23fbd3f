use std::sync::Arc;

use polymod::{
    dsp::{envelope::EnvelopeState, AdsrShape, SoundBank, Waveform},
    engine::{OfflineRenderer, TrackerFeed},
    io::{keys::KEYBOARD, MemorySink, WavSink},
    synth::{SynthMessage, VoicePool},
    tracker::{demo_song, Module, ModuleBuilder, DEFAULT_SPEED, ROWS_PER_PATTERN},
    EngineConfig,
};

fn renderer(config: &EngineConfig, module: Option<Module>) -> OfflineRenderer {
    OfflineRenderer::from_config(
        config,
        Waveform::organ(config.output_rate),
        SoundBank::bounce(config.output_rate),
        module.map(Arc::new),
    )
}

#[test]
fn empty_module_renders_silence_for_whole_pattern() {
    let config = EngineConfig::default();
    let module = Module::parse(ModuleBuilder::new("silence", 4).build()).unwrap();
    let mut renderer = renderer(&config, Some(module));

    // 64 rows × 6 ticks × 441 samples, doubled to 44.1 kHz
    let frames = ROWS_PER_PATTERN * DEFAULT_SPEED as usize * 441 * 2;
    let mut sink = MemorySink::new();
    renderer.render(&mut sink, frames).unwrap();

    assert!(sink.frames() >= frames);
    assert!(sink.samples().iter().all(|&s| s == 0));

    let feed = renderer.feed().unwrap();
    assert!(feed.player().loops() >= 1);
    assert_eq!(feed.dropped(), 0);
}

#[test]
fn thirteen_held_notes_never_exceed_sustain() {
    let config = EngineConfig::default();
    let shape = AdsrShape::from_config(&config.envelope, config.output_rate);
    let mut pool = VoicePool::new(13, Waveform::organ(config.output_rate), shape);

    for (note, key) in KEYBOARD.iter().enumerate() {
        assert!(pool.start(note as u8, key.frequency()));
    }
    assert_eq!(pool.active_count(), 13);

    for _ in 0..shape.attack_samples + shape.decay_samples + 2 {
        pool.next_sample();
    }

    for _ in 0..4_410 {
        let (mix, active) = pool.next_sample();
        assert_eq!(active, 13);
        assert!(mix.abs() <= 13.0 * shape.sustain_level + 1e-4);
        for voice in pool.voices() {
            assert_eq!(voice.state(), EnvelopeState::Sustain);
            assert!(voice.envelope_level() <= shape.sustain_level + 1e-6);
        }
    }
}

#[test]
fn full_mix_is_deterministic_and_settles() {
    let config = EngineConfig::default();

    let render = || {
        let module = Module::parse(demo_song()).unwrap();
        let mut renderer = renderer(&config, Some(module));
        for (i, key) in KEYBOARD.iter().enumerate() {
            let at = i as u64 * 2_205;
            renderer.schedule(
                at,
                SynthMessage::NoteOn {
                    note: i as u8,
                    frequency: key.frequency(),
                },
            );
            renderer.schedule(at + 8_820, SynthMessage::NoteOff { note: i as u8 });
        }
        renderer.schedule(22_050, SynthMessage::Trigger { sound: 2 });

        let mut sink = MemorySink::new();
        renderer.render(&mut sink, 88_200).unwrap();
        assert_eq!(renderer.feed().map(TrackerFeed::dropped), Some(0));

        // Every note and the bounce have ended by the last second, so the
        // normalizer is back at unity gain
        assert_eq!(renderer.mixer().pool().active_count(), 0);
        let gain = renderer.mixer().normalizer().current_gain();
        assert!((gain - 1.0).abs() < 1e-3, "{gain}");

        sink.into_samples()
    };

    let first = render();
    let second = render();
    assert_eq!(first, second);

    assert!(first.iter().any(|&s| s != 0));
    assert!(first.chunks_exact(2).all(|f| f[0] == f[1]));
}

#[cfg(feature = "serde")]
#[test]
fn toml_config_shapes_the_engine() {
    let config = EngineConfig::from_toml_str(
        r#"
        polyphony = 2
        frames_per_period = 32

        [envelope]
        attack_ms = 0
        decay_ms = 0
        release_ms = 10
        "#,
    )
    .unwrap();

    let mut renderer = renderer(&config, None);
    assert_eq!(renderer.mixer().frames_per_period(), 32);
    assert_eq!(renderer.mixer().pool().polyphony(), 2);

    for note in 0..3 {
        renderer.schedule(0, SynthMessage::NoteOn { note, frequency: 440.0 });
    }
    let mut sink = MemorySink::new();
    renderer.render(&mut sink, 32).unwrap();
    assert_eq!(renderer.mixer().pool().active_count(), 2);
}

#[test]
fn renders_to_wav() {
    let config = EngineConfig::default();
    let path = std::env::temp_dir().join(format!("polymod-render-{}.wav", std::process::id()));

    let mut renderer = renderer(&config, Some(Module::parse(demo_song()).unwrap()));
    let mut sink = WavSink::create(&path, config.output_rate).unwrap();
    let written = renderer.render(&mut sink, 4_410).unwrap();
    sink.finalize().unwrap();

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.duration() as usize, written);
    assert_eq!(reader.spec().channels, 2);

    std::fs::remove_file(&path).ok();
}
