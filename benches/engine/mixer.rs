//! Benchmarks for one mixer period.

use std::{hint::black_box, sync::Arc};

use criterion::{BenchmarkId, Criterion};
use polymod::{
    dsp::{SoundBank, Waveform},
    engine::{Mixer, TrackerFeed},
    io::keys::KEYBOARD,
    ring::sample_ring,
    synth::VoicePool,
    tracker::{demo_song, Module, Player},
    EngineConfig,
};

use crate::VOICE_COUNTS;

fn mixer_with_voices(config: &EngineConfig, voices: usize) -> Mixer {
    let pool = VoicePool::from_config(config, Waveform::organ(config.output_rate), SoundBank::default());
    let mut mixer = Mixer::from_config(config, pool);
    for (note, key) in KEYBOARD.iter().enumerate().take(voices) {
        mixer.pool_mut().start(note as u8, key.frequency());
    }
    mixer
}

pub fn bench_mixer(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixer");
    let config = EngineConfig::default();

    // Held notes sit in sustain for the whole run
    for &voices in VOICE_COUNTS {
        let mut mixer = mixer_with_voices(&config, voices);
        group.bench_with_input(BenchmarkId::new("voices", voices), &voices, |b, _| {
            b.iter(|| {
                black_box(mixer.render_period());
            })
        });
    }

    // Full load: 13 voices plus tracker samples from the ring
    let module = Arc::new(Module::parse(demo_song()).expect("demo song parses"));
    let (tx, rx) = sample_ring(config.ring_capacity);
    let mut feed = TrackerFeed::new(
        Player::new(module, config.tracker_rate),
        tx,
        config.output_rate,
        config.tracker_gain,
    );
    let mut mixer = mixer_with_voices(&config, 13).with_tracker(rx);
    group.bench_function("voices_and_tracker", |b| {
        b.iter(|| {
            if feed.queued() < config.frames_per_period {
                feed.produce_tick();
            }
            black_box(mixer.render_period());
        })
    });

    group.finish();
}
