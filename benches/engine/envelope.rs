//! Benchmarks for the ADSR envelope.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polymod::{dsp::envelope::AdsrShape, dsp::Envelope, EnvelopeConfig};

const PERIOD: usize = 64;

fn step(env: &mut Envelope, gate: bool) -> f32 {
    let mut acc = 0.0;
    for _ in 0..PERIOD {
        acc += env.next_sample(black_box(gate));
    }
    acc
}

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope");
    let shape = AdsrShape::from_config(&EnvelopeConfig::default(), 44_100);

    // Attack phase (ramping up); restarted so it never leaves attack
    let mut env = Envelope::new(shape);
    group.bench_with_input(BenchmarkId::new("attack", PERIOD), &PERIOD, |b, _| {
        b.iter(|| {
            env.note_on();
            black_box(step(&mut env, true))
        })
    });

    // Sustain phase (holding steady)
    let mut env = Envelope::new(shape);
    env.note_on();
    for _ in 0..shape.attack_samples + shape.decay_samples + 2 {
        env.next_sample(true);
    }
    group.bench_with_input(BenchmarkId::new("sustain", PERIOD), &PERIOD, |b, _| {
        b.iter(|| black_box(step(&mut env, true)))
    });

    // Idle (the common case for most of the pool)
    let mut env = Envelope::new(shape);
    group.bench_with_input(BenchmarkId::new("idle", PERIOD), &PERIOD, |b, _| {
        b.iter(|| black_box(step(&mut env, false)))
    });

    group.finish();
}
