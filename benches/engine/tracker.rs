//! Benchmarks for tracker ticks and rate conversion.

use std::{hint::black_box, sync::Arc};

use criterion::{BenchmarkId, Criterion};
use polymod::{
    engine::Resampler,
    tracker::{demo_song, Module, Player, NATIVE_RATE},
};

pub fn bench_tracker(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker");
    let module = Arc::new(Module::parse(demo_song()).expect("demo song parses"));

    let mut player = Player::new(Arc::clone(&module), NATIVE_RATE);
    group.bench_function("tick", |b| {
        b.iter(|| {
            black_box(player.next_tick().len());
        })
    });

    let tick: Vec<i16> = Player::new(module, NATIVE_RATE).next_tick().to_vec();
    for output_rate in [44_100u32, 48_000] {
        let mut resampler = Resampler::new(NATIVE_RATE, output_rate);
        group.bench_with_input(BenchmarkId::new("resample", output_rate), &output_rate, |b, _| {
            b.iter(|| {
                let mut acc = 0i32;
                resampler.process(black_box(&tick), 0.7, |s| acc += i32::from(s));
                black_box(acc)
            })
        });
    }

    group.finish();
}
