use std::time::Instant;

use crate::{
    ring::SampleProducer,
    tracker::{tick_duration, Player},
};

use super::{pacer::Pacer, resample::Resampler};

/// Producer side of the tracker ring: renders ticks and pushes them, gained
/// and converted to the output rate.
pub struct TrackerFeed {
    player: Player,
    resampler: Resampler,
    producer: SampleProducer,
    gain: f32,
    dropped: u64,
}

impl TrackerFeed {
    pub fn new(player: Player, producer: SampleProducer, output_rate: u32, gain: f32) -> Self {
        let resampler = Resampler::new(player.native_rate(), output_rate);
        Self {
            player,
            resampler,
            producer,
            gain,
            dropped: 0,
        }
    }

    /// Render one tick into the ring. Returns the native samples generated.
    ///
    /// A full ring drops the newest samples.
    pub fn produce_tick(&mut self) -> usize {
        let Self {
            player,
            resampler,
            producer,
            gain,
            dropped,
        } = self;

        let tick = player.next_tick();
        resampler.process(tick, *gain, |s| {
            if !producer.try_write(s) {
                *dropped += 1;
            }
        });
        tick.len()
    }

    /// Samples lost to a full ring since the feed started.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Output-rate samples waiting in the ring.
    pub fn queued(&self) -> usize {
        self.producer.len()
    }

    /// Samples the ring can still take.
    pub fn free_len(&self) -> usize {
        self.producer.free_len()
    }

    /// Produce ticks forever, sleeping for the audio each one represents.
    ///
    /// Returns once the mixer drops its end of the ring.
    pub fn run(mut self) {
        let rate = self.player.native_rate();
        let mut pacer = Pacer::new(Instant::now());

        tracing::info!(
            title = self.player.module().title(),
            native_rate = rate,
            "tracker started"
        );

        while !self.producer.is_abandoned() {
            let generated = self.produce_tick();
            pacer.wait(tick_duration(generated, rate));
        }

        tracing::info!(dropped = self.dropped, "tracker stopped");
    }
}
