use rtrb::Consumer;

use crate::{
    config::EngineConfig,
    dsp::normalize::{from_i16, to_i16, Normalizer},
    io::sink::{AudioSink, SinkError, CHANNELS},
    ring::SampleConsumer,
    synth::{message::SynthMessage, pool::VoicePool},
};

/*
Mixing
======

Once per output period:

  note events ──drain──▶ VoicePool
                            │ Σ active voices
                            ▼
  tracker ring ──1 sample──▶ (+) ──▶ × smoothed 1/√active ──▶ clip ──▶ i16 ─┬─▶ L
                                                                            └─▶ R

The tracker sample is mixed in at whatever level it was queued at; only
synth voices count toward the normalizer's active total. An empty ring just
contributes silence for that sample.
*/

pub struct Mixer {
    pool: VoicePool,
    normalizer: Normalizer,
    tracker: Option<SampleConsumer>,
    events: Option<Consumer<SynthMessage>>,
    buffer: Vec<i16>,
    periods: u64,
}

impl Mixer {
    pub fn new(pool: VoicePool, normalizer: Normalizer, frames_per_period: usize) -> Self {
        Self {
            pool,
            normalizer,
            tracker: None,
            events: None,
            buffer: vec![0; frames_per_period * CHANNELS],
            periods: 0,
        }
    }

    pub fn from_config(config: &EngineConfig, pool: VoicePool) -> Self {
        Self::new(
            pool,
            Normalizer::new(config.smoothing_alpha),
            config.frames_per_period,
        )
    }

    /// Mix tracker output from this ring into every period.
    pub fn with_tracker(mut self, rx: SampleConsumer) -> Self {
        self.tracker = Some(rx);
        self
    }

    /// Drain note events from this queue at the start of every period.
    pub fn with_events(mut self, rx: Consumer<SynthMessage>) -> Self {
        self.events = Some(rx);
        self
    }

    /// Render one period of interleaved stereo frames.
    pub fn render_period(&mut self) -> &[i16] {
        if let Some(rx) = &mut self.events {
            self.pool.drain(rx);
        }

        for frame in self.buffer.chunks_exact_mut(CHANNELS) {
            let (mut mix, active) = self.pool.next_sample();

            if let Some(sample) = self.tracker.as_mut().and_then(SampleConsumer::try_read) {
                mix += from_i16(sample);
            }

            let out = to_i16(self.normalizer.process(mix, active));
            frame.fill(out);
        }

        self.periods += 1;
        &self.buffer
    }

    /// Render and write periods until the sink fails.
    pub fn run(&mut self, sink: &mut impl AudioSink) -> Result<(), SinkError> {
        tracing::info!(
            polyphony = self.pool.polyphony(),
            frames = self.frames_per_period(),
            tracker = self.tracker.is_some(),
            "mixer started"
        );

        loop {
            let frames = self.render_period();
            if let Err(err) = sink.write(frames) {
                tracing::error!(error = %err, periods = self.periods, "sink write failed, stopping mixer");
                return Err(err);
            }
        }
    }

    pub fn frames_per_period(&self) -> usize {
        self.buffer.len() / CHANNELS
    }

    /// Periods rendered so far.
    pub fn periods(&self) -> u64 {
        self.periods
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut VoicePool {
        &mut self.pool
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}
