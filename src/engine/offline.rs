use std::{collections::VecDeque, sync::Arc};

use crate::{
    config::EngineConfig,
    dsp::waveform::{SoundBank, Waveform},
    io::sink::{AudioSink, SinkError},
    ring::sample_ring,
    synth::{message::SynthMessage, pool::VoicePool},
    tracker::{Module, Player},
};

use super::{feed::TrackerFeed, mixer::Mixer};

/// Single-threaded stand-in for the two real-time loops.
///
/// Before every mixer period the tracker is run until the ring holds at least
/// a period's worth of samples, so output never depends on scheduling. Note
/// events are applied at period boundaries, which is also where the real
/// mixer drains its queue.
pub struct OfflineRenderer {
    mixer: Mixer,
    feed: Option<TrackerFeed>,
    events: VecDeque<(u64, SynthMessage)>,
    frame: u64,
}

impl OfflineRenderer {
    pub fn new(mixer: Mixer, feed: Option<TrackerFeed>) -> Self {
        Self {
            mixer,
            feed,
            events: VecDeque::new(),
            frame: 0,
        }
    }

    /// Build a voice pool, mixer and (if a module is given) tracker feed
    /// from `config`.
    pub fn from_config(
        config: &EngineConfig,
        waveform: Waveform,
        sounds: SoundBank,
        module: Option<Arc<Module>>,
    ) -> Self {
        let pool = VoicePool::from_config(config, waveform, sounds);
        let mixer = Mixer::from_config(config, pool);

        match module {
            Some(module) => {
                let (tx, rx) = sample_ring(config.ring_capacity);
                let player = Player::new(module, config.tracker_rate);
                let feed = TrackerFeed::new(player, tx, config.output_rate, config.tracker_gain);
                Self::new(mixer.with_tracker(rx), Some(feed))
            }
            None => Self::new(mixer, None),
        }
    }

    /// Apply `msg` at the first period starting at or after `frame`.
    pub fn schedule(&mut self, frame: u64, msg: SynthMessage) {
        let at = self.events.partition_point(|&(f, _)| f <= frame);
        self.events.insert(at, (frame, msg));
    }

    /// Render at least `frames` frames into `sink`, in whole periods.
    ///
    /// Returns the frames written.
    pub fn render(&mut self, sink: &mut impl AudioSink, frames: usize) -> Result<usize, SinkError> {
        let per_period = self.mixer.frames_per_period();
        if per_period == 0 {
            return Ok(0);
        }

        let mut written = 0;
        while written < frames {
            self.apply_due_events();

            if let Some(feed) = &mut self.feed {
                // One stereo frame consumes one ring sample. A ring too small
                // for a whole period is filled as far as it goes.
                while feed.queued() < per_period && feed.free_len() > 0 {
                    if feed.produce_tick() == 0 {
                        break;
                    }
                }
            }

            let period = self.mixer.render_period();
            written += sink.write(period)?;
            self.frame += per_period as u64;
        }

        Ok(written)
    }

    /// Frames rendered so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut Mixer {
        &mut self.mixer
    }

    pub fn feed(&self) -> Option<&TrackerFeed> {
        self.feed.as_ref()
    }

    fn apply_due_events(&mut self) {
        while let Some(&(at, msg)) = self.events.front() {
            if at > self.frame {
                break;
            }
            self.events.pop_front();
            self.mixer.pool_mut().handle(msg);
        }
    }
}
