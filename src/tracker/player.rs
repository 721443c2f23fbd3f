use std::sync::Arc;

use super::{
    period_to_frequency, samples_per_tick, Module, DEFAULT_SPEED, DEFAULT_TEMPO, MAX_SAMPLES,
    MIX_GAIN, ROWS_PER_PATTERN,
};

/*
Sequencing
==========

Time in a MOD is counted in ticks. A row lasts `speed` ticks, a pattern is 64
rows, and the song is the position table played front to back, forever.

  position 0          position 1
  ┌──────────────┐    ┌──────────────┐
  │ row 0  ▸▸▸▸▸▸│    │ row 0        │       ▸ = tick (speed = 6)
  │ row 1  ▸▸▸▸▸▸│    │ ...          │
  │ ...          │    │              │
  │ row 63 ▸▸▸▸▸▸│ ─▶ │              │ ─▶ ... ─▶ back to position 0
  └──────────────┘    └──────────────┘

Notes and effects are read on tick 0 of each row only. Every tick then
renders `samples_per_tick` samples:

  samples_per_tick = (2500 × native_rate) / (tempo × 1000)

At the default tempo of 125 BPM that's a 20 ms tick, 441 samples at 22050 Hz.

Each channel reads signed 8-bit bytes through a 16.16 fixed-point cursor:

  position  = ┌────────────────┬────────────────┐
              │   byte index   │    fraction    │
              └────────────────┴────────────────┘
  increment = frequency × 65536 / native_rate

Looping samples jump back to loop_start when the cursor reaches the loop end;
everything else stops at the end of its data.
*/

/// Playback state of one module channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelState {
    period: u16,
    sample: u8,
    volume: u8,
    position: u64,
    increment: u64,
    effect: u8,
    param: u8,
}

impl ChannelState {
    /// Current note period. 0 when the channel is silent.
    pub fn period(&self) -> u16 {
        self.period
    }

    /// 1-based sample number, 0 if none has been selected.
    pub fn sample(&self) -> u8 {
        self.sample
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Byte index of the read cursor.
    pub fn byte_position(&self) -> usize {
        (self.position >> 16) as usize
    }

    /// Cursor step per rendered sample, 16.16 fixed point.
    pub fn increment(&self) -> u64 {
        self.increment
    }

    /// Effect and parameter from the last row that touched this channel.
    pub fn last_effect(&self) -> (u8, u8) {
        (self.effect, self.param)
    }

    pub fn is_playing(&self) -> bool {
        self.period > 0
    }

    fn stop(&mut self) {
        self.period = 0;
        self.position = 0;
    }

    #[inline]
    fn next_value(&mut self, module: &Module) -> i32 {
        if self.period == 0 {
            return 0;
        }
        let Some(info) = module.sample(self.sample) else {
            return 0;
        };
        let data = module.sample_data(self.sample);
        if data.is_empty() {
            self.stop();
            return 0;
        }

        let index = self.byte_position();
        let value = match data.get(index) {
            Some(&byte) => ((i32::from(byte as i8) * i32::from(self.volume)) / 64) * MIX_GAIN,
            None => 0,
        };

        self.position += self.increment;

        if info.loops() {
            let end = (info.loop_end() as u64) << 16;
            if self.position >= end {
                let start = (info.loop_start as u64) << 16;
                self.position = start + (self.position - end) % (end - start);
            }
        } else if self.byte_position() >= data.len() {
            self.stop();
        }

        value
    }
}

/// Renders a [`Module`] tick by tick at its native rate.
pub struct Player {
    module: Arc<Module>,
    native_rate: u32,
    channels: Vec<ChannelState>,
    position: usize,
    row: usize,
    tick: u32,
    speed: u32,
    tempo: u32,
    samples_per_tick: usize,
    buffer: Vec<i16>,
    loops: u64,
}

impl Player {
    pub fn new(module: Arc<Module>, native_rate: u32) -> Self {
        let channels = vec![ChannelState::default(); module.channels()];
        let samples_per_tick = samples_per_tick(DEFAULT_TEMPO, native_rate);

        Self {
            module,
            native_rate,
            channels,
            position: 0,
            row: 0,
            tick: 0,
            speed: DEFAULT_SPEED,
            tempo: DEFAULT_TEMPO,
            samples_per_tick,
            buffer: Vec::with_capacity(samples_per_tick),
            loops: 0,
        }
    }

    /// Render the next tick.
    ///
    /// Processes the current row first if this is tick 0, so a tempo change
    /// applies to the tick it appears on. The slice is valid until the next
    /// call.
    pub fn next_tick(&mut self) -> &[i16] {
        if self.tick == 0 {
            self.process_row();
        }

        self.render();
        self.advance();

        &self.buffer
    }

    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    pub fn native_rate(&self) -> u32 {
        self.native_rate
    }

    pub fn channels(&self) -> &[ChannelState] {
        &self.channels
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    pub fn samples_per_tick(&self) -> usize {
        self.samples_per_tick
    }

    /// How many times the song has wrapped back to position 0.
    pub fn loops(&self) -> u64 {
        self.loops
    }

    fn process_row(&mut self) {
        let pattern = self.module.pattern_at(self.position);
        let cells = self.module.row(pattern, self.row);

        for (channel, cell) in self.channels.iter_mut().zip(cells) {
            channel.effect = cell.effect;
            channel.param = cell.param;

            if (1..=MAX_SAMPLES as u8).contains(&cell.sample) {
                channel.sample = cell.sample;
                channel.volume = self.module.sample(cell.sample).map_or(0, |s| s.volume);
            }

            // Tone portamento keeps the running note
            if cell.period > 0 && cell.effect != 0x3 {
                channel.period = cell.period;
                channel.position = 0;
                channel.increment = (period_to_frequency(cell.period) * 65536.0
                    / f64::from(self.native_rate.max(1))) as u64;
            }

            match cell.effect {
                0xC => channel.volume = cell.param.min(64),
                0xD => self.row = ROWS_PER_PATTERN - 1,
                0xF if cell.param == 0 => {}
                0xF if cell.param < 0x20 => self.speed = u32::from(cell.param),
                0xF => {
                    self.tempo = u32::from(cell.param);
                    self.samples_per_tick = samples_per_tick(self.tempo, self.native_rate);
                }
                _ => {}
            }
        }
    }

    fn render(&mut self) {
        let module = &*self.module;
        self.buffer.clear();

        for _ in 0..self.samples_per_tick {
            let sum: i32 = self
                .channels
                .iter_mut()
                .map(|channel| channel.next_value(module))
                .sum();
            self.buffer
                .push(sum.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16);
        }
    }

    fn advance(&mut self) {
        self.tick += 1;
        if self.tick < self.speed {
            return;
        }

        self.tick = 0;
        self.row += 1;
        if self.row < ROWS_PER_PATTERN {
            return;
        }

        self.row = 0;
        self.position += 1;
        if self.position >= self.module.song_length() {
            self.position = 0;
            self.loops += 1;
            tracing::debug!(loops = self.loops, "song looped");
        }
    }
}
