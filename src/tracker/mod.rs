// Purpose: MOD module loading and background playback
// The player renders at the module's authored rate; conversion to the output
// rate happens in the engine, at the ring buffer boundary

pub mod builder;
pub mod error;
pub mod module;
pub mod player;

use std::time::Duration;

pub use builder::{demo_song, ModuleBuilder, PatternBuilder, SampleSpec};
pub use error::ModuleError;
pub use module::{channels_for_tag, Cell, Module, SampleInfo};
pub use player::{ChannelState, Player};

pub const MAX_SAMPLES: usize = 31;
pub const ROWS_PER_PATTERN: usize = 64;
pub const BYTES_PER_CELL: usize = 4;
pub const HEADER_LEN: usize = 1084;
pub const MAX_CHANNELS: usize = 32;
/// Entries in the order list.
pub const MAX_POSITIONS: usize = 128;

/// Amiga PAL/NTSC period clock. Periods are divisions of this.
pub const PERIOD_CLOCK: f64 = 7_159_090.5;

pub const DEFAULT_TEMPO: u32 = 125;
pub const DEFAULT_SPEED: u32 = 6;

/// Rate MOD samples are authored for.
pub const NATIVE_RATE: u32 = 22_050;

/// 8-bit samples are scaled up by this after volume is applied.
pub const MIX_GAIN: i32 = 32;

/// Playback frequency in Hz of a note period. Period 0 means "no note".
pub fn period_to_frequency(period: u16) -> f64 {
    if period == 0 {
        return 0.0;
    }
    PERIOD_CLOCK / (f64::from(period) * 2.0)
}

/// Samples in one tick at `tempo` BPM. At least 1.
pub fn samples_per_tick(tempo: u32, native_rate: u32) -> usize {
    let tempo = u64::from(tempo.max(1));
    ((2500 * u64::from(native_rate)) / (tempo * 1000)).max(1) as usize
}

/// Wall-clock length of `samples` at `rate`.
pub fn tick_duration(samples: usize, rate: u32) -> Duration {
    if rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(samples as u64 * 1_000_000_000 / u64::from(rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_length_follows_tempo() {
        assert_eq!(samples_per_tick(125, 22_050), 441);
        assert_eq!(samples_per_tick(250, 22_050), 220);
        assert_eq!(samples_per_tick(125, 44_100), 882);
        assert_eq!(samples_per_tick(0, 22_050), 441 * 125);
    }

    #[test]
    fn period_frequency() {
        assert_eq!(period_to_frequency(0), 0.0);
        // C-3 in ProTracker terms
        let f = period_to_frequency(428);
        assert!((f - 8363.4).abs() < 0.5, "{f}");
    }

    #[test]
    fn tick_duration_matches_rate() {
        assert_eq!(tick_duration(441, 22_050), Duration::from_millis(20));
        assert_eq!(tick_duration(100, 0), Duration::ZERO);
    }
}
