pub mod config; // Engine configuration and TOML loading
pub mod dsp;
pub mod engine; // Mixer, rate conversion and the two run loops
pub mod io;
pub mod ring;
pub mod synth; // Voice pool and note messages
pub mod tracker; // MOD parsing and playback

pub use config::{ConfigError, EngineConfig, EnvelopeConfig};

/// Reference output rate of the audio sink.
pub const OUTPUT_RATE: u32 = 44_100;
/// Stereo frames handed to the sink per mixer period.
pub const FRAMES_PER_PERIOD: usize = 64;
