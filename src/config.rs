//! Engine configuration.
//!
//! Everything the engine needs to know up front lives in [`EngineConfig`]. The
//! defaults reproduce the reference hardware setup: 44.1 kHz output written in
//! 64-frame periods, 13 voices with a short piano-like envelope, and a MOD
//! player running at 22.05 kHz underneath at 70% level.

use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tracker::{samples_per_tick, DEFAULT_TEMPO};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "serde")]
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: `{field}` {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Amplitude envelope applied to every synth voice.
///
/// Times are in milliseconds and converted to whole samples at the output
/// rate, so 5 ms at 44.1 kHz is exactly 220 samples.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeConfig {
    pub attack_ms: u32,
    pub decay_ms: u32,
    pub sustain_level: f32,
    pub release_ms: u32,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            attack_ms: 5,
            decay_ms: 100,
            sustain_level: 0.7,
            release_ms: 50,
        }
    }
}

/// Convert a duration in milliseconds to a whole number of samples.
pub fn ms_to_samples(ms: u32, sample_rate: u32) -> u32 {
    (u64::from(sample_rate) * u64::from(ms) / 1000) as u32
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Sink sample rate in Hz.
    pub output_rate: u32,
    /// Stereo frames rendered per mixer period.
    pub frames_per_period: usize,
    /// Hard cap on simultaneously sounding voices.
    pub polyphony: usize,
    pub envelope: EnvelopeConfig,
    /// One-pole smoothing coefficient for the loudness normalizer.
    pub smoothing_alpha: f32,
    /// Tracker ring buffer slots (holds one less sample than this).
    pub ring_capacity: usize,
    /// Rate the tracker renders at. Must be the module's authored rate.
    pub tracker_rate: u32,
    /// Level of the tracker music relative to full scale.
    pub tracker_gain: f32,
    /// Level of percussive trigger sounds.
    pub trigger_gain: f32,
    /// Slots in the note event queue between input and mixer.
    pub event_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_rate: crate::OUTPUT_RATE,
            frames_per_period: crate::FRAMES_PER_PERIOD,
            polyphony: 13,
            envelope: EnvelopeConfig::default(),
            smoothing_alpha: 0.01,
            ring_capacity: 4096,
            tracker_rate: 22_050,
            tracker_gain: 0.7,
            trigger_gain: 0.1,
            event_queue_capacity: 64,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document. Missing keys fall back to the defaults.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML config file.
    #[cfg(feature = "serde")]
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Smallest `ring_capacity` that holds a full mixer period and one
    /// default-tempo tracker tick after rate conversion.
    pub fn min_ring_capacity(&self) -> usize {
        let tick = samples_per_tick(DEFAULT_TEMPO, self.tracker_rate) as u64;
        let converted =
            (tick * u64::from(self.output_rate)).div_ceil(u64::from(self.tracker_rate.max(1)));
        // Plus the slot the ring keeps free
        self.frames_per_period.max(converted as usize) + 1
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
            ConfigError::Invalid { field, reason }
        }

        if self.output_rate == 0 {
            return Err(invalid("output_rate", "must be non-zero"));
        }
        if self.tracker_rate == 0 {
            return Err(invalid("tracker_rate", "must be non-zero"));
        }
        if self.frames_per_period == 0 {
            return Err(invalid("frames_per_period", "must be non-zero"));
        }
        if self.polyphony == 0 {
            return Err(invalid("polyphony", "must be non-zero"));
        }
        if self.ring_capacity < self.min_ring_capacity() {
            return Err(invalid(
                "ring_capacity",
                "must hold a mixer period and a tracker tick at the output rate",
            ));
        }
        if self.event_queue_capacity == 0 {
            return Err(invalid("event_queue_capacity", "must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.envelope.sustain_level) {
            return Err(invalid("envelope.sustain_level", "must be within 0.0..=1.0"));
        }
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err(invalid("smoothing_alpha", "must be within (0.0, 1.0]"));
        }
        if !(0.0..=1.0).contains(&self.tracker_gain) {
            return Err(invalid("tracker_gain", "must be within 0.0..=1.0"));
        }
        if !(self.trigger_gain > 0.0 && self.trigger_gain <= 1.0) {
            return Err(invalid("trigger_gain", "must be within (0.0, 1.0]"));
        }
        Ok(())
    }
}
