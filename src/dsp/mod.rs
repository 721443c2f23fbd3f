//! Low-level DSP primitives used by the voice pool and the mixer.
//!
//! These components are allocation-free once constructed and realtime-safe,
//! so they can be advanced sample by sample from the mixer loop.

/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// Loudness normalization, clipping and sample format conversion.
pub mod normalize;
/// Single-cycle and one-shot waveform tables.
pub mod waveform;

pub use envelope::{AdsrShape, Envelope, EnvelopeState};
pub use normalize::Normalizer;
pub use waveform::{SoundBank, Waveform, WaveformKind};
