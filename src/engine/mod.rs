// Purpose: mixing, rate conversion and the loops that drive them
// Everything here runs on the audio path and never allocates per sample

pub mod feed;
pub mod mixer;
pub mod offline;
pub mod pacer;
pub mod resample;
pub mod runtime;

pub use feed::TrackerFeed;
pub use mixer::Mixer;
pub use offline::OfflineRenderer;
pub use pacer::Pacer;
pub use resample::Resampler;
pub use runtime::{spawn_mixer, spawn_tracker};
