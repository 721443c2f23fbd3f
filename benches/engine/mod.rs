//! Benchmarks for the engine's per-period work.

mod envelope;
mod mixer;
mod tracker;

pub use envelope::bench_envelope;
pub use mixer::bench_mixer;
pub use tracker::bench_tracker;
