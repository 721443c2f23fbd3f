//! Threads for the two real-time loops.
//!
//! The mixer thread blocks in the sink; the tracker thread sleeps between
//! ticks. Neither shares a lock with the other: audio moves through the
//! sample ring and note events through their own queue.
//!
//! There is no portable way to raise a thread's OS priority from std, so the
//! tracker yields by construction instead: it spends most of its time asleep
//! and the device callback (fed by the mixer's sink) is the real-time context.

use std::{
    io,
    thread::{self, JoinHandle},
};

use crate::io::sink::{AudioSink, SinkError};

use super::{feed::TrackerFeed, mixer::Mixer};

pub const TRACKER_THREAD: &str = "polymod-tracker";
pub const MIXER_THREAD: &str = "polymod-mixer";

/// Run the tracker on its own thread until the mixer drops the ring.
pub fn spawn_tracker(feed: TrackerFeed) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(TRACKER_THREAD.into())
        .spawn(move || feed.run())
}

/// Run the mixer on its own thread until the sink fails.
pub fn spawn_mixer<S>(mut mixer: Mixer, mut sink: S) -> io::Result<JoinHandle<Result<(), SinkError>>>
where
    S: AudioSink + Send + 'static,
{
    thread::Builder::new()
        .name(MIXER_THREAD.into())
        .spawn(move || mixer.run(&mut sink))
}
