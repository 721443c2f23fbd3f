use std::{
    thread,
    time::{Duration, Instant},
};

/// Sleeps a producer loop for exactly the audio it generated.
///
/// Sleep targets accumulate on a monotonic deadline, so oversleeping on one
/// tick shortens the next sleep instead of drifting. A producer that falls
/// more than one tick behind snaps the deadline to now rather than rendering
/// a burst to catch up.
#[derive(Debug, Clone)]
pub struct Pacer {
    deadline: Instant,
    resyncs: u64,
}

impl Pacer {
    pub fn new(start: Instant) -> Self {
        Self {
            deadline: start,
            resyncs: 0,
        }
    }

    /// Account for `produced` worth of audio and return how long to sleep
    /// at `now`, if at all.
    pub fn advance(&mut self, produced: Duration, now: Instant) -> Option<Duration> {
        self.deadline += produced;

        if self.deadline > now {
            return Some(self.deadline - now);
        }

        let behind = now - self.deadline;
        if behind > produced {
            self.resyncs += 1;
            tracing::debug!(behind_ms = behind.as_millis() as u64, "producer fell behind, resyncing");
            self.deadline = now;
        }
        None
    }

    pub fn wait(&mut self, produced: Duration) {
        if let Some(sleep) = self.advance(produced, Instant::now()) {
            thread::sleep(sleep);
        }
    }

    /// Times the deadline was reset after falling behind.
    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }
}
