//! Lock-free sample queue between the tracker thread and the mixer.
//!
//! The tracker renders in bursts of one tick while the mixer drains one sample
//! per output sample, so the two sides never run in lockstep. A bounded
//! single-producer/single-consumer queue absorbs the difference: the producer
//! only ever advances the write index, the consumer only the read index, and
//! neither side ever blocks.
//!
//! A ring of capacity `N` holds at most `N - 1` samples, matching the classic
//! "one slot always empty" circular buffer. When it is full, new samples are
//! dropped rather than overwriting unread ones; that is backpressure the
//! producer is expected to ride out, not an error.

use rtrb::{Consumer, Producer, RingBuffer};

/// Create a ring with `capacity` slots and split it into its two halves.
///
/// # Panics
///
/// Panics if `capacity < 2`; `EngineConfig::validate` rejects such values.
pub fn sample_ring(capacity: usize) -> (SampleProducer, SampleConsumer) {
    assert!(capacity >= 2, "sample ring needs at least two slots");
    let (tx, rx) = RingBuffer::<i16>::new(capacity - 1);
    (SampleProducer { tx }, SampleConsumer { rx })
}

/// Write half, owned by the tracker.
pub struct SampleProducer {
    tx: Producer<i16>,
}

impl SampleProducer {
    /// Queue one sample. Returns `false` if the ring was full and the sample
    /// was dropped.
    #[inline]
    pub fn try_write(&mut self, sample: i16) -> bool {
        self.tx.push(sample).is_ok()
    }

    /// Slots that can be written right now.
    pub fn free_len(&self) -> usize {
        self.tx.slots()
    }

    /// Samples waiting to be read.
    pub fn len(&self) -> usize {
        self.tx.buffer().capacity() - self.tx.slots()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued samples.
    pub fn capacity(&self) -> usize {
        self.tx.buffer().capacity()
    }

    /// True once the consumer half has been dropped.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_abandoned()
    }
}

/// Read half, owned by the mixer.
pub struct SampleConsumer {
    rx: Consumer<i16>,
}

impl SampleConsumer {
    /// Take the oldest sample, or `None` if everything written has been read.
    #[inline]
    pub fn try_read(&mut self) -> Option<i16> {
        self.rx.pop().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.slots()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.rx.buffer().capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ring_reads_none() {
        let (_tx, mut rx) = sample_ring(8);
        assert!(rx.is_empty());
        assert_eq!(rx.try_read(), None);
    }

    #[test]
    fn keeps_one_slot_free() {
        let (mut tx, mut rx) = sample_ring(4);
        assert_eq!(tx.capacity(), 3);

        assert!(tx.try_write(1));
        assert!(tx.try_write(2));
        assert!(tx.try_write(3));
        assert!(!tx.try_write(4), "fourth write must be dropped");
        assert_eq!(tx.len(), 3);

        assert_eq!(rx.try_read(), Some(1));
        assert!(tx.try_write(5));
        assert_eq!(rx.try_read(), Some(2));
        assert_eq!(rx.try_read(), Some(3));
        assert_eq!(rx.try_read(), Some(5));
        assert_eq!(rx.try_read(), None);
    }

    #[test]
    fn none_exactly_when_all_produced_were_consumed() {
        let (mut tx, mut rx) = sample_ring(16);
        let mut produced = 0u32;
        let mut consumed = 0u32;
        let mut seed = 7u32;

        for _ in 0..10_000 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            if seed & 0x100 != 0 {
                if tx.try_write(produced as i16) {
                    produced += 1;
                }
            } else {
                match rx.try_read() {
                    Some(sample) => {
                        assert_eq!(sample, consumed as i16, "samples arrive in order");
                        consumed += 1;
                    }
                    None => assert_eq!(produced, consumed),
                }
            }
            assert!(produced >= consumed);
        }
    }

    #[test]
    fn threads_see_every_sample_in_order() {
        let (mut tx, mut rx) = sample_ring(64);
        const COUNT: i32 = 20_000;

        let producer = std::thread::spawn(move || {
            let mut next = 0i32;
            while next < COUNT {
                if tx.try_write(next as i16) {
                    next += 1;
                } else {
                    std::thread::yield_now();
                }
            }
        });

        let mut expected = 0i32;
        while expected < COUNT {
            if let Some(sample) = rx.try_read() {
                assert_eq!(sample, expected as i16);
                expected += 1;
            } else {
                std::thread::yield_now();
            }
        }

        producer.join().unwrap();
        assert_eq!(rx.try_read(), None);
    }
}
