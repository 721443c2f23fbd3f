use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};

pub const MAX_VOLUME: u8 = 100;

/// Master output volume, 0..=100, shared between the input thread and the
/// sink. The mixer never reads it; loudness normalization is independent of
/// what the listener has dialed in.
#[derive(Debug, Clone)]
pub struct VolumeControl {
    level: Arc<AtomicU8>,
}

impl VolumeControl {
    pub fn new(level: u8) -> Self {
        Self {
            level: Arc::new(AtomicU8::new(level.min(MAX_VOLUME))),
        }
    }

    pub fn set(&self, level: u8) {
        self.level.store(level.min(MAX_VOLUME), Ordering::Relaxed);
    }

    /// Move the volume by `delta`, saturating at both ends. Returns the new
    /// level.
    pub fn adjust(&self, delta: i16) -> u8 {
        let mut current = self.level.load(Ordering::Relaxed);
        loop {
            let next = (i16::from(current) + delta).clamp(0, i16::from(MAX_VOLUME)) as u8;
            match self.level.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn get(&self) -> u8 {
        self.level.load(Ordering::Relaxed)
    }

    /// Linear gain for the current level.
    pub fn gain(&self) -> f32 {
        f32::from(self.get()) / f32::from(MAX_VOLUME)
    }

    /// Scale interleaved samples in place.
    pub fn apply(&self, samples: &mut [i16]) {
        let gain = self.gain();
        if gain >= 1.0 {
            return;
        }
        for s in samples {
            *s = (f32::from(*s) * gain) as i16;
        }
    }
}

impl Default for VolumeControl {
    fn default() -> Self {
        Self::new(MAX_VOLUME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_saturates() {
        let volume = VolumeControl::new(95);
        assert_eq!(volume.adjust(10), 100);
        assert_eq!(volume.adjust(-150), 0);
        assert_eq!(volume.adjust(-1), 0);
        assert_eq!(volume.adjust(25), 25);
    }

    #[test]
    fn clones_share_state() {
        let a = VolumeControl::default();
        let b = a.clone();
        b.set(40);
        assert_eq!(a.get(), 40);
        assert!((a.gain() - 0.4).abs() < 1e-6);
        a.set(250);
        assert_eq!(b.get(), 100);
    }

    #[test]
    fn apply_scales_samples() {
        let volume = VolumeControl::new(50);
        let mut samples = [1000, -1000, 32767];
        volume.apply(&mut samples);
        assert_eq!(samples, [500, -500, 16383]);
    }
}
