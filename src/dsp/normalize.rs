//! Loudness normalization and output conversion.

/*
Polyphonic Loudness
===================

Summing N voices that each peak at 1.0 can reach N. Dividing the mix by N
keeps it in range but makes chords sound much quieter than single notes:
uncorrelated signals add in POWER, not amplitude, so N voices at full level
are only about sqrt(N) times louder than one.

Scaling by 1/sqrt(N) instead keeps perceived loudness roughly constant as
voices come and go:

    voices   1/N     1/sqrt(N)
      1      1.00    1.00
      2      0.50    0.71
      4      0.25    0.50
      9      0.11    0.33

Worst-case peaks (everything in phase) can still exceed 1.0 after scaling, so
the result is hard-clipped to [-1, 1] before conversion to 16 bits.


Gain Smoothing
--------------

Jumping straight to a new gain when a voice starts or stops is audible as a
click. The gain follows its target through a one-pole lowpass instead:

    gain += alpha * (target - gain)

After n samples the remaining error is (1 - alpha)^n of the jump. With
alpha = 0.01 that is 1% after ~460 samples (about 10 ms at 44.1 kHz), fast
enough to catch new voices and slow enough to be inaudible.

The tracker music is part of the mix but does not count as a voice: its own
level is already fixed before it reaches the ring buffer.
*/

#[derive(Debug, Clone)]
pub struct Normalizer {
    alpha: f32,
    current_gain: f32,
}

impl Normalizer {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(f32::MIN_POSITIVE, 1.0),
            current_gain: 1.0,
        }
    }

    /// Gain the smoother is heading toward for a given voice count.
    #[inline]
    pub fn target_gain(active_count: usize) -> f32 {
        if active_count == 0 {
            1.0
        } else {
            1.0 / (active_count as f32).sqrt()
        }
    }

    /// Step the smoothed gain one sample toward its target.
    #[inline]
    pub fn update(&mut self, active_count: usize) -> f32 {
        let target = Self::target_gain(active_count);
        self.current_gain += self.alpha * (target - self.current_gain);
        self.current_gain
    }

    /// Scale one mixed sample and clip it to [-1, 1].
    #[inline]
    pub fn process(&mut self, mix: f32, active_count: usize) -> f32 {
        let gain = self.update(active_count);
        hard_clip(mix * gain)
    }

    pub fn current_gain(&self) -> f32 {
        self.current_gain
    }

    pub fn reset(&mut self) {
        self.current_gain = 1.0;
    }
}

#[inline]
pub fn hard_clip(sample: f32) -> f32 {
    sample.clamp(-1.0, 1.0)
}

/// Convert a [-1, 1] sample to signed 16 bits.
#[inline]
pub fn to_i16(sample: f32) -> i16 {
    (hard_clip(sample) * 32767.0) as i16
}

/// Convert a signed 16-bit sample to [-1, 1).
#[inline]
pub fn from_i16(sample: i16) -> f32 {
    sample as f32 / 32768.0
}
