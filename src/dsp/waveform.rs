//! Immutable waveform tables shared by all voices.

use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Samples per generated single-cycle table.
pub const CYCLE_LEN: usize = 512;

/// Frequencies of the built-in percussive sounds (a pentatonic run from A4).
pub const BOUNCE_FREQUENCIES: [f32; 5] = [440.0, 554.0, 659.0, 784.0, 880.0];

/// A table of signed 16-bit samples.
///
/// Looping tables hold exactly one cycle; reads wrap at the end. One-shot
/// tables hold a complete sound that is played once.
#[derive(Debug, Clone)]
pub struct Waveform {
    samples: Arc<[i16]>,
    sample_rate: u32,
    one_shot: bool,
}

impl Waveform {
    /// A looping single-cycle table.
    pub fn cycle(samples: impl Into<Arc<[i16]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            one_shot: false,
        }
    }

    /// A sound that plays once from start to end.
    pub fn one_shot(samples: impl Into<Arc<[i16]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            one_shot: true,
        }
    }

    pub fn sine(sample_rate: u32) -> Self {
        Self::cycle(table(|phase| phase.sin()), sample_rate)
    }

    pub fn triangle(sample_rate: u32) -> Self {
        Self::cycle(
            table(|phase| {
                let t = phase / TAU;
                1.0 - 4.0 * (t - 0.5).abs()
            }),
            sample_rate,
        )
    }

    /// Additive organ tone: fundamental plus three octave harmonics at halving levels.
    pub fn organ(sample_rate: u32) -> Self {
        const PARTIALS: [(f32, f32); 4] = [(1.0, 1.0), (2.0, 0.5), (4.0, 0.25), (8.0, 0.125)];
        let norm: f32 = PARTIALS.iter().map(|&(_, amp)| amp).sum();

        Self::cycle(
            table(|phase| {
                PARTIALS
                    .iter()
                    .map(|&(harmonic, amp)| amp * (phase * harmonic).sin())
                    .sum::<f32>()
                    / norm
            }),
            sample_rate,
        )
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_one_shot(&self) -> bool {
        self.one_shot
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Pitch the table plays at when read one sample per output sample.
    pub fn base_frequency(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.sample_rate as f32 / self.samples.len() as f32
    }

    /// Linearly interpolated sample at a fractional position, scaled to [-1, 1].
    ///
    /// Looping tables wrap the position; one-shot tables read silence past
    /// their end.
    #[inline]
    pub fn sample_at(&self, position: f32) -> f32 {
        let len = self.samples.len();
        if len == 0 || position < 0.0 {
            return 0.0;
        }

        let whole = position.floor();
        let frac = position - whole;
        let mut index = whole as usize;

        if self.one_shot {
            if index >= len {
                return 0.0;
            }
        } else {
            index %= len;
        }

        let current = self.samples[index] as f32;
        let next = match index + 1 {
            n if n < len => self.samples[n] as f32,
            _ if self.one_shot => 0.0,
            _ => self.samples[0] as f32,
        };

        (current + (next - current) * frac) / 32768.0
    }
}

fn table(shape: impl Fn(f32) -> f32) -> Vec<i16> {
    (0..CYCLE_LEN)
        .map(|i| {
            let phase = TAU * i as f32 / CYCLE_LEN as f32;
            (shape(phase).clamp(-1.0, 1.0) * 32767.0) as i16
        })
        .collect()
}

/// Which built-in table the keyboard voices play.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaveformKind {
    Sine,
    Triangle,
    #[default]
    Organ,
}

impl WaveformKind {
    pub fn build(self, sample_rate: u32) -> Waveform {
        match self {
            WaveformKind::Sine => Waveform::sine(sample_rate),
            WaveformKind::Triangle => Waveform::triangle(sample_rate),
            WaveformKind::Organ => Waveform::organ(sample_rate),
        }
    }
}

impl FromStr for WaveformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sine" => Ok(WaveformKind::Sine),
            "triangle" => Ok(WaveformKind::Triangle),
            "organ" => Ok(WaveformKind::Organ),
            other => Err(format!("unknown waveform `{other}` (expected sine, triangle or organ)")),
        }
    }
}

impl fmt::Display for WaveformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaveformKind::Sine => "sine",
            WaveformKind::Triangle => "triangle",
            WaveformKind::Organ => "organ",
        };
        f.write_str(name)
    }
}

/// One-shot sounds addressed by `Trigger { sound }`.
#[derive(Debug, Clone, Default)]
pub struct SoundBank {
    sounds: Vec<Waveform>,
}

impl SoundBank {
    pub fn new(sounds: Vec<Waveform>) -> Self {
        Self { sounds }
    }

    /// Five short decaying sine "bounces" at [`BOUNCE_FREQUENCIES`].
    pub fn bounce(sample_rate: u32) -> Self {
        let len = (sample_rate as usize * 150) / 1000;
        let sounds = BOUNCE_FREQUENCIES
            .iter()
            .map(|&freq| {
                let samples: Vec<i16> = (0..len)
                    .map(|i| {
                        let t = i as f32 / sample_rate as f32;
                        let decay = (-t * 30.0).exp();
                        ((TAU * freq * t).sin() * decay * 32767.0) as i16
                    })
                    .collect();
                Waveform::one_shot(samples, sample_rate)
            })
            .collect();

        Self { sounds }
    }

    pub fn get(&self, id: u8) -> Option<&Waveform> {
        self.sounds.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_between_neighbours() {
        let wave = Waveform::cycle(vec![0, 16384, -16384, 0], 4);
        assert_eq!(wave.sample_at(0.0), 0.0);
        assert_eq!(wave.sample_at(1.0), 0.5);
        assert!((wave.sample_at(0.5) - 0.25).abs() < 1e-6);
        assert!((wave.sample_at(1.5) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn looping_table_wraps_at_cycle_end() {
        let wave = Waveform::cycle(vec![0, 0, 0, 32767], 4);
        // Between the last sample and the first
        let mid = wave.sample_at(3.5);
        assert!((mid - 32767.0 / 2.0 / 32768.0).abs() < 1e-4);
        assert_eq!(wave.sample_at(4.0), wave.sample_at(0.0));
        assert_eq!(wave.sample_at(7.0), wave.sample_at(3.0));
    }

    #[test]
    fn one_shot_reads_silence_past_end() {
        let wave = Waveform::one_shot(vec![16384, 16384], 4);
        assert_eq!(wave.sample_at(1.0), 0.5);
        assert!((wave.sample_at(1.5) - 0.25).abs() < 1e-6);
        assert_eq!(wave.sample_at(2.0), 0.0);
        assert_eq!(wave.sample_at(100.0), 0.0);
    }

    #[test]
    fn empty_table_is_silent() {
        let wave = Waveform::cycle(Vec::<i16>::new(), 44_100);
        assert_eq!(wave.base_frequency(), 0.0);
        assert_eq!(wave.sample_at(3.0), 0.0);
    }

    #[test]
    fn base_frequency_follows_cycle_length() {
        let wave = Waveform::sine(44_100);
        assert_eq!(wave.len(), CYCLE_LEN);
        assert!((wave.base_frequency() - 44_100.0 / CYCLE_LEN as f32).abs() < 1e-3);
    }

    #[test]
    fn generated_tables_stay_in_range() {
        for kind in [WaveformKind::Sine, WaveformKind::Triangle, WaveformKind::Organ] {
            let wave = kind.build(44_100);
            let peak = wave.samples().iter().map(|s| s.unsigned_abs()).max().unwrap();
            assert!(peak > 16_000, "{kind} table is too quiet");
        }
    }

    #[test]
    fn waveform_kind_parses_names() {
        assert_eq!("Sine".parse::<WaveformKind>(), Ok(WaveformKind::Sine));
        assert_eq!("organ".parse::<WaveformKind>(), Ok(WaveformKind::Organ));
        assert!("saw".parse::<WaveformKind>().is_err());
    }

    #[test]
    fn bounce_bank_has_five_one_shots() {
        let bank = SoundBank::bounce(44_100);
        assert_eq!(bank.len(), 5);
        assert!(bank.get(4).unwrap().is_one_shot());
        assert!(bank.get(5).is_none());
    }
}
