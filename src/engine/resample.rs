//! Tracker rate to output rate conversion.

/*
Rate Conversion
===============

The tracker renders at the module's authored rate (22050 Hz) and the sink
runs at the output rate (44100 Hz). Two strategies:

  Integer ratio (44100 / 22050 = 2): repeat each sample

    in:   a       b       c
    out:  a   a   b   b   c   c

  Anything else: linear interpolation between neighbours, streaming one input
  sample at a time. `phase` is the output cursor's distance past the previous
  input sample, in input samples; `step` is native_rate / output_rate.

    in:   prev ─────────────── cur
    out:   ▲ phase   ▲ phase+step   ▲ ...   (while phase < 1)

Gain is applied before conversion so both paths scale identically.
*/

#[derive(Debug, Clone)]
pub enum Resampler {
    Repeat { factor: usize },
    Linear { step: f64, phase: f64, prev: f32 },
}

impl Resampler {
    pub fn new(native_rate: u32, output_rate: u32) -> Self {
        if native_rate > 0 && output_rate >= native_rate && output_rate % native_rate == 0 {
            Resampler::Repeat {
                factor: (output_rate / native_rate) as usize,
            }
        } else {
            Resampler::Linear {
                step: f64::from(native_rate) / f64::from(output_rate.max(1)),
                phase: 0.0,
                prev: 0.0,
            }
        }
    }

    /// Output samples per input sample.
    pub fn ratio(&self) -> f64 {
        match self {
            Resampler::Repeat { factor } => *factor as f64,
            Resampler::Linear { step, .. } => 1.0 / step,
        }
    }

    /// Scale `input` by `gain`, convert it and hand each output sample to
    /// `emit`.
    pub fn process(&mut self, input: &[i16], gain: f32, mut emit: impl FnMut(i16)) {
        match self {
            Resampler::Repeat { factor } => {
                for &s in input {
                    let scaled = scale(s, gain);
                    for _ in 0..*factor {
                        emit(scaled);
                    }
                }
            }
            Resampler::Linear { step, phase, prev } => {
                for &s in input {
                    let cur = f32::from(s) * gain;
                    while *phase < 1.0 {
                        let value = *prev + (cur - *prev) * *phase as f32;
                        emit(clamp_i16(value));
                        *phase += *step;
                    }
                    *phase -= 1.0;
                    *prev = cur;
                }
            }
        }
    }
}

#[inline]
fn scale(sample: i16, gain: f32) -> i16 {
    clamp_i16(f32::from(sample) * gain)
}

#[inline]
fn clamp_i16(value: f32) -> i16 {
    value.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(resampler: &mut Resampler, input: &[i16], gain: f32) -> Vec<i16> {
        let mut out = Vec::new();
        resampler.process(input, gain, |s| out.push(s));
        out
    }

    #[test]
    fn integer_ratio_repeats() {
        let mut r = Resampler::new(22_050, 44_100);
        assert!(matches!(r, Resampler::Repeat { factor: 2 }));
        assert_eq!(collect(&mut r, &[10, -20, 30], 1.0), vec![10, 10, -20, -20, 30, 30]);
    }

    #[test]
    fn gain_applies_before_repeat() {
        let mut r = Resampler::new(22_050, 44_100);
        assert_eq!(collect(&mut r, &[1000, -1000], 0.7), vec![700, 700, -700, -700]);
    }

    #[test]
    fn same_rate_is_passthrough() {
        let mut r = Resampler::new(44_100, 44_100);
        assert!(matches!(r, Resampler::Repeat { factor: 1 }));
        assert_eq!(collect(&mut r, &[1, 2, 3], 1.0), vec![1, 2, 3]);
    }

    #[test]
    fn non_integer_ratio_interpolates() {
        // 2 in, 3 out
        let mut r = Resampler::new(32_000, 48_000);
        assert!(matches!(r, Resampler::Linear { .. }));
        assert!((r.ratio() - 1.5).abs() < 1e-9);

        let out = collect(&mut r, &vec![3000; 200], 1.0);
        assert!((out.len() as i64 - 300).abs() <= 1, "{}", out.len());
        // Ramps up from silence, then holds
        assert_eq!(out[0], 0);
        assert!(out[10..].iter().all(|&s| s == 3000));
    }

    #[test]
    fn interpolated_values_lie_between_neighbours() {
        let mut r = Resampler::new(22_050, 48_000);
        let out = collect(&mut r, &[0, 1000, 0, -1000], 1.0);
        assert!(out.iter().all(|&s| (-1000..=1000).contains(&s)));
    }
}
