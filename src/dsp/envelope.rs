use crate::config::{ms_to_samples, EnvelopeConfig};

/*
ADSR Envelope Implementation
============================

A linear ADSR envelope counted in whole samples. Every synth voice owns one,
and the mixer advances it exactly once per output sample.

Vocabulary
----------

  level       The envelope's current output value (0.0 to 1.0). The voice
              multiplies its waveform sample by this.

  stage       Which phase we're in: Idle, Attack, Decay, Sustain or Release.

  gate        Whether the key that started the note is still held. The voice
              passes it in on every sample.

  timer       Samples elapsed in the current stage. Every ramp is computed as
              timer / stage_length, so the stage lands on its target exactly
              when the timer reaches the stage length.


The Shape
---------

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Samples
         attack decay  sustain  release

Stage lengths come from milliseconds at the output rate:

    samples = sample_rate * ms / 1000        (integer)

    5 ms   at 44100 Hz →  220 samples
    100 ms at 44100 Hz → 4410 samples


The State Machine
-----------------

   ┌──────┐ note_on ┌────────┐ timer=A ┌───────┐ timer=D ┌─────────┐
   │ Idle │ ──────→ │ Attack │ ──────→ │ Decay │ ──────→ │ Sustain │
   └──────┘         └────────┘         └───────┘         └─────────┘
       ↑                                                      │
       │            ┌─────────┐         gate low              │
       └─────────── │ Release │ ←─────────────────────────────┘
         timer=R    └─────────┘

The gate is only sampled in Sustain. Letting go of a key during the attack or
decay lets those stages finish first; the release then starts from the
sustain level on the following sample. Release always ramps from the level it
was entered at, so it lands on exactly 0.0 after R samples.

A stage of length zero completes on the first sample it is advanced.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,    // Free, level = 0
    Attack,  // Ramping 0 → 1
    Decay,   // Ramping 1 → sustain
    Sustain, // Holding while the gate is high
    Release, // Ramping sustain → 0
}

/// Stage lengths in samples plus the sustain level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrShape {
    pub attack_samples: u32,
    pub decay_samples: u32,
    pub sustain_level: f32,
    pub release_samples: u32,
}

impl AdsrShape {
    pub fn from_config(config: &EnvelopeConfig, sample_rate: u32) -> Self {
        Self {
            attack_samples: ms_to_samples(config.attack_ms, sample_rate),
            decay_samples: ms_to_samples(config.decay_ms, sample_rate),
            sustain_level: config.sustain_level.clamp(0.0, 1.0),
            release_samples: ms_to_samples(config.release_ms, sample_rate),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    shape: AdsrShape,

    stage: EnvelopeState,
    level: f32,
    timer: u32,

    // Level the release ramp starts from (snapshotted on entry)
    release_start_level: f32,
}

impl Envelope {
    pub fn new(shape: AdsrShape) -> Self {
        Self {
            shape: AdsrShape {
                sustain_level: shape.sustain_level.clamp(0.0, 1.0),
                ..shape
            },
            stage: EnvelopeState::Idle,
            level: 0.0,
            timer: 0,
            release_start_level: 0.0,
        }
    }

    /// Restart from silence in the attack stage.
    pub fn note_on(&mut self) {
        self.stage = EnvelopeState::Attack;
        self.level = 0.0;
        self.timer = 0;
        self.release_start_level = 0.0;
    }

    /// Advance by one sample and return the new level.
    pub fn next_sample(&mut self, gate: bool) -> f32 {
        let shape = self.shape;

        match self.stage {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                self.timer += 1;
                if self.timer >= shape.attack_samples {
                    self.enter(EnvelopeState::Decay);
                    self.level = 1.0;
                } else {
                    self.level = self.timer as f32 / shape.attack_samples as f32;
                }
            }

            EnvelopeState::Decay => {
                self.timer += 1;
                if self.timer >= shape.decay_samples {
                    self.enter(EnvelopeState::Sustain);
                    self.level = shape.sustain_level;
                } else {
                    let progress = self.timer as f32 / shape.decay_samples as f32;
                    self.level = 1.0 - (1.0 - shape.sustain_level) * progress;
                }
            }

            EnvelopeState::Sustain => {
                self.level = shape.sustain_level;
                if !gate {
                    self.release_start_level = self.level;
                    self.enter(EnvelopeState::Release);
                }
            }

            EnvelopeState::Release => {
                self.timer += 1;
                if self.timer >= shape.release_samples {
                    self.enter(EnvelopeState::Idle);
                    self.level = 0.0;
                } else {
                    let progress = self.timer as f32 / shape.release_samples as f32;
                    self.level = (self.release_start_level * (1.0 - progress)).max(0.0);
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    fn enter(&mut self, stage: EnvelopeState) {
        self.stage = stage;
        self.timer = 0;
    }

    /// Force the envelope back to idle.
    pub fn reset(&mut self) {
        self.stage = EnvelopeState::Idle;
        self.level = 0.0;
        self.timer = 0;
        self.release_start_level = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeState::Idle
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }

    /// Samples spent in the current stage.
    pub fn timer(&self) -> u32 {
        self.timer
    }

    pub fn shape(&self) -> &AdsrShape {
        &self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPE: AdsrShape = AdsrShape {
        attack_samples: 10,
        decay_samples: 20,
        sustain_level: 0.5,
        release_samples: 30,
    };

    fn advance(env: &mut Envelope, gate: bool, samples: u32) {
        for _ in 0..samples {
            env.next_sample(gate);
        }
    }

    #[test]
    fn attack_reaches_full_level_on_time() {
        let mut env = Envelope::new(SHAPE);
        env.note_on();

        advance(&mut env, true, SHAPE.attack_samples - 1);
        assert!(env.level() < 1.0);
        assert_eq!(env.state(), EnvelopeState::Attack);

        env.next_sample(true);
        assert_eq!(env.level(), 1.0);
        assert_eq!(env.state(), EnvelopeState::Decay);
    }

    #[test]
    fn decay_settles_on_sustain() {
        let mut env = Envelope::new(SHAPE);
        env.note_on();

        advance(&mut env, true, SHAPE.attack_samples + SHAPE.decay_samples);
        assert_eq!(env.state(), EnvelopeState::Sustain);
        assert_eq!(env.level(), SHAPE.sustain_level);

        advance(&mut env, true, 500);
        assert_eq!(env.level(), SHAPE.sustain_level);
    }

    #[test]
    fn release_lands_on_zero_and_goes_idle() {
        let mut env = Envelope::new(SHAPE);
        env.note_on();
        advance(&mut env, true, SHAPE.attack_samples + SHAPE.decay_samples + 5);

        // Gate drops: the next sample enters release at the sustain level
        env.next_sample(false);
        assert_eq!(env.state(), EnvelopeState::Release);
        assert_eq!(env.level(), SHAPE.sustain_level);

        advance(&mut env, false, SHAPE.release_samples - 1);
        assert!(env.level() > 0.0);
        assert!(env.is_active());

        env.next_sample(false);
        assert_eq!(env.level(), 0.0);
        assert!(!env.is_active());
    }

    #[test]
    fn early_gate_off_still_runs_attack_and_decay() {
        let mut env = Envelope::new(SHAPE);
        env.note_on();

        advance(&mut env, false, SHAPE.attack_samples);
        assert_eq!(env.state(), EnvelopeState::Decay);

        advance(&mut env, false, SHAPE.decay_samples + 1);
        assert_eq!(env.state(), EnvelopeState::Release);
    }

    #[test]
    fn zero_length_stages_complete_immediately() {
        let mut env = Envelope::new(AdsrShape {
            attack_samples: 0,
            decay_samples: 0,
            sustain_level: 0.8,
            release_samples: 0,
        });
        env.note_on();

        assert_eq!(env.next_sample(true), 1.0);
        assert_eq!(env.next_sample(true), 0.8);
        assert_eq!(env.state(), EnvelopeState::Sustain);

        env.next_sample(false);
        assert_eq!(env.next_sample(false), 0.0);
        assert_eq!(env.state(), EnvelopeState::Idle);
    }

    #[test]
    fn retrigger_restarts_from_silence() {
        let mut env = Envelope::new(SHAPE);
        env.note_on();
        advance(&mut env, true, 15);

        env.note_on();
        assert_eq!(env.level(), 0.0);
        assert_eq!(env.state(), EnvelopeState::Attack);
        assert_eq!(env.timer(), 0);
    }

    #[test]
    fn level_stays_in_unit_range_for_arbitrary_gates() {
        let mut env = Envelope::new(SHAPE);
        let mut seed = 0x1234_5678u32;

        for step in 0..20_000 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            if step % 97 == 0 {
                env.note_on();
            }
            let level = env.next_sample(seed & 0x8000 != 0);
            assert!((0.0..=1.0).contains(&level));
        }

        // Let go for good: must end idle at zero
        advance(&mut env, false, 1_000);
        assert_eq!(env.state(), EnvelopeState::Idle);
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn shape_from_config_uses_output_rate() {
        let shape = AdsrShape::from_config(&EnvelopeConfig::default(), 44_100);
        assert_eq!(shape.attack_samples, 220);
        assert_eq!(shape.decay_samples, 4410);
        assert_eq!(shape.release_samples, 2205);
        assert_eq!(shape.sustain_level, 0.7);
    }
}
