use crate::{
    config::EngineConfig,
    dsp::{envelope::AdsrShape, waveform::SoundBank, waveform::Waveform},
};

use super::{
    message::{MessageReceiver, NoteId, SynthMessage},
    voice::Voice,
};

/// Fixed-size set of voices.
///
/// Polyphony is a hard cap: a note that finds no free slot is dropped, and
/// nothing is ever stolen from a sounding voice.
pub struct VoicePool {
    voices: Vec<Voice>,
    waveform: Waveform,
    sounds: SoundBank,
    trigger_gain: f32,
}

impl VoicePool {
    pub fn new(polyphony: usize, waveform: Waveform, shape: AdsrShape) -> Self {
        let voices = (0..polyphony)
            .map(|_| Voice::new(waveform.clone(), shape))
            .collect();

        Self {
            voices,
            waveform,
            sounds: SoundBank::default(),
            trigger_gain: 1.0,
        }
    }

    pub fn from_config(config: &EngineConfig, waveform: Waveform, sounds: SoundBank) -> Self {
        let shape = AdsrShape::from_config(&config.envelope, config.output_rate);
        Self::new(config.polyphony, waveform, shape).with_sounds(sounds, config.trigger_gain)
    }

    /// Attach the one-shot sounds used by [`VoicePool::trigger`].
    pub fn with_sounds(mut self, sounds: SoundBank, gain: f32) -> Self {
        self.sounds = sounds;
        self.trigger_gain = gain;
        self
    }

    /// Start (or retrigger) a keyboard note at `frequency` Hz.
    ///
    /// Returns `false` if the note was dropped for lack of a free voice.
    pub fn start(&mut self, note: u8, frequency: f32) -> bool {
        let base = self.waveform.base_frequency();
        if base <= 0.0 {
            return false;
        }

        let id = NoteId::Key(note);
        let Some(idx) = self.claim(id) else {
            tracing::trace!(note, "no free voice, note dropped");
            return false;
        };

        self.voices[idx].start(id, &self.waveform, frequency / base, 1.0, true);
        self.voices[idx].is_active()
    }

    /// Release a keyboard note. Does nothing if it isn't sounding.
    pub fn stop(&mut self, note: u8) {
        if let Some(voice) = self.find_voice(NoteId::Key(note)) {
            voice.release();
        }
    }

    /// Play a one-shot sound from the bank at its recorded pitch.
    pub fn trigger(&mut self, sound: u8) -> bool {
        let Some(waveform) = self.sounds.get(sound) else {
            return false;
        };

        let id = NoteId::Sound(sound);
        let Some(idx) = self.claim(id) else {
            tracing::trace!(sound, "no free voice, trigger dropped");
            return false;
        };

        self.voices[idx].start(id, waveform, 1.0, self.trigger_gain, false);
        self.voices[idx].is_active()
    }

    /// Release every sounding voice.
    pub fn release_all(&mut self) {
        for voice in &mut self.voices {
            voice.release();
        }
    }

    pub fn handle(&mut self, msg: SynthMessage) {
        match msg {
            SynthMessage::NoteOn { note, frequency } => {
                self.start(note, frequency);
            }
            SynthMessage::NoteOff { note } => self.stop(note),
            SynthMessage::Trigger { sound } => {
                self.trigger(sound);
            }
            SynthMessage::AllNotesOff => self.release_all(),
        }
    }

    /// Apply every queued message.
    pub fn drain(&mut self, rx: &mut impl MessageReceiver) {
        while let Some(msg) = rx.pop() {
            self.handle(msg);
        }
    }

    /// Sum one sample from every active voice.
    ///
    /// Returns the mix and the number of voices that were sounding for it.
    #[inline]
    pub fn next_sample(&mut self) -> (f32, usize) {
        let mut mix = 0.0;
        let mut active = 0;

        for voice in &mut self.voices {
            if voice.is_active() {
                active += 1;
                mix += voice.next_sample();
            }
        }

        (mix, active)
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    pub fn polyphony(&self) -> usize {
        self.voices.len()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn waveform(&self) -> &Waveform {
        &self.waveform
    }

    // Slot already playing `id`, else the first free one
    fn claim(&self, id: NoteId) -> Option<usize> {
        self.voices
            .iter()
            .position(|v| v.is_active() && v.note() == Some(id))
            .or_else(|| self.voices.iter().position(|v| v.is_free()))
    }

    fn find_voice(&mut self, id: NoteId) -> Option<&mut Voice> {
        self.voices
            .iter_mut()
            .find(|v| v.is_active() && v.note() == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::envelope::EnvelopeState;

    const SHAPE: AdsrShape = AdsrShape {
        attack_samples: 10,
        decay_samples: 10,
        sustain_level: 0.6,
        release_samples: 20,
    };

    fn pool(polyphony: usize) -> VoicePool {
        VoicePool::new(polyphony, Waveform::sine(44_100), SHAPE)
    }

    fn run(pool: &mut VoicePool, samples: usize) {
        for _ in 0..samples {
            pool.next_sample();
        }
    }

    #[test]
    fn start_sets_speed_from_base_frequency() {
        let mut pool = pool(4);
        let base = pool.waveform().base_frequency();
        assert!(pool.start(0, base * 2.0));

        let voice = &pool.voices()[0];
        assert_eq!(voice.note(), Some(NoteId::Key(0)));
        assert!((voice.speed() - 2.0).abs() < 1e-5);
        assert_eq!(voice.state(), EnvelopeState::Attack);
        assert!(voice.key_held());
    }

    #[test]
    fn retrigger_reuses_the_same_slot() {
        let mut pool = pool(4);
        pool.start(5, 440.0);
        run(&mut pool, 30);
        pool.start(5, 440.0);

        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.voices()[0].envelope_level(), 0.0);
        assert_eq!(pool.voices()[0].state(), EnvelopeState::Attack);
    }

    #[test]
    fn full_pool_drops_new_notes() {
        let mut pool = pool(2);
        assert!(pool.start(0, 261.63));
        assert!(pool.start(1, 293.66));
        assert!(!pool.start(2, 329.63));
        assert_eq!(pool.active_count(), 2);
        assert!(pool.voices().iter().all(|v| v.note() != Some(NoteId::Key(2))));
    }

    #[test]
    fn stopped_voice_is_reusable_after_release() {
        let mut pool = pool(1);
        pool.start(0, 440.0);
        run(&mut pool, 25);

        pool.stop(0);
        run(&mut pool, 1);
        assert_eq!(pool.voices()[0].state(), EnvelopeState::Release);
        assert!(!pool.start(1, 330.0), "slot is still releasing");

        run(&mut pool, SHAPE.release_samples as usize);
        assert_eq!(pool.active_count(), 0);
        assert!(pool.start(1, 330.0));
    }

    #[test]
    fn stop_of_unknown_note_is_ignored() {
        let mut pool = pool(2);
        pool.start(0, 440.0);
        pool.stop(9);
        assert!(pool.voices()[0].key_held());
    }

    #[test]
    fn triggers_and_keys_do_not_collide() {
        let mut pool = pool(4).with_sounds(SoundBank::bounce(44_100), 0.1);
        pool.start(0, 440.0);
        assert!(pool.trigger(0));
        assert_eq!(pool.active_count(), 2);

        // Retriggering the sound reuses its own slot
        assert!(pool.trigger(0));
        assert_eq!(pool.active_count(), 2);
        assert!(!pool.trigger(7), "unknown sound id");
    }

    #[test]
    fn every_voice_returns_to_idle() {
        let mut pool = pool(8);
        let mut seed = 99u32;

        for _ in 0..2_000 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let note = ((seed >> 8) % 12) as u8;
            match seed % 3 {
                0 => {
                    pool.start(note, 220.0 + note as f32 * 20.0);
                }
                1 => pool.stop(note),
                _ => {}
            }
            let (mix, active) = pool.next_sample();
            assert!(active <= 8);
            assert!(mix.abs() <= active as f32 + 1e-6);
            for voice in pool.voices() {
                assert!((0.0..=1.0).contains(&voice.envelope_level()));
            }
        }

        pool.release_all();
        run(&mut pool, 100);
        assert_eq!(pool.active_count(), 0);
        assert!(pool.voices().iter().all(|v| v.envelope_level() == 0.0 && v.note().is_none()));
    }

    #[test]
    fn drains_queued_messages() {
        let (mut tx, mut rx) = crate::synth::message::note_channel(8);
        tx.note_on(3, 440.0);
        tx.note_on(4, 550.0);
        tx.note_off(3);

        let mut pool = pool(4);
        pool.drain(&mut rx);

        assert_eq!(pool.active_count(), 2);
        let held: Vec<_> = pool.voices().iter().filter(|v| v.key_held()).collect();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].note(), Some(NoteId::Key(4)));
    }
}
