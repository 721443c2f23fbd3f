use crate::dsp::{
    envelope::{AdsrShape, Envelope, EnvelopeState},
    waveform::Waveform,
};

use super::message::NoteId;

/// One slot of the voice pool: an enveloped, variable-speed waveform reader.
///
/// A voice is free exactly when its envelope is idle. Starting claims it,
/// and the only way back to free is the envelope finishing its release (or a
/// one-shot sound running off its end).
pub struct Voice {
    note: Option<NoteId>,
    waveform: Waveform,
    position: f32,
    speed: f32,
    gain: f32,
    key_held: bool,
    envelope: Envelope,
}

impl Voice {
    pub fn new(waveform: Waveform, shape: AdsrShape) -> Self {
        Self {
            note: None,
            waveform,
            position: 0.0,
            speed: 1.0,
            gain: 1.0,
            key_held: false,
            envelope: Envelope::new(shape),
        }
    }

    /// Claim the voice for `note` and restart its envelope.
    ///
    /// `speed` is the playback-rate multiplier (target frequency over the
    /// table's base frequency). A non-positive or non-finite speed leaves the
    /// voice free.
    pub fn start(&mut self, note: NoteId, waveform: &Waveform, speed: f32, gain: f32, key_held: bool) {
        if !(speed.is_finite() && speed > 0.0) || waveform.is_empty() {
            self.free();
            return;
        }

        self.note = Some(note);
        self.waveform = waveform.clone();
        self.position = 0.0;
        self.speed = speed;
        self.gain = gain.clamp(0.0, 1.0);
        self.key_held = key_held;
        self.envelope.note_on();
    }

    /// Let go of the key. The envelope moves to release once it reaches sustain.
    pub fn release(&mut self) {
        if self.is_active() && self.envelope.state() != EnvelopeState::Release {
            self.key_held = false;
        }
    }

    /// Render one sample and advance position and envelope.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if !self.is_active() {
            return 0.0;
        }

        let out = self.waveform.sample_at(self.position) * self.envelope.level() * self.gain;

        self.position += self.speed;
        let len = self.waveform.len() as f32;
        if self.position >= len {
            if self.waveform.is_one_shot() {
                self.free();
                return out;
            }
            self.position %= len;
        }

        self.envelope.next_sample(self.key_held);
        if !self.envelope.is_active() {
            self.free();
        }

        out
    }

    /// Return the slot to the pool immediately.
    pub fn free(&mut self) {
        self.envelope.reset();
        self.note = None;
        self.key_held = false;
        self.position = 0.0;
    }

    pub fn is_free(&self) -> bool {
        !self.is_active()
    }

    pub fn is_active(&self) -> bool {
        self.envelope.is_active()
    }

    pub fn note(&self) -> Option<NoteId> {
        self.note
    }

    pub fn state(&self) -> EnvelopeState {
        self.envelope.state()
    }

    pub fn envelope_level(&self) -> f32 {
        self.envelope.level()
    }

    pub fn key_held(&self) -> bool {
        self.key_held
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }
}
