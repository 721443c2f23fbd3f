use rtrb::{Consumer, Producer, RingBuffer};

/// Identity of the sound a voice is rendering.
///
/// Keyboard notes and percussive triggers live in separate namespaces so a
/// trigger never steals the slot of a held key with the same number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NoteId {
    Key(u8),
    Sound(u8),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SynthMessage {
    NoteOn { note: u8, frequency: f32 },
    NoteOff { note: u8 },
    Trigger { sound: u8 },
    AllNotesOff,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

/// Input side of the note event queue.
///
/// Events are applied by the mixer between periods, so sending never blocks
/// and never touches voice state directly.
pub struct NoteSender {
    tx: Producer<SynthMessage>,
}

impl NoteSender {
    /// Queue an event. Returns `false` if the queue was full and the event
    /// was dropped.
    pub fn send(&mut self, msg: SynthMessage) -> bool {
        self.tx.push(msg).is_ok()
    }

    pub fn note_on(&mut self, note: u8, frequency: f32) -> bool {
        self.send(SynthMessage::NoteOn { note, frequency })
    }

    pub fn note_off(&mut self, note: u8) -> bool {
        self.send(SynthMessage::NoteOff { note })
    }

    pub fn trigger(&mut self, sound: u8) -> bool {
        self.send(SynthMessage::Trigger { sound })
    }

    pub fn all_notes_off(&mut self) -> bool {
        self.send(SynthMessage::AllNotesOff)
    }
}

/// Create a bounded note event queue.
pub fn note_channel(capacity: usize) -> (NoteSender, Consumer<SynthMessage>) {
    let (tx, rx) = RingBuffer::<SynthMessage>::new(capacity);
    (NoteSender { tx }, rx)
}
