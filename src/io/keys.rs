use crate::synth::message::SynthMessage;

/// One key of the playable octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDef {
    pub name: &'static str,
    /// Character on a QWERTY keyboard that plays this note.
    pub key: char,
    pub midi_note: u8,
    pub is_black: bool,
}

impl KeyDef {
    pub fn frequency(&self) -> f32 {
        midi_note_to_freq(self.midi_note)
    }
}

const fn white(name: &'static str, key: char, midi_note: u8) -> KeyDef {
    KeyDef { name, key, midi_note, is_black: false }
}

const fn black(name: &'static str, key: char, midi_note: u8) -> KeyDef {
    KeyDef { name, key, midi_note, is_black: true }
}

/// C4 to C5 chromatic. White keys sit on the home row, sharps on the row
/// above; `e` is skipped because there is no E#.
///
/// The index into this table is the note number sent to the voice pool.
pub const KEYBOARD: [KeyDef; 13] = [
    white("C4", 'a', 60),
    white("D4", 's', 62),
    white("E4", 'd', 64),
    white("F4", 'f', 65),
    white("G4", 'g', 67),
    white("A4", 'h', 69),
    white("B4", 'j', 71),
    white("C5", 'k', 72),
    black("C#4", 'q', 61),
    black("D#4", 'w', 63),
    black("F#4", 'r', 66),
    black("G#4", 't', 68),
    black("A#4", 'y', 70),
];

/// Note number for a typed character, case-insensitive.
pub fn note_for_key(key: char) -> Option<u8> {
    let key = key.to_ascii_lowercase();
    KEYBOARD.iter().position(|k| k.key == key).map(|i| i as u8)
}

pub fn key_def(note: u8) -> Option<&'static KeyDef> {
    KEYBOARD.get(note as usize)
}

pub fn note_on(note: u8) -> Option<SynthMessage> {
    key_def(note).map(|def| SynthMessage::NoteOn {
        note,
        frequency: def.frequency(),
    })
}

pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}
