// Purpose - external interfaces: audio output, keyboard layout, master volume

pub mod keys;
pub mod sink;
pub mod volume;

pub use keys::{midi_note_to_freq, note_for_key, KeyDef, KEYBOARD};
pub use sink::{AudioSink, MemorySink, SinkError, WavSink};
pub use volume::VolumeControl;
