// Purpose: Voice management, polyphony, note events
// This layer sits on top of the DSP primitives and owns every voice slot

pub mod message;
pub mod pool;
pub mod voice;

pub use message::{note_channel, NoteId, NoteSender, SynthMessage};
pub use pool::VoicePool;
pub use voice::Voice;
