//! Output side of the engine.
//!
//! The mixer hands every period to an [`AudioSink`]. On a device the write
//! blocks until there is room, which is what paces the mixer loop; offline
//! sinks accept everything immediately.

use std::{fs::File, io::BufWriter, path::Path};

use hound::{SampleFormat, WavSpec, WavWriter};
use thiserror::Error;

/// Interleaved stereo channel count of every sink.
pub const CHANNELS: usize = 2;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("audio sink is closed")]
    Closed,

    #[error("buffer of {0} samples is not whole stereo frames")]
    PartialFrame(usize),

    #[error("audio device error: {0}")]
    Device(String),

    #[error("wav output failed")]
    Wav(#[from] hound::Error),
}

pub trait AudioSink {
    /// Write interleaved stereo frames, blocking until they are accepted.
    ///
    /// Returns the number of frames written.
    fn write(&mut self, frames: &[i16]) -> Result<usize, SinkError>;
}

impl<S: AudioSink + ?Sized> AudioSink for &mut S {
    fn write(&mut self, frames: &[i16]) -> Result<usize, SinkError> {
        (**self).write(frames)
    }
}

fn frame_count(frames: &[i16]) -> Result<usize, SinkError> {
    if frames.len() % CHANNELS != 0 {
        return Err(SinkError::PartialFrame(frames.len()));
    }
    Ok(frames.len() / CHANNELS)
}

/// Collects everything written. Optionally closes after a frame limit, which
/// is how tests bound an otherwise endless mixer loop.
#[derive(Debug, Default)]
pub struct MemorySink {
    samples: Vec<i16>,
    limit: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `frames` frames, then fail every write with [`SinkError::Closed`].
    pub fn with_limit(frames: usize) -> Self {
        Self {
            samples: Vec::with_capacity(frames * CHANNELS),
            limit: Some(frames),
        }
    }

    /// Interleaved samples written so far.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }

    /// Left channel only.
    pub fn left(&self) -> impl Iterator<Item = i16> + '_ {
        self.samples.iter().step_by(CHANNELS).copied()
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }
}

impl AudioSink for MemorySink {
    fn write(&mut self, frames: &[i16]) -> Result<usize, SinkError> {
        let count = frame_count(frames)?;
        if let Some(limit) = self.limit {
            if self.frames() >= limit {
                return Err(SinkError::Closed);
            }
        }
        self.samples.extend_from_slice(frames);
        Ok(count)
    }
}

/// 16-bit stereo WAV file.
pub struct WavSink {
    writer: WavWriter<BufWriter<File>>,
    frames: usize,
}

impl WavSink {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self, SinkError> {
        let spec = WavSpec {
            channels: CHANNELS as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let writer = WavWriter::create(path, spec)?;
        Ok(Self { writer, frames: 0 })
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Patch the header lengths and flush. Dropping without this leaves a
    /// file most readers still accept, but with a stale header.
    pub fn finalize(self) -> Result<(), SinkError> {
        self.writer.finalize()?;
        Ok(())
    }
}

impl AudioSink for WavSink {
    fn write(&mut self, frames: &[i16]) -> Result<usize, SinkError> {
        let count = frame_count(frames)?;
        for &sample in frames {
            self.writer.write_sample(sample)?;
        }
        self.frames += count;
        Ok(count)
    }
}
