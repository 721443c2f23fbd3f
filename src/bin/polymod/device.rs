//! Sound card output through cpal.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use color_eyre::eyre::{bail, eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use polymod::io::{
    sink::{AudioSink, SinkError, CHANNELS},
    VolumeControl,
};
use rtrb::{Consumer, Producer, RingBuffer};

/// Periods of headroom between the mixer and the device callback.
const DEVICE_PERIODS: usize = 16;

/// Keeps the device stream playing. Must outlive the sink.
pub struct Output {
    _stream: cpal::Stream,
    pub sample_rate: u32,
}

/// Blocking sink in front of a cpal output stream.
///
/// `write` waits for room in a ring that the device callback drains, so the
/// mixer runs exactly as fast as the hardware consumes audio. The stream
/// itself stays on the opening thread in [`Output`].
pub struct CpalSink {
    tx: Producer<i16>,
    volume: VolumeControl,
    failed: Arc<AtomicBool>,
    scratch: Vec<i16>,
}

impl CpalSink {
    /// Open the default output device. The engine must render at the
    /// returned [`Output::sample_rate`].
    pub fn open(frames_per_period: usize, volume: VolumeControl) -> EyreResult<(Self, Output)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0;
        let format = config.sample_format();
        let config: cpal::StreamConfig = config.into();
        let device_channels = config.channels as usize;

        let (tx, rx) = RingBuffer::<i16>::new(frames_per_period * CHANNELS * DEVICE_PERIODS);
        let failed = Arc::new(AtomicBool::new(false));
        let on_error = {
            let failed = Arc::clone(&failed);
            move |err: cpal::StreamError| {
                tracing::error!(error = %err, "audio stream error");
                failed.store(true, Ordering::Relaxed);
            }
        };

        let stream = match format {
            cpal::SampleFormat::F32 => {
                let mut rx = rx;
                device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        fill(data, device_channels, &mut rx, |s| f32::from(s) / 32768.0)
                    },
                    on_error,
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let mut rx = rx;
                device.build_output_stream(
                    &config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        fill(data, device_channels, &mut rx, |s| s)
                    },
                    on_error,
                    None,
                )
            }
            other => bail!("unsupported device sample format {other:?}"),
        }
        .wrap_err("failed to build output stream")?;

        stream.play().wrap_err("failed to start output stream")?;

        tracing::info!(sample_rate, channels = device_channels, ?format, "audio device opened");

        Ok((
            Self {
                tx,
                volume,
                failed,
                scratch: Vec::with_capacity(frames_per_period * CHANNELS),
            },
            Output {
                _stream: stream,
                sample_rate,
            },
        ))
    }
}

impl AudioSink for CpalSink {
    fn write(&mut self, frames: &[i16]) -> Result<usize, SinkError> {
        if frames.len() % CHANNELS != 0 {
            return Err(SinkError::PartialFrame(frames.len()));
        }

        self.scratch.clear();
        self.scratch.extend_from_slice(frames);
        self.volume.apply(&mut self.scratch);

        let mut pending = &self.scratch[..];
        while !pending.is_empty() {
            if self.failed.load(Ordering::Relaxed) {
                return Err(SinkError::Device("output stream failed".into()));
            }
            if self.tx.is_abandoned() {
                return Err(SinkError::Closed);
            }

            let n = self.tx.slots().min(pending.len());
            if n == 0 {
                thread::sleep(Duration::from_millis(1));
                continue;
            }
            for &s in &pending[..n] {
                // Slot count was checked above
                let _ = self.tx.push(s);
            }
            pending = &pending[n..];
        }

        Ok(frames.len() / CHANNELS)
    }
}

/// Copy queued stereo frames into a device buffer of any channel count.
/// Underruns play silence.
fn fill<T: Copy + Default>(
    data: &mut [T],
    device_channels: usize,
    rx: &mut Consumer<i16>,
    convert: impl Fn(i16) -> T,
) {
    for frame in data.chunks_mut(device_channels.max(1)) {
        let left = rx.pop().unwrap_or(0);
        let right = rx.pop().unwrap_or(left);
        for (ch, out) in frame.iter_mut().enumerate() {
            *out = match ch {
                0 => convert(left),
                1 => convert(right),
                _ => T::default(),
            };
        }
    }
}
