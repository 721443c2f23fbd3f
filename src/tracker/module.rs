//! MOD file parsing.

use std::{sync::Arc, time::Duration};

use super::{
    ModuleError, BYTES_PER_CELL, DEFAULT_SPEED, DEFAULT_TEMPO, HEADER_LEN, MAX_CHANNELS,
    MAX_POSITIONS, MAX_SAMPLES, ROWS_PER_PATTERN,
};

/*
MOD Layout
==========

Everything is big-endian. Lengths and loop points are stored in 16-bit WORDS
and doubled to get bytes.

  offset  size        field
  ──────  ──────────  ─────────────────────────────────────────────
       0  20          song title, NUL padded
      20  31 × 30     sample descriptors
     950  1           song length (positions actually played)
     951  1           restart position (ignored)
     952  128         position table (pattern index per position)
    1080  4           format tag ("M.K.", "8CHN", ...)
    1084  P × 64 × C × 4
                      pattern data, P = max(position table) + 1
       …  Σ lengths   sample payloads, signed 8-bit, back to back

Sample descriptor (30 bytes):

  name[22]  length_words[2]  finetune[1]  volume[1]  loop_start_words[2]
  loop_length_words[2]

Pattern cell (4 bytes):

   byte 0        byte 1        byte 2        byte 3
  ┌────┬────┐  ┌─────────┐  ┌────┬────┐  ┌─────────┐
  │ sH │ pH │  │ period  │  │ sL │ fx │  │  param  │
  └────┴────┘  └─────────┘  └────┴────┘  └─────────┘

  period = (pH << 8) | byte1          12 bits
  sample = sH << 4 | sL               (byte0 & 0xF0) | (byte2 >> 4)
  effect = fx                         4 bits
*/

/// One note slot of a pattern row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell {
    pub sample: u8,
    pub period: u16,
    pub effect: u8,
    pub param: u8,
}

impl Cell {
    pub fn decode(bytes: [u8; 4]) -> Self {
        let [b0, b1, b2, b3] = bytes;
        Self {
            sample: (b0 & 0xF0) | (b2 >> 4),
            period: (u16::from(b0 & 0x0F) << 8) | u16::from(b1),
            effect: b2 & 0x0F,
            param: b3,
        }
    }

    pub fn encode(&self) -> [u8; 4] {
        [
            (self.sample & 0xF0) | ((self.period >> 8) as u8 & 0x0F),
            self.period as u8,
            ((self.sample & 0x0F) << 4) | (self.effect & 0x0F),
            self.param,
        ]
    }

    pub fn is_empty(&self) -> bool {
        *self == Cell::default()
    }
}

/// Sample descriptor with byte-based lengths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleInfo {
    pub name: String,
    pub length: usize,
    /// Signed 4-bit finetune (-8..=7). Parsed but not applied to pitch.
    pub finetune: i8,
    /// Default volume, 0..=64.
    pub volume: u8,
    pub loop_start: usize,
    pub loop_length: usize,
    /// Byte offset of the payload inside the module blob.
    offset: usize,
}

impl SampleInfo {
    /// Whether the sample repeats. Loops of two bytes or less are the
    /// format's "no loop" marker.
    pub fn loops(&self) -> bool {
        self.loop_length > 2 && self.loop_start < self.length
    }

    /// Byte index where a looping sample jumps back to `loop_start`.
    pub fn loop_end(&self) -> usize {
        (self.loop_start + self.loop_length).min(self.length)
    }
}

/// A parsed module. Immutable after loading.
///
/// The blob is kept alive for the module's lifetime and sample payloads are
/// served straight out of it.
#[derive(Debug, Clone)]
pub struct Module {
    blob: Arc<[u8]>,
    title: String,
    samples: Vec<SampleInfo>,
    song_length: usize,
    positions: [u8; MAX_POSITIONS],
    tag: [u8; 4],
    channels: usize,
    pattern_count: usize,
    cells: Vec<Cell>,
}

impl Module {
    pub fn parse(blob: impl Into<Arc<[u8]>>) -> Result<Self, ModuleError> {
        let blob: Arc<[u8]> = blob.into();
        let data = &*blob;

        if data.len() < HEADER_LEN {
            return Err(ModuleError::TooSmall {
                len: data.len(),
                needed: HEADER_LEN,
            });
        }

        let title = read_name(&data[0..20]);

        let mut samples = Vec::with_capacity(MAX_SAMPLES);
        for i in 0..MAX_SAMPLES {
            let d = &data[20 + i * 30..20 + (i + 1) * 30];
            samples.push(SampleInfo {
                name: read_name(&d[0..22]),
                length: read_words(&d[22..24]),
                finetune: ((d[24] & 0x0F) << 4) as i8 >> 4,
                volume: d[25].min(64),
                loop_start: read_words(&d[26..28]),
                loop_length: read_words(&d[28..30]),
                offset: 0,
            });
        }

        let song_length = data[950];
        if song_length == 0 || song_length as usize > MAX_POSITIONS {
            return Err(ModuleError::InvalidSongLength(song_length));
        }
        let song_length = song_length as usize;

        let mut positions = [0u8; MAX_POSITIONS];
        positions.copy_from_slice(&data[952..1080]);

        let mut tag = [0u8; 4];
        tag.copy_from_slice(&data[1080..1084]);
        let channels = match channels_for_tag(&tag) {
            Some(n) if (1..=MAX_CHANNELS).contains(&n) => n,
            Some(n) => {
                return Err(ModuleError::InvalidChannelCount {
                    tag: tag_string(&tag),
                    channels: n,
                    max: MAX_CHANNELS,
                })
            }
            None => {
                tracing::warn!(tag = %tag_string(&tag), "unknown format tag, assuming 4 channels");
                4
            }
        };

        let pattern_count = positions[..song_length]
            .iter()
            .copied()
            .max()
            .map_or(1, |max| max as usize + 1);

        let pattern_bytes = pattern_count * ROWS_PER_PATTERN * channels * BYTES_PER_CELL;
        let pattern_end = HEADER_LEN + pattern_bytes;
        if pattern_end > data.len() {
            return Err(ModuleError::PatternsTruncated {
                patterns: pattern_count,
                needed: pattern_end,
                available: data.len(),
            });
        }

        let cells = data[HEADER_LEN..pattern_end]
            .chunks_exact(BYTES_PER_CELL)
            .map(|c| Cell::decode([c[0], c[1], c[2], c[3]]))
            .collect();

        let mut offset = pattern_end;
        for (index, sample) in samples.iter_mut().enumerate() {
            let end = offset + sample.length;
            if end > data.len() {
                return Err(ModuleError::SampleTruncated {
                    index: index + 1,
                    needed: end,
                    available: data.len(),
                });
            }
            sample.offset = offset;
            offset = end;
        }

        tracing::info!(
            title = %title,
            song_length,
            patterns = pattern_count,
            channels,
            "loaded module"
        );

        Ok(Self {
            blob,
            title,
            samples,
            song_length,
            positions,
            tag,
            channels,
            pattern_count,
            cells,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// All 31 sample slots, including empty ones.
    pub fn samples(&self) -> &[SampleInfo] {
        &self.samples
    }

    /// Descriptor for a 1-based sample number as used in pattern cells.
    pub fn sample(&self, number: u8) -> Option<&SampleInfo> {
        (number as usize).checked_sub(1).and_then(|i| self.samples.get(i))
    }

    /// Raw signed 8-bit payload of a 1-based sample number.
    pub fn sample_data(&self, number: u8) -> &[u8] {
        match self.sample(number) {
            Some(info) => &self.blob[info.offset..info.offset + info.length],
            None => &[],
        }
    }

    pub fn song_length(&self) -> usize {
        self.song_length
    }

    /// The played part of the position table.
    pub fn positions(&self) -> &[u8] {
        &self.positions[..self.song_length]
    }

    pub fn tag(&self) -> String {
        tag_string(&self.tag)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// Cells of one row, one per channel.
    pub fn row(&self, pattern: usize, row: usize) -> &[Cell] {
        let start = (pattern * ROWS_PER_PATTERN + row) * self.channels;
        &self.cells[start..start + self.channels]
    }

    /// Pattern index played at a song position.
    pub fn pattern_at(&self, position: usize) -> usize {
        self.positions[position % self.song_length] as usize
    }

    /// Rows played in one pass of the song, ignoring pattern breaks.
    pub fn row_count(&self) -> usize {
        self.song_length * ROWS_PER_PATTERN
    }

    /// Length of one pass through the song.
    ///
    /// Walks the order list applying speed/tempo changes and pattern breaks
    /// the same way the player does. A tick lasts `2.5 / tempo` seconds.
    pub fn duration(&self) -> Duration {
        let mut speed = DEFAULT_SPEED as u64;
        let mut tempo = DEFAULT_TEMPO as u64;
        let mut micros = 0u64;

        for position in 0..self.song_length {
            let pattern = self.pattern_at(position);
            let mut row = 0;
            while row < ROWS_PER_PATTERN {
                for cell in self.row(pattern, row) {
                    match (cell.effect, cell.param) {
                        (0xD, _) => row = ROWS_PER_PATTERN - 1,
                        (0xF, 0) => {}
                        (0xF, p) if p < 0x20 => speed = p as u64,
                        (0xF, p) => tempo = p as u64,
                        _ => {}
                    }
                }
                micros += speed * 2_500_000 / tempo;
                row += 1;
            }
        }

        Duration::from_micros(micros)
    }

    /// Bytes of the whole module blob.
    pub fn len(&self) -> usize {
        self.blob.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blob.is_empty()
    }
}

/// Channel count encoded in a format tag, if the tag is recognised.
pub fn channels_for_tag(tag: &[u8; 4]) -> Option<usize> {
    match tag {
        b"M.K." | b"M!K!" | b"FLT4" | b"4CHN" => Some(4),
        b"6CHN" => Some(6),
        b"8CHN" | b"FLT8" | b"OCTA" | b"CD81" => Some(8),
        [n, b'C', b'H', b'N'] if n.is_ascii_digit() => Some((n - b'0') as usize),
        [a, b, b'C', b'H'] if a.is_ascii_digit() && b.is_ascii_digit() => {
            Some(((a - b'0') * 10 + (b - b'0')) as usize)
        }
        _ => None,
    }
}

fn read_words(bytes: &[u8]) -> usize {
    u16::from_be_bytes([bytes[0], bytes[1]]) as usize * 2
}

fn read_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}

fn tag_string(tag: &[u8; 4]) -> String {
    String::from_utf8_lossy(tag).into_owned()
}
