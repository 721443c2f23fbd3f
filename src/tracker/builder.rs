//! Programmatic MOD writer.
//!
//! Produces blobs in exactly the layout [`Module::parse`](super::Module::parse)
//! reads, which keeps tests and benches free of checked-in binaries and gives
//! the CLI a song to play when no module file is supplied.

use super::{
    module::Cell, BYTES_PER_CELL, HEADER_LEN, MAX_CHANNELS, MAX_POSITIONS, MAX_SAMPLES,
    ROWS_PER_PATTERN,
};

/// Sample payload and descriptor fields, in bytes.
#[derive(Debug, Clone, Default)]
pub struct SampleSpec {
    pub name: String,
    /// Signed 8-bit PCM stored as raw bytes. Padded to an even length.
    pub data: Vec<u8>,
    pub volume: u8,
    /// Low nibble is written as the finetune field.
    pub finetune: u8,
    pub loop_start: usize,
    pub loop_length: usize,
}

impl SampleSpec {
    /// Full-volume sample that plays once.
    pub fn one_shot(name: &str, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            volume: 64,
            ..Self::default()
        }
    }

    /// Full-volume sample that loops over its whole length.
    pub fn looped(name: &str, data: Vec<u8>) -> Self {
        let loop_length = data.len();
        Self {
            name: name.into(),
            data,
            volume: 64,
            loop_length,
            ..Self::default()
        }
    }
}

/// Cells of one pattern, row-major.
pub struct PatternBuilder {
    channels: usize,
    cells: Vec<Cell>,
}

impl PatternBuilder {
    fn new(channels: usize) -> Self {
        Self {
            channels,
            cells: vec![Cell::default(); ROWS_PER_PATTERN * channels],
        }
    }

    fn cell_mut(&mut self, row: usize, channel: usize) -> Option<&mut Cell> {
        if row >= ROWS_PER_PATTERN || channel >= self.channels {
            return None;
        }
        self.cells.get_mut(row * self.channels + channel)
    }

    /// Replace a cell. Rows past 63 and channels past the module's count
    /// are ignored.
    pub fn set(&mut self, row: usize, channel: usize, cell: Cell) -> &mut Self {
        if let Some(slot) = self.cell_mut(row, channel) {
            *slot = cell;
        }
        self
    }

    /// Note with sample number and period, no effect.
    pub fn note(&mut self, row: usize, channel: usize, sample: u8, period: u16) -> &mut Self {
        if let Some(cell) = self.cell_mut(row, channel) {
            cell.sample = sample;
            cell.period = period;
        }
        self
    }

    /// Effect and parameter, keeping any note already in the cell.
    pub fn effect(&mut self, row: usize, channel: usize, effect: u8, param: u8) -> &mut Self {
        if let Some(cell) = self.cell_mut(row, channel) {
            cell.effect = effect;
            cell.param = param;
        }
        self
    }
}

/// Writes a MOD blob.
///
/// Inputs the format can't hold are clamped rather than rejected: the
/// channel count to `1..=32`, the order list to its first 128 entries, and
/// sample slots outside `1..=31` are ignored.
pub struct ModuleBuilder {
    title: String,
    channels: usize,
    samples: Vec<SampleSpec>,
    positions: Vec<u8>,
    patterns: Vec<PatternBuilder>,
}

impl ModuleBuilder {
    pub fn new(title: &str, channels: usize) -> Self {
        Self {
            title: title.into(),
            channels: channels.clamp(1, MAX_CHANNELS),
            samples: vec![SampleSpec::default(); MAX_SAMPLES],
            positions: vec![0],
            patterns: Vec::new(),
        }
    }

    /// Set a 1-based sample slot. Numbers outside `1..=31` are ignored.
    pub fn sample(mut self, number: u8, spec: SampleSpec) -> Self {
        if let Some(slot) = (number as usize)
            .checked_sub(1)
            .and_then(|i| self.samples.get_mut(i))
        {
            *slot = spec;
        }
        self
    }

    /// Order list. Only the first 128 entries are kept; an empty list builds
    /// a blob the parser rejects for its song length.
    pub fn positions(mut self, positions: &[u8]) -> Self {
        let len = positions.len().min(MAX_POSITIONS);
        self.positions = positions[..len].to_vec();
        self
    }

    /// Fill pattern `index`. Unfilled patterns are silent.
    pub fn pattern(mut self, index: usize, fill: impl FnOnce(&mut PatternBuilder)) -> Self {
        while self.patterns.len() <= index {
            self.patterns.push(PatternBuilder::new(self.channels));
        }
        fill(&mut self.patterns[index]);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_LEN];

        write_name(&mut out[0..20], &self.title);

        for (i, spec) in self.samples.iter().enumerate() {
            let d = &mut out[20 + i * 30..20 + (i + 1) * 30];
            write_name(&mut d[0..22], &spec.name);
            d[22..24].copy_from_slice(&words(spec.data.len().div_ceil(2) * 2));
            d[24] = spec.finetune & 0x0F;
            d[25] = spec.volume;
            d[26..28].copy_from_slice(&words(spec.loop_start));
            d[28..30].copy_from_slice(&words(spec.loop_length));
        }

        // Length is at most MAX_POSITIONS, see `positions`
        out[950] = self.positions.len() as u8;
        out[951] = 127;
        out[952..952 + self.positions.len()].copy_from_slice(&self.positions);
        out[1080..1084].copy_from_slice(&tag_for_channels(self.channels));

        let pattern_count = self.positions.iter().copied().max().unwrap_or(0) as usize + 1;
        for index in 0..pattern_count {
            match self.patterns.get(index) {
                Some(pattern) => {
                    for cell in &pattern.cells {
                        out.extend_from_slice(&cell.encode());
                    }
                }
                None => out.extend(
                    std::iter::repeat(0u8).take(ROWS_PER_PATTERN * self.channels * BYTES_PER_CELL),
                ),
            }
        }

        for spec in &self.samples {
            out.extend_from_slice(&spec.data);
            if spec.data.len() % 2 == 1 {
                out.push(0);
            }
        }

        out
    }
}

/// Short four-channel loop: bass on channel 0, an arpeggio on channel 1.
pub fn demo_song() -> Vec<u8> {
    const C3: u16 = 214;
    const E3: u16 = 170;
    const G3: u16 = 143;
    const C2: u16 = 428;
    const G1: u16 = 570;

    // 32-byte square and 64-byte triangle, both looping
    let square: Vec<u8> = (0..32).map(|i| if i < 16 { 80u8 } else { (-80i8) as u8 }).collect();
    let triangle: Vec<u8> = (0..64)
        .map(|i: i32| {
            let v = if i < 32 { i * 8 - 128 } else { 383 - i * 8 };
            v.clamp(-128, 127) as i8 as u8
        })
        .collect();

    ModuleBuilder::new("polymod demo", 4)
        .sample(1, SampleSpec::looped("square lead", square))
        .sample(
            2,
            SampleSpec {
                volume: 48,
                ..SampleSpec::looped("triangle bass", triangle)
            },
        )
        .positions(&[0, 0, 1, 0])
        .pattern(0, |p| {
            for bar in 0..4 {
                let row = bar * 16;
                p.note(row, 0, 2, C2).note(row + 8, 0, 2, C2);
                for (step, period) in [C3, E3, G3, E3].into_iter().enumerate() {
                    p.note(row + step * 4, 1, 1, period);
                }
            }
            p.effect(0, 2, 0xF, 6).effect(0, 3, 0xF, 125);
        })
        .pattern(1, |p| {
            for bar in 0..4 {
                let row = bar * 16;
                p.note(row, 0, 2, G1).note(row + 8, 0, 2, G1);
                for (step, period) in [G3, E3, C3, E3].into_iter().enumerate() {
                    p.note(row + step * 4, 1, 1, period).effect(row + step * 4, 1, 0xC, 40);
                }
            }
        })
        .build()
}

fn words(bytes: usize) -> [u8; 2] {
    ((bytes / 2) as u16).to_be_bytes()
}

fn write_name(dst: &mut [u8], name: &str) {
    let bytes = name.as_bytes();
    let len = bytes.len().min(dst.len());
    dst[..len].copy_from_slice(&bytes[..len]);
}

fn tag_for_channels(channels: usize) -> [u8; 4] {
    match channels {
        4 => *b"M.K.",
        1..=9 => [b'0' + channels as u8, b'C', b'H', b'N'],
        _ => [
            b'0' + (channels / 10) as u8,
            b'0' + (channels % 10) as u8,
            b'C',
            b'H',
        ],
    }
}
