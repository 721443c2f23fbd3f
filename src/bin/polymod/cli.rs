use std::path::PathBuf;

use clap::{Parser, Subcommand};
use polymod::dsp::WaveformKind;

#[derive(Parser)]
#[command(name = "polymod")]
#[command(about = "Polyphonic keyboard synth with a MOD player underneath")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play live from the computer keyboard over a module
    Play {
        /// MOD file to play in the background (built-in demo song if omitted)
        #[arg(short, long)]
        module: Option<PathBuf>,

        /// Engine config (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Master volume, 0 to 100
        #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: u8,

        /// Waveform the keyboard voices play
        #[arg(short, long, default_value_t = WaveformKind::Organ)]
        waveform: WaveformKind,

        /// Keyboard only, no background music
        #[arg(long)]
        no_music: bool,
    },

    /// Render offline to a 16-bit stereo WAV file
    Render {
        /// Output WAV path
        #[arg(short, long)]
        out: PathBuf,

        /// Seconds of audio to render
        #[arg(short, long, default_value_t = 10.0)]
        seconds: f32,

        /// MOD file to render (built-in demo song if omitted)
        #[arg(short, long)]
        module: Option<PathBuf>,

        /// Engine config (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Keyboard characters to play as a melody over the music, e.g. "adgk"
        #[arg(short, long)]
        notes: Option<String>,

        /// Length of each melody note in milliseconds
        #[arg(long, default_value_t = 250)]
        note_ms: u32,

        #[arg(short, long, default_value_t = WaveformKind::Organ)]
        waveform: WaveformKind,
    },

    /// Print what's inside a MOD file
    Info {
        /// MOD file
        file: PathBuf,
    },
}
