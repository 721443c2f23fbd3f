//! polymod - keyboard synth over a MOD player
//!
//! Run with: cargo run -- play

mod app;
mod cli;
mod device;
mod keyboard;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            module,
            config,
            volume,
            waveform,
            no_music,
        } => app::play(app::PlayArgs {
            module: module.as_deref(),
            config: config.as_deref(),
            volume,
            waveform,
            no_music,
        }),
        Commands::Render {
            out,
            seconds,
            module,
            config,
            notes,
            note_ms,
            waveform,
        } => app::render(app::RenderArgs {
            out: &out,
            seconds,
            module: module.as_deref(),
            config: config.as_deref(),
            notes: notes.as_deref(),
            note_ms,
            waveform,
        }),
        Commands::Info { file } => app::info(&file),
    }
}
