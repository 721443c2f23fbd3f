//! Subcommand implementations.

use std::{path::Path, sync::Arc, thread::JoinHandle, time::Duration};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use polymod::{
    dsp::{SoundBank, WaveformKind},
    engine::{spawn_mixer, spawn_tracker, Mixer, OfflineRenderer, TrackerFeed},
    io::{keys, SinkError, VolumeControl, WavSink},
    ring::sample_ring,
    synth::{note_channel, SynthMessage, VoicePool},
    tracker::{demo_song, Module, Player},
    EngineConfig,
};

use super::{device::CpalSink, keyboard};

fn load_config(path: Option<&Path>) -> EyreResult<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .wrap_err_with(|| format!("failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load_module(path: Option<&Path>) -> EyreResult<Module> {
    let blob = match path {
        Some(path) => {
            std::fs::read(path).wrap_err_with(|| format!("failed to read {}", path.display()))?
        }
        None => demo_song(),
    };
    Module::parse(blob).wrap_err("failed to load module")
}

pub struct PlayArgs<'a> {
    pub module: Option<&'a Path>,
    pub config: Option<&'a Path>,
    pub volume: u8,
    pub waveform: WaveformKind,
    pub no_music: bool,
}

pub fn play(args: PlayArgs<'_>) -> EyreResult<()> {
    let mut config = load_config(args.config)?;
    let volume = VolumeControl::new(args.volume);

    let (sink, output) = CpalSink::open(config.frames_per_period, volume.clone())?;
    config.output_rate = output.sample_rate;
    if config.ring_capacity < config.min_ring_capacity() {
        tracing::warn!(
            configured = config.ring_capacity,
            needed = config.min_ring_capacity(),
            "ring too small for the device rate, growing it"
        );
        config.ring_capacity = config.min_ring_capacity();
    }
    config.validate()?;

    let (tx, rx) = note_channel(config.event_queue_capacity);
    let pool = VoicePool::from_config(
        &config,
        args.waveform.build(config.output_rate),
        SoundBank::bounce(config.output_rate),
    );
    let mut mixer = Mixer::from_config(&config, pool).with_events(rx);

    // A bad module only costs the music; the keyboard still plays
    let module = if args.no_music {
        None
    } else {
        match load_module(args.module) {
            Ok(module) => Some(module),
            Err(err) => {
                tracing::error!("{err:#}, playing without music");
                None
            }
        }
    };

    let tracker = match module {
        Some(module) => {
            println!("module: {} ({} channels, {})", module.title(), module.channels(), module.tag());
            let (ring_tx, ring_rx) = sample_ring(config.ring_capacity);
            mixer = mixer.with_tracker(ring_rx);
            let player = Player::new(Arc::new(module), config.tracker_rate);
            let feed = TrackerFeed::new(player, ring_tx, config.output_rate, config.tracker_gain);
            Some(spawn_tracker(feed).wrap_err("failed to start tracker thread")?)
        }
        None => None,
    };

    let mixer = spawn_mixer(mixer, sink).wrap_err("failed to start mixer thread")?;

    keyboard::print_help();
    keyboard::run(tx, volume, || mixer.is_finished())?;

    if mixer.is_finished() {
        return mixer_outcome(mixer);
    }

    // Let the release tails play out
    std::thread::sleep(Duration::from_millis(100));
    drop(tracker);
    drop(output);
    Ok(())
}

/// Turn a finished mixer thread into the error that stopped it.
fn mixer_outcome(mixer: JoinHandle<Result<(), SinkError>>) -> EyreResult<()> {
    match mixer.join() {
        Ok(Err(err)) => Err(eyre!(err).wrap_err("audio output stopped")),
        Err(_) => Err(eyre!("mixer thread panicked")),
        Ok(Ok(())) => Ok(()),
    }
}

pub struct RenderArgs<'a> {
    pub out: &'a Path,
    pub seconds: f32,
    pub module: Option<&'a Path>,
    pub config: Option<&'a Path>,
    pub notes: Option<&'a str>,
    pub note_ms: u32,
    pub waveform: WaveformKind,
}

pub fn render(args: RenderArgs<'_>) -> EyreResult<()> {
    let config = load_config(args.config)?;
    let module = Arc::new(load_module(args.module)?);

    let mut renderer = OfflineRenderer::from_config(
        &config,
        args.waveform.build(config.output_rate),
        SoundBank::bounce(config.output_rate),
        Some(module),
    );

    if let Some(notes) = args.notes {
        let step = u64::from(config.output_rate) * u64::from(args.note_ms) / 1000;
        for (i, c) in notes.chars().enumerate() {
            let Some(note) = keys::note_for_key(c) else {
                tracing::warn!(key = %c, "not a note key, skipped");
                continue;
            };
            let start = i as u64 * step;
            if let Some(msg) = keys::note_on(note) {
                renderer.schedule(start, msg);
            }
            renderer.schedule(start + step * 3 / 4, SynthMessage::NoteOff { note });
        }
    }

    let frames = (args.seconds.max(0.0) * config.output_rate as f32) as usize;
    let mut sink = WavSink::create(args.out, config.output_rate)
        .wrap_err_with(|| format!("failed to create {}", args.out.display()))?;
    let written = renderer.render(&mut sink, frames)?;
    sink.finalize()?;

    let dropped = renderer.feed().map_or(0, TrackerFeed::dropped);
    tracing::info!(frames = written, dropped, "render finished");
    println!(
        "wrote {} ({:.2} s at {} Hz)",
        args.out.display(),
        written as f32 / config.output_rate as f32,
        config.output_rate
    );
    Ok(())
}

pub fn info(path: &Path) -> EyreResult<()> {
    let module = load_module(Some(path))?;

    println!("title:     {}", module.title());
    println!("format:    {} ({} channels)", module.tag(), module.channels());
    println!("song:      {} positions, {} patterns", module.song_length(), module.pattern_count());
    println!("order:     {:?}", module.positions());
    let duration = module.duration();
    println!(
        "duration:  {}:{:02} ({} rows)",
        duration.as_secs() / 60,
        duration.as_secs() % 60,
        module.row_count()
    );
    println!();
    println!("  #  name                    length  vol  fine  loop");

    for (i, sample) in module.samples().iter().enumerate() {
        if sample.length == 0 && sample.name.is_empty() {
            continue;
        }
        let looping = if sample.loops() {
            format!("{}..{}", sample.loop_start, sample.loop_end())
        } else {
            "-".to_string()
        };
        println!(
            " {:2}  {:<22}  {:6}  {:3}  {:4}  {}",
            i + 1,
            sample.name,
            sample.length,
            sample.volume,
            sample.finetune,
            looping
        );
    }
    Ok(())
}
