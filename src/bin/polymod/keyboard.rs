//! Computer keyboard as a note source.

use std::{
    collections::HashMap,
    io::{self, Write},
    time::{Duration, Instant},
};

use color_eyre::eyre::Result as EyreResult;
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{self, supports_keyboard_enhancement},
};
use polymod::{
    io::{keys, VolumeControl},
    synth::NoteSender,
};

/// Without release events a note is let go this long after its last
/// (auto-repeated) press.
const AUTO_RELEASE: Duration = Duration::from_millis(550);
const VOLUME_STEP: i16 = 5;

enum Action {
    Press(u8),
    Release(u8),
    Trigger(u8),
    Volume(i16),
    AllOff,
    Quit,
}

fn action_for(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }

    let pressed = key.kind != KeyEventKind::Release;
    match key.code {
        KeyCode::Esc if pressed => Some(Action::Quit),
        KeyCode::Char(' ') if pressed => Some(Action::AllOff),
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up if pressed => {
            Some(Action::Volume(VOLUME_STEP))
        }
        KeyCode::Char('-') | KeyCode::Down if pressed => Some(Action::Volume(-VOLUME_STEP)),
        KeyCode::Char(c @ '1'..='5') if key.kind == KeyEventKind::Press => {
            Some(Action::Trigger(c as u8 - b'1'))
        }
        KeyCode::Char(c) => keys::note_for_key(c).map(|note| {
            if pressed {
                Action::Press(note)
            } else {
                Action::Release(note)
            }
        }),
        _ => None,
    }
}

/// Raw-mode terminal session. Restores the terminal on drop.
struct RawTerminal {
    enhanced: bool,
}

impl RawTerminal {
    fn enter() -> EyreResult<Self> {
        terminal::enable_raw_mode()?;
        let enhanced = supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        Ok(Self { enhanced })
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = terminal::disable_raw_mode();
    }
}

pub fn print_help() {
    let white: Vec<_> = keys::KEYBOARD.iter().filter(|k| !k.is_black).collect();
    let black: Vec<_> = keys::KEYBOARD.iter().filter(|k| k.is_black).collect();

    println!("keys:");
    for k in white.iter().chain(&black) {
        println!("  {}  {:<3}  {:7.2} Hz", k.key, k.name, k.frequency());
    }
    println!("  1-5  bounce sounds");
    println!("  +/-  volume    space  all notes off    esc  quit");
    println!();
}

/// Read keys until the user quits or `audio_stopped` reports the output is
/// gone, turning them into note events.
pub fn run(
    mut tx: NoteSender,
    volume: VolumeControl,
    audio_stopped: impl Fn() -> bool,
) -> EyreResult<()> {
    let term = RawTerminal::enter()?;
    if !term.enhanced {
        tracing::info!("terminal has no key release events, notes release automatically");
    }

    let mut held: HashMap<u8, Instant> = HashMap::new();
    let mut out = io::stdout();

    loop {
        if audio_stopped() {
            break;
        }

        if event::poll(Duration::from_millis(10))? {
            if let Event::Key(key) = event::read()? {
                match action_for(key) {
                    Some(Action::Quit) => break,
                    Some(Action::Press(note)) => {
                        if held.insert(note, Instant::now()).is_none() {
                            if let Some(msg) = keys::note_on(note) {
                                tx.send(msg);
                            }
                        }
                    }
                    Some(Action::Release(note)) => {
                        held.remove(&note);
                        tx.note_off(note);
                    }
                    Some(Action::Trigger(sound)) => {
                        tx.trigger(sound);
                    }
                    Some(Action::Volume(delta)) => {
                        let level = volume.adjust(delta);
                        write!(out, "\rvolume {level:3}")?;
                        out.flush()?;
                    }
                    Some(Action::AllOff) => {
                        held.clear();
                        tx.all_notes_off();
                    }
                    None => {}
                }
            }
        }

        if !term.enhanced {
            let now = Instant::now();
            held.retain(|&note, &mut pressed| {
                let keep = now.duration_since(pressed) < AUTO_RELEASE;
                if !keep {
                    tx.note_off(note);
                }
                keep
            });
        }
    }

    tx.all_notes_off();
    write!(out, "\r\n")?;
    Ok(())
}
