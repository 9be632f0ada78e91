//! Intonation CLI: play the ear-training games in a terminal.

mod config;
mod input;

use std::error::Error;
use std::fs::File;
use std::io::BufRead;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use crossbeam_channel::{Receiver, RecvTimeoutError};

use intonation_engine::realtime::{output_device_names, AudioOutput, OutputOptions};
use intonation_engine::{SharedSynth, SilentTones, ToneEngine};
use intonation_game::prefs::{self, snap_pause};
use intonation_game::variants::SCALE_DEGREES;
use intonation_game::{
    AdvanceMode, Answer, DifficultyMode, Direction, FileStore, MemoryStore, Preferences, ScaleInput, Session,
    SessionEvent, SoundProfile, Store, Variant,
};

use input::Command;

/// Ear training: higher or lower, drones, cadences and mistuned scales.
#[derive(Parser)]
#[command(name = "intonation")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Write debug-level logs to the log file
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one game until you run out of lives
    Play {
        /// Game number: 1 basic, 2 chained, 3 drone, 4 cadence, 5 scale
        #[arg(short = 'g', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=5))]
        variant: u32,

        /// Seed for reproducible rounds
        #[arg(long)]
        seed: Option<u64>,

        /// Output device name (see `intonation devices`)
        #[arg(long)]
        device: Option<String>,

        /// Requested sample rate in Hz
        #[arg(long)]
        sample_rate: Option<u32>,

        /// Output gain, 0.0..=1.0
        #[arg(long)]
        gain: Option<f32>,

        /// Play without opening an audio device
        #[arg(long)]
        silent: bool,
    },

    /// Show the best level reached in each game
    Scores,

    /// Show or change preferences
    Settings {
        /// Sound profile: default, piano, guitar, synth
        #[arg(long)]
        profile: Option<SoundProfile>,

        /// easy (replay while answering) or hard
        #[arg(long)]
        difficulty: Option<DifficultyMode>,

        /// Pause between notes in ms (0..=1000, steps of 100)
        #[arg(long)]
        pause_ms: Option<u64>,

        /// fast (continue automatically) or slow (wait for `n`)
        #[arg(long)]
        advance: Option<AdvanceMode>,

        /// Scale game input: combined (`3u`) or split (`3` then `u`)
        #[arg(long)]
        scale_input: Option<ScaleInput>,
    },

    /// List audio output devices
    Devices,
}

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = config::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("intonation.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[warn] no log file at {}: {e}", log_path.display());
            return;
        }
    };

    if let Err(e) = WriteLogger::init(log_level, Config::default(), log_file) {
        eprintln!("[warn] logger init failed: {e}");
        return;
    }

    log::info!("intonation starting (log level: {:?})", log_level);
}

fn open_store() -> Box<dyn Store> {
    match FileStore::open_default() {
        Ok(s) => Box::new(s),
        Err(e) => {
            log::warn!(target: "store", "falling back to memory store: {e}");
            eprintln!("[warn] scores and settings will not be saved ({e})");
            Box::new(MemoryStore::new())
        }
    }
}

/// Open the device, or fall back to silence. The returned output must be
/// kept alive for sound to play.
fn open_tones(silent: bool, opts: &OutputOptions) -> (Box<dyn ToneEngine>, Option<AudioOutput>) {
    if silent {
        return (Box::new(SilentTones::new()), None);
    }
    let synth = SharedSynth::new(opts.sample_rate.map_or(48_000.0, |sr| sr as f32));
    match AudioOutput::open(synth.clone(), opts) {
        Ok(out) => {
            println!("Audio: {} @ {} Hz, {} ch", out.device_name(), out.sample_rate(), out.channels());
            (Box::new(synth), Some(out))
        }
        Err(e) => {
            log::warn!(target: "audio", "audio unavailable, playing silently: {e}");
            eprintln!("[warn] audio unavailable ({e}); playing without sound");
            (Box::new(SilentTones::new()), None)
        }
    }
}

/// Stdin lines on a reader thread, delivered over a channel. The channel
/// disconnects at end of input.
fn spawn_input() -> Receiver<String> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn lives_bar(lives: u8) -> String {
    "*".repeat(usize::from(lives))
}

fn prompt<T: ToneEngine>(session: &Session<T>) -> &'static str {
    match (session.variant(), session.prefs().scale_input) {
        (Variant::Scale, ScaleInput::Combined) => "Which degree is out of tune, and which way? (e.g. 3u)",
        (Variant::Scale, ScaleInput::Split) => "Pick the degree (1-7) and the direction (u/d), in any order",
        (Variant::Cadence, _) => "Is the last note sharp (u) or flat (d)?",
        _ => "Higher (u) or lower (d)?",
    }
}

fn print_events<T: ToneEngine>(session: &mut Session<T>) -> bool {
    let mut over = false;
    for ev in session.drain_events() {
        match ev {
            SessionEvent::RoundReady { level } => {
                println!("\nLevel {level}   lives {}", lives_bar(session.state().lives));
            }
            SessionEvent::PlaybackStarted { replay: true } => println!("(replaying)"),
            SessionEvent::InputOpened => {
                println!("{}", prompt(session));
                if session.can_replay() {
                    println!("  r to hear it again");
                }
            }
            SessionEvent::Answered { correct, expected } => {
                let want = match expected {
                    Answer::Direction(Direction::Up) => "up".to_string(),
                    Answer::Direction(Direction::Down) => "down".to_string(),
                    Answer::Degree { index, direction } => {
                        format!("degree {index} {}", if direction == Direction::Up { "sharp" } else { "flat" })
                    }
                };
                if correct {
                    println!("Correct ({want})");
                } else {
                    println!("Wrong, it was {want}");
                }
            }
            SessionEvent::AwaitingAdvance => println!("n for the next round, r to listen again"),
            SessionEvent::NewHighScore { level } => log::info!("new best: level {level}"),
            SessionEvent::GameOver { level } => {
                println!("\nGame over at level {level}. Best: {}", session.high_score());
                over = true;
            }
            SessionEvent::PlaybackStarted { replay: false } | SessionEvent::PlaybackFinished | SessionEvent::Exited => {}
        }
    }
    over
}

fn handle<T: ToneEngine>(session: &mut Session<T>, cmd: Command) -> bool {
    let scale = session.variant() == Variant::Scale;
    let split = session.prefs().scale_input == ScaleInput::Split;
    let open = session.state().input_enabled;
    let accepted = match cmd {
        Command::Quit => return false,
        Command::Help => {
            println!("{}", input::HELP);
            true
        }
        Command::Replay => session.replay_stimulus(),
        Command::Next => session.advance_next(),
        Command::Direction(d) if !scale => session.submit_answer(Answer::Direction(d)).is_some(),
        Command::Direction(d) if split => {
            session.select_direction(d);
            open
        }
        Command::Degree(i) if scale && split => {
            session.select_degree(i);
            open && SCALE_DEGREES.contains(&i)
        }
        Command::Combined(a) if scale => session.submit_answer(a).is_some(),
        Command::Direction(_) | Command::Degree(_) | Command::Combined(_) => {
            println!("{}", prompt(session));
            return true;
        }
    };
    if !accepted {
        println!("(not now)");
    }
    true
}

fn play(
    variant: Variant,
    seed: Option<u64>,
    opts: &OutputOptions,
    silent: bool,
) -> Result<(), Box<dyn Error>> {
    let (tones, _output) = open_tones(silent, opts);
    let store = open_store();
    let policy = variant.policy();
    let mut session = match seed {
        Some(seed) => Session::seeded(policy, tones, store, seed),
        None => Session::new(policy, tones, store),
    };

    println!("{variant}   (best: level {})", session.high_score());
    println!("Type ? for help, q to quit.");

    let rx = spawn_input();
    let started = Instant::now();
    session.start();

    loop {
        if print_events(&mut session) {
            break;
        }
        match rx.recv_timeout(Duration::from_millis(20)) {
            Ok(line) => match input::parse(&line) {
                Ok(cmd) => {
                    if !handle(&mut session, cmd) {
                        break;
                    }
                }
                Err(msg) => println!("{msg}"),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        let now = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        session.advance(now.saturating_sub(session.clock_ms()));
    }

    session.exit();
    // Let the last note ring out before the stream closes.
    std::thread::sleep(Duration::from_millis(150));
    Ok(())
}

fn scores() {
    let store = open_store();
    println!("Best levels:");
    for v in Variant::ALL {
        println!("  {v:<28} {}", prefs::high_score(&*store, v));
    }
}

fn settings(
    profile: Option<SoundProfile>,
    difficulty: Option<DifficultyMode>,
    pause_ms: Option<u64>,
    advance: Option<AdvanceMode>,
    scale_input: Option<ScaleInput>,
) -> Result<(), Box<dyn Error>> {
    let mut store = FileStore::open_default()?;
    let mut p = Preferences::load(&store);
    let changed = profile.is_some()
        || difficulty.is_some()
        || pause_ms.is_some()
        || advance.is_some()
        || scale_input.is_some();

    if let Some(v) = profile { p.profile = v; }
    if let Some(v) = difficulty { p.difficulty = v; }
    if let Some(v) = pause_ms { p.pause_ms = snap_pause(v); }
    if let Some(v) = advance { p.advance_mode = v; }
    if let Some(v) = scale_input { p.scale_input = v; }

    if changed {
        p.save(&mut store)?;
        println!("Saved to {}", store.path().display());
    }
    println!("profile      {} ({})", p.profile, p.profile.label());
    println!("difficulty   {}", p.difficulty);
    println!("pause        {} ms", p.pause_ms);
    println!("advance      {}", p.advance_mode);
    println!("scale input  {}", p.scale_input);
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Play { variant, seed, device, sample_rate, gain, silent } => {
            let variant = Variant::from_number(variant).ok_or("game number must be 1..=5")?;
            let mut opts = config::Config::load().output_options();
            if device.is_some() { opts.device_name = device; }
            if sample_rate.is_some() { opts.sample_rate = sample_rate; }
            if let Some(g) = gain { opts.gain = g.clamp(0.0, 1.0); }
            play(variant, seed, &opts, silent)?;
        }
        Commands::Scores => scores(),
        Commands::Settings { profile, difficulty, pause_ms, advance, scale_input } => {
            settings(profile, difficulty, pause_ms, advance, scale_input)?;
        }
        Commands::Devices => {
            println!("Available output devices:");
            for name in output_device_names()? {
                println!("- {name}");
            }
        }
    }
    Ok(())
}
