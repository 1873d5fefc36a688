//! # Chord Listener - Console Front End
//!
//! Captures audio from the default input device and prints the detected
//! notes and chord for every analysed block.
//!
//! ## Architecture
//! - **Audio Callback**: CPAL stream cutting input into fixed-size blocks
//! - **Worker Thread**: `ChordWorker` running the detector on a bounded queue
//! - **Main Thread**: receives reports and prints one line per block until
//!   Enter is pressed or stdin closes

mod display;

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossbeam_channel::{Receiver, select};
use cpal::traits::StreamTrait;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chord_core::{ChordDetector, Instrument, PianoRange, Settings, audio, worker::ChordWorker};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InstrumentArg {
    Guitar,
    Piano,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RangeArg {
    Full,
    Bass,
    Middle,
    Treble,
}

impl From<RangeArg> for PianoRange {
    fn from(range: RangeArg) -> Self {
        match range {
            RangeArg::Full => PianoRange::Full,
            RangeArg::Bass => PianoRange::Bass,
            RangeArg::Middle => PianoRange::Middle,
            RangeArg::Treble => PianoRange::Treble,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "chord-live")]
#[command(about = "Listen to the default input device and name the chords being played")]
struct Args {
    /// Settings file to load (JSON)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Instrument preset, overrides the settings file
    #[arg(short, long, value_enum)]
    instrument: Option<InstrumentArg>,

    /// Piano register, used with `--instrument piano`
    #[arg(short, long, value_enum, default_value = "full")]
    range: RangeArg,

    /// Write the effective settings to this file and continue
    #[arg(long)]
    save_settings: Option<PathBuf>,
}

/// Merges command line overrides into the loaded settings.
fn resolve_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };

    match args.instrument {
        Some(InstrumentArg::Guitar) => settings.instrument = Instrument::Guitar,
        Some(InstrumentArg::Piano) => {
            settings.instrument = Instrument::Piano {
                range: args.range.into(),
            }
        }
        None => {}
    }

    settings.validate()?;
    Ok(settings)
}

/// Signals on the returned channel once a line is read from `input` or
/// `input` closes.
fn spawn_quit_listener<R: Read + Send + 'static>(input: R) -> Result<Receiver<()>> {
    let (quit_tx, quit_rx) = crossbeam_channel::bounded(1);
    thread::Builder::new()
        .name("quit-listener".into())
        .spawn(move || {
            let mut line = String::new();
            let _ = BufReader::new(input).read_line(&mut line);
            let _ = quit_tx.send(());
        })
        .context("spawning stdin listener")?;
    Ok(quit_rx)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = resolve_settings(&args)?;

    if let Some(path) = &args.save_settings {
        settings
            .save(path)
            .with_context(|| format!("saving settings to {}", path.display()))?;
    }

    let window = settings.frequency_window();
    info!(
        "Listening as {:?}: {:.1}-{:.1} Hz, transform size {}",
        settings.instrument,
        window.min(),
        window.max(),
        settings.transform_size
    );

    // The worker is built for the rate the device actually runs at.
    let input = audio::open_default_input(settings.sample_rate).context("opening audio input")?;
    let detector = ChordDetector::from_settings(&settings)?;
    let worker = ChordWorker::spawn(detector, input.sample_rate(), settings.queue_depth)?;
    let stream = audio::start_audio_capture(input, worker.block_sender(), settings.transform_size)
        .context("starting audio capture")?;

    info!("Press Enter to stop");
    let quit_rx = spawn_quit_listener(std::io::stdin())?;
    loop {
        select! {
            recv(worker.reports()) -> msg => match msg {
                Ok(report) => {
                    if let Some(line) =
                        display::format_report(&report, settings.min_display_confidence)
                    {
                        println!("{}", line);
                    }
                }
                Err(_) => {
                    error!("Analysis worker stopped");
                    break;
                }
            },
            recv(quit_rx) -> _ => break,
        }
    }

    if let Err(e) = stream.pause() {
        error!("Error pausing stream: {}", e);
    }
    drop(stream);
    worker.shutdown()?;
    info!("Stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    #[test]
    fn test_quit_on_enter() {
        let quit_rx = spawn_quit_listener(Cursor::new(b"\n".to_vec())).unwrap();
        assert!(quit_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_quit_when_input_closes() {
        let quit_rx = spawn_quit_listener(std::io::empty()).unwrap();
        assert!(quit_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
}
