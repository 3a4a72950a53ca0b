//! trackmix - Mix audio clips placed on a timeline into one WAV file.
//!
//! # Usage
//!
//! ```bash
//! trackmix intro.wav voice.wav@2.5 -o episode.wav
//! trackmix --session episode.json --play
//! trackmix bed.wav music.wav@10 --save-session episode.json --base64
//! ```
//!
//! Each clip argument is a WAV file, optionally followed by `@SECONDS` to set
//! where it starts. Clips must all be recorded at 44.1 kHz.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use trackmix::audio::play_blocking;
use trackmix::timeline::{parse_clip_arg, Session};

/// Default path for the exported mix.
const DEFAULT_OUTPUT: &str = "mix.wav";

/// Command-line options for the application.
#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    /// Clips to add, with their start offsets.
    clips: Vec<(PathBuf, f64)>,
    /// Manifest to load before adding clips.
    session: Option<PathBuf>,
    /// Where to save the manifest after loading.
    save_session: Option<PathBuf>,
    /// Where to write the mixed WAV.
    output: Option<PathBuf>,
    /// Preview the mix on the default output device.
    play: bool,
    /// Print the encoded WAV as base64 to stdout.
    base64: bool,
    /// Print help and exit.
    help: bool,
}

impl CliOptions {
    /// Parses command-line arguments (without the program name).
    ///
    /// Supports:
    /// - `FILE[@SECONDS]`: add a clip starting at SECONDS (default 0)
    /// - `--session <path>` or `-s <path>`: load a session manifest
    /// - `--save-session <path>`: write the session manifest
    /// - `--output <path>` or `-o <path>`: write the mix (default `mix.wav`)
    /// - `--play` or `-p`: play the mix
    /// - `--base64`: print the WAV as base64
    /// - `--help` or `-h`: print help and exit
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut opts = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--session" | "-s" => {
                    opts.session = Some(PathBuf::from(required_value(&mut args, &arg)?));
                }
                "--save-session" => {
                    opts.save_session = Some(PathBuf::from(required_value(&mut args, &arg)?));
                }
                "--output" | "-o" => {
                    opts.output = Some(PathBuf::from(required_value(&mut args, &arg)?));
                }
                "--play" | "-p" => opts.play = true,
                "--base64" => opts.base64 = true,
                "--help" | "-h" => opts.help = true,
                other if other.starts_with('-') => {
                    bail!("Unknown option: {}\nUse --help for usage information", other);
                }
                other => {
                    let (path, start) = parse_clip_arg(other);
                    opts.clips.push((PathBuf::from(path), start));
                }
            }
        }

        Ok(opts)
    }

    /// Output path, falling back to the default when nothing else was requested.
    fn output_path(&self) -> Option<PathBuf> {
        match &self.output {
            Some(path) => Some(path.clone()),
            None if !self.play && !self.base64 && self.save_session.is_none() => {
                Some(PathBuf::from(DEFAULT_OUTPUT))
            }
            None => None,
        }
    }
}

fn required_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .with_context(|| format!("{} requires a path argument", flag))
}

fn print_help() {
    eprintln!("trackmix - Mix audio clips on a timeline into a WAV file");
    eprintln!();
    eprintln!("Usage: trackmix [OPTIONS] [FILE[@SECONDS]...]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --session PATH     Load a session manifest (.json or binary)");
    eprintln!("      --save-session PATH Save the session manifest");
    eprintln!("  -o, --output PATH      Write the mix to PATH (default: {})", DEFAULT_OUTPUT);
    eprintln!("  -p, --play             Play the mix on the default output device");
    eprintln!("      --base64           Print the encoded WAV as base64 to stdout");
    eprintln!("  -h, --help             Print this help message");
    eprintln!();
    eprintln!("Set RUST_LOG=trackmix=debug for detailed logging.");
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse(std::env::args().skip(1))?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if cli.help {
        print_help();
        return Ok(());
    }

    let mut session = match &cli.session {
        Some(path) => Session::load_from_file(path)
            .with_context(|| format!("Failed to load session: {}", path.display()))?,
        None => Session::default(),
    };

    for (path, start) in &cli.clips {
        session
            .add_clip_from_file(path, *start)
            .with_context(|| format!("Failed to add clip: {}", path.display()))?;
    }

    if session.track_count() == 0 {
        tracing::warn!("No clips given; the mix will be one second of silence");
    }

    if let Some(path) = &cli.save_session {
        session.save_to_file(path)?;
    }

    if let Some(path) = cli.output_path() {
        session.export_to_file(&path).context("Export failed")?;
        eprintln!(
            "Exported {:.2}s from {} clip(s) to {}",
            session.total_duration(),
            session.track_count(),
            path.display()
        );
    }

    if cli.base64 {
        println!("{}", session.export_wav().to_base64());
    }

    if cli.play {
        play_blocking(session.mixed()).context("Playback failed")?;
    }

    Ok(())
}
