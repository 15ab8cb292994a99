//! vlrtest - live tester for CT65550 vertical line replication
//!
//! vlrtest sets a graphics mode, draws a scanline pattern that makes
//! replicated lines easy to spot, and lets the operator tune the flat-panel
//! replication registers while the pattern is on screen.
//!
//! # Quick Start
//!
//! ```text
//! vlrtest              # Pick a mode from the menu
//! vlrtest -p 4         # Go straight to 640x480x256
//! vlrtest -c my.toml   # Use another config file
//! ```
//!
//! # Keys while tuning
//!
//! | Key | Action |
//! |-----|--------|
//! | + / Up | FR4D low = high = n + 1 |
//! | - / Down | FR4D low = high = n - 1 |
//! | l / L | Low nibble down / up |
//! | h / H | High nibble down / up |
//! | e | Flip FR48 replication bits |
//! | w | Write any FR register, then dump |
//! | d | Dump FR40..4F |
//! | g | Restore saved registers |
//! | q | Restore, text mode, quit |
//! | x | Text mode, quit, keep registers |

mod config;
mod core;
mod fb;
mod hw;
mod sim;
mod ui;

use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::Config;
use crate::core::{ExitOutcome, Session, SessionSettings};
use crate::sim::SimAdapter;
use crate::ui::{TerminalConsole, TerminalKeys};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command line options
#[derive(Debug, Default)]
struct Args {
    config_path: Option<PathBuf>,
    profile: Option<u8>,
}

fn print_version() {
    eprintln!("vlrtest {}", VERSION);
}

fn print_help() {
    eprintln!("vlrtest {} - CT65550 vertical line replication tester", VERSION);
    eprintln!();
    eprintln!("Usage: vlrtest [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -p, --profile <N>     Skip the menu and use mode N (1-5)");
    eprintln!("  -c, --config <PATH>   Read this config file instead of ~/.vlrtest/config.toml");
    eprintln!("  -V, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Modes:");
    eprintln!("  1  320x200x256  (VGA  0x13)");
    eprintln!("  2  640x350x16   (EGA  0x10)");
    eprintln!("  3  640x400x256  (VESA 0x100)");
    eprintln!("  4  640x480x256  (VESA 0x101)");
    eprintln!("  5  800x600x256  (VESA 0x103)");
    eprintln!();
    eprintln!("Log file: ~/.vlrtest/vlrtest.log (level from config or RUST_LOG)");
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                process::exit(0);
            }
            "-V" | "--version" => {
                print_version();
                process::exit(0);
            }
            "-c" | "--config" => {
                i += 1;
                let path = args.get(i).ok_or("Missing config path")?;
                parsed.config_path = Some(PathBuf::from(path));
            }
            "-p" | "--profile" => {
                i += 1;
                let value = args.get(i).ok_or("Missing profile number")?;
                let n = value
                    .parse::<u8>()
                    .ok()
                    .filter(|n| (1..=5).contains(n))
                    .ok_or_else(|| format!("Invalid profile: {}. Expected 1-5.", value))?;
                parsed.profile = Some(n);
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(parsed)
}

fn init_logging(config: &Config) {
    let log_path = config::data_dir()
        .map(|dir| dir.join("vlrtest.log"))
        .unwrap_or_else(|| PathBuf::from("vlrtest.log"));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.log_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            process::exit(1);
        }
    };

    let mut config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    if args.profile.is_some() {
        config.profile = args.profile;
    }

    init_logging(&config);
    info!("vlrtest {} starting", VERSION);

    let hw = SimAdapter::new(&config.sim);
    let console = TerminalConsole::new().context("Failed to set up the terminal")?;
    let mut session = Session::new(hw, TerminalKeys::new(), console, SessionSettings::from(&config));

    let result = session.run();
    // Leave raw mode before anything else reaches the terminal
    drop(session);

    match result {
        Ok(ExitOutcome::Restored) => info!("Exited with registers restored"),
        Ok(ExitOutcome::LeftTuned) => info!("Exited with tuned registers left in place"),
        Err(e) if e.is_setup_failure() => {
            error!("Setup failed: {}", e);
            process::exit(1);
        }
        Err(e) => {
            error!("Session failed: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
