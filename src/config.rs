//! Configuration for vlrtest.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.vlrtest/config.toml`
//! - The constants programmed by the apply sequence
//! - Parameters of the simulated adapter
//!
//! # Configuration File
//!
//! Every key is optional. Integers may be written in hex:
//!
//! ```toml
//! log_level = "debug"
//!
//! # Skip the mode menu (1-5)
//! profile = 4
//!
//! [apply]
//! enable_all = 0x3F          # FR4E
//! stretch_a = 0x07           # FR41
//! stretch_b = 0x17           # FR48 before any toggle
//! compensation_latch = 0x3F  # FR40, written last
//! initial_low = 0
//! initial_high = 0
//!
//! [dump]
//! first = 0x40
//! last = 0x4F
//!
//! [sim]
//! vram_kb = 1024
//! win_granularity_kb = 64
//! win_size_kb = 64
//! frame_polls = 64
//! blank_polls = 8
//! fr = [[0x01, 0x01], [0x48, 0x13]]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level for the log file (overridden by RUST_LOG)
    pub log_level: String,
    /// Preselected profile number (1-5)
    pub profile: Option<u8>,
    /// Apply sequence constants
    pub apply: ApplyConfig,
    /// Register dump range
    pub dump: DumpConfig,
    /// Simulated adapter
    pub sim: SimConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            profile: None,
            apply: ApplyConfig::default(),
            dump: DumpConfig::default(),
            sim: SimConfig::default(),
        }
    }
}

/// Values written by the apply sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyConfig {
    pub enable_all: u8,
    pub stretch_a: u8,
    pub stretch_b: u8,
    pub compensation_latch: u8,
    pub initial_low: u8,
    pub initial_high: u8,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            enable_all: 0x3F,
            stretch_a: 0x07,
            stretch_b: 0x17,
            compensation_latch: 0x3F,
            initial_low: 0,
            initial_high: 0,
        }
    }
}

/// Contiguous register range shown by the dump command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    pub first: u8,
    pub last: u8,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            first: 0x40,
            last: 0x4F,
        }
    }
}

/// Simulated adapter parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub vram_kb: usize,
    pub win_granularity_kb: usize,
    pub win_size_kb: usize,
    /// Status reads per simulated frame
    pub frame_polls: u32,
    /// Status reads per frame that report vertical retrace
    pub blank_polls: u32,
    /// Power-on flat-panel register values as [index, value] pairs
    pub fr: Vec<[u8; 2]>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            vram_kb: 1024,
            win_granularity_kb: 64,
            win_size_kb: 64,
            frame_polls: 64,
            blank_polls: 8,
            fr: vec![
                [0x01, 0x01],
                [0x40, 0x2D],
                [0x41, 0x00],
                [0x48, 0x13],
                [0x4D, 0x00],
                [0x4E, 0x00],
            ],
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if path.exists() {
                if let Ok(config) = Self::load_from(&path) {
                    return config;
                }
            }
        }
        Self::default()
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        data_dir().map(|dir| dir.join("config.toml"))
    }

    /// Preselected profile as a menu key
    pub fn profile_key(&self) -> Option<u8> {
        self.profile.map(|n| b'0'.wrapping_add(n))
    }
}

/// `~/.vlrtest`, created on first use
pub fn data_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(".vlrtest");
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
