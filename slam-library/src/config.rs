//! Simple configuration persistence for Slammer
//!
//! Stores analysis options and library preferences.

use slam_analysis::AnalysisOptions;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::cache::DEFAULT_TTL;

/// Artist used when a file carries no artist tag
pub const DEFAULT_ARTIST: &str = "Unknown Artist";

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Options passed to every analysis
    pub analysis: AnalysisOptions,
    /// Lifetime of cached analysis results
    pub cache_ttl: Duration,
    /// Artist written into records built without one
    pub default_artist: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analysis: AnalysisOptions::default(),
            cache_ttl: DEFAULT_TTL,
            default_artist: DEFAULT_ARTIST.to_string(),
        }
    }
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if file doesn't exist or can't be parsed.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Save config to the default location
    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.serialize())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slammer")
            .join("config.txt")
    }

    /// Parse config from simple key=value format
    ///
    /// Unknown keys are ignored. Values that don't parse, or that would make
    /// the analysis options invalid, keep their defaults.
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "min_bpm" => set_parsed(key, value, &mut config.analysis.min_bpm),
                "max_bpm" => set_parsed(key, value, &mut config.analysis.max_bpm),
                "skip_key_detection" => {
                    set_parsed(key, value, &mut config.analysis.skip_key_detection)
                }
                "confidence_threshold" => {
                    set_parsed(key, value, &mut config.analysis.confidence_threshold)
                }
                "cache_ttl_secs" => {
                    let mut secs = config.cache_ttl.as_secs();
                    set_parsed(key, value, &mut secs);
                    config.cache_ttl = Duration::from_secs(secs);
                }
                "default_artist" => {
                    if !value.is_empty() {
                        config.default_artist = value.to_string();
                    }
                }
                _ => {} // Ignore unknown keys
            }
        }

        if let Err(problem) = config.analysis.validate() {
            warn!(%problem, "invalid analysis options in config, using defaults");
            config.analysis = AnalysisOptions::default();
        }

        config
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let lines = [
            "# Slammer Configuration".to_string(),
            format!("min_bpm={}", self.analysis.min_bpm),
            format!("max_bpm={}", self.analysis.max_bpm),
            format!("skip_key_detection={}", self.analysis.skip_key_detection),
            format!("confidence_threshold={}", self.analysis.confidence_threshold),
            format!("cache_ttl_secs={}", self.cache_ttl.as_secs()),
            format!("default_artist={}", self.default_artist),
        ];
        lines.join("\n")
    }
}

fn set_parsed<T: FromStr>(key: &str, value: &str, slot: &mut T) {
    match value.parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(key, value, "ignoring unparseable config value"),
    }
}
