//! Application configuration
//!
//! A JSON file supplies defaults; command-line flags and environment
//! variables override it.

use crate::audio::AudioConfig;
use crate::socket::EngineVersion;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "vocalink.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the web server (phrase files, form endpoint)
    pub server_url: String,
    /// Base URL of the Socket.IO transcription server
    pub socket_url: String,
    /// Engine.IO protocol revision of that server (3 or 4)
    pub engine_io: u8,
    pub frame_size: usize,
    pub sample_rate: u32,
    /// External program used to play audio URLs
    pub player: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            socket_url: "http://127.0.0.1:5000".to_string(),
            engine_io: 4,
            frame_size: 4096,
            sample_rate: 16000,
            player: None,
        }
    }
}

impl AppConfig {
    /// Load config from disk, or return defaults
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => {
                        tracing::info!("Config loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => tracing::warn!("Invalid config, using defaults: {}", e),
                },
                Err(e) => tracing::warn!("Cannot read config: {}", e),
            }
        }
        Self::default()
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(url) = &cli.server_url {
            self.server_url = url.clone();
        }
        if let Some(url) = &cli.socket_url {
            self.socket_url = url.clone();
        }
        if let Some(version) = cli.engine_io {
            self.engine_io = version;
        }
        if let Some(size) = cli.frame_size {
            self.frame_size = size;
        }
        if let Some(rate) = cli.sample_rate {
            self.sample_rate = rate;
        }
        if cli.player.is_some() {
            self.player = cli.player.clone();
        }
        self
    }

    /// Reject values that would leave capture running without output
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.frame_size == 0 {
            return Err(ConfigError::Invalid("frame_size must be at least 1".into()));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be at least 1".into()));
        }
        if EngineVersion::from_number(self.engine_io).is_none() {
            return Err(ConfigError::Invalid(format!(
                "engine_io must be 3 or 4, got {}",
                self.engine_io
            )));
        }
        Ok(self)
    }

    pub fn engine_version(&self) -> EngineVersion {
        EngineVersion::from_number(self.engine_io).unwrap_or_default()
    }

    pub fn audio(&self) -> AudioConfig {
        AudioConfig {
            frame_size: self.frame_size,
            target_sample_rate: self.sample_rate,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Parser)]
#[command(name = "vocalink", version, about = "Live transcription client and phrase player")]
pub struct Cli {
    /// Config file
    #[arg(long, env = "VOCALINK_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[arg(long, env = "VOCALINK_SERVER_URL")]
    pub server_url: Option<String>,

    /// Socket.IO server base URL
    #[arg(long, env = "VOCALINK_SOCKET_URL")]
    pub socket_url: Option<String>,

    /// Engine.IO revision of the socket server
    #[arg(long, value_parser = clap::value_parser!(u8).range(3..=4))]
    pub engine_io: Option<u8>,

    /// Samples per streamed frame
    #[arg(long, value_parser = parse_frame_size)]
    pub frame_size: Option<usize>,

    /// Sample rate of streamed frames
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub sample_rate: Option<u32>,

    /// Program used for audio playback (e.g. mpv)
    #[arg(long, env = "VOCALINK_PLAYER")]
    pub player: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List audio input devices
    Devices,
    /// Stream the microphone and print transcripts (stdin: start, stop, status, quit)
    Live,
    /// Show a sentence in a language and play its audio
    Phrase {
        #[arg(long)]
        sentence: Option<String>,
        #[arg(long)]
        language: Option<String>,
    },
    /// List known sentences and languages
    Catalog,
    /// Submit the audio form (repeat -f key=value)
    Submit {
        #[arg(short = 'f', long = "field", value_parser = crate::flows::parse_field)]
        fields: Vec<(String, String)>,
    },
}

fn parse_frame_size(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("frame size must be at least 1".to_string()),
        Ok(size) => Ok(size),
        Err(e) => Err(e.to_string()),
    }
}
