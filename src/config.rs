//! Configuration
//!
//! JSON file with serde defaults, then environment overrides:
//!
//! | Variable                     | Field              |
//! |------------------------------|--------------------|
//! | `DEEPWORK_USER_ID`           | `user_id`          |
//! | `DEEPWORK_STORE_URL`         | `store.url`        |
//! | `DEEPWORK_STORE_KEY`         | `store.api_key`    |
//! | `DEEPWORK_STORE_TIMEOUT_MS`  | `store.timeout_ms` |

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FocusError, Result};

pub const ENV_USER_ID: &str = "DEEPWORK_USER_ID";
pub const ENV_STORE_URL: &str = "DEEPWORK_STORE_URL";
pub const ENV_STORE_KEY: &str = "DEEPWORK_STORE_KEY";
pub const ENV_STORE_TIMEOUT_MS: &str = "DEEPWORK_STORE_TIMEOUT_MS";

/// Accepted `audio.sample_rate` range in Hz
pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const MAX_SAMPLE_RATE: u32 = 192_000;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Owner recorded on persisted sessions
    pub user_id: Option<String>,
    /// Remote session store; local-only when absent
    pub store: Option<StoreConfig>,
    pub audio: AudioConfig,
}

/// Remote session store connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl StoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Soundscape output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Volume ramp length in milliseconds
    pub ramp_ms: u64,
    /// Initial volume in [0, 1]
    pub volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            ramp_ms: 100,
            volume: 0.5,
        }
    }
}

impl AudioConfig {
    pub fn ramp(&self) -> Duration {
        Duration::from_millis(self.ramp_ms)
    }

    /// Reject settings the synthesizer cannot run with
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(format!(
                "audio.sample_rate {} outside {}..={} Hz",
                self.sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
            ));
        }
        if !self.volume.is_finite() {
            return Err(format!("audio.volume {} is not a number", self.volume));
        }
        Ok(())
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Config {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text).map_err(|e| FocusError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.audio.validate().map_err(|reason| FocusError::Config {
            path: path.to_path_buf(),
            reason,
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from an optional file, then apply process environment overrides
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        Ok(config.apply_env())
    }

    /// Defaults plus process environment overrides
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| env::var(key).ok())
    }

    /// Apply overrides read through `lookup`
    pub fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(user_id) = lookup(ENV_USER_ID) {
            self.user_id = Some(user_id);
        }

        if let Some(url) = lookup(ENV_STORE_URL) {
            match self.store.as_mut() {
                Some(store) => store.url = url,
                None => self.store = Some(StoreConfig::new(url)),
            }
        }

        if let Some(store) = self.store.as_mut() {
            if let Some(key) = lookup(ENV_STORE_KEY) {
                store.api_key = Some(key);
            }
            if let Some(raw) = lookup(ENV_STORE_TIMEOUT_MS) {
                match raw.trim().parse::<u64>() {
                    Ok(ms) => store.timeout_ms = ms,
                    Err(_) => warn!("Ignoring {}={:?}: not a number", ENV_STORE_TIMEOUT_MS, raw),
                }
            }
        }

        self
    }
}
