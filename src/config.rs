use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::detector::{DEFAULT_DEBOUNCE_MS, DEFAULT_THRESHOLD};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub threshold: f64,
    pub debounce_ms: i64,
    pub socket_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            socket_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Missing or unparsable values fall back to
    /// the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            threshold: lookup("SHAKEDIT_THRESHOLD")
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.threshold),
            debounce_ms: lookup("SHAKEDIT_DEBOUNCE_MS")
                .and_then(|d| d.parse().ok())
                .unwrap_or(defaults.debounce_ms),
            socket_path: lookup("SHAKEDIT_SOCKET")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(ConfigError::Threshold(self.threshold));
        }
        if self.debounce_ms < 0 {
            return Err(ConfigError::Debounce(self.debounce_ms));
        }
        Ok(())
    }
}
