//! Application-level configuration loading, including the scoring tunables.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::similarity;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "HOTSEAT_BACK_CONFIG_PATH";
/// Default location of the question pool file.
const DEFAULT_QUESTIONS_PATH: &str = "config/questions.json";
/// Spice weight assigned to games that do not override it.
const DEFAULT_HOTNESS: f64 = 2.0;
/// Default per-subscriber event buffer size.
const DEFAULT_SUBSCRIBER_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    similarity_exponent: f64,
    default_hotness: f64,
    subscriber_capacity: usize,
    questions_path: PathBuf,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// baked-in defaults when the file is missing or unreadable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Exponent of the similarity falloff used for scoring.
    pub fn similarity_exponent(&self) -> f64 {
        self.similarity_exponent
    }

    /// Spice weight given to freshly created games.
    pub fn default_hotness(&self) -> f64 {
        self.default_hotness
    }

    /// Per-subscriber buffer size of the broadcast registry.
    pub fn subscriber_capacity(&self) -> usize {
        self.subscriber_capacity
    }

    /// Location of the JSON question pool file.
    pub fn questions_path(&self) -> &PathBuf {
        &self.questions_path
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            similarity_exponent: similarity::DEFAULT_EXPONENT,
            default_hotness: DEFAULT_HOTNESS,
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            questions_path: PathBuf::from(DEFAULT_QUESTIONS_PATH),
        }
    }
}

fn resolve_config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// On-disk configuration shape. Every field is optional; absent fields are
/// filled from the defaults before the config is handed out, so a partial
/// file never produces a partially-initialized configuration.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    similarity_exponent: Option<f64>,
    #[serde(default)]
    default_hotness: Option<f64>,
    #[serde(default)]
    subscriber_capacity: Option<usize>,
    #[serde(default)]
    questions_path: Option<PathBuf>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            similarity_exponent: raw
                .similarity_exponent
                .unwrap_or(defaults.similarity_exponent),
            default_hotness: raw.default_hotness.unwrap_or(defaults.default_hotness),
            subscriber_capacity: raw
                .subscriber_capacity
                .unwrap_or(defaults.subscriber_capacity),
            questions_path: raw.questions_path.unwrap_or(defaults.questions_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_is_merged_with_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{"similarity_exponent": 2.0}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.similarity_exponent(), 2.0);
        assert_eq!(config.default_hotness(), DEFAULT_HOTNESS);
        assert_eq!(config.subscriber_capacity(), DEFAULT_SUBSCRIBER_CAPACITY);
    }

    #[test]
    fn empty_object_equals_defaults() {
        let raw: RawConfig = serde_json::from_str("{}").unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(
            config.similarity_exponent(),
            similarity::DEFAULT_EXPONENT
        );
        assert_eq!(
            config.questions_path(),
            &PathBuf::from(DEFAULT_QUESTIONS_PATH)
        );
    }
}
