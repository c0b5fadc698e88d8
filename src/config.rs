use anyhow::{Context as AnyhowContext, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::constants;
use crate::error::ConfigError;

/// On-disk configuration. Every field is optional so a local file only needs
/// the keys it overrides.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringSection,
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub run: RunSection,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ScoringSection {
    pub model_name: Option<String>,
    pub max_reviews_per_listing: Option<usize>,
    pub max_chars_per_review: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Extra attempts after a retryable failure (0 disables retries)
    pub max_retries: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PathsSection {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub failure_log: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct RunSection {
    /// Append results every N listings instead of once per chunk
    pub flush_every: Option<usize>,
}

impl Config {
    /// Field-wise merge: values set in `self` win over `base`.
    pub fn merged_over(&self, base: &Config) -> Config {
        Config {
            scoring: ScoringSection {
                model_name: self.scoring.model_name.clone().or(base.scoring.model_name.clone()),
                max_reviews_per_listing: self
                    .scoring
                    .max_reviews_per_listing
                    .or(base.scoring.max_reviews_per_listing),
                max_chars_per_review: self
                    .scoring
                    .max_chars_per_review
                    .or(base.scoring.max_chars_per_review),
            },
            api: ApiSection {
                base_url: self.api.base_url.clone().or(base.api.base_url.clone()),
                timeout_secs: self.api.timeout_secs.or(base.api.timeout_secs),
                max_retries: self.api.max_retries.or(base.api.max_retries),
                retry_backoff_ms: self.api.retry_backoff_ms.or(base.api.retry_backoff_ms),
            },
            paths: PathsSection {
                input: self.paths.input.clone().or(base.paths.input.clone()),
                output: self.paths.output.clone().or(base.paths.output.clone()),
                failure_log: self.paths.failure_log.clone().or(base.paths.failure_log.clone()),
            },
            run: RunSection {
                flush_every: self.run.flush_every.or(base.run.flush_every),
            },
        }
    }
}

/// What the prompt and sampling steps need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringConfig {
    pub model_name: String,
    pub max_reviews_per_listing: usize,
    pub max_chars_per_review: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model_name: constants::DEFAULT_MODEL_NAME.to_string(),
            max_reviews_per_listing: constants::DEFAULT_MAX_REVIEWS_PER_LISTING,
            max_chars_per_review: constants::DEFAULT_MAX_CHARS_PER_REVIEW,
        }
    }
}

/// Connection and retry settings for the rating endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

/// Values read from the process environment (after `.env` is loaded).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model_name: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            api_key: non_empty_var(constants::API_KEY_ENV),
            base_url: non_empty_var(constants::BASE_URL_ENV),
            model_name: non_empty_var(constants::MODEL_NAME_ENV),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub struct ConfigManager {
    merged_config: Config,
    pub global_config_path: Option<PathBuf>,
    pub local_config_path: Option<PathBuf>,
}

const DEFAULT_CONFIG: &str = r#"# reviewscore configuration file
# Environment variables (OPENAI_API_KEY, OPENAI_BASE_URL, OPENAI_MODEL_NAME)
# override these values; command-line flags override everything.

# [scoring]
# model_name = "gpt-4o-mini"
# max_reviews_per_listing = 4
# max_chars_per_review = 800

# [api]
# base_url = "https://api.openai.com/v1"
# timeout_secs = 120
# max_retries = 2
# retry_backoff_ms = 750

# [paths]
# input = "data/raw/reviews.csv"
# output = "data/processed/review_ratings_by_listing.csv"
# failure_log = "data/processed/review_ratings_failures.csv"

# [run]
# flush_every = 0
"#;

impl ConfigManager {
    /// Load the global config (created on first use) and the local one.
    ///
    /// The local file is `explicit_local` when given (it must exist), otherwise
    /// `.reviewscore/config.toml` under the working directory if present.
    pub fn new(explicit_local: Option<&Path>) -> Result<Self> {
        let (global_config, global_config_path) = match dirs::config_dir() {
            Some(config_dir) => {
                let global_config_dir = config_dir.join(constants::GLOBAL_CONFIG_DIR_NAME);
                fs::create_dir_all(&global_config_dir).with_context(|| {
                    format!("Failed to create {}", global_config_dir.display())
                })?;
                let path = global_config_dir.join(constants::CONFIG_FILENAME);

                let config = if path.exists() {
                    read_config(&path)?
                } else {
                    fs::write(&path, DEFAULT_CONFIG)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    Config::default()
                };
                (config, Some(path))
            }
            None => {
                debug!("No user config directory, skipping global config");
                (Config::default(), None)
            }
        };

        let (local_config, local_config_path) = match explicit_local {
            Some(path) => (Some(read_config(path)?), Some(path.to_path_buf())),
            None => {
                let path = Path::new(constants::LOCAL_DIR_NAME).join(constants::CONFIG_FILENAME);
                if path.exists() {
                    (Some(read_config(&path)?), Some(path))
                } else {
                    (None, None)
                }
            }
        };

        let mut manager = Self::from_parts(global_config, local_config);
        manager.global_config_path = global_config_path;
        manager.local_config_path = local_config_path;
        Ok(manager)
    }

    /// Merge already-loaded configs: local overrides global
    pub fn from_parts(global_config: Config, local_config: Option<Config>) -> Self {
        let merged_config = match &local_config {
            Some(local) => local.merged_over(&global_config),
            None => global_config,
        };

        Self {
            merged_config,
            global_config_path: None,
            local_config_path: None,
        }
    }

    /// Get the merged configuration (local overrides global)
    pub fn config(&self) -> &Config {
        &self.merged_config
    }

    /// Model and sampling settings. Precedence: `cli_model`, environment, file, default.
    pub fn scoring_config(&self, env: &EnvOverrides, cli_model: Option<&str>) -> ScoringConfig {
        let scoring = &self.merged_config.scoring;
        let defaults = ScoringConfig::default();

        ScoringConfig {
            model_name: cli_model
                .map(str::to_string)
                .or_else(|| env.model_name.clone())
                .or_else(|| scoring.model_name.clone())
                .unwrap_or(defaults.model_name),
            max_reviews_per_listing: scoring
                .max_reviews_per_listing
                .unwrap_or(defaults.max_reviews_per_listing),
            max_chars_per_review: scoring
                .max_chars_per_review
                .unwrap_or(defaults.max_chars_per_review),
        }
    }

    /// Endpoint settings. Fails when no credential is available.
    pub fn api_config(&self, env: &EnvOverrides) -> Result<ApiConfig, ConfigError> {
        let api_key = env
            .api_key
            .clone()
            .ok_or(ConfigError::MissingCredential(constants::API_KEY_ENV))?;
        let api = &self.merged_config.api;

        Ok(ApiConfig {
            api_key,
            base_url: env
                .base_url
                .clone()
                .or_else(|| api.base_url.clone())
                .unwrap_or_else(|| constants::DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(api.timeout_secs.unwrap_or(constants::DEFAULT_TIMEOUT_SECS)),
            max_retries: api.max_retries.unwrap_or(constants::DEFAULT_MAX_RETRIES),
            retry_backoff: Duration::from_millis(
                api.retry_backoff_ms
                    .unwrap_or(constants::DEFAULT_RETRY_BACKOFF_MS),
            ),
        })
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config file: {}", path.display()))
}
