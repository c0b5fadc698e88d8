use anyhow::{Context as AnyhowContext, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::config::{ConfigManager, EnvOverrides, ScoringConfig};
use crate::constants::constants;
use crate::llm::OpenAiBackend;
use crate::pipeline::RunOptions;
use crate::planner::ChunkSpec;
use crate::score_client::{RetryPolicy, ScoreClient};

/// Values given on the command line; `None` defers to config and defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub chunk_index: usize,
    pub num_chunks: usize,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub failure_log: Option<PathBuf>,
    pub limit: Option<usize>,
    pub flush_every: Option<usize>,
    pub model: Option<String>,
}

pub struct AppContext {
    pub config_manager: ConfigManager,
    pub env: EnvOverrides,
    pub scoring: ScoringConfig,
    pub options: RunOptions,
}

impl AppContext {
    /// Load `.env`, the config files and the environment, then apply `cli`.
    pub fn new(config_path: Option<&Path>, cli: &CliOverrides) -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => debug!("No .env file found"),
            Err(e) => return Err(e).context("Failed to load .env file"),
        }

        let config_manager = ConfigManager::new(config_path)?;
        if let Some(path) = &config_manager.global_config_path {
            debug!("Global config: {}", path.display());
        }
        if let Some(path) = &config_manager.local_config_path {
            debug!("Local config: {}", path.display());
        }

        Self::from_parts(config_manager, EnvOverrides::from_env(), cli)
    }

    pub fn from_parts(config_manager: ConfigManager, env: EnvOverrides, cli: &CliOverrides) -> Result<Self> {
        let chunk = ChunkSpec::new(cli.chunk_index, cli.num_chunks)?;
        let scoring = config_manager.scoring_config(&env, cli.model.as_deref());
        let config = config_manager.config();

        let options = RunOptions {
            input: cli
                .input
                .clone()
                .or_else(|| config.paths.input.clone())
                .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_INPUT_PATH)),
            output: cli
                .output
                .clone()
                .or_else(|| config.paths.output.clone())
                .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_OUTPUT_PATH)),
            failure_log: cli
                .failure_log
                .clone()
                .or_else(|| config.paths.failure_log.clone()),
            chunk,
            limit: cli.limit,
            flush_every: cli.flush_every.or(config.run.flush_every).unwrap_or(0),
            max_reviews_per_listing: scoring.max_reviews_per_listing,
        };

        Ok(Self {
            config_manager,
            env,
            scoring,
            options,
        })
    }

    /// Build the rating client. Fails when the API credential is missing.
    pub fn score_client(&self) -> Result<ScoreClient> {
        let api = self.config_manager.api_config(&self.env)?;
        let backend = OpenAiBackend::new(&api).context("Failed to build HTTP client")?;
        debug!(
            "Rating with model {} at {}",
            self.scoring.model_name,
            backend.base_url()
        );

        Ok(ScoreClient::new(
            Box::new(backend),
            self.scoring.clone(),
            RetryPolicy::from(&api),
        ))
    }
}
