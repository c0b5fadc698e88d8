use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use log::{info, LevelFilter};
use std::path::PathBuf;

use reviewscore::context::{AppContext, CliOverrides};
use reviewscore::pipeline::{execute, plan_run};
use reviewscore::report;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Zero-based index of the chunk to process
    #[arg(long, default_value_t = 0)]
    chunk_index: usize,

    /// Total number of chunks the listing ids are split into
    #[arg(long, default_value_t = 1)]
    num_chunks: usize,

    /// Report what would be processed without calling the model or writing output
    #[arg(long)]
    dry_run: bool,

    /// Input reviews CSV
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output ratings CSV (appended to, and read for resume)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// CSV receiving the reason behind every null rating
    #[arg(long, value_name = "FILE")]
    failure_log: Option<PathBuf>,

    /// Local config file (defaults to .reviewscore/config.toml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Rate at most this many pending listings
    #[arg(long)]
    limit: Option<usize>,

    /// Append results every N listings instead of once per chunk
    #[arg(long, value_name = "N")]
    flush_every: Option<usize>,

    /// Model identifier (overrides OPENAI_MODEL_NAME)
    #[arg(short, long)]
    model: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            chunk_index: self.chunk_index,
            num_chunks: self.num_chunks,
            input: self.input.clone(),
            output: self.output.clone(),
            failure_log: self.failure_log.clone(),
            limit: self.limit,
            flush_every: self.flush_every,
            model: self.model.clone(),
        }
    }
}

fn init_logging(verbose: bool) -> Result<MultiProgress> {
    let default_level = if verbose { "debug" } else { "info" };
    let logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .build();
    let level: LevelFilter = logger.filter();
    let multi = MultiProgress::new();

    LogWrapper::new(multi.clone(), logger)
        .try_init()
        .context("Failed to initialize logger")?;
    log::set_max_level(level);

    Ok(multi)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let multi = init_logging(cli.verbose)?;

    let context = AppContext::new(cli.config.as_deref(), &cli.overrides())?;
    let options = &context.options;

    if cli.dry_run {
        let plan = plan_run(options)?;
        report::print_plan(&plan, options, true)?;
        return Ok(());
    }

    // Missing credential aborts before any input is read
    let client = context.score_client()?;

    let plan = plan_run(options)?;
    report::print_plan(&plan, options, false)?;

    if plan.chunk_plan.is_done() {
        info!("Nothing left to process in this chunk");
        return Ok(());
    }

    let progress = multi.add(ProgressBar::new(plan.chunk_plan.pending.len() as u64));
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} listings ({eta})")
            .context("Invalid progress template")?,
    );

    let summary = execute(&plan, options, &client, &progress).await?;
    multi.remove(&progress);

    report::print_summary(&summary, options)?;
    Ok(())
}
