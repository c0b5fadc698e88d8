use anyhow::Result;
use indicatif::ProgressBar;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::FailureReason;
use crate::grouper::ListingGrouper;
use crate::planner::{ChunkPlan, ChunkSpec};
use crate::ratings::{ScoreOutcome, ScoreRecord};
use crate::reviews::load_reviews;
use crate::score_client::ScoreClient;
use crate::writer::{append_failures, append_records, processed_ids};

/// Everything one chunk run needs to know, already resolved from config and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub failure_log: Option<PathBuf>,
    pub chunk: ChunkSpec,
    pub limit: Option<usize>,
    /// 0 writes once at the end of the chunk
    pub flush_every: usize,
    pub max_reviews_per_listing: usize,
}

/// Loaded reviews plus the listings this run will rate.
pub struct RunPlan {
    pub grouper: ListingGrouper,
    pub chunk_plan: ChunkPlan,
    pub reviews_loaded: usize,
}

/// Load input, group it, and subtract what the output file already holds.
/// Reads only; nothing is written.
pub fn plan_run(options: &RunOptions) -> Result<RunPlan> {
    let reviews = load_reviews(&options.input)?;
    let reviews_loaded = reviews.len();
    info!(
        "Loaded {} reviews from {}",
        reviews_loaded,
        options.input.display()
    );

    let grouper = ListingGrouper::new(reviews, options.max_reviews_per_listing);
    let processed = processed_ids(&options.output)?;
    let chunk_plan = ChunkPlan::build(&grouper.listing_ids(), options.chunk, &processed, options.limit);

    debug!(
        "Chunk {}/{} covers positions {:?} of {} listings",
        options.chunk.index,
        options.chunk.num_chunks,
        chunk_plan.range,
        chunk_plan.total_listings
    );

    Ok(RunPlan {
        grouper,
        chunk_plan,
        reviews_loaded,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub scored: usize,
    pub complete: usize,
    /// Degraded outcomes keyed by `FailureReason::kind`
    pub degraded: BTreeMap<&'static str, usize>,
    pub rows_written: usize,
    pub failures_logged: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &ScoreOutcome) {
        self.scored += 1;
        match outcome.reason() {
            None => self.complete += 1,
            Some(reason) => *self.degraded.entry(reason.kind()).or_insert(0) += 1,
        }
    }

    pub fn degraded_total(&self) -> usize {
        self.degraded.values().sum()
    }
}

/// Rate every pending listing of the plan, one at a time, and append results.
pub async fn execute(
    plan: &RunPlan,
    options: &RunOptions,
    client: &ScoreClient,
    progress: &ProgressBar,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    let mut records: Vec<ScoreRecord> = Vec::new();
    let mut failures: Vec<(i64, FailureReason)> = Vec::new();

    progress.set_length(plan.chunk_plan.pending.len() as u64);

    for &listing_id in &plan.chunk_plan.pending {
        let batch = plan.grouper.batch(listing_id);
        let outcome = client.score(&batch).await;

        match outcome.reason() {
            None => debug!("Listing {} rated from {} reviews", listing_id, batch.len()),
            Some(FailureReason::NoReviews) => debug!("Listing {} has no reviews", listing_id),
            Some(reason) => warn!("Listing {}: {}", listing_id, reason),
        }

        summary.record(&outcome);
        records.push(ScoreRecord::new(listing_id, outcome.ratings(), batch.len()));
        if let Some(reason) = outcome.reason() {
            failures.push((listing_id, reason.clone()));
        }
        progress.inc(1);

        if options.flush_every > 0 && records.len() >= options.flush_every {
            flush(options, &mut records, &mut failures, &mut summary)?;
        }
    }

    flush(options, &mut records, &mut failures, &mut summary)?;
    progress.finish_and_clear();

    Ok(summary)
}

fn flush(
    options: &RunOptions,
    records: &mut Vec<ScoreRecord>,
    failures: &mut Vec<(i64, FailureReason)>,
    summary: &mut RunSummary,
) -> Result<()> {
    summary.rows_written += append_records(&options.output, records)?;
    records.clear();

    if let Some(failure_log) = &options.failure_log {
        summary.failures_logged += append_failures(failure_log, failures)?;
    }
    failures.clear();

    Ok(())
}
