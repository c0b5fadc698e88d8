use async_trait::async_trait;
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reviewscore::config::ScoringConfig;
use reviewscore::llm::{BackendError, ChatRequest, CompletionBackend};
use reviewscore::pipeline::{execute, plan_run, RunOptions};
use reviewscore::planner::ChunkSpec;
use reviewscore::ratings::ScoreRecord;
use reviewscore::score_client::{RetryPolicy, ScoreClient};
use tempfile::tempdir;

const REVIEWS: &str = "\
listing_id,id,date,reviewer_id,reviewer_name,comments
1,11,2023-01-05,100,Ana,Spotless<br/>and bright
1,12,2023-02-05,101,Bo,Host answered fast
2,21,2023-03-01,102,Cy,Noisy street but fair price
3,31,2022-12-24,103,Di,Felt safe walking home
4,41,2023-01-01,104,Ed,
5,51,,105,Fa,Great location
5,52,2023-06-01,106,Gu,Would stay again
";

const RATINGS: &str = r#"{"overall_rating": 4.5, "cleanliness_rating": 5, "communication_rating": 4,
    "location_rating": 4, "value_rating": 3.5, "safety_rating": 5}"#;

/// Replies with fixed ratings, except garbage for listing 2.
struct FakeBackend {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CompletionBackend for FakeBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = &request.messages[1].content;
        if prompt.starts_with("Listing ID: 2\n") {
            Ok("I'd rate it about four stars".to_string())
        } else {
            Ok(RATINGS.to_string())
        }
    }
}

fn client() -> (ScoreClient, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = FakeBackend {
        calls: Arc::clone(&calls),
    };
    (
        ScoreClient::new(Box::new(backend), ScoringConfig::default(), RetryPolicy::none()),
        calls,
    )
}

fn options(dir: &Path, chunk: ChunkSpec) -> RunOptions {
    let input = dir.join("reviews.csv");
    if !input.exists() {
        fs::write(&input, REVIEWS).unwrap();
    }
    RunOptions {
        input,
        output: dir.join("out").join("ratings.csv"),
        failure_log: None,
        chunk,
        limit: None,
        flush_every: 0,
        max_reviews_per_listing: 4,
    }
}

fn read_records(path: &Path) -> Vec<ScoreRecord> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.deserialize().map(|row| row.unwrap()).collect()
}

async fn run_once(options: &RunOptions, client: &ScoreClient) -> usize {
    let plan = plan_run(options).unwrap();
    let summary = execute(&plan, options, client, &ProgressBar::hidden())
        .await
        .unwrap();
    summary.rows_written
}

#[tokio::test]
async fn test_full_run_then_rerun_writes_nothing() {
    let temp = tempdir().unwrap();
    let options = options(temp.path(), ChunkSpec::new(0, 1).unwrap());
    let (client, calls) = client();

    assert_eq!(run_once(&options, &client).await, 5);
    // listing 4 has no text, so no call for it
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let records = read_records(&options.output);
    let ids: Vec<i64> = records.iter().map(|r| r.listing_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    let empty = &records[3];
    assert_eq!(empty.n_reviews_used, 0);
    assert!(empty.overall_rating.is_none() && empty.safety_rating.is_none());

    let garbled = &records[1];
    assert_eq!(garbled.n_reviews_used, 1);
    assert!(garbled.overall_rating.is_none() && garbled.value_rating.is_none());

    assert_eq!(records[0].overall_rating, Some(4.5));
    assert_eq!(records[0].n_reviews_used, 2);

    let before = fs::read_to_string(&options.output).unwrap();
    assert_eq!(run_once(&options, &client).await, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(fs::read_to_string(&options.output).unwrap(), before);
}

#[tokio::test]
async fn test_interrupted_chunk_resumes_remainder() {
    let temp = tempdir().unwrap();
    let mut options = options(temp.path(), ChunkSpec::new(0, 1).unwrap());
    let (client, _) = client();

    options.limit = Some(2);
    assert_eq!(run_once(&options, &client).await, 2);

    options.limit = None;
    assert_eq!(run_once(&options, &client).await, 3);

    let ids: Vec<i64> = read_records(&options.output)
        .iter()
        .map(|r| r.listing_id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_chunks_share_output_without_overlap() {
    let temp = tempdir().unwrap();
    let (client, calls) = client();

    let mut total_rows = 0;
    for index in 0..3 {
        let options = options(temp.path(), ChunkSpec::new(index, 3).unwrap());
        total_rows += run_once(&options, &client).await;
    }
    assert_eq!(total_rows, 5);
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let output = temp.path().join("out").join("ratings.csv");
    let ids: HashSet<i64> = read_records(&output).iter().map(|r| r.listing_id).collect();
    assert_eq!(ids, HashSet::from([1, 2, 3, 4, 5]));
}

#[tokio::test]
async fn test_flush_every_and_failure_log() {
    let temp = tempdir().unwrap();
    let mut options = options(temp.path(), ChunkSpec::new(0, 1).unwrap());
    options.flush_every = 2;
    options.failure_log = Some(temp.path().join("out").join("failures.csv"));
    let (client, _) = client();

    let plan = plan_run(&options).unwrap();
    let summary = execute(&plan, &options, &client, &ProgressBar::hidden())
        .await
        .unwrap();

    assert_eq!(summary.rows_written, 5);
    assert_eq!(summary.complete, 3);
    assert_eq!(summary.degraded.get("malformed_json"), Some(&1));
    assert_eq!(summary.degraded.get("no_reviews"), Some(&1));
    assert_eq!(summary.failures_logged, 2);

    let output = fs::read_to_string(&options.output).unwrap();
    assert_eq!(output.matches("listing_id").count(), 1);

    let failures = fs::read_to_string(options.failure_log.as_ref().unwrap()).unwrap();
    let lines: Vec<&str> = failures.lines().collect();
    assert_eq!(lines[0], "listing_id,reason_kind,reason");
    assert!(lines[1].starts_with("2,malformed_json,"));
    assert_eq!(lines[2], "4,no_reviews,no reviews to rate");
}
