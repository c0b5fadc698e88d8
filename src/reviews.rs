use anyhow::{Context as AnyhowContext, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::cleaner::clean_comment;

/// A single guest review, cleaned on load.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub listing_id: i64,
    pub review_id: i64,
    /// `None` when the source date is empty or unparsable
    pub date: Option<NaiveDateTime>,
    pub reviewer_name: String,
    pub comments_clean: String,
}

/// Row shape of the input file; columns not named here are ignored.
#[derive(Debug, Deserialize)]
struct RawReview {
    listing_id: i64,
    id: i64,
    date: Option<String>,
    reviewer_name: Option<String>,
    comments: Option<String>,
}

impl From<RawReview> for Review {
    fn from(raw: RawReview) -> Self {
        Self {
            listing_id: raw.listing_id,
            review_id: raw.id,
            date: raw.date.as_deref().and_then(parse_review_date),
            reviewer_name: raw.reviewer_name.unwrap_or_default().trim().to_string(),
            comments_clean: clean_comment(raw.comments.as_deref()),
        }
    }
}

pub fn load_reviews(path: &Path) -> Result<Vec<Review>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open reviews file: {}", path.display()))?;
    read_reviews(file).with_context(|| format!("Failed to read reviews from {}", path.display()))
}

/// Read reviews from any CSV source. Rows that do not deserialize are skipped.
pub fn read_reviews<R: Read>(source: R) -> Result<Vec<Review>> {
    let mut reader = csv::Reader::from_reader(source);
    let mut reviews = Vec::new();
    let mut skipped = 0usize;

    for (row, result) in reader.deserialize::<RawReview>().enumerate() {
        match result {
            Ok(raw) => reviews.push(Review::from(raw)),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                skipped += 1;
                warn!("Skipping malformed review row {}: {}", row + 1, e);
            }
        }
    }

    debug!("Loaded {} reviews ({} rows skipped)", reviews.len(), skipped);
    Ok(reviews)
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and RFC 3339.
pub fn parse_review_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(datetime);
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|datetime| datetime.naive_utc())
}
