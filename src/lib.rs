//! Per-listing guest review ratings through an OpenAI-compatible model.
//!
//! Reviews are grouped by listing, the most recent few are rendered into a
//! prompt, and the model's JSON reply is parsed into six category ratings.
//! Work is split into chunks of the sorted listing ids and appended to a CSV
//! that doubles as the resume checkpoint.

pub mod cleaner;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod grouper;
pub mod llm;
pub mod pipeline;
pub mod planner;
pub mod prompt;
pub mod ratings;
pub mod report;
pub mod reviews;
pub mod score_client;
pub mod writer;
