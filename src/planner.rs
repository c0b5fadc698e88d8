use std::collections::HashSet;
use std::ops::Range;

use crate::error::ConfigError;

/// Which chunk of the sorted listing-id space to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpec {
    pub index: usize,
    pub num_chunks: usize,
}

impl ChunkSpec {
    pub fn new(index: usize, num_chunks: usize) -> Result<Self, ConfigError> {
        if num_chunks == 0 {
            return Err(ConfigError::ZeroChunks);
        }
        if index >= num_chunks {
            return Err(ConfigError::ChunkIndexOutOfRange { index, num_chunks });
        }
        Ok(Self { index, num_chunks })
    }

    /// ceil(total / num_chunks)
    pub fn chunk_size(&self, total: usize) -> usize {
        total.div_ceil(self.num_chunks)
    }

    /// Positions `[index * size, (index + 1) * size)` clamped to `total`.
    pub fn range(&self, total: usize) -> Range<usize> {
        let size = self.chunk_size(total);
        let start = (self.index * size).min(total);
        let end = ((self.index + 1) * size).min(total);
        start..end
    }
}

/// The listings a run will touch, after resume subtraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunk: ChunkSpec,
    pub total_listings: usize,
    pub chunk_size: usize,
    pub range: Range<usize>,
    /// Listings of this chunk already present in the output file
    pub already_done: usize,
    /// Pending listings left out by the `limit`
    pub deferred: usize,
    pub pending: Vec<i64>,
}

impl ChunkPlan {
    /// `listing_ids` must be sorted ascending and distinct.
    pub fn build(
        listing_ids: &[i64],
        chunk: ChunkSpec,
        processed: &HashSet<i64>,
        limit: Option<usize>,
    ) -> Self {
        let total_listings = listing_ids.len();
        let range = chunk.range(total_listings);
        let selected = &listing_ids[range.clone()];

        let mut pending: Vec<i64> = selected
            .iter()
            .copied()
            .filter(|id| !processed.contains(id))
            .collect();
        let already_done = selected.len() - pending.len();

        let mut deferred = 0;
        if let Some(limit) = limit {
            if pending.len() > limit {
                deferred = pending.len() - limit;
                pending.truncate(limit);
            }
        }

        Self {
            chunk,
            total_listings,
            chunk_size: chunk.chunk_size(total_listings),
            range,
            already_done,
            deferred,
            pending,
        }
    }

    pub fn selected(&self) -> usize {
        self.range.len()
    }

    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }
}
