use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::reviews::Review;

/// The reviews of one listing that are sent to the model, most recent first.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingBatch {
    pub listing_id: i64,
    pub sampled_reviews: Vec<Review>,
}

impl ListingBatch {
    pub fn is_empty(&self) -> bool {
        self.sampled_reviews.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sampled_reviews.len()
    }
}

/// Reviews grouped per listing, each group already ordered and capped.
pub struct ListingGrouper {
    groups: BTreeMap<i64, Vec<Review>>,
}

impl ListingGrouper {
    pub fn new(reviews: Vec<Review>, max_reviews_per_listing: usize) -> Self {
        let mut groups: BTreeMap<i64, Vec<Review>> = BTreeMap::new();

        for review in reviews {
            let group = groups.entry(review.listing_id).or_default();
            // Reviews without text still register their listing
            if !review.comments_clean.is_empty() {
                group.push(review);
            }
        }

        for group in groups.values_mut() {
            group.sort_by(recency_order);
            group.truncate(max_reviews_per_listing);
        }

        Self { groups }
    }

    /// All distinct listing ids, ascending.
    pub fn listing_ids(&self) -> Vec<i64> {
        self.groups.keys().copied().collect()
    }

    /// Sampled batch for a listing; empty when it has no usable reviews.
    pub fn batch(&self, listing_id: i64) -> ListingBatch {
        ListingBatch {
            listing_id,
            sampled_reviews: self.groups.get(&listing_id).cloned().unwrap_or_default(),
        }
    }
}

/// Date descending, undated last, then review id ascending.
fn recency_order(a: &Review, b: &Review) -> Ordering {
    let by_date = match (a.date, b.date) {
        (Some(da), Some(db)) => db.cmp(&da),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date.then_with(|| a.review_id.cmp(&b.review_id))
}
