use crate::error::FailureReason;
use serde::{Deserialize, Serialize};

/// The six fixed rating dimensions, in output column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Overall,
    Cleanliness,
    Communication,
    Location,
    Value,
    Safety,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Overall,
        Category::Cleanliness,
        Category::Communication,
        Category::Location,
        Category::Value,
        Category::Safety,
    ];

    /// JSON key requested from the model and CSV column name
    pub fn column(self) -> &'static str {
        match self {
            Category::Overall => "overall_rating",
            Category::Cleanliness => "cleanliness_rating",
            Category::Communication => "communication_rating",
            Category::Location => "location_rating",
            Category::Value => "value_rating",
            Category::Safety => "safety_rating",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One optional value per category. Always holds all six keys.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategoryRatings([Option<f64>; 6]);

impl CategoryRatings {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> Option<f64> {
        self.0[category.index()]
    }

    pub fn set(&mut self, category: Category, value: Option<f64>) {
        self.0[category.index()] = value;
    }

    pub fn is_all_null(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

/// Result of rating one listing.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Complete(CategoryRatings),
    /// At least one null, with the reason attached
    Degraded {
        ratings: CategoryRatings,
        reason: FailureReason,
    },
}

impl ScoreOutcome {
    pub fn failed(reason: FailureReason) -> Self {
        ScoreOutcome::Degraded {
            ratings: CategoryRatings::empty(),
            reason,
        }
    }

    pub fn ratings(&self) -> &CategoryRatings {
        match self {
            ScoreOutcome::Complete(ratings) => ratings,
            ScoreOutcome::Degraded { ratings, .. } => ratings,
        }
    }

    pub fn reason(&self) -> Option<&FailureReason> {
        match self {
            ScoreOutcome::Complete(_) => None,
            ScoreOutcome::Degraded { reason, .. } => Some(reason),
        }
    }
}

/// One row of the output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub listing_id: i64,
    pub overall_rating: Option<f64>,
    pub cleanliness_rating: Option<f64>,
    pub communication_rating: Option<f64>,
    pub location_rating: Option<f64>,
    pub value_rating: Option<f64>,
    pub safety_rating: Option<f64>,
    pub n_reviews_used: usize,
}

impl ScoreRecord {
    pub fn new(listing_id: i64, ratings: &CategoryRatings, n_reviews_used: usize) -> Self {
        Self {
            listing_id,
            overall_rating: ratings.get(Category::Overall),
            cleanliness_rating: ratings.get(Category::Cleanliness),
            communication_rating: ratings.get(Category::Communication),
            location_rating: ratings.get(Category::Location),
            value_rating: ratings.get(Category::Value),
            safety_rating: ratings.get(Category::Safety),
            n_reviews_used,
        }
    }

    pub fn rating(&self, category: Category) -> Option<f64> {
        match category {
            Category::Overall => self.overall_rating,
            Category::Cleanliness => self.cleanliness_rating,
            Category::Communication => self.communication_rating,
            Category::Location => self.location_rating,
            Category::Value => self.value_rating,
            Category::Safety => self.safety_rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_every_category() {
        let mut ratings = CategoryRatings::empty();
        ratings.set(Category::Overall, Some(4.5));
        ratings.set(Category::Safety, Some(3.0));

        let record = ScoreRecord::new(7, &ratings, 2);
        for category in Category::ALL {
            assert_eq!(record.rating(category), ratings.get(category));
        }
        assert!(!ratings.is_all_null());
    }

    #[test]
    fn test_failed_outcome_is_all_null() {
        let outcome = ScoreOutcome::failed(FailureReason::NoReviews);
        assert!(outcome.ratings().is_all_null());
        assert_eq!(outcome.reason(), Some(&FailureReason::NoReviews));
    }
}
