use crate::constants::constants;
use crate::grouper::ListingBatch;
use crate::ratings::Category;
use crate::reviews::Review;

/// Renders the user message for one listing.
/// Only formats text: same batch and budget always give the same prompt.
pub struct PromptBuilder {
    max_chars_per_review: usize,
}

impl PromptBuilder {
    pub fn new(max_chars_per_review: usize) -> Self {
        Self {
            max_chars_per_review,
        }
    }

    pub fn build(&self, batch: &ListingBatch) -> String {
        let mut prompt = String::new();

        push_header(&mut prompt, batch);
        for (position, review) in batch.sampled_reviews.iter().enumerate() {
            self.push_review(&mut prompt, position + 1, review);
        }
        push_task(&mut prompt);

        prompt
    }

    fn push_review(&self, prompt: &mut String, ordinal: usize, review: &Review) {
        let date = review
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let reviewer = if review.reviewer_name.is_empty() {
            "anonymous"
        } else {
            review.reviewer_name.as_str()
        };

        prompt.push_str(&format!("Review {}\n", ordinal));
        prompt.push_str(&format!("Date: {}\n", date));
        prompt.push_str(&format!("Reviewer: {}\n", reviewer));
        prompt.push_str("Comment: ");
        prompt.push_str(&truncate_chars(
            &review.comments_clean,
            self.max_chars_per_review,
        ));
        prompt.push_str("\n\n");
    }
}

fn push_header(prompt: &mut String, batch: &ListingBatch) {
    prompt.push_str(&format!("Listing ID: {}\n", batch.listing_id));
    prompt.push_str(&format!(
        "Most recent guest reviews ({}):\n\n",
        batch.sampled_reviews.len()
    ));
}

fn push_task(prompt: &mut String) {
    let keys: Vec<&str> = Category::ALL.iter().map(|c| c.column()).collect();
    prompt.push_str("TASK:\n");
    prompt.push_str(
        "Rate this listing from 1 to 5 on each category, based only on the reviews above.\n",
    );
    prompt.push_str(&format!(
        "Return a JSON object with exactly these keys: {}.\n",
        keys.join(", ")
    ));
}

/// Keep at most `max_chars` characters, marking the cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            format!("{}{}", &text[..byte_index], constants::TRUNCATION_MARKER)
        }
        None => text.to_string(),
    }
}
