/// Centralized constants for reviewscore
pub mod constants {
    /// Directory name for local reviewscore settings (hidden directory in the working dir)
    pub const LOCAL_DIR_NAME: &str = ".reviewscore";

    /// Configuration filename
    pub const CONFIG_FILENAME: &str = "config.toml";

    /// Global config directory name (in user config directory)
    pub const GLOBAL_CONFIG_DIR_NAME: &str = "reviewscore";

    /// Environment variable holding the API credential
    pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

    /// Environment variable overriding the API endpoint
    pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

    /// Environment variable overriding the model identifier
    pub const MODEL_NAME_ENV: &str = "OPENAI_MODEL_NAME";

    pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

    pub const DEFAULT_MODEL_NAME: &str = "gpt-4o-mini";

    /// Reviews sampled per listing, most recent first
    pub const DEFAULT_MAX_REVIEWS_PER_LISTING: usize = 4;

    /// Characters of a single review kept in the prompt
    pub const DEFAULT_MAX_CHARS_PER_REVIEW: usize = 800;

    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    pub const DEFAULT_MAX_RETRIES: u32 = 2;

    /// Initial backoff, doubled after every failed attempt
    pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 750;

    pub const DEFAULT_INPUT_PATH: &str = "data/raw/reviews.csv";

    pub const DEFAULT_OUTPUT_PATH: &str = "data/processed/review_ratings_by_listing.csv";

    /// Marker appended to a comment cut at the character budget
    pub const TRUNCATION_MARKER: &str = "...";

    /// Line-break markup stripped from raw review text
    pub const LINE_BREAK_MARKUP: &[&str] = &["<br />", "<br/>", "<br>"];

    pub const SYSTEM_INSTRUCTIONS: &str = r#"You are an expert analyst of guest reviews for short-term rental listings.
You will receive several recent reviews of a single listing. Rate the listing
from 1 (very poor) to 5 (excellent), decimals allowed, on each category:

- overall_rating: overall impression of the stay.
- cleanliness_rating: cleanliness of the accommodation.
- communication_rating: clarity and responsiveness of the host.
- location_rating: convenience of the location (access, nearby points of interest).
- value_rating: perceived value for money.
- safety_rating: sense of safety inside and around the accommodation.

Rules:
- Use the 1 to 5 scale only.
- If the reviews do not mention a category, infer a reasonable value but never omit a key.
- Reply with a single valid JSON object and nothing else.
- The object must contain exactly these keys: overall_rating, cleanliness_rating,
  communication_rating, location_rating, value_rating, safety_rating."#;
}
