//! Configuration types for the Patreon video extractor

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Global scraper configuration.
///
/// Loadable from a JSON file; any field missing from the file keeps its
/// default value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Directory searched for exported cookie files
    pub cookies_dir: String,

    /// Preferred cookie filename inside `cookies_dir`
    pub cookies_file: String,

    /// Directory where export files are written
    pub output_dir: String,

    /// Place exports in per-creator subdirectories
    pub organize_by_creator: bool,

    /// Write the JSON export (full metadata)
    pub output_json: bool,

    /// Write the raw-URL text export (one URL per line)
    pub output_raw_urls: bool,

    /// Deduplicate URLs in the raw text export (independent of per-post dedup)
    pub dedupe_raw_urls: bool,

    /// JSON filename template; `{creator_vanity}` and `{timestamp}` are substituted
    pub filename_format: String,

    /// strftime format for the `{timestamp}` substitution
    pub timestamp_format: String,

    /// Maximum posts to fetch per creator (None = all)
    pub max_posts_per_creator: Option<usize>,

    /// Fixed delay between paginated API requests in milliseconds
    pub request_delay_ms: u64,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,

    /// Fetch full details for `video_embed` posts whose listing omits embed data
    pub enrich_video_embeds: bool,

    /// Keep posts with no video URLs in the JSON export
    pub include_posts_without_videos: bool,

    /// Skip writing exports for creators with no video URLs at all
    pub skip_export_if_no_videos: bool,

    /// Sort exported posts by publication date
    pub sort_posts_by_date: bool,

    /// Newest first when sorting by date
    pub sort_descending: bool,

    /// User-Agent header for all requests
    pub user_agent: String,

    /// Accept-Language header for all requests
    pub accept_language: String,

    /// `json-api-version` query value for the posts API
    pub api_version: String,

    /// Include draft posts in API results
    pub include_drafts: bool,

    /// API sort order (`-published_at` = newest first)
    pub api_sort_order: String,

    /// Skip all interactive prompts and run from config values alone
    pub auto_mode: bool,

    /// Creator vanities to scrape in auto mode (empty = all subscribed)
    pub selected_creators: Vec<String>,

    /// Date-filter prompt preset: Some(true) always filter, Some(false) never,
    /// None ask interactively
    pub use_date_filter: Option<bool>,

    /// URL extraction behavior
    pub extractor: ExtractorOptions,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            cookies_dir: "cookies".to_string(),
            cookies_file: "cookies.json".to_string(),
            output_dir: "output".to_string(),
            organize_by_creator: true,
            output_json: true,
            output_raw_urls: true,
            dedupe_raw_urls: true,
            filename_format: "{creator_vanity}_{timestamp}.json".to_string(),
            timestamp_format: "%Y%m%d_%H%M%S".to_string(),
            max_posts_per_creator: None,
            request_delay_ms: 0,
            request_timeout_secs: 30,
            enrich_video_embeds: true,
            include_posts_without_videos: true,
            skip_export_if_no_videos: true,
            sort_posts_by_date: true,
            sort_descending: true,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: "en-GB,en;q=0.9".to_string(),
            api_version: "1.0".to_string(),
            include_drafts: false,
            api_sort_order: "-published_at".to_string(),
            auto_mode: false,
            selected_creators: Vec::new(),
            use_date_filter: None,
            extractor: ExtractorOptions::default(),
        }
    }
}

impl ScraperConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Load configuration from a JSON file, falling back to defaults when the
    /// file does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Convert to a pretty-printed JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Per-call extraction behavior, passed explicitly into every extraction
/// function rather than read from global state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorOptions {
    /// Deduplicate URLs within each post
    pub dedupe: bool,

    /// Strip tracking parameters (`?share=copy`, `&ab_channel=...`) from URLs
    pub clean_urls: bool,

    /// Drop candidates that fail video URL validation
    pub validate_urls: bool,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            dedupe: true,
            clean_urls: true,
            validate_urls: true,
        }
    }
}
