//! Export documents and file writing

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::Creator;
use crate::config::ScraperConfig;
use crate::error::Result;
use crate::post::Post;

/// One post in the JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostExport {
    pub post_id: String,
    pub title: String,
    pub post_type: Option<String>,
    pub published_at: Option<String>,
    pub url: String,
    pub video_urls: Vec<String>,
}

impl PostExport {
    /// Flatten a post record and its extracted URLs for output.
    pub fn from_post(post: &Post, video_urls: Vec<String>) -> Self {
        let attrs = &post.attributes;
        Self {
            post_id: post.id.clone(),
            title: attrs.title.clone().unwrap_or_else(|| "Untitled".to_string()),
            post_type: attrs.post_type.clone(),
            published_at: attrs.published_at.clone(),
            url: attrs
                .url
                .clone()
                .unwrap_or_else(|| format!("https://www.patreon.com/posts/{}", post.id)),
            video_urls,
        }
    }
}

/// The date bounds a scrape ran under, echoed into the export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateFilter {
    pub fn is_active(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}

/// Full per-creator export document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatorExport {
    pub creator: String,
    pub creator_vanity: String,
    pub creator_url: String,
    pub scrape_date: String,
    pub total_posts: usize,
    pub posts_with_videos: usize,
    pub total_video_urls: usize,
    pub date_filter: DateFilter,
    pub posts: Vec<PostExport>,
}

impl CreatorExport {
    pub fn new(creator: &Creator, date_filter: DateFilter, posts: Vec<PostExport>) -> Self {
        let posts_with_videos = posts.iter().filter(|p| !p.video_urls.is_empty()).count();
        let total_video_urls = posts.iter().map(|p| p.video_urls.len()).sum();
        Self {
            creator: creator.name.clone(),
            creator_vanity: creator.vanity.clone(),
            creator_url: creator.url.clone(),
            scrape_date: Utc::now().to_rfc3339(),
            total_posts: posts.len(),
            posts_with_videos,
            total_video_urls,
            date_filter,
            posts,
        }
    }
}

/// Writes per-creator export files under the configured output directory.
pub struct OutputWriter {
    output_dir: PathBuf,
    organize_by_creator: bool,
    filename_format: String,
    timestamp_format: String,
}

impl OutputWriter {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.output_dir),
            organize_by_creator: config.organize_by_creator,
            filename_format: config.filename_format.clone(),
            timestamp_format: config.timestamp_format.clone(),
        }
    }

    fn creator_dir(&self, vanity: &str) -> PathBuf {
        if self.organize_by_creator {
            self.output_dir.join(vanity)
        } else {
            self.output_dir.clone()
        }
    }

    fn timestamp(&self) -> String {
        let now = Local::now();
        let mut stamp = String::new();
        // An invalid strftime specifier in the config surfaces as a fmt
        // error. Fall back to the default format.
        if write!(stamp, "{}", now.format(&self.timestamp_format)).is_err() {
            stamp = now.format("%Y%m%d_%H%M%S").to_string();
        }
        stamp
    }

    /// Write the JSON export, returning the path written.
    pub async fn write_json(&self, export: &CreatorExport) -> Result<PathBuf> {
        let dir = self.creator_dir(&export.creator_vanity);
        tokio::fs::create_dir_all(&dir).await?;

        let filename = self
            .filename_format
            .replace("{creator_vanity}", &export.creator_vanity)
            .replace("{timestamp}", &self.timestamp());
        let path = dir.join(filename);

        let body = serde_json::to_vec_pretty(export)?;
        tokio::fs::write(&path, body).await?;
        debug!("Wrote JSON export to {}", path.display());

        Ok(path)
    }

    /// Write the raw-URL text export, one URL per line, returning the path.
    ///
    /// Deduplication preserves first-seen order across the whole file.
    pub async fn write_raw_urls(
        &self,
        urls: &[String],
        vanity: &str,
        deduplicate: bool,
    ) -> Result<PathBuf> {
        let dir = self.creator_dir(vanity);
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{}_{}.txt", vanity, self.timestamp()));

        let mut body = String::new();
        let mut seen = HashSet::new();
        for url in urls {
            if deduplicate && !seen.insert(url.as_str()) {
                continue;
            }
            body.push_str(url);
            body.push('\n');
        }

        tokio::fs::write(&path, body).await?;
        debug!("Wrote raw URLs to {}", path.display());

        Ok(path)
    }
}
