//! Patreon API client: creator discovery and cursor-paginated post fetching

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ScraperConfig;
use crate::error::{Result, ScraperError};
use crate::post::Post;

/// A creator the authenticated user subscribes to.
#[derive(Debug, Clone)]
pub struct Creator {
    pub name: String,
    pub vanity: String,
    pub campaign_id: Option<String>,
    pub url: String,
    /// Filled in by the compatibility probe; None when unprobed.
    pub compatible: Option<bool>,
}

/// Authenticated client for Patreon's web pages and internal JSON API.
pub struct PatreonClient {
    http: Client,
    csrf_token: String,
    config: ScraperConfig,
}

/// One page of the posts API response.
#[derive(Debug, Deserialize)]
struct PostsPage {
    #[serde(default)]
    data: Vec<Post>,
    #[serde(default)]
    meta: PageMeta,
}

#[derive(Debug, Default, Deserialize)]
struct PageMeta {
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    total: Option<u64>,
    cursors: Option<Cursors>,
}

#[derive(Debug, Deserialize)]
struct Cursors {
    next: Option<String>,
}

impl PatreonClient {
    pub fn new(http: Client, csrf_token: String, config: ScraperConfig) -> Self {
        Self {
            http,
            csrf_token,
            config,
        }
    }

    fn api_headers(&self, referer: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-csrf-signature",
            HeaderValue::from_str(&self.csrf_token)
                .map_err(|e| ScraperError::AuthFailed(format!("invalid CSRF signature: {}", e)))?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(referer)
                .map_err(|e| ScraperError::PageData(format!("invalid referer: {}", e)))?,
        );
        Ok(headers)
    }

    /// Probe whether a creator's page uses the supported standard layout.
    ///
    /// Creator Website pages redirect to `/cw/` URLs or ship the
    /// `creator-page-v2` bundle; those host video on Patreon itself, with no
    /// posts API behind them. A failed probe reports compatible and leaves
    /// the real fetch to decide.
    pub async fn check_creator_compatibility(&self, vanity: &str) -> bool {
        let page_url = format!("https://www.patreon.com/c/{}/posts", vanity);

        let head = self
            .http
            .head(&page_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match head {
            Ok(response) => {
                if response.url().as_str().contains("/cw/") {
                    return false;
                }
                // Some pages only reveal the redirect on a real GET.
                if response.status() == StatusCode::METHOD_NOT_ALLOWED {
                    if let Ok(response) = self
                        .http
                        .get(&page_url)
                        .timeout(Duration::from_secs(5))
                        .send()
                        .await
                    {
                        if response.url().as_str().contains("/cw/") {
                            return false;
                        }
                        if let Ok(body) = response.text().await {
                            if body.contains("creator-page-v2") {
                                return false;
                            }
                        }
                    }
                }
                true
            }
            Err(_) => true,
        }
    }

    /// List the creators the logged-in user subscribes to, sorted by name.
    pub async fn get_creators(&self, check_compatibility: bool) -> Result<Vec<Creator>> {
        let response = self
            .http
            .get("https://www.patreon.com/settings/memberships")
            .send()
            .await?
            .error_for_status()?;
        let html = response.text().await?;
        let data = extract_next_data(&html)?;

        let mut users = Vec::new();
        find_objects_by_type(&data, "user", &mut users);

        let mut creators = Vec::new();
        let mut seen = HashSet::new();
        for user in users {
            let attrs = &user["attributes"];

            // The memberships page also embeds the logged-in user.
            if !attrs["is_creator"].as_bool().unwrap_or(false) {
                continue;
            }
            let Some(vanity) = attrs["vanity"].as_str() else {
                continue;
            };
            if !seen.insert(vanity.to_string()) {
                continue;
            }

            let campaign_id = user
                .pointer("/relationships/campaign/data/id")
                .and_then(Value::as_str)
                .map(str::to_string);

            creators.push(Creator {
                name: attrs["full_name"].as_str().unwrap_or(vanity).to_string(),
                vanity: vanity.to_string(),
                campaign_id,
                url: format!("https://www.patreon.com/{}", vanity),
                compatible: None,
            });
        }

        if check_compatibility {
            for creator in &mut creators {
                creator.compatible = Some(self.check_creator_compatibility(&creator.vanity).await);
            }
        }

        creators.sort_by(|a, b| a.name.cmp(&b.name));
        info!("Found {} subscribed creators", creators.len());
        Ok(creators)
    }

    /// Fetch a creator's posts through the paginated posts API.
    ///
    /// Resolves the campaign id from the creator page, then follows
    /// `page[cursor]` links until exhausted or `max_posts` is reached, with
    /// the configured fixed delay between pages. Each request is attempted
    /// once; failures propagate.
    pub async fn get_creator_posts(
        &self,
        vanity: &str,
        max_posts: Option<usize>,
    ) -> Result<Vec<Post>> {
        let page_url = format!("https://www.patreon.com/c/{}/posts", vanity);
        let response = self.http.get(&page_url).send().await?.error_for_status()?;
        let final_url = response.url().as_str().to_string();
        let html = response.text().await?;

        if final_url.contains("/cw/") || html.contains("creator-page-v2") {
            return Err(ScraperError::IncompatibleCreator {
                vanity: vanity.to_string(),
            });
        }

        let data = extract_next_data(&html)?;
        let mut campaigns = Vec::new();
        find_objects_by_type(&data, "campaign", &mut campaigns);

        let campaign_id = campaigns
            .first()
            .and_then(|campaign| campaign.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| ScraperError::CampaignNotFound(vanity.to_string()))?
            .to_string();
        debug!("Campaign id for {}: {}", vanity, campaign_id);

        let mut all_posts: Vec<Post> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut total_posts: Option<u64> = None;
        let mut page_num = 0u32;

        loop {
            page_num += 1;

            let mut api_url = Url::parse("https://www.patreon.com/api/posts")?;
            {
                let mut pairs = api_url.query_pairs_mut();
                pairs
                    .append_pair("filter[campaign_id]", &campaign_id)
                    .append_pair(
                        "filter[is_draft]",
                        if self.config.include_drafts { "true" } else { "false" },
                    )
                    .append_pair("sort", &self.config.api_sort_order)
                    .append_pair("json-api-use-default-includes", "false")
                    .append_pair("json-api-version", &self.config.api_version);
                if let Some(ref cursor) = cursor {
                    pairs.append_pair("page[cursor]", cursor);
                }
            }

            debug!("Fetching posts page {} for {}", page_num, vanity);
            let page: PostsPage = self
                .http
                .get(api_url)
                .headers(self.api_headers(&page_url)?)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            if self.config.request_delay_ms > 0 {
                sleep(Duration::from_millis(self.config.request_delay_ms)).await;
            }

            if page_num == 1 {
                total_posts = page.meta.pagination.total;
            }

            if page.data.is_empty() {
                break;
            }
            all_posts.extend(page.data);

            if let Some(total) = total_posts {
                debug!("Fetched {}/{} posts from {}", all_posts.len(), total, vanity);
            }

            if let Some(max) = max_posts {
                if all_posts.len() >= max {
                    all_posts.truncate(max);
                    break;
                }
            }

            cursor = page.meta.pagination.cursors.and_then(|cursors| cursors.next);
            if cursor.is_none() {
                break;
            }
        }

        info!("Fetched {} posts from {}", all_posts.len(), vanity);
        Ok(all_posts)
    }

    /// Fetch the full record for a single post.
    pub async fn get_post_details(&self, post_id: &str) -> Result<Option<Post>> {
        let url = format!("https://www.patreon.com/api/posts/{}", post_id);
        let body: Value = self
            .http
            .get(&url)
            .headers(self.api_headers("https://www.patreon.com/")?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match body.get("data") {
            Some(data) if data.is_object() => Ok(Some(serde_json::from_value(data.clone())?)),
            _ => Ok(None),
        }
    }

    /// Replace a `video_embed` post lacking embed data with its full record.
    ///
    /// Listing responses omit embed objects; the detail endpoint has them.
    /// Failures are logged and the original post kept, so one broken post
    /// does not abort a whole creator.
    pub async fn enrich_post(&self, post: Post) -> Post {
        if !needs_embed_enrichment(&post, &self.config) {
            return post;
        }

        match self.get_post_details(&post.id).await {
            Ok(Some(full)) => full,
            Ok(None) => post,
            Err(e) => {
                warn!("Could not fetch details for post {}: {}", post.id, e);
                post
            }
        }
    }
}

/// Whether a post should be swapped for its full record before extraction.
///
/// Listing payloads sometimes carry `"embed": {}`; an embed with no data
/// counts as missing.
fn needs_embed_enrichment(post: &Post, config: &ScraperConfig) -> bool {
    if !config.enrich_video_embeds || !post.is_video_embed() {
        return false;
    }
    match &post.attributes.embed {
        Some(embed) => embed.is_empty(),
        None => true,
    }
}

/// Keep only posts published within the given bounds, inclusive on both
/// ends at day granularity. When a filter is active, posts with missing or
/// unparseable timestamps are excluded.
pub fn filter_posts_by_date(
    posts: Vec<Post>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Vec<Post> {
    if start_date.is_none() && end_date.is_none() {
        return posts;
    }

    posts
        .into_iter()
        .filter(|post| {
            let Some(published) = post
                .attributes
                .published_at
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            else {
                return false;
            };
            let day = published.date_naive();
            if start_date.is_some_and(|start| day < start) {
                return false;
            }
            if end_date.is_some_and(|end| day > end) {
                return false;
            }
            true
        })
        .collect()
}

/// Parse a user-supplied date in any of the accepted formats.
pub fn parse_date_input(input: &str) -> Result<NaiveDate> {
    const FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y"];

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ScraperError::ConfigError("empty date string".to_string()));
    }

    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }

    Err(ScraperError::ConfigError(format!(
        "could not parse date '{}', expected YYYY-MM-DD",
        trimmed
    )))
}

/// Extract the `__NEXT_DATA__` bootstrap JSON from a Patreon page.
pub(crate) fn extract_next_data(html: &str) -> Result<Value> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script#__NEXT_DATA__").unwrap();

    let script = document.select(&selector).next().ok_or_else(|| {
        ScraperError::PageData("could not find __NEXT_DATA__ in page".to_string())
    })?;

    let json = script.text().collect::<String>();
    Ok(serde_json::from_str(&json)?)
}

/// Recursively collect every object carrying the given `type` together with
/// an `attributes` key, anywhere in nested bootstrap JSON.
fn find_objects_by_type<'a>(value: &'a Value, type_name: &str, results: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some(type_name)
                && map.contains_key("attributes")
            {
                results.push(value);
            }
            for child in map.values() {
                find_objects_by_type(child, type_name, results);
            }
        }
        Value::Array(items) => {
            for item in items {
                find_objects_by_type(item, type_name, results);
            }
        }
        _ => {}
    }
}
