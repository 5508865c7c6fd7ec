//! Video URL extraction from Patreon posts
//!
//! Two extraction paths feed one merged result: structured embed metadata
//! (`video_embed` posts) and free-text HTML content (text posts with pasted
//! links). Everything here is pure and total: malformed or missing input
//! yields an empty list, never an error.

use std::collections::{HashMap, HashSet};

use crate::config::ExtractorOptions;
use crate::patterns;
use crate::post::{Embed, Post};

/// Embed providers the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Vimeo,
    YouTube,
}

impl Provider {
    /// Case-insensitive lookup from an embed's provider field.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "vimeo" => Some(Provider::Vimeo),
            "youtube" => Some(Provider::YouTube),
            _ => None,
        }
    }
}

/// Extract the video URL from a post's embed metadata.
///
/// Returns zero or one URL. Absent or unsupported providers yield an empty
/// result rather than an error; posts legitimately embed Spotify, Twitch and
/// other services this tool does not handle.
pub fn extract_from_embed(embed: Option<&Embed>, opts: &ExtractorOptions) -> Vec<String> {
    let Some(embed) = embed else {
        return Vec::new();
    };

    let provider = match embed.provider.as_deref().and_then(Provider::from_name) {
        Some(provider) => provider,
        None => return Vec::new(),
    };

    let mut url = embed.url.clone().filter(|u| !u.is_empty());

    match provider {
        Provider::Vimeo => {
            // A Vimeo embed without a direct URL usually still carries the
            // player iframe; recover the reference from its src.
            if url.is_none() {
                url = embed
                    .html
                    .as_deref()
                    .and_then(patterns::vimeo_from_iframe)
                    .map(|vimeo| vimeo.url());
            }
        }
        Provider::YouTube => {
            // YouTube embed URLs come in several shapes; normalize to the
            // canonical watch URL when an id can be extracted.
            if let Some(ref current) = url {
                if let Some(id) = patterns::youtube_id(current) {
                    url = Some(patterns::youtube_watch_url(&id));
                }
            }
        }
    }

    let Some(mut url) = url else {
        return Vec::new();
    };

    if opts.clean_urls {
        url = patterns::clean_url(&url);
    }

    if opts.validate_urls && !patterns::is_video_url(&url) {
        return Vec::new();
    }

    vec![url]
}

/// Extract video URLs from a post's free-text HTML content.
///
/// Scans for Vimeo URLs and YouTube ids, rebuilds YouTube hits as canonical
/// watch URLs, and returns a lexicographically sorted list.
pub fn extract_from_content(content: Option<&str>, opts: &ExtractorOptions) -> Vec<String> {
    let content = match content {
        Some(content) if !content.is_empty() => content,
        _ => return Vec::new(),
    };

    let mut urls = patterns::find_vimeo_urls(content);
    urls.extend(
        patterns::find_youtube_ids(content)
            .iter()
            .map(|id| patterns::youtube_watch_url(id)),
    );

    if opts.dedupe {
        urls = dedupe_keep_first(urls);
    }

    if opts.clean_urls {
        urls = urls.iter().map(|url| patterns::clean_url(url)).collect();
    }

    // Cleaning can collapse distinct inputs into the same URL.
    if opts.dedupe {
        urls = dedupe_keep_first(urls);
    }

    urls.sort();
    urls
}

/// Resolve Vimeo identity duplicates, preferring hash-bearing variants.
///
/// All URLs sharing one numeric id collapse to a single entry: the
/// lexicographically smallest hash-bearing variant when any exists, else the
/// lexicographically smallest hash-less one. Vimeo-looking strings with no
/// parseable id are dropped. Non-Vimeo URLs pass through unchanged, ahead of
/// the Vimeo results.
pub fn dedupe_vimeo_urls(urls: Vec<String>) -> Vec<String> {
    let (vimeo, mut result): (Vec<String>, Vec<String>) =
        urls.into_iter().partition(|url| url.contains("vimeo.com"));

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<(String, Option<String>)>> = HashMap::new();

    for url in vimeo {
        let Some(parsed) = patterns::parse_vimeo_url(&url) else {
            continue;
        };
        if !groups.contains_key(&parsed.id) {
            order.push(parsed.id.clone());
        }
        groups.entry(parsed.id).or_default().push((url, parsed.hash));
    }

    for id in &order {
        let versions = &groups[id];
        let chosen = versions
            .iter()
            .filter(|(_, hash)| hash.is_some())
            .map(|(url, _)| url)
            .min()
            .or_else(|| versions.iter().map(|(url, _)| url).min());
        if let Some(url) = chosen {
            result.push(url.clone());
        }
    }

    result
}

/// Extract every video URL from a post, merging the embed and content paths.
///
/// The union is identity-deduplicated and sorted lexicographically; the
/// result carries at most one URL per video, with hash-bearing Vimeo
/// variants winning over hash-less ones.
pub fn extract_all_video_urls(post: &Post, opts: &ExtractorOptions) -> Vec<String> {
    let mut all: HashSet<String> = HashSet::new();

    all.extend(extract_from_embed(post.attributes.embed.as_ref(), opts));
    all.extend(extract_from_content(post.attributes.content.as_deref(), opts));

    let mut urls = dedupe_vimeo_urls(all.into_iter().collect());
    urls.sort();
    urls
}

fn dedupe_keep_first(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter().filter(|url| seen.insert(url.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::PostAttributes;

    fn opts() -> ExtractorOptions {
        ExtractorOptions::default()
    }

    fn embed(provider: &str, url: Option<&str>, html: Option<&str>) -> Embed {
        Embed {
            provider: Some(provider.to_string()),
            url: url.map(|s| s.to_string()),
            html: html.map(|s| s.to_string()),
        }
    }

    fn post_with(embed: Option<Embed>, content: Option<&str>) -> Post {
        Post {
            id: "1".to_string(),
            attributes: PostAttributes {
                embed,
                content: content.map(|s| s.to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_embed_vimeo_share_copy_stripped() {
        let embed = embed("vimeo", Some("https://vimeo.com/123456789?share=copy"), None);
        assert_eq!(
            extract_from_embed(Some(&embed), &opts()),
            vec!["https://vimeo.com/123456789"]
        );
    }

    #[test]
    fn test_embed_vimeo_iframe_recovery() {
        let embed = embed(
            "vimeo",
            None,
            Some("<iframe src='https://player.vimeo.com/video/987654321?h=deadbeef123'>"),
        );
        assert_eq!(
            extract_from_embed(Some(&embed), &opts()),
            vec!["https://vimeo.com/987654321/deadbeef123"]
        );

        // An empty-string URL counts as missing and triggers the same recovery.
        let empty_url = Embed {
            url: Some(String::new()),
            ..embed
        };
        assert_eq!(
            extract_from_embed(Some(&empty_url), &opts()),
            vec!["https://vimeo.com/987654321/deadbeef123"]
        );
    }

    #[test]
    fn test_embed_provider_case_insensitive() {
        let embed = embed("Vimeo", Some("https://vimeo.com/42"), None);
        assert_eq!(
            extract_from_embed(Some(&embed), &opts()),
            vec!["https://vimeo.com/42"]
        );
    }

    #[test]
    fn test_embed_youtube_normalized_to_watch_url() {
        let embed = embed("youtube", Some("https://youtu.be/dQw4w9WgXcQ?si=tracking"), None);
        assert_eq!(
            extract_from_embed(Some(&embed), &opts()),
            vec!["https://www.youtube.com/watch?v=dQw4w9WgXcQ"]
        );
    }

    #[test]
    fn test_embed_unsupported_provider_is_silent() {
        let embed = embed("patreon_video", Some("https://patreon.com/media/1"), None);
        assert!(extract_from_embed(Some(&embed), &opts()).is_empty());
        assert!(extract_from_embed(None, &opts()).is_empty());
    }

    #[test]
    fn test_embed_missing_provider_is_silent() {
        let embed = Embed {
            provider: None,
            url: Some("https://vimeo.com/1".to_string()),
            html: None,
        };
        assert!(extract_from_embed(Some(&embed), &opts()).is_empty());
        let empty_provider = Embed {
            provider: Some(String::new()),
            url: Some("https://vimeo.com/1".to_string()),
            html: None,
        };
        assert!(extract_from_embed(Some(&empty_provider), &opts()).is_empty());
    }

    #[test]
    fn test_embed_malformed_iframe_is_silent() {
        let embed = embed("vimeo", None, Some("<iframe src='https://example.com/player'>"));
        assert!(extract_from_embed(Some(&embed), &opts()).is_empty());
    }

    #[test]
    fn test_embed_unrecognized_youtube_url_dropped_by_validation() {
        let embed = embed("youtube", Some("https://example.com/not-a-video"), None);
        assert!(extract_from_embed(Some(&embed), &opts()).is_empty());

        // With validation off the raw URL survives untouched.
        let lax = ExtractorOptions {
            validate_urls: false,
            ..opts()
        };
        assert_eq!(
            extract_from_embed(Some(&embed), &lax),
            vec!["https://example.com/not-a-video"]
        );
    }

    #[test]
    fn test_content_youtube_tracking_param() {
        let urls = extract_from_content(Some("https://youtu.be/dQw4w9WgXcQ&ab_channel=Test"), &opts());
        assert_eq!(urls, vec!["https://www.youtube.com/watch?v=dQw4w9WgXcQ"]);
    }

    #[test]
    fn test_content_mixed_providers_sorted() {
        let content = "first https://www.youtube.com/watch?v=dQw4w9WgXcQ then \
            https://vimeo.com/123456789?share=copy";
        let urls = extract_from_content(Some(content), &opts());
        assert_eq!(
            urls,
            vec![
                "https://vimeo.com/123456789",
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            ]
        );
    }

    #[test]
    fn test_content_empty_inputs() {
        assert!(extract_from_content(None, &opts()).is_empty());
        assert!(extract_from_content(Some(""), &opts()).is_empty());
        assert!(extract_from_content(Some("<p>no links here</p>"), &opts()).is_empty());
    }

    #[test]
    fn test_content_cleaning_collapses_duplicates() {
        let content = "https://vimeo.com/55?share=copy and https://vimeo.com/55";
        let urls = extract_from_content(Some(content), &opts());
        assert_eq!(urls, vec!["https://vimeo.com/55"]);
    }

    #[test]
    fn test_content_no_clean_no_dedupe() {
        let raw = ExtractorOptions {
            dedupe: false,
            clean_urls: false,
            validate_urls: false,
        };
        let content = "https://vimeo.com/55?share=copy and https://vimeo.com/55";
        let urls = extract_from_content(Some(content), &raw);
        assert_eq!(
            urls,
            vec!["https://vimeo.com/55", "https://vimeo.com/55?share=copy"]
        );
    }

    #[test]
    fn test_dedupe_prefers_hash_variant() {
        let urls = vec![
            "https://vimeo.com/123456789".to_string(),
            "https://vimeo.com/123456789/abc123xy".to_string(),
        ];
        assert_eq!(
            dedupe_vimeo_urls(urls),
            vec!["https://vimeo.com/123456789/abc123xy"]
        );
    }

    #[test]
    fn test_dedupe_tie_break_is_lexicographic() {
        let urls = vec![
            "https://vimeo.com/9/zzz".to_string(),
            "https://vimeo.com/9/aaa".to_string(),
        ];
        assert_eq!(dedupe_vimeo_urls(urls), vec!["https://vimeo.com/9/aaa"]);

        let hashless = vec![
            "https://vimeo.com/9?share=copy".to_string(),
            "https://vimeo.com/9".to_string(),
        ];
        assert_eq!(dedupe_vimeo_urls(hashless), vec!["https://vimeo.com/9"]);
    }

    #[test]
    fn test_dedupe_drops_unparseable_vimeo_strings() {
        let urls = vec![
            "https://vimeo.com/about".to_string(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
        ];
        assert_eq!(
            dedupe_vimeo_urls(urls),
            vec!["https://www.youtube.com/watch?v=dQw4w9WgXcQ"]
        );
    }

    #[test]
    fn test_dedupe_keeps_distinct_ids() {
        let urls = vec![
            "https://vimeo.com/1".to_string(),
            "https://vimeo.com/2/aa".to_string(),
            "https://vimeo.com/1/bb".to_string(),
        ];
        assert_eq!(
            dedupe_vimeo_urls(urls),
            vec!["https://vimeo.com/1/bb", "https://vimeo.com/2/aa"]
        );
    }

    #[test]
    fn test_post_with_nothing_yields_empty() {
        let post = post_with(None, None);
        assert!(extract_all_video_urls(&post, &opts()).is_empty());
    }

    #[test]
    fn test_unsupported_embed_with_plain_content() {
        let post = post_with(
            Some(embed("patreon_video", None, None)),
            Some("<p>new episode up!</p>"),
        );
        assert!(extract_all_video_urls(&post, &opts()).is_empty());
    }

    #[test]
    fn test_embed_and_content_same_identity_single_result() {
        let post = post_with(
            Some(embed("vimeo", Some("https://vimeo.com/123456789"), None)),
            Some("mirror: https://vimeo.com/123456789"),
        );
        assert_eq!(
            extract_all_video_urls(&post, &opts()),
            vec!["https://vimeo.com/123456789"]
        );
    }

    #[test]
    fn test_content_hash_variant_beats_plain_in_same_text() {
        let post = post_with(
            None,
            Some("https://vimeo.com/123456789 or https://vimeo.com/123456789/abc123xy"),
        );
        assert_eq!(
            extract_all_video_urls(&post, &opts()),
            vec!["https://vimeo.com/123456789/abc123xy"]
        );
    }

    #[test]
    fn test_content_hash_variant_beats_embed_hashless() {
        let post = post_with(
            Some(embed("vimeo", Some("https://vimeo.com/123456789"), None)),
            Some("unlisted link: https://vimeo.com/123456789/abc123xy"),
        );
        assert_eq!(
            extract_all_video_urls(&post, &opts()),
            vec!["https://vimeo.com/123456789/abc123xy"]
        );
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let post = post_with(
            Some(embed("youtube", Some("https://youtu.be/dQw4w9WgXcQ"), None)),
            Some("also https://vimeo.com/55?share=copy and https://vimeo.com/66/aa"),
        );
        let first = extract_all_video_urls(&post, &opts());
        let second = extract_all_video_urls(&post, &opts());
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                "https://vimeo.com/55",
                "https://vimeo.com/66/aa",
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            ]
        );
    }

    #[test]
    fn test_provider_from_name() {
        assert_eq!(Provider::from_name("vimeo"), Some(Provider::Vimeo));
        assert_eq!(Provider::from_name("YouTube"), Some(Provider::YouTube));
        assert_eq!(Provider::from_name("twitch"), None);
        assert_eq!(Provider::from_name(""), None);
    }
}
