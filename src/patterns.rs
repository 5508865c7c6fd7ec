//! URL grammars and parsers for supported video providers
//!
//! Vimeo matching is scheme-exact (`https://`, bare host) while YouTube
//! accepts `http` or `https` with or without `www.`; the asymmetry matches
//! the URL shapes Patreon embeds actually carry.

use once_cell::sync::Lazy;
use regex::Regex;

/// Full Vimeo URL grammar: numeric id, optional privacy-hash path segment,
/// optional `?share=copy`, optional trailing `&`-joined parameters.
static VIMEO_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https://vimeo\.com/\d+(?:/[a-z0-9]+)?(?:\?share=copy)?(?:&[^\s<"]*)?"#).unwrap()
});

/// Vimeo grammar anchored to the start of the string, for validation.
static VIMEO_URL_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^https://vimeo\.com/\d+(?:/[a-z0-9]+)?(?:\?share=copy)?(?:&[^\s<"]*)?"#).unwrap()
});

/// Full YouTube URL grammar; the capture group is the 11-character video id.
static YOUTUBE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"https?://(?:www\.)?(?:youtube\.com/(?:watch\?v=|embed/|shorts/|v/|live/)|youtu\.be/)([a-zA-Z0-9_-]{11})(?:[?&][^\s<"]*)?"#,
    )
    .unwrap()
});

/// YouTube id shapes, tried in order against a single candidate URL.
static YOUTUBE_ID_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"youtube\.com/watch\?v=([a-zA-Z0-9_-]{11})",
        r"youtube\.com/embed/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/v/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/live/([a-zA-Z0-9_-]{11})",
        r"youtu\.be/([a-zA-Z0-9_-]{11})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Vimeo id and optional hash inside any string mentioning vimeo.com.
static VIMEO_PARTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"vimeo\.com/(\d+)(?:/([a-z0-9]+))?").unwrap());

/// Vimeo player iframe src, as found in embed HTML fragments.
static VIMEO_IFRAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"player\.vimeo\.com/video/(\d+)(?:\?h=([a-z0-9]+))?").unwrap());

/// A parsed Vimeo video reference: numeric id plus optional privacy hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VimeoRef {
    pub id: String,
    pub hash: Option<String>,
}

impl VimeoRef {
    /// Canonical page URL for this reference.
    pub fn url(&self) -> String {
        match &self.hash {
            Some(hash) => format!("https://vimeo.com/{}/{}", self.id, hash),
            None => format!("https://vimeo.com/{}", self.id),
        }
    }
}

/// Collect every Vimeo URL in `text`, verbatim.
pub fn find_vimeo_urls(text: &str) -> Vec<String> {
    VIMEO_URL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Collect every YouTube video id in `text`.
pub fn find_youtube_ids(text: &str) -> Vec<String> {
    YOUTUBE_URL_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Extract the video id from a single YouTube URL.
pub fn youtube_id(url: &str) -> Option<String> {
    YOUTUBE_ID_RES
        .iter()
        .find_map(|re| re.captures(url).map(|caps| caps[1].to_string()))
}

/// Canonical watch URL for a YouTube video id.
pub fn youtube_watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// Parse the id and optional privacy hash out of a Vimeo URL.
pub fn parse_vimeo_url(url: &str) -> Option<VimeoRef> {
    let caps = VIMEO_PARTS_RE.captures(url)?;
    Some(VimeoRef {
        id: caps[1].to_string(),
        hash: caps.get(2).map(|m| m.as_str().to_string()),
    })
}

/// Recover a Vimeo reference from an embed's iframe HTML fragment.
pub fn vimeo_from_iframe(html: &str) -> Option<VimeoRef> {
    let caps = VIMEO_IFRAME_RE.captures(html)?;
    Some(VimeoRef {
        id: caps[1].to_string(),
        hash: caps.get(2).map(|m| m.as_str().to_string()),
    })
}

/// Whether `url` starts with a well-formed Vimeo video URL.
pub fn is_vimeo_url(url: &str) -> bool {
    VIMEO_URL_START_RE.is_match(url)
}

/// Whether `url` carries an extractable YouTube video id.
pub fn is_youtube_url(url: &str) -> bool {
    youtube_id(url).is_some()
}

/// Whether `url` is a recognized video URL on any supported provider.
pub fn is_video_url(url: &str) -> bool {
    is_vimeo_url(url) || is_youtube_url(url)
}

/// Strip tracking parameters from a video URL.
///
/// Vimeo URLs lose any literal `?share=copy` and everything from the first
/// `&` on; YouTube URLs keep their query up to the first `&`. Anything else
/// passes through untouched. Idempotent.
pub fn clean_url(url: &str) -> String {
    if url.contains("vimeo.com") {
        let stripped = url.replace("?share=copy", "");
        match stripped.find('&') {
            Some(pos) => stripped[..pos].to_string(),
            None => stripped,
        }
    } else if url.contains("youtube.com") || url.contains("youtu.be") {
        match url.find('&') {
            Some(pos) => url[..pos].to_string(),
            None => url.to_string(),
        }
    } else {
        url.to_string()
    }
}
