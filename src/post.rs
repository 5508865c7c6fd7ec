//! Patreon post data model

use serde::{Deserialize, Serialize};

/// A single post record from the Patreon API.
///
/// Listing endpoints return a trimmed attribute set; `video_embed` posts in
/// particular often arrive without their `embed` object until the post is
/// fetched individually.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub attributes: PostAttributes,
}

/// Post attributes as returned by the API. Every field is optional; the
/// extraction engine only reads `embed` and `content`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostAttributes {
    pub title: Option<String>,
    pub post_type: Option<String>,
    pub published_at: Option<String>,
    pub url: Option<String>,
    pub embed: Option<Embed>,
    pub content: Option<String>,
}

/// Embedded media metadata attached to `video_embed` posts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Embed {
    pub provider: Option<String>,
    pub url: Option<String>,
    pub html: Option<String>,
}

impl Post {
    /// Whether this post is a `video_embed` post.
    pub fn is_video_embed(&self) -> bool {
        self.attributes.post_type.as_deref() == Some("video_embed")
    }
}

impl Embed {
    /// Whether every field is absent, as deserialized from `"embed": {}`.
    pub fn is_empty(&self) -> bool {
        self.provider.is_none() && self.url.is_none() && self.html.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_post() {
        let json = r#"{
            "id": "112233",
            "type": "post",
            "attributes": {
                "title": "Weekly update",
                "post_type": "video_embed",
                "published_at": "2024-03-01T12:00:00.000+00:00",
                "url": "https://www.patreon.com/posts/weekly-112233",
                "embed": {
                    "provider": "Vimeo",
                    "url": "https://vimeo.com/123456789",
                    "html": "<iframe src=\"https://player.vimeo.com/video/123456789\"></iframe>"
                },
                "content": "<p>New video!</p>",
                "like_count": 4
            }
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.id, "112233");
        assert!(post.is_video_embed());
        assert_eq!(
            post.attributes.embed.as_ref().unwrap().provider.as_deref(),
            Some("Vimeo")
        );
    }

    #[test]
    fn test_deserialize_sparse_post() {
        let post: Post = serde_json::from_str(r#"{"id": "9"}"#).unwrap();
        assert_eq!(post.id, "9");
        assert!(post.attributes.title.is_none());
        assert!(post.attributes.embed.is_none());
        assert!(!post.is_video_embed());
    }

    #[test]
    fn test_deserialize_null_embed() {
        let post: Post =
            serde_json::from_str(r#"{"id": "1", "attributes": {"embed": null}}"#).unwrap();
        assert!(post.attributes.embed.is_none());
    }

    #[test]
    fn test_empty_embed_object_is_empty() {
        let post: Post =
            serde_json::from_str(r#"{"id": "1", "attributes": {"embed": {}}}"#).unwrap();
        assert!(post.attributes.embed.as_ref().unwrap().is_empty());

        let embed: Embed = serde_json::from_str(r#"{"url": "https://vimeo.com/1"}"#).unwrap();
        assert!(!embed.is_empty());
    }
}
