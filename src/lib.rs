//! PatreonVideoExtractor - Video URL extraction for Patreon creator pages
//!
//! A Rust library and CLI for collecting Vimeo and YouTube links from the
//! posts of Patreon creators you support.
//!
//! # Features
//!
//! - **Cookie Authentication**: Reuses an exported browser session, no password handling
//! - **Creator Discovery**: Enumerates supported creators from the memberships page
//! - **Cursor Pagination**: Walks the posts API page by page with a polite delay
//! - **URL Extraction**: Pulls video URLs from embeds, iframes, and post bodies
//! - **Identity Dedup**: Collapses Vimeo variants of the same video, keeping unlisted hashes
//! - **Flexible Export**: Per-creator JSON documents and raw URL lists
//!
//! # Usage
//!
//! ```no_run
//! use patreon_video_extractor::{extractor, ExtractorOptions, Post};
//!
//! # fn demo(post: &Post) {
//! let options = ExtractorOptions::default();
//! let urls = extractor::extract_all_video_urls(post, &options);
//! for url in urls {
//!     println!("{url}");
//! }
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod extractor;
pub mod output;
pub mod patterns;
pub mod post;

// Re-exports for library usage
pub use auth::UserProfile;
pub use client::{Creator, PatreonClient};
pub use config::{ExtractorOptions, ScraperConfig};
pub use error::{Result, ScraperError};
pub use output::{CreatorExport, DateFilter, OutputWriter, PostExport};
pub use patterns::VimeoRef;
pub use post::{Embed, Post, PostAttributes};
