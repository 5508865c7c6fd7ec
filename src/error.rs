//! Error types for the Patreon video extractor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parsing failed: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("No cookie file found in {dir}: export your Patreon cookies as JSON and place them there")]
    CookiesNotFound { dir: String },

    #[error("Multiple cookie files found in {dir} ({candidates}): keep one or name it cookies.json")]
    AmbiguousCookies { dir: String, candidates: String },

    #[error("Invalid cookie file format: {0}")]
    CookieFormat(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Could not resolve campaign id for creator '{0}'")]
    CampaignNotFound(String),

    #[error("Creator '{vanity}' uses the Creator Website layout, which exposes no posts API")]
    IncompatibleCreator { vanity: String },

    #[error("Page data error: {0}")]
    PageData(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
