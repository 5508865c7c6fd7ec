//! Cookie-based Patreon authentication
//!
//! There is no credential login here: the user exports their browser
//! cookies as JSON and this module turns them into an authenticated
//! `reqwest::Client`. An expired session surfaces as an authentication
//! error; renewal is out of scope.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::client::extract_next_data;
use crate::config::ScraperConfig;
use crate::error::{Result, ScraperError};

/// Profile of the authenticated user, read from the home page bootstrap.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub pledge_count: usize,
}

/// Browser-extension cookie export shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CookieExport {
    Wrapped { cookies: Vec<CookieEntry> },
    Bare(Vec<CookieEntry>),
}

#[derive(Debug, Deserialize)]
struct CookieEntry {
    name: String,
    value: String,
}

/// Locate the cookie export inside the configured directory.
///
/// The configured filename (`cookies.json` by default) wins when present,
/// even alongside other files; otherwise exactly one other `.json` file is
/// accepted. A missing directory is created before the not-found error is
/// returned.
pub fn find_cookie_file(config: &ScraperConfig) -> Result<PathBuf> {
    let dir = Path::new(&config.cookies_dir);

    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        return Err(ScraperError::CookiesNotFound {
            dir: config.cookies_dir.clone(),
        });
    }

    let preferred = dir.join(&config.cookies_file);
    if preferred.exists() {
        return Ok(preferred);
    }

    let mut json_files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    json_files.sort();

    match json_files.len() {
        0 => Err(ScraperError::CookiesNotFound {
            dir: config.cookies_dir.clone(),
        }),
        1 => Ok(json_files.remove(0)),
        _ => {
            let candidates = json_files
                .iter()
                .filter_map(|path| path.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            Err(ScraperError::AmbiguousCookies {
                dir: config.cookies_dir.clone(),
                candidates,
            })
        }
    }
}

/// Load name/value pairs from an exported cookie file.
///
/// Accepts both common export shapes: `{"url": ..., "cookies": [...]}` and a
/// bare array of cookie objects.
pub fn load_cookies(path: impl AsRef<Path>) -> Result<HashMap<String, String>> {
    let data = std::fs::read_to_string(&path)?;
    let export: CookieExport = serde_json::from_str(&data)
        .map_err(|e| ScraperError::CookieFormat(e.to_string()))?;

    let entries = match export {
        CookieExport::Wrapped { cookies } => cookies,
        CookieExport::Bare(cookies) => cookies,
    };

    Ok(entries
        .into_iter()
        .map(|cookie| (cookie.name, cookie.value))
        .collect())
}

/// Build an HTTP client carrying the exported cookies and default headers.
pub fn build_client(cookies: &HashMap<String, String>, config: &ScraperConfig) -> Result<Client> {
    let jar = Jar::default();
    let base = Url::parse("https://www.patreon.com")?;
    for (name, value) in cookies {
        jar.add_cookie_str(
            &format!("{}={}; Domain=.patreon.com; Path=/", name, value),
            &base,
        );
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent)
            .map_err(|e| ScraperError::ConfigError(format!("invalid user agent: {}", e)))?,
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&config.accept_language)
            .map_err(|e| ScraperError::ConfigError(format!("invalid accept-language: {}", e)))?,
    );
    headers.insert(REFERER, HeaderValue::from_static("https://www.patreon.com/"));

    let client = Client::builder()
        .default_headers(headers)
        .cookie_provider(Arc::new(jar))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(30))
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()?;

    Ok(client)
}

/// Pull the CSRF signature out of the home page bootstrap data.
pub async fn extract_csrf_token(client: &Client) -> Result<String> {
    let response = client.get("https://www.patreon.com/home").send().await?;
    let html = response.error_for_status()?.text().await?;
    let data = extract_next_data(&html)?;

    data.pointer("/props/pageProps/bootstrapEnvelope/csrfSignature")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ScraperError::AuthFailed("could not extract CSRF token".to_string()))
}

/// Confirm the session belongs to a logged-in user and describe them.
pub async fn validate_session(client: &Client) -> Result<UserProfile> {
    let response = client.get("https://www.patreon.com/home").send().await?;
    let html = response.error_for_status()?.text().await?;
    let data = extract_next_data(&html)?;

    let envelope = data
        .pointer("/props/pageProps/bootstrapEnvelope")
        .cloned()
        .unwrap_or(Value::Null);

    // userId arrives as a number on some page versions and a string on others.
    let user_id = match envelope.get("userId") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            return Err(ScraperError::AuthFailed(
                "no user id in page data, cookies may be missing or expired".to_string(),
            ))
        }
    };

    let user = envelope
        .pointer("/commonBootstrap/currentUser/data")
        .cloned()
        .unwrap_or(Value::Null);

    let name = user
        .pointer("/attributes/full_name")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    let email = user
        .pointer("/attributes/email")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    let pledge_count = user
        .pointer("/relationships/pledges/data")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);

    Ok(UserProfile {
        user_id,
        name,
        email,
        pledge_count,
    })
}

/// Full authentication flow: locate and load cookies, build the client,
/// fetch the CSRF signature and validate the session.
pub async fn authenticate(config: &ScraperConfig) -> Result<(Client, String, UserProfile)> {
    let path = find_cookie_file(config)?;
    debug!("Using cookie file {}", path.display());

    let cookies = load_cookies(&path)?;
    if !cookies.contains_key("session_id") {
        return Err(ScraperError::AuthFailed(
            "missing required 'session_id' cookie, re-export cookies from your browser".to_string(),
        ));
    }

    let client = build_client(&cookies, config)?;
    let csrf_token = extract_csrf_token(&client).await?;
    let profile = validate_session(&client).await?;
    info!("Authenticated as {} ({})", profile.name, profile.user_id);

    Ok((client, csrf_token, profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(dir: &Path) -> ScraperConfig {
        ScraperConfig {
            cookies_dir: dir.to_string_lossy().into_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn test_find_cookie_file_prefers_default_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cookies.json"), "[]").unwrap();
        std::fs::write(dir.path().join("other.json"), "[]").unwrap();

        let found = find_cookie_file(&config_for(dir.path())).unwrap();
        assert_eq!(found.file_name().unwrap(), "cookies.json");
    }

    #[test]
    fn test_find_cookie_file_accepts_single_other_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("export.json"), "[]").unwrap();

        let found = find_cookie_file(&config_for(dir.path())).unwrap();
        assert_eq!(found.file_name().unwrap(), "export.json");
    }

    #[test]
    fn test_find_cookie_file_rejects_ambiguity() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "[]").unwrap();
        std::fs::write(dir.path().join("b.json"), "[]").unwrap();

        let err = find_cookie_file(&config_for(dir.path())).unwrap_err();
        assert!(matches!(err, ScraperError::AmbiguousCookies { .. }));
    }

    #[test]
    fn test_find_cookie_file_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_cookie_file(&config_for(dir.path())).unwrap_err();
        assert!(matches!(err, ScraperError::CookiesNotFound { .. }));
    }

    #[test]
    fn test_find_cookie_file_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("cookies");
        let err = find_cookie_file(&config_for(&nested)).unwrap_err();
        assert!(matches!(err, ScraperError::CookiesNotFound { .. }));
        assert!(nested.is_dir());
    }

    #[test]
    fn test_load_cookies_wrapped_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(
            &path,
            r#"{"url": "https://www.patreon.com", "cookies": [
                {"name": "session_id", "value": "abc", "domain": ".patreon.com"},
                {"name": "patreon_device_id", "value": "xyz"}
            ]}"#,
        )
        .unwrap();

        let cookies = load_cookies(&path).unwrap();
        assert_eq!(cookies.get("session_id").map(String::as_str), Some("abc"));
        assert_eq!(cookies.len(), 2);
    }

    #[test]
    fn test_load_cookies_bare_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, r#"[{"name": "session_id", "value": "abc"}]"#).unwrap();

        let cookies = load_cookies(&path).unwrap();
        assert_eq!(cookies.get("session_id").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_load_cookies_rejects_other_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, r#"{"session_id": "abc"}"#).unwrap();

        let err = load_cookies(&path).unwrap_err();
        assert!(matches!(err, ScraperError::CookieFormat(_)));
    }

    #[test]
    fn test_build_client_accepts_exported_cookies() {
        let mut cookies = HashMap::new();
        cookies.insert("session_id".to_string(), "abc".to_string());
        let config = ScraperConfig::default();
        assert!(build_client(&cookies, &config).is_ok());
    }
}
