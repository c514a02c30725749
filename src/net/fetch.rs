use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// A transcript page, fetched or read from disk.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub html: String,
    /// Final location after redirects, or a `file://` URL for local pages.
    pub url: String,
    pub status: u16,
    pub content_type: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("client error: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("server answered {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("failed to read body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("failed to read {path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },
}

/// Fetch a transcript page over HTTP (blocking).
pub fn fetch_url(url_str: &str, timeout: Duration) -> Result<FetchResult, FetchError> {
    let url = if !url_str.starts_with("http://") && !url_str.starts_with("https://") {
        format!("https://{}", url_str)
    } else {
        url_str.to_string()
    };

    let parsed = Url::parse(&url).map_err(|source| FetchError::InvalidUrl {
        url: url.clone(),
        source,
    })?;

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("chat-anchor/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(FetchError::Client)?;

    let response = client
        .get(parsed.as_str())
        .header("Accept", "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
        .send()
        .map_err(FetchError::Request)?;

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    if !response.status().is_success() {
        return Err(FetchError::Status {
            url: final_url,
            status,
        });
    }
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/html")
        .to_string();

    let html = response.text().map_err(FetchError::Body)?;
    log::debug!("fetched {} ({} bytes, {})", final_url, html.len(), content_type);

    Ok(FetchResult {
        html,
        url: final_url,
        status,
        content_type,
    })
}

/// Load a transcript from an http(s) URL or a local file path.
pub fn load_source(source: &str, timeout: Duration) -> Result<FetchResult, FetchError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return fetch_url(source, timeout);
    }
    let path = Path::new(source);
    let html = std::fs::read_to_string(path).map_err(|e| FetchError::File {
        path: source.to_string(),
        source: e,
    })?;
    let url = path
        .canonicalize()
        .ok()
        .and_then(|p| Url::from_file_path(p).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| format!("file://{source}"));
    Ok(FetchResult {
        html,
        url,
        status: 200,
        content_type: "text/html".to_string(),
    })
}
