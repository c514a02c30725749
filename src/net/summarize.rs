//! Client for the summarization proxy.
//!
//! `POST {base}/api/summarize` with `{"text": ...}`; a 2xx answer carries
//! `{"summary": ...}`, anything else may carry `{"error": ...}`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("summarizer unavailable: {0}")]
    Unavailable(String),
    #[error("invalid API base `{0}`")]
    InvalidBase(String),
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("{0}")]
    Api(String),
    #[error("malformed summary response: {0}")]
    Malformed(#[source] reqwest::Error),
    #[error("summary response was empty")]
    Empty,
}

#[derive(Serialize)]
struct SummarizeBody<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct SummaryBody {
    summary: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

pub struct SummaryClient {
    endpoint: String,
    http: reqwest::blocking::Client,
}

impl SummaryClient {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, SummarizeError> {
        let base = url::Url::parse(api_base)
            .map_err(|_| SummarizeError::InvalidBase(api_base.to_string()))?;
        let endpoint = format!("{}/api/summarize", base.as_str().trim_end_matches('/'));
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("chat-anchor/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(SummarizeError::Request)?;
        Ok(Self { endpoint, http })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&SummarizeBody { text })
            .send()
            .map_err(SummarizeError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("request failed ({})", status.as_u16()));
            return Err(SummarizeError::Api(message));
        }

        let body: SummaryBody = response.json().map_err(SummarizeError::Malformed)?;
        body.summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(SummarizeError::Empty)
    }
}
