//! Serper Client
//!
//! Google web search through `google.serper.dev`.
//!
//! ## Request shape
//!
//! Every request uses the same fixed body: the query plus a Russian locale
//! (`gl`/`hl` = `ru`) and a result count of 5. The API key travels in the
//! `X-API-KEY` header.
//!
//! ## Failure model
//!
//! [`SearchClient::search`] never fails. Transport errors, bad statuses,
//! unparseable bodies and API-reported errors all come back as a readable
//! string, which the research loop stores next to the question like a normal
//! result. Use [`SearchClient::try_search`] for the typed variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{SearchConfig, DEFAULT_SEARCH_ENDPOINT};

pub const SEARCH_LOCALE: &str = "ru";
pub const SEARCH_RESULT_COUNT: usize = 5;

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search API key not configured")]
    NoApiKey,

    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse search results: {0}")]
    ParseError(String),

    #[error("Search error: {0}")]
    Api(String),
}

/// One organic search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    gl: &'static str,
    hl: &'static str,
    num: usize,
}

/// Serper client for web search
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl SearchClient {
    /// Create a new client against the public Serper endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
        }
    }

    /// Configure client from config
    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.api_key.clone()).with_endpoint(&config.endpoint)
    }

    /// Point the client at another endpoint
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Search and return the serialized result list, or a readable error string.
    pub async fn search(&self, query: &str) -> String {
        match self.try_search(query).await {
            Ok(hits) => format_hits(&hits),
            Err(e) => {
                warn!(query = %query, error = %e, "Search failed");
                e.to_string()
            }
        }
    }

    /// Search and return typed hits
    pub async fn try_search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        if self.api_key.trim().is_empty() {
            return Err(SearchError::NoApiKey);
        }

        info!(query = %query, "Searching the web via Serper");

        let body = SearchRequest {
            q: query,
            gl: SEARCH_LOCALE,
            hl: SEARCH_LOCALE,
            num: SEARCH_RESULT_COUNT,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let results: serde_json::Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) if status.is_success() => return Err(SearchError::ParseError(e.to_string())),
            Err(_) => {
                return Err(SearchError::RequestFailed(format!("HTTP {}: {}", status, text.trim())))
            }
        };

        debug!(status = %status, "Raw search response received");

        let hits = parse_results(&results)?;
        if !status.is_success() && hits.is_empty() {
            return Err(SearchError::RequestFailed(format!("HTTP {}", status)));
        }

        info!(count = hits.len(), "Search completed");
        Ok(hits)
    }
}

/// Extract hits from a Serper response body.
///
/// An `error` field wins over everything else; a missing `organic` field is
/// an empty result, not an error.
pub fn parse_results(results: &serde_json::Value) -> Result<Vec<SearchHit>, SearchError> {
    if let Some(error) = results.get("error") {
        let message = error
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| error.to_string());
        return Err(SearchError::Api(message));
    }

    let Some(organic) = results.get("organic") else {
        return Ok(Vec::new());
    };

    let items = organic
        .as_array()
        .ok_or_else(|| SearchError::ParseError("expected \"organic\" to be an array".to_string()))?;

    let field = |item: &serde_json::Value, name: &str| {
        item.get(name)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };

    Ok(items
        .iter()
        .take(SEARCH_RESULT_COUNT)
        .map(|item| SearchHit {
            title: field(item, "title"),
            link: field(item, "link"),
            snippet: field(item, "snippet"),
        })
        .collect())
}

/// Pretty JSON with non-ASCII text kept as-is
pub fn format_hits(hits: &[SearchHit]) -> String {
    serde_json::to_string_pretty(hits).unwrap_or_else(|_| "[]".to_string())
}

/// Links mentioned in a serialized result, in order
pub fn links_in(result: &str) -> Vec<String> {
    serde_json::from_str::<Vec<SearchHit>>(result)
        .map(|hits| {
            hits.into_iter()
                .map(|h| h.link)
                .filter(|l| !l.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
