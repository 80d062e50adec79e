//! Civitai metadata API client

use crate::config::ArchiverConfig;
use crate::error::{ArchiveError, ArchiveResult};
use crate::models::ModelMetadata;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{
    ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, REFERER, USER_AGENT,
};
use std::time::Duration;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";
const SITE_REFERER: &str = "https://www.civitai.com/";

/// Result of a metadata lookup that reached the server
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(ModelMetadata),
    /// HTTP 200 whose body is not a usable model document
    NotFoundOrUnparseable,
    /// Any status other than 200
    HttpError(u16),
}

/// Source of model metadata documents
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Look up one model; transport failures are errors, server answers are outcomes
    async fn fetch_metadata(&self, model_id: &str) -> ArchiveResult<FetchOutcome>;
}

/// HTTP client for the public Civitai API
#[derive(Debug, Clone)]
pub struct CivitaiClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
    /// Deadline for a metadata request, body included
    timeout: Option<Duration>,
}

impl CivitaiClient {
    pub fn new(config: &ArchiverConfig) -> ArchiveResult<Self> {
        // Timeout is applied per metadata request; downloads share this client
        let http = reqwest::Client::builder()
            .build()
            .map_err(ArchiveError::http(config.api_base_url.clone()))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            timeout: config.request_timeout_secs.map(Duration::from_secs),
        })
    }

    /// Underlying HTTP client, shared with the file and preview downloaders
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn metadata_url(&self, model_id: &str) -> String {
        format!("{}/api/v1/models/{}", self.base_url, model_id)
    }

    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(REFERER, HeaderValue::from_static(SITE_REFERER));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.auth_token {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("Auth token contains invalid header characters, ignoring"),
            }
        }

        headers
    }
}

#[async_trait]
impl MetadataSource for CivitaiClient {
    async fn fetch_metadata(&self, model_id: &str) -> ArchiveResult<FetchOutcome> {
        let url = self.metadata_url(model_id);
        tracing::debug!(model_id = %model_id, url = %url, "Fetching model metadata");

        let mut request = self.http.get(&url).headers(self.request_headers());
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(ArchiveError::http(&url))?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(model_id = %model_id, status = status.as_u16(), "Metadata request failed");
            return Ok(FetchOutcome::HttpError(status.as_u16()));
        }

        let body = response.bytes().await.map_err(ArchiveError::http(&url))?;
        match ModelMetadata::from_slice(&body) {
            Ok(metadata) => Ok(FetchOutcome::Success(metadata)),
            Err(e) => {
                tracing::warn!(model_id = %model_id, error = %e, "Unusable metadata response");
                Ok(FetchOutcome::NotFoundOrUnparseable)
            }
        }
    }
}
