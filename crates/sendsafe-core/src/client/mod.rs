//! HTTP client for the document backend.
//!
//! Credentials are passed in explicitly through a [`CredentialProvider`];
//! the client never looks for a token on its own.

mod analytics;
mod bulk;
mod documents;
mod pdf;

pub use bulk::BULK_POLL_INTERVAL;

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;
use crate::models::config::{ApiConfig, ExtractionConfig, UploadConfig};
use crate::models::document::Download;

/// MIME type sent with uploaded documents.
pub(crate) const XML_MIME: &str = "application/xml";

/// Supplies the bearer token for each request.
pub trait CredentialProvider: Send + Sync {
    /// Token to send, without the `Bearer ` prefix. `None` sends no header.
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Sends requests without an `Authorization` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

impl<F> CredentialProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn bearer_token(&self) -> Option<String> {
        self()
    }
}

/// Client for the document backend REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
    upload_timeout: Duration,
    upload_config: UploadConfig,
    extraction_config: ExtractionConfig,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("upload_timeout", &self.upload_timeout)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client from configuration. The configured token, if any,
    /// becomes the credential provider.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let trimmed = config.base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(trimmed)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base())
            .ok_or_else(|| ApiError::InvalidUrl(config.base_url.clone()))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        let credentials: Arc<dyn CredentialProvider> = match &config.token {
            Some(token) => Arc::new(StaticToken::new(token.clone())),
            None => Arc::new(NoCredentials),
        };

        Ok(Self {
            http,
            base_url,
            credentials,
            upload_timeout: config.upload_timeout(),
            upload_config: UploadConfig::default(),
            extraction_config: ExtractionConfig::default(),
        })
    }

    /// Replace the credential provider.
    pub fn with_credentials(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.credentials = Arc::new(provider);
        self
    }

    /// Use these limits for client-side pre-flight checks.
    pub fn with_upload_config(mut self, config: UploadConfig) -> Self {
        self.upload_config = config;
        self
    }

    /// Defaults applied by [`ApiClient::extract_products`].
    pub fn with_extraction_config(mut self, config: ExtractionConfig) -> Self {
        self.extraction_config = config;
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn upload_config(&self) -> &UploadConfig {
        &self.upload_config
    }

    pub fn extraction_config(&self) -> &ExtractionConfig {
        &self.extraction_config
    }

    /// Endpoint URL below the base URL. Each segment is percent-encoded, so
    /// an id can never add path components or a query.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` only accepts http(s) URLs, which always have a path
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Start a request with credentials attached.
    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.url(segments);
        debug!("{} {}", method, url);
        let builder = self.http.request(method, url);
        match self.credentials.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and turn non-2xx answers into errors.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(transport_error)?;
        check_status(response).await
    }

    /// Send a request and decode a JSON body.
    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        let body = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Send a request and collect a file download.
    async fn send_download(
        &self,
        builder: RequestBuilder,
        fallback_name: String,
        requested_inline: bool,
    ) -> Result<Download, ApiError> {
        let response = self.send(builder).await?;

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let disposition = header(CONTENT_DISPOSITION);

        let (file_name, inline) = match disposition.as_deref() {
            Some(value) => (
                disposition_file_name(value).unwrap_or(fallback_name),
                value.trim_start().to_ascii_lowercase().starts_with("inline"),
            ),
            None => (fallback_name, requested_inline),
        };

        let data = response.bytes().await.map_err(transport_error)?.to_vec();

        Ok(Download {
            file_name,
            content_type,
            inline,
            data,
        })
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Transport(e)
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    if status == StatusCode::UNAUTHORIZED {
        Err(ApiError::Unauthorized(message))
    } else {
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// Message from an `{error}` or `{message}` JSON body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

lazy_static! {
    static ref DISPOSITION_FILENAME: Regex =
        Regex::new(r#"(?i)filename\*?\s*=\s*(?:UTF-8'')?"?([^";]+)"?"#).unwrap();
}

/// File name from a `Content-Disposition` header value.
///
/// Only the last path component is kept; names that reduce to nothing, `.`
/// or `..` are dropped so the caller falls back to its own name.
fn disposition_file_name(value: &str) -> Option<String> {
    let caps = DISPOSITION_FILENAME.captures(value)?;
    safe_file_name(&caps[1])
}

/// Last component of `name`, with both separator styles honoured.
pub fn safe_file_name(name: &str) -> Option<String> {
    let last = name.trim().rsplit(['/', '\\']).next()?.trim();
    if matches!(last, "" | "." | "..") || Path::new(last).file_name().is_none() {
        return None;
    }
    Some(last.to_string())
}
