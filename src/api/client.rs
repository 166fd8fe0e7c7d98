use crate::api::auth::AuthToken;
use crate::config;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use bytes::Bytes;
use reqwest::{header::HeaderValue, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Status and body of a response, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl RawResponse {
    pub fn snippet(&self, max: usize) -> String {
        let len = self.body.len().min(max);
        String::from_utf8_lossy(&self.body[..len]).into_owned()
    }
}

/// Thin wrapper over `reqwest::Client`. Every request is attempted exactly once and
/// no timeouts are configured.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    pub fn new() -> AppResult<Self> {
        let client = Client::builder()
            .default_headers(config::BASE_HEADERS.clone())
            .build()
            .map_err(AppError::from)?;
        Ok(ApiClient { client })
    }

    /// Sends the request and reads the whole body. Only transport failures are errors here.
    pub async fn send<P>(
        &self,
        method: Method,
        url: &str,
        token: Option<&AuthToken>,
        payload: Option<&P>,
        source_label: &str,
    ) -> AppResult<RawResponse>
    where
        P: Serialize + ?Sized,
    {
        let mut request_builder = self.client.request(method.clone(), url);
        if let Some(t) = token {
            let value = HeaderValue::from_str(t.as_str()).map_err(|_| {
                AppError::ConfigError("Auth token contains invalid header characters".into())
            })?;
            request_builder = request_builder.header(config::AUTH_TOKEN_HEADER, value);
        }
        if let Some(p) = payload {
            request_builder = request_builder.json(p);
        }

        let log_prefix = format!("API Req [{}] {} {}", source_label, method, url);

        let resp = request_builder.send().await.map_err(|e| {
            let context_str = if e.is_timeout() {
                "Timeout"
            } else if e.is_connect() {
                "Connection"
            } else {
                "Request"
            };
            log(
                LogLevel::Warning,
                &format!("{} {} Error: {}", log_prefix, context_str, e),
            );
            AppError::from(e)
        })?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| {
            log(
                LogLevel::Warning,
                &format!("{} - Error reading response body: {}", log_prefix, e),
            );
            AppError::from(e)
        })?;

        Ok(RawResponse { status, body })
    }

    /// Decodes the body as JSON whatever the status code was.
    pub fn decode<T>(raw: &RawResponse, url: &str, source_label: &str) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(&raw.body).map_err(|e| {
            log(
                LogLevel::Error,
                &format!(
                    "Fail parse response from {} [{}] (HTTP {}) Type {}: {}. Snippet: '{}'",
                    url,
                    source_label,
                    raw.status,
                    std::any::type_name::<T>(),
                    e,
                    raw.snippet(200)
                ),
            );
            AppError::from(e)
        })
    }

    /// GET that requires a success status, then decodes the body.
    pub async fn fetch<T>(
        &self,
        url: &str,
        token: Option<&AuthToken>,
        source_label: &str,
    ) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let raw = self
            .send::<()>(Method::GET, url, token, None, source_label)
            .await?;

        if !raw.status.is_success() {
            return Err(AppError::api_error(
                raw.status.as_u16(),
                format!(
                    "HTTP {} ({}). Body: {}...",
                    raw.status,
                    raw.status.canonical_reason().unwrap_or("Unknown Status"),
                    raw.snippet(150)
                ),
                url,
                source_label,
            ));
        }

        Self::decode(&raw, url, source_label)
    }
}
