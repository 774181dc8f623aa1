//! HTTP implementation of [`RemoteCollaborator`]

use super::models::{BatchRequest, BatchResponse, ListResponse, RemoteRecord};
use super::traits::{RemoteCollaborator, RemoteResult};
use crate::config::{RemoteConfig, SecretString};
use crate::domain::{FieldSyncError, RemoteError, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use std::time::{Duration, Instant};

const RECORDS_PATH: &str = "/api/children";
const BATCH_PATH: &str = "/api/children/batch";
const HEALTH_PATH: &str = "/health";

/// Longest server message kept in an error reason
const MAX_REASON_LEN: usize = 300;

/// Remote collaborator over HTTPS with bearer authentication
///
/// # Example
///
/// ```no_run
/// use fieldsync::adapters::remote::HttpRemote;
/// use fieldsync::config::RemoteConfig;
///
/// let remote = HttpRemote::new(&RemoteConfig::default()).expect("client");
/// ```
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    /// Builds the HTTP client with the configured timeouts
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let mut builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .user_agent(concat!("fieldsync/", env!("CARGO_PKG_VERSION")));

        if !config.tls_verify {
            tracing::warn!("TLS certificate verification is disabled for the remote collaborator");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|e| {
            FieldSyncError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(request: RequestBuilder, token: Option<&SecretString>) -> RequestBuilder {
        match token {
            Some(token) => request.bearer_auth(token.expose_secret().as_str()),
            None => request,
        }
    }

    async fn send(request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.send().await.map_err(map_send_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

fn map_send_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout(err.to_string())
    } else {
        RemoteError::Network(err.to_string())
    }
}

/// Maps a non-success status to the engine's error classification
pub(crate) fn classify_status(status: StatusCode, body: &str) -> RemoteError {
    let reason = extract_reason(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized(reason),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => RemoteError::Server {
            status: status.as_u16(),
            message: reason,
        },
        s if s.is_server_error() => RemoteError::Server {
            status: s.as_u16(),
            message: reason,
        },
        s => RemoteError::Rejected {
            status: s.as_u16(),
            reason,
        },
    }
}

/// Pulls a human-readable reason out of an error body
///
/// Looks at `error` then `message` in a JSON body, else uses the raw text.
fn extract_reason(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let reason = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            ["error", "message"]
                .iter()
                .find_map(|key| json.get(key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string());

    Some(reason.chars().take(MAX_REASON_LEN).collect())
}

/// Accepts either a bare record or one wrapped as `{"data": {...}}`
fn unwrap_record(value: serde_json::Value) -> RemoteResult<RemoteRecord> {
    let inner = match value {
        serde_json::Value::Object(mut map) if map.get("data").map_or(false, |d| d.is_object()) => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    };
    serde_json::from_value(inner).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl RemoteCollaborator for HttpRemote {
    async fn upload_record(
        &self,
        record: &RemoteRecord,
        token: Option<&SecretString>,
    ) -> RemoteResult<RemoteRecord> {
        let request = Self::authorize(self.client.post(self.url(RECORDS_PATH)), token).json(record);
        let response = Self::send(request).await?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        unwrap_record(body)
    }

    async fn upload_batch(
        &self,
        records: &[RemoteRecord],
        token: Option<&SecretString>,
    ) -> RemoteResult<BatchResponse> {
        let request = Self::authorize(self.client.post(self.url(BATCH_PATH)), token)
            .json(&BatchRequest { records });
        let response = Self::send(request).await?;

        response
            .json::<BatchResponse>()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    async fn list_records(
        &self,
        limit: usize,
        token: Option<&SecretString>,
    ) -> RemoteResult<ListResponse> {
        let request = Self::authorize(self.client.get(self.url(RECORDS_PATH)), token)
            .query(&[("limit", limit)]);
        let response = Self::send(request).await?;

        response
            .json::<ListResponse>()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    async fn health_check(&self, timeout: Duration) -> RemoteResult<Duration> {
        let started = Instant::now();
        let request = self.client.get(self.url(HEALTH_PATH)).timeout(timeout);
        Self::send(request).await?;
        Ok(started.elapsed())
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = RemoteConfig {
            base_url: "https://records.example.org/".to_string(),
            ..RemoteConfig::default()
        };
        let remote = HttpRemote::new(&config).unwrap();
        assert_eq!(remote.base_url(), "https://records.example.org");
        assert_eq!(
            remote.url(BATCH_PATH),
            "https://records.example.org/api/children/batch"
        );
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, ""),
            RemoteError::Server { status: 503, .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            RemoteError::Unauthorized(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            RemoteError::Server { status: 429, .. }
        ));

        let rejected = classify_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"success": false, "error": "age must be under 18"}"#,
        );
        assert_eq!(
            rejected,
            RemoteError::Rejected {
                status: 422,
                reason: "age must be under 18".to_string()
            }
        );
    }

    #[test]
    fn test_extract_reason_falls_back_to_text() {
        assert_eq!(extract_reason("  "), None);
        assert_eq!(
            extract_reason(r#"{"message": "bad consent"}"#).as_deref(),
            Some("bad consent")
        );
        assert_eq!(extract_reason("plain failure").as_deref(), Some("plain failure"));
        assert_eq!(extract_reason(&"x".repeat(1000)).unwrap().len(), MAX_REASON_LEN);
    }

    #[test]
    fn test_unwrap_record_accepts_wrapped_and_bare() {
        let wrapped = serde_json::json!({"success": true, "data": {"localId": "r1", "_id": "s1"}});
        assert_eq!(
            unwrap_record(wrapped).unwrap().server_id.as_deref(),
            Some("s1")
        );

        let bare = serde_json::json!({"localId": "r1", "serverId": "s2"});
        assert_eq!(unwrap_record(bare).unwrap().server_id.as_deref(), Some("s2"));
    }
}
