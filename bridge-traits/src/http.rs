//! HTTP transport abstraction.
//!
//! Providers talk to their servers through this trait rather than a
//! concrete client, so connectors can be exercised against scripted
//! responses and hosts can supply their own transport.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

/// One outgoing request, built up fluently by the caller.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    /// Per-request override of the transport's default timeout.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Serialize `body` as the JSON request body and set the content type.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(body)
            .map_err(|e| BridgeError::OperationFailed(format!("JSON encoding failed: {}", e)))?;
        self.body = Some(Bytes::from(encoded));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// A completed response. Any status is delivered here; only transport
/// failures surface as errors.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Backoff settings for [`HttpClient::execute_with_retry`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Ceiling for the backoff delay.
    pub max_delay: Duration,
    /// Double the delay after each failed attempt.
    pub use_exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            use_exponential_backoff: true,
        }
    }
}

/// Async HTTP transport.
///
/// Implementations own TLS, connection pooling, and the mapping of
/// unreachable endpoints onto [`BridgeError::Network`] so that callers
/// can tell "server said no" apart from "could not reach the server".
///
/// `execute` performs exactly one attempt. That single-attempt contract
/// matters to the sync engine: pushes must not be retried inside the
/// transport, because the scheduled pass owns the retry cadence and a
/// transport-level replay could double-apply a conflicting write.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform the request once.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Network`] when the endpoint is unreachable,
    /// [`BridgeError::OperationFailed`] for other transport failures.
    /// Non-2xx statuses are returned as `Ok`.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Perform the request under a retry policy.
    ///
    /// The default implementation ignores the policy and delegates to
    /// `execute`; real transports override it with backoff.
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let _ = policy;
        self.execute(request).await
    }

    /// Cheap reachability probe, where the transport supports one.
    async fn is_connected(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Probe {
        played: bool,
    }

    #[test]
    fn request_builder_collects_headers_and_timeout() {
        let request = HttpRequest::new(HttpMethod::Get, "https://media.test/System/Info/Public")
            .header("Accept", "application/json")
            .timeout(Duration::from_secs(15));

        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(
            request.headers.get("Accept").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(request.timeout, Some(Duration::from_secs(15)));
        assert!(request.body.is_none());
    }

    #[test]
    fn json_body_sets_content_type() {
        let request = HttpRequest::new(HttpMethod::Post, "https://media.test/state")
            .json(&Probe { played: true })
            .unwrap();

        assert_eq!(
            request.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(request.body.as_deref(), Some(br#"{"played":true}"#.as_ref()));
    }

    #[test]
    fn success_covers_the_2xx_range_only() {
        let mut response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        assert!(response.is_success());

        response.status = 204;
        assert!(response.is_success());

        response.status = 409;
        assert!(!response.is_success());
    }
}
