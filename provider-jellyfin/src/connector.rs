//! Jellyfin API connector implementation
//!
//! Implements the `PlaybackStateApi` trait against the versioned
//! playback-state endpoints of a Jellyfin server.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use bridge_traits::server::{ApiSession, PlaybackStateApi, PushOutcome, RemotePlaybackState, StatePush};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::JellyfinError;
use crate::types::{PlaybackStateDto, PlaybackStatePushDto, PublicSystemInfo, PushAckDto};

/// Header carrying the session access token
const AUTH_HEADER: &str = "X-Emby-Token";

/// Timeout for state reads and pushes
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Jellyfin server connector
///
/// Speaks the playback-state sync protocol of one Jellyfin server:
///
/// - `GET /Users/{userId}/Items/{itemId}/PlaybackState` reads the server's
///   current record
/// - `POST` to the same path pushes a record with the version it is based
///   on; the server answers `200` with its new version or `409` with the
///   state it kept
///
/// Pushes are deliberately single-attempt: the sync pass that issues them
/// owns the retry cadence, and a record gets one try per pass.
///
/// # Example
///
/// ```ignore
/// use provider_jellyfin::JellyfinConnector;
///
/// let connector = JellyfinConnector::new(http_client, "https://media.example:8096");
/// let outcome = connector.push_state(&session, "item-1", &push).await?;
/// ```
pub struct JellyfinConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Server base URL without a trailing slash
    base_url: String,
}

impl JellyfinConnector {
    /// Create a connector for one server
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `base_url` - server address, e.g. `https://media.example:8096`
    pub fn new(http_client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http_client,
            base_url,
        }
    }

    /// Build the playback-state URL for one (user, item) pair
    fn state_url(&self, user_id: &str, item_id: &str) -> String {
        format!(
            "{}/Users/{}/Items/{}/PlaybackState",
            self.base_url,
            urlencoding::encode(user_id),
            urlencoding::encode(item_id)
        )
    }

    /// Parse an RFC 3339 timestamp, tolerating absent or malformed values
    fn parse_timestamp(rfc3339: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(rfc3339)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Convert the wire DTO to the bridge-level state snapshot
    fn convert_state(dto: PlaybackStateDto) -> RemotePlaybackState {
        let last_modified = dto.last_modified.as_deref().and_then(|raw| {
            let parsed = Self::parse_timestamp(raw);
            if parsed.is_none() {
                warn!(raw, "Server sent an unparseable LastModified; treating as unknown");
            }
            parsed
        });

        RemotePlaybackState {
            played: dto.played,
            favorite: dto.is_favorite,
            position_ticks: dto.playback_position_ticks,
            last_modified,
            version: dto.version,
        }
    }

    /// Probe the server without credentials
    ///
    /// Used when adding a server to confirm the address points at a
    /// Jellyfin instance and to learn its identity.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<PublicSystemInfo> {
        let request = HttpRequest::new(
            HttpMethod::Get,
            format!("{}/System/Info/Public", self.base_url),
        )
        .header("Accept", "application/json")
        .timeout(REQUEST_TIMEOUT);

        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::default())
            .await?;

        if response.status != 200 {
            return Err(JellyfinError::ApiError {
                status_code: response.status,
                message: String::from_utf8_lossy(&response.body).to_string(),
            }
            .into());
        }

        let info: PublicSystemInfo = serde_json::from_slice(&response.body).map_err(|e| {
            JellyfinError::ParseError(format!("Failed to parse system info: {}", e))
        })?;
        debug!(server_name = %info.server_name, version = %info.version, "Server responded");
        Ok(info)
    }
}

#[async_trait]
impl PlaybackStateApi for JellyfinConnector {
    #[instrument(skip(self, session, push), fields(item_id = %item_id))]
    async fn push_state(
        &self,
        session: &ApiSession,
        item_id: &str,
        push: &StatePush,
    ) -> Result<PushOutcome> {
        let body = PlaybackStatePushDto {
            played: push.played,
            is_favorite: push.favorite,
            playback_position_ticks: push.position_ticks,
            last_modified: push
                .last_modified
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            base_version: push.base_version,
        };

        let request = HttpRequest::new(
            HttpMethod::Post,
            self.state_url(&session.user_id, item_id),
        )
        .header(AUTH_HEADER, session.access_token.as_str())
        .header("Accept", "application/json")
        .json(&body)?
        .timeout(REQUEST_TIMEOUT);

        // Single attempt: the sync pass owns the retry cadence.
        let response = self.http_client.execute(request).await?;

        match response.status {
            200 => {
                let ack: PushAckDto = serde_json::from_slice(&response.body).map_err(|e| {
                    JellyfinError::ParseError(format!("Failed to parse push acknowledgement: {}", e))
                })?;
                debug!(version = ack.version, "Push accepted");
                Ok(PushOutcome::Acknowledged {
                    version: ack.version,
                })
            }
            409 => {
                let dto: PlaybackStateDto =
                    serde_json::from_slice(&response.body).map_err(|e| {
                        JellyfinError::ParseError(format!("Failed to parse conflict state: {}", e))
                    })?;
                debug!(server_version = dto.version, "Server kept its own state");
                Ok(PushOutcome::Conflict(Self::convert_state(dto)))
            }
            401 => {
                Err(JellyfinError::AuthenticationFailed("access token rejected".to_string()).into())
            }
            404 => Err(JellyfinError::ItemNotFound {
                item_id: item_id.to_string(),
            }
            .into()),
            status => {
                warn!(status, "Push failed");
                Err(JellyfinError::ApiError {
                    status_code: status,
                    message: String::from_utf8_lossy(&response.body).to_string(),
                }
                .into())
            }
        }
    }

    #[instrument(skip(self, session), fields(item_id = %item_id))]
    async fn fetch_state(
        &self,
        session: &ApiSession,
        item_id: &str,
    ) -> Result<RemotePlaybackState> {
        let request = HttpRequest::new(
            HttpMethod::Get,
            self.state_url(&session.user_id, item_id),
        )
        .header(AUTH_HEADER, session.access_token.as_str())
        .header("Accept", "application/json")
        .timeout(REQUEST_TIMEOUT);

        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::default())
            .await?;

        match response.status {
            200 => {
                let dto: PlaybackStateDto =
                    serde_json::from_slice(&response.body).map_err(|e| {
                        JellyfinError::ParseError(format!("Failed to parse playback state: {}", e))
                    })?;
                Ok(Self::convert_state(dto))
            }
            401 => {
                Err(JellyfinError::AuthenticationFailed("access token rejected".to_string()).into())
            }
            404 => Err(JellyfinError::ItemNotFound {
                item_id: item_id.to_string(),
            }
            .into()),
            status => Err(JellyfinError::ApiError {
                status_code: status,
                message: String::from_utf8_lossy(&response.body).to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        }
    }

    fn session() -> ApiSession {
        ApiSession::new("user-1", "token-abc")
    }

    fn push() -> StatePush {
        StatePush {
            played: true,
            favorite: false,
            position_ticks: 36_000_000_000,
            last_modified: Utc::now(),
            base_version: 3,
        }
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.as_bytes().to_vec()),
        }
    }

    #[tokio::test]
    async fn test_push_state_acknowledged() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Post);
            assert_eq!(
                req.url,
                "https://media.test/Users/user-1/Items/item-1/PlaybackState"
            );
            assert_eq!(req.headers.get(AUTH_HEADER), Some(&"token-abc".to_string()));
            let body = String::from_utf8(req.body.unwrap().to_vec()).unwrap();
            assert!(body.contains("\"BaseVersion\":3"));
            assert!(body.contains("\"Played\":true"));

            Ok(json_response(200, r#"{"Version": 4}"#))
        });

        let connector = JellyfinConnector::new(Arc::new(mock_http), "https://media.test");
        let outcome = connector
            .push_state(&session(), "item-1", &push())
            .await
            .unwrap();

        assert_eq!(outcome, PushOutcome::Acknowledged { version: 4 });
    }

    #[tokio::test]
    async fn test_push_state_conflict_carries_server_state() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|_| {
            Ok(json_response(
                409,
                r#"{
                    "Played": false,
                    "IsFavorite": true,
                    "PlaybackPositionTicks": 9000,
                    "LastModified": "2024-03-01T18:30:00.000Z",
                    "Version": 11
                }"#,
            ))
        });

        let connector = JellyfinConnector::new(Arc::new(mock_http), "https://media.test");
        let outcome = connector
            .push_state(&session(), "item-1", &push())
            .await
            .unwrap();

        match outcome {
            PushOutcome::Conflict(remote) => {
                assert!(!remote.played);
                assert!(remote.favorite);
                assert_eq!(remote.position_ticks, 9_000);
                assert_eq!(remote.version, 11);
                assert!(remote.last_modified.is_some());
            }
            other => panic!("Expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_push_state_auth_failure() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(401, "Unauthorized")));

        let connector = JellyfinConnector::new(Arc::new(mock_http), "https://media.test");
        let result = connector.push_state(&session(), "item-1", &push()).await;

        let err = result.unwrap_err();
        assert!(!err.is_network());
        assert!(err.to_string().contains("Authentication failed"));
    }

    #[tokio::test]
    async fn test_push_network_error_passes_through() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::Network("connection refused".to_string())));

        let connector = JellyfinConnector::new(Arc::new(mock_http), "https://media.test");
        let result = connector.push_state(&session(), "item-1", &push()).await;

        assert!(result.unwrap_err().is_network());
    }

    #[tokio::test]
    async fn test_fetch_state_success() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Get);
            assert!(req.url.ends_with("/Users/user-1/Items/item-7/PlaybackState"));

            Ok(json_response(
                200,
                r#"{
                    "Played": true,
                    "IsFavorite": false,
                    "PlaybackPositionTicks": 42,
                    "LastModified": "2024-03-01T18:30:00.000Z",
                    "Version": 2
                }"#,
            ))
        });

        let connector = JellyfinConnector::new(Arc::new(mock_http), "https://media.test");
        let remote = connector.fetch_state(&session(), "item-7").await.unwrap();

        assert!(remote.played);
        assert_eq!(remote.position_ticks, 42);
        assert_eq!(remote.version, 2);
        assert!(remote.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_fetch_state_without_timestamp() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|_| {
            Ok(json_response(
                200,
                r#"{
                    "Played": false,
                    "IsFavorite": false,
                    "PlaybackPositionTicks": 0,
                    "Version": 0
                }"#,
            ))
        });

        let connector = JellyfinConnector::new(Arc::new(mock_http), "https://media.test");
        let remote = connector.fetch_state(&session(), "item-7").await.unwrap();

        assert!(remote.last_modified.is_none());
    }

    #[tokio::test]
    async fn test_fetch_unknown_item_is_an_error() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(404, "Not Found")));

        let connector = JellyfinConnector::new(Arc::new(mock_http), "https://media.test");
        let result = connector.fetch_state(&session(), "ghost").await;

        let err = result.unwrap_err();
        assert!(!err.is_network());
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn test_item_ids_are_url_encoded() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.contains("/Items/Season%201%2FEpisode%202/"));
            Ok(json_response(200, r#"{"Version": 1}"#))
        });

        let connector = JellyfinConnector::new(Arc::new(mock_http), "https://media.test");
        connector
            .push_state(&session(), "Season 1/Episode 2", &push())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_trailing_slash_is_trimmed() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(
                req.url,
                "https://media.test/Users/user-1/Items/item-1/PlaybackState"
            );
            Ok(json_response(200, r#"{"Version": 1}"#))
        });

        let connector = JellyfinConnector::new(Arc::new(mock_http), "https://media.test/");
        connector
            .push_state(&session(), "item-1", &push())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_ping_parses_system_info() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.url, "https://media.test/System/Info/Public");
            assert!(!req.headers.contains_key(AUTH_HEADER));

            Ok(json_response(
                200,
                r#"{"ServerName": "Living Room", "Version": "10.9.2", "Id": "f3a9"}"#,
            ))
        });

        let connector = JellyfinConnector::new(Arc::new(mock_http), "https://media.test");
        let info = connector.ping().await.unwrap();

        assert_eq!(info.server_name, "Living Room");
        assert_eq!(info.id, "f3a9");
    }

    #[test]
    fn test_malformed_timestamp_becomes_unknown() {
        let dto = PlaybackStateDto {
            played: true,
            is_favorite: false,
            playback_position_ticks: 0,
            last_modified: Some("not-a-timestamp".to_string()),
            version: 1,
        };

        let remote = JellyfinConnector::convert_state(dto);
        assert!(remote.last_modified.is_none());
    }
}
