//! Jellyfin playback-state API types
//!
//! Data structures for the versioned playback-state endpoints. Jellyfin
//! serializes with PascalCase field names; timestamps are RFC 3339 strings.

use serde::{Deserialize, Serialize};

/// Server-held playback state for one (user, item) pair
///
/// Returned by `GET /Users/{userId}/Items/{itemId}/PlaybackState` and as the
/// body of a `409 Conflict` push response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackStateDto {
    /// Whether the item is marked played
    pub played: bool,

    /// Whether the item is a favorite
    pub is_favorite: bool,

    /// Resume offset in ticks (100ns units)
    pub playback_position_ticks: i64,

    /// Wall-clock instant of the server's snapshot (RFC 3339), when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,

    /// Server-issued logical version
    pub version: i64,
}

/// Push payload for `POST /Users/{userId}/Items/{itemId}/PlaybackState`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackStatePushDto {
    /// Whether the item is marked played
    pub played: bool,

    /// Whether the item is a favorite
    pub is_favorite: bool,

    /// Resume offset in ticks (100ns units)
    pub playback_position_ticks: i64,

    /// Wall-clock instant of the local mutation (RFC 3339)
    pub last_modified: String,

    /// Version the client last synced at; a mismatch makes the server
    /// arbitrate instead of blindly accepting
    pub base_version: i64,
}

/// Acknowledgement body for an accepted push
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PushAckDto {
    /// Version the server now holds for the record
    pub version: i64,
}

/// Response of `GET /System/Info/Public`
///
/// Unauthenticated probe used when adding a server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicSystemInfo {
    /// Display name of the server
    #[serde(default)]
    pub server_name: String,

    /// Server software version
    #[serde(default)]
    pub version: String,

    /// Unique server identifier
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_playback_state() {
        let json = r#"{
            "Played": true,
            "IsFavorite": false,
            "PlaybackPositionTicks": 36000000000,
            "LastModified": "2024-03-01T18:30:00.000Z",
            "Version": 7
        }"#;

        let dto: PlaybackStateDto = serde_json::from_str(json).unwrap();
        assert!(dto.played);
        assert!(!dto.is_favorite);
        assert_eq!(dto.playback_position_ticks, 36_000_000_000);
        assert_eq!(dto.version, 7);
        assert!(dto.last_modified.is_some());
    }

    #[test]
    fn test_deserialize_playback_state_without_timestamp() {
        let json = r#"{
            "Played": false,
            "IsFavorite": true,
            "PlaybackPositionTicks": 0,
            "Version": 1
        }"#;

        let dto: PlaybackStateDto = serde_json::from_str(json).unwrap();
        assert!(dto.last_modified.is_none());
    }

    #[test]
    fn test_serialize_push_uses_pascal_case() {
        let push = PlaybackStatePushDto {
            played: true,
            is_favorite: false,
            playback_position_ticks: 1_000,
            last_modified: "2024-03-01T18:30:00.000Z".to_string(),
            base_version: 3,
        };

        let json = serde_json::to_string(&push).unwrap();
        assert!(json.contains("\"Played\":true"));
        assert!(json.contains("\"IsFavorite\":false"));
        assert!(json.contains("\"PlaybackPositionTicks\":1000"));
        assert!(json.contains("\"BaseVersion\":3"));
    }

    #[test]
    fn test_deserialize_public_system_info() {
        let json = r#"{
            "LocalAddress": "http://192.168.1.10:8096",
            "ServerName": "Living Room",
            "Version": "10.9.2",
            "ProductName": "Jellyfin Server",
            "Id": "f3a9c1d2e4b5"
        }"#;

        let info: PublicSystemInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.server_name, "Living Room");
        assert_eq!(info.version, "10.9.2");
        assert_eq!(info.id, "f3a9c1d2e4b5");
    }
}
