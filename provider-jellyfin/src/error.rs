//! Error types for the Jellyfin provider

use thiserror::Error;

/// Jellyfin provider errors
#[derive(Error, Debug)]
pub enum JellyfinError {
    /// Access token rejected by the server
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error
    #[error("Jellyfin API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Item unknown to the server
    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Jellyfin operations
pub type Result<T> = std::result::Result<T, JellyfinError>;

impl From<JellyfinError> for bridge_traits::error::BridgeError {
    fn from(error: JellyfinError) -> Self {
        match error {
            JellyfinError::AuthenticationFailed(msg) => {
                bridge_traits::error::BridgeError::OperationFailed(format!(
                    "Authentication failed: {}",
                    msg
                ))
            }
            JellyfinError::ApiError {
                status_code,
                message,
            } => bridge_traits::error::BridgeError::OperationFailed(format!(
                "API error (status {}): {}",
                status_code, message
            )),
            JellyfinError::ItemNotFound { item_id } => {
                bridge_traits::error::BridgeError::OperationFailed(format!(
                    "Item not found: {}",
                    item_id
                ))
            }
            JellyfinError::ParseError(msg) => {
                bridge_traits::error::BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            JellyfinError::BridgeError(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = JellyfinError::ApiError {
            status_code: 503,
            message: "Service unavailable".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Jellyfin API error (status 503): Service unavailable"
        );
    }

    #[test]
    fn test_error_conversion_preserves_network_class() {
        let network = bridge_traits::error::BridgeError::Network("refused".to_string());
        let error = JellyfinError::BridgeError(network);
        let bridge_error: bridge_traits::error::BridgeError = error.into();

        assert!(bridge_error.is_network());
    }

    #[test]
    fn test_auth_error_is_not_network() {
        let error = JellyfinError::AuthenticationFailed("token expired".to_string());
        let bridge_error: bridge_traits::error::BridgeError = error.into();

        assert!(!bridge_error.is_network());
    }
}
