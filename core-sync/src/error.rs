use bridge_traits::BridgeError;
use core_store::{ServerId, StoreError, UserId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Server unreachable: {0}")]
    RemoteUnreachable(String),

    #[error("No playback state API registered for server {0}")]
    ServerNotRegistered(ServerId),

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("User {0} is signed out")]
    NotSignedIn(UserId),
}

impl SyncError {
    /// Whether a later sync pass can be expected to succeed without
    /// intervention (connectivity came and went).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RemoteUnreachable(_) => true,
            Self::Bridge(err) => err.is_network(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
