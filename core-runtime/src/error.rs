//! Runtime-level errors.
//!
//! Domain errors live in `core-store` and `core-sync`; this type only
//! covers configuration and capability problems surfaced at startup.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or inconsistent configuration, reported before anything runs.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required platform bridge was not injected and no default exists
    /// for this target.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
