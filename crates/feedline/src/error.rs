//! Error types for the feedline crate

use thiserror::Error;

/// Result type alias for feedline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for feedline
///
/// Errors only exist at the collaborator boundaries (renderer, asset
/// fetcher, wire decoding). The reconciliation entry points absorb and log
/// them instead of propagating.
#[derive(Error, Debug)]
pub enum Error {
    /// A renderer collaborator failed to produce a handle for one message
    #[error("renderer failed for message {id}: {reason}")]
    Render { id: String, reason: String },

    /// An asset fetch collaborator failed to resolve a key
    #[error("asset fetch failed for {key}: {reason}")]
    AssetFetch { key: String, reason: String },

    /// A wire-shape message record could not be decoded
    #[error("malformed message record: {0}")]
    Decode(#[from] serde_json::Error),
}
