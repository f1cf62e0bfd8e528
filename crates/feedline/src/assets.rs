//! Asset-fetch collaborator boundary.
//!
//! Deferred `LoadAsset` ops resolve through an [`AssetFetcher`]. Transport
//! is the host's business; the crate ships the trait, a null default, and an
//! in-memory implementation for tests and demos.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Bytes plus optional mime for one resolved asset
#[derive(Debug, Clone)]
pub struct AssetPayload {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Presentation state of a handle's asset preview
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AssetSlot {
    /// The handle has no asset to load
    #[default]
    None,
    /// A load op is scheduled or in flight
    Pending,
    /// The asset resolved; size recorded for the preview line
    Loaded { bytes: usize },
    /// The fetch failed; a retry can be requested
    Failed { reason: String },
}

/// Resolves an opaque asset key to its payload
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, key: &str) -> Result<AssetPayload>;
}

/// Default fetcher for hosts that never load assets; every fetch fails and
/// the failure is absorbed into the handle's asset slot.
#[derive(Debug, Default)]
pub struct NullAssetFetcher;

impl AssetFetcher for NullAssetFetcher {
    fn fetch(&self, key: &str) -> Result<AssetPayload> {
        Err(Error::AssetFetch {
            key: key.to_string(),
            reason: "no asset fetcher configured".to_string(),
        })
    }
}

/// In-memory fetcher keyed by asset key
#[derive(Debug, Default)]
pub struct MemoryAssetFetcher {
    entries: HashMap<String, AssetPayload>,
}

impl MemoryAssetFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, bytes: Vec<u8>, mime_type: Option<&str>) {
        self.entries.insert(
            key.into(),
            AssetPayload {
                bytes,
                mime_type: mime_type.map(str::to_string),
            },
        );
    }
}

impl AssetFetcher for MemoryAssetFetcher {
    fn fetch(&self, key: &str) -> Result<AssetPayload> {
        self.entries.get(key).cloned().ok_or_else(|| Error::AssetFetch {
            key: key.to_string(),
            reason: "unknown asset key".to_string(),
        })
    }
}
