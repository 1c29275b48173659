//! services/api/src/adapters/ipfs.rs
//!
//! An in-memory content-addressed metadata store. Certificate metadata is
//! addressed by the SHA-256 of its bytes, so storing the same record twice
//! yields the same hash and re-running a mint workflow never produces a
//! dangling address.

use std::collections::HashMap;

use academy_core::ports::{MetadataStore, PortError, PortResult};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

/// In-memory `MetadataStore` implementation.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn content_address(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    hex::encode(digest)
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn store(&self, content: &[u8]) -> PortResult<String> {
        let hash = content_address(content);
        self.blobs
            .lock()
            .await
            .insert(hash.clone(), content.to_vec());
        Ok(hash)
    }

    async fn retrieve(&self, hash: &str) -> PortResult<Vec<u8>> {
        self.blobs
            .lock()
            .await
            .get(hash)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("No blob stored under {}", hash)))
    }
}
