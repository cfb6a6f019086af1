// file: src/models/chunk.rs
// description: core chunk model with content hashing
// reference: internal data structures

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// One fixed-size unit of indexed text, produced by the chunker from a loaded
/// document and stored in the vector table together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub source_path: String,
    pub relative_path: String,
    pub chunk_index: u32,
    pub content: String,
    pub content_hash: String,
    pub title: Option<String>,
    pub char_len: u64,
    pub indexed_at: u64,
}

impl Chunk {
    pub fn new(
        source_path: String,
        relative_path: String,
        chunk_index: u32,
        content: String,
    ) -> Self {
        let content_hash = Self::compute_hash(&content);
        let char_len = content.chars().count() as u64;
        let indexed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Self {
            // hash alone collides for repeated boilerplate, so the index is
            // part of the row id
            id: format!("{}-{}", content_hash, chunk_index),
            source_path,
            relative_path,
            chunk_index,
            content,
            content_hash,
            title: None,
            char_len,
            indexed_at,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    fn compute_hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
