// file: src/index/mod.rs
// description: vector index module exports
// reference: internal module structure

pub mod client;
pub mod embeddings;
pub mod insert;
pub mod schema;

pub use client::LanceDbClient;
pub use embeddings::EmbeddingClient;
pub use insert::{ChunkInserter, InsertStats};
pub use schema::SchemaManager;
