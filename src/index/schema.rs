// file: src/index/schema.rs
// description: LanceDB schema management for the chunk vector table
// reference: https://docs.rs/lancedb

use crate::error::Result;
use crate::index::client::LanceDbClient;
use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;
use tracing::{info, warn};

pub struct SchemaManager<'a> {
    client: &'a LanceDbClient,
}

impl<'a> SchemaManager<'a> {
    pub fn new(client: &'a LanceDbClient) -> Self {
        Self { client }
    }

    pub async fn initialize(&self) -> Result<()> {
        info!("Initializing LanceDB schema");

        // Check if the chunk table exists
        if !self.client.table_exists(self.client.table_name()).await? {
            info!("Creating chunk table with vector embeddings");
            // Table will be created on first insert with proper schema
        } else {
            info!("Chunk table already exists");
        }

        info!("LanceDB schema initialized successfully");
        Ok(())
    }

    pub async fn verify_schema(&self) -> Result<bool> {
        let table_name = self.client.table_name();

        if !self.client.table_exists(table_name).await? {
            warn!("Table '{}' does not exist", table_name);
            return Ok(false);
        }

        info!("Table '{}' exists", table_name);
        Ok(true)
    }

    /// Returns the Arrow schema for the chunk table with vector embeddings
    pub fn get_chunks_schema(embedding_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("source_path", DataType::Utf8, false),
            Field::new("relative_path", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("content_hash", DataType::Utf8, false),
            Field::new("char_len", DataType::UInt64, false),
            Field::new("indexed_at", DataType::UInt64, false),
            // Vector embedding field for similarity search
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    embedding_dim as i32,
                ),
                false,
            ),
            // Source document title, when one was found
            Field::new("title", DataType::Utf8, true),
        ]))
    }

    pub async fn drop_all_tables(&self) -> Result<()> {
        warn!("Dropping all tables in LanceDB");

        let table_name = self.client.table_name();

        if self.client.table_exists(table_name).await? {
            self.client
                .get_connection()
                .drop_table(table_name)
                .await
                .map_err(|e| {
                    crate::error::AssistantError::Database(format!(
                        "Failed to drop table {}: {}",
                        table_name, e
                    ))
                })?;
            info!("Dropped table: {}", table_name);
        }

        Ok(())
    }
}
