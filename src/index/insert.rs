// file: src/index/insert.rs
// description: LanceDB batch insertion operations with vector embeddings
// reference: https://docs.rs/lancedb

use crate::error::{AssistantError, Result};
use crate::index::client::LanceDbClient;
use crate::index::embeddings::EmbeddingClient;
use crate::index::schema::SchemaManager;
use crate::models::Chunk;
use arrow_array::{
    FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray, UInt32Array,
    UInt64Array,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ChunkInserter<'a> {
    client: &'a LanceDbClient,
    embedding_client: Option<Arc<EmbeddingClient>>,
}

#[derive(Debug, Clone, Default)]
pub struct InsertStats {
    pub chunks_inserted: usize,
    pub errors: usize,
}

impl<'a> ChunkInserter<'a> {
    pub fn new(client: &'a LanceDbClient) -> Self {
        // Use the HTTP embeddings API when an API key is configured
        let embedding_client = client.api_key().map(|key| {
            Arc::new(EmbeddingClient::new(
                client.api_base().to_string(),
                key.clone(),
                client.embedding_model().to_string(),
            ))
        });

        if embedding_client.is_some() {
            info!("ChunkInserter initialized with API embeddings");
        } else {
            warn!("ChunkInserter initialized without API key - using fallback embeddings");
        }

        Self {
            client,
            embedding_client,
        }
    }

    /// Embed and insert a batch of chunks into LanceDB, creating the table on
    /// first insert.
    pub async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let dim = self.client.embedding_dim();
        let schema = SchemaManager::get_chunks_schema(dim);

        let mut embeddings = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            embeddings.push(self.generate_embedding(&chunk.content, dim).await?);
        }

        let record_batch = Self::create_record_batch(schema.clone(), chunks, embeddings)?;
        let table_name = self.client.table_name();

        if !self.client.table_exists(table_name).await? {
            // Create table with first batch
            self.client
                .get_connection()
                .create_table(
                    table_name,
                    RecordBatchIterator::new(vec![Ok(record_batch)], schema.clone()),
                )
                .execute()
                .await
                .map_err(|e| AssistantError::Database(format!("Failed to create table: {}", e)))?;
            info!("Created new table: {}", table_name);
        } else {
            // Append to existing table
            let table = self.client.get_table(table_name).await?;
            table
                .add(RecordBatchIterator::new(vec![Ok(record_batch)], schema))
                .execute()
                .await
                .map_err(|e| {
                    AssistantError::Database(format!("Failed to insert chunks: {}", e))
                })?;
        }

        debug!("Inserted {} chunks", chunks.len());
        Ok(chunks.len())
    }

    /// Create an Arrow RecordBatch from chunks and their embeddings
    fn create_record_batch(
        schema: Arc<arrow_schema::Schema>,
        chunks: &[Chunk],
        embeddings: Vec<Vec<f32>>,
    ) -> Result<RecordBatch> {
        let ids: StringArray = chunks.iter().map(|c| Some(c.id.clone())).collect();

        let source_paths: StringArray = chunks
            .iter()
            .map(|c| Some(c.source_path.clone()))
            .collect();

        let relative_paths: StringArray = chunks
            .iter()
            .map(|c| Some(c.relative_path.clone()))
            .collect();

        let chunk_indices: UInt32Array = chunks.iter().map(|c| Some(c.chunk_index)).collect();

        let contents: StringArray = chunks.iter().map(|c| Some(c.content.clone())).collect();

        let content_hashes: StringArray = chunks
            .iter()
            .map(|c| Some(c.content_hash.clone()))
            .collect();

        let char_lens: UInt64Array = chunks.iter().map(|c| Some(c.char_len)).collect();

        let indexed_ats: UInt64Array = chunks.iter().map(|c| Some(c.indexed_at)).collect();

        // Build embedding array (FixedSizeList of Float32)
        let embedding_values: Float32Array = embeddings
            .iter()
            .flat_map(|emb| emb.iter().copied())
            .collect();

        let embedding_list =
            FixedSizeListArray::try_new_from_values(embedding_values, embeddings[0].len() as i32)
                .map_err(|e| {
                    AssistantError::Database(format!("Failed to create embedding array: {}", e))
                })?;

        let titles: StringArray = chunks.iter().map(|c| c.title.clone()).collect();

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(ids),
                Arc::new(source_paths),
                Arc::new(relative_paths),
                Arc::new(chunk_indices),
                Arc::new(contents),
                Arc::new(content_hashes),
                Arc::new(char_lens),
                Arc::new(indexed_ats),
                Arc::new(embedding_list),
                Arc::new(titles),
            ],
        )
        .map_err(|e| AssistantError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Generate embedding via the API or fall back to the deterministic local
    /// embedding
    async fn generate_embedding(&self, text: &str, dim: usize) -> Result<Vec<f32>> {
        if let Some(ref client) = self.embedding_client {
            match client.generate_embedding(text).await {
                Ok(embedding) => {
                    if embedding.len() != dim {
                        warn!(
                            "API returned embedding with dimension {}, expected {}. Using fallback.",
                            embedding.len(),
                            dim
                        );
                        Ok(EmbeddingClient::generate_fallback_embedding(text, dim))
                    } else {
                        debug!("Generated API embedding for {} chars", text.len());
                        Ok(embedding)
                    }
                }
                Err(e) => {
                    warn!("API embedding failed: {}. Using fallback.", e);
                    Ok(EmbeddingClient::generate_fallback_embedding(text, dim))
                }
            }
        } else {
            debug!("Using fallback embedding (no API key configured)");
            Ok(EmbeddingClient::generate_fallback_embedding(text, dim))
        }
    }
}
